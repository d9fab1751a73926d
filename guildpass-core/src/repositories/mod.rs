// src/repositories/mod.rs

pub mod postgres;

pub use guildpass_common::traits::repository_traits::{
    ChatIdentityRepository, CommandPolicyRepository, ProductConfigRepository,
    RedemptionRepository, ServerRepository,
};

pub use postgres::chat_identities::PostgresChatIdentityRepository;
pub use postgres::command_policies::PostgresCommandPolicyRepository;
pub use postgres::product_configs::PostgresProductConfigRepository;
pub use postgres::redemptions::PostgresRedemptionRepository;
pub use postgres::servers::PostgresServerRepository;
