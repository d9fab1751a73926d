// File: guildpass-common/src/models/mod.rs
pub mod cache;
pub mod discord;
pub mod identity;
pub mod policy;
pub mod product;
pub mod server;

pub use cache::{CacheEntry, ReconciledServer};
pub use discord::{OauthGuild, ADMINISTRATOR_BIT};
pub use identity::ChatIdentity;
pub use policy::{CommandPolicy, ConfigurableCommand};
pub use product::{ProductConfig, RedemptionRecord};
pub use server::Server;
