// src/repositories/postgres/mod.rs

pub mod chat_identities;
pub mod command_policies;
pub mod product_configs;
pub mod redemptions;
pub mod servers;
