// File: src/services/mod.rs

pub mod guild_reconciler;
pub mod permission_resolver;
pub mod whitelist_aggregator;

pub use guild_reconciler::GuildReconciler;
pub use permission_resolver::{CommandCaller, CommandPermissionResolver, SaveOutcome};
pub use whitelist_aggregator::WhitelistAggregator;
