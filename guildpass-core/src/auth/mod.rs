// File: src/auth/mod.rs

pub mod token_exchange;

pub use token_exchange::{LinkOutcome, TokenExchangeClient};
