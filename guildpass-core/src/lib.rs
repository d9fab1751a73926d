// src/lib.rs

pub mod auth;
pub mod cache;
pub mod db;
pub mod platforms;
pub mod repositories;
pub mod services;

pub use db::Database;
pub use guildpass_common::error::Error;
