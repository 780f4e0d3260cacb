//! Configuration module
//!
//! Client settings loaded from `config.toml` with environment overrides.

pub mod config;
