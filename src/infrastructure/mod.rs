//! Infrastructure layer - External concerns
//!
//! This layer contains:
//! - Config: Configuration loading
//! - Storage: Guild data persistence (JSON files, SQLite)
//! - Adapters: Transports (console, loopback)

pub mod adapters;
pub mod config;
pub mod database;
pub mod storage;
