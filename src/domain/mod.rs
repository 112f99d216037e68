//! Domain layer - Core business objects and collaborator abstractions
//!
//! This layer contains:
//! - Entities: Commands, config actions, messages, guilds, responses
//! - Traits: Abstractions for the transport and the guild data store

pub mod entities;
pub mod traits;
