//! Application layer - Use cases and business logic
//!
//! This layer contains:
//! - Registries: Case-insensitive stores for everything plugins register
//! - Services: Guild-scoped business logic of the core plugin
//! - Messaging: Tokenizing, filtering and dispatching commands
//! - Lifecycle: Building, booting and shutting down a bot

pub mod context;
pub mod errors;
pub mod lifecycle;
pub mod messaging;
pub mod registry;
pub mod report;
pub mod services;

pub use context::BotContext;
pub use errors::{BotError, Entity, ErrorKind};
