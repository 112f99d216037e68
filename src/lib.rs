//! guildbot - command-processing core for a plugin-based chat bot
//!
//! Plugins contribute commands, services, config actions and permission
//! levels. Messages are tokenized, filtered and dispatched to command
//! handlers; a [`Bot`] sequences boot and shutdown around a [`Transport`].

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod plugins;

pub use application::errors::{BotError, Entity, ErrorKind};
pub use application::lifecycle::{Bot, BotBuilder, LifecycleState};
pub use application::messaging::{ActionContext, CommandContext, DispatchOutcome};
pub use application::BotContext;
pub use domain::traits::{DataStore, Transport};
pub use infrastructure::config::Config;
pub use plugins::{Plugin, PluginDescriptor, PluginHooks, Service};
