//! Plugin system
//!
//! Plugins are handed to the loader as values, factories or package names
//! and distributed into the bot's registries.

pub mod builtin;
pub mod loader;
pub mod trait_def;

pub use loader::PluginLoader;
pub use trait_def::{DefaultData, NoResolver, Plugin, PluginDescriptor, PluginHooks, PluginResolver, Service};
