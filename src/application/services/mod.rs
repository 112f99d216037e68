//! Application services - Guild-scoped business logic registered by the core plugin

pub mod command_service;
pub mod guild_settings;
pub mod permissions;
pub mod plugin_service;

pub use command_service::CommandService;
pub use guild_settings::GuildSettingsService;
pub use permissions::PermissionsService;
pub use plugin_service::PluginService;

/// Keys used with the guild data store
pub mod keys {
    pub const PREFIX: &str = "core.prefix";
    pub const ENABLED_PLUGINS: &str = "core.enabledPlugins";
    pub const ENABLED_COMMANDS: &str = "core.enabledCommands";

    pub fn permission_level(level: &str) -> String {
        format!("core.permissions.{}", level.to_lowercase())
    }
}
