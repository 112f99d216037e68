//! Built-in "core" plugin - permission levels, services, commands and settings every bot ships with

mod actions;
mod commands;

use crate::application::services::{CommandService, GuildSettingsService, PermissionsService, PluginService};
use crate::plugins::trait_def::Plugin;

pub const PLUGIN_NAME: &str = "core";

/// Always loaded first and never disabled
pub fn plugin() -> Plugin {
    let mut plugin = Plugin::new(PLUGIN_NAME)
        .with_description("Help, settings and permissions")
        .with_permission_level("admin")
        .with_permission_level("mod")
        .with_service(PermissionsService::new())
        .with_service(PluginService::new())
        .with_service(CommandService::new())
        .with_service(GuildSettingsService::new())
        .with_command(commands::help())
        .with_command(commands::config())
        .with_command(commands::list_guilds());
    for action in actions::all() {
        plugin = plugin.with_config_action(action);
    }
    plugin
}
