//! Usage and help embeds

use crate::domain::entities::{Arg, Command, ConfigAction, Embed, Flag, FlagType};

const HELP_COLOR: u32 = 0x3498db;
const WARN_COLOR: u32 = 0xe67e22;

fn arg_usage(arg: &Arg) -> String {
    let name = if arg.greedy { format!("{}...", arg.name) } else { arg.name.clone() };
    if arg.required {
        format!("<{}>", name)
    } else {
        format!("[{}]", name)
    }
}

fn flag_usage(flag: &Flag) -> String {
    let mut usage = format!("--{}", flag.name);
    if let Some(alias) = flag.short_alias {
        usage.push_str(&format!(", -{}", alias));
    }
    match flag.kind {
        FlagType::Boolean => {}
        FlagType::Int => usage.push_str(" <int>"),
        FlagType::Float => usage.push_str(" <number>"),
        FlagType::String => usage.push_str(" <text>"),
    }
    usage
}

/// `!name <required> [optional]`
pub fn usage(prefix: &str, name: &str, args: &[Arg]) -> String {
    let mut parts = vec![format!("{}{}", prefix, name)];
    parts.extend(args.iter().map(arg_usage));
    parts.join(" ")
}

fn describe_args(args: &[Arg]) -> Option<String> {
    if args.is_empty() {
        return None;
    }
    Some(
        args.iter()
            .map(|a| {
                let desc = if a.description.is_empty() { "-" } else { a.description.as_str() };
                format!("**{}**: {}", a.name, desc)
            })
            .collect::<Vec<_>>()
            .join("\n"),
    )
}

fn describe_flags(flags: &[Flag]) -> Option<String> {
    let visible: Vec<String> = flags
        .iter()
        .filter(|f| f.show_in_help)
        .map(|f| {
            let desc = if f.description.is_empty() { "-" } else { f.description.as_str() };
            format!("**{}**: {}", flag_usage(f), desc)
        })
        .collect();
    if visible.is_empty() {
        None
    } else {
        Some(visible.join("\n"))
    }
}

/// Usage line plus per-argument and per-flag descriptions
pub fn command_help(prefix: &str, command: &Command) -> Embed {
    let mut embed = Embed::new()
        .with_title(command.name.clone())
        .with_color(HELP_COLOR)
        .add_field("Usage", usage(prefix, &command.name, &command.args));
    if !command.description.is_empty() {
        embed = embed.with_description(command.description.clone());
    }
    if let Some(args) = describe_args(&command.args) {
        embed = embed.add_field("Arguments", args);
    }
    if let Some(flags) = describe_flags(&command.flags) {
        embed = embed.add_field("Flags", flags);
    }
    embed
}

pub fn missing_args(prefix: &str, command: &Command, missing: &[String]) -> Embed {
    let mut embed = command_help(prefix, command)
        .with_color(WARN_COLOR)
        .with_title(format!("Missing required arguments: {}", missing.join(", ")));
    embed.footer = Some(format!("Run {}{} --help for details", prefix, command.name));
    embed
}

pub fn action_help(prefix: &str, action: &ConfigAction) -> Embed {
    let invocation = format!("config {} {}", action.plugin_name, action.name);
    let mut embed = Embed::new()
        .with_title(action.qualified_name())
        .with_color(HELP_COLOR)
        .add_field("Usage", usage(prefix, &invocation, &action.args));
    if !action.description.is_empty() {
        embed = embed.with_description(action.description.clone());
    }
    if let Some(args) = describe_args(&action.args) {
        embed = embed.add_field("Arguments", args);
    }
    embed
}
