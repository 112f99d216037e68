//! Owner-facing failure reports

use crate::application::errors::BotError;
use crate::domain::entities::Embed;

const TRACE_BUDGET: usize = 1000;
const ELLIPSIS: &str = "...";
const FAILURE_COLOR: u32 = 0xff0000;

/// Join trace lines until the next line plus a trailing ellipsis would exceed `budget`
pub fn truncate_trace(lines: &[String], budget: usize) -> String {
    let mut out = String::new();
    for line in lines {
        let projected = out.len() + line.len() + 1 + ELLIPSIS.len();
        if projected > budget {
            out.push_str(ELLIPSIS);
            return out;
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}

pub fn failure_embed(title: &str, details: &[(&str, String)], err: &BotError) -> Embed {
    let mut embed = Embed::new()
        .with_title(title)
        .with_description(format!("{}: {}", err.report_name(), err))
        .with_color(FAILURE_COLOR);
    for (name, value) in details {
        embed = embed.add_field(*name, value.clone());
    }
    embed.add_field("Error Name", err.report_name())
        .add_field("Error Message", err.to_string())
        .add_field("Stack", truncate_trace(&err.trace_lines(), TRACE_BUDGET))
}
