//! Message parser - Prefix detection and command-line tokenizing

use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::collections::HashMap;

use crate::domain::entities::{Arg, Flag, FlagType, Value};

static LONG_FLAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"^--(\w+)$").expect("long flag pattern"));
static SHORT_FLAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-(\w)$").expect("short flag pattern"));

/// Detects which of a channel's prefixes a message starts with
pub struct MessageParser {
    prefixes: Vec<String>,
}

impl MessageParser {
    pub fn new(prefixes: Vec<String>) -> Self {
        Self { prefixes }
    }

    /// Text following the first matching prefix, if any
    pub fn strip_prefix<'a>(&self, content: &'a str) -> Option<(&str, &'a str)> {
        self.prefixes
            .iter()
            .filter(|p| !p.is_empty())
            .find_map(|p| content.strip_prefix(p.as_str()).map(|rest| (p.as_str(), rest)))
    }

    /// Split `<name> <rest>`; the name is the first whitespace-delimited run
    pub fn split_name(text: &str) -> Option<(&str, &str)> {
        let text = text.trim_start();
        if text.is_empty() {
            return None;
        }
        match text.find(char::is_whitespace) {
            Some(idx) => Some((&text[..idx], &text[idx..])),
            None => Some((text, "")),
        }
    }
}

/// Values produced by the [`Tokenizer`]; absent keys were never set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedInput {
    pub args: HashMap<String, Value>,
    pub flags: HashMap<String, Value>,
}

impl ParsedInput {
    pub fn arg(&self, name: &str) -> Option<&str> {
        self.args.get(name).and_then(Value::as_str)
    }

    pub fn flag(&self, name: &str) -> Option<&Value> {
        self.flags.get(name)
    }

    pub fn flag_set(&self, name: &str) -> bool {
        self.flags.get(name).and_then(Value::as_bool).unwrap_or(false)
    }
}

struct Token {
    /// Bytes consumed from the trimmed remainder
    len: usize,
    value: String,
    /// Quoted or braced tokens are never classified as flags
    literal: bool,
}

/// Splits raw command text into args and flags according to a command's schema
pub struct Tokenizer<'a> {
    args: &'a [Arg],
    flags: &'a [Flag],
}

impl<'a> Tokenizer<'a> {
    pub fn new(args: &'a [Arg], flags: &'a [Flag]) -> Self {
        Self { args, flags }
    }

    pub fn tokenize(&self, input: &str) -> ParsedInput {
        let mut parsed = self.defaults();
        let mut remaining = input;
        let mut next_arg = 0usize;
        let mut pending: Option<&Flag> = None;

        loop {
            remaining = remaining.trim_start();
            let Some(token) = next_token(remaining) else {
                break;
            };
            let flag_token = if token.literal { None } else { flag_name(&token.value) };

            match (pending, flag_token) {
                (Some(flag), None) => {
                    if let Some(value) = coerce(flag.kind, &token.value) {
                        parsed.flags.insert(flag.name.clone(), value);
                    } else {
                        tracing::debug!("Ignoring unparsable value '{}' for --{}", token.value, flag.name);
                    }
                    pending = None;
                }
                (_, Some(name)) => {
                    pending = None;
                    let Some(flag) = self.lookup_flag(&name) else {
                        tracing::debug!("Unknown flag in '{}', discarding the rest of the input", token.value);
                        break;
                    };
                    if flag.kind == FlagType::Boolean {
                        parsed.flags.insert(flag.name.clone(), Value::Bool(true));
                    } else {
                        pending = Some(flag);
                    }
                }
                (None, None) => {
                    if let Some(arg) = self.args.get(next_arg) {
                        next_arg += 1;
                        if arg.greedy && next_arg == self.args.len() {
                            let rest = greedy_value(remaining.trim_end());
                            parsed.args.insert(arg.name.clone(), Value::Str(rest));
                            break;
                        }
                        parsed.args.insert(arg.name.clone(), Value::Str(token.value));
                    }
                }
            }

            remaining = &remaining[token.len..];
        }

        parsed
    }

    fn defaults(&self) -> ParsedInput {
        let mut parsed = ParsedInput::default();
        for arg in self.args {
            if let Some(default) = &arg.default {
                parsed.args.insert(arg.name.clone(), default.clone());
            }
        }
        for flag in self.flags {
            match (&flag.default, flag.kind) {
                (Some(default), _) => {
                    parsed.flags.insert(flag.name.clone(), default.clone());
                }
                (None, FlagType::Boolean) => {
                    parsed.flags.insert(flag.name.clone(), Value::Bool(false));
                }
                (None, _) => {}
            }
        }
        parsed
    }

    fn lookup_flag(&self, name: &FlagName) -> Option<&'a Flag> {
        match name {
            FlagName::Long(long) => self.flags.iter().find(|f| f.matches(long)),
            FlagName::Short(alias) => self.flags.iter().find(|f| f.matches_alias(*alias)),
        }
    }
}

enum FlagName {
    Long(String),
    Short(char),
}

fn flag_name(token: &str) -> Option<FlagName> {
    if let Some(caps) = LONG_FLAG.captures(token) {
        return Some(FlagName::Long(caps[1].to_string()));
    }
    SHORT_FLAG
        .captures(token)
        .and_then(|caps| caps[1].chars().next())
        .map(FlagName::Short)
}

fn next_token(input: &str) -> Option<Token> {
    let first = input.chars().next()?;

    if first == '{' {
        if let Some(end) = balanced_brace_end(input) {
            return Some(Token { len: end, value: input[..end].to_string(), literal: true });
        }
    }

    if first == '\'' || first == '"' {
        if let Some(end) = closing_quote(input, first) {
            let inner = &input[1..end];
            return Some(Token { len: end + 1, value: unescape(inner), literal: true });
        }
    }

    let end = input.find(char::is_whitespace).unwrap_or(input.len());
    let raw = &input[..end];
    Some(Token { len: end, value: unquote(raw), literal: is_wrapped(raw) })
}

/// Byte index just past the `}` matching the leading `{`
fn balanced_brace_end(input: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, c) in input.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(idx + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Byte index of the next unescaped `quote` after the opening one
fn closing_quote(input: &str, quote: char) -> Option<usize> {
    let mut escaped = false;
    for (idx, c) in input.char_indices().skip(1) {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            return Some(idx);
        }
    }
    None
}

fn is_wrapped(raw: &str) -> bool {
    raw.len() >= 2
        && ((raw.starts_with('\'') && raw.ends_with('\'')) || (raw.starts_with('"') && raw.ends_with('"')))
}

fn unescape(s: &str) -> String {
    s.replace("\\'", "'").replace("\\\"", "\"")
}

/// Strips and unescapes a value wrapped in matching quotes; anything else is returned as is
fn unquote(raw: &str) -> String {
    if is_wrapped(raw) {
        unescape(&raw[1..raw.len() - 1])
    } else {
        raw.to_string()
    }
}

/// The whole remainder, unescaped. Outer quotes are stripped only when they
/// enclose all of it.
fn greedy_value(rest: &str) -> String {
    match rest.chars().next() {
        Some(quote @ ('\'' | '"')) if closing_quote(rest, quote) == Some(rest.len() - 1) => {
            unescape(&rest[1..rest.len() - 1])
        }
        _ => unescape(rest),
    }
}

fn coerce(kind: FlagType, raw: &str) -> Option<Value> {
    match kind {
        FlagType::Int => raw.parse::<i64>().ok().map(Value::Int),
        FlagType::Float => raw.parse::<f64>().ok().map(Value::Float),
        FlagType::String => Some(Value::Str(raw.to_string())),
        FlagType::Boolean => Some(Value::Bool(true)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(names: &[&str]) -> Vec<Arg> {
        names.iter().map(|n| Arg::new(*n)).collect()
    }

    fn s(v: &str) -> Value {
        Value::Str(v.to_string())
    }

    #[test]
    fn test_positional_args() {
        let schema = args(&["plugin", "action", "input1", "input2"]);
        let parsed = Tokenizer::new(&schema, &[]).tokenize("core grantUser <@123456789012345678> admin");
        assert_eq!(parsed.arg("plugin"), Some("core"));
        assert_eq!(parsed.arg("action"), Some("grantUser"));
        assert_eq!(parsed.arg("input1"), Some("<@123456789012345678>"));
        assert_eq!(parsed.arg("input2"), Some("admin"));
    }

    #[test]
    fn test_quoted_values() {
        let schema = args(&["a"]);
        let single = Tokenizer::new(&schema, &[]).tokenize("'a b c'");
        let double = Tokenizer::new(&schema, &[]).tokenize("\"a b c\"");
        assert_eq!(single.arg("a"), Some("a b c"));
        assert_eq!(double.arg("a"), Some("a b c"));
    }

    #[test]
    fn test_escaped_quotes() {
        let schema = args(&["a", "b"]);
        let parsed = Tokenizer::new(&schema, &[]).tokenize(r#"'it\'s here' "say \"hi\"""#);
        assert_eq!(parsed.arg("a"), Some("it's here"));
        assert_eq!(parsed.arg("b"), Some("say \"hi\""));
    }

    #[test]
    fn test_internal_quote_left_alone() {
        let schema = args(&["a"]);
        let parsed = Tokenizer::new(&schema, &[]).tokenize("don't");
        assert_eq!(parsed.arg("a"), Some("don't"));
    }

    #[test]
    fn test_braced_value_is_balanced() {
        let schema = args(&["json", "after"]);
        let parsed = Tokenizer::new(&schema, &[]).tokenize(r#"{"a": {"b": 1}} tail"#);
        assert_eq!(parsed.arg("json"), Some(r#"{"a": {"b": 1}}"#));
        assert_eq!(parsed.arg("after"), Some("tail"));
    }

    #[test]
    fn test_greedy_last_arg() {
        let schema = vec![Arg::new("a"), Arg::new("b").greedy()];
        let parsed = Tokenizer::new(&schema, &[]).tokenize("x y z");
        assert_eq!(parsed.arg("a"), Some("x"));
        assert_eq!(parsed.arg("b"), Some("y z"));
    }

    #[test]
    fn test_greedy_remainder_is_unescaped() {
        let schema = vec![Arg::new("a"), Arg::new("b").greedy()];
        let tokenizer = Tokenizer::new(&schema, &[]);
        assert_eq!(tokenizer.tokenize(r"x it\'s fine").arg("b"), Some("it's fine"));
        assert_eq!(tokenizer.tokenize(r#"x say \"hi\" twice"#).arg("b"), Some("say \"hi\" twice"));
    }

    #[test]
    fn test_greedy_keeps_separately_quoted_tokens() {
        let schema = vec![Arg::new("a"), Arg::new("b").greedy()];
        let tokenizer = Tokenizer::new(&schema, &[]);
        assert_eq!(tokenizer.tokenize("x 'a' 'b'").arg("b"), Some("'a' 'b'"));
        assert_eq!(tokenizer.tokenize("x 'a b' ").arg("b"), Some("a b"));
        assert_eq!(tokenizer.tokenize(r"x 'it\'s one'").arg("b"), Some("it's one"));
    }

    #[test]
    fn test_greedy_only_applies_to_last_arg() {
        let schema = vec![Arg::new("a").greedy(), Arg::new("b")];
        let parsed = Tokenizer::new(&schema, &[]).tokenize("x y z");
        assert_eq!(parsed.arg("a"), Some("x"));
        assert_eq!(parsed.arg("b"), Some("y"));
    }

    #[test]
    fn test_unknown_flag_truncates() {
        let schema = args(&["arg"]);
        let parsed = Tokenizer::new(&schema, &[]).tokenize("val1 --unknownFlag val2");
        assert_eq!(parsed.args.len(), 1);
        assert_eq!(parsed.arg("arg"), Some("val1"));
    }

    #[test]
    fn test_boolean_flags_default_false() {
        let flags = vec![Flag::boolean("list").with_alias('l'), Flag::boolean("all")];
        let parsed = Tokenizer::new(&[], &flags).tokenize("-l");
        assert_eq!(parsed.flag("list"), Some(&Value::Bool(true)));
        assert_eq!(parsed.flag("all"), Some(&Value::Bool(false)));
        assert!(parsed.flag_set("list"));
    }

    #[test]
    fn test_typed_flag_values() {
        let flags = vec![
            Flag::new("count", FlagType::Int).with_alias('c'),
            Flag::new("ratio", FlagType::Float),
            Flag::new("name", FlagType::String).with_default("anon"),
        ];
        let schema = args(&["target"]);
        let parsed = Tokenizer::new(&schema, &flags).tokenize("-c 3 --ratio 0.5 bob");
        assert_eq!(parsed.flag("count"), Some(&Value::Int(3)));
        assert_eq!(parsed.flag("ratio"), Some(&Value::Float(0.5)));
        assert_eq!(parsed.flag("name"), Some(&s("anon")));
        assert_eq!(parsed.arg("target"), Some("bob"));
    }

    #[test]
    fn test_pending_flag_followed_by_flag() {
        let flags = vec![Flag::new("name", FlagType::String), Flag::boolean("loud")];
        let parsed = Tokenizer::new(&[], &flags).tokenize("--name --loud");
        assert_eq!(parsed.flag("name"), None);
        assert!(parsed.flag_set("loud"));
    }

    #[test]
    fn test_quoted_flag_lookalike_is_a_value() {
        let schema = args(&["a"]);
        let parsed = Tokenizer::new(&schema, &[]).tokenize("'--help'");
        assert_eq!(parsed.arg("a"), Some("--help"));
    }

    #[test]
    fn test_arg_defaults_seeded() {
        let schema = vec![Arg::new("a"), Arg::new("b").with_default("fallback")];
        let parsed = Tokenizer::new(&schema, &[]).tokenize("only");
        assert_eq!(parsed.arg("a"), Some("only"));
        assert_eq!(parsed.arg("b"), Some("fallback"));
    }

    #[test]
    fn test_rejoined_tokens_reparse_identically() {
        let schema = args(&["a", "b", "c"]);
        let flags = vec![Flag::boolean("list"), Flag::new("count", FlagType::String)];
        let tokenizer = Tokenizer::new(&schema, &flags);
        let first = tokenizer.tokenize("  one   --count 4  two\tthree --list ");
        let rejoined = ["one", "--count", "4", "two", "three", "--list"].join(" ");
        assert_eq!(tokenizer.tokenize(&rejoined), first);
    }

    #[test]
    fn test_strip_prefix_and_split_name() {
        let parser = MessageParser::new(vec!["!".to_string(), "<@1> ".to_string()]);
        assert_eq!(parser.strip_prefix("!help --list"), Some(("!", "help --list")));
        assert_eq!(parser.strip_prefix("<@1> help"), Some(("<@1> ", "help")));
        assert_eq!(parser.strip_prefix("help"), None);
        assert_eq!(MessageParser::split_name("help --list"), Some(("help", " --list")));
        assert_eq!(MessageParser::split_name("   "), None);
    }
}
