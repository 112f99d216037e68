use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents a user on the chat service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub nickname: Option<String>,
    pub is_bot: bool,
}

impl User {
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            nickname: None,
            is_bot: false,
        }
    }

    pub fn with_nickname(mut self, nickname: impl Into<String>) -> Self {
        self.nickname = Some(nickname.into());
        self
    }

    pub fn bot(mut self) -> Self {
        self.is_bot = true;
        self
    }

    pub fn display_name(&self) -> &str {
        self.nickname.as_deref().unwrap_or(&self.username)
    }

    /// Mention markup understood by the transport
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Strips mention markup (`<@123>`, `<@!123>`, `<@&123>`) down to the raw id
pub fn parse_mention(input: &str) -> Option<&str> {
    let inner = input.strip_prefix("<@")?.strip_suffix('>')?;
    let id = inner.trim_start_matches(['!', '&']);
    if !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) {
        Some(id)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_prefers_nickname() {
        let user = User::new("1", "alice");
        assert_eq!(user.display_name(), "alice");
        assert_eq!(user.with_nickname("Al").display_name(), "Al");
    }

    #[test]
    fn test_parse_mention() {
        assert_eq!(parse_mention("<@123456789012345678>"), Some("123456789012345678"));
        assert_eq!(parse_mention("<@!42>"), Some("42"));
        assert_eq!(parse_mention("<@&7>"), Some("7"));
        assert_eq!(parse_mention("alice"), None);
        assert_eq!(parse_mention("<@abc>"), None);
    }
}
