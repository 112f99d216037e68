use super::{Channel, Guild, User};
use chrono::{DateTime, Utc};

/// An inbound chat message as delivered by the transport
#[derive(Debug, Clone)]
pub struct Message {
    pub id: String,
    pub content: String,
    pub author: User,
    pub channel: Channel,
    pub guild: Option<Guild>,
    /// Role ids held by the author in `guild`
    pub member_roles: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(author: User, channel: Channel, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content: content.into(),
            author,
            channel,
            guild: None,
            member_roles: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn in_guild(mut self, guild: Guild) -> Self {
        self.guild = Some(guild);
        self
    }

    pub fn with_roles(mut self, roles: Vec<String>) -> Self {
        self.member_roles = roles;
        self
    }

    pub fn guild_id(&self) -> Option<&str> {
        self.guild.as_ref().map(|g| g.id.as_str())
    }

    pub fn is_direct(&self) -> bool {
        self.guild.is_none()
    }
}
