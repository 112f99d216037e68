use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::application::errors::BotError;
use crate::domain::entities::{Channel, Guild, Message, Response, Role, User};

/// Events emitted by a transport once connected
#[derive(Debug, Clone)]
pub enum TransportEvent {
    Message(Message),
    GuildJoin(Guild),
    GuildLeave(String),
}

/// Where a resolved [`Response`] is delivered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Channel(String),
    User(String),
}

/// Transport trait - abstraction over the chat service connection
#[async_trait]
pub trait Transport: Send + Sync {
    /// Stream of inbound events; may only be taken once
    async fn events(&self) -> Result<mpsc::Receiver<TransportEvent>, BotError>;

    /// Connect and return the bot's own user
    async fn login(&self) -> Result<User, BotError>;

    async fn disconnect(&self) -> Result<(), BotError>;

    /// The account that owns the bot application
    async fn fetch_owner(&self) -> Result<Option<User>, BotError>;

    /// Guilds already joined at login
    async fn guilds(&self) -> Result<Vec<Guild>, BotError>;

    /// Whether the bot may post in `channel`
    async fn can_send(&self, channel: &Channel) -> Result<bool, BotError>;

    /// Resolve a mention, id or username to a guild member
    async fn find_member(&self, guild_id: &str, query: &str) -> Result<Option<User>, BotError>;

    /// Resolve a mention, id or name to a guild role
    async fn find_role(&self, guild_id: &str, query: &str) -> Result<Option<Role>, BotError>;

    async fn send(&self, target: &Target, response: &Response) -> Result<(), BotError>;
}
