//! Console adapter for development/testing

use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, Notify};

use crate::application::errors::BotError;
use crate::domain::entities::{parse_mention, Channel, Guild, Message, Response, Role, User};
use crate::domain::traits::{Target, Transport, TransportEvent};
use crate::infrastructure::config::ConsoleConfig;

/// Reads stdin lines as messages from one user in one guild
pub struct ConsoleTransport {
    config: ConsoleConfig,
    bot_name: String,
    closed: Arc<Notify>,
}

impl ConsoleTransport {
    pub fn new(config: ConsoleConfig, bot_name: impl Into<String>) -> Self {
        Self {
            config,
            bot_name: bot_name.into(),
            closed: Arc::new(Notify::new()),
        }
    }

    fn user(&self) -> User {
        User::new(&self.config.user_id, &self.config.username)
    }

    fn guild(&self) -> Guild {
        Guild::new(&self.config.guild_id, &self.config.guild_name, &self.config.user_id)
    }

    /// Resolves once stdin reaches end of input
    pub async fn closed(&self) {
        self.closed.notified().await
    }

    fn render(response: &Response) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(content) = &response.content {
            lines.push(content.clone());
        }
        if let Some(embed) = &response.embed {
            if let Some(title) = &embed.title {
                lines.push(format!("== {} ==", title));
            }
            if let Some(description) = &embed.description {
                lines.push(description.clone());
            }
            for field in &embed.fields {
                lines.push(format!("[{}]", field.name));
                lines.extend(field.value.lines().map(|l| format!("  {}", l)));
            }
            if let Some(footer) = &embed.footer {
                lines.push(format!("-- {}", footer));
            }
        }
        lines
    }
}

#[async_trait]
impl Transport for ConsoleTransport {
    async fn events(&self) -> Result<mpsc::Receiver<TransportEvent>, BotError> {
        let (tx, rx) = mpsc::channel(32);
        let author = self.user();
        let guild = self.guild();
        let channel = Channel::text(&self.config.channel_id);
        let closed = self.closed.clone();

        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) if line.trim().is_empty() => continue,
                    Ok(Some(line)) => {
                        let message = Message::new(author.clone(), channel.clone(), line).in_guild(guild.clone());
                        if tx.send(TransportEvent::Message(message)).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!("Failed to read stdin: {}", e);
                        break;
                    }
                }
            }
            closed.notify_one();
        });

        Ok(rx)
    }

    async fn login(&self) -> Result<User, BotError> {
        tracing::info!("Starting console bot (dev mode)");
        Ok(User::new("0", &self.bot_name).bot())
    }

    async fn disconnect(&self) -> Result<(), BotError> {
        Ok(())
    }

    async fn fetch_owner(&self) -> Result<Option<User>, BotError> {
        Ok(Some(self.user()))
    }

    async fn guilds(&self) -> Result<Vec<Guild>, BotError> {
        Ok(vec![self.guild()])
    }

    async fn can_send(&self, _channel: &Channel) -> Result<bool, BotError> {
        Ok(true)
    }

    async fn find_member(&self, guild_id: &str, query: &str) -> Result<Option<User>, BotError> {
        let user = self.user();
        let query = parse_mention(query).unwrap_or(query);
        let found = guild_id == self.config.guild_id
            && (user.id == query || user.username.eq_ignore_ascii_case(query));
        Ok(found.then_some(user))
    }

    async fn find_role(&self, _guild_id: &str, _query: &str) -> Result<Option<Role>, BotError> {
        Ok(None)
    }

    async fn send(&self, target: &Target, response: &Response) -> Result<(), BotError> {
        let to = match target {
            Target::Channel(id) => format!("#{}", id),
            Target::User(id) => format!("@{}", id),
        };
        for line in Self::render(response) {
            println!("[BOT {}] {}", to, line);
        }
        Ok(())
    }
}
