//! Loopback adapter - an in-process transport fed programmatically

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, Notify, RwLock};

use crate::application::errors::BotError;
use crate::domain::entities::{parse_mention, Channel, Guild, Message, Response, Role, User};
use crate::domain::traits::{Target, Transport, TransportEvent};

const EVENT_BUFFER: usize = 256;

/// Transport that records every response it is asked to deliver
pub struct LoopbackTransport {
    user: User,
    owner: Option<User>,
    guilds: RwLock<Vec<Guild>>,
    members: RwLock<HashMap<String, Vec<User>>>,
    roles: RwLock<HashMap<String, Vec<Role>>>,
    muted: RwLock<HashSet<String>>,
    sent: RwLock<Vec<(Target, Response)>>,
    delivered: Notify,
    events_tx: mpsc::Sender<TransportEvent>,
    events_rx: Mutex<Option<mpsc::Receiver<TransportEvent>>>,
    connected: AtomicBool,
}

impl LoopbackTransport {
    pub fn new(user: User) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        Self {
            user,
            owner: None,
            guilds: RwLock::new(Vec::new()),
            members: RwLock::new(HashMap::new()),
            roles: RwLock::new(HashMap::new()),
            muted: RwLock::new(HashSet::new()),
            sent: RwLock::new(Vec::new()),
            delivered: Notify::new(),
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
            connected: AtomicBool::new(false),
        }
    }

    pub fn with_owner(mut self, owner: User) -> Self {
        self.owner = Some(owner);
        self
    }

    /// A guild that is already joined at login
    pub fn with_guild(mut self, guild: Guild) -> Self {
        self.guilds.get_mut().push(guild);
        self
    }

    pub fn with_member(mut self, guild_id: &str, user: User) -> Self {
        self.members.get_mut().entry(guild_id.to_string()).or_default().push(user);
        self
    }

    pub fn with_role(mut self, guild_id: &str, role: Role) -> Self {
        self.roles.get_mut().entry(guild_id.to_string()).or_default().push(role);
        self
    }

    pub fn bot_user(&self) -> &User {
        &self.user
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Deliver an inbound message to the bot
    pub async fn push_message(&self, message: Message) -> Result<(), BotError> {
        self.emit(TransportEvent::Message(message)).await
    }

    /// Join a new guild after login
    pub async fn join_guild(&self, guild: Guild) -> Result<(), BotError> {
        self.guilds.write().await.push(guild.clone());
        self.emit(TransportEvent::GuildJoin(guild)).await
    }

    pub async fn add_member(&self, guild_id: &str, user: User) {
        self.members.write().await.entry(guild_id.to_string()).or_default().push(user);
    }

    /// The bot loses send permission in `channel_id`
    pub async fn mute_channel(&self, channel_id: &str) {
        self.muted.write().await.insert(channel_id.to_string());
    }

    async fn emit(&self, event: TransportEvent) -> Result<(), BotError> {
        self.events_tx
            .send(event)
            .await
            .map_err(|_| BotError::Transport("event stream closed".to_string()))
    }

    /// Everything delivered so far
    pub async fn sent(&self) -> Vec<(Target, Response)> {
        self.sent.read().await.clone()
    }

    pub async fn sent_to(&self, target: &Target) -> Vec<Response> {
        self.sent
            .read()
            .await
            .iter()
            .filter(|(t, _)| t == target)
            .map(|(_, r)| r.clone())
            .collect()
    }

    pub async fn clear_sent(&self) {
        self.sent.write().await.clear();
    }

    /// Wait until at least `count` responses were delivered
    pub async fn wait_for_sent(&self, count: usize, timeout: Duration) -> Result<Vec<(Target, Response)>, BotError> {
        tokio::time::timeout(timeout, async {
            loop {
                let notified = self.delivered.notified();
                {
                    let sent = self.sent.read().await;
                    if sent.len() >= count {
                        return sent.clone();
                    }
                }
                notified.await;
            }
        })
        .await
        .map_err(|_| BotError::Transport(format!("expected {} responses before timeout", count)))
    }
}

fn matches_query(id: &str, name: &str, query: &str) -> bool {
    let query = parse_mention(query).unwrap_or(query);
    id == query || name.eq_ignore_ascii_case(query)
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn events(&self) -> Result<mpsc::Receiver<TransportEvent>, BotError> {
        self.events_rx
            .lock()
            .await
            .take()
            .ok_or_else(|| BotError::Transport("event stream already taken".to_string()))
    }

    async fn login(&self) -> Result<User, BotError> {
        self.connected.store(true, Ordering::SeqCst);
        tracing::debug!("Loopback transport logged in as {}", self.user.username);
        Ok(self.user.clone())
    }

    async fn disconnect(&self) -> Result<(), BotError> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn fetch_owner(&self) -> Result<Option<User>, BotError> {
        Ok(self.owner.clone())
    }

    async fn guilds(&self) -> Result<Vec<Guild>, BotError> {
        Ok(self.guilds.read().await.clone())
    }

    async fn can_send(&self, channel: &Channel) -> Result<bool, BotError> {
        Ok(!self.muted.read().await.contains(&channel.id))
    }

    async fn find_member(&self, guild_id: &str, query: &str) -> Result<Option<User>, BotError> {
        Ok(self.members.read().await.get(guild_id).and_then(|members| {
            members
                .iter()
                .find(|u| matches_query(&u.id, &u.username, query))
                .cloned()
        }))
    }

    async fn find_role(&self, guild_id: &str, query: &str) -> Result<Option<Role>, BotError> {
        Ok(self.roles.read().await.get(guild_id).and_then(|roles| {
            roles
                .iter()
                .find(|r| matches_query(&r.id, &r.name, query))
                .cloned()
        }))
    }

    async fn send(&self, target: &Target, response: &Response) -> Result<(), BotError> {
        self.sent.write().await.push((target.clone(), response.clone()));
        self.delivered.notify_waiters();
        Ok(())
    }
}
