//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::sync::{Arc, Once};

use guildbot::domain::entities::{handler_fn, Channel, Command, Guild, Message, Response, User};
use guildbot::domain::traits::Target;
use guildbot::infrastructure::adapters::LoopbackTransport;
use guildbot::infrastructure::storage::JsonStore;
use guildbot::{Bot, BotBuilder, Config, Plugin};

static INIT: Once = Once::new();

pub fn ensure_init() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub const BOT_ID: &str = "1";
pub const OWNER_ID: &str = "100";
pub const GUILD_OWNER_ID: &str = "200";
pub const ADMIN_ID: &str = "300";
pub const MEMBER_ID: &str = "400";
pub const GUILD_ID: &str = "g1";
pub const CHANNEL_ID: &str = "c1";

pub fn owner() -> User {
    User::new(OWNER_ID, "owner")
}

pub fn guild_owner() -> User {
    User::new(GUILD_OWNER_ID, "landlord")
}

pub fn admin() -> User {
    User::new(ADMIN_ID, "root")
}

pub fn member() -> User {
    User::new(MEMBER_ID, "alice")
}

pub fn guild() -> Guild {
    Guild::new(GUILD_ID, "Test Guild", GUILD_OWNER_ID)
}

pub fn message(author: &User, content: &str) -> Message {
    Message::new(author.clone(), Channel::text(CHANNEL_ID), content).in_guild(guild())
}

pub fn channel() -> Target {
    Target::Channel(CHANNEL_ID.to_string())
}

pub fn transport() -> LoopbackTransport {
    LoopbackTransport::new(User::new(BOT_ID, "guildbot").bot())
        .with_owner(owner())
        .with_guild(guild())
        .with_member(GUILD_ID, guild_owner())
        .with_member(GUILD_ID, admin())
        .with_member(GUILD_ID, member())
}

pub fn config() -> Config {
    let mut config = Config::default();
    config.bot.startup_summary = false;
    config
}

/// `ping` replies `pong`
pub fn ping() -> Command {
    Command::new("ping", handler_fn(|_ctx| async { Ok(Response::message("pong")) }))
        .with_description("Replies with pong")
}

pub struct Harness {
    pub bot: Bot,
    pub transport: Arc<LoopbackTransport>,
}

impl Harness {
    pub async fn sent_to_channel(&self) -> Vec<Response> {
        self.transport.sent_to(&channel()).await
    }

    pub async fn sent_to_owner(&self) -> Vec<Response> {
        self.transport.sent_to(&Target::User(OWNER_ID.to_string())).await
    }
}

/// A listening bot with `plugins` loaded on top of core
pub async fn start(plugins: Vec<Plugin>) -> Harness {
    start_with(transport(), config(), plugins).await
}

pub async fn start_with(transport: LoopbackTransport, config: Config, plugins: Vec<Plugin>) -> Harness {
    ensure_init();
    let transport = Arc::new(transport);
    let mut builder = BotBuilder::new(config)
        .transport(transport.clone())
        .store(Arc::new(JsonStore::in_memory()));
    for plugin in plugins {
        builder.add_plugin(plugin).unwrap();
    }
    let bot = builder.build().unwrap();
    bot.listen().await.unwrap();
    transport.clear_sent().await;
    Harness { bot, transport }
}
