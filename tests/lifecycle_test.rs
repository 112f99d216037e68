//! Lifecycle integration tests
//! Run with: cargo test --test lifecycle_test

mod common;

use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::*;
use guildbot::application::BotContext;
use guildbot::domain::entities::{Guild, User};
use guildbot::domain::traits::{DataStore, Target, Transport};
use guildbot::infrastructure::adapters::LoopbackTransport;
use guildbot::infrastructure::storage::JsonStore;
use guildbot::{BotBuilder, BotError, ErrorKind, LifecycleState, Plugin, PluginHooks, Service};

#[derive(Default)]
struct Counters {
    listens: AtomicUsize,
    joins: AtomicUsize,
}

struct CountingHooks {
    counters: Arc<Counters>,
    fail: bool,
}

#[async_trait]
impl PluginHooks for CountingHooks {
    async fn on_listen(&self, _bot: &BotContext) -> Result<(), BotError> {
        self.counters.listens.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(BotError::handler("listen hook failed"));
        }
        Ok(())
    }

    async fn on_join_guild(&self, _bot: &BotContext, _guild: &Guild) -> Result<(), BotError> {
        self.counters.joins.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct PanickingHooks;

#[async_trait]
impl PluginHooks for PanickingHooks {
    async fn on_listen(&self, _bot: &BotContext) -> Result<(), BotError> {
        panic!("hook blew up");
    }
}

fn counted(name: &str, fail: bool) -> (Plugin, Arc<Counters>) {
    let counters = Arc::new(Counters::default());
    let plugin = Plugin::new(name).with_hooks(CountingHooks {
        counters: counters.clone(),
        fail,
    });
    (plugin, counters)
}

async fn wait_until(check: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn test_failing_hook_does_not_stop_boot() {
    let (a, a_count) = counted("a", false);
    let (b, b_count) = counted("b", true);
    let (c, c_count) = counted("c", false);
    let harness = start_with(
        transport(),
        config(),
        vec![a, b, c, Plugin::new("d").with_hooks(PanickingHooks)],
    )
    .await;

    harness.bot.on_ready().await.unwrap();
    assert_eq!(harness.bot.state(), LifecycleState::Listening);
    for counters in [&a_count, &b_count, &c_count] {
        assert_eq!(counters.listens.load(Ordering::SeqCst), 1);
        assert_eq!(counters.joins.load(Ordering::SeqCst), 1);
    }
}

#[tokio::test]
async fn test_hook_failures_are_reported_to_the_owner() {
    ensure_init();
    let (b, _) = counted("b", true);
    let transport = Arc::new(transport());
    let bot = BotBuilder::new(config())
        .transport(transport.clone())
        .plugin(b)
        .unwrap()
        .build()
        .unwrap();
    bot.listen().await.unwrap();

    let reports = transport.sent_to(&Target::User(OWNER_ID.to_string())).await;
    assert_eq!(reports.len(), 1);
    let embed = reports[0].embed.clone().unwrap();
    assert_eq!(embed.title.as_deref(), Some("onListen failed"));
    assert_eq!(embed.field("Entry").unwrap().value, "plugin b");
    assert_eq!(embed.field("Error Message").unwrap().value, "listen hook failed");
}

#[tokio::test]
async fn test_listen_runs_once() {
    ensure_init();
    let (plugin, counters) = counted("once", false);
    let transport = Arc::new(transport());
    let bot = BotBuilder::new(config())
        .transport(transport.clone())
        .plugin(plugin)
        .unwrap()
        .build()
        .unwrap();

    let (first, second) = tokio::join!(bot.listen(), bot.listen());
    first.unwrap();
    second.unwrap();
    bot.listen().await.unwrap();
    assert_eq!(counters.listens.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_on_ready_replays_for_late_subscribers() {
    let harness = start(vec![]).await;
    harness.bot.on_ready().await.unwrap();
    harness.bot.on_ready().await.unwrap();
}

#[tokio::test]
async fn test_shutdown_requires_listening() {
    ensure_init();
    let transport = Arc::new(transport());
    let bot = BotBuilder::new(config()).transport(transport.clone()).build().unwrap();

    let err = bot.shutdown().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Lifecycle);

    bot.listen().await.unwrap();
    assert!(transport.is_connected());
    bot.shutdown().await.unwrap();
    assert_eq!(bot.state(), LifecycleState::Idle);
    assert!(!transport.is_connected());

    assert_eq!(bot.shutdown().await.unwrap_err().kind(), ErrorKind::Lifecycle);
    assert_eq!(bot.listen().await.unwrap_err().kind(), ErrorKind::Lifecycle);
}

#[tokio::test]
async fn test_shutdown_stops_consuming_events() {
    let harness = start(vec![Plugin::new("test").with_command(ping())]).await;
    harness.bot.shutdown().await.unwrap();

    assert!(harness.transport.push_message(message(&member(), "!ping")).await.is_err());
    assert!(harness.transport.sent().await.is_empty());
}

#[tokio::test]
async fn test_owner_is_required() {
    ensure_init();
    let transport = Arc::new(LoopbackTransport::new(User::new(BOT_ID, "guildbot").bot()));
    let bot = BotBuilder::new(config()).transport(transport).build().unwrap();

    let err = bot.listen().await.unwrap_err();
    assert!(matches!(err, BotError::Boot(_)));
    assert_eq!(bot.state(), LifecycleState::Idle);
    assert!(bot.on_ready().await.is_err());
}

#[tokio::test]
async fn test_owner_falls_back_to_config() {
    ensure_init();
    let mut config = config();
    config.bot.owner_id = Some("77".to_string());
    let transport = Arc::new(LoopbackTransport::new(User::new(BOT_ID, "guildbot").bot()));
    let bot = BotBuilder::new(config).transport(transport).build().unwrap();

    bot.listen().await.unwrap();
    assert!(bot.context().is_owner("77"));
}

#[tokio::test]
async fn test_messages_flow_through_the_event_stream() {
    let harness = start(vec![Plugin::new("test").with_command(ping())]).await;
    harness.transport.push_message(message(&member(), "!ping")).await.unwrap();

    let sent = harness
        .transport
        .wait_for_sent(1, Duration::from_secs(2))
        .await
        .unwrap();
    assert_eq!(sent[0].1.content.as_deref(), Some("pong"));
}

#[tokio::test]
async fn test_default_data_is_seeded_on_join() {
    ensure_init();
    let (plugin, counters) = counted("greeter", false);
    let plugin = plugin.with_default_data("greeter.message", json!("Welcome!"));
    let store = Arc::new(JsonStore::in_memory());
    store.set(GUILD_ID, "greeter.message", json!("Custom")).await.unwrap();

    let transport = Arc::new(transport());
    let bot = BotBuilder::new(config())
        .transport(transport.clone())
        .store(store.clone())
        .plugin(plugin)
        .unwrap()
        .build()
        .unwrap();
    bot.listen().await.unwrap();

    // existing keys are kept
    assert_eq!(store.get(GUILD_ID, "greeter.message").await.unwrap(), Some(json!("Custom")));

    transport.join_guild(Guild::new("g2", "Second", "500")).await.unwrap();
    wait_until(|| counters.joins.load(Ordering::SeqCst) == 2).await;
    assert_eq!(store.get("g2", "greeter.message").await.unwrap(), Some(json!("Welcome!")));
}

#[tokio::test]
async fn test_startup_summary() {
    ensure_init();
    let mut config = config();
    config.bot.startup_summary = true;
    let transport = Arc::new(transport());
    let bot = BotBuilder::new(config).transport(transport.clone()).build().unwrap();
    bot.listen().await.unwrap();

    let sent = transport.sent().await;
    let embed = sent[0].1.embed.clone().unwrap();
    assert_eq!(embed.title.as_deref(), Some("guildbot is online"));
    assert_eq!(embed.field("Guilds").unwrap().value, "1");
    assert_eq!(embed.field("Plugins").unwrap().value, "1");
}

#[derive(Debug)]
struct Counter {
    listens: AtomicUsize,
}

#[async_trait]
impl Service for Counter {
    fn name(&self) -> &str {
        "Counter"
    }

    async fn on_listen(&self, _bot: &BotContext) -> Result<(), BotError> {
        self.listens.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn test_services_are_looked_up_by_type() {
    let harness = start(vec![Plugin::new("stats").with_service(Counter {
        listens: AtomicUsize::new(0),
    })])
    .await;
    let ctx = harness.bot.context();

    let counter = ctx.service::<Counter>("Stats", "counter").unwrap();
    assert_eq!(counter.listens.load(Ordering::SeqCst), 1);

    let wrong_type = ctx.service::<guildbot::application::services::PermissionsService>("stats", "counter");
    assert!(matches!(wrong_type, Err(e) if e.kind() == ErrorKind::Type));
    let missing = ctx.service::<Counter>("stats", "missing");
    assert!(matches!(missing, Err(e) if e.kind() == ErrorKind::NotFound));
}

#[tokio::test]
async fn test_plugins_bound_to_another_bot_are_rejected() {
    ensure_init();
    let mut builder = BotBuilder::new(config());
    let err = builder
        .add_plugin(Plugin::new("stranger").bind(uuid::Uuid::new_v4()))
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::Type);

    let id = builder.id();
    assert!(builder.add_plugin(Plugin::new("mine").bind(id)).is_ok());
}

#[tokio::test]
async fn test_build_requires_transport() {
    let err = BotBuilder::new(config()).build().err().unwrap();
    assert_eq!(err.kind(), ErrorKind::Lifecycle);
}

#[tokio::test]
async fn test_transport_failures_fail_boot() {
    ensure_init();
    let transport = Arc::new(transport());
    // events can only be taken once
    transport.events().await.unwrap();
    let bot = BotBuilder::new(config()).transport(transport).build().unwrap();
    assert!(matches!(bot.listen().await, Err(BotError::Boot(_))));
}
