//! Lifecycle - building, booting and shutting down a bot
//!
//! `listen` runs the boot sequence once: events, login, owner, data store,
//! join-guild hooks for every joined guild, then the `on_listen` hooks of
//! commands, services, config actions and plugins. Each stage settles every
//! entry before the next one starts; a failing entry is reported to the
//! owner and does not stop its siblings.

use futures_util::future::{join_all, BoxFuture};
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex, OnceCell};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::application::context::BotContext;
use crate::application::errors::BotError;
use crate::application::messaging::{DispatchOutcome, FilterChain, MessageDispatcher};
use crate::application::registry::{LoadedPlugin, Registries};
use crate::domain::entities::{Embed, Guild, Message, Response, User};
use crate::domain::traits::{DataStore, Transport, TransportEvent};
use crate::infrastructure::config::Config;
use crate::infrastructure::storage::JsonStore;
use crate::plugins::builtin;
use crate::plugins::loader::PluginLoader;
use crate::plugins::trait_def::{NoResolver, PluginDescriptor, PluginResolver};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    Starting,
    Listening,
    ShuttingDown,
}

type Hook<'a> = (String, BoxFuture<'a, Result<(), BotError>>);

/// Run every hook of a stage concurrently and wait for all of them.
/// Returns the number of hooks that failed.
async fn settle(ctx: &BotContext, stage: &str, hooks: Vec<Hook<'_>>) -> usize {
    let results = join_all(hooks.into_iter().map(|(entry, hook)| async move {
        let result = match AssertUnwindSafe(hook).catch_unwind().await {
            Ok(result) => result,
            Err(_) => Err(BotError::Internal(format!("{} panicked", entry))),
        };
        (entry, result)
    }))
    .await;

    let mut failures = 0;
    for (entry, result) in results {
        if let Err(e) = result {
            failures += 1;
            warn!("{} failed for {}: {}", stage, entry, e);
            ctx.report_failure(&format!("{} failed", stage), &[("Entry", entry)], &e)
                .await;
        }
    }
    failures
}

async fn plugin_joined(ctx: &BotContext, guild: &Guild, plugin: &LoadedPlugin) -> Result<(), BotError> {
    ctx.guild_settings()?.seed_default_data(ctx, &guild.id, plugin).await?;
    if let Some(hooks) = &plugin.hooks {
        hooks.on_join_guild(ctx, guild).await?;
    }
    Ok(())
}

/// Services first, then plugins (default data, then hooks)
pub(crate) async fn join_guild(ctx: &BotContext, guild: &Guild) -> usize {
    info!("Joining guild {} ({})", guild.name, guild.id);
    let registries = ctx.registries();

    let services: Vec<Hook<'_>> = registries
        .services
        .iter()
        .map(|s| (format!("service {}.{}", s.plugin_name, s.name), s.service.on_join_guild(ctx, guild)))
        .collect();
    let mut failures = settle(ctx, "onJoinGuild", services).await;

    let plugins: Vec<Hook<'_>> = registries
        .plugins
        .iter()
        .map(|p| (format!("plugin {}", p.name), plugin_joined(ctx, guild, p).boxed()))
        .collect();
    failures += settle(ctx, "onJoinGuild", plugins).await;
    failures
}

/// Commands, services, config actions, then plugins
async fn run_on_listen(ctx: &BotContext) -> usize {
    let registries = ctx.registries();
    let mut failures = 0;

    let commands: Vec<Hook<'_>> = registries
        .commands
        .iter()
        .map(|c| (format!("command {}", c.name), c.handler().on_listen(ctx)))
        .collect();
    failures += settle(ctx, "onListen", commands).await;

    let services: Vec<Hook<'_>> = registries
        .services
        .iter()
        .map(|s| (format!("service {}.{}", s.plugin_name, s.name), s.service.on_listen(ctx)))
        .collect();
    failures += settle(ctx, "onListen", services).await;

    let actions: Vec<Hook<'_>> = registries
        .config_actions
        .iter()
        .map(|a| (format!("config action {}", a.qualified_name()), a.handler().on_listen(ctx)))
        .collect();
    failures += settle(ctx, "onListen", actions).await;

    let plugins: Vec<Hook<'_>> = registries
        .plugins
        .iter()
        .filter_map(|p| p.hooks.as_ref().map(|h| (format!("plugin {}", p.name), h.on_listen(ctx))))
        .collect();
    failures += settle(ctx, "onListen", plugins).await;

    failures
}

/// Collects configuration, collaborators and plugins for a [`Bot`]
pub struct BotBuilder {
    id: Uuid,
    config: Config,
    registries: Registries,
    transport: Option<Arc<dyn Transport>>,
    store: Option<Arc<dyn DataStore>>,
    resolver: Box<dyn PluginResolver>,
    filters: Option<FilterChain>,
    core_loaded: bool,
}

impl BotBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            id: Uuid::new_v4(),
            config,
            registries: Registries::new(),
            transport: None,
            store: None,
            resolver: Box::new(NoResolver),
            filters: None,
            core_loaded: false,
        }
    }

    /// Id plugins can be bound to
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Defaults to an in-memory store
    pub fn store(mut self, store: Arc<dyn DataStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Turns package names into plugins
    pub fn resolver(mut self, resolver: impl PluginResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    /// Replace the default filter chain
    pub fn filters(mut self, filters: FilterChain) -> Self {
        self.filters = Some(filters);
        self
    }

    fn ensure_core(&mut self) -> Result<(), BotError> {
        if !self.core_loaded {
            PluginLoader::new(self.id, self.resolver.as_ref(), &mut self.registries).add_plugin(builtin::plugin())?;
            self.core_loaded = true;
        }
        Ok(())
    }

    pub fn add_plugin(&mut self, descriptor: impl Into<PluginDescriptor>) -> Result<Arc<LoadedPlugin>, BotError> {
        self.ensure_core()?;
        PluginLoader::new(self.id, self.resolver.as_ref(), &mut self.registries).add_plugin(descriptor)
    }

    pub fn plugin(mut self, descriptor: impl Into<PluginDescriptor>) -> Result<Self, BotError> {
        self.add_plugin(descriptor)?;
        Ok(self)
    }

    pub fn build(mut self) -> Result<Bot, BotError> {
        self.ensure_core()?;
        let transport = self
            .transport
            .ok_or_else(|| BotError::Lifecycle("no transport configured".to_string()))?;
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(JsonStore::in_memory()) as Arc<dyn DataStore>);
        info!(
            "Built bot {} with {} plugins and {} commands",
            self.config.bot.name,
            self.registries.plugins.len(),
            self.registries.commands.len()
        );

        let ctx = BotContext::new(self.id, self.config, self.registries, transport, store);
        let dispatcher = MessageDispatcher::with_filters(self.filters.unwrap_or_default());
        Ok(Bot::new(ctx, dispatcher))
    }
}

/// A built bot. Listens once; shut down to stop consuming events.
pub struct Bot {
    ctx: Arc<BotContext>,
    dispatcher: Arc<MessageDispatcher>,
    state: watch::Sender<LifecycleState>,
    ready: watch::Sender<Option<Result<(), Arc<BotError>>>>,
    shutdown: watch::Sender<bool>,
    boot: OnceCell<Result<(), Arc<BotError>>>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl Bot {
    fn new(ctx: BotContext, dispatcher: MessageDispatcher) -> Self {
        Self {
            ctx: Arc::new(ctx),
            dispatcher: Arc::new(dispatcher),
            state: watch::Sender::new(LifecycleState::Idle),
            ready: watch::Sender::new(None),
            shutdown: watch::Sender::new(false),
            boot: OnceCell::new(),
            listener: Mutex::new(None),
        }
    }

    pub fn context(&self) -> &Arc<BotContext> {
        &self.ctx
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// Boot the bot. Later calls wait for and return the first call's outcome.
    pub async fn listen(&self) -> Result<(), BotError> {
        let outcome = self
            .boot
            .get_or_init(|| async {
                let outcome = self.boot_sequence().await.map_err(Arc::new);
                self.ready.send_replace(Some(outcome.clone()));
                outcome
            })
            .await;
        outcome.clone().map_err(BotError::Boot)?;

        if *self.shutdown.borrow() {
            return Err(BotError::Lifecycle("bot has already been shut down".to_string()));
        }
        Ok(())
    }

    /// Resolves once booted, also for callers that subscribe late
    pub async fn on_ready(&self) -> Result<(), BotError> {
        let mut ready = self.ready.subscribe();
        let outcome = ready
            .wait_for(Option::is_some)
            .await
            .map_err(|_| BotError::Lifecycle("bot dropped before becoming ready".to_string()))?
            .clone();
        match outcome {
            Some(Err(e)) => Err(BotError::Boot(e)),
            _ => Ok(()),
        }
    }

    async fn boot_sequence(&self) -> Result<(), BotError> {
        self.state.send_replace(LifecycleState::Starting);
        match self.start().await {
            Ok(()) => {
                self.state.send_replace(LifecycleState::Listening);
                info!("{} is listening", self.ctx.config().bot.name);
                Ok(())
            }
            Err(e) => {
                warn!("Boot failed: {}", e);
                self.state.send_replace(LifecycleState::Idle);
                Err(e)
            }
        }
    }

    async fn start(&self) -> Result<(), BotError> {
        let ctx = &self.ctx;
        let events = ctx.transport().events().await?;

        let me = ctx.transport().login().await?;
        info!("Logged in as {} ({})", me.username, me.id);
        ctx.set_user(me);

        let owner = self.resolve_owner().await?;
        info!("Owner is {} ({})", owner.username, owner.id);
        ctx.set_owner(owner);

        ctx.store().ready().await?;

        let guilds = ctx.transport().guilds().await?;
        let mut failures: usize = join_all(guilds.iter().map(|g| join_guild(ctx, g)))
            .await
            .into_iter()
            .sum();
        failures += run_on_listen(ctx).await;

        if ctx.config().bot.startup_summary {
            self.send_startup_summary(guilds.len(), failures).await;
        }

        let handle = self.spawn_listener(events);
        *self.listener.lock().await = Some(handle);
        Ok(())
    }

    async fn resolve_owner(&self) -> Result<User, BotError> {
        if let Some(owner) = self.ctx.transport().fetch_owner().await? {
            return Ok(owner);
        }
        match &self.ctx.config().bot.owner_id {
            Some(id) => Ok(User::new(id, id)),
            None => Err(BotError::Lifecycle("unable to resolve the bot owner".to_string())),
        }
    }

    async fn send_startup_summary(&self, guilds: usize, failures: usize) {
        let registries = self.ctx.registries();
        let mut embed = Embed::new()
            .with_title(format!("{} is online", self.ctx.config().bot.name))
            .with_color(0x2ecc71)
            .add_field("Guilds", guilds.to_string())
            .add_field("Plugins", registries.plugins.len().to_string())
            .add_field("Commands", registries.commands.len().to_string());
        if failures > 0 {
            embed = embed.add_field("Failed hooks", failures.to_string());
        }
        self.ctx.message_owner(&Response::embed(embed)).await;
    }

    fn spawn_listener(&self, mut events: mpsc::Receiver<TransportEvent>) -> JoinHandle<()> {
        let ctx = self.ctx.clone();
        let dispatcher = self.dispatcher.clone();
        let mut shutdown = self.shutdown.subscribe();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    event = events.recv() => match event {
                        Some(TransportEvent::Message(message)) => {
                            let ctx = ctx.clone();
                            let dispatcher = dispatcher.clone();
                            tokio::spawn(async move {
                                let outcome = dispatcher.dispatch(&ctx, message).await;
                                debug!("Dispatch finished: {:?}", outcome);
                            });
                        }
                        Some(TransportEvent::GuildJoin(guild)) => {
                            let ctx = ctx.clone();
                            tokio::spawn(async move {
                                join_guild(&ctx, &guild).await;
                            });
                        }
                        Some(TransportEvent::GuildLeave(guild_id)) => info!("Left guild {}", guild_id),
                        None => {
                            info!("Event stream closed");
                            break;
                        }
                    }
                }
            }
            debug!("Event listener stopped");
        })
    }

    /// Run one message through the pipeline without the event stream
    pub async fn dispatch(&self, message: Message) -> DispatchOutcome {
        self.dispatcher.dispatch(&self.ctx, message).await
    }

    /// Stop consuming events and disconnect. Fails unless listening.
    pub async fn shutdown(&self) -> Result<(), BotError> {
        let mut previous = LifecycleState::Idle;
        let moved = self.state.send_if_modified(|state| {
            previous = *state;
            if *state == LifecycleState::Listening {
                *state = LifecycleState::ShuttingDown;
                true
            } else {
                false
            }
        });
        if !moved {
            return Err(BotError::Lifecycle(format!("cannot shut down while {:?}", previous)));
        }

        info!("Shutting down");
        self.shutdown.send_replace(true);
        if let Some(handle) = self.listener.lock().await.take() {
            if let Err(e) = handle.await {
                warn!("Event listener ended abnormally: {}", e);
            }
        }
        let disconnected = self.ctx.transport().disconnect().await;
        self.state.send_replace(LifecycleState::Idle);
        disconnected
    }
}
