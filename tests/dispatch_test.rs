//! Dispatch pipeline integration tests
//! Run with: cargo test --test dispatch_test

mod common;

use common::*;
use guildbot::domain::entities::{handler_fn, Arg, Command, Response, ResponseType};
use guildbot::{BotError, DispatchOutcome, ErrorKind, Plugin};

fn test_plugin() -> Plugin {
    Plugin::new("test").with_command(ping())
}

async fn grant_admin(harness: &Harness, user: &guildbot::domain::entities::User) {
    let ctx = harness.bot.context();
    ctx.permissions()
        .unwrap()
        .add_user(ctx, GUILD_ID, "admin", user)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_grant_user_through_config() {
    let harness = start(vec![]).await;
    grant_admin(&harness, &admin()).await;

    let outcome = harness
        .bot
        .dispatch(message(&admin(), &format!("!config core grantUser <@{}> admin", MEMBER_ID)))
        .await;
    assert_eq!(outcome, DispatchOutcome::Completed);

    let sent = harness.sent_to_channel().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind, ResponseType::Reply);
    assert_eq!(sent[0].content.as_deref(), Some("Added alice to admin"));

    let ctx = harness.bot.context();
    let level = ctx.permissions().unwrap().get_level(ctx, GUILD_ID, "admin").await.unwrap();
    assert!(level.users.contains(&MEMBER_ID.to_string()));
}

#[tokio::test]
async fn test_grant_user_twice_is_reported_to_the_user() {
    let harness = start(vec![]).await;
    let command = format!("!config core grantUser {} admin", MEMBER_ID);

    harness.bot.dispatch(message(&guild_owner(), &command)).await;
    let outcome = harness.bot.dispatch(message(&guild_owner(), &command)).await;
    assert_eq!(outcome, DispatchOutcome::Completed);

    let sent = harness.sent_to_channel().await;
    assert_eq!(
        sent[1].content.as_deref(),
        Some("User is already added to the permission level (admin)")
    );
    assert!(harness.sent_to_owner().await.is_empty());
}

#[tokio::test]
async fn test_unknown_user_is_reported_to_the_user() {
    let harness = start(vec![]).await;
    harness
        .bot
        .dispatch(message(&guild_owner(), "!config core grantUser <@999> admin"))
        .await;

    let sent = harness.sent_to_channel().await;
    assert_eq!(sent[0].content.as_deref(), Some("The user '999' could not be found."));
}

#[tokio::test]
async fn test_config_is_silent_for_members() {
    let harness = start(vec![]).await;
    let outcome = harness
        .bot
        .dispatch(message(&member(), &format!("!config core grantUser {} admin", MEMBER_ID)))
        .await;
    assert_eq!(outcome, DispatchOutcome::Dropped("has-permission"));
    assert!(harness.transport.sent().await.is_empty());
}

#[tokio::test]
async fn test_help_omits_disabled_plugins() {
    let harness = start(vec![test_plugin()]).await;

    harness.bot.dispatch(message(&member(), "!help")).await;
    let embed = harness.sent_to_channel().await[0].embed.clone().unwrap();
    assert!(embed.field("test").unwrap().value.contains("!ping"));
    assert!(embed.field("core").is_some());

    let ctx = harness.bot.context();
    ctx.plugin_service().unwrap().disable_plugin(ctx, GUILD_ID, "test").await.unwrap();
    harness.transport.clear_sent().await;

    harness.bot.dispatch(message(&member(), "!help")).await;
    let embed = harness.sent_to_channel().await[0].embed.clone().unwrap();
    assert!(embed.field("test").is_none());
    assert!(embed.fields.iter().all(|f| !f.value.contains("ping")));
}

#[tokio::test]
async fn test_help_for_one_command() {
    let harness = start(vec![test_plugin()]).await;
    let outcome = harness.bot.dispatch(message(&member(), "!help ping")).await;
    assert_eq!(outcome, DispatchOutcome::Completed);

    let embed = harness.sent_to_channel().await[0].embed.clone().unwrap();
    assert_eq!(embed.title.as_deref(), Some("ping"));
    assert_eq!(embed.field("Usage").unwrap().value, "!ping");
}

#[tokio::test]
async fn test_help_list_flag() {
    let harness = start(vec![test_plugin()]).await;
    let outcome = harness.bot.dispatch(message(&member(), "!help --list")).await;
    assert_eq!(outcome, DispatchOutcome::Completed);

    let embed = harness.sent_to_channel().await[0].embed.clone().unwrap();
    assert!(embed.fields.is_empty());
    let listing = embed.description.unwrap();
    let lines: Vec<&str> = listing.lines().collect();
    assert!(lines.contains(&"`!help`"));
    assert!(lines.contains(&"`!ping`"));
    assert!(!listing.contains("owner:listGuilds"));

    harness.transport.clear_sent().await;
    harness.bot.dispatch(message(&member(), "!help -l")).await;
    let embed = harness.sent_to_channel().await[0].embed.clone().unwrap();
    assert_eq!(embed.description.as_deref(), Some(listing.as_str()));
}

#[tokio::test]
async fn test_enablement_precedence() {
    let harness = start(vec![test_plugin()]).await;
    let ctx = harness.bot.context();
    let commands = ctx.command_service().unwrap();
    let plugins = ctx.plugin_service().unwrap();

    // never set: follows the plugin
    assert_eq!(harness.bot.dispatch(message(&member(), "!ping")).await, DispatchOutcome::Completed);

    commands.disable_command(ctx, GUILD_ID, "ping").await.unwrap();
    assert_eq!(
        harness.bot.dispatch(message(&member(), "!ping")).await,
        DispatchOutcome::Dropped("command-enabled")
    );

    commands.enable_command(ctx, GUILD_ID, "ping").await.unwrap();
    plugins.disable_plugin(ctx, GUILD_ID, "test").await.unwrap();
    assert!(!commands.is_command_enabled(ctx, GUILD_ID, "ping").await.unwrap());
    assert_eq!(
        harness.bot.dispatch(message(&member(), "!ping")).await,
        DispatchOutcome::Dropped("command-enabled")
    );

    plugins.enable_plugin(ctx, GUILD_ID, "test").await.unwrap();
    assert_eq!(harness.bot.dispatch(message(&member(), "!ping")).await, DispatchOutcome::Completed);
}

#[tokio::test]
async fn test_required_commands_and_core_stay_enabled() {
    let harness = start(vec![]).await;
    let ctx = harness.bot.context();

    let err = ctx
        .command_service()
        .unwrap()
        .disable_command(ctx, GUILD_ID, "HELP")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Denied);

    let err = ctx
        .plugin_service()
        .unwrap()
        .disable_plugin(ctx, GUILD_ID, "core")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Denied);
}

#[tokio::test]
async fn test_owner_and_guild_owner_bypass_levels() {
    let secret = Command::new("secret", handler_fn(|_ctx| async { Ok(Response::message("ok")) }))
        .with_permission("mod");
    let harness = start(vec![Plugin::new("test").with_command(secret)]).await;

    assert_eq!(
        harness.bot.dispatch(message(&member(), "!secret")).await,
        DispatchOutcome::Dropped("has-permission")
    );
    assert_eq!(harness.bot.dispatch(message(&owner(), "!secret")).await, DispatchOutcome::Completed);
    assert_eq!(
        harness.bot.dispatch(message(&guild_owner(), "!secret")).await,
        DispatchOutcome::Completed
    );

    let ctx = harness.bot.context();
    ctx.permissions().unwrap().add_user(ctx, GUILD_ID, "mod", &member()).await.unwrap();
    assert_eq!(harness.bot.dispatch(message(&member(), "!secret")).await, DispatchOutcome::Completed);
}

#[tokio::test]
async fn test_roles_grant_levels() {
    let secret = Command::new("secret", handler_fn(|_ctx| async { Ok(Response::message("ok")) }))
        .with_permission("mod");
    let transport = transport().with_role(GUILD_ID, guildbot::domain::entities::Role::new("r1", "Moderators"));
    let harness = start_with(transport, config(), vec![Plugin::new("test").with_command(secret)]).await;

    harness
        .bot
        .dispatch(message(&guild_owner(), "!config core grantRole Moderators mod"))
        .await;
    assert_eq!(
        harness.sent_to_channel().await[0].content.as_deref(),
        Some("Added role Moderators to mod")
    );

    let with_role = message(&member(), "!secret").with_roles(vec!["r1".to_string()]);
    assert_eq!(harness.bot.dispatch(with_role).await, DispatchOutcome::Completed);
    assert_eq!(
        harness.bot.dispatch(message(&member(), "!secret")).await,
        DispatchOutcome::Dropped("has-permission")
    );
}

#[tokio::test]
async fn test_owner_only_commands() {
    let harness = start(vec![]).await;
    assert_eq!(
        harness.bot.dispatch(message(&guild_owner(), "!owner:listGuilds")).await,
        DispatchOutcome::Dropped("has-permission")
    );
    assert_eq!(
        harness.bot.dispatch(message(&owner(), "!owner:listguilds")).await,
        DispatchOutcome::Completed
    );
    let embed = harness.sent_to_channel().await[0].embed.clone().unwrap();
    assert!(embed.description.unwrap().contains("Test Guild (g1)"));
}

#[tokio::test]
async fn test_missing_args_and_help_flag() {
    let echo = Command::new(
        "echo",
        handler_fn(|ctx| async move { Ok(Response::message(ctx.arg("text").unwrap_or_default().to_string())) }),
    )
    .with_arg(Arg::new("text").required().greedy());
    let harness = start(vec![Plugin::new("test").with_command(echo)]).await;

    assert_eq!(
        harness.bot.dispatch(message(&member(), "!echo")).await,
        DispatchOutcome::MissingArgs(vec!["text".to_string()])
    );
    assert_eq!(harness.bot.dispatch(message(&member(), "!echo --help")).await, DispatchOutcome::Help);
    assert_eq!(
        harness.bot.dispatch(message(&member(), "!echo hello  big world")).await,
        DispatchOutcome::Completed
    );

    let sent = harness.sent_to_channel().await;
    assert_eq!(
        sent[0].embed.as_ref().unwrap().title.as_deref(),
        Some("Missing required arguments: text")
    );
    assert_eq!(sent[1].embed.as_ref().unwrap().title.as_deref(), Some("echo"));
    assert_eq!(sent[2].content.as_deref(), Some("hello  big world"));
}

#[tokio::test]
async fn test_handler_error_apologises_and_reports() {
    let boom = Command::new(
        "boom",
        handler_fn(|_ctx| async { Err::<Response, _>(BotError::handler("kaboom")) }),
    );
    let harness = start(vec![Plugin::new("test").with_command(boom)]).await;

    assert_eq!(harness.bot.dispatch(message(&member(), "!boom now")).await, DispatchOutcome::Failed);

    let sent = harness.sent_to_channel().await;
    assert_eq!(
        sent[0].content.as_deref(),
        Some("I'm sorry, but there was an unexpected error while running that command.")
    );
    assert!(!sent[0].content.as_deref().unwrap().contains("kaboom"));

    let reports = harness.sent_to_owner().await;
    let embed = reports[0].embed.clone().unwrap();
    assert_eq!(embed.field("Error Name").unwrap().value, "Error");
    assert_eq!(embed.field("Error Message").unwrap().value, "kaboom");
    assert_eq!(embed.field("Command").unwrap().value, "!boom now");
    assert_eq!(embed.field("User").unwrap().value, "alice (400)");
}

#[tokio::test]
async fn test_non_commands_are_ignored() {
    let harness = start(vec![test_plugin()]).await;

    assert_eq!(harness.bot.dispatch(message(&member(), "hello there")).await, DispatchOutcome::Ignored);
    assert_eq!(harness.bot.dispatch(message(&member(), "!nope")).await, DispatchOutcome::Ignored);
    assert_eq!(harness.bot.dispatch(message(&member(), "!")).await, DispatchOutcome::Ignored);

    let bot_user = harness.transport.bot_user().clone();
    assert_eq!(harness.bot.dispatch(message(&bot_user, "!ping")).await, DispatchOutcome::Ignored);
    assert!(harness.transport.sent().await.is_empty());
}

#[tokio::test]
async fn test_mention_prefix() {
    let harness = start(vec![test_plugin()]).await;
    let mentioned = format!("<@{}> ping", BOT_ID);
    assert_eq!(harness.bot.dispatch(message(&member(), &mentioned)).await, DispatchOutcome::Completed);
    let nickname = format!("<@!{}> PING", BOT_ID);
    assert_eq!(harness.bot.dispatch(message(&member(), &nickname)).await, DispatchOutcome::Completed);
}

#[tokio::test]
async fn test_guild_prefix() {
    let harness = start(vec![test_plugin()]).await;
    harness.bot.dispatch(message(&guild_owner(), "!config core setPrefix ?")).await;
    assert_eq!(
        harness.sent_to_channel().await[0].content.as_deref(),
        Some("The prefix is now ?")
    );

    assert_eq!(harness.bot.dispatch(message(&member(), "?ping")).await, DispatchOutcome::Completed);
    assert_eq!(harness.bot.dispatch(message(&member(), "!ping")).await, DispatchOutcome::Ignored);
}

#[tokio::test]
async fn test_muted_channel_drops_silently() {
    let harness = start(vec![test_plugin()]).await;
    harness.transport.mute_channel(CHANNEL_ID).await;
    assert_eq!(
        harness.bot.dispatch(message(&member(), "!ping")).await,
        DispatchOutcome::Dropped("can-send-message")
    );
    assert!(harness.transport.sent().await.is_empty());
}

#[tokio::test]
async fn test_config_lists_actions() {
    let harness = start(vec![]).await;
    harness.bot.dispatch(message(&guild_owner(), "!config core")).await;
    let embed = harness.sent_to_channel().await[0].embed.clone().unwrap();
    let core = &embed.field("core").unwrap().value;
    assert!(core.contains("grantUser"));
    assert!(core.contains("listPermissions"));
}

#[tokio::test]
async fn test_config_action_missing_args() {
    let harness = start(vec![]).await;
    let outcome = harness
        .bot
        .dispatch(message(&guild_owner(), &format!("!config core grantUser {}", MEMBER_ID)))
        .await;
    assert_eq!(outcome, DispatchOutcome::Completed);
    let embed = harness.sent_to_channel().await[0].embed.clone().unwrap();
    assert_eq!(embed.title.as_deref(), Some("Missing required arguments: level"));
}
