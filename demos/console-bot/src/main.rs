//! Console Bot
//!
//! Drives the sparkl command engine from a terminal. Every line typed on
//! stdin becomes a message from one user in `#general` of a small in-memory
//! guild; replies are printed to stdout.
//!
//! # Commands
//!
//! ```text
//! !ping                         pong
//! !echo <text...>               repeat text
//! !add <a> <b>                  integer sum
//! !mod ban <user> [reason...]   level 5
//! !mod mute <user> <duration>   level 5, custom `duration` type (10m, 2h)
//! !config prefix <prefix>       level 10, changes this guild's prefix
//! !hello                        from the `greeter` plugin
//! ```
//!
//! # Usage
//!
//! ```bash
//! cargo run --package console-bot -- --moderator
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use clap::Parser;
use futures::stream;
use serde::Deserialize;
use sparkl::core::TransportResult;
use sparkl::framework::MatchError;
use sparkl::prelude::*;
use sparkl::runtime::{ConfigLoader, logging};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

const GUILD: u64 = 1;
const GENERAL: u64 = 10;
const MODERATOR_ROLE: u64 = 500;
const ADMIN: u64 = 1;

#[derive(Parser, Debug)]
#[command(about = "Type messages as a guild member and watch sparkl answer")]
struct Cli {
    /// Configuration file (defaults to searching for sparkl.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// User id the typed lines are sent as (100 = alice, 200 = bob, 1 = admin)
    #[arg(short, long, default_value_t = 100)]
    user: u64,

    /// Send lines with the moderator role
    #[arg(short, long)]
    moderator: bool,
}

// ============================================================================
// Chat Client
// ============================================================================

/// Prints outgoing messages and serves one fixed guild.
struct ConsoleClient {
    guild: Arc<GuildSnapshot>,
}

#[async_trait]
impl ChatClient for ConsoleClient {
    async fn send(&self, channel: Snowflake, content: &str) -> TransportResult<()> {
        let name = self
            .guild
            .channel(channel)
            .map_or_else(|| channel.to_string(), |c| c.name);
        println!("[#{name}] {content}");
        Ok(())
    }

    async fn guild(&self, _guild: Snowflake) -> TransportResult<Arc<dyn GuildLookup>> {
        Ok(self.guild.clone())
    }
}

fn demo_guild() -> GuildSnapshot {
    let member = |id: u64, username: &str, nickname: Option<&str>, roles: Vec<Snowflake>| {
        sparkl::core::Member {
            id: id.into(),
            username: username.to_string(),
            nickname: nickname.map(str::to_string),
            roles,
        }
    };
    GuildSnapshot::new(GUILD)
        .with_channel(GENERAL, "general")
        .with_channel(11u64, "mod-log")
        .with_role(MODERATOR_ROLE, "moderator")
        .with_member(member(ADMIN, "admin", None, Vec::new()))
        .with_member(member(100, "alice", None, Vec::new()))
        .with_member(member(200, "bob", Some("Bobby"), Vec::new()))
        .with_member(member(300, "mallory", None, vec![MODERATOR_ROLE.into()]))
}

fn demo_guild_config(prefix: &str) -> GuildConfig {
    GuildConfig::with_prefix(prefix).permissions(
        PermissionConfig::default()
            .with_user(ADMIN, 10)
            .with_role(MODERATOR_ROLE, 5),
    )
}

// ============================================================================
// Handlers
// ============================================================================

async fn ping(ctx: CommandContext, _args: Arguments) -> HandlerResult {
    ctx.reply("pong").await?;
    Ok(())
}

async fn echo(ctx: CommandContext, args: Arguments) -> HandlerResult {
    ctx.reply(args.str("text").unwrap_or_default()).await?;
    Ok(())
}

async fn add(ctx: CommandContext, args: Arguments) -> HandlerResult {
    let a = args.integer("a").unwrap_or_default();
    let b = args.integer("b").unwrap_or_default();
    let sum = a.checked_add(b).ok_or("integer overflow")?;
    ctx.reply(sum.to_string()).await?;
    Ok(())
}

async fn ban(ctx: CommandContext, args: Arguments) -> HandlerResult {
    let Some(member) = args.member("user") else {
        return Ok(());
    };
    let reason = args.str("reason").unwrap_or("no reason given");
    ctx.reply(format!(
        ":hammer: {} was banned by {} ({reason})",
        member.display_name(),
        ctx.author().name
    ))
    .await?;
    Ok(())
}

async fn mute(ctx: CommandContext, args: Arguments) -> HandlerResult {
    let member = args.member("user").map(|m| m.display_name().to_string());
    let duration = args
        .named("time")
        .and_then(|v| v.downcast_ref::<Duration>())
        .copied();
    if let (Some(member), Some(duration)) = (member, duration) {
        ctx.reply(format!(":mute: {member} muted for {}s", duration.as_secs()))
            .await?;
    }
    Ok(())
}

async fn set_prefix(
    provider: Arc<StaticConfigProvider>,
    ctx: CommandContext,
    args: Arguments,
) -> HandlerResult {
    let (Some(guild), Some(prefix)) = (ctx.message().guild_id, args.str("prefix")) else {
        return Ok(());
    };
    let mut config = ctx.config().clone();
    config.prefix = prefix.to_string();
    provider.set_guild_config(guild, config);
    ctx.reply(format!("Prefix is now `{prefix}`")).await?;
    Ok(())
}

/// Parses `90`, `90s`, `10m`, `2h` or `1d`.
fn duration(_guild: &dyn GuildLookup, token: &str) -> Result<TypedValue, MatchError> {
    let invalid = || MatchError::new(format!("could not parse `{token}` to type `duration`"));
    let split = token
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(token.len());
    let (digits, unit) = token.split_at(split);
    let amount: u64 = digits.parse().map_err(|_| invalid())?;
    let scale = match unit {
        "" | "s" => 1,
        "m" => 60,
        "h" => 3_600,
        "d" => 86_400,
        _ => return Err(invalid()),
    };
    let seconds = amount.checked_mul(scale).ok_or_else(invalid)?;
    Ok(TypedValue::custom(Duration::from_secs(seconds)))
}

// ============================================================================
// Greeter Plugin
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(default)]
struct GreeterConfig {
    greeting: String,
}

impl Default for GreeterConfig {
    fn default() -> Self {
        Self {
            greeting: "Hello".to_string(),
        }
    }
}

async fn log_message(message: Arc<InboundMessage>) -> Result<(), BoxError> {
    info!(author = %message.author.name, "{}", message.content);
    Ok(())
}

fn greeter(scope: &mut PluginScope<'_>) -> Result<(), BoxError> {
    let config: GreeterConfig = scope.get_config()?;
    let greeting = Arc::new(config.greeting);
    scope.command(Command::new(
        "hello",
        0,
        Syntax::empty(),
        move |ctx: CommandContext, _args: Arguments| {
            let greeting = greeting.clone();
            async move {
                ctx.reply(format!("{greeting}, {}!", ctx.author().name))
                    .await?;
                Ok::<(), BoxError>(())
            }
        },
    ));
    scope.on_message(log_message);
    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.file(path);
    }
    let config = loader.load()?;
    logging::init_from_config(&config.logging);

    let guild = Arc::new(demo_guild());
    let client = SparklClient::from_config(
        Arc::new(ConsoleClient {
            guild: guild.clone(),
        }),
        &config,
    )?;

    // Keep a handle on the provider so `config prefix` can update it.
    let provider = Arc::new(config.config_provider()?);
    if !config.guilds.contains_key(&GUILD.to_string()) {
        provider.set_guild_config(GUILD, demo_guild_config(&config.client.prefix));
    }
    client.dispatcher().set_provider(provider.clone());

    client.register_type("duration", duration);

    client.command(Command::new("ping", 0, Syntax::empty(), ping));
    client.command(Command::new(
        "echo",
        0,
        Syntax::new(vec![ArgumentSpec::required("text", "string").rest()])?,
        echo,
    ));
    client.command(
        Command::new(
            "add",
            0,
            Syntax::new(vec![
                ArgumentSpec::required("a", "integer"),
                ArgumentSpec::required("b", "integer"),
            ])?,
            add,
        )
        .with_options(CommandOptions::new().alias("sum")),
    );
    client.command(Command::from_path(
        "mod.ban",
        5,
        Syntax::new(vec![
            ArgumentSpec::required("user", "member"),
            ArgumentSpec::optional("reason", "string").rest(),
        ])?,
        ban,
    ));
    client.command(Command::from_path(
        "mod.mute",
        5,
        Syntax::new(vec![
            ArgumentSpec::required("user", "member"),
            ArgumentSpec::required("time", "duration"),
        ])?,
        mute,
    ));
    client.command(Command::from_path(
        "config.prefix",
        10,
        Syntax::new(vec![ArgumentSpec::required("prefix", "string")])?,
        move |ctx: CommandContext, args: Arguments| set_prefix(provider.clone(), ctx, args),
    ));

    client.plugin("greeter", greeter)?;

    let author = guild
        .member(cli.user.into())
        .map_or_else(|| Author::new(cli.user, "guest"), |m| Author::new(m.id, m.username));
    let roles: Vec<Snowflake> = if cli.moderator {
        vec![MODERATOR_ROLE.into()]
    } else {
        Vec::new()
    };
    println!(
        "Typing as {} in #general. Prefix: {}",
        author.name, config.client.prefix
    );

    let lines = BufReader::new(tokio::io::stdin()).lines();
    let messages = stream::unfold((lines, 1u64), move |(mut lines, id)| {
        let author = author.clone();
        let roles = roles.clone();
        async move {
            let line = lines.next_line().await.ok().flatten()?;
            let message = InboundMessage::new(id, GENERAL, author, line)
                .in_guild(GUILD)
                .with_roles(roles);
            Some((message, (lines, id + 1)))
        }
    });

    client.run(messages).await?;
    Ok(())
}
