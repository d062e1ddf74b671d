use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use tonto_bot::{BotContext, FillerPicker, ManCommand, MessagePipeline};
use tonto_config::{Overrides, TontoConfig};
use tonto_links::{HttpFetcher, TinyUrl};
use tonto_storage::SeenUrlStore;

#[derive(Parser)]
#[command(name = "tonto", about = "IRC channel bot that titles links and spots reposts")]
struct Cli {
    /// IRC server host
    #[arg(long)]
    server: Option<String>,

    /// Nickname to register with
    #[arg(long)]
    nickname: Option<String>,

    /// Channel to join (e.g. "#tontotest")
    #[arg(long)]
    channel: Option<String>,

    /// Real name sent on registration
    #[arg(long)]
    realname: Option<String>,

    /// IRC server port
    #[arg(short, long)]
    port: Option<u16>,

    /// Read only this config file instead of ./tontorc and ~/.tontorc
    #[arg(long)]
    config: Option<PathBuf>,

    /// SQLite database of seen URLs
    #[arg(long)]
    db: Option<PathBuf>,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            server: self.server.clone(),
            port: self.port,
            nickname: self.nickname.clone(),
            channel: self.channel.clone(),
            realname: self.realname.clone(),
            db_path: self.db.clone(),
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        error!("{e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = tonto_config::load_config(cli.config.as_deref(), &cli.overrides())
        .context("failed to load configuration")?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let pipeline = build_pipeline(&config)?;
        tonto_bot::start_bot(&pipeline).await
    })
}

fn build_pipeline(config: &TontoConfig) -> anyhow::Result<MessagePipeline> {
    let bot = &config.bot;

    let store = SeenUrlStore::open(&bot.db_path)
        .with_context(|| format!("failed to open URL database {}", bot.db_path.display()))?;
    info!(path = %bot.db_path.display(), "URL database opened");

    let fetcher = HttpFetcher::new(
        Duration::from_secs(bot.fetch_timeout_secs),
        bot.max_redirects,
    )?;
    let shortener = TinyUrl::new(fetcher.clone(), &bot.shortener_endpoint)
        .with_context(|| format!("invalid shortener endpoint {}", bot.shortener_endpoint))?;

    Ok(MessagePipeline::new(BotContext {
        channel: config.net.channel.clone(),
        store,
        fetcher: Arc::new(fetcher),
        shortener: Arc::new(shortener),
        man: Arc::new(ManCommand::new(Duration::from_secs(bot.manpage_timeout_secs))),
        transport: tonto_channel_irc::create_irc_channel(&config.net),
        fillers: FillerPicker::default(),
        fetch_max_bytes: bot.fetch_max_bytes,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_flags_become_overrides() {
        let cli = Cli::try_parse_from([
            "tonto",
            "--server",
            "irc.example.net",
            "-p",
            "6697",
            "--channel",
            "#rust",
            "--db",
            "/tmp/urls.db",
        ])
        .unwrap();
        let overrides = cli.overrides();
        assert_eq!(overrides.server.as_deref(), Some("irc.example.net"));
        assert_eq!(overrides.port, Some(6697));
        assert_eq!(overrides.channel.as_deref(), Some("#rust"));
        assert_eq!(overrides.nickname, None);
        assert_eq!(overrides.db_path, Some(PathBuf::from("/tmp/urls.db")));
    }

    #[test]
    fn test_bad_port_rejected() {
        assert!(Cli::try_parse_from(["tonto", "--port", "notaport"]).is_err());
    }

    #[test]
    fn test_unopenable_database_is_fatal() {
        let mut config = TontoConfig::default();
        config.bot.db_path = PathBuf::from("/nonexistent-dir/for/tonto/urls.db");
        let err = build_pipeline(&config).err().expect("opening should fail");
        assert!(format!("{err:#}").contains("failed to open URL database"));
    }
}
