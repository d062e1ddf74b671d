//! tonto-config: bot configuration.
//!
//! Values are resolved per field with the precedence
//! command-line flag > config file > built-in default.
//! Config files are JSON5 with optional `net` and `bot` sections.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON5 parse error in {path}: {source}")]
    Json5 {
        path: PathBuf,
        #[source]
        source: json5::Error,
    },
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Name of the config file looked up in the working and home directories.
pub const CONFIG_FILE_NAME: &str = "tontorc";

/// IRC network settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetConfig {
    pub server: String,
    pub port: u16,
    pub nickname: String,
    /// The single channel the bot joins and answers in.
    pub channel: String,
    pub realname: String,
}

fn default_server() -> String {
    "irc.freenode.net".to_string()
}

fn default_port() -> u16 {
    6667
}

fn default_nickname() -> String {
    "tonto_bot".to_string()
}

fn default_channel() -> String {
    "#coderspuebla".to_string()
}

fn default_realname() -> String {
    "Tontus Hominidus Bot".to_string()
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            port: default_port(),
            nickname: default_nickname(),
            channel: default_channel(),
            realname: default_realname(),
        }
    }
}

/// Runtime limits and paths for the message pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotSettings {
    /// SQLite file holding seen URLs.
    pub db_path: PathBuf,
    /// Maximum number of body bytes read from a fetched page.
    pub fetch_max_bytes: usize,
    /// Per-request timeout for page fetches and the shortener.
    pub fetch_timeout_secs: u64,
    /// Redirects followed before a fetch fails.
    pub max_redirects: usize,
    /// Time allowed for the `man` subprocess.
    pub manpage_timeout_secs: u64,
    /// Shortening service endpoint; the long URL is passed as `?url=`.
    pub shortener_endpoint: String,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./seenurls.db")
}

fn default_fetch_max_bytes() -> usize {
    20 * 1024
}

fn default_fetch_timeout_secs() -> u64 {
    10
}

fn default_max_redirects() -> usize {
    5
}

fn default_manpage_timeout_secs() -> u64 {
    5
}

fn default_shortener_endpoint() -> String {
    "http://tinyurl.com/api-create.php".to_string()
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            fetch_max_bytes: default_fetch_max_bytes(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            max_redirects: default_max_redirects(),
            manpage_timeout_secs: default_manpage_timeout_secs(),
            shortener_endpoint: default_shortener_endpoint(),
        }
    }
}

/// Fully resolved configuration handed to the bot at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TontoConfig {
    pub net: NetConfig,
    pub bot: BotSettings,
}

impl TontoConfig {
    fn validate(self) -> Result<Self, ConfigError> {
        if self.net.nickname.trim().is_empty() {
            return Err(ConfigError::Invalid("nickname must not be empty".into()));
        }
        if !self.net.channel.starts_with(['#', '&']) {
            return Err(ConfigError::Invalid(format!(
                "channel must start with '#' or '&', got {:?}",
                self.net.channel
            )));
        }
        if self.bot.fetch_max_bytes == 0 {
            return Err(ConfigError::Invalid("fetch_max_bytes must be > 0".into()));
        }
        Ok(self)
    }
}

// ──────────────────── File layer ────────────────────

/// `net` section as written in a config file; every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartialNet {
    pub server: Option<String>,
    pub port: Option<u16>,
    pub nickname: Option<String>,
    pub channel: Option<String>,
    pub realname: Option<String>,
}

/// `bot` section as written in a config file; every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartialBot {
    pub db_path: Option<PathBuf>,
    pub fetch_max_bytes: Option<usize>,
    pub fetch_timeout_secs: Option<u64>,
    pub max_redirects: Option<usize>,
    pub manpage_timeout_secs: Option<u64>,
    pub shortener_endpoint: Option<String>,
}

/// One config file's worth of settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartialConfig {
    #[serde(default)]
    pub net: PartialNet,
    #[serde(default)]
    pub bot: PartialBot,
}

impl PartialConfig {
    /// Layer `later` on top of `self`; keys set in `later` win.
    pub fn merge(self, later: PartialConfig) -> PartialConfig {
        PartialConfig {
            net: PartialNet {
                server: later.net.server.or(self.net.server),
                port: later.net.port.or(self.net.port),
                nickname: later.net.nickname.or(self.net.nickname),
                channel: later.net.channel.or(self.net.channel),
                realname: later.net.realname.or(self.net.realname),
            },
            bot: PartialBot {
                db_path: later.bot.db_path.or(self.bot.db_path),
                fetch_max_bytes: later.bot.fetch_max_bytes.or(self.bot.fetch_max_bytes),
                fetch_timeout_secs: later.bot.fetch_timeout_secs.or(self.bot.fetch_timeout_secs),
                max_redirects: later.bot.max_redirects.or(self.bot.max_redirects),
                manpage_timeout_secs: later
                    .bot
                    .manpage_timeout_secs
                    .or(self.bot.manpage_timeout_secs),
                shortener_endpoint: later.bot.shortener_endpoint.or(self.bot.shortener_endpoint),
            },
        }
    }

    /// Apply command-line overrides and fill the gaps with defaults.
    pub fn resolve(self, overrides: &Overrides) -> Result<TontoConfig, ConfigError> {
        let net = self.net;
        let bot = self.bot;
        TontoConfig {
            net: NetConfig {
                server: pick(&overrides.server, net.server, default_server),
                port: overrides.port.or(net.port).unwrap_or_else(default_port),
                nickname: pick(&overrides.nickname, net.nickname, default_nickname),
                channel: pick(&overrides.channel, net.channel, default_channel),
                realname: pick(&overrides.realname, net.realname, default_realname),
            },
            bot: BotSettings {
                db_path: pick(&overrides.db_path, bot.db_path, default_db_path),
                fetch_max_bytes: bot.fetch_max_bytes.unwrap_or_else(default_fetch_max_bytes),
                fetch_timeout_secs: bot
                    .fetch_timeout_secs
                    .unwrap_or_else(default_fetch_timeout_secs),
                max_redirects: bot.max_redirects.unwrap_or_else(default_max_redirects),
                manpage_timeout_secs: bot
                    .manpage_timeout_secs
                    .unwrap_or_else(default_manpage_timeout_secs),
                shortener_endpoint: bot
                    .shortener_endpoint
                    .unwrap_or_else(default_shortener_endpoint),
            },
        }
        .validate()
    }
}

fn pick<T: Clone>(flag: &Option<T>, file: Option<T>, default: fn() -> T) -> T {
    flag.clone().or(file).unwrap_or_else(default)
}

/// Values given on the command line. `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub server: Option<String>,
    pub port: Option<u16>,
    pub nickname: Option<String>,
    pub channel: Option<String>,
    pub realname: Option<String>,
    pub db_path: Option<PathBuf>,
}

// ──────────────────── Loading ────────────────────

/// Config files consulted when no explicit path is given, lowest priority first:
/// `./tontorc`, then `~/.tontorc`.
pub fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(".").join(CONFIG_FILE_NAME)];
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(format!(".{CONFIG_FILE_NAME}")));
    }
    paths
}

/// Read one config file. A missing file yields `Ok(None)`.
pub fn load_partial_from(path: &Path) -> Result<Option<PartialConfig>, ConfigError> {
    if !path.exists() {
        tracing::debug!("Config file not found at {}, skipping", path.display());
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)?;
    let partial = json5::from_str(&content).map_err(|source| ConfigError::Json5 {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!("Loaded config file {}", path.display());
    Ok(Some(partial))
}

/// Resolve configuration from the given files and overrides.
///
/// Files are layered in order, so later files override earlier ones.
pub fn load_config_from(paths: &[PathBuf], overrides: &Overrides) -> Result<TontoConfig, ConfigError> {
    let mut merged = PartialConfig::default();
    for path in paths {
        if let Some(partial) = load_partial_from(path)? {
            merged = merged.merge(partial);
        }
    }
    merged.resolve(overrides)
}

/// Resolve configuration for the running bot.
///
/// With `explicit` set only that file is read; otherwise the search paths are.
pub fn load_config(explicit: Option<&Path>, overrides: &Overrides) -> Result<TontoConfig, ConfigError> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let paths = match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(ConfigError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("config file {} not found", path.display()),
                )));
            }
            vec![path.to_path_buf()]
        }
        None => config_search_paths(),
    };
    load_config_from(&paths, overrides)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        let config = PartialConfig::default().resolve(&Overrides::default()).unwrap();
        assert_eq!(config.net.server, "irc.freenode.net");
        assert_eq!(config.net.port, 6667);
        assert_eq!(config.net.nickname, "tonto_bot");
        assert_eq!(config.net.channel, "#coderspuebla");
        assert_eq!(config.net.realname, "Tontus Hominidus Bot");
        assert_eq!(config.bot.fetch_max_bytes, 20 * 1024);
        assert_eq!(config.bot.db_path, PathBuf::from("./seenurls.db"));
        assert_eq!(config, TontoConfig::default());
    }

    #[test]
    fn test_json5_parse() {
        let json5_str = r#"{
            net: { server: "irc.libera.chat", port: 6697 },
            bot: { fetch_max_bytes: 4096, },
        }"#;
        let partial: PartialConfig = json5::from_str(json5_str).unwrap();
        let config = partial.resolve(&Overrides::default()).unwrap();
        assert_eq!(config.net.server, "irc.libera.chat");
        assert_eq!(config.net.port, 6697);
        assert_eq!(config.net.nickname, "tonto_bot");
        assert_eq!(config.bot.fetch_max_bytes, 4096);
    }

    #[test]
    fn test_flag_beats_file_beats_default() {
        let partial: PartialConfig =
            json5::from_str(r#"{ net: { server: "file.example", nickname: "filebot" } }"#).unwrap();
        let overrides = Overrides {
            server: Some("flag.example".into()),
            port: Some(7000),
            ..Default::default()
        };
        let config = partial.resolve(&overrides).unwrap();
        assert_eq!(config.net.server, "flag.example");
        assert_eq!(config.net.port, 7000);
        assert_eq!(config.net.nickname, "filebot");
        assert_eq!(config.net.channel, "#coderspuebla");
    }

    #[test]
    fn test_later_file_overrides_earlier() {
        let dir = tempfile::tempdir().unwrap();
        let local = write(&dir, "local", r##"{ net: { server: "local", channel: "#local" } }"##);
        let home = write(&dir, "home", r#"{ net: { server: "home" } }"#);
        let missing = dir.path().join("missing");

        let config = load_config_from(&[local, home, missing], &Overrides::default()).unwrap();
        assert_eq!(config.net.server, "home");
        assert_eq!(config.net.channel, "#local");
    }

    #[test]
    fn test_missing_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_partial_from(&dir.path().join("nope")).unwrap().is_none());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "bad", "{ net: ");
        let err = load_config_from(&[path], &Overrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Json5 { .. }));
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(&dir.path().join("nope")), &Overrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_invalid_channel_rejected() {
        let overrides = Overrides {
            channel: Some("coderspuebla".into()),
            ..Default::default()
        };
        let err = PartialConfig::default().resolve(&overrides).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
