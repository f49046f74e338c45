// src/config.rs

use std::{env, fmt, str::FromStr, sync::OnceLock};

use dotenvy::dotenv;
use regex::Regex;

/// Emojis offered on every comment unless `COMMENTS_ALLOWED_EMOJIS` says otherwise.
pub const DEFAULT_EMOJIS: [&str; 6] = [":like:", ":favorite:", ":laugh:", ":wow:", ":sad:", ":angry:"];

/// Errors raised while reading configuration at startup.
#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{} must be set", key),
            ConfigError::Invalid { key, value } => write!(f, "invalid value for {}: {:?}", key, value),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub rust_log: String,
    pub bind_addr: String,
    pub comments: CommentsConfig,
}

/// Policy values for the comment feature. Passed explicitly to the
/// controllers; nothing reads these from the environment after startup.
#[derive(Debug, Clone)]
pub struct CommentsConfig {
    /// Table holding the authors referenced by `comments.user_id`.
    pub user_table: String,
    pub auto_approve: bool,
    pub per_page: u32,
    pub max_comment_length: usize,
    /// When false, a reply cannot itself be replied to.
    pub allow_nested_replies: bool,
    /// chrono format string used for `created_at_display`.
    pub date_format: String,
    /// `None` accepts any emoji text.
    pub allowed_emojis: Option<Vec<String>>,
}

impl Default for CommentsConfig {
    fn default() -> Self {
        Self {
            user_table: "users".to_string(),
            auto_approve: true,
            per_page: 10,
            max_comment_length: 1000,
            allow_nested_replies: true,
            date_format: "%b %d, %Y".to_string(),
            allowed_emojis: Some(DEFAULT_EMOJIS.iter().map(|e| e.to_string()).collect()),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        let jwt_secret = env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?;

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        Ok(Self {
            database_url,
            jwt_secret,
            rust_log,
            bind_addr,
            comments: CommentsConfig::from_env()?,
        })
    }
}

impl CommentsConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let user_table = env::var("COMMENTS_USER_TABLE").unwrap_or(defaults.user_table);
        if !is_identifier(&user_table) {
            return Err(ConfigError::Invalid {
                key: "COMMENTS_USER_TABLE",
                value: user_table,
            });
        }

        let allowed_emojis = match env::var("COMMENTS_ALLOWED_EMOJIS") {
            Ok(raw) => parse_emoji_list(&raw),
            Err(_) => defaults.allowed_emojis,
        };

        Ok(Self {
            user_table,
            auto_approve: env_or("COMMENTS_AUTO_APPROVE", defaults.auto_approve)?,
            per_page: env_or("COMMENTS_PER_PAGE", defaults.per_page)?,
            max_comment_length: env_or("COMMENTS_MAX_LENGTH", defaults.max_comment_length)?,
            allow_nested_replies: env_or("COMMENTS_ALLOW_NESTED_REPLIES", defaults.allow_nested_replies)?,
            date_format: env::var("COMMENTS_DATE_FORMAT").unwrap_or(defaults.date_format),
            allowed_emojis,
        })
    }

    /// Whether `emoji` may be used as a reaction under the configured policy.
    pub fn accepts_emoji(&self, emoji: &str) -> bool {
        match &self.allowed_emojis {
            Some(list) => list.iter().any(|e| e == emoji),
            None => !emoji.trim().is_empty() && emoji.chars().count() <= 32,
        }
    }
}

fn env_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value.trim().parse().map_err(|_| ConfigError::Invalid { key, value }),
        Err(_) => Ok(default),
    }
}

/// `*` (or an empty list) switches reactions to free text.
fn parse_emoji_list(raw: &str) -> Option<Vec<String>> {
    let list: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_string)
        .collect();

    if list.is_empty() || list.iter().any(|e| e == "*") {
        None
    } else {
        Some(list)
    }
}

/// The user table name is spliced into SQL, so only plain identifiers pass.
pub fn is_identifier(name: &str) -> bool {
    static IDENT: OnceLock<Regex> = OnceLock::new();
    IDENT
        .get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").expect("static regex"))
        .is_match(name)
}
