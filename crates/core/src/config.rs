use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub chat: ChatConfig,
    pub calendar: CalendarConfig,
    pub digest: DigestConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct ChatConfig {
    pub bot_token: SecretString,
    /// Channel the daily digest is posted to.
    pub channel_id: String,
    pub api_base_url: String,
}

#[derive(Clone, Debug)]
pub struct CalendarConfig {
    pub calendar_id: String,
    /// IANA zone used for "today", event creation and event listing.
    pub timezone: String,
    pub access_token: SecretString,
    pub api_base_url: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct DigestConfig {
    pub enabled: bool,
    pub hour: u32,
    /// Falls back to `calendar.timezone` when unset.
    pub timezone: Option<String>,
    pub poll_interval_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub health_check_port: u16,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub bot_token: Option<String>,
    pub channel_id: Option<String>,
    pub calendar_id: Option<String>,
    pub calendar_access_token: Option<String>,
    pub calendar_api_base_url: Option<String>,
    pub chat_api_base_url: Option<String>,
    pub digest_enabled: Option<bool>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            chat: ChatConfig {
                bot_token: String::new().into(),
                channel_id: String::new(),
                api_base_url: "https://discord.com/api/v10".to_string(),
            },
            calendar: CalendarConfig {
                calendar_id: String::new(),
                timezone: "America/Toronto".to_string(),
                access_token: String::new().into(),
                api_base_url: "https://www.googleapis.com/calendar/v3".to_string(),
                timeout_secs: 30,
            },
            digest: DigestConfig {
                enabled: true,
                hour: 8,
                timezone: None,
                poll_interval_secs: 600,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                health_check_port: 8080,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("fern.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn calendar_timezone(&self) -> Result<Tz, ConfigError> {
        parse_timezone("calendar.timezone", &self.calendar.timezone)
    }

    pub fn digest_timezone(&self) -> Result<Tz, ConfigError> {
        match &self.digest.timezone {
            Some(timezone) => parse_timezone("digest.timezone", timezone),
            None => self.calendar_timezone(),
        }
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(chat) = patch.chat {
            if let Some(bot_token_value) = chat.bot_token {
                self.chat.bot_token = secret_value(bot_token_value);
            }
            if let Some(channel_id) = chat.channel_id {
                self.chat.channel_id = channel_id;
            }
            if let Some(api_base_url) = chat.api_base_url {
                self.chat.api_base_url = api_base_url;
            }
        }

        if let Some(calendar) = patch.calendar {
            if let Some(calendar_id) = calendar.calendar_id {
                self.calendar.calendar_id = calendar_id;
            }
            if let Some(timezone) = calendar.timezone {
                self.calendar.timezone = timezone;
            }
            if let Some(access_token_value) = calendar.access_token {
                self.calendar.access_token = secret_value(access_token_value);
            }
            if let Some(api_base_url) = calendar.api_base_url {
                self.calendar.api_base_url = api_base_url;
            }
            if let Some(timeout_secs) = calendar.timeout_secs {
                self.calendar.timeout_secs = timeout_secs;
            }
        }

        if let Some(digest) = patch.digest {
            if let Some(enabled) = digest.enabled {
                self.digest.enabled = enabled;
            }
            if let Some(hour) = digest.hour {
                self.digest.hour = hour;
            }
            if let Some(timezone) = digest.timezone {
                self.digest.timezone = Some(timezone);
            }
            if let Some(poll_interval_secs) = digest.poll_interval_secs {
                self.digest.poll_interval_secs = poll_interval_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(health_check_port) = server.health_check_port {
                self.server.health_check_port = health_check_port;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        let bot_token = read_env("FERN_CHAT_BOT_TOKEN").or_else(|| read_env("DISCORD_BOT_TOKEN"));
        if let Some(value) = bot_token {
            self.chat.bot_token = secret_value(value);
        }
        if let Some(value) = read_env("FERN_CHAT_CHANNEL_ID") {
            self.chat.channel_id = value;
        }
        if let Some(value) = read_env("FERN_CHAT_API_BASE_URL") {
            self.chat.api_base_url = value;
        }

        if let Some(value) = read_env("FERN_CALENDAR_ID") {
            self.calendar.calendar_id = value;
        }
        if let Some(value) = read_env("FERN_CALENDAR_TIMEZONE") {
            self.calendar.timezone = value;
        }
        if let Some(value) = read_env("FERN_CALENDAR_ACCESS_TOKEN") {
            self.calendar.access_token = secret_value(value);
        }
        if let Some(value) = read_env("FERN_CALENDAR_API_BASE_URL") {
            self.calendar.api_base_url = value;
        }
        if let Some(value) = read_env("FERN_CALENDAR_TIMEOUT_SECS") {
            self.calendar.timeout_secs = parse_u64("FERN_CALENDAR_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("FERN_DIGEST_ENABLED") {
            self.digest.enabled = parse_bool("FERN_DIGEST_ENABLED", &value)?;
        }
        if let Some(value) = read_env("FERN_DIGEST_HOUR") {
            self.digest.hour = parse_u32("FERN_DIGEST_HOUR", &value)?;
        }
        if let Some(value) = read_env("FERN_DIGEST_TIMEZONE") {
            self.digest.timezone = Some(value);
        }
        if let Some(value) = read_env("FERN_DIGEST_POLL_INTERVAL_SECS") {
            self.digest.poll_interval_secs = parse_u64("FERN_DIGEST_POLL_INTERVAL_SECS", &value)?;
        }

        if let Some(value) = read_env("FERN_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("FERN_SERVER_HEALTH_CHECK_PORT") {
            self.server.health_check_port = parse_u16("FERN_SERVER_HEALTH_CHECK_PORT", &value)?;
        }

        let log_level = read_env("FERN_LOGGING_LEVEL").or_else(|| read_env("FERN_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format = read_env("FERN_LOGGING_FORMAT").or_else(|| read_env("FERN_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(bot_token) = overrides.bot_token {
            self.chat.bot_token = secret_value(bot_token);
        }
        if let Some(channel_id) = overrides.channel_id {
            self.chat.channel_id = channel_id;
        }
        if let Some(chat_api_base_url) = overrides.chat_api_base_url {
            self.chat.api_base_url = chat_api_base_url;
        }
        if let Some(calendar_id) = overrides.calendar_id {
            self.calendar.calendar_id = calendar_id;
        }
        if let Some(access_token) = overrides.calendar_access_token {
            self.calendar.access_token = secret_value(access_token);
        }
        if let Some(calendar_api_base_url) = overrides.calendar_api_base_url {
            self.calendar.api_base_url = calendar_api_base_url;
        }
        if let Some(enabled) = overrides.digest_enabled {
            self.digest.enabled = enabled;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_chat(&self.chat)?;
        validate_calendar(&self.calendar)?;
        validate_digest(&self.digest)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("fern.toml"), PathBuf::from("config/fern.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn parse_timezone(key: &str, value: &str) -> Result<Tz, ConfigError> {
    value.trim().parse::<Tz>().map_err(|_| {
        ConfigError::Validation(format!(
            "{key} must be an IANA timezone name such as `America/Toronto`, got `{value}`"
        ))
    })
}

fn validate_chat(chat: &ChatConfig) -> Result<(), ConfigError> {
    if chat.bot_token.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "chat.bot_token is required (set FERN_CHAT_BOT_TOKEN or DISCORD_BOT_TOKEN)"
                .to_string(),
        ));
    }

    if chat.channel_id.trim().is_empty() {
        return Err(ConfigError::Validation(
            "chat.channel_id is required; the daily digest is posted there".to_string(),
        ));
    }

    validate_http_url("chat.api_base_url", &chat.api_base_url)
}

fn validate_calendar(calendar: &CalendarConfig) -> Result<(), ConfigError> {
    if calendar.calendar_id.trim().is_empty() {
        return Err(ConfigError::Validation("calendar.calendar_id is required".to_string()));
    }

    parse_timezone("calendar.timezone", &calendar.timezone)?;

    if calendar.access_token.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "calendar.access_token is required (set FERN_CALENDAR_ACCESS_TOKEN)".to_string(),
        ));
    }

    if calendar.timeout_secs == 0 || calendar.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "calendar.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    validate_http_url("calendar.api_base_url", &calendar.api_base_url)
}

fn validate_digest(digest: &DigestConfig) -> Result<(), ConfigError> {
    if digest.hour > 23 {
        return Err(ConfigError::Validation("digest.hour must be in range 0..=23".to_string()));
    }

    if digest.poll_interval_secs == 0 || digest.poll_interval_secs > 3_600 {
        return Err(ConfigError::Validation(
            "digest.poll_interval_secs must be in range 1..=3600 so no hour is skipped"
                .to_string(),
        ));
    }

    if let Some(timezone) = &digest.timezone {
        parse_timezone("digest.timezone", timezone)?;
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.health_check_port == 0 {
        return Err(ConfigError::Validation(
            "server.health_check_port must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn validate_http_url(key: &str, value: &str) -> Result<(), ConfigError> {
    if !value.starts_with("http://") && !value.starts_with("https://") {
        return Err(ConfigError::Validation(format!("{key} must start with http:// or https://")));
    }
    Ok(())
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    chat: Option<ChatPatch>,
    calendar: Option<CalendarPatch>,
    digest: Option<DigestPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatPatch {
    bot_token: Option<String>,
    channel_id: Option<String>,
    api_base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CalendarPatch {
    calendar_id: Option<String>,
    timezone: Option<String>,
    access_token: Option<String>,
    api_base_url: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct DigestPatch {
    enabled: Option<bool>,
    hour: Option<u32>,
    timezone: Option<String>,
    poll_interval_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    health_check_port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    const REQUIRED_VARS: [(&str, &str); 4] = [
        ("FERN_CHAT_BOT_TOKEN", "bot-token-test"),
        ("FERN_CHAT_CHANNEL_ID", "1199581968875139183"),
        ("FERN_CALENDAR_ID", "team@group.calendar.test"),
        ("FERN_CALENDAR_ACCESS_TOKEN", "calendar-token-test"),
    ];

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn set_required() {
        for (key, value) in REQUIRED_VARS {
            env::set_var(key, value);
        }
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn clear_required() {
        clear_vars(&REQUIRED_VARS.map(|(key, _)| key));
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_FERN_BOT_TOKEN", "bot-from-env");
        env::set_var("TEST_FERN_CALENDAR_TOKEN", "calendar-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("fern.toml");
            fs::write(
                &path,
                r#"
[chat]
bot_token = "${TEST_FERN_BOT_TOKEN}"
channel_id = "C-digest"

[calendar]
calendar_id = "team@group.calendar.test"
access_token = "${TEST_FERN_CALENDAR_TOKEN}"
timezone = "Europe/Paris"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.chat.bot_token.expose_secret() == "bot-from-env",
                "bot token should be loaded from environment",
            )?;
            ensure(
                config.calendar.access_token.expose_secret() == "calendar-from-env",
                "calendar token should be loaded from environment",
            )?;
            ensure(
                config.calendar_timezone().map(|tz| tz.name() == "Europe/Paris").unwrap_or(false),
                "calendar timezone should come from the file",
            )?;
            ensure(
                config.digest_timezone().map(|tz| tz.name() == "Europe/Paris").unwrap_or(false),
                "digest timezone should default to the calendar timezone",
            )?;
            Ok(())
        })();

        clear_vars(&["TEST_FERN_BOT_TOKEN", "TEST_FERN_CALENDAR_TOKEN"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        set_required();
        env::set_var("FERN_LOG_LEVEL", "warn");
        env::set_var("FERN_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_required();
        clear_vars(&["FERN_LOG_LEVEL", "FERN_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        set_required();
        env::set_var("FERN_DIGEST_HOUR", "9");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("fern.toml");
            fs::write(
                &path,
                r#"
[chat]
bot_token = "bot-from-file"
channel_id = "C-from-file"

[digest]
hour = 7
poll_interval_secs = 300

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    channel_id: Some("C-from-override".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.chat.channel_id == "C-from-override", "override channel should win")?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(config.digest.hour == 9, "env digest hour should win over file")?;
            ensure(config.digest.poll_interval_secs == 300, "file poll interval should apply")?;
            ensure(
                config.chat.bot_token.expose_secret() == "bot-token-test",
                "env bot token should win over file and defaults",
            )?;
            Ok(())
        })();

        clear_required();
        clear_vars(&["FERN_DIGEST_HOUR"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        set_required();
        env::set_var("FERN_CALENDAR_TIMEZONE", "Mars/Olympus_Mons");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("calendar.timezone")
            );
            ensure(has_message, "validation failure should mention calendar.timezone")
        })();

        clear_required();
        clear_vars(&["FERN_CALENDAR_TIMEZONE"]);
        result
    }

    #[test]
    fn missing_bot_token_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        set_required();
        clear_vars(&["FERN_CHAT_BOT_TOKEN", "DISCORD_BOT_TOKEN"]);

        let result = match AppConfig::load(LoadOptions::default()) {
            Ok(_) => Err("expected missing bot token to fail".to_string()),
            Err(ConfigError::Validation(message)) if message.contains("chat.bot_token") => Ok(()),
            Err(other) => Err(format!("unexpected error: {other}")),
        };

        clear_required();
        result
    }

    #[test]
    fn invalid_digest_hour_env_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        set_required();
        env::set_var("FERN_DIGEST_HOUR", "eight");

        let result = match AppConfig::load(LoadOptions::default()) {
            Ok(_) => Err("expected invalid digest hour to fail".to_string()),
            Err(ConfigError::InvalidEnvOverride { key, .. }) if key == "FERN_DIGEST_HOUR" => Ok(()),
            Err(other) => Err(format!("unexpected error: {other}")),
        };

        clear_required();
        clear_vars(&["FERN_DIGEST_HOUR"]);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        set_required();
        env::set_var("FERN_CHAT_BOT_TOKEN", "bot-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(!debug.contains("bot-secret-value"), "debug output should not contain bot token")?;
            ensure(
                !debug.contains("calendar-token-test"),
                "debug output should not contain calendar token",
            )?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )?;
            ensure(config.digest.hour == 8, "default digest hour should be 8")?;
            Ok(())
        })();

        clear_required();
        result
    }
}
