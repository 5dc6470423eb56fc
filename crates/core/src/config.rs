use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub market: MarketConfig,
    pub negotiation: NegotiationConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

/// Settings for the external pricing/LLM service the market boundary
/// talks to, including the process-wide request budget.
#[derive(Clone, Debug)]
pub struct MarketConfig {
    pub base_url: String,
    pub api_key: Option<SecretString>,
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub request_budget: u32,
}

#[derive(Clone, Debug)]
pub struct NegotiationConfig {
    /// Pause before a chained agent-vs-agent round fires. Zero is valid.
    pub round_delay_ms: u64,
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
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub market_base_url: Option<String>,
    pub market_model: Option<String>,
    pub market_api_key: Option<String>,
    pub round_delay_ms: Option<u64>,
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
            database: DatabaseConfig {
                url: "sqlite://haggle.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            market: MarketConfig {
                base_url: "http://localhost:11434".to_string(),
                api_key: None,
                model: "llama3.1".to_string(),
                timeout_secs: 30,
                max_retries: 2,
                request_budget: 50,
            },
            negotiation: NegotiationConfig { round_delay_ms: 1_500 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
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
    /// Layered load: defaults, then `haggle.toml`, then `HAGGLE_*`
    /// environment variables, then programmatic overrides, validated last.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("haggle.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(market) = patch.market {
            if let Some(base_url) = market.base_url {
                self.market.base_url = base_url;
            }
            if let Some(api_key_value) = market.api_key {
                self.market.api_key = Some(api_key_value.into());
            }
            if let Some(model) = market.model {
                self.market.model = model;
            }
            if let Some(timeout_secs) = market.timeout_secs {
                self.market.timeout_secs = timeout_secs;
            }
            if let Some(max_retries) = market.max_retries {
                self.market.max_retries = max_retries;
            }
            if let Some(request_budget) = market.request_budget {
                self.market.request_budget = request_budget;
            }
        }

        if let Some(negotiation) = patch.negotiation {
            if let Some(round_delay_ms) = negotiation.round_delay_ms {
                self.negotiation.round_delay_ms = round_delay_ms;
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
        if let Some(value) = read_env("HAGGLE_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("HAGGLE_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("HAGGLE_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("HAGGLE_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("HAGGLE_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("HAGGLE_MARKET_BASE_URL") {
            self.market.base_url = value;
        }
        if let Some(value) = read_env("HAGGLE_MARKET_API_KEY") {
            self.market.api_key = Some(value.into());
        }
        if let Some(value) = read_env("HAGGLE_MARKET_MODEL") {
            self.market.model = value;
        }
        if let Some(value) = read_env("HAGGLE_MARKET_TIMEOUT_SECS") {
            self.market.timeout_secs = parse_u64("HAGGLE_MARKET_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("HAGGLE_MARKET_MAX_RETRIES") {
            self.market.max_retries = parse_u32("HAGGLE_MARKET_MAX_RETRIES", &value)?;
        }
        if let Some(value) = read_env("HAGGLE_MARKET_REQUEST_BUDGET") {
            self.market.request_budget = parse_u32("HAGGLE_MARKET_REQUEST_BUDGET", &value)?;
        }

        if let Some(value) = read_env("HAGGLE_NEGOTIATION_ROUND_DELAY_MS") {
            self.negotiation.round_delay_ms =
                parse_u64("HAGGLE_NEGOTIATION_ROUND_DELAY_MS", &value)?;
        }

        let log_level = read_env("HAGGLE_LOGGING_LEVEL").or_else(|| read_env("HAGGLE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("HAGGLE_LOGGING_FORMAT").or_else(|| read_env("HAGGLE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(base_url) = overrides.market_base_url {
            self.market.base_url = base_url;
        }
        if let Some(model) = overrides.market_model {
            self.market.model = model;
        }
        if let Some(api_key) = overrides.market_api_key {
            self.market.api_key = Some(api_key.into());
        }
        if let Some(round_delay_ms) = overrides.round_delay_ms {
            self.negotiation.round_delay_ms = round_delay_ms;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_market(&self.market)?;
        validate_negotiation(&self.negotiation)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("haggle.toml"), PathBuf::from("config/haggle.toml")]
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

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_market(market: &MarketConfig) -> Result<(), ConfigError> {
    if market.base_url.trim().is_empty() {
        return Err(ConfigError::Validation("market.base_url must not be empty".to_string()));
    }
    if !market.base_url.starts_with("http://") && !market.base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "market.base_url must start with http:// or https://".to_string(),
        ));
    }

    if market.timeout_secs == 0 || market.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "market.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if market.request_budget == 0 {
        return Err(ConfigError::Validation(
            "market.request_budget must be greater than zero".to_string(),
        ));
    }

    if let Some(api_key) = &market.api_key {
        if api_key.expose_secret().trim().is_empty() {
            return Err(ConfigError::Validation(
                "market.api_key must not be empty when set".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_negotiation(negotiation: &NegotiationConfig) -> Result<(), ConfigError> {
    if negotiation.round_delay_ms > 60_000 {
        return Err(ConfigError::Validation(
            "negotiation.round_delay_ms must be at most 60000".to_string(),
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

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
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

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    market: Option<MarketPatch>,
    negotiation: Option<NegotiationPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct MarketPatch {
    base_url: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
    request_budget: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct NegotiationPatch {
    round_delay_ms: Option<u64>,
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
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    #[test]
    fn file_load_supports_env_interpolation() {
        let _guard = env_lock().lock().expect("env lock");
        env::set_var("TEST_MARKET_API_KEY", "sk-from-env");

        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("haggle.toml");
        fs::write(
            &path,
            r#"
[market]
api_key = "${TEST_MARKET_API_KEY}"
"#,
        )
        .expect("write config");

        let config =
            AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                .expect("config load");

        assert_eq!(
            config.market.api_key.as_ref().map(|key| key.expose_secret().to_string()),
            Some("sk-from-env".to_string())
        );

        clear_vars(&["TEST_MARKET_API_KEY"]);
    }

    #[test]
    fn precedence_runs_defaults_file_env_overrides() {
        let _guard = env_lock().lock().expect("env lock");
        env::set_var("HAGGLE_DATABASE_URL", "sqlite://from-env.db");

        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("haggle.toml");
        fs::write(
            &path,
            r#"
[database]
url = "sqlite://from-file.db"

[negotiation]
round_delay_ms = 250

[logging]
level = "warn"
"#,
        )
        .expect("write config");

        let config = AppConfig::load(LoadOptions {
            config_path: Some(path),
            overrides: ConfigOverrides {
                log_level: Some("debug".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect("config load");

        assert_eq!(config.database.url, "sqlite://from-env.db");
        assert_eq!(config.negotiation.round_delay_ms, 250);
        assert_eq!(config.logging.level, "debug");

        clear_vars(&["HAGGLE_DATABASE_URL"]);
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() {
        let _guard = env_lock().lock().expect("env lock");
        env::set_var("HAGGLE_DATABASE_URL", "postgres://nope");

        let error = AppConfig::load(LoadOptions::default()).expect_err("must fail validation");
        assert!(matches!(
            error,
            ConfigError::Validation(ref message) if message.contains("database.url")
        ));

        clear_vars(&["HAGGLE_DATABASE_URL"]);
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() {
        let _guard = env_lock().lock().expect("env lock");
        env::set_var("HAGGLE_MARKET_API_KEY", "sk-secret-value");

        let config = AppConfig::load(LoadOptions::default()).expect("config load");
        let debug = format!("{config:?}");

        assert!(!debug.contains("sk-secret-value"));
        assert_eq!(config.logging.format, LogFormat::Compact);

        clear_vars(&["HAGGLE_MARKET_API_KEY"]);
    }
}
