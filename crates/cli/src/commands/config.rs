use serde::Serialize;

use crate::commands::CommandResult;
use haggle_core::config::{AppConfig, LoadOptions, LogFormat};

#[derive(Debug, Serialize)]
struct EffectiveConfig {
    command: &'static str,
    database: DatabaseView,
    market: MarketView,
    negotiation: NegotiationView,
    logging: LoggingView,
}

#[derive(Debug, Serialize)]
struct DatabaseView {
    url: String,
    max_connections: u32,
    timeout_secs: u64,
}

#[derive(Debug, Serialize)]
struct MarketView {
    base_url: String,
    api_key: &'static str,
    model: String,
    timeout_secs: u64,
    max_retries: u32,
    request_budget: u32,
}

#[derive(Debug, Serialize)]
struct NegotiationView {
    round_delay_ms: u64,
}

#[derive(Debug, Serialize)]
struct LoggingView {
    level: String,
    format: &'static str,
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let view = EffectiveConfig {
        command: "config",
        database: DatabaseView {
            url: config.database.url.clone(),
            max_connections: config.database.max_connections,
            timeout_secs: config.database.timeout_secs,
        },
        market: MarketView {
            base_url: config.market.base_url.clone(),
            api_key: if config.market.api_key.is_some() { "<redacted>" } else { "<unset>" },
            model: config.market.model.clone(),
            timeout_secs: config.market.timeout_secs,
            max_retries: config.market.max_retries,
            request_budget: config.market.request_budget,
        },
        negotiation: NegotiationView { round_delay_ms: config.negotiation.round_delay_ms },
        logging: LoggingView {
            level: config.logging.level.clone(),
            format: match config.logging.format {
                LogFormat::Compact => "compact",
                LogFormat::Pretty => "pretty",
                LogFormat::Json => "json",
            },
        },
    };

    match serde_json::to_string_pretty(&view) {
        Ok(output) => CommandResult { exit_code: 0, output },
        Err(error) => CommandResult::failure(
            "config",
            "serialization",
            format!("failed to serialize config: {error}"),
            3,
        ),
    }
}
