use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::Row;

use haggle_core::domain::negotiation::UserId;
use haggle_core::domain::preferences::{AgentPreferences, NegotiationStrategy};

use super::{PreferencesRepository, RepositoryError};
use crate::DbPool;

pub struct SqlPreferencesRepository {
    pool: DbPool,
}

impl SqlPreferencesRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

pub fn strategy_as_str(strategy: NegotiationStrategy) -> &'static str {
    match strategy {
        NegotiationStrategy::Aggressive => "aggressive",
        NegotiationStrategy::Moderate => "moderate",
        NegotiationStrategy::Conservative => "conservative",
    }
}

fn parse_strategy(s: &str) -> NegotiationStrategy {
    match s {
        "aggressive" => NegotiationStrategy::Aggressive,
        "conservative" => NegotiationStrategy::Conservative,
        _ => NegotiationStrategy::Moderate,
    }
}

fn parse_price(s: &str) -> Result<Decimal, RepositoryError> {
    s.parse::<Decimal>().map_err(|e| RepositoryError::Decode(e.to_string()))
}

fn row_to_preferences(row: &sqlx::sqlite::SqliteRow) -> Result<AgentPreferences, RepositoryError> {
    let enabled: i64 =
        row.try_get("enabled").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let min_str: Option<String> =
        row.try_get("min_acceptable_price").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let max_str: Option<String> =
        row.try_get("max_acceptable_price").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let threshold_str: String = row
        .try_get("auto_accept_threshold")
        .map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let strategy_str: String =
        row.try_get("strategy").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let max_counter_offers: i64 =
        row.try_get("max_counter_offers").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let min_acceptable_price = match min_str {
        Some(value) => Some(parse_price(&value)?),
        None => None,
    };
    let max_acceptable_price = match max_str {
        Some(value) => Some(parse_price(&value)?),
        None => None,
    };

    Ok(AgentPreferences {
        enabled: enabled != 0,
        min_acceptable_price,
        max_acceptable_price,
        auto_accept_threshold: parse_price(&threshold_str)?,
        strategy: parse_strategy(&strategy_str),
        max_counter_offers: max_counter_offers.max(0) as u32,
    })
}

#[async_trait::async_trait]
impl PreferencesRepository for SqlPreferencesRepository {
    async fn find_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Option<AgentPreferences>, RepositoryError> {
        let row = sqlx::query(
            "SELECT user_id, enabled, min_acceptable_price, max_acceptable_price,
                    auto_accept_threshold, strategy, max_counter_offers, updated_at
             FROM agent_preferences WHERE user_id = ?",
        )
        .bind(&user_id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_preferences(r)?)),
            None => Ok(None),
        }
    }

    async fn save_for_user(
        &self,
        user_id: &UserId,
        preferences: AgentPreferences,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO agent_preferences (user_id, enabled, min_acceptable_price,
                                            max_acceptable_price, auto_accept_threshold,
                                            strategy, max_counter_offers, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(user_id) DO UPDATE SET
                 enabled = excluded.enabled,
                 min_acceptable_price = excluded.min_acceptable_price,
                 max_acceptable_price = excluded.max_acceptable_price,
                 auto_accept_threshold = excluded.auto_accept_threshold,
                 strategy = excluded.strategy,
                 max_counter_offers = excluded.max_counter_offers,
                 updated_at = excluded.updated_at",
        )
        .bind(&user_id.0)
        .bind(preferences.enabled as i64)
        .bind(preferences.min_acceptable_price.map(|price| price.to_string()))
        .bind(preferences.max_acceptable_price.map(|price| price.to_string()))
        .bind(preferences.auto_accept_threshold.to_string())
        .bind(strategy_as_str(preferences.strategy))
        .bind(preferences.max_counter_offers as i64)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
