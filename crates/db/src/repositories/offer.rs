use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::Row;

use haggle_core::domain::negotiation::NegotiationId;
use haggle_core::domain::offer::{Offer, OfferId, OfferStatus, PartyRole};

use super::{OfferRepository, RepositoryError};
use crate::DbPool;

pub struct SqlOfferRepository {
    pool: DbPool,
}

impl SqlOfferRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

pub fn offer_status_as_str(status: OfferStatus) -> &'static str {
    match status {
        OfferStatus::Pending => "pending",
        OfferStatus::Accepted => "accepted",
        OfferStatus::Rejected => "rejected",
        OfferStatus::Superseded => "superseded",
    }
}

fn parse_offer_status(s: &str) -> OfferStatus {
    match s {
        "accepted" => OfferStatus::Accepted,
        "rejected" => OfferStatus::Rejected,
        "superseded" => OfferStatus::Superseded,
        _ => OfferStatus::Pending,
    }
}

pub fn party_as_str(party: PartyRole) -> &'static str {
    match party {
        PartyRole::Owner => "owner",
        PartyRole::Renter => "renter",
    }
}

fn parse_party(s: &str) -> Result<PartyRole, RepositoryError> {
    match s {
        "owner" => Ok(PartyRole::Owner),
        "renter" => Ok(PartyRole::Renter),
        other => Err(RepositoryError::Decode(format!("unknown party role `{other}`"))),
    }
}

fn parse_price(s: &str) -> Result<Decimal, RepositoryError> {
    s.parse::<Decimal>().map_err(|e| RepositoryError::Decode(e.to_string()))
}

fn row_to_offer(row: &sqlx::sqlite::SqliteRow) -> Result<Offer, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let negotiation_id: String =
        row.try_get("negotiation_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let price_str: String =
        row.try_get("price").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let from_party_str: String =
        row.try_get("from_party").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let to_party_str: String =
        row.try_get("to_party").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let message: Option<String> =
        row.try_get("message").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let status_str: String =
        row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());

    Ok(Offer {
        id: OfferId(id),
        negotiation_id: NegotiationId(negotiation_id),
        price: parse_price(&price_str)?,
        from_party: parse_party(&from_party_str)?,
        to_party: parse_party(&to_party_str)?,
        message,
        status: parse_offer_status(&status_str),
        created_at,
    })
}

#[async_trait::async_trait]
impl OfferRepository for SqlOfferRepository {
    async fn insert(&self, offer: Offer) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO offer (id, negotiation_id, price, from_party, to_party,
                                message, status, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&offer.id.0)
        .bind(&offer.negotiation_id.0)
        .bind(offer.price.to_string())
        .bind(party_as_str(offer.from_party))
        .bind(party_as_str(offer.to_party))
        .bind(&offer.message)
        .bind(offer_status_as_str(offer.status))
        .bind(offer.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_status(
        &self,
        id: &OfferId,
        status: OfferStatus,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE offer SET status = ? WHERE id = ?")
            .bind(offer_status_as_str(status))
            .bind(&id.0)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("offer `{}`", id.0)));
        }

        Ok(())
    }

    async fn latest_for_negotiation(
        &self,
        negotiation_id: &NegotiationId,
    ) -> Result<Option<Offer>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, negotiation_id, price, from_party, to_party, message, status, created_at
             FROM offer WHERE negotiation_id = ?
             ORDER BY created_at DESC, rowid DESC
             LIMIT 1",
        )
        .bind(&negotiation_id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_offer(r)?)),
            None => Ok(None),
        }
    }

    async fn history_for_negotiation(
        &self,
        negotiation_id: &NegotiationId,
    ) -> Result<Vec<Offer>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, negotiation_id, price, from_party, to_party, message, status, created_at
             FROM offer WHERE negotiation_id = ?
             ORDER BY created_at DESC, rowid DESC",
        )
        .bind(&negotiation_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_offer).collect()
    }
}
