use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::Row;

use haggle_core::domain::negotiation::{
    ListingId, Negotiation, NegotiationId, NegotiationStatus, SpaceCategory, UserId,
};

use super::{NegotiationRepository, RepositoryError};
use crate::DbPool;

pub struct SqlNegotiationRepository {
    pool: DbPool,
}

impl SqlNegotiationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

pub fn negotiation_status_as_str(status: NegotiationStatus) -> &'static str {
    match status {
        NegotiationStatus::Pending => "pending",
        NegotiationStatus::Negotiating => "negotiating",
        NegotiationStatus::Accepted => "accepted",
        NegotiationStatus::Rejected => "rejected",
    }
}

fn parse_negotiation_status(s: &str) -> NegotiationStatus {
    match s {
        "negotiating" => NegotiationStatus::Negotiating,
        "accepted" => NegotiationStatus::Accepted,
        "rejected" => NegotiationStatus::Rejected,
        _ => NegotiationStatus::Pending,
    }
}

pub fn category_as_str(category: SpaceCategory) -> &'static str {
    match category {
        SpaceCategory::Driveway => "driveway",
        SpaceCategory::Garage => "garage",
        SpaceCategory::StorageUnit => "storage_unit",
        SpaceCategory::ParkingLot => "parking_lot",
        SpaceCategory::Other => "other",
    }
}

fn parse_category(s: &str) -> SpaceCategory {
    match s {
        "driveway" => SpaceCategory::Driveway,
        "garage" => SpaceCategory::Garage,
        "storage_unit" => SpaceCategory::StorageUnit,
        "parking_lot" => SpaceCategory::ParkingLot,
        _ => SpaceCategory::Other,
    }
}

fn parse_price(s: &str) -> Result<Decimal, RepositoryError> {
    s.parse::<Decimal>().map_err(|e| RepositoryError::Decode(e.to_string()))
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn row_to_negotiation(row: &sqlx::sqlite::SqliteRow) -> Result<Negotiation, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let listing_id: String =
        row.try_get("listing_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let owner_id: String =
        row.try_get("owner_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let renter_id: String =
        row.try_get("renter_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let listing_price_str: String =
        row.try_get("listing_price").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let category_str: String =
        row.try_get("space_category").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let location: String =
        row.try_get("location").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let status_str: String =
        row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let agreed_price_str: Option<String> =
        row.try_get("agreed_price").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at_str: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let agreed_price = match agreed_price_str {
        Some(value) => Some(parse_price(&value)?),
        None => None,
    };

    Ok(Negotiation {
        id: NegotiationId(id),
        listing_id: ListingId(listing_id),
        owner_id: UserId(owner_id),
        renter_id: UserId(renter_id),
        listing_price: parse_price(&listing_price_str)?,
        space_category: parse_category(&category_str),
        location,
        status: parse_negotiation_status(&status_str),
        agreed_price,
        created_at: parse_timestamp(&created_at_str),
        updated_at: parse_timestamp(&updated_at_str),
    })
}

#[async_trait::async_trait]
impl NegotiationRepository for SqlNegotiationRepository {
    async fn find_by_id(
        &self,
        id: &NegotiationId,
    ) -> Result<Option<Negotiation>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, listing_id, owner_id, renter_id, listing_price, space_category,
                    location, status, agreed_price, created_at, updated_at
             FROM negotiation WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_negotiation(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, negotiation: Negotiation) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO negotiation (id, listing_id, owner_id, renter_id, listing_price,
                                      space_category, location, status, agreed_price,
                                      created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 status = excluded.status,
                 agreed_price = excluded.agreed_price,
                 updated_at = excluded.updated_at",
        )
        .bind(&negotiation.id.0)
        .bind(&negotiation.listing_id.0)
        .bind(&negotiation.owner_id.0)
        .bind(&negotiation.renter_id.0)
        .bind(negotiation.listing_price.to_string())
        .bind(category_as_str(negotiation.space_category))
        .bind(&negotiation.location)
        .bind(negotiation_status_as_str(negotiation.status))
        .bind(negotiation.agreed_price.map(|price| price.to_string()))
        .bind(negotiation.created_at.to_rfc3339())
        .bind(negotiation.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
