//! Advertisement Directory

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// Advertisement card resolved from the ad directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Advertisement {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub title: String,
    pub price_cents: i64,
    pub primary_image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Look up an advertisement by ID
pub async fn get_ad_by_id(pool: &PgPool, ad_id: Uuid) -> Result<Option<Advertisement>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT id, seller_id, title, price_cents, primary_image, created_at
        FROM advertisements
        WHERE id = $1
        "#,
    )
    .bind(ad_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| Advertisement {
        id: r.get("id"),
        seller_id: r.get("seller_id"),
        title: r.get("title"),
        price_cents: r.get("price_cents"),
        primary_image: r.get("primary_image"),
        created_at: r.get("created_at"),
    }))
}
