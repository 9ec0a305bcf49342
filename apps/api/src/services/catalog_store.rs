use crate::error::{ApiError, Result};
use crate::models::{NewWine, WineRecord, WineType};
use crate::services::traits::CatalogStore;
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{debug, info};

const CREATE_WINES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS wines (
    id BIGSERIAL PRIMARY KEY,
    name TEXT NOT NULL,
    type TEXT NOT NULL,
    region TEXT NOT NULL,
    flavor_profile TEXT NOT NULL,
    price_range TEXT NOT NULL,
    country TEXT NOT NULL,
    description TEXT NOT NULL,
    image_url TEXT NOT NULL,
    affiliate_url TEXT NOT NULL
)
"#;

const SELECT_COLUMNS: &str = "id, name, type, region, flavor_profile, price_range, country, \
                              description, image_url, affiliate_url";

/// `wines` table in PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct WineRow {
    id: i64,
    name: String,
    #[sqlx(rename = "type")]
    wine_type: String,
    region: String,
    flavor_profile: String,
    price_range: String,
    country: String,
    description: String,
    image_url: String,
    affiliate_url: String,
}

impl TryFrom<WineRow> for WineRecord {
    type Error = ApiError;

    fn try_from(row: WineRow) -> Result<Self> {
        let wine_type = row.wine_type.parse::<WineType>().map_err(|e| {
            ApiError::DatabaseError(format!("wine {} has an invalid type: {}", row.id, e))
        })?;

        Ok(WineRecord {
            id: row.id,
            name: row.name,
            wine_type,
            region: row.region,
            flavor_profile: row.flavor_profile,
            country: row.country,
            description: row.description,
            image_url: row.image_url,
            affiliate_url: row.affiliate_url,
            price_range: row.price_range,
        })
    }
}

impl PgCatalogStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await?;

        let store = Self { pool };
        store.ensure_schema().await?;
        info!("Connected to catalog database");
        Ok(store)
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(CREATE_WINES_TABLE).execute(&self.pool).await?;
        Ok(())
    }
}

fn into_records(rows: Vec<WineRow>) -> Result<Vec<WineRecord>> {
    rows.into_iter().map(WineRecord::try_from).collect()
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn insert(&self, wine: &NewWine) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"INSERT INTO wines
               (name, type, region, flavor_profile, price_range, country, description, image_url, affiliate_url)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
               RETURNING id"#,
        )
        .bind(&wine.name)
        .bind(wine.wine_type.as_str())
        .bind(&wine.region)
        .bind(&wine.flavor_profile)
        .bind(&wine.price_range)
        .bind(&wine.country)
        .bind(&wine.description)
        .bind(&wine.image_url)
        .bind(&wine.affiliate_url)
        .fetch_one(&self.pool)
        .await?;

        debug!("Inserted wine {} as id {}", wine.name, id);
        Ok(id)
    }

    async fn all_wines(&self) -> Result<Vec<WineRecord>> {
        let rows: Vec<WineRow> =
            sqlx::query_as(&format!("SELECT {} FROM wines ORDER BY id", SELECT_COLUMNS))
                .fetch_all(&self.pool)
                .await?;
        into_records(rows)
    }

    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<WineRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<WineRow> = sqlx::query_as(&format!(
            "SELECT {} FROM wines WHERE id = ANY($1)",
            SELECT_COLUMNS
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        into_records(rows)
    }
}
