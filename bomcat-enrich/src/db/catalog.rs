//! Production catalog operations

use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::{CanonicalComponent, Lifecycle, PriceBreak, Specifications};
use bomcat_common::{Error, Result};

/// Insert or overwrite the catalog row for a component's mpn
pub async fn upsert_component(pool: &SqlitePool, component: &CanonicalComponent) -> Result<()> {
    upsert_inner(pool, component).await
}

/// Same upsert inside a caller-owned transaction (review acceptance)
pub(crate) async fn upsert_component_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    component: &CanonicalComponent,
) -> Result<()> {
    upsert_inner(&mut **tx, component).await
}

async fn upsert_inner<'e, E>(executor: E, component: &CanonicalComponent) -> Result<()>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let specifications = serde_json::to_string(&component.specifications)
        .map_err(|e| Error::Internal(format!("Failed to serialize specifications: {}", e)))?;
    let pricing = serde_json::to_string(&component.pricing)
        .map_err(|e| Error::Internal(format!("Failed to serialize pricing: {}", e)))?;
    let last_enriched_at = component.last_enriched_at.to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO catalog_components (
            id, mpn, manufacturer, category, description,
            datasheet_url, image_url, lifecycle, rohs, reach,
            specifications, pricing, quality_score,
            enrichment_source, last_enriched_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(mpn) DO UPDATE SET
            manufacturer = excluded.manufacturer,
            category = excluded.category,
            description = excluded.description,
            datasheet_url = excluded.datasheet_url,
            image_url = excluded.image_url,
            lifecycle = excluded.lifecycle,
            rohs = excluded.rohs,
            reach = excluded.reach,
            specifications = excluded.specifications,
            pricing = excluded.pricing,
            quality_score = excluded.quality_score,
            enrichment_source = excluded.enrichment_source,
            last_enriched_at = excluded.last_enriched_at
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&component.mpn)
    .bind(&component.manufacturer)
    .bind(&component.category)
    .bind(&component.description)
    .bind(&component.datasheet_url)
    .bind(&component.image_url)
    .bind(component.lifecycle.as_str())
    .bind(component.rohs)
    .bind(component.reach)
    .bind(&specifications)
    .bind(&pricing)
    .bind(component.quality_score)
    .bind(&component.enrichment_source)
    .bind(&last_enriched_at)
    .execute(executor)
    .await?;

    Ok(())
}

/// Load a catalog row by mpn
pub async fn get_component(pool: &SqlitePool, mpn: &str) -> Result<Option<CanonicalComponent>> {
    let row = sqlx::query(
        r#"
        SELECT mpn, manufacturer, category, description,
               datasheet_url, image_url, lifecycle, rohs, reach,
               specifications, pricing, quality_score,
               enrichment_source, last_enriched_at
        FROM catalog_components
        WHERE mpn = ?
        "#,
    )
    .bind(mpn)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let lifecycle: String = row.get("lifecycle");
    let lifecycle = match lifecycle.as_str() {
        "active" => Lifecycle::Active,
        "nrnd" => Lifecycle::Nrnd,
        "obsolete" => Lifecycle::Obsolete,
        "preview" => Lifecycle::Preview,
        "endoflife" => Lifecycle::EndOfLife,
        _ => Lifecycle::Unknown,
    };

    let specifications: String = row.get("specifications");
    let specifications: Specifications = serde_json::from_str(&specifications)
        .map_err(|e| Error::Internal(format!("Failed to deserialize specifications: {}", e)))?;

    let pricing: String = row.get("pricing");
    let pricing: Vec<PriceBreak> = serde_json::from_str(&pricing)
        .map_err(|e| Error::Internal(format!("Failed to deserialize pricing: {}", e)))?;

    let last_enriched_at: String = row.get("last_enriched_at");
    let last_enriched_at = chrono::DateTime::parse_from_rfc3339(&last_enriched_at)
        .map_err(|e| Error::Internal(format!("Failed to parse last_enriched_at: {}", e)))?
        .with_timezone(&chrono::Utc);

    Ok(Some(CanonicalComponent {
        mpn: row.get("mpn"),
        manufacturer: row.get("manufacturer"),
        category: row.get("category"),
        description: row.get("description"),
        datasheet_url: row.get("datasheet_url"),
        image_url: row.get("image_url"),
        lifecycle,
        rohs: row.get("rohs"),
        reach: row.get("reach"),
        specifications,
        pricing,
        quality_score: row.get("quality_score"),
        enrichment_source: row.get("enrichment_source"),
        last_enriched_at,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_pool;

    fn sample_component() -> CanonicalComponent {
        CanonicalComponent {
            mpn: "LM358DR".to_string(),
            manufacturer: Some("Texas Instruments".to_string()),
            category: Some("Amplifiers".to_string()),
            description: Some("Dual op-amp SOIC-8".to_string()),
            datasheet_url: Some("https://example.com/lm358.pdf".to_string()),
            image_url: None,
            lifecycle: Lifecycle::Active,
            rohs: Some(true),
            reach: None,
            specifications: Specifications::default(),
            pricing: vec![PriceBreak {
                quantity: 1,
                price: 0.25,
                supplier: "DigiSupply".to_string(),
            }],
            quality_score: 96.5,
            enrichment_source: "DigiSupply".to_string(),
            last_enriched_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_upsert_and_get_round_trip() {
        let pool = init_memory_pool().await.unwrap();
        let component = sample_component();

        upsert_component(&pool, &component).await.unwrap();

        let loaded = get_component(&pool, "LM358DR").await.unwrap().unwrap();
        assert_eq!(loaded.mpn, component.mpn);
        assert_eq!(loaded.lifecycle, Lifecycle::Active);
        assert_eq!(loaded.rohs, Some(true));
        assert_eq!(loaded.reach, None);
        assert_eq!(loaded.pricing, component.pricing);
        assert_eq!(loaded.quality_score, 96.5);
    }

    #[tokio::test]
    async fn test_upsert_overwrites_same_mpn() {
        let pool = init_memory_pool().await.unwrap();
        let mut component = sample_component();

        upsert_component(&pool, &component).await.unwrap();

        component.quality_score = 98.0;
        component.enrichment_source = "ElectroMart".to_string();
        upsert_component(&pool, &component).await.unwrap();

        let loaded = get_component(&pool, "LM358DR").await.unwrap().unwrap();
        assert_eq!(loaded.quality_score, 98.0);
        assert_eq!(loaded.enrichment_source, "ElectroMart");

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM catalog_components")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_get_missing_component() {
        let pool = init_memory_pool().await.unwrap();
        assert!(get_component(&pool, "NOPE123").await.unwrap().is_none());
    }
}
