//! PostgreSQL projection store.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use super::ProjectionStore;
use crate::domain::RecordProjection;
use crate::infra::OffchainError;

pub struct PgProjectionStore {
    pool: PgPool,
}

impl PgProjectionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProjectionStore for PgProjectionStore {
    async fn insert_record(&self, projection: &RecordProjection) -> Result<(), OffchainError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO products (id, type, farmer_name, description)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&projection.id)
        .bind(&projection.kind)
        .bind(&projection.origin_holder_name)
        .bind(&projection.description)
        .execute(&mut *tx)
        .await?;

        if let Some(attachment) = &projection.attachment {
            sqlx::query(
                r#"
                INSERT INTO documents (product_id, content_hash, file_name)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(&attachment.record_id)
            .bind(&attachment.content_hash)
            .bind(&attachment.display_name)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(
            record_id = %projection.id,
            with_attachment = projection.attachment.is_some(),
            "Projection written"
        );
        Ok(())
    }
}
