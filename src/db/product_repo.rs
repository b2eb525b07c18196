// src/db/product_repo.rs

use std::collections::HashMap;

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::common::error::AppError;

#[derive(Clone, Default)]
pub struct ProductRepository;

impl ProductRepository {
    pub fn new() -> Self {
        Self
    }

    /// Resolve `product_id -> nome` numa única query (sem N+1).
    /// Ids de outro tenant ou inexistentes simplesmente não aparecem no mapa.
    pub async fn resolve_names<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        product_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, String>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        if product_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(Uuid, String)> = sqlx::query_as(
            "SELECT id, name FROM products WHERE tenant_id = $1 AND id = ANY($2)",
        )
        .bind(tenant_id)
        .bind(product_ids)
        .fetch_all(executor)
        .await?;

        Ok(rows.into_iter().collect())
    }
}
