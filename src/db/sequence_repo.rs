// src/db/sequence_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{common::error::AppError, models::billing::DocumentType};

#[derive(Clone, Default)]
pub struct SequenceRepository;

impl SequenceRepository {
    pub fn new() -> Self {
        Self
    }

    /// Incrementa o contador de (tenant, tipo) e devolve o novo valor.
    ///
    /// O UPSERT trava a linha do contador até o fim da transação do
    /// chamador: outra alocação para o mesmo par espera o COMMIT/ROLLBACK,
    /// pares diferentes não competem. Num ROLLBACK o incremento é desfeito.
    /// Na primeira alocação o contador parte do maior sufixo numérico já
    /// gravado para o par.
    pub async fn next_value<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        doc_type: DocumentType,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let value: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO document_sequences (tenant_id, doc_type, last_value)
            VALUES (
                $1, $2,
                COALESCE((
                    SELECT MAX(CAST(SUBSTRING(number FROM '[0-9]+$') AS BIGINT))
                    FROM tax_documents
                    WHERE tenant_id = $1 AND doc_type = $2
                ), 0) + 1
            )
            ON CONFLICT (tenant_id, doc_type)
            DO UPDATE SET
                last_value = document_sequences.last_value + 1,
                updated_at = NOW()
            RETURNING last_value
            "#,
        )
        .bind(tenant_id)
        .bind(doc_type)
        .fetch_one(executor)
        .await?;

        Ok(value)
    }
}
