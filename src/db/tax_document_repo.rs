// src/db/tax_document_repo.rs

use chrono::NaiveDate;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::billing::{
        DocumentFilter, DocumentStats, DocumentSummary, DocumentTotals, DocumentType,
        ResolvedLineItem, TaxDocument, TaxDocumentItem,
    },
};

// Filtros compartilhados entre a listagem e a contagem
const LIST_FILTERS: &str = r#"
    FROM tax_documents d
    JOIN customers c ON c.id = d.customer_id
    WHERE d.tenant_id = $1
      AND ($2::text IS NULL OR d.number ILIKE $2 OR c.name ILIKE $2 OR c.rut ILIKE $2)
      AND ($3::document_status IS NULL OR d.status = $3)
      AND ($4::document_type IS NULL OR d.doc_type = $4)
      AND ($5::date IS NULL OR d.issue_date >= $5)
      AND ($6::date IS NULL OR d.issue_date <= $6)
"#;

#[derive(Clone, Default)]
pub struct TaxDocumentRepository;

impl TaxDocumentRepository {
    pub fn new() -> Self {
        Self
    }

    // =========================================================================
    //  LEITURA
    // =========================================================================

    /// Busca só pelo id. A checagem de tenant fica com o serviço, para
    /// distinguir "não existe" de "pertence a outro tenant".
    pub async fn find_by_id<'e, E>(
        &self,
        executor: E,
        document_id: Uuid,
    ) -> Result<Option<TaxDocument>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let document = sqlx::query_as::<_, TaxDocument>("SELECT * FROM tax_documents WHERE id = $1")
            .bind(document_id)
            .fetch_optional(executor)
            .await?;

        Ok(document)
    }

    /// Igual a `find_by_id`, mas trava a linha até o fim da transação.
    pub async fn lock_by_id<'e, E>(
        &self,
        executor: E,
        document_id: Uuid,
    ) -> Result<Option<TaxDocument>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let document = sqlx::query_as::<_, TaxDocument>(
            "SELECT * FROM tax_documents WHERE id = $1 FOR UPDATE",
        )
        .bind(document_id)
        .fetch_optional(executor)
        .await?;

        Ok(document)
    }

    pub async fn list_items<'e, E>(
        &self,
        executor: E,
        document_id: Uuid,
    ) -> Result<Vec<TaxDocumentItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let items = sqlx::query_as::<_, TaxDocumentItem>(
            r#"
            SELECT * FROM tax_document_items
            WHERE document_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(document_id)
        .fetch_all(executor)
        .await?;

        Ok(items)
    }

    pub async fn list<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        filter: &DocumentFilter,
    ) -> Result<Vec<DocumentSummary>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            SELECT d.*, c.name AS customer_name, c.rut AS customer_rut
            {LIST_FILTERS}
            ORDER BY d.created_at DESC, d.number DESC
            LIMIT $7 OFFSET $8
            "#
        );

        let rows = sqlx::query_as::<_, DocumentSummary>(&sql)
            .bind(tenant_id)
            .bind(filter.search_pattern())
            .bind(filter.status)
            .bind(filter.doc_type)
            .bind(filter.from_date)
            .bind(filter.to_date)
            .bind(i64::from(filter.per_page()))
            .bind(filter.offset())
            .fetch_all(executor)
            .await?;

        Ok(rows)
    }

    pub async fn count<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        filter: &DocumentFilter,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT COUNT(*) {LIST_FILTERS}");

        let total: i64 = sqlx::query_scalar(&sql)
            .bind(tenant_id)
            .bind(filter.search_pattern())
            .bind(filter.status)
            .bind(filter.doc_type)
            .bind(filter.from_date)
            .bind(filter.to_date)
            .fetch_one(executor)
            .await?;

        Ok(total)
    }

    /// Contadores do painel em uma única query.
    pub async fn stats<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        today: NaiveDate,
    ) -> Result<DocumentStats, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let stats = sqlx::query_as::<_, DocumentStats>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE status = 'draft') AS total_draft,
                COUNT(*) FILTER (WHERE status = 'sent') AS total_sent,
                COUNT(*) FILTER (WHERE status = 'accepted') AS total_accepted,
                COUNT(*) FILTER (
                    WHERE status = 'accepted' AND paid_at IS NULL AND due_date < $2
                ) AS total_overdue
            FROM tax_documents
            WHERE tenant_id = $1
            "#,
        )
        .bind(tenant_id)
        .bind(today)
        .fetch_one(executor)
        .await?;

        Ok(stats)
    }

    // =========================================================================
    //  ESCRITA (sempre dentro de uma transação do serviço)
    // =========================================================================

    pub async fn insert_document<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        customer_id: Uuid,
        doc_type: DocumentType,
        number: &str,
        issue_date: NaiveDate,
        due_date: NaiveDate,
        totals: &DocumentTotals,
    ) -> Result<TaxDocument, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let document = sqlx::query_as::<_, TaxDocument>(
            r#"
            INSERT INTO tax_documents (
                tenant_id, customer_id, doc_type, number, status,
                issue_date, due_date, subtotal, tax_amount, total
            )
            VALUES ($1, $2, $3, $4, 'draft', $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(customer_id)
        .bind(doc_type)
        .bind(number)
        .bind(issue_date)
        .bind(due_date)
        .bind(totals.subtotal)
        .bind(totals.tax_amount)
        .bind(totals.total)
        .fetch_one(executor)
        .await?;

        Ok(document)
    }

    pub async fn insert_item<'e, E>(
        &self,
        executor: E,
        document_id: Uuid,
        position: i32,
        item: &ResolvedLineItem,
    ) -> Result<TaxDocumentItem, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = sqlx::query_as::<_, TaxDocumentItem>(
            r#"
            INSERT INTO tax_document_items (
                document_id, product_id, position, description, quantity, unit_price, total
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(document_id)
        .bind(item.product_id)
        .bind(position)
        .bind(&item.description)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(item.total)
        .fetch_one(executor)
        .await?;

        Ok(item)
    }

    /// Atualiza cabeçalho e totais de um rascunho. Retorna None se a linha
    /// não está mais em `draft`.
    pub async fn update_header<'e, E>(
        &self,
        executor: E,
        document_id: Uuid,
        customer_id: Option<Uuid>,
        issue_date: NaiveDate,
        due_date: NaiveDate,
        totals: &DocumentTotals,
    ) -> Result<Option<TaxDocument>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let document = sqlx::query_as::<_, TaxDocument>(
            r#"
            UPDATE tax_documents
            SET customer_id = COALESCE($2, customer_id),
                issue_date = $3,
                due_date = $4,
                subtotal = $5,
                tax_amount = $6,
                total = $7,
                updated_at = NOW()
            WHERE id = $1 AND status = 'draft'
            RETURNING *
            "#,
        )
        .bind(document_id)
        .bind(customer_id)
        .bind(issue_date)
        .bind(due_date)
        .bind(totals.subtotal)
        .bind(totals.tax_amount)
        .bind(totals.total)
        .fetch_optional(executor)
        .await?;

        Ok(document)
    }

    pub async fn delete_items<'e, E>(&self, executor: E, document_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM tax_document_items WHERE document_id = $1")
            .bind(document_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete_document<'e, E>(
        &self,
        executor: E,
        document_id: Uuid,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM tax_documents WHERE id = $1 AND status = 'draft'")
            .bind(document_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    /// Transição única `draft -> sent`.
    pub async fn mark_sent<'e, E>(
        &self,
        executor: E,
        document_id: Uuid,
        track_id: &str,
    ) -> Result<Option<TaxDocument>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let document = sqlx::query_as::<_, TaxDocument>(
            r#"
            UPDATE tax_documents
            SET status = 'sent', sii_track_id = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'draft'
            RETURNING *
            "#,
        )
        .bind(document_id)
        .bind(track_id)
        .fetch_optional(executor)
        .await?;

        Ok(document)
    }
}
