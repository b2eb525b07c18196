// src/services/tax_document_service.rs

use std::{collections::HashMap, sync::Arc};

use chrono::NaiveDate;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{apply_tx_timeouts, TxTimeouts},
        error::AppError,
    },
    db::{CustomerRepository, ProductRepository, TaxDocumentRepository},
    models::billing::{
        DocumentChanges, DocumentDetail, DocumentFilter, DocumentPage, DocumentStats,
        DocumentTotals, LineItemInput, NewDocument, ResolvedLineItem, TaxDocument,
        TaxDocumentItem,
    },
    services::{
        numbering::DocumentNumberingService,
        tax_authority::TaxAuthorityGateway,
        totals::{self, LineAmount},
    },
};

// =============================================================================
//  REGRAS PURAS (sem banco)
// =============================================================================

/// Documento de outro tenant é "proibido", nunca "não encontrado".
pub fn ensure_owned(document: &TaxDocument, tenant_id: Uuid) -> Result<(), AppError> {
    if document.tenant_id != tenant_id {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

pub fn ensure_draft(document: &TaxDocument) -> Result<(), AppError> {
    if !document.is_draft() {
        return Err(AppError::InvalidState { status: document.status });
    }
    Ok(())
}

pub fn validate_schedule(issue_date: NaiveDate, due_date: NaiveDate) -> Result<(), AppError> {
    if due_date < issue_date {
        return Err(AppError::Validation(
            "a data de vencimento não pode ser anterior à data de emissão".to_string(),
        ));
    }
    Ok(())
}

pub fn line_amounts(items: &[LineItemInput]) -> Vec<LineAmount> {
    items
        .iter()
        .map(|item| LineAmount::new(item.quantity, item.unit_price))
        .collect()
}

/// Monta as linhas para INSERT. Sem descrição, usa o nome do produto.
pub fn resolve_items(
    items: &[LineItemInput],
    product_names: &HashMap<Uuid, String>,
) -> Result<Vec<ResolvedLineItem>, AppError> {
    items
        .iter()
        .map(|item| {
            let product_name = product_names.get(&item.product_id).ok_or_else(|| {
                AppError::Validation(format!("produto {} não encontrado", item.product_id))
            })?;

            let description = item
                .description
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .unwrap_or(product_name)
                .to_string();

            Ok(ResolvedLineItem {
                product_id: item.product_id,
                description,
                quantity: item.quantity,
                unit_price: item.unit_price,
                total: totals::line_total(item.quantity, item.unit_price),
            })
        })
        .collect()
}

// =============================================================================
//  SERVIÇO
// =============================================================================

#[derive(Clone)]
pub struct TaxDocumentService {
    pool: PgPool,
    repo: TaxDocumentRepository,
    products: ProductRepository,
    customers: CustomerRepository,
    numbering: DocumentNumberingService,
    gateway: Arc<dyn TaxAuthorityGateway>,
    timeouts: TxTimeouts,
}

impl TaxDocumentService {
    pub fn new(
        pool: PgPool,
        numbering: DocumentNumberingService,
        gateway: Arc<dyn TaxAuthorityGateway>,
        timeouts: TxTimeouts,
    ) -> Self {
        Self {
            pool,
            repo: TaxDocumentRepository::new(),
            products: ProductRepository::new(),
            customers: CustomerRepository::new(),
            numbering,
            gateway,
            timeouts,
        }
    }

    // --- CRIAÇÃO ---

    #[tracing::instrument(skip(self, input), fields(doc_type = %input.doc_type))]
    pub async fn create_document(
        &self,
        tenant_id: Uuid,
        input: NewDocument,
    ) -> Result<DocumentDetail, AppError> {
        // 1. Validação antes de abrir qualquer transação
        validate_schedule(input.issue_date, input.due_date)?;
        let totals = totals::calculate(&line_amounts(&input.items))?;

        let customer_name = self.customer_name(tenant_id, input.customer_id).await?;
        let items = self.resolve_products(tenant_id, &input.items).await?;

        // 2. Folio + cabeçalho + itens numa única transação
        let mut tx = self.begin_write().await?;
        let (document, items) = self
            .persist_new_document(&mut tx, tenant_id, &input, &totals, &items)
            .await?;
        tx.commit().await?;

        tracing::info!(
            document_id = %document.id,
            number = %document.number,
            total = %document.total,
            "✅ Documento criado"
        );

        Ok(DocumentDetail { document, customer_name, items })
    }

    /// Aloca o folio e grava cabeçalho e itens na conexão recebida.
    /// Quem chama é dono da transação: sem COMMIT nada disso fica visível,
    /// inclusive o incremento do contador.
    pub async fn persist_new_document(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        input: &NewDocument,
        totals: &DocumentTotals,
        items: &[ResolvedLineItem],
    ) -> Result<(TaxDocument, Vec<TaxDocumentItem>), AppError> {
        let number = self
            .numbering
            .allocate(&mut *conn, tenant_id, input.doc_type)
            .await?;

        let document = self
            .repo
            .insert_document(
                &mut *conn,
                tenant_id,
                input.customer_id,
                input.doc_type,
                &number,
                input.issue_date,
                input.due_date,
                totals,
            )
            .await?;

        let items = self.insert_items(conn, document.id, items).await?;

        Ok((document, items))
    }

    // --- ATUALIZAÇÃO ---

    #[tracing::instrument(skip(self, changes))]
    pub async fn update_document(
        &self,
        tenant_id: Uuid,
        document_id: Uuid,
        changes: DocumentChanges,
    ) -> Result<DocumentDetail, AppError> {
        // Tenant e estado primeiro: um documento enviado é recusado
        // antes de qualquer validação ou transação.
        let current = self.fetch_owned(tenant_id, document_id).await?;
        ensure_draft(&current)?;

        validate_schedule(changes.issue_date, changes.due_date)?;
        let totals = totals::calculate(&line_amounts(&changes.items))?;

        if let Some(customer_id) = changes.customer_id {
            self.customer_name(tenant_id, customer_id).await?;
        }
        let items = self.resolve_products(tenant_id, &changes.items).await?;

        let mut tx = self.begin_write().await?;

        // Revalida com a linha travada: um `send` concorrente pode ter passado na frente
        let locked = self.lock_owned(&mut tx, tenant_id, document_id).await?;
        ensure_draft(&locked)?;

        let document = self
            .repo
            .update_header(
                &mut *tx,
                document_id,
                changes.customer_id,
                changes.issue_date,
                changes.due_date,
                &totals,
            )
            .await?
            .ok_or(AppError::InvalidState { status: locked.status })?;

        // Substituição completa dos itens
        let removed = self.repo.delete_items(&mut *tx, document_id).await?;
        let items = self.insert_items(&mut tx, document_id, &items).await?;

        let customer_name = self
            .customers
            .find_name(&mut *tx, tenant_id, document.customer_id)
            .await?
            .unwrap_or_default();

        tx.commit().await?;

        tracing::info!(
            number = %document.number,
            removed_items = removed,
            inserted_items = items.len(),
            total = %document.total,
            "✏️ Documento atualizado"
        );

        Ok(DocumentDetail { document, customer_name, items })
    }

    // --- EXCLUSÃO ---

    #[tracing::instrument(skip(self))]
    pub async fn delete_document(&self, tenant_id: Uuid, document_id: Uuid) -> Result<(), AppError> {
        let current = self.fetch_owned(tenant_id, document_id).await?;
        ensure_draft(&current)?;

        let mut tx = self.begin_write().await?;

        let locked = self.lock_owned(&mut tx, tenant_id, document_id).await?;
        ensure_draft(&locked)?;

        // Itens e cabeçalho juntos (o FK também tem ON DELETE CASCADE)
        let removed_items = self.repo.delete_items(&mut *tx, document_id).await?;
        let removed = self.repo.delete_document(&mut *tx, document_id).await?;
        if removed == 0 {
            return Err(AppError::InvalidState { status: locked.status });
        }

        tx.commit().await?;

        tracing::info!(number = %locked.number, removed_items, "🗑️ Documento excluído");
        Ok(())
    }

    // --- ENVIO (SII simulado) ---

    #[tracing::instrument(skip(self))]
    pub async fn send_document(
        &self,
        tenant_id: Uuid,
        document_id: Uuid,
    ) -> Result<TaxDocument, AppError> {
        let current = self.fetch_owned(tenant_id, document_id).await?;
        ensure_draft(&current)?;

        let mut tx = self.begin_write().await?;

        let locked = self.lock_owned(&mut tx, tenant_id, document_id).await?;
        ensure_draft(&locked)?;

        let track_id = self.gateway.submit(&locked).await?;

        let document = self
            .repo
            .mark_sent(&mut *tx, document_id, &track_id)
            .await?
            .ok_or(AppError::InvalidState { status: locked.status })?;

        tx.commit().await?;
        Ok(document)
    }

    // --- LEITURA ---

    pub async fn get_document(
        &self,
        tenant_id: Uuid,
        document_id: Uuid,
    ) -> Result<DocumentDetail, AppError> {
        // Cabeçalho e itens do mesmo snapshot
        let mut tx = self.begin_snapshot().await?;

        let document = self
            .repo
            .find_by_id(&mut *tx, document_id)
            .await?
            .ok_or(AppError::DocumentNotFound(document_id))?;
        ensure_owned(&document, tenant_id)?;

        let items = self.repo.list_items(&mut *tx, document_id).await?;
        let customer_name = self
            .customers
            .find_name(&mut *tx, tenant_id, document.customer_id)
            .await?
            .unwrap_or_default();

        tx.commit().await?;
        Ok(DocumentDetail { document, customer_name, items })
    }

    pub async fn list_documents(
        &self,
        tenant_id: Uuid,
        filter: &DocumentFilter,
    ) -> Result<DocumentPage, AppError> {
        let mut tx = self.begin_snapshot().await?;

        let items = self.repo.list(&mut *tx, tenant_id, filter).await?;
        let total = self.repo.count(&mut *tx, tenant_id, filter).await?;

        tx.commit().await?;
        Ok(DocumentPage {
            items,
            total,
            page: filter.page(),
            per_page: filter.per_page(),
        })
    }

    pub async fn document_stats(
        &self,
        tenant_id: Uuid,
        today: NaiveDate,
    ) -> Result<DocumentStats, AppError> {
        self.repo.stats(&self.pool, tenant_id, today).await
    }

    // =========================================================================
    //  HELPERS
    // =========================================================================

    async fn begin_write(&self) -> Result<Transaction<'static, Postgres>, AppError> {
        let mut tx = self.pool.begin().await?;
        apply_tx_timeouts(&mut tx, &self.timeouts).await?;
        Ok(tx)
    }

    async fn begin_snapshot(&self) -> Result<Transaction<'static, Postgres>, AppError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }

    async fn fetch_owned(&self, tenant_id: Uuid, document_id: Uuid) -> Result<TaxDocument, AppError> {
        let document = self
            .repo
            .find_by_id(&self.pool, document_id)
            .await?
            .ok_or(AppError::DocumentNotFound(document_id))?;
        ensure_owned(&document, tenant_id)?;
        Ok(document)
    }

    async fn lock_owned(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        document_id: Uuid,
    ) -> Result<TaxDocument, AppError> {
        let document = self
            .repo
            .lock_by_id(conn, document_id)
            .await?
            .ok_or(AppError::DocumentNotFound(document_id))?;
        ensure_owned(&document, tenant_id)?;
        Ok(document)
    }

    async fn customer_name(&self, tenant_id: Uuid, customer_id: Uuid) -> Result<String, AppError> {
        self.customers
            .find_name(&self.pool, tenant_id, customer_id)
            .await?
            .ok_or_else(|| AppError::Validation(format!("cliente {} não encontrado", customer_id)))
    }

    async fn resolve_products(
        &self,
        tenant_id: Uuid,
        items: &[LineItemInput],
    ) -> Result<Vec<ResolvedLineItem>, AppError> {
        let mut product_ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
        product_ids.sort_unstable();
        product_ids.dedup();

        let names = self
            .products
            .resolve_names(&self.pool, tenant_id, &product_ids)
            .await?;

        resolve_items(items, &names)
    }

    async fn insert_items(
        &self,
        conn: &mut PgConnection,
        document_id: Uuid,
        items: &[ResolvedLineItem],
    ) -> Result<Vec<TaxDocumentItem>, AppError> {
        let mut inserted = Vec::with_capacity(items.len());
        for (position, item) in items.iter().enumerate() {
            let position = i32::try_from(position)
                .map_err(|_| AppError::Validation("itens demais no documento".to_string()))?;
            inserted.push(self.repo.insert_item(&mut *conn, document_id, position, item).await?);
        }
        Ok(inserted)
    }
}
