// src/models/billing.rs

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Enums (Mapeando o Postgres) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "document_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Invoice,    // Factura
    Receipt,    // Boleta
    CreditNote, // Nota de crédito
    DebitNote,  // Nota de débito
}

impl DocumentType {
    pub const ALL: [DocumentType; 4] = [
        DocumentType::Invoice,
        DocumentType::Receipt,
        DocumentType::CreditNote,
        DocumentType::DebitNote,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            DocumentType::Invoice => "invoice",
            DocumentType::Receipt => "receipt",
            DocumentType::CreditNote => "credit_note",
            DocumentType::DebitNote => "debit_note",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DocumentType::Invoice => "Factura",
            DocumentType::Receipt => "Boleta",
            DocumentType::CreditNote => "Nota de Crédito",
            DocumentType::DebitNote => "Nota de Débito",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "document_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Draft,    // Rascunho (único estado editável)
    Sent,     // Enviado ao SII
    Accepted, // Aceito
    Rejected, // Rejeitado
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Draft => "draft",
            DocumentStatus::Sent => "sent",
            DocumentStatus::Accepted => "accepted",
            DocumentStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Structs persistidas ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaxDocument {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub customer_id: Uuid,

    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    #[schema(example = "F-00000042")]
    pub number: String,
    pub status: DocumentStatus,

    #[schema(value_type = String, format = Date, example = "2025-03-01")]
    pub issue_date: NaiveDate,
    #[schema(value_type = String, format = Date, example = "2025-03-31")]
    pub due_date: NaiveDate,

    // Valores
    #[schema(example = "2500")]
    pub subtotal: Decimal,
    #[schema(example = "475.00")]
    pub tax_amount: Decimal,
    #[schema(example = "2975.00")]
    pub total: Decimal,

    pub paid_at: Option<DateTime<Utc>>,
    #[schema(example = "DEMO-3f2a9c1d")]
    pub sii_track_id: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaxDocument {
    pub fn is_draft(&self) -> bool {
        self.status == DocumentStatus::Draft
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaxDocumentItem {
    pub id: Uuid,
    pub document_id: Uuid,
    pub product_id: Uuid,
    #[schema(example = 0)]
    pub position: i32,
    #[schema(example = "Servicio de mantención")]
    pub description: String,
    #[schema(example = "2")]
    pub quantity: Decimal,
    #[schema(example = "1000")]
    pub unit_price: Decimal,
    #[schema(example = "2000")]
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
}

// --- Entradas do serviço ---

/// Linha enviada pelo cliente, antes de resolver o nome do produto.
#[derive(Debug, Clone, PartialEq)]
pub struct LineItemInput {
    pub product_id: Uuid,
    pub description: Option<String>,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

/// Linha pronta para INSERT: descrição resolvida e total calculado.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLineItem {
    pub product_id: Uuid,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone)]
pub struct NewDocument {
    pub customer_id: Uuid,
    pub doc_type: DocumentType,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub items: Vec<LineItemInput>,
}

/// Alterações de um rascunho. Sem `customer_id`, o cliente atual é mantido.
#[derive(Debug, Clone)]
pub struct DocumentChanges {
    pub customer_id: Option<Uuid>,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub items: Vec<LineItemInput>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentTotals {
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
}

// --- Modelos de leitura ---

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDetail {
    #[serde(flatten)]
    pub document: TaxDocument,
    pub customer_name: String,
    pub items: Vec<TaxDocumentItem>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub document: TaxDocument,
    pub customer_name: String,
    pub customer_rut: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPage {
    pub items: Vec<DocumentSummary>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentStats {
    pub total_draft: i64,
    pub total_sent: i64,
    pub total_accepted: i64,
    pub total_overdue: i64,
}

/// Filtros da listagem. `page` começa em 1.
#[derive(Debug, Clone, Default)]
pub struct DocumentFilter {
    pub search: Option<String>,
    pub status: Option<DocumentStatus>,
    pub doc_type: Option<DocumentType>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl DocumentFilter {
    pub const DEFAULT_PER_PAGE: u32 = 15;
    pub const MAX_PER_PAGE: u32 = 100;

    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
            .unwrap_or(Self::DEFAULT_PER_PAGE)
            .clamp(1, Self::MAX_PER_PAGE)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page() - 1) * i64::from(self.per_page())
    }

    /// Termo de busca no formato do ILIKE, ou None se vazio.
    pub fn search_pattern(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                let escaped = s
                    .replace('\\', "\\\\")
                    .replace('%', "\\%")
                    .replace('_', "\\_");
                format!("%{}%", escaped)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults_and_clamps() {
        let filter = DocumentFilter::default();
        assert_eq!(filter.page(), 1);
        assert_eq!(filter.per_page(), 15);
        assert_eq!(filter.offset(), 0);

        let filter = DocumentFilter { page: Some(3), per_page: Some(500), ..Default::default() };
        assert_eq!(filter.per_page(), 100);
        assert_eq!(filter.offset(), 200);

        let filter = DocumentFilter { page: Some(0), per_page: Some(0), ..Default::default() };
        assert_eq!(filter.page(), 1);
        assert_eq!(filter.per_page(), 1);
    }

    #[test]
    fn search_pattern_escapes_like_wildcards() {
        let filter = DocumentFilter { search: Some("  50%_off ".into()), ..Default::default() };
        assert_eq!(filter.search_pattern().as_deref(), Some("%50\\%\\_off%"));

        let blank = DocumentFilter { search: Some("   ".into()), ..Default::default() };
        assert_eq!(blank.search_pattern(), None);
    }

    #[test]
    fn enums_serialize_as_snake_case_codes() {
        assert_eq!(serde_json::to_string(&DocumentType::CreditNote).unwrap(), "\"credit_note\"");
        assert_eq!(serde_json::to_string(&DocumentStatus::Sent).unwrap(), "\"sent\"");
        let parsed: DocumentType = serde_json::from_str("\"debit_note\"").unwrap();
        assert_eq!(parsed, DocumentType::DebitNote);
        assert_eq!(DocumentType::Receipt.to_string(), "receipt");
    }
}
