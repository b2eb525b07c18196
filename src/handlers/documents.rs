// src/handlers/documents.rs

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::tenancy::TenantContext,
    models::billing::{
        DocumentChanges, DocumentDetail, DocumentFilter, DocumentPage, DocumentStats,
        DocumentStatus, DocumentType, LineItemInput, NewDocument, TaxDocument,
    },
    services::pdf_service,
};

// =============================================================================
//  PAYLOADS
// =============================================================================

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LineItemPayload {
    pub product_id: Uuid,

    #[validate(length(max = 500, message = "A descrição pode ter no máximo 500 caracteres"))]
    #[schema(example = "Servicio de mantención")]
    pub description: Option<String>,

    #[schema(example = "2")]
    pub quantity: Decimal,

    #[schema(example = "1000")]
    pub unit_price: Decimal,
}

impl From<LineItemPayload> for LineItemInput {
    fn from(payload: LineItemPayload) -> Self {
        Self {
            product_id: payload.product_id,
            description: payload.description,
            quantity: payload.quantity,
            unit_price: payload.unit_price,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateDocumentPayload {
    pub customer_id: Uuid,

    #[serde(rename = "type")]
    #[schema(example = "invoice")]
    pub doc_type: DocumentType,

    #[schema(value_type = String, format = Date, example = "2025-03-01")]
    pub issue_date: NaiveDate,

    #[schema(value_type = String, format = Date, example = "2025-03-31")]
    pub due_date: NaiveDate,

    #[validate(length(min = 1, message = "Informe pelo menos um item"), nested)]
    pub items: Vec<LineItemPayload>,
}

impl From<CreateDocumentPayload> for NewDocument {
    fn from(payload: CreateDocumentPayload) -> Self {
        Self {
            customer_id: payload.customer_id,
            doc_type: payload.doc_type,
            issue_date: payload.issue_date,
            due_date: payload.due_date,
            items: payload.items.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDocumentPayload {
    /// Sem valor, mantém o cliente atual.
    pub customer_id: Option<Uuid>,

    #[schema(value_type = String, format = Date, example = "2025-03-01")]
    pub issue_date: NaiveDate,

    #[schema(value_type = String, format = Date, example = "2025-03-31")]
    pub due_date: NaiveDate,

    #[validate(length(min = 1, message = "Informe pelo menos um item"), nested)]
    pub items: Vec<LineItemPayload>,
}

impl From<UpdateDocumentPayload> for DocumentChanges {
    fn from(payload: UpdateDocumentPayload) -> Self {
        Self {
            customer_id: payload.customer_id,
            issue_date: payload.issue_date,
            due_date: payload.due_date,
            items: payload.items.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListDocumentsQuery {
    /// Folio, nome ou RUT do cliente
    pub search: Option<String>,
    pub status: Option<DocumentStatus>,
    #[serde(rename = "type")]
    #[param(rename = "type")]
    pub doc_type: Option<DocumentType>,
    #[param(value_type = Option<String>, format = Date)]
    pub from_date: Option<NaiveDate>,
    #[param(value_type = Option<String>, format = Date)]
    pub to_date: Option<NaiveDate>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl From<ListDocumentsQuery> for DocumentFilter {
    fn from(query: ListDocumentsQuery) -> Self {
        Self {
            search: query.search,
            status: query.status,
            doc_type: query.doc_type,
            from_date: query.from_date,
            to_date: query.to_date,
            page: query.page,
            per_page: query.per_page,
        }
    }
}

// =============================================================================
//  HANDLERS
// =============================================================================

// GET /api/billing/documents
#[utoipa::path(
    get,
    path = "/api/billing/documents",
    tag = "Billing",
    params(
        ListDocumentsQuery,
        ("x-tenant-id" = Uuid, Header, description = "ID do tenant")
    ),
    responses(
        (status = 200, description = "Página de documentos", body = DocumentPage)
    )
)]
pub async fn list_documents(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Query(query): Query<ListDocumentsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = DocumentFilter::from(query);

    let page = app_state.tax_document_service
        .list_documents(tenant.0, &filter)
        .await?;

    Ok(Json(page))
}

// GET /api/billing/documents/stats
#[utoipa::path(
    get,
    path = "/api/billing/documents/stats",
    tag = "Billing",
    params(("x-tenant-id" = Uuid, Header, description = "ID do tenant")),
    responses(
        (status = 200, description = "Contadores por estado", body = DocumentStats)
    )
)]
pub async fn document_stats(
    State(app_state): State<AppState>,
    tenant: TenantContext,
) -> Result<impl IntoResponse, AppError> {
    let today = Utc::now().date_naive();

    let stats = app_state.tax_document_service
        .document_stats(tenant.0, today)
        .await?;

    Ok(Json(stats))
}

// POST /api/billing/documents
#[utoipa::path(
    post,
    path = "/api/billing/documents",
    tag = "Billing",
    request_body = CreateDocumentPayload,
    params(("x-tenant-id" = Uuid, Header, description = "ID do tenant")),
    responses(
        (status = 201, description = "Documento criado em rascunho", body = DocumentDetail),
        (status = 422, description = "Dados inválidos"),
        (status = 503, description = "Conflito de concorrência, repetir")
    )
)]
pub async fn create_document(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Json(payload): Json<CreateDocumentPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let detail = app_state.tax_document_service
        .create_document(tenant.0, payload.into())
        .await?;

    Ok((StatusCode::CREATED, Json(detail)))
}

// GET /api/billing/documents/{id}
#[utoipa::path(
    get,
    path = "/api/billing/documents/{id}",
    tag = "Billing",
    params(
        ("id" = Uuid, Path, description = "ID do documento"),
        ("x-tenant-id" = Uuid, Header, description = "ID do tenant")
    ),
    responses(
        (status = 200, description = "Documento com itens", body = DocumentDetail),
        (status = 403, description = "Documento de outro tenant"),
        (status = 404, description = "Documento não encontrado")
    )
)]
pub async fn get_document(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(document_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let detail = app_state.tax_document_service
        .get_document(tenant.0, document_id)
        .await?;

    Ok(Json(detail))
}

// PUT /api/billing/documents/{id}
#[utoipa::path(
    put,
    path = "/api/billing/documents/{id}",
    tag = "Billing",
    request_body = UpdateDocumentPayload,
    params(
        ("id" = Uuid, Path, description = "ID do documento"),
        ("x-tenant-id" = Uuid, Header, description = "ID do tenant")
    ),
    responses(
        (status = 200, description = "Rascunho atualizado (itens substituídos)", body = DocumentDetail),
        (status = 409, description = "Documento não está em rascunho"),
        (status = 422, description = "Dados inválidos")
    )
)]
pub async fn update_document(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(document_id): Path<Uuid>,
    Json(payload): Json<UpdateDocumentPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let detail = app_state.tax_document_service
        .update_document(tenant.0, document_id, payload.into())
        .await?;

    Ok(Json(detail))
}

// DELETE /api/billing/documents/{id}
#[utoipa::path(
    delete,
    path = "/api/billing/documents/{id}",
    tag = "Billing",
    params(
        ("id" = Uuid, Path, description = "ID do documento"),
        ("x-tenant-id" = Uuid, Header, description = "ID do tenant")
    ),
    responses(
        (status = 204, description = "Rascunho excluído com seus itens"),
        (status = 409, description = "Documento não está em rascunho")
    )
)]
pub async fn delete_document(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(document_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.tax_document_service
        .delete_document(tenant.0, document_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

// POST /api/billing/documents/{id}/send
#[utoipa::path(
    post,
    path = "/api/billing/documents/{id}/send",
    tag = "Billing",
    params(
        ("id" = Uuid, Path, description = "ID do documento"),
        ("x-tenant-id" = Uuid, Header, description = "ID do tenant")
    ),
    responses(
        (status = 200, description = "Documento enviado ao SII (simulado)", body = TaxDocument),
        (status = 409, description = "Documento não está em rascunho")
    )
)]
pub async fn send_document(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(document_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let document = app_state.tax_document_service
        .send_document(tenant.0, document_id)
        .await?;

    Ok(Json(document))
}

// GET /api/billing/documents/{id}/pdf
#[utoipa::path(
    get,
    path = "/api/billing/documents/{id}/pdf",
    tag = "Billing",
    params(
        ("id" = Uuid, Path, description = "ID do documento"),
        ("x-tenant-id" = Uuid, Header, description = "ID do tenant")
    ),
    responses(
        (status = 200, description = "PDF do documento", content_type = "application/pdf")
    )
)]
pub async fn download_document_pdf(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(document_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let detail = app_state.tax_document_service
        .get_document(tenant.0, document_id)
        .await?;

    let pdf_bytes = app_state.pdf_service.render_document(&detail)?;
    let filename = pdf_service::download_filename(&detail);

    // Configura os Headers para o navegador baixar o PDF
    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", filename)),
    ];

    Ok((headers, pdf_bytes))
}

// GET /api/health
pub async fn health(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    sqlx::query("SELECT 1").execute(&app_state.db_pool).await?;
    Ok("OK")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(description: Option<String>) -> LineItemPayload {
        LineItemPayload {
            product_id: Uuid::new_v4(),
            description,
            quantity: Decimal::from(2),
            unit_price: Decimal::from(1000),
        }
    }

    fn payload(items: Vec<LineItemPayload>) -> CreateDocumentPayload {
        CreateDocumentPayload {
            customer_id: Uuid::new_v4(),
            doc_type: DocumentType::Invoice,
            issue_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
            items,
        }
    }

    #[test]
    fn payload_requires_at_least_one_item() {
        let errors = payload(vec![]).validate().unwrap_err();
        assert!(errors.field_errors().contains_key("items"));

        assert!(payload(vec![line(None)]).validate().is_ok());
    }

    #[test]
    fn nested_items_are_validated() {
        let long = "x".repeat(501);
        assert!(payload(vec![line(None), line(Some(long))]).validate().is_err());
    }

    #[test]
    fn payload_keeps_the_wire_field_names() {
        let json = serde_json::to_value(payload(vec![line(None)])).unwrap();
        assert_eq!(json["type"], "invoice");
        assert_eq!(json["items"][0]["unitPrice"], "1000");
        assert!(json.get("customerId").is_some());
    }
}
