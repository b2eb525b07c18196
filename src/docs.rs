// src/docs.rs

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::OpenApi;

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Billing ---
        handlers::documents::list_documents,
        handlers::documents::document_stats,
        handlers::documents::create_document,
        handlers::documents::get_document,
        handlers::documents::update_document,
        handlers::documents::delete_document,
        handlers::documents::send_document,
        handlers::documents::download_document_pdf,
    ),
    components(
        schemas(
            // --- Billing ---
            models::billing::DocumentType,
            models::billing::DocumentStatus,
            models::billing::TaxDocument,
            models::billing::TaxDocumentItem,
            models::billing::DocumentTotals,
            models::billing::DocumentDetail,
            models::billing::DocumentSummary,
            models::billing::DocumentPage,
            models::billing::DocumentStats,

            // --- Payloads ---
            handlers::documents::CreateDocumentPayload,
            handlers::documents::UpdateDocumentPayload,
            handlers::documents::LineItemPayload,
        )
    ),
    tags(
        (name = "Billing", description = "Documentos Tributários (Facturas, Boletas, Notas)")
    ),
    modifiers(&TenantHeaderAddon)
)]
pub struct ApiDoc;

struct TenantHeaderAddon;

impl utoipa::Modify for TenantHeaderAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "tenant_header",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("x-tenant-id"))),
        );
    }
}
