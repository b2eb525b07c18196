// src/lib.rs

use axum::{routing::get, routing::post, Router};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod common;
pub mod config;
pub mod db;
pub mod docs;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use crate::config::AppState;
use crate::docs::ApiDoc;

/// Monta o router completo da API sobre o estado já inicializado.
pub fn app(app_state: AppState) -> Router {
    // Todas as rotas de documentos exigem o header x-tenant-id (extrator TenantContext)
    let document_routes = Router::new()
        .route("/"
               ,post(handlers::documents::create_document)
               .get(handlers::documents::list_documents)
        )
        .route("/stats", get(handlers::documents::document_stats))
        .route("/{id}"
               ,get(handlers::documents::get_document)
               .put(handlers::documents::update_document)
               .delete(handlers::documents::delete_document)
        )
        .route("/{id}/send", post(handlers::documents::send_document))
        .route("/{id}/pdf", get(handlers::documents::download_document_pdf));

    Router::new()
        .route("/api/health", get(handlers::documents::health))
        .nest("/api/billing/documents", document_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(app_state)
}
