// src/services/tax_authority.rs

use async_trait::async_trait;
use uuid::Uuid;

use crate::{common::error::AppError, models::billing::TaxDocument};

/// Envio de documentos à autoridade tributária (SII).
/// Retorna o identificador de rastreio atribuído pelo órgão.
#[async_trait]
pub trait TaxAuthorityGateway: Send + Sync {
    async fn submit(&self, document: &TaxDocument) -> Result<String, AppError>;
}

/// Envio simulado: não fala com o SII, só gera um track id `DEMO-...`.
#[derive(Debug, Clone, Default)]
pub struct SimulatedTaxAuthority;

#[async_trait]
impl TaxAuthorityGateway for SimulatedTaxAuthority {
    async fn submit(&self, document: &TaxDocument) -> Result<String, AppError> {
        let track_id = format!("DEMO-{}", Uuid::new_v4().simple());
        tracing::info!(
            document_id = %document.id,
            number = %document.number,
            %track_id,
            "📨 Documento enviado ao SII (simulado)"
        );
        Ok(track_id)
    }
}
