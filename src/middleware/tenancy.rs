// src/middleware/tenancy.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::common::error::AppError;

// O nome do nosso cabeçalho HTTP customizado
pub const TENANT_ID_HEADER: &str = "x-tenant-id";

// O tenant que a requisição quer acessar. É repassado explicitamente a cada
// chamada de serviço; não existe "tenant atual" global.
#[derive(Debug, Clone, Copy)]
pub struct TenantContext(pub Uuid);

impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(TENANT_ID_HEADER)
            .ok_or_else(|| AppError::BadRequest("O cabeçalho X-Tenant-ID é obrigatório.".to_string()))?;

        // Tenta converter o valor do cabeçalho para uma string
        let value_str = value.to_str().map_err(|_| {
            AppError::BadRequest("Cabeçalho X-Tenant-ID contém caracteres inválidos.".to_string())
        })?;

        let tenant_id = Uuid::parse_str(value_str.trim()).map_err(|_| {
            AppError::BadRequest("Cabeçalho X-Tenant-ID inválido (não é um UUID).".to_string())
        })?;

        Ok(TenantContext(tenant_id))
    }
}
