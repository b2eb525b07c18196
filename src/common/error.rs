use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::models::billing::DocumentStatus;

// Códigos SQLSTATE que indicam disputa de trava ou de serialização.
// O chamador pode repetir a operação inteira com segurança.
const LOCK_NOT_AVAILABLE: &str = "55P03";
const QUERY_CANCELED: &str = "57014";
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Dados inválidos: {0}")]
    Validation(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Item inválido: {0}")]
    InvalidLineItem(String),

    #[error("Documento {0} não encontrado")]
    DocumentNotFound(Uuid),

    // Tenant diferente do solicitante. Nunca vira 404 para não revelar nada.
    #[error("Acesso negado a este recurso")]
    Forbidden,

    #[error("Documento em estado '{status}': apenas rascunhos podem ser alterados")]
    InvalidState { status: DocumentStatus },

    #[error("Sequência de numeração esgotada para {0}")]
    SequenceExhausted(String),

    #[error("Conflito de concorrência, repita a operação")]
    Concurrency(#[source] sqlx::Error),

    #[error("Erro de banco de dados")]
    DatabaseError(#[source] sqlx::Error),

    #[error("Falha ao gerar o PDF: {0}")]
    RenderError(String),

    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        let retryable = match &err {
            sqlx::Error::PoolTimedOut => true,
            sqlx::Error::Database(db_err) => matches!(
                db_err.code().as_deref(),
                Some(LOCK_NOT_AVAILABLE | QUERY_CANCELED | SERIALIZATION_FAILURE | DEADLOCK_DETECTED)
            ),
            _ => false,
        };

        if retryable {
            AppError::Concurrency(err)
        } else {
            AppError::DatabaseError(err)
        }
    }
}

impl AppError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Concurrency(_))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::Validation(_)
            | AppError::InvalidLineItem(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::DocumentNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::InvalidState { .. } | AppError::SequenceExhausted(_) => StatusCode::CONFLICT,
            AppError::Concurrency(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::DatabaseError(_)
            | AppError::RenderError(_)
            | AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match self {
            // Retorna todos os detalhes da validação
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                })
            }
            AppError::Concurrency(ref e) => {
                tracing::warn!("Conflito de concorrência: {}", e);
                json!({ "error": self.to_string(), "retryable": true })
            }
            // Erros internos: loga o detalhe, devolve mensagem genérica
            ref e if status == StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!("Erro Interno do Servidor: {:?}", e);
                json!({ "error": "Ocorreu um erro inesperado." })
            }
            ref e => json!({ "error": e.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}
