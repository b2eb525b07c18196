// src/services/numbering.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{common::error::AppError, db::SequenceRepository, models::billing::DocumentType};

/// Dígitos da parte numérica do folio (`F-00000042`).
pub const SEQUENCE_WIDTH: usize = 8;
pub const MAX_SEQUENCE: i64 = 99_999_999;

/// Prefixo do folio a partir do código do tipo. Códigos desconhecidos usam `D-`.
pub fn prefix_for(code: &str) -> &'static str {
    match code {
        "invoice" => "F-",
        "receipt" => "B-",
        "credit_note" => "NC-",
        "debit_note" => "ND-",
        _ => "D-",
    }
}

pub fn prefix(doc_type: DocumentType) -> &'static str {
    prefix_for(doc_type.code())
}

pub fn format_number(doc_type: DocumentType, sequence: i64) -> Result<String, AppError> {
    if !(1..=MAX_SEQUENCE).contains(&sequence) {
        return Err(AppError::SequenceExhausted(doc_type.code().to_string()));
    }
    Ok(format!(
        "{}{:0width$}",
        prefix(doc_type),
        sequence,
        width = SEQUENCE_WIDTH
    ))
}

/// Parte numérica de um folio; None se o formato não bate com `^[A-Z]{1,3}-\d{8}$`.
pub fn parse_sequence(number: &str) -> Option<i64> {
    let (prefix, digits) = number.split_once('-')?;
    let prefix_ok = (1..=3).contains(&prefix.len()) && prefix.bytes().all(|b| b.is_ascii_uppercase());
    let digits_ok = digits.len() == SEQUENCE_WIDTH && digits.bytes().all(|b| b.is_ascii_digit());
    if !prefix_ok || !digits_ok {
        return None;
    }
    digits.parse().ok()
}

#[derive(Clone, Default)]
pub struct DocumentNumberingService {
    repo: SequenceRepository,
}

impl DocumentNumberingService {
    pub fn new(repo: SequenceRepository) -> Self {
        Self { repo }
    }

    /// Aloca o próximo folio de (tenant, tipo).
    ///
    /// Deve rodar dentro da mesma transação que insere o documento: a trava
    /// do contador segura alocações concorrentes até o COMMIT, e um
    /// ROLLBACK devolve o número.
    pub async fn allocate<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        doc_type: DocumentType,
    ) -> Result<String, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sequence = self.repo.next_value(executor, tenant_id, doc_type).await?;
        let number = format_number(doc_type, sequence)?;

        tracing::debug!(%tenant_id, %doc_type, %number, "Folio alocado");
        Ok(number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_per_document_type() {
        assert_eq!(prefix(DocumentType::Invoice), "F-");
        assert_eq!(prefix(DocumentType::Receipt), "B-");
        assert_eq!(prefix(DocumentType::CreditNote), "NC-");
        assert_eq!(prefix(DocumentType::DebitNote), "ND-");
        assert_eq!(prefix_for("guia_despacho"), "D-");
    }

    #[test]
    fn first_numbers_are_zero_padded() {
        assert_eq!(format_number(DocumentType::Invoice, 1).unwrap(), "F-00000001");
        assert_eq!(format_number(DocumentType::Invoice, 2).unwrap(), "F-00000002");
        assert_eq!(format_number(DocumentType::CreditNote, 42).unwrap(), "NC-00000042");
    }

    #[test]
    fn every_formatted_number_keeps_the_public_shape() {
        for doc_type in DocumentType::ALL {
            for seq in [1, 9, 10, 12_345, MAX_SEQUENCE] {
                let number = format_number(doc_type, seq).unwrap();
                assert_eq!(parse_sequence(&number), Some(seq), "{number}");
            }
        }
    }

    #[test]
    fn refuses_to_widen_past_eight_digits() {
        assert!(matches!(
            format_number(DocumentType::Receipt, MAX_SEQUENCE + 1),
            Err(AppError::SequenceExhausted(_))
        ));
        assert!(format_number(DocumentType::Receipt, 0).is_err());
    }

    #[test]
    fn parse_rejects_malformed_numbers() {
        for bad in ["F00000001", "F-0000001", "F-000000001", "ABCD-00000001", "f-00000001", "F-0000000a", "-00000001"] {
            assert_eq!(parse_sequence(bad), None, "{bad}");
        }
    }
}
