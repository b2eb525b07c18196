// src/services/totals.rs

use rust_decimal::{Decimal, RoundingStrategy};

use crate::{common::error::AppError, models::billing::DocumentTotals};

/// IVA de 19%.
pub const TAX_RATE: Decimal = Decimal::from_parts(19, 0, 0, false, 2);

/// Casas decimais da moeda.
pub const CURRENCY_SCALE: u32 = 2;

/// Teto exclusivo de qualquer valor do documento: 10^16, o alcance da
/// coluna `tax_amount NUMERIC(18, 2)`.
pub const MAX_DOCUMENT_AMOUNT: Decimal = Decimal::from_parts(1_874_919_424, 2_328_306, 0, false, 0);

/// Par quantidade/preço de uma linha.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineAmount {
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

impl LineAmount {
    pub fn new(quantity: Decimal, unit_price: Decimal) -> Self {
        Self { quantity, unit_price }
    }
}

pub fn line_total(quantity: Decimal, unit_price: Decimal) -> Decimal {
    quantity * unit_price
}

/// Calcula subtotal, imposto e total de uma lista de linhas.
///
/// O subtotal é a soma exata em decimal; apenas o imposto é arredondado
/// (meio para cima) para a unidade mínima da moeda.
pub fn calculate(items: &[LineAmount]) -> Result<DocumentTotals, AppError> {
    if items.is_empty() {
        return Err(AppError::InvalidLineItem(
            "o documento precisa de pelo menos um item".to_string(),
        ));
    }

    let mut subtotal = Decimal::ZERO;
    for (index, item) in items.iter().enumerate() {
        if item.quantity <= Decimal::ZERO {
            return Err(AppError::InvalidLineItem(format!(
                "item {}: a quantidade deve ser maior que zero",
                index + 1
            )));
        }
        if item.unit_price < Decimal::ZERO {
            return Err(AppError::InvalidLineItem(format!(
                "item {}: o preço unitário não pode ser negativo",
                index + 1
            )));
        }

        let line = item
            .quantity
            .checked_mul(item.unit_price)
            .and_then(|line| subtotal.checked_add(line))
            .ok_or_else(|| {
                AppError::InvalidLineItem(format!("item {}: valor fora do intervalo", index + 1))
            })?;
        subtotal = line;
    }

    let out_of_range = || AppError::InvalidLineItem("total do documento fora do intervalo".to_string());

    let tax_amount = subtotal
        .checked_mul(TAX_RATE)
        .ok_or_else(out_of_range)?
        .round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    let total = subtotal.checked_add(tax_amount).ok_or_else(out_of_range)?;
    if total >= MAX_DOCUMENT_AMOUNT {
        return Err(out_of_range());
    }

    Ok(DocumentTotals { subtotal, tax_amount, total })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn line(qty: &str, price: &str) -> LineAmount {
        LineAmount::new(dec(qty), dec(price))
    }

    #[test]
    fn computes_reference_invoice() {
        let totals = calculate(&[line("2", "1000"), line("1", "500")]).unwrap();
        assert_eq!(totals.subtotal, dec("2500"));
        assert_eq!(totals.tax_amount, dec("475"));
        assert_eq!(totals.total, dec("2975"));
    }

    #[test]
    fn tax_rounds_half_up_to_two_places() {
        // 0.05 * 0.19 = 0.0095 -> 0.01
        let totals = calculate(&[line("1", "0.05")]).unwrap();
        assert_eq!(totals.tax_amount, dec("0.01"));

        // 1.5 * 0.19 = 0.285 -> 0.29 (arredondamento bancário daria 0.28)
        let totals = calculate(&[line("1", "1.5")]).unwrap();
        assert_eq!(totals.tax_amount, dec("0.29"));
        assert_eq!(totals.total, dec("1.79"));
    }

    #[test]
    fn many_small_lines_do_not_drift() {
        let items = vec![line("1", "0.10"); 1000];
        let totals = calculate(&items).unwrap();
        assert_eq!(totals.subtotal, dec("100.00"));
        assert_eq!(totals.tax_amount, dec("19.00"));
        assert_eq!(totals.total, dec("119.00"));
    }

    #[test]
    fn total_is_always_subtotal_plus_tax() {
        let cases = [
            vec![line("3", "333.33")],
            vec![line("0.5", "19.99"), line("7", "0")],
            vec![line("12.125", "4.1"), line("1", "0.01"), line("2", "99999.99")],
        ];
        for items in cases {
            let totals = calculate(&items).unwrap();
            assert_eq!(totals.total, totals.subtotal + totals.tax_amount);
            let expected_tax = (totals.subtotal * dec("0.19"))
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
            assert_eq!(totals.tax_amount, expected_tax);
        }
    }

    #[test]
    fn zero_price_lines_are_allowed() {
        let totals = calculate(&[line("1", "0")]).unwrap();
        assert_eq!(totals.total, Decimal::ZERO);
    }

    #[test]
    fn rejects_empty_list() {
        assert!(matches!(calculate(&[]), Err(AppError::InvalidLineItem(_))));
    }

    #[test]
    fn rejects_non_positive_quantity() {
        assert!(matches!(calculate(&[line("0", "10")]), Err(AppError::InvalidLineItem(_))));
        assert!(matches!(
            calculate(&[line("1", "10"), line("-2", "10")]),
            Err(AppError::InvalidLineItem(msg)) if msg.starts_with("item 2")
        ));
    }

    #[test]
    fn amounts_beyond_the_stored_range_are_rejected() {
        assert_eq!(MAX_DOCUMENT_AMOUNT, dec("10000000000000000"));

        assert!(matches!(
            calculate(&[line("1", "100000000000000000")]),
            Err(AppError::InvalidLineItem(_))
        ));
        // 8403361344537816 * 1.19 passa de 10^16 só por causa do imposto
        assert!(matches!(
            calculate(&[line("1", "8403361344537816")]),
            Err(AppError::InvalidLineItem(_))
        ));

        let totals = calculate(&[line("1", "8000000000000000")]).unwrap();
        assert_eq!(totals.total, dec("9520000000000000"));
    }

    #[test]
    fn rejects_negative_price() {
        assert!(matches!(calculate(&[line("1", "-0.01")]), Err(AppError::InvalidLineItem(_))));
    }
}
