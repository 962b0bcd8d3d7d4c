//! Core input and result types for the valuation engine.

use serde::{Deserialize, Serialize};

/// Tare weight of one empty crate, in kilograms.
pub const EMPTY_CRATE_WEIGHT: f64 = 3.0;

/// Fixed dirham-to-riyal display multiplier. This is a ledger convention
/// (20 riyal per dirham), not a live exchange rate, and must stay constant.
pub const RIYAL_PER_DIRHAM: f64 = 20.0;

/// A selectable produce type. Selecting one supplies the reference weight of
/// a full crate used for virtual-crate normalization.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductType {
    pub id: String,
    pub label: String,
    /// Weight in kg of one full crate of this product.
    pub full_crate_weight: f64,
}

impl ProductType {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        full_crate_weight: f64,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            full_crate_weight,
        }
    }
}

/// A numeric form field that the user may leave blank. Blank normalizes to
/// zero before any arithmetic sees it, so computation never observes a
/// non-numeric sentinel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumericField {
    #[default]
    Empty,
    Number(f64),
}

impl NumericField {
    pub fn value(self) -> f64 {
        match self {
            NumericField::Empty => 0.0,
            NumericField::Number(n) => n,
        }
    }

    pub fn is_empty(self) -> bool {
        matches!(self, NumericField::Empty)
    }
}

impl From<f64> for NumericField {
    fn from(n: f64) -> Self {
        NumericField::Number(n)
    }
}

/// Raw calculator form as entered by the user, before validation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CalculatorForm {
    pub mlih_crates: NumericField,
    pub dichi_crates: NumericField,
    pub gross_weight: NumericField,
    pub mlih_price: NumericField,
    pub dichi_price: NumericField,
    pub product: Option<ProductType>,
}

/// Validated, fully numeric inputs for one valuation run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CargoInputs {
    pub mlih_crates: f64,
    pub dichi_crates: f64,
    pub gross_weight: f64,
    pub full_crate_weight: f64,
    pub mlih_price: f64,
    pub dichi_price: f64,
}

/// Full derived snapshot. Recomputed wholesale on every calculate action;
/// there is no incremental update path.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ValuationResult {
    pub total_crates: f64,
    pub total_empty_crates_weight: f64,
    pub total_net_product_weight: f64,
    pub average_net_weight_per_crate: f64,
    pub net_weight_mlih: f64,
    pub net_weight_dichi: f64,
    pub virtual_crates_mlih: f64,
    pub virtual_crates_dichi: f64,
    pub total_virtual_crates: f64,
    pub total_price_mlih: f64,
    pub total_price_dichi: f64,
    pub grand_total_price: f64,
    pub grand_total_price_riyal: f64,
}

/// Result of the inverse "distribution" computation: how many gross crates
/// (and how much gross weight) a desired virtual-crate count corresponds to.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Distribution {
    pub gross_crates: f64,
    pub total_weight: f64,
}

/// Formats a dirham amount for display, e.g. `8 543,70 DH`.
pub fn format_dirhams(value: f64) -> String {
    format!("{} DH", format_amount(value))
}

/// Formats a riyal amount for display, e.g. `170 874,07 Riyal`.
pub fn format_riyal(value: f64) -> String {
    format!("{} Riyal", format_amount(value))
}

/// Thousands grouped with spaces, comma decimal separator, two decimals.
fn format_amount(value: f64) -> String {
    let negative = value < 0.0;
    let cents = (value.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let frac = cents % 100;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(ch);
    }

    let sign = if negative { "-" } else { "" };
    format!("{sign}{grouped},{frac:02}")
}
