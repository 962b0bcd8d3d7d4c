//! Domain types and pure computation: valuation arithmetic, saved records,
//! and the history merge.

pub mod entities;
pub mod record;
pub mod valuation;

pub use entities::{
    CalculatorForm, CargoInputs, Distribution, NumericField, ProductType, ValuationResult,
    EMPTY_CRATE_WEIGHT, RIYAL_PER_DIRHAM,
};
pub use record::{CalculationRecord, RecordPatch, RecordResults};
pub use valuation::{distribute, evaluate, validate, Field, ValidationError};
