//! Offline-first produce cargo valuation core.
//!
//! Two cooperating parts:
//! - the valuation engine: pure arithmetic from crate counts, gross weight
//!   and per-category prices to net weights, virtual-crate equivalents and
//!   dual-currency totals;
//! - the history reconciler: one deduplicated, newest-first list of saved
//!   calculations kept consistent between a local durable cache and a
//!   remote per-user document store, surviving network flakiness.
//!
//! The presentation layer, authentication and connectivity detection are
//! external collaborators; this crate only consumes their signals.

pub mod domain;
pub mod infra;
pub mod reconciler;
pub mod util;

pub use domain::entities::{
    format_dirhams, format_riyal, CalculatorForm, CargoInputs, Distribution, NumericField,
    ProductType, ValuationResult, EMPTY_CRATE_WEIGHT, RIYAL_PER_DIRHAM,
};
pub use domain::record::{CalculationRecord, RecordPatch, RecordResults};
pub use domain::valuation::{distribute, evaluate, validate, Field, ValidationError};
pub use infra::cache::{CacheError, HistoryCache, LocalCache};
pub use infra::remote::{CalcApiClient, RemoteOp, RemoteStore, RemoteStoreError};
pub use reconciler::{
    AuthState, HistoryError, HistoryReconciler, SaveDetails, SaveOutcome, SyncReport,
};
