//! Saved calculation records and the pure history merge.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// The subset of a valuation snapshot persisted with a saved record.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordResults {
    pub grand_total_price: f64,
    pub grand_total_price_riyal: f64,
    pub total_net_weight: f64,
    pub total_virtual_crates: f64,
}

/// One named, annotated calculation in the user's history.
///
/// Until `synced` is true the record exists only on this device and its id is
/// a locally generated token. After a successful remote write the remote
/// store owns the record, `id` is the canonical remote identifier, and the
/// local copy is a cache.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationRecord {
    pub id: String,
    pub uid: Option<String>,
    /// Capture time preformatted for display.
    pub date: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub product_type: String,
    pub mlih_price: f64,
    pub dichi_price: f64,
    pub results: RecordResults,
    pub client_name: String,
    pub farm: String,
    pub remaining_crates: f64,
    pub remaining_money: f64,
    pub total_crates: f64,
    pub mlih_agreed_price: f64,
    pub dichi_agreed_price: f64,
    pub synced: bool,
}

/// Builds a timestamp-derived local id, unique even for rapid saves.
/// Replaced by the remote store's identifier upon sync.
pub fn local_record_id(created_at: OffsetDateTime) -> String {
    let millis = created_at.unix_timestamp_nanos() / 1_000_000;
    format!("local-{millis}-{}", Uuid::new_v4().simple())
}

/// Targeted field update applied to an existing record. `None` fields are
/// left untouched and are omitted from the remote partial update.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub farm: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mlih_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dichi_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mlih_agreed_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dichi_agreed_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_crates: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_money: Option<f64>,
}

impl RecordPatch {
    pub fn is_empty(&self) -> bool {
        *self == RecordPatch::default()
    }

    pub fn apply(&self, record: &mut CalculationRecord) {
        if let Some(client_name) = &self.client_name {
            record.client_name = client_name.clone();
        }
        if let Some(farm) = &self.farm {
            record.farm = farm.clone();
        }
        if let Some(mlih_price) = self.mlih_price {
            record.mlih_price = mlih_price;
        }
        if let Some(dichi_price) = self.dichi_price {
            record.dichi_price = dichi_price;
        }
        if let Some(mlih_agreed_price) = self.mlih_agreed_price {
            record.mlih_agreed_price = mlih_agreed_price;
        }
        if let Some(dichi_agreed_price) = self.dichi_agreed_price {
            record.dichi_agreed_price = dichi_agreed_price;
        }
        if let Some(remaining_crates) = self.remaining_crates {
            record.remaining_crates = remaining_crates;
        }
        if let Some(remaining_money) = self.remaining_money {
            record.remaining_money = remaining_money;
        }
    }
}

/// Union of a remote snapshot with still-unsynced local records.
///
/// Deduplicated by id with remote precedence: an unsynced local copy whose
/// upload acknowledgement raced a subscription push is dropped in favor of
/// the remote document. Newest first, ties broken by id for determinism.
pub fn merge_history(
    remote: Vec<CalculationRecord>,
    local_unsynced: &[CalculationRecord],
) -> Vec<CalculationRecord> {
    let mut merged = remote;
    for record in &mut merged {
        // Anything delivered by the remote store is synced by definition.
        record.synced = true;
    }

    let remote_ids: HashSet<&str> = merged.iter().map(|r| r.id.as_str()).collect();
    let locals: Vec<CalculationRecord> = local_unsynced
        .iter()
        .filter(|record| !remote_ids.contains(record.id.as_str()))
        .cloned()
        .collect();
    merged.extend(locals);

    sort_newest_first(&mut merged);
    merged
}

pub fn sort_newest_first(records: &mut [CalculationRecord]) {
    records.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}
