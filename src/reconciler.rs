//! Offline-first reconciliation between the local cache and the remote
//! per-user store.
//!
//! One authoritative, deduplicated, newest-first list of saved calculations.
//! Records created while anonymous or offline live in the local cache with
//! `synced = false` and are uploaded when both auth and connectivity are
//! available; the remote store is the source of truth for everything else.

use thiserror::Error;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::domain::entities::ValuationResult;
use crate::domain::record::{
    local_record_id, merge_history, sort_newest_first, CalculationRecord, RecordPatch,
    RecordResults,
};
use crate::infra::cache::{CacheError, HistoryCache, LocalCache};
use crate::infra::remote::{RemoteStore, RemoteStoreError};

/// Auth collaborator signal: who is signed in, if anyone. The core never
/// performs authentication itself.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthState {
    pub user_id: Option<String>,
    /// True while the auth provider has not yet settled on an answer.
    pub loading: bool,
}

impl AuthState {
    pub fn signed_in(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            loading: false,
        }
    }

    pub fn signed_out() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some() && !self.loading
    }
}

/// User-entered annotations captured when saving a calculation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SaveDetails {
    pub product_type: String,
    pub mlih_price: f64,
    pub dichi_price: f64,
    pub client_name: String,
    pub farm: String,
    pub remaining_crates: f64,
    pub remaining_money: f64,
    pub mlih_agreed_price: f64,
    pub dichi_agreed_price: f64,
}

/// Outcome of a save, for user-facing feedback.
#[derive(Debug)]
pub enum SaveOutcome {
    /// Remote write acknowledged; the record carries its canonical id.
    Synced { id: String },
    /// Stored in the local cache only. `reason` is set when the save
    /// degraded from an attempted remote write.
    StoredLocally {
        id: String,
        reason: Option<RemoteStoreError>,
    },
}

/// Summary of one unsynced-record upload pass.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub uploaded: usize,
    /// Records that stay queued for the next trigger, with the error that
    /// blocked each one.
    pub failed: Vec<(String, RemoteStoreError)>,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("no record with id {0}")]
    NotFound(String),
    #[error("cannot modify a synced record while offline")]
    Offline,
    #[error(transparent)]
    Remote(#[from] RemoteStoreError),
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Stateful synchronizer owning the in-memory history list.
///
/// The remote store is injected once at construction; there is no ambient
/// client singleton. All methods run on the caller's task, so an abandoned
/// in-flight call simply drops with its future.
pub struct HistoryReconciler<R> {
    remote: R,
    cache: LocalCache,
    auth: AuthState,
    online: bool,
    records: Vec<CalculationRecord>,
}

impl<R: RemoteStore> HistoryReconciler<R> {
    /// Starts from whatever the local cache holds, so unsynced records are
    /// visible immediately even before any connectivity.
    pub fn new(remote: R, cache: LocalCache) -> Self {
        let mut records = cache.load().records;
        sort_newest_first(&mut records);
        Self {
            remote,
            cache,
            auth: AuthState::default(),
            online: false,
            records,
        }
    }

    /// The merged history, newest first.
    pub fn records(&self) -> &[CalculationRecord] {
        &self.records
    }

    pub fn auth(&self) -> &AuthState {
        &self.auth
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    pub fn set_online(&mut self, online: bool) {
        self.online = online;
    }

    /// Connectivity-change trigger: going online retries every queued upload.
    pub async fn handle_reconnect(&mut self) -> SyncReport {
        self.online = true;
        self.sync_pending().await
    }

    /// Auth-change trigger: a fresh sign-in adopts and uploads any records
    /// saved while anonymous.
    pub async fn handle_auth_change(&mut self, auth: AuthState) -> SyncReport {
        self.auth = auth;
        self.sync_pending().await
    }

    fn can_sync(&self) -> bool {
        self.online && self.auth.is_authenticated()
    }

    /// Persists a named, annotated copy of a valuation snapshot.
    ///
    /// Authenticated and online: remote-first, falling back to the local
    /// cache on any remote failure. Anonymous or offline: straight to the
    /// local cache. User input is never dropped on a failure path.
    pub async fn save(
        &mut self,
        result: &ValuationResult,
        details: SaveDetails,
    ) -> Result<SaveOutcome, HistoryError> {
        let created_at = OffsetDateTime::now_utc();
        let mut record = CalculationRecord {
            id: local_record_id(created_at),
            uid: self.auth.user_id.clone(),
            date: display_date(created_at),
            created_at,
            product_type: details.product_type,
            mlih_price: details.mlih_price,
            dichi_price: details.dichi_price,
            results: RecordResults {
                grand_total_price: result.grand_total_price,
                grand_total_price_riyal: result.grand_total_price_riyal,
                total_net_weight: result.total_net_product_weight,
                total_virtual_crates: result.total_virtual_crates,
            },
            client_name: details.client_name,
            farm: details.farm,
            remaining_crates: details.remaining_crates,
            remaining_money: details.remaining_money,
            total_crates: result.total_crates,
            mlih_agreed_price: details.mlih_agreed_price,
            dichi_agreed_price: details.dichi_agreed_price,
            synced: false,
        };

        if self.can_sync() {
            match self.remote.create(&record).await {
                Ok(remote_id) => {
                    record.id = remote_id.clone();
                    record.synced = true;
                    self.insert_deduped(record);
                    return Ok(SaveOutcome::Synced { id: remote_id });
                }
                Err(error) => {
                    tracing::warn!(%error, "remote save failed, keeping record locally");
                    let id = record.id.clone();
                    self.store_local(record)?;
                    return Ok(SaveOutcome::StoredLocally {
                        id,
                        reason: Some(error),
                    });
                }
            }
        }

        let id = record.id.clone();
        self.store_local(record)?;
        Ok(SaveOutcome::StoredLocally { id, reason: None })
    }

    /// Uploads every unsynced record, each independently. Partial success is
    /// normal: failures stay queued for the next reconnect or auth change
    /// and are never silently dropped.
    pub async fn sync_pending(&mut self) -> SyncReport {
        let mut report = SyncReport::default();
        if !self.can_sync() {
            return report;
        }

        let pending: Vec<String> = self
            .records
            .iter()
            .filter(|record| !record.synced)
            .map(|record| record.id.clone())
            .collect();

        for local_id in pending {
            let Some(index) = self.records.iter().position(|r| r.id == local_id) else {
                continue;
            };
            let mut candidate = self.records[index].clone();
            // Records saved while anonymous are adopted by the current user.
            candidate.uid = self.auth.user_id.clone();

            match self.remote.create(&candidate).await {
                Ok(remote_id) => {
                    if self.records.iter().any(|r| r.id == remote_id) {
                        // A subscription push beat the acknowledgement;
                        // the remote copy already replaced this one.
                        self.records.remove(index);
                    } else {
                        let record = &mut self.records[index];
                        record.id = remote_id;
                        record.uid = candidate.uid;
                        record.synced = true;
                    }
                    report.uploaded += 1;
                }
                Err(error) => {
                    tracing::warn!(id = %local_id, %error, "upload failed, record stays queued");
                    report.failed.push((local_id, error));
                }
            }
        }

        if let Err(error) = self.persist_unsynced() {
            tracing::warn!(%error, "failed to rewrite local cache after sync pass");
        }
        sort_newest_first(&mut self.records);
        report
    }

    /// Edits a record. Synced and online: optimistic apply, targeted remote
    /// update, compensating reversal on failure. Unsynced: local cache only.
    pub async fn update(&mut self, id: &str, patch: RecordPatch) -> Result<(), HistoryError> {
        let index = self.position(id)?;

        if !self.records[index].synced {
            patch.apply(&mut self.records[index]);
            self.persist_unsynced()?;
            return Ok(());
        }

        if !self.online {
            return Err(HistoryError::Offline);
        }

        let previous = self.records[index].clone();
        patch.apply(&mut self.records[index]);
        match self.remote.update(id, &patch).await {
            Ok(()) => Ok(()),
            Err(error) => {
                self.records[index] = previous;
                Err(error.into())
            }
        }
    }

    /// Deletes a record. Unsynced records are removed locally with no remote
    /// call. Synced records are deleted remote-first and stay visible if the
    /// remote refuses; deleting a synced record while offline is blocked so
    /// it cannot silently reappear on the next snapshot.
    pub async fn delete(&mut self, id: &str) -> Result<(), HistoryError> {
        let index = self.position(id)?;

        if !self.records[index].synced {
            self.records.remove(index);
            self.persist_unsynced()?;
            return Ok(());
        }

        if !self.online {
            return Err(HistoryError::Offline);
        }

        self.remote.delete(id).await?;
        self.records.remove(index);
        Ok(())
    }

    /// Merges a freshly delivered remote snapshot with still-unsynced local
    /// records. The snapshot is authoritative for everything synced.
    pub fn apply_remote_snapshot(&mut self, snapshot: Vec<CalculationRecord>) {
        let local_unsynced: Vec<CalculationRecord> = self
            .records
            .iter()
            .filter(|record| !record.synced)
            .cloned()
            .collect();
        self.records = merge_history(snapshot, &local_unsynced);
    }

    /// Pull-based refresh for transports without push subscriptions. A no-op
    /// while anonymous or offline; the cached list keeps serving reads.
    pub async fn refresh(&mut self) -> Result<(), HistoryError> {
        if !self.online {
            return Ok(());
        }
        let Some(uid) = self.auth.user_id.clone() else {
            return Ok(());
        };
        let snapshot = self.remote.fetch_all(&uid).await?;
        self.apply_remote_snapshot(snapshot);
        Ok(())
    }

    fn position(&self, id: &str) -> Result<usize, HistoryError> {
        self.records
            .iter()
            .position(|record| record.id == id)
            .ok_or_else(|| HistoryError::NotFound(id.to_string()))
    }

    fn insert_deduped(&mut self, record: CalculationRecord) {
        // The live subscription may already have delivered this record.
        if !self.records.iter().any(|r| r.id == record.id) {
            self.records.push(record);
        }
        sort_newest_first(&mut self.records);
    }

    fn store_local(&mut self, record: CalculationRecord) -> Result<(), HistoryError> {
        self.records.push(record);
        sort_newest_first(&mut self.records);
        self.persist_unsynced()?;
        Ok(())
    }

    fn persist_unsynced(&self) -> Result<(), CacheError> {
        let records: Vec<CalculationRecord> = self
            .records
            .iter()
            .filter(|record| !record.synced)
            .cloned()
            .collect();
        self.cache.save(&HistoryCache { records })
    }
}

fn display_date(at: OffsetDateTime) -> String {
    let format = format_description!("[day]/[month]/[year] [hour]:[minute]:[second]");
    at.format(&format).unwrap_or_else(|_| at.to_string())
}
