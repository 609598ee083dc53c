//! Session-scoped analysis context.
//!
//! An [`AnalysisSession`] is created when the four datasets are loaded and
//! holds everything one analyst's view needs: the enriched records, the
//! current selection and its filtered sets, the manual-match overrides and the
//! last result. A [`SessionStore`] keeps sessions apart and expires them.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::aggregate::compute_stats;
use crate::config::ToleranceConfig;
use crate::engine::reconcile;
use crate::enrich::{enrich, enrich_ppm};
use crate::error::{OverrideError, ReconError};
use crate::filter::{filter_records, FilteredSets, Selection};
use crate::insights::{build_insights, Insights};
use crate::model::{BillbackRecord, Datasets, ItemRef, PpmRecord, ResultRow, RowId, StateRef, StatsSummary};
use crate::options::{filter_options, FilterOptions};
use crate::overrides::ManualMatches;

/// Data older than this is flagged as stale.
pub const STALE_AFTER_HOURS: i64 = 24;

/// Result of one `analyze` / `recalculate` call.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub selection: Selection,
    pub manual_matches: ManualMatches,
    pub stats: StatsSummary,
    pub data: Vec<ResultRow>,
    pub insights: Insights,
}

#[derive(Debug, Clone)]
pub enum AnalysisOutcome {
    Completed(Analysis),
    /// One side of the filtered data is empty; nothing was reconciled.
    NoMatchingRecords { billback: usize, ppm: usize },
}

impl AnalysisOutcome {
    pub fn analysis(&self) -> Option<&Analysis> {
        match self {
            Self::Completed(a) => Some(a),
            Self::NoMatchingRecords { .. } => None,
        }
    }
}

pub struct AnalysisSession {
    states: Vec<StateRef>,
    item_ref: Vec<ItemRef>,
    billback: Vec<BillbackRecord>,
    ppm: Vec<PpmRecord>,
    tolerance: ToleranceConfig,
    selection: Option<Selection>,
    filtered: FilteredSets,
    overrides: ManualMatches,
    last: Option<Analysis>,
}

impl AnalysisSession {
    /// Enrich the datasets once; every later analysis filters from these.
    pub fn new(datasets: Datasets, tolerance: ToleranceConfig) -> Self {
        let (billback, states) = enrich(&datasets.states, &datasets.billback, &datasets.item_ref);
        let ppm = enrich_ppm(&datasets.ppm);
        log::info!(
            "session loaded: {} billback, {} ppm, {} item refs, {} states",
            billback.len(),
            ppm.len(),
            datasets.item_ref.len(),
            states.len()
        );
        Self {
            states,
            item_ref: datasets.item_ref,
            billback,
            ppm,
            tolerance,
            selection: None,
            filtered: FilteredSets::default(),
            overrides: ManualMatches::new(),
            last: None,
        }
    }

    pub fn tolerance(&self) -> &ToleranceConfig {
        &self.tolerance
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn filtered(&self) -> &FilteredSets {
        &self.filtered
    }

    pub fn manual_matches(&self) -> &ManualMatches {
        &self.overrides
    }

    pub fn results(&self) -> Option<&Analysis> {
        self.last.as_ref()
    }

    pub fn filter_options(&self) -> FilterOptions {
        filter_options(&self.states, &self.item_ref, &self.billback, &self.ppm)
    }

    /// Filter to `selection` and reconcile. Changing the selection drops any
    /// manual matches made under the previous one.
    pub fn analyze(&mut self, selection: Selection) -> Result<AnalysisOutcome, ReconError> {
        let filtered = filter_records(&self.billback, &self.ppm, &selection)?;

        if self.selection.as_ref() != Some(&selection) {
            if !self.overrides.is_empty() {
                log::info!("selection changed; clearing {} manual matches", self.overrides.len());
            }
            self.overrides.clear();
        }
        self.selection = Some(selection);
        self.filtered = filtered;

        Ok(self.run())
    }

    /// Re-run reconciliation for the current selection with the current
    /// manual matches applied.
    pub fn recalculate(&mut self) -> Result<AnalysisOutcome, OverrideError> {
        if self.selection.is_none() {
            return Err(OverrideError::NoActiveSelection);
        }
        Ok(self.run())
    }

    pub fn create_manual_match(
        &mut self,
        billback: RowId,
        ppm: RowId,
    ) -> Result<&ManualMatches, OverrideError> {
        self.check_in_view(billback, ppm)?;
        if self.overrides.create(billback, ppm) {
            log::debug!("manual match {billback} <-> {ppm}");
        }
        Ok(&self.overrides)
    }

    pub fn remove_manual_match(
        &mut self,
        billback: RowId,
        ppm: RowId,
    ) -> Result<&ManualMatches, OverrideError> {
        if self.selection.is_none() {
            return Err(OverrideError::NoActiveSelection);
        }
        self.overrides.remove(billback, ppm)?;
        log::debug!("manual match {billback} <-> {ppm} removed");
        Ok(&self.overrides)
    }

    /// Drop the selection, overrides and last result. Loaded data is kept.
    pub fn clear(&mut self) {
        self.selection = None;
        self.filtered = FilteredSets::default();
        self.overrides.clear();
        self.last = None;
    }

    fn check_in_view(&self, billback: RowId, ppm: RowId) -> Result<(), OverrideError> {
        if self.selection.is_none() {
            return Err(OverrideError::NoActiveSelection);
        }
        if !self.filtered.billback.iter().any(|r| r.row_id == billback) {
            return Err(OverrideError::UnknownBillbackRow(billback));
        }
        if !self.filtered.ppm.iter().any(|r| r.row_id == ppm) {
            return Err(OverrideError::UnknownPpmRow(ppm));
        }
        Ok(())
    }

    fn run(&mut self) -> AnalysisOutcome {
        let Some(selection) = self.selection.clone() else {
            return AnalysisOutcome::NoMatchingRecords { billback: 0, ppm: 0 };
        };

        if !self.filtered.has_both_sides() {
            log::warn!(
                "no matching records for {} / {} / {} {}",
                selection.market,
                selection.brand_pk,
                selection.month,
                selection.year
            );
            self.last = None;
            return AnalysisOutcome::NoMatchingRecords {
                billback: self.filtered.billback.len(),
                ppm: self.filtered.ppm.len(),
            };
        }

        let data = reconcile(
            &self.filtered.billback,
            &self.filtered.ppm,
            &self.overrides,
            &self.tolerance,
        );
        let stats = compute_stats(&data);
        let insights = build_insights(&data, &stats, self.tolerance.variance);

        log::info!(
            "{} records: {} matched, {} mismatched, {} missing deals, {} ppm only",
            stats.total_records,
            stats.perfect_matches,
            stats.mismatches,
            stats.missing_deals,
            stats.ppm_only
        );

        let analysis = Analysis {
            selection,
            manual_matches: self.overrides.clone(),
            stats,
            data,
            insights,
        };
        self.last = Some(analysis.clone());
        AnalysisOutcome::Completed(analysis)
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

struct StoredSession {
    session: AnalysisSession,
    created_at: DateTime<Utc>,
}

/// Sessions keyed by id. Each session is only ever driven by its own caller.
#[derive(Default)]
pub struct SessionStore {
    sessions: HashMap<Uuid, StoredSession>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, session: AnalysisSession, now: DateTime<Utc>) -> Uuid {
        let id = Uuid::new_v4();
        self.sessions.insert(id, StoredSession { session, created_at: now });
        id
    }

    pub fn get(&self, id: &Uuid) -> Option<&AnalysisSession> {
        self.sessions.get(id).map(|s| &s.session)
    }

    pub fn get_mut(&mut self, id: &Uuid) -> Option<&mut AnalysisSession> {
        self.sessions.get_mut(id).map(|s| &mut s.session)
    }

    /// Explicit clear. Returns whether the session existed.
    pub fn remove(&mut self, id: &Uuid) -> bool {
        self.sessions.remove(id).is_some()
    }

    pub fn is_stale(&self, id: &Uuid, now: DateTime<Utc>) -> Option<bool> {
        self.sessions
            .get(id)
            .map(|s| now - s.created_at > Duration::hours(STALE_AFTER_HOURS))
    }

    /// Drop sessions older than `ttl`. Returns how many were removed.
    pub fn purge_expired(&mut self, now: DateTime<Utc>, ttl: Duration) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| now - s.created_at <= ttl);
        let purged = before - self.sessions.len();
        if purged > 0 {
            log::debug!("purged {purged} expired sessions");
        }
        purged
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
