use serde::{Deserialize, Serialize};

use crate::dates::{in_period, month_number, parse_date};
use crate::error::ReconError;
use crate::model::{BillbackRecord, PpmRecord};

/// Caller-selected (market, brand + pack, year, month) tuple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub market: String,
    pub brand_pk: String,
    pub year: i32,
    pub month: String,
}

impl Selection {
    pub fn new(
        market: impl Into<String>,
        brand_pk: impl Into<String>,
        year: i32,
        month: impl Into<String>,
    ) -> Self {
        Self {
            market: market.into(),
            brand_pk: brand_pk.into(),
            year,
            month: month.into(),
        }
    }

    /// 1-based month number, or an error for an unrecognised month name.
    pub fn month_number(&self) -> Result<u32, ReconError> {
        month_number(&self.month)
            .ok_or_else(|| ReconError::InvalidSelection(format!("unknown month '{}'", self.month)))
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.market.trim().is_empty() {
            return Err(ReconError::InvalidSelection("market is empty".into()));
        }
        if self.brand_pk.trim().is_empty() {
            return Err(ReconError::InvalidSelection("brand + pack size is empty".into()));
        }
        if !(1900..=9999).contains(&self.year) {
            return Err(ReconError::InvalidSelection(format!("year {} out of range", self.year)));
        }
        self.month_number().map(|_| ())
    }
}

/// Records of both sides that satisfy one selection, in source order.
#[derive(Debug, Clone, Default)]
pub struct FilteredSets {
    pub billback: Vec<BillbackRecord>,
    pub ppm: Vec<PpmRecord>,
}

impl FilteredSets {
    /// Either side empty means there is nothing to reconcile.
    pub fn has_both_sides(&self) -> bool {
        !self.billback.is_empty() && !self.ppm.is_empty()
    }
}

pub fn billback_matches(row: &BillbackRecord, sel: &Selection, month: u32) -> bool {
    row.custom_abbreviation.as_deref() == Some(sel.market.as_str())
        && row.brand_pk.as_deref() == Some(sel.brand_pk.as_str())
        && row
            .period_cell()
            .and_then(parse_date)
            .is_some_and(|d| in_period(d, sel.year, month))
}

pub fn ppm_matches(row: &PpmRecord, sel: &Selection, month: u32) -> bool {
    row.market.as_deref() == Some(sel.market.as_str())
        && row.brand_pk.as_deref() == Some(sel.brand_pk.as_str())
        && row
            .start
            .as_ref()
            .and_then(parse_date)
            .is_some_and(|d| in_period(d, sel.year, month))
}

/// Narrow enriched records to one selection. Rows whose date cannot be
/// parsed are excluded, not reported as errors.
pub fn filter_records(
    billback: &[BillbackRecord],
    ppm: &[PpmRecord],
    selection: &Selection,
) -> Result<FilteredSets, ReconError> {
    selection.validate()?;
    let month = selection.month_number()?;

    let billback: Vec<BillbackRecord> = billback
        .iter()
        .filter(|r| billback_matches(r, selection, month))
        .cloned()
        .collect();
    let ppm: Vec<PpmRecord> = ppm
        .iter()
        .filter(|r| ppm_matches(r, selection, month))
        .cloned()
        .collect();

    log::debug!(
        "selection {}/{}/{} {}: {} billback, {} ppm",
        selection.market,
        selection.brand_pk,
        selection.month,
        selection.year,
        billback.len(),
        ppm.len()
    );

    Ok(FilteredSets { billback, ppm })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Cell, RowId};

    fn bb(id: usize, market: &str, brand: &str, date: &str) -> BillbackRecord {
        let mut r = BillbackRecord::from_raw(RowId(id), Default::default());
        r.custom_abbreviation = Some(market.into());
        r.brand_pk = Some(brand.into());
        r.complete_date = Some(Cell::from(date));
        r
    }

    fn pp(id: usize, market: &str, brand: &str, date: &str) -> PpmRecord {
        let mut r = PpmRecord::from_raw(RowId(id), Default::default());
        r.market = Some(market.into());
        r.brand_pk = Some(brand.into());
        r.start = Some(Cell::from(date));
        r
    }

    fn sel() -> Selection {
        Selection::new("FL", "Brand A 6pk", 2024, "January")
    }

    #[test]
    fn filters_on_all_four_fields() {
        let billback = vec![
            bb(0, "FL", "Brand A 6pk", "2024-01-15"),
            bb(1, "TX", "Brand A 6pk", "2024-01-15"),
            bb(2, "FL", "Brand B 12pk", "2024-01-15"),
            bb(3, "FL", "Brand A 6pk", "2024-02-01"),
            bb(4, "FL", "Brand A 6pk", "2023-01-15"),
            bb(5, "FL", "Brand A 6pk", "1/31/2024"),
        ];
        let ppm = vec![pp(0, "FL", "Brand A 6pk", "1/1/2024"), pp(1, "FL", "Brand A 6pk", "garbage")];
        let out = filter_records(&billback, &ppm, &sel()).unwrap();
        let ids: Vec<usize> = out.billback.iter().map(|r| r.row_id.0).collect();
        assert_eq!(ids, vec![0, 5]);
        assert_eq!(out.ppm.len(), 1);
        assert!(out.has_both_sides());
    }

    #[test]
    fn falls_back_to_posting_period() {
        let mut r = bb(0, "FL", "Brand A 6pk", "");
        r.complete_date = None;
        r.posting_period = Some(Cell::text("1/9/2024"));
        let out = filter_records(&[r], &[], &sel()).unwrap();
        assert_eq!(out.billback.len(), 1);
        assert!(!out.has_both_sides());
    }

    #[test]
    fn spreadsheet_export_date_forms_are_kept() {
        let billback = vec![
            bb(0, "FL", "Brand A 6pk", "1/15/2024 0:00"),
            bb(1, "FL", "Brand A 6pk", "1/5/24"),
            bb(2, "FL", "Brand A 6pk", "2024-01-15 08:30"),
            bb(3, "FL", "Brand A 6pk", "1/15/2024 10:30:00"),
        ];
        let ppm = vec![pp(0, "FL", "Brand A 6pk", "1/2/24 0:00")];
        let out = filter_records(&billback, &ppm, &sel()).unwrap();
        assert_eq!(out.billback.len(), 4);
        assert_eq!(out.ppm.len(), 1);
    }

    #[test]
    fn missing_market_never_matches() {
        let mut r = bb(0, "FL", "Brand A 6pk", "2024-01-03");
        r.custom_abbreviation = None;
        let out = filter_records(&[r], &[], &sel()).unwrap();
        assert!(out.billback.is_empty());
    }

    #[test]
    fn unknown_month_rejected() {
        let bad = Selection::new("FL", "Brand A 6pk", 2024, "Janvier");
        let err = filter_records(&[], &[], &bad).unwrap_err();
        assert!(err.to_string().contains("Janvier"));
    }

    #[test]
    fn abbreviated_month_accepted() {
        let s = Selection::new("FL", "Brand A 6pk", 2024, "jan");
        assert_eq!(s.month_number().unwrap(), 1);
    }
}
