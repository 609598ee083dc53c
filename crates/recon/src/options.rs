use std::collections::BTreeSet;

use chrono::Datelike;
use serde::Serialize;

use crate::dates::{month_name, parse_date};
use crate::model::{BillbackRecord, ItemRef, PpmRecord, StateRef};

/// Values a caller can pick from when building a selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterOptions {
    pub markets: Vec<String>,
    pub brands_pk: Vec<String>,
    pub years: Vec<i32>,
    pub months: Vec<&'static str>,
}

/// Collect sorted, de-duplicated selection values from the datasets.
///
/// `states` should already be enriched so `Custom Abbreviation` is set.
pub fn filter_options(
    states: &[StateRef],
    item_ref: &[ItemRef],
    billback: &[BillbackRecord],
    ppm: &[PpmRecord],
) -> FilterOptions {
    let markets: BTreeSet<String> = states
        .iter()
        .filter_map(|s| s.custom_abbreviation.clone())
        .filter(|m| !m.is_empty())
        .collect();

    let brands_pk: BTreeSet<String> = item_ref
        .iter()
        .map(ItemRef::brand_pk)
        .filter(|b| !b.is_empty())
        .collect();

    let billback_years = billback
        .iter()
        .filter_map(|r| r.period_cell().and_then(parse_date));
    let ppm_years = ppm.iter().filter_map(|r| r.start.as_ref().and_then(parse_date));
    let years: BTreeSet<i32> = billback_years.chain(ppm_years).map(|d| d.year()).collect();

    FilterOptions {
        markets: markets.into_iter().collect(),
        brands_pk: brands_pk.into_iter().collect(),
        years: years.into_iter().collect(),
        months: (1..=12).filter_map(month_name).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrich::enrich_states;
    use crate::model::{Cell, RawRow, RowId};

    fn raw(pairs: &[(&str, &str)]) -> RawRow {
        pairs.iter().map(|(k, v)| (k.to_string(), Cell::from(*v))).collect()
    }

    #[test]
    fn options_are_sorted_and_unique() {
        let states = enrich_states(&[
            StateRef::from_raw(RowId(0), raw(&[("State Abbr", "TX")])),
            StateRef::from_raw(RowId(1), raw(&[("State Name", "Florida")])),
            StateRef::from_raw(RowId(2), raw(&[("State Abbr", "TX")])),
            StateRef::from_raw(RowId(3), raw(&[("State Code", "00")])),
        ]);
        let items = vec![
            ItemRef::from_raw(RowId(0), raw(&[("Supp. Brand Desc.", "Brand B"), ("Package Size", "12pk")])),
            ItemRef::from_raw(RowId(1), raw(&[("Supp. Brand Desc.", "Brand A"), ("Package Size", "6pk")])),
            ItemRef::from_raw(RowId(2), raw(&[("Supp. Brand Desc.", "Brand A"), ("Package Size", "6pk")])),
        ];
        let billback = vec![BillbackRecord::from_raw(RowId(0), raw(&[("Posting Period ", "1/15/2025")]))];
        let ppm = vec![
            PpmRecord::from_raw(RowId(0), raw(&[("Start", "2023-06-01")])),
            PpmRecord::from_raw(RowId(1), raw(&[("Start", "not a date")])),
        ];

        let opts = filter_options(&states, &items, &billback, &ppm);
        assert_eq!(opts.markets, vec!["FL", "TX"]);
        assert_eq!(opts.brands_pk, vec!["Brand A 6pk", "Brand B 12pk"]);
        assert_eq!(opts.years, vec![2023, 2025]);
        assert_eq!(opts.months.len(), 12);
        assert_eq!(opts.months[0], "January");
    }
}
