use std::collections::HashMap;

use crate::model::{join_brand_pk, BillbackRecord, ItemRef, PpmRecord, StateRef};

/// Derive the market short code for every state reference entry.
///
/// Priority: non-empty `State Abbr`, then the first two characters of
/// `State Name` upper-cased, then empty. An existing `Custom Abbreviation`
/// is never overwritten.
pub fn enrich_states(states: &[StateRef]) -> Vec<StateRef> {
    states
        .iter()
        .map(|s| {
            let mut out = s.clone();
            if out.custom_abbreviation.is_none() {
                out.custom_abbreviation = Some(derive_abbreviation(s));
            }
            out
        })
        .collect()
}

fn derive_abbreviation(s: &StateRef) -> String {
    if let Some(abbr) = s.state_abbr.as_deref().filter(|a| !a.is_empty()) {
        return abbr.to_string();
    }
    match s.state_name.as_deref() {
        Some(name) if name.chars().count() >= 2 => name.chars().take(2).collect::<String>().to_uppercase(),
        _ => String::new(),
    }
}

/// First-match-wins index: a key is only inserted when absent.
fn first_wins<'a, T>(items: impl Iterator<Item = (&'a str, T)>) -> HashMap<&'a str, T> {
    let mut index = HashMap::new();
    for (key, value) in items {
        index.entry(key).or_insert(value);
    }
    index
}

/// Attach market abbreviation and brand + pack size to billback rows.
///
/// `states` should already be enriched. Rows with no matching state or item
/// keep whatever derived value they carried before (none for fresh rows).
pub fn enrich_billback(
    billback: &[BillbackRecord],
    states: &[StateRef],
    item_ref: &[ItemRef],
) -> Vec<BillbackRecord> {
    let by_state_code = first_wins(
        states
            .iter()
            .filter_map(|s| s.state_code.as_deref().map(|code| (code, s))),
    );
    let by_material = first_wins(
        item_ref
            .iter()
            .filter_map(|i| i.material.as_deref().map(|m| (m, i))),
    );

    let enriched: Vec<BillbackRecord> = billback
        .iter()
        .map(|row| {
            let mut out = row.clone();

            if out.complete_date.is_none() {
                if let Some(period) = &out.posting_period {
                    out.complete_date = Some(period.clone());
                }
            }

            if let Some(state) = row.state.as_deref() {
                if let Some(found) = by_state_code.get(state) {
                    out.custom_abbreviation = found.custom_abbreviation.clone();
                }
            }

            if let Some(material) = row.material.as_deref() {
                if let Some(item) = by_material.get(material) {
                    out.brand_pk = Some(item.brand_pk());
                }
            }

            out
        })
        .collect();

    let unmatched_market = enriched.iter().filter(|r| r.custom_abbreviation.is_none()).count();
    let unmatched_brand = enriched.iter().filter(|r| r.brand_pk.is_none()).count();
    log::debug!(
        "enriched {} billback rows ({} without market, {} without brand)",
        enriched.len(),
        unmatched_market,
        unmatched_brand
    );

    enriched
}

/// Enrich the state reference, then the billback rows against it.
pub fn enrich(
    states: &[StateRef],
    billback: &[BillbackRecord],
    item_ref: &[ItemRef],
) -> (Vec<BillbackRecord>, Vec<StateRef>) {
    let states = enrich_states(states);
    let billback = enrich_billback(billback, &states, item_ref);
    (billback, states)
}

/// Attach `ppm_Brand+pk size` where both brand and pack size columns exist.
pub fn enrich_ppm(ppm: &[PpmRecord]) -> Vec<PpmRecord> {
    ppm.iter()
        .map(|row| {
            let mut out = row.clone();
            if row.brand.is_some() && row.package_size.is_some() {
                out.brand_pk = Some(join_brand_pk(row.brand.as_deref(), row.package_size.as_deref()));
            }
            out
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Cell, RawRow, RowId};

    fn raw(pairs: &[(&str, &str)]) -> RawRow {
        pairs.iter().map(|(k, v)| (k.to_string(), Cell::from(*v))).collect()
    }

    fn state(pairs: &[(&str, &str)]) -> StateRef {
        StateRef::from_raw(RowId(0), raw(pairs))
    }

    #[test]
    fn abbreviation_prefers_explicit_abbr() {
        let out = enrich_states(&[state(&[("State Code", "12"), ("State Abbr", "FL"), ("State Name", "Georgia")])]);
        assert_eq!(out[0].custom_abbreviation.as_deref(), Some("FL"));
    }

    #[test]
    fn abbreviation_from_name_when_abbr_blank() {
        let out = enrich_states(&[state(&[("State Abbr", ""), ("State Name", "Florida")])]);
        assert_eq!(out[0].custom_abbreviation.as_deref(), Some("FL"));
    }

    #[test]
    fn abbreviation_empty_when_nothing_usable() {
        let out = enrich_states(&[state(&[("State Code", "99")]), state(&[("State Name", "X")])]);
        assert_eq!(out[0].custom_abbreviation.as_deref(), Some(""));
        assert_eq!(out[1].custom_abbreviation.as_deref(), Some(""));
    }

    #[test]
    fn existing_abbreviation_kept() {
        let out = enrich_states(&[state(&[("State Abbr", "FL"), ("Custom Abbreviation", "NFL")])]);
        assert_eq!(out[0].custom_abbreviation.as_deref(), Some("NFL"));
    }

    fn billback(pairs: &[(&str, &str)]) -> BillbackRecord {
        BillbackRecord::from_raw(RowId(0), raw(pairs))
    }

    #[test]
    fn billback_gets_market_and_brand() {
        let states = enrich_states(&[state(&[("State Code", "12"), ("State Abbr", "FL")])]);
        let items = vec![ItemRef::from_raw(
            RowId(0),
            raw(&[("Material", "A1"), ("Supp. Brand Desc.", "Brand A "), ("Package Size", "6pk")]),
        )];
        let out = enrich_billback(&[billback(&[("Material", "A1"), ("State", "12")])], &states, &items);
        assert_eq!(out[0].custom_abbreviation.as_deref(), Some("FL"));
        assert_eq!(out[0].brand_pk.as_deref(), Some("Brand A  6pk"));
    }

    #[test]
    fn unmatched_lookups_leave_fields_unset() {
        let out = enrich_billback(&[billback(&[("Material", "ZZ"), ("State", "77")])], &[], &[]);
        assert_eq!(out.len(), 1);
        assert!(out[0].custom_abbreviation.is_none());
        assert!(out[0].brand_pk.is_none());
    }

    #[test]
    fn posting_period_aliased_to_complete_date() {
        let out = enrich_billback(&[billback(&[("Material", "A"), ("Posting Period ", "1/2/2024")])], &[], &[]);
        assert_eq!(out[0].complete_date, Some(Cell::text("1/2/2024")));
    }

    #[test]
    fn state_lookup_is_first_match() {
        let states = enrich_states(&[
            state(&[("State Code", "12"), ("State Abbr", "FL")]),
            state(&[("State Code", "12"), ("State Abbr", "GA")]),
        ]);
        let out = enrich_billback(&[billback(&[("State", "12")])], &states, &[]);
        assert_eq!(out[0].custom_abbreviation.as_deref(), Some("FL"));
    }

    #[test]
    fn ppm_brand_requires_both_columns() {
        let both = PpmRecord::from_raw(RowId(0), raw(&[("Supp. Brand Desc.", "Brand A"), ("Package Size", "6pk")]));
        let one = PpmRecord::from_raw(RowId(1), raw(&[("Supp. Brand Desc.", "Brand A")]));
        let out = enrich_ppm(&[both, one]);
        assert_eq!(out[0].brand_pk.as_deref(), Some("Brand A 6pk"));
        assert!(out[1].brand_pk.is_none());
    }

    #[test]
    fn ppm_brand_with_blank_pack_is_trimmed() {
        let rec = PpmRecord::from_raw(RowId(0), raw(&[("Supp. Brand Desc.", "Brand A"), ("Package Size", "")]));
        assert_eq!(enrich_ppm(&[rec])[0].brand_pk.as_deref(), Some("Brand A"));
    }

    #[test]
    fn enrichment_is_idempotent() {
        let states = enrich_states(&[state(&[("State Code", "12"), ("State Name", "Florida")])]);
        let items = vec![ItemRef::from_raw(
            RowId(0),
            raw(&[("Material", "A1"), ("Supp. Brand Desc.", "Brand A"), ("Package Size", "6pk")]),
        )];
        let rows = vec![billback(&[("Material", "A1"), ("State", "12"), ("Posting Period ", "1/2/2024")])];
        let once = enrich_billback(&rows, &states, &items);
        let twice = enrich_billback(&once, &enrich_states(&states), &items);
        assert_eq!(once, twice);
    }
}
