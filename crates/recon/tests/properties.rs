// Property-based tests for the reconciliation join.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::collections::HashSet;

use proptest::prelude::*;
use rebate_recon::engine::reconcile;
use rebate_recon::enrich::{enrich, enrich_ppm};
use rebate_recon::model::{BillbackRecord, Cell, PpmRecord, RawRow, StateRef};
use rebate_recon::{compute_stats, Comment, ManualMatches, RowId, ToleranceConfig};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// Small key space so billback and PPM keys collide often.
fn arb_key() -> impl Strategy<Value = String> {
    prop_oneof![
        6 => "[A-F]",
        1 => Just(" A".to_string()),
        1 => Just("".to_string()),
    ]
}

/// Mostly numeric, sometimes dirty text, sometimes empty.
fn arb_amount() -> impl Strategy<Value = Cell> {
    prop_oneof![
        4 => (0u32..10_000).prop_map(|c| Cell::Number(f64::from(c) / 100.0)),
        1 => (0u32..500).prop_map(|n| Cell::text(format!("${n}"))),
        1 => Just(Cell::text("n/a")),
        1 => Just(Cell::Empty),
    ]
}

fn raw(pairs: Vec<(&str, Cell)>) -> RawRow {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

fn arb_billback(max: usize) -> impl Strategy<Value = Vec<BillbackRecord>> {
    proptest::collection::vec((arb_key(), arb_amount(), arb_amount(), arb_amount()), 0..=max).prop_map(
        |rows| {
            rows.into_iter()
                .enumerate()
                .map(|(i, (key, qty, rebate, net))| {
                    BillbackRecord::from_raw(
                        RowId(i),
                        raw(vec![
                            ("Material", Cell::from(key.as_str())),
                            ("Quantity", qty),
                            ("Rebate", rebate),
                            ("Net$", net),
                        ]),
                    )
                })
                .collect()
        },
    )
}

fn arb_ppm(max: usize) -> impl Strategy<Value = Vec<PpmRecord>> {
    proptest::collection::vec((arb_key(), arb_amount()), 0..=max).prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (key, unit))| {
                PpmRecord::from_raw(
                    RowId(i),
                    raw(vec![("Dist Item#", Cell::from(key.as_str())), ("Unit Rebate$", unit)]),
                )
            })
            .collect()
    })
}

fn arb_overrides(max: usize) -> impl Strategy<Value = ManualMatches> {
    proptest::collection::vec((0..12usize, 0..12usize), 0..=max).prop_map(|pairs| {
        let mut m = ManualMatches::new();
        for (b, p) in pairs {
            m.create(RowId(b), RowId(p));
        }
        m
    })
}

fn billback_keys(rows: &[BillbackRecord]) -> HashSet<String> {
    rows.iter().filter_map(|r| r.material_key()).map(String::from).collect()
}

fn ppm_keys(rows: &[PpmRecord]) -> HashSet<String> {
    rows.iter().filter_map(|r| r.item_key()).map(String::from).collect()
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn every_key_appears_exactly_once(
        billback in arb_billback(12),
        ppm in arb_ppm(12),
    ) {
        let results = reconcile(&billback, &ppm, &ManualMatches::new(), &ToleranceConfig::default());

        let materials: Vec<&str> = results.iter().map(|r| r.material.as_str()).collect();
        let unique: HashSet<&str> = materials.iter().copied().collect();
        prop_assert_eq!(unique.len(), materials.len(), "duplicate material in {:?}", materials);

        let expected: HashSet<String> = billback_keys(&billback).union(&ppm_keys(&ppm)).cloned().collect();
        let got: HashSet<String> = unique.into_iter().map(String::from).collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn comment_follows_variance_rule(
        billback in arb_billback(12),
        ppm in arb_ppm(12),
        tol in prop_oneof![Just(0.0), Just(0.01), Just(1.0)],
    ) {
        let tolerance = ToleranceConfig { variance: tol };
        let results = reconcile(&billback, &ppm, &ManualMatches::new(), &tolerance);
        let bb = billback_keys(&billback);
        let pk = ppm_keys(&ppm);

        for r in &results {
            let in_bb = bb.contains(&r.material);
            let in_ppm = pk.contains(&r.material);
            match r.comment {
                Comment::PpmOnly => {
                    prop_assert!(!in_bb && in_ppm);
                    prop_assert_eq!(r.var, 0.0);
                    prop_assert_eq!(r.quantity, 0.0);
                }
                Comment::MissingDeal => {
                    prop_assert!(in_bb && !in_ppm);
                    prop_assert_eq!(r.var, r.rebate);
                    prop_assert_eq!(r.unit_rebate, 0.0);
                }
                Comment::PerfectMatch => {
                    prop_assert!(in_bb && in_ppm);
                    prop_assert!(r.var.abs() <= tol);
                }
                Comment::PriceMismatch => {
                    prop_assert!(in_bb && in_ppm);
                    prop_assert!(r.var.abs() > tol);
                }
            }
            if in_bb && in_ppm {
                let expected = r.rebate - r.unit_rebate * r.quantity;
                prop_assert!((r.var - expected).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn stats_are_consistent(
        billback in arb_billback(12),
        ppm in arb_ppm(12),
    ) {
        let results = reconcile(&billback, &ppm, &ManualMatches::new(), &ToleranceConfig::default());
        let stats = compute_stats(&results);

        prop_assert_eq!(
            stats.perfect_matches + stats.mismatches + stats.missing_deals + stats.ppm_only,
            stats.total_records
        );
        prop_assert!((0.0..=100.0).contains(&stats.percent_matched));
        prop_assert!(stats.absolute_variance + 1e-9 >= stats.total_variance.abs());
    }

    #[test]
    fn overrides_keep_billback_keys_and_uniqueness(
        billback in arb_billback(12),
        ppm in arb_ppm(12),
        overrides in arb_overrides(6),
    ) {
        let results = reconcile(&billback, &ppm, &overrides, &ToleranceConfig::default());

        let materials: Vec<&str> = results.iter().map(|r| r.material.as_str()).collect();
        let unique: HashSet<&str> = materials.iter().copied().collect();
        prop_assert_eq!(unique.len(), materials.len());

        for key in billback_keys(&billback) {
            prop_assert!(unique.contains(key.as_str()), "billback key {} dropped", key);
        }

        // A PPM key missing from the materials must have been claimed by a forced pairing.
        let forced_keys: HashSet<&str> = results
            .iter()
            .filter_map(|r| r.ppm_row)
            .filter_map(|id| ppm.iter().find(|p| p.row_id == id))
            .filter_map(|p| p.item_key())
            .collect();
        for key in ppm_keys(&ppm) {
            prop_assert!(
                unique.contains(key.as_str()) || forced_keys.contains(key.as_str()),
                "ppm key {} neither reported nor claimed",
                key
            );
        }

        for r in &results {
            if r.comment == Comment::PpmOnly {
                prop_assert!(r.billback_rows.is_empty());
            } else {
                prop_assert!(!r.billback_rows.is_empty());
            }
        }
    }

    #[test]
    fn enrichment_is_idempotent(
        billback in arb_billback(8),
        ppm in arb_ppm(8),
        names in proptest::collection::vec("[A-Za-z]{0,8}", 0..4),
    ) {
        let states: Vec<StateRef> = names
            .iter()
            .enumerate()
            .map(|(i, n)| StateRef::from_raw(
                RowId(i),
                raw(vec![("State Code", Cell::text(i.to_string())), ("State Name", Cell::from(n.as_str()))]),
            ))
            .collect();

        let (once_bb, once_states) = enrich(&states, &billback, &[]);
        let (twice_bb, twice_states) = enrich(&once_states, &once_bb, &[]);
        prop_assert_eq!(once_bb, twice_bb);
        prop_assert_eq!(once_states, twice_states);

        let once_ppm = enrich_ppm(&ppm);
        prop_assert_eq!(enrich_ppm(&once_ppm), once_ppm);
    }
}
