use std::collections::{HashMap, HashSet};

use crate::config::ToleranceConfig;
use crate::model::{BillbackRecord, Comment, PpmRecord, ResultRow, RowId};
use crate::overrides::ManualMatches;

/// Billback records sharing one trimmed material key, in first-seen order.
struct MaterialGroup<'a> {
    material: &'a str,
    records: Vec<&'a BillbackRecord>,
}

fn group_billback(billback: &[BillbackRecord]) -> Vec<MaterialGroup<'_>> {
    let mut groups: Vec<MaterialGroup<'_>> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut skipped = 0usize;

    for row in billback {
        let Some(material) = row.material_key() else {
            skipped += 1;
            continue;
        };
        match index.get(material) {
            Some(&i) => groups[i].records.push(row),
            None => {
                index.insert(material, groups.len());
                groups.push(MaterialGroup {
                    material,
                    records: vec![row],
                });
            }
        }
    }

    if skipped > 0 {
        log::warn!("skipped {skipped} billback rows with a blank Material");
    }
    groups
}

/// PPM lookup by item key. Duplicate keys resolve to the last record;
/// `order` keeps keys in first-seen order for the PPM-only pass.
struct PpmIndex<'a> {
    by_key: HashMap<&'a str, &'a PpmRecord>,
    by_row: HashMap<RowId, &'a PpmRecord>,
    order: Vec<&'a str>,
}

impl<'a> PpmIndex<'a> {
    fn build(ppm: &'a [PpmRecord]) -> Self {
        let mut by_key = HashMap::new();
        let mut order = Vec::new();
        for row in ppm {
            if let Some(key) = row.item_key() {
                if by_key.insert(key, row).is_none() {
                    order.push(key);
                }
            }
        }
        let by_row = ppm.iter().map(|r| (r.row_id, r)).collect();
        Self { by_key, by_row, order }
    }
}

/// Join filtered billback and PPM records by material, compute variance and
/// classify each material key.
///
/// Produces one row per billback material (in first-seen order) followed by
/// one `PPM Only` row per unclaimed PPM key. Non-numeric values count as 0.
///
/// A manual match on any record of a material group forces the whole group
/// onto that PPM record, bypassing the key join for that group only. The
/// forced PPM record's key is then considered claimed.
pub fn reconcile(
    billback: &[BillbackRecord],
    ppm: &[PpmRecord],
    overrides: &ManualMatches,
    tolerance: &ToleranceConfig,
) -> Vec<ResultRow> {
    let index = PpmIndex::build(ppm);
    let groups = group_billback(billback);

    let mut claimed: HashSet<&str> = groups.iter().map(|g| g.material).collect();
    let mut results = Vec::with_capacity(groups.len() + index.order.len());
    let mut forced_count = 0usize;

    for group in &groups {
        let rows: Vec<RowId> = group.records.iter().map(|r| r.row_id).collect();
        let forced = overrides
            .ppm_for_group(&rows)
            .find_map(|ppm| index.by_row.get(&ppm).copied());
        if forced.is_some() {
            forced_count += 1;
        }

        let matched = forced.or_else(|| index.by_key.get(group.material).copied());
        if let Some(key) = matched.and_then(PpmRecord::item_key) {
            claimed.insert(key);
        }

        results.push(reconcile_group(group, matched, tolerance));
    }

    for key in &index.order {
        if claimed.contains(key) {
            continue;
        }
        let ppm_row = index.by_key[key];
        results.push(ResultRow {
            material: (*key).to_string(),
            at_price: 0.0,
            case_in_part: 0.0,
            part_amount: 0.0,
            extended_part: 0.0,
            net: 0.0,
            quantity: 0.0,
            unit_rebate: ppm_row.unit_rebate.number_or_zero(),
            rebate: 0.0,
            var: 0.0,
            comment: Comment::PpmOnly,
            billback_rows: Vec::new(),
            ppm_row: Some(ppm_row.row_id),
        });
    }

    log::debug!(
        "reconciled {} billback groups against {} ppm keys ({} forced by manual match) -> {} rows",
        groups.len(),
        index.order.len(),
        forced_count,
        results.len()
    );

    results
}

fn reconcile_group(
    group: &MaterialGroup<'_>,
    ppm: Option<&PpmRecord>,
    tolerance: &ToleranceConfig,
) -> ResultRow {
    let sum = |f: fn(&BillbackRecord) -> f64| group.records.iter().map(|r| f(r)).sum::<f64>();

    let at_price = group
        .records
        .first()
        .map(|r| r.at_price.number_or_zero())
        .unwrap_or(0.0);
    let quantity = sum(|r| r.quantity.number_or_zero());
    let actual_rebate = sum(|r| r.rebate.number_or_zero());

    let (unit_rebate, var, comment) = match ppm {
        Some(p) => {
            let unit_rebate = p.unit_rebate.number_or_zero();
            let expected_rebate = unit_rebate * quantity;
            let var = actual_rebate - expected_rebate;
            let comment = if var.abs() > tolerance.variance {
                Comment::PriceMismatch
            } else {
                Comment::PerfectMatch
            };
            (unit_rebate, var, comment)
        }
        None => (0.0, actual_rebate, Comment::MissingDeal),
    };

    ResultRow {
        material: group.material.to_string(),
        at_price,
        case_in_part: sum(|r| r.case_in_part.number_or_zero()),
        part_amount: sum(|r| r.part_amount.number_or_zero()),
        extended_part: sum(|r| r.extended_part.number_or_zero()),
        net: sum(|r| r.net.number_or_zero()),
        quantity,
        unit_rebate,
        rebate: actual_rebate,
        var,
        comment,
        billback_rows: group.records.iter().map(|r| r.row_id).collect(),
        ppm_row: ppm.map(|p| p.row_id),
    }
}
