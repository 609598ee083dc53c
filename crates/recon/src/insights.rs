//! Chart-ready series and follow-up hints derived from a result set.
//!
//! Rendering is left to the caller; everything here is plain data.

use serde::Serialize;

use crate::model::{Comment, ResultRow, StatsSummary};

/// Below this share of perfect matches a run gets an "investigate" hint.
pub const MATCH_RATE_WARNING_PERCENT: f64 = 90.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryVariance {
    pub category: &'static str,
    pub count: usize,
    pub absolute_variance: f64,
}

/// Absolute variance per outcome category, in fixed category order.
pub fn variance_by_comment(results: &[ResultRow]) -> Vec<CategoryVariance> {
    Comment::ALL
        .iter()
        .map(|c| {
            let rows = results.iter().filter(|r| r.comment == *c);
            let (count, absolute_variance) =
                rows.fold((0usize, 0.0f64), |(n, sum), r| (n + 1, sum + r.var.abs()));
            CategoryVariance {
                category: c.label(),
                count,
                absolute_variance,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialVariance {
    pub material: String,
    pub variance: f64,
    pub comment: Comment,
    /// Rebate actually claimed.
    pub billback: f64,
    /// Rebate the agreement implies (`Unit Rebate$ * Quantity`).
    pub ppm: f64,
}

/// The `n` rows with the largest |VAR|. Ties keep result order.
pub fn top_materials(results: &[ResultRow], n: usize) -> Vec<MaterialVariance> {
    let mut ranked: Vec<&ResultRow> = results.iter().collect();
    ranked.sort_by(|a, b| b.var.abs().total_cmp(&a.var.abs()));
    ranked
        .into_iter()
        .take(n)
        .map(|r| MaterialVariance {
            material: r.material.clone(),
            variance: r.var,
            comment: r.comment,
            billback: r.rebate,
            ppm: r.expected_rebate(),
        })
        .collect()
}

/// Follow-up actions suggested by the summary.
pub fn recommendations(stats: &StatsSummary, tolerance: f64) -> Vec<String> {
    let mut out = Vec::new();
    if stats.mismatches > 0 {
        out.push(format!(
            "Review the {} mismatched records to identify pricing discrepancies",
            stats.mismatches
        ));
    }
    if stats.missing_deals > 0 {
        out.push(format!("Follow up on the {} missing deals", stats.missing_deals));
    }
    if stats.total_variance.abs() > tolerance {
        out.push(format!("Address the total variance of ${:.2}", stats.total_variance));
    }
    if stats.total_records > 0 && stats.percent_matched < MATCH_RATE_WARNING_PERCENT {
        out.push(format!(
            "Investigate why only {:.1}% of records matched perfectly",
            stats.percent_matched
        ));
    }
    out
}

/// Everything a report or dashboard needs beyond the rows and stats.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insights {
    pub variance_by_comment: Vec<CategoryVariance>,
    pub top_materials: Vec<MaterialVariance>,
    pub recommendations: Vec<String>,
}

pub const TOP_MATERIALS: usize = 5;

pub fn build_insights(results: &[ResultRow], stats: &StatsSummary, tolerance: f64) -> Insights {
    Insights {
        variance_by_comment: variance_by_comment(results),
        top_materials: top_materials(results, TOP_MATERIALS),
        recommendations: recommendations(stats, tolerance),
    }
}
