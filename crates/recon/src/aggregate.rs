use crate::model::{Comment, ResultRow, StatsSummary};

/// Summary statistics over one reconciliation result set.
pub fn compute_stats(results: &[ResultRow]) -> StatsSummary {
    let mut stats = StatsSummary {
        total_records: results.len(),
        ..StatsSummary::default()
    };

    for r in results {
        match r.comment {
            Comment::PerfectMatch => stats.perfect_matches += 1,
            Comment::PriceMismatch => stats.mismatches += 1,
            Comment::MissingDeal => stats.missing_deals += 1,
            Comment::PpmOnly => stats.ppm_only += 1,
        }
        stats.total_variance += r.var;
        stats.absolute_variance += r.var.abs();
    }

    stats.percent_matched = if stats.total_records == 0 {
        0.0
    } else {
        100.0 * stats.perfect_matches as f64 / stats.total_records as f64
    };

    stats
}
