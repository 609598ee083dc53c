use serde::{Deserialize, Serialize};

use crate::error::OverrideError;
use crate::model::RowId;

/// A user-forced pairing of one billback row with one PPM row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ManualMatch {
    pub billback: RowId,
    pub ppm: RowId,
}

/// Override pairs in creation order, with set semantics.
///
/// Rows are identified by their origin position in the uploaded dataset, so a
/// pair keeps pointing at the same records no matter how the data is filtered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManualMatches {
    pairs: Vec<ManualMatch>,
}

impl ManualMatches {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pair. Adding an existing pair is a no-op. Returns whether the
    /// set changed.
    pub fn create(&mut self, billback: RowId, ppm: RowId) -> bool {
        if self.contains(billback, ppm) {
            return false;
        }
        self.pairs.push(ManualMatch { billback, ppm });
        true
    }

    pub fn remove(&mut self, billback: RowId, ppm: RowId) -> Result<(), OverrideError> {
        let pair = ManualMatch { billback, ppm };
        match self.pairs.iter().position(|p| *p == pair) {
            Some(idx) => {
                self.pairs.remove(idx);
                Ok(())
            }
            None => Err(OverrideError::NotMatched { billback, ppm }),
        }
    }

    pub fn contains(&self, billback: RowId, ppm: RowId) -> bool {
        self.pairs.contains(&ManualMatch { billback, ppm })
    }

    /// PPM rows forced onto any of `billback`, in creation order.
    pub fn ppm_for_group<'a>(&'a self, billback: &'a [RowId]) -> impl Iterator<Item = RowId> + 'a {
        self.pairs
            .iter()
            .filter(move |p| billback.contains(&p.billback))
            .map(|p| p.ppm)
    }

    pub fn clear(&mut self) {
        self.pairs.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ManualMatch> {
        self.pairs.iter()
    }
}

impl FromIterator<ManualMatch> for ManualMatches {
    fn from_iter<I: IntoIterator<Item = ManualMatch>>(iter: I) -> Self {
        let mut out = Self::new();
        for m in iter {
            out.create(m.billback, m.ppm);
        }
        out
    }
}
