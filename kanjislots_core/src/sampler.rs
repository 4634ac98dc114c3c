use rand::Rng;

use crate::error::{Result, SlotError};
use crate::symbols::{SymbolCatalog, SymbolIndex};

/// Cumulative-weight sampler.
///
/// A draw `v` in `[0, total)` maps to the first entry whose cumulative weight
/// exceeds `v`, walking entries in catalog order. The mapping is fixed for a
/// given catalog, so a known draw always yields the same symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightedSampler {
    cumulative: Vec<u64>,
}

impl WeightedSampler {
    pub fn new<I, S>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, u32)>,
        S: AsRef<str>,
    {
        let mut cumulative = Vec::new();
        let mut running = 0u64;
        for (id, weight) in entries {
            if weight == 0 {
                return Err(SlotError::invalid(format!(
                    "weight of `{}` must be positive",
                    id.as_ref()
                )));
            }
            running += weight as u64;
            cumulative.push(running);
        }
        if cumulative.is_empty() {
            return Err(SlotError::invalid("cannot sample from an empty weight list"));
        }
        if cumulative.len() > SymbolIndex::MAX as usize + 1 {
            return Err(SlotError::invalid("too many weighted entries"));
        }
        Ok(Self { cumulative })
    }

    pub fn from_catalog(catalog: &SymbolCatalog) -> Result<Self> {
        Self::new(catalog.weights())
    }

    /// Sum of all weights.
    pub fn total(&self) -> u64 {
        self.cumulative.last().copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.cumulative.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cumulative.is_empty()
    }

    /// Entry selected by the draw value, `None` once `draw >= total()`.
    pub fn index_for(&self, draw: u64) -> Option<SymbolIndex> {
        let idx = self.cumulative.partition_point(|&c| c <= draw);
        (idx < self.cumulative.len()).then_some(idx as SymbolIndex)
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> SymbolIndex {
        let draw = rng.gen_range(0..self.total());
        self.index_for(draw).unwrap_or(0)
    }
}
