use std::collections::HashSet;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SlotError};

/// Index of a symbol inside its catalog. Boards store these.
pub type SymbolIndex = u8;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Symbol {
    pub id: String,
    pub glyph: String,
    /// Relative draw frequency.
    pub weight: u32,
    /// Credits per unit of pattern multiplier.
    pub value: u64,
}

impl Symbol {
    pub fn new(id: impl Into<String>, glyph: impl Into<String>, weight: u32, value: u64) -> Self {
        Self {
            id: id.into(),
            glyph: glyph.into(),
            weight,
            value,
        }
    }
}

/// Ordered, validated list of symbols. Order only matters for how a weighted
/// draw value maps onto a symbol.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct SymbolCatalog {
    symbols: Vec<Symbol>,
}

impl SymbolCatalog {
    pub fn new(symbols: Vec<Symbol>) -> Result<Self> {
        if symbols.is_empty() {
            return Err(SlotError::invalid("symbol catalog is empty"));
        }
        if symbols.len() > SymbolIndex::MAX as usize + 1 {
            return Err(SlotError::invalid(format!(
                "symbol catalog holds {} symbols, at most {} are supported",
                symbols.len(),
                SymbolIndex::MAX as usize + 1
            )));
        }
        let mut seen = HashSet::new();
        for s in &symbols {
            if s.id.is_empty() {
                return Err(SlotError::invalid("symbol with empty id"));
            }
            if !seen.insert(s.id.as_str()) {
                return Err(SlotError::invalid(format!("duplicate symbol id `{}`", s.id)));
            }
            if s.weight == 0 {
                return Err(SlotError::invalid(format!("symbol `{}` has zero weight", s.id)));
            }
            if s.value == 0 {
                return Err(SlotError::invalid(format!("symbol `{}` has zero value", s.id)));
            }
        }
        Ok(Self { symbols })
    }

    /// The nine kanji of the original cabinet.
    pub fn reference() -> Self {
        Self {
            symbols: reference_symbols(),
        }
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn get(&self, index: SymbolIndex) -> Option<&Symbol> {
        self.symbols.get(index as usize)
    }

    pub fn index_of(&self, id: &str) -> Option<SymbolIndex> {
        self.symbols
            .iter()
            .position(|s| s.id == id)
            .map(|i| i as SymbolIndex)
    }

    pub fn by_id(&self, id: &str) -> Option<&Symbol> {
        self.symbols.iter().find(|s| s.id == id)
    }

    /// Glyph for an index, `?` for anything outside the catalog.
    pub fn glyph(&self, index: SymbolIndex) -> &str {
        self.get(index).map(|s| s.glyph.as_str()).unwrap_or("?")
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }

    /// `(id, weight)` pairs in catalog order, the input of the weighted sampler.
    pub fn weights(&self) -> Vec<(&str, u32)> {
        self.symbols
            .iter()
            .map(|s| (s.id.as_str(), s.weight))
            .collect()
    }

    /// Unweighted pick, used for scramble frames and the idle board.
    pub fn pick_uniform<R: Rng + ?Sized>(&self, rng: &mut R) -> SymbolIndex {
        rng.gen_range(0..self.symbols.len()) as SymbolIndex
    }
}

impl Default for SymbolCatalog {
    fn default() -> Self {
        Self::reference()
    }
}

impl<'de> Deserialize<'de> for SymbolCatalog {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let symbols = Vec::<Symbol>::deserialize(deserializer)?;
        SymbolCatalog::new(symbols).map_err(serde::de::Error::custom)
    }
}

pub fn reference_symbols() -> Vec<Symbol> {
    vec![
        Symbol::new("four", "四", 7, 4),
        Symbol::new("rain", "雨", 6, 8),
        Symbol::new("person", "人", 7, 8),
        Symbol::new("black", "黒", 6, 20),
        Symbol::new("money", "金", 4, 70),
        Symbol::new("heaven", "天", 6, 20),
        Symbol::new("soul", "霊", 5, 36),
        Symbol::new("life", "生", 5, 36),
        Symbol::new("time", "時", 5, 25),
    ]
}
