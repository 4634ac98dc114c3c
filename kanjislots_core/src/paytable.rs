use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SlotError;
use crate::patterns::Pattern;
use crate::symbols::SymbolCatalog;

/// Pattern category plus size, written `line4`, `square2`, `jackpot`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum PatternKey {
    Line(u8),
    Square(u8),
    Arrow,
    Ring,
    Jackpot,
}

impl PatternKey {
    /// Categories with a table entry but no detector.
    pub fn is_reserved(self) -> bool {
        matches!(self, PatternKey::Arrow | PatternKey::Ring | PatternKey::Jackpot)
    }
}

impl fmt::Display for PatternKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternKey::Line(n) => write!(f, "line{n}"),
            PatternKey::Square(n) => write!(f, "square{n}"),
            PatternKey::Arrow => f.write_str("arrow"),
            PatternKey::Ring => f.write_str("ring"),
            PatternKey::Jackpot => f.write_str("jackpot"),
        }
    }
}

impl FromStr for PatternKey {
    type Err = SlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let sized = |rest: &str| {
            rest.parse::<u8>()
                .map_err(|_| SlotError::invalid(format!("bad pattern size in `{s}`")))
        };
        match s {
            "arrow" => Ok(PatternKey::Arrow),
            "ring" => Ok(PatternKey::Ring),
            "jackpot" => Ok(PatternKey::Jackpot),
            _ => {
                if let Some(rest) = s.strip_prefix("line") {
                    Ok(PatternKey::Line(sized(rest)?))
                } else if let Some(rest) = s.strip_prefix("square") {
                    Ok(PatternKey::Square(sized(rest)?))
                } else {
                    Err(SlotError::invalid(format!("unknown pattern `{s}`")))
                }
            }
        }
    }
}

impl From<PatternKey> for String {
    fn from(key: PatternKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for PatternKey {
    type Error = SlotError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Pattern multipliers. A pattern pays `multiplier * symbol value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Paytable(pub BTreeMap<PatternKey, u64>);

impl Paytable {
    pub fn reference() -> Self {
        Self(BTreeMap::from([
            (PatternKey::Line(3), 1),
            (PatternKey::Line(4), 3),
            (PatternKey::Line(5), 5),
            (PatternKey::Line(6), 10),
            (PatternKey::Square(2), 2),
            (PatternKey::Square(3), 6),
            (PatternKey::Square(4), 12),
            (PatternKey::Arrow, 8),
            (PatternKey::Ring, 9),
            (PatternKey::Jackpot, 75),
        ]))
    }

    pub fn multiplier(&self, key: PatternKey) -> Option<u64> {
        self.0.get(&key).copied()
    }

    /// Entries no detector can produce; kept so the table stays complete.
    pub fn reserved(&self) -> impl Iterator<Item = (PatternKey, u64)> + '_ {
        self.0
            .iter()
            .filter(|(k, _)| k.is_reserved())
            .map(|(k, v)| (*k, *v))
    }

    /// Scores every pattern independently and sums the result.
    pub fn evaluate(&self, patterns: Vec<Pattern>, catalog: &SymbolCatalog) -> Evaluation {
        let mut scored = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let key = pattern.key();
            let Some(multiplier) = self.multiplier(key) else {
                debug!(%key, "no paytable entry, pattern ignored");
                continue;
            };
            let Some(symbol_value) = catalog.get(pattern.symbol).map(|s| s.value) else {
                debug!(symbol = pattern.symbol, "pattern symbol outside catalog");
                continue;
            };
            scored.push(ScoredPattern {
                key,
                multiplier,
                symbol_value,
                payout: multiplier * symbol_value,
                pattern,
            });
        }

        let payout = scored.iter().map(|s| s.payout).sum();
        let mut winning_cells: Vec<usize> = scored
            .iter()
            .flat_map(|s| s.pattern.cells.iter().copied())
            .collect();
        winning_cells.sort_unstable();
        winning_cells.dedup();

        Evaluation {
            patterns: scored,
            payout,
            winning_cells,
        }
    }
}

impl Default for Paytable {
    fn default() -> Self {
        Self::reference()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredPattern {
    pub pattern: Pattern,
    pub key: PatternKey,
    pub multiplier: u64,
    pub symbol_value: u64,
    pub payout: u64,
}

/// Result of scoring one board.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub patterns: Vec<ScoredPattern>,
    pub payout: u64,
    /// Cells to highlight, sorted and unique.
    pub winning_cells: Vec<usize>,
}

impl Evaluation {
    pub fn is_win(&self) -> bool {
        self.payout > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::{Direction, PatternKind};

    fn line(symbol: u8, cells: Vec<usize>) -> Pattern {
        Pattern {
            kind: PatternKind::Line,
            symbol,
            direction: Some(Direction::East),
            cells,
        }
    }

    #[test]
    fn test_key_names_round_trip() {
        for (text, key) in [
            ("line4", PatternKey::Line(4)),
            ("square3", PatternKey::Square(3)),
            ("jackpot", PatternKey::Jackpot),
        ] {
            assert_eq!(text.parse::<PatternKey>().unwrap(), key);
            assert_eq!(key.to_string(), text);
        }
        assert!("line".parse::<PatternKey>().is_err());
        assert!("triangle".parse::<PatternKey>().is_err());
    }

    #[test]
    fn test_reference_table_keeps_reserved_entries() {
        let table = Paytable::reference();
        let reserved: Vec<_> = table.reserved().collect();
        assert_eq!(
            reserved,
            vec![
                (PatternKey::Arrow, 8),
                (PatternKey::Ring, 9),
                (PatternKey::Jackpot, 75)
            ]
        );
        let json = serde_json::to_string(&table).unwrap();
        assert!(json.contains("\"line4\":3"));
        let back: Paytable = serde_json::from_str(&json).unwrap();
        assert_eq!(back, table);
    }

    #[test]
    fn test_line_of_four_pays_multiplier_times_value() {
        let catalog = SymbolCatalog::reference();
        let money = catalog.index_of("money").unwrap();
        let eval = Paytable::reference().evaluate(vec![line(money, vec![1, 2, 3, 4])], &catalog);
        assert_eq!(eval.payout, 3 * 70);
        assert_eq!(eval.winning_cells, vec![1, 2, 3, 4]);
        assert_eq!(eval.patterns[0].key, PatternKey::Line(4));
    }

    #[test]
    fn test_patterns_are_summed_without_overlap_suppression() {
        let catalog = SymbolCatalog::reference();
        let four = catalog.index_of("four").unwrap();
        let soul = catalog.index_of("soul").unwrap();
        let square = Pattern {
            kind: PatternKind::Square,
            symbol: four,
            direction: None,
            cells: vec![0, 1, 6, 7],
        };
        let eval = Paytable::reference().evaluate(
            vec![line(four, vec![0, 1, 2, 3, 4]), square, line(soul, vec![12, 13, 14, 15, 16, 17])],
            &catalog,
        );
        assert_eq!(eval.payout, 5 * 4 + 2 * 4 + 10 * 36);
        assert_eq!(
            eval.winning_cells,
            vec![0, 1, 2, 3, 4, 6, 7, 12, 13, 14, 15, 16, 17]
        );
    }

    #[test]
    fn test_unlisted_pattern_pays_nothing() {
        let catalog = SymbolCatalog::reference();
        let table = Paytable(BTreeMap::from([(PatternKey::Line(4), 3)]));
        let eval = table.evaluate(vec![line(0, vec![0, 1, 2, 3, 4, 5, 6])], &catalog);
        assert_eq!(eval.payout, 0);
        assert!(eval.patterns.is_empty());
        assert!(!eval.is_win());
    }
}
