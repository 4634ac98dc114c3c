use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SlotError};
use crate::sampler::WeightedSampler;
use crate::symbols::{SymbolCatalog, SymbolIndex};

/// Row-major grid of symbol indices. Cell `i` sits at row `i / width`,
/// column `i % width`; `cells.len() == width * height` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    width: usize,
    height: usize,
    cells: Vec<SymbolIndex>,
}

impl Board {
    pub fn new(width: usize, height: usize, cells: Vec<SymbolIndex>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(SlotError::invalid("board dimensions must be positive"));
        }
        if cells.len() != width * height {
            return Err(SlotError::invalid(format!(
                "board of {width}x{height} needs {} cells, got {}",
                width * height,
                cells.len()
            )));
        }
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    /// Builds a board from symbol ids, mostly handy for fixtures.
    pub fn from_ids(catalog: &SymbolCatalog, width: usize, height: usize, ids: &[&str]) -> Result<Self> {
        let cells = ids
            .iter()
            .map(|id| {
                catalog
                    .index_of(id)
                    .ok_or_else(|| SlotError::invalid(format!("unknown symbol `{id}`")))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(width, height, cells)
    }

    /// Fills every cell with an independent weighted draw.
    pub fn generate<R: Rng + ?Sized>(
        sampler: &WeightedSampler,
        width: usize,
        height: usize,
        rng: &mut R,
    ) -> Self {
        let cells = (0..width * height).map(|_| sampler.sample(rng)).collect();
        Self {
            width,
            height,
            cells,
        }
    }

    /// Unweighted fill, shown before the first spin.
    pub fn idle<R: Rng + ?Sized>(catalog: &SymbolCatalog, width: usize, height: usize, rng: &mut R) -> Self {
        let cells = (0..width * height)
            .map(|_| catalog.pick_uniform(rng))
            .collect();
        Self {
            width,
            height,
            cells,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[SymbolIndex] {
        &self.cells
    }

    pub fn get(&self, index: usize) -> Option<SymbolIndex> {
        self.cells.get(index).copied()
    }

    pub fn at(&self, row: usize, col: usize) -> Option<SymbolIndex> {
        if row >= self.height || col >= self.width {
            return None;
        }
        self.get(row * self.width + col)
    }

    pub fn index(&self, row: usize, col: usize) -> usize {
        row * self.width + col
    }

    pub fn row_col(&self, index: usize) -> (usize, usize) {
        (index / self.width, index % self.width)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[SymbolIndex]> {
        self.cells.chunks(self.width)
    }

    /// One string of glyphs per row.
    pub fn glyph_rows(&self, catalog: &SymbolCatalog) -> Vec<String> {
        self.rows()
            .map(|row| row.iter().map(|&s| catalog.glyph(s)).collect())
            .collect()
    }

    pub fn ids<'a>(&self, catalog: &'a SymbolCatalog) -> Vec<&'a str> {
        self.cells
            .iter()
            .map(|&s| catalog.get(s).map(|sym| sym.id.as_str()).unwrap_or("?"))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_generated_board_has_full_size() {
        let catalog = SymbolCatalog::reference();
        let sampler = WeightedSampler::from_catalog(&catalog).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        for (w, h) in [(6, 4), (1, 1), (5, 3), (8, 8)] {
            let board = Board::generate(&sampler, w, h, &mut rng);
            assert_eq!(board.len(), w * h);
            assert!(board.cells().iter().all(|&s| catalog.get(s).is_some()));
        }
    }

    #[test]
    fn test_wrong_length_rejected() {
        assert!(Board::new(6, 4, vec![0; 23]).is_err());
        assert!(Board::new(0, 4, vec![]).is_err());
        assert!(Board::new(2, 2, vec![0; 4]).is_ok());
    }

    #[test]
    fn test_row_major_indexing() {
        let board = Board::new(3, 2, vec![0, 1, 2, 3, 4, 5]).unwrap();
        assert_eq!(board.row_col(4), (1, 1));
        assert_eq!(board.index(1, 2), 5);
        assert_eq!(board.at(1, 0), Some(3));
        assert_eq!(board.at(2, 0), None);
        assert_eq!(board.rows().count(), 2);
    }

    #[test]
    fn test_glyph_rows() {
        let catalog = SymbolCatalog::reference();
        let board = Board::from_ids(&catalog, 2, 2, &["money", "four", "rain", "time"]).unwrap();
        assert_eq!(board.glyph_rows(&catalog), vec!["金四", "雨時"]);
        assert!(Board::from_ids(&catalog, 1, 1, &["dragon"]).is_err());
    }
}
