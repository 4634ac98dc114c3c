//! Pattern detection over a populated board.
//!
//! Lines are maximal runs of one symbol along any of the eight adjacency
//! directions. A run read west-to-east and the same run read east-to-west
//! are one pattern, so the scan only walks the four forward directions and
//! only starts at the first cell of a run. Squares are uniform `k x k`
//! blocks not contained in a larger uniform block.

use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::paytable::PatternKey;
use crate::symbols::SymbolIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    East,
    West,
    South,
    North,
    SouthEast,
    NorthWest,
    SouthWest,
    NorthEast,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::East,
        Direction::West,
        Direction::South,
        Direction::North,
        Direction::SouthEast,
        Direction::NorthWest,
        Direction::SouthWest,
        Direction::NorthEast,
    ];

    /// One representative of each opposite pair.
    pub const FORWARD: [Direction; 4] = [
        Direction::East,
        Direction::South,
        Direction::SouthEast,
        Direction::SouthWest,
    ];

    /// `(row, column)` step.
    pub fn delta(self) -> (isize, isize) {
        match self {
            Direction::East => (0, 1),
            Direction::West => (0, -1),
            Direction::South => (1, 0),
            Direction::North => (-1, 0),
            Direction::SouthEast => (1, 1),
            Direction::NorthWest => (-1, -1),
            Direction::SouthWest => (1, -1),
            Direction::NorthEast => (-1, 1),
        }
    }

    /// Linear index offset on a board of the given width:
    /// `±1`, `±width`, `±(width + 1)` or `±(width - 1)`.
    pub fn offset(self, width: usize) -> isize {
        let (dr, dc) = self.delta();
        dr * width as isize + dc
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::East => Direction::West,
            Direction::West => Direction::East,
            Direction::South => Direction::North,
            Direction::North => Direction::South,
            Direction::SouthEast => Direction::NorthWest,
            Direction::NorthWest => Direction::SouthEast,
            Direction::SouthWest => Direction::NorthEast,
            Direction::NorthEast => Direction::SouthWest,
        }
    }

    /// Neighbouring index, or `None` if the step leaves the grid. Works on
    /// row and column separately so a step off the last column never lands
    /// on the first column of the next row.
    pub fn step(self, index: usize, width: usize, height: usize) -> Option<usize> {
        if width == 0 || index >= width * height {
            return None;
        }
        let (dr, dc) = self.delta();
        let row = (index / width) as isize + dr;
        let col = (index % width) as isize + dc;
        if row < 0 || col < 0 || row >= height as isize || col >= width as isize {
            return None;
        }
        Some(row as usize * width + col as usize)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    Line,
    Square,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    pub kind: PatternKind,
    pub symbol: SymbolIndex,
    /// Walking direction of a line; squares have none.
    pub direction: Option<Direction>,
    /// Board indices, in walking order for lines and row-major for squares.
    pub cells: Vec<usize>,
}

impl Pattern {
    /// Run length of a line, side length of a square.
    pub fn size(&self) -> usize {
        match self.kind {
            PatternKind::Line => self.cells.len(),
            PatternKind::Square => (self.cells.len() as f64).sqrt().round() as usize,
        }
    }

    pub fn key(&self) -> PatternKey {
        let size = self.size().min(u8::MAX as usize) as u8;
        match self.kind {
            PatternKind::Line => PatternKey::Line(size),
            PatternKind::Square => PatternKey::Square(size),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionRules {
    /// Shortest run that counts as a line.
    pub min_line: usize,
    pub squares: bool,
}

impl Default for DetectionRules {
    fn default() -> Self {
        Self {
            min_line: 4,
            squares: true,
        }
    }
}

/// Every winning pattern on the board, lines first, each in scan order.
pub fn detect(board: &Board, rules: &DetectionRules) -> Vec<Pattern> {
    let mut patterns = detect_lines(board, rules.min_line);
    if rules.squares {
        patterns.extend(detect_squares(board));
    }
    patterns
}

pub fn detect_lines(board: &Board, min_line: usize) -> Vec<Pattern> {
    let (width, height) = (board.width(), board.height());
    let cells = board.cells();
    let mut found = Vec::new();

    for start in 0..cells.len() {
        let symbol = cells[start];
        for direction in Direction::FORWARD {
            // only the first cell of a run may start it
            let continues_back = direction
                .opposite()
                .step(start, width, height)
                .is_some_and(|prev| cells[prev] == symbol);
            if continues_back {
                continue;
            }

            let mut run = vec![start];
            let mut cursor = start;
            while let Some(next) = direction.step(cursor, width, height) {
                if cells[next] != symbol {
                    break;
                }
                run.push(next);
                cursor = next;
            }

            if run.len() >= min_line.max(2) {
                found.push(Pattern {
                    kind: PatternKind::Line,
                    symbol,
                    direction: Some(direction),
                    cells: run,
                });
            }
        }
    }
    found
}

pub fn detect_squares(board: &Board) -> Vec<Pattern> {
    let (width, height) = (board.width(), board.height());
    let max_side = width.min(height);
    let mut found = Vec::new();

    for side in 2..=max_side {
        for row in 0..=height - side {
            for col in 0..=width - side {
                let Some(symbol) = uniform_block(board, row, col, side) else {
                    continue;
                };
                if inside_larger_square(board, row, col, side) {
                    continue;
                }
                let cells = (row..row + side)
                    .flat_map(|r| (col..col + side).map(move |c| r * width + c))
                    .collect();
                found.push(Pattern {
                    kind: PatternKind::Square,
                    symbol,
                    direction: None,
                    cells,
                });
            }
        }
    }
    found
}

fn uniform_block(board: &Board, row: usize, col: usize, side: usize) -> Option<SymbolIndex> {
    let symbol = board.at(row, col)?;
    for r in row..row + side {
        for c in col..col + side {
            if board.at(r, c)? != symbol {
                return None;
            }
        }
    }
    Some(symbol)
}

/// Any uniform block of side `side + 1` that covers this one.
fn inside_larger_square(board: &Board, row: usize, col: usize, side: usize) -> bool {
    let bigger = side + 1;
    if bigger > board.width().min(board.height()) {
        return false;
    }
    for r in row.saturating_sub(1)..=row {
        for c in col.saturating_sub(1)..=col {
            if r + bigger <= board.height()
                && c + bigger <= board.width()
                && uniform_block(board, r, c, bigger).is_some()
            {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    // Boards below use small integers as symbols; 0..9 are all distinct.
    fn board(width: usize, height: usize, cells: &[u8]) -> Board {
        Board::new(width, height, cells.to_vec()).unwrap()
    }

    fn lines_only() -> DetectionRules {
        DetectionRules {
            min_line: 4,
            squares: false,
        }
    }

    #[test]
    fn test_offsets() {
        let w = 6;
        let offsets: Vec<isize> = Direction::ALL.iter().map(|d| d.offset(w)).collect();
        assert_eq!(offsets, vec![1, -1, 6, -6, 7, -7, 5, -5]);
        for d in Direction::ALL {
            assert_eq!(d.opposite().opposite(), d);
            assert_eq!(d.offset(w), -d.opposite().offset(w));
        }
    }

    #[test]
    fn test_step_does_not_wrap_rows() {
        // index 5 is the last column of row 0
        assert_eq!(Direction::East.step(5, 6, 4), None);
        assert_eq!(Direction::SouthEast.step(5, 6, 4), None);
        assert_eq!(Direction::West.step(6, 6, 4), None);
        assert_eq!(Direction::SouthWest.step(6, 6, 4), None);
        assert_eq!(Direction::NorthEast.step(11, 6, 4), None);
        assert_eq!(Direction::North.step(3, 6, 4), None);
        assert_eq!(Direction::South.step(20, 6, 4), None);
        assert_eq!(Direction::SouthWest.step(5, 6, 4), Some(10));
        assert_eq!(Direction::East.step(4, 6, 4), Some(5));
    }

    #[test]
    fn test_horizontal_run_reported_once() {
        #[rustfmt::skip]
        let b = board(6, 4, &[
            1, 7, 7, 7, 7, 2,
            3, 4, 5, 6, 8, 9,
            1, 2, 3, 4, 5, 6,
            8, 9, 1, 2, 3, 4,
        ]);
        let found = detect(&b, &DetectionRules::default());
        assert_eq!(found.len(), 1);
        let line = &found[0];
        assert_eq!(line.kind, PatternKind::Line);
        assert_eq!(line.symbol, 7);
        assert_eq!(line.direction, Some(Direction::East));
        assert_eq!(line.cells, vec![1, 2, 3, 4]);
        assert_eq!(line.key(), PatternKey::Line(4));
    }

    #[test]
    fn test_run_across_row_boundary_is_not_a_line() {
        // cells 4,5 end row 0 and cells 6,7 start row 1
        #[rustfmt::skip]
        let b = board(6, 4, &[
            1, 2, 3, 4, 7, 7,
            7, 7, 5, 6, 8, 9,
            1, 2, 3, 4, 5, 6,
            8, 9, 1, 2, 3, 4,
        ]);
        assert!(detect(&b, &lines_only()).is_empty());
    }

    #[test]
    fn test_diagonal_does_not_wrap() {
        // 1, 6, 11, 16 is a +5 chain in flat indices, but 6 -> 11 would jump
        // from the first column of row 1 to its last column.
        #[rustfmt::skip]
        let b = board(6, 4, &[
            1, 7, 3, 4, 5, 6,
            7, 9, 1, 2, 3, 7,
            4, 5, 6, 8, 7, 1,
            2, 3, 4, 5, 6, 8,
        ]);
        assert!(detect(&b, &lines_only()).is_empty());
        assert_eq!(Direction::SouthWest.offset(6), 5);
    }

    #[test]
    fn test_vertical_and_diagonal_runs() {
        #[rustfmt::skip]
        let b = board(6, 4, &[
            7, 1, 2, 3, 4, 5,
            6, 7, 8, 9, 1, 5,
            2, 3, 7, 4, 6, 5,
            8, 9, 1, 7, 2, 5,
        ]);
        let found = detect(&b, &lines_only());
        assert_eq!(found.len(), 2);
        let diagonal = found.iter().find(|p| p.symbol == 7).unwrap();
        assert_eq!(diagonal.direction, Some(Direction::SouthEast));
        assert_eq!(diagonal.cells, vec![0, 7, 14, 21]);
        let vertical = found.iter().find(|p| p.symbol == 5).unwrap();
        assert_eq!(vertical.direction, Some(Direction::South));
        assert_eq!(vertical.cells, vec![5, 11, 17, 23]);
    }

    #[test]
    fn test_anti_diagonal_run() {
        #[rustfmt::skip]
        let b = board(6, 4, &[
            1, 2, 3, 4, 5, 7,
            8, 9, 1, 2, 7, 3,
            4, 5, 6, 7, 8, 9,
            1, 2, 7, 3, 4, 5,
        ]);
        let found = detect(&b, &lines_only());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].direction, Some(Direction::SouthWest));
        assert_eq!(found[0].cells, vec![5, 10, 15, 20]);
    }

    #[test]
    fn test_run_is_maximal() {
        #[rustfmt::skip]
        let b = board(6, 4, &[
            7, 7, 7, 7, 7, 7,
            1, 2, 3, 4, 5, 6,
            8, 9, 1, 2, 3, 4,
            5, 6, 8, 9, 1, 2,
        ]);
        let found = detect(&b, &lines_only());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].cells.len(), 6);
        assert_eq!(found[0].key(), PatternKey::Line(6));
    }

    #[test]
    fn test_short_runs_ignored() {
        #[rustfmt::skip]
        let b = board(6, 4, &[
            7, 7, 7, 1, 7, 7,
            1, 2, 3, 4, 5, 6,
            8, 9, 1, 2, 3, 4,
            5, 6, 8, 9, 1, 2,
        ]);
        assert!(detect(&b, &lines_only()).is_empty());
        let threes = detect_lines(&b, 3);
        assert_eq!(threes.len(), 1);
        assert_eq!(threes[0].cells, vec![0, 1, 2]);
    }

    #[test]
    fn test_square_detection_reports_largest_block() {
        #[rustfmt::skip]
        let b = board(6, 4, &[
            7, 7, 7, 1, 2, 3,
            7, 7, 7, 4, 5, 5,
            7, 7, 7, 6, 5, 5,
            1, 2, 3, 4, 8, 9,
        ]);
        let squares = detect_squares(&b);
        assert_eq!(squares.len(), 2);
        let big = squares.iter().find(|p| p.symbol == 7).unwrap();
        assert_eq!(big.size(), 3);
        assert_eq!(big.key(), PatternKey::Square(3));
        assert_eq!(big.cells, vec![0, 1, 2, 6, 7, 8, 12, 13, 14]);
        let small = squares.iter().find(|p| p.symbol == 5).unwrap();
        assert_eq!(small.cells, vec![10, 11, 16, 17]);
    }

    #[test]
    fn test_overlapping_two_by_two_blocks() {
        // a 2x3 block holds two distinct 2x2 squares and no 3x3
        #[rustfmt::skip]
        let b = board(4, 3, &[
            7, 7, 7, 1,
            7, 7, 7, 2,
            3, 4, 5, 6,
        ]);
        let squares = detect_squares(&b);
        assert_eq!(squares.len(), 2);
        assert!(squares.iter().all(|p| p.size() == 2));
    }

    #[test]
    fn test_uniform_board() {
        let b = board(6, 4, &[3; 24]);
        let found = detect(&b, &DetectionRules::default());
        let lines = found.iter().filter(|p| p.kind == PatternKind::Line).count();
        // 4 rows + 6 columns + 3 SE and 3 SW diagonals of length 4
        assert_eq!(lines, 16);
        let squares: Vec<_> = found.iter().filter(|p| p.kind == PatternKind::Square).collect();
        // three overlapping 4x4 blocks
        assert_eq!(squares.len(), 3);
        assert!(squares.iter().all(|p| p.size() == 4));
    }
}
