//! Square omok board.

use crate::error::{OmokError, Result};
use crate::protocol::{PlayerId, EMPTY_CELL};

/// Content of one intersection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Cell {
    #[default]
    Empty,
    Stone(PlayerId),
}

impl Cell {
    /// Decode a wire value; [`EMPTY_CELL`] is empty, anything else a stone.
    pub fn from_wire(value: PlayerId) -> Self {
        if value == EMPTY_CELL {
            Self::Empty
        } else {
            Self::Stone(value)
        }
    }

    pub fn to_wire(self) -> PlayerId {
        match self {
            Self::Empty => EMPTY_CELL,
            Self::Stone(player) => player,
        }
    }
}

/// A `size`×`size` grid stored row-major. Coordinates are `(x, y)` with `x`
/// the column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    size: usize,
    cells: Vec<Cell>,
}

impl Board {
    /// An empty board.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![Cell::Empty; size * size],
        }
    }

    /// Build a board from wire rows (`rows[y][x]`).
    ///
    /// # Errors
    ///
    /// Returns [`OmokError::Protocol`] if the grid is empty or not square.
    pub fn from_rows(rows: &[Vec<PlayerId>]) -> Result<Self> {
        let size = rows.len();
        if size == 0 {
            return Err(OmokError::Protocol("board has no rows".into()));
        }
        let mut cells = Vec::with_capacity(size * size);
        for (y, row) in rows.iter().enumerate() {
            if row.len() != size {
                return Err(OmokError::Protocol(format!(
                    "board row {y} has {} cells, expected {size}",
                    row.len()
                )));
            }
            cells.extend(row.iter().copied().map(Cell::from_wire));
        }
        Ok(Self { size, cells })
    }

    /// Encode back into wire rows.
    pub fn to_rows(&self) -> Vec<Vec<PlayerId>> {
        self.cells
            .chunks(self.size.max(1))
            .map(|row| row.iter().map(|cell| cell.to_wire()).collect())
            .collect()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Whether `(x, y)` lies on the board.
    pub fn contains(&self, x: usize, y: usize) -> bool {
        x < self.size && y < self.size
    }

    /// The cell at `(x, y)`, or `None` off the board.
    pub fn get(&self, x: usize, y: usize) -> Option<Cell> {
        self.index(x, y).and_then(|i| self.cells.get(i)).copied()
    }

    /// Overwrite `(x, y)`. Returns `false` off the board.
    pub(crate) fn set(&mut self, x: usize, y: usize, cell: Cell) -> bool {
        match self.index(x, y).and_then(|i| self.cells.get_mut(i)) {
            Some(slot) => {
                *slot = cell;
                true
            }
            None => false,
        }
    }

    /// Every stone as `(x, y, player)`, row by row.
    pub fn stones(&self) -> impl Iterator<Item = (usize, usize, PlayerId)> + '_ {
        let size = self.size.max(1);
        self.cells
            .iter()
            .enumerate()
            .filter_map(move |(i, cell)| match cell {
                Cell::Stone(player) => Some((i % size, i / size, *player)),
                Cell::Empty => None,
            })
    }

    fn index(&self, x: usize, y: usize) -> Option<usize> {
        self.contains(x, y).then(|| y * self.size + x)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    #[test]
    fn from_rows_rejects_ragged_grid() {
        let rows = vec![vec![0, 0, 0], vec![0, 0], vec![0, 0, 0]];
        assert!(matches!(Board::from_rows(&rows), Err(OmokError::Protocol(_))));
    }

    #[test]
    fn from_rows_rejects_empty_grid() {
        assert!(Board::from_rows(&[]).is_err());
    }

    #[test]
    fn from_rows_reads_row_major() {
        let rows = vec![vec![0, 1, 0], vec![0, 0, 2], vec![0, 0, 0]];
        let board = Board::from_rows(&rows).unwrap();
        assert_eq!(board.size(), 3);
        assert_eq!(board.get(1, 0), Some(Cell::Stone(1)));
        assert_eq!(board.get(2, 1), Some(Cell::Stone(2)));
        assert_eq!(board.get(0, 2), Some(Cell::Empty));
        assert_eq!(board.to_rows(), rows);
    }

    #[test]
    fn get_and_set_respect_bounds() {
        let mut board = Board::new(5);
        assert!(board.get(5, 0).is_none());
        assert!(!board.set(0, 5, Cell::Stone(1)));
        assert!(board.set(4, 4, Cell::Stone(3)));
        assert_eq!(board.get(4, 4), Some(Cell::Stone(3)));
    }

    #[test]
    fn stones_lists_occupied_cells() {
        let mut board = Board::new(5);
        board.set(3, 1, Cell::Stone(2));
        board.set(0, 4, Cell::Stone(1));
        let stones: Vec<_> = board.stones().collect();
        assert_eq!(stones, vec![(3, 1, 2), (0, 4, 1)]);
    }
}
