use serde::{Deserialize, Serialize};

use townsquare_core::game_trait::Seat;

/// Board edge length.
pub const SIZE: usize = 3;

/// Every row, column, and diagonal, as (row, col) triples.
const LINES: [[(usize, usize); 3]; 8] = [
    [(0, 0), (0, 1), (0, 2)],
    [(1, 0), (1, 1), (1, 2)],
    [(2, 0), (2, 1), (2, 2)],
    [(0, 0), (1, 0), (2, 0)],
    [(0, 1), (1, 1), (2, 1)],
    [(0, 2), (1, 2), (2, 2)],
    [(0, 0), (1, 1), (2, 2)],
    [(0, 2), (1, 1), (2, 0)],
];

/// Tri-state grid cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Cell {
    #[default]
    Empty,
    Player1,
    Player2,
}

impl Cell {
    pub fn for_seat(seat: Seat) -> Self {
        match seat {
            Seat::Player1 => Self::Player1,
            Seat::Player2 => Self::Player2,
        }
    }
}

/// The 3x3 grid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    cells: [[Cell; SIZE]; SIZE],
}

impl Board {
    pub fn get(&self, row: usize, col: usize) -> Cell {
        self.cells[row][col]
    }

    pub fn place(&mut self, row: usize, col: usize, cell: Cell) {
        self.cells[row][col] = cell;
    }

    pub fn occupied(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|c| **c != Cell::Empty)
            .count()
    }

    /// Explicit scan for any remaining empty cell.
    pub fn is_full(&self) -> bool {
        self.cells.iter().flatten().all(|c| *c != Cell::Empty)
    }

    /// Whether `mark` fills any complete line.
    pub fn completes_line(&self, mark: Cell) -> bool {
        mark != Cell::Empty
            && LINES
                .iter()
                .any(|line| line.iter().all(|&(r, c)| self.cells[r][c] == mark))
    }

    /// The mark owning a complete line, if any.
    pub fn winning_mark(&self) -> Option<Cell> {
        [Cell::Player1, Cell::Player2]
            .into_iter()
            .find(|&mark| self.completes_line(mark))
    }
}
