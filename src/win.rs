//! Five-in-a-row detection.
//!
//! The check is local and advisory: it gives instant feedback when a stone
//! lands, while the server's `win` message stays the final word. Both sides
//! must apply the same rule, which is the one implemented here.

use crate::board::{Board, Cell};
use crate::protocol::PlayerId;

/// Stones in a row needed to win. Longer runs also win.
pub const WIN_LENGTH: usize = 5;

/// The four undirected axes: horizontal, vertical and both diagonals.
pub const AXES: [(isize, isize); 4] = [(1, 0), (0, 1), (1, 1), (1, -1)];

/// Whether a stone of `player` at `(x, y)` completes five in a row.
///
/// The stone at `(x, y)` itself always counts, so this answers both "did the
/// last placement win" and "would placing here win". Off-board coordinates
/// never win.
pub fn check_win(board: &Board, x: usize, y: usize, player: PlayerId) -> bool {
    board.contains(x, y)
        && AXES
            .iter()
            .any(|&(dx, dy)| run_length(board, x, y, player, dx, dy) >= WIN_LENGTH)
}

/// Cells of the longest winning run through `(x, y)`, ordered along the axis.
///
/// Returns `None` when no axis reaches [`WIN_LENGTH`].
pub fn winning_line(
    board: &Board,
    x: usize,
    y: usize,
    player: PlayerId,
) -> Option<Vec<(usize, usize)>> {
    if !board.contains(x, y) {
        return None;
    }
    AXES.iter()
        .map(|&(dx, dy)| {
            let mut line = walk(board, x, y, player, -dx, -dy);
            line.reverse();
            line.push((x, y));
            line.extend(walk(board, x, y, player, dx, dy));
            line
        })
        .filter(|line| line.len() >= WIN_LENGTH)
        .max_by_key(Vec::len)
}

fn run_length(board: &Board, x: usize, y: usize, player: PlayerId, dx: isize, dy: isize) -> usize {
    1 + walk(board, x, y, player, dx, dy).len() + walk(board, x, y, player, -dx, -dy).len()
}

/// Contiguous `player` cells from `(x, y)` (exclusive) in direction `(dx, dy)`.
fn walk(
    board: &Board,
    x: usize,
    y: usize,
    player: PlayerId,
    dx: isize,
    dy: isize,
) -> Vec<(usize, usize)> {
    let mut cells = Vec::new();
    let (mut cx, mut cy) = (x, y);
    while let (Some(nx), Some(ny)) = (cx.checked_add_signed(dx), cy.checked_add_signed(dy)) {
        if board.get(nx, ny) != Some(Cell::Stone(player)) {
            break;
        }
        cells.push((nx, ny));
        (cx, cy) = (nx, ny);
    }
    cells
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

    /// Lay `len` stones of `player` from `(x, y)` along `(dx, dy)`.
    fn lay(board: &mut Board, x: usize, y: usize, dx: isize, dy: isize, len: usize, player: PlayerId) {
        let (mut cx, mut cy) = (x, y);
        for i in 0..len {
            assert!(board.set(cx, cy, Cell::Stone(player)));
            if i + 1 < len {
                cx = cx.checked_add_signed(dx).unwrap();
                cy = cy.checked_add_signed(dy).unwrap();
            }
        }
    }

    /// Starting points for each axis that put the run against an edge or corner.
    fn edge_starts(size: usize, dx: isize, dy: isize) -> Vec<(usize, usize)> {
        match (dx, dy) {
            (1, 0) => vec![(0, 0), (size - 5, size - 1), (3, 7)],
            (0, 1) => vec![(0, 0), (size - 1, size - 5), (7, 3)],
            (1, 1) => vec![(0, 0), (size - 5, size - 5), (2, 4)],
            (1, -1) => vec![(0, 4), (size - 5, size - 1), (3, 9)],
            _ => unreachable!(),
        }
    }

    #[test]
    fn four_in_a_row_never_wins() {
        for &(dx, dy) in &AXES {
            for (sx, sy) in edge_starts(15, dx, dy) {
                let mut board = Board::new(15);
                lay(&mut board, sx, sy, dx, dy, 4, 1);
                for (x, y, _) in board.clone().stones() {
                    assert!(
                        !check_win(&board, x, y, 1),
                        "run of 4 on axis ({dx},{dy}) from ({sx},{sy}) reported a win at ({x},{y})"
                    );
                }
            }
        }
    }

    #[test]
    fn five_in_a_row_wins_from_every_stone() {
        for &(dx, dy) in &AXES {
            for (sx, sy) in edge_starts(15, dx, dy) {
                let mut board = Board::new(15);
                lay(&mut board, sx, sy, dx, dy, 5, 2);
                for (x, y, _) in board.clone().stones() {
                    assert!(
                        check_win(&board, x, y, 2),
                        "run of 5 on axis ({dx},{dy}) from ({sx},{sy}) missed at ({x},{y})"
                    );
                }
            }
        }
    }

    #[test]
    fn six_in_a_row_still_wins() {
        let mut board = Board::new(19);
        lay(&mut board, 10, 2, 0, 1, 6, 3);
        assert!(check_win(&board, 10, 7, 3));
        assert_eq!(winning_line(&board, 10, 4, 3).unwrap().len(), 6);
    }

    #[test]
    fn other_players_stone_breaks_the_run() {
        let mut board = Board::new(15);
        lay(&mut board, 0, 0, 1, 0, 2, 1);
        board.set(2, 0, Cell::Stone(2));
        lay(&mut board, 3, 0, 1, 0, 2, 1);
        assert!(!check_win(&board, 4, 0, 1));
    }

    #[test]
    fn gap_breaks_the_run() {
        let mut board = Board::new(15);
        lay(&mut board, 5, 5, 1, 1, 2, 1);
        lay(&mut board, 8, 8, 1, 1, 3, 1);
        assert!(!check_win(&board, 8, 8, 1));
    }

    #[test]
    fn many_players_do_not_interfere() {
        let mut board = Board::new(9);
        for (row, player) in [7, 8, 9, 10].into_iter().enumerate() {
            lay(&mut board, 0, row, 1, 0, 4, player);
        }
        lay(&mut board, 0, 8, 1, 0, 5, 11);
        for player in 7..=10 {
            assert!(!check_win(&board, 3, (player - 7) as usize, player));
        }
        assert!(check_win(&board, 2, 8, 11));
    }

    #[test]
    fn smallest_board_diagonal_corner_to_corner() {
        let mut board = Board::new(5);
        lay(&mut board, 0, 4, 1, -1, 5, 1);
        assert!(check_win(&board, 4, 0, 1));
        assert_eq!(
            winning_line(&board, 2, 2, 1).unwrap(),
            vec![(0, 4), (1, 3), (2, 2), (3, 1), (4, 0)]
        );
    }

    #[test]
    fn counts_the_placed_stone_even_before_it_lands() {
        let mut board = Board::new(15);
        lay(&mut board, 0, 0, 1, 0, 4, 1);
        assert!(check_win(&board, 4, 0, 1));
        assert!(!check_win(&board, 4, 0, 2));
    }

    #[test]
    fn off_board_never_wins() {
        let board = Board::new(15);
        assert!(!check_win(&board, 15, 0, 1));
        assert!(winning_line(&board, 0, 15, 1).is_none());
    }
}
