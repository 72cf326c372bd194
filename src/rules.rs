//! Local placement gate.
//!
//! Used only to avoid sending placements the server would obviously refuse.
//! The server still decides; whatever it sends back is applied.

use crate::board::Cell;
use crate::error::ValidationError;
use crate::game::GameState;
use crate::protocol::PlayerId;

/// Why `local` may not place at `(x, y)` right now, if anything.
///
/// # Errors
///
/// The first failing check, in this order: game started, local turn,
/// coordinates on the board, cell empty.
pub fn check_placement(
    state: &GameState,
    x: usize,
    y: usize,
    local: PlayerId,
) -> Result<(), ValidationError> {
    if !state.started() {
        return Err(ValidationError::GameNotStarted);
    }
    if state.current_player() != local {
        return Err(ValidationError::NotYourTurn {
            current_player: state.current_player(),
        });
    }
    match state.board().get(x, y) {
        None => Err(ValidationError::OutOfRange {
            x,
            y,
            size: state.size(),
        }),
        Some(Cell::Stone(_)) => Err(ValidationError::Occupied { x, y }),
        Some(Cell::Empty) => Ok(()),
    }
}

/// Whether `local` may place at `(x, y)`.
pub fn can_place(state: &GameState, x: usize, y: usize, local: PlayerId) -> bool {
    check_placement(state, x, y, local).is_ok()
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
    use crate::protocol::InitPayload;

    fn state(size: usize, started: bool, current: PlayerId) -> GameState {
        GameState::from_init(&InitPayload {
            player_id: 1,
            board: vec![vec![0; size]; size],
            current_player: current,
            max_players: 3,
            players: vec![1, 2, 3],
            started,
            room_id: None,
        })
        .unwrap()
    }

    #[test]
    fn accepts_empty_cell_on_own_turn() {
        let s = state(15, true, 2);
        for (x, y) in [(0, 0), (14, 14), (0, 14), (7, 7)] {
            assert!(can_place(&s, x, y, 2));
        }
    }

    #[test]
    fn rejects_before_start() {
        let s = state(15, false, 1);
        assert_eq!(
            check_placement(&s, 0, 0, 1),
            Err(ValidationError::GameNotStarted)
        );
    }

    #[test]
    fn rejects_other_players_turn_everywhere() {
        let s = state(7, true, 1);
        for local in [2, 3, 4] {
            for y in 0..7 {
                for x in 0..7 {
                    assert_eq!(
                        check_placement(&s, x, y, local),
                        Err(ValidationError::NotYourTurn { current_player: 1 })
                    );
                }
            }
        }
    }

    #[test]
    fn rejects_out_of_range() {
        let s = state(9, true, 1);
        for (x, y) in [(9, 0), (0, 9), (100, 100)] {
            assert_eq!(
                check_placement(&s, x, y, 1),
                Err(ValidationError::OutOfRange { x, y, size: 9 })
            );
        }
    }

    #[test]
    fn rejects_occupied_cells() {
        let mut s = state(9, true, 1);
        s.apply_update(4, 4, 1, 2).unwrap();
        s.apply_update(5, 5, 2, 1).unwrap();
        assert!(!can_place(&s, 4, 4, 1));
        assert!(!can_place(&s, 5, 5, 1));
        assert!(can_place(&s, 6, 6, 1));
    }
}
