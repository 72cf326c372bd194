//! Rendering seam.
//!
//! The session never draws. After each accepted snapshot or placement the
//! client hands the current board to an injected [`Renderer`]; what it does
//! with it is not observed.

use std::collections::BTreeMap;
use std::io::Write;

use tracing::warn;

use crate::board::{Board, Cell};
use crate::protocol::PlayerId;
use crate::win;

/// Consumer of board snapshots. Calls must be idempotent.
pub trait Renderer: Send + 'static {
    fn draw(
        &mut self,
        board: &Board,
        size: usize,
        last_move: &BTreeMap<PlayerId, (usize, usize)>,
        local_player_id: PlayerId,
    );
}

/// Stone colours in player order: black, red, green, sky blue, purple, orange.
pub const STONE_PALETTE: [char; 6] = ['b', 'r', 'g', 's', 'p', 'o'];

/// Palette slot for `player`. Colours repeat once players outnumber them.
pub fn stone_color_index(player: PlayerId, palette_len: usize) -> usize {
    if palette_len == 0 {
        return 0;
    }
    usize::try_from(player.saturating_sub(1)).unwrap_or(0) % palette_len
}

/// Plain-text renderer for terminals.
///
/// Each stone is its palette letter, upper-cased on its owner's last move
/// and along a five-in-a-row through that move; empty cells are `.`.
#[derive(Debug)]
pub struct TextRenderer<W> {
    out: W,
}

impl<W: Write + Send + 'static> TextRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// The text [`draw`](Renderer::draw) writes, without writing it.
    pub fn render_text(
        board: &Board,
        size: usize,
        last_move: &BTreeMap<PlayerId, (usize, usize)>,
        local_player_id: PlayerId,
    ) -> String {
        let own = STONE_PALETTE
            .get(stone_color_index(local_player_id, STONE_PALETTE.len()))
            .copied()
            .unwrap_or('?');
        let highlighted: Vec<(usize, usize)> = last_move
            .iter()
            .filter_map(|(&player, &(x, y))| win::winning_line(board, x, y, player))
            .flatten()
            .collect();
        let mut text = format!("player {local_player_id} ({own})\n");
        for y in 0..size {
            let row: Vec<String> = (0..size)
                .map(|x| match board.get(x, y) {
                    Some(Cell::Stone(player)) => {
                        let glyph = STONE_PALETTE
                            .get(stone_color_index(player, STONE_PALETTE.len()))
                            .copied()
                            .unwrap_or('?');
                        if last_move.get(&player) == Some(&(x, y))
                            || highlighted.contains(&(x, y))
                        {
                            glyph.to_ascii_uppercase().to_string()
                        } else {
                            glyph.to_string()
                        }
                    }
                    Some(Cell::Empty) | None => ".".to_string(),
                })
                .collect();
            text.push_str(&row.join(" "));
            text.push('\n');
        }
        text
    }
}

impl<W: Write + Send + 'static> Renderer for TextRenderer<W> {
    fn draw(
        &mut self,
        board: &Board,
        size: usize,
        last_move: &BTreeMap<PlayerId, (usize, usize)>,
        local_player_id: PlayerId,
    ) {
        let text = Self::render_text(board, size, last_move, local_player_id);
        if let Err(e) = self
            .out
            .write_all(text.as_bytes())
            .and_then(|()| self.out.flush())
        {
            warn!("text renderer write failed: {e}");
        }
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
    fn colour_index_cycles() {
        assert_eq!(stone_color_index(1, 6), 0);
        assert_eq!(stone_color_index(6, 6), 5);
        assert_eq!(stone_color_index(7, 6), 0);
        assert_eq!(stone_color_index(3, 0), 0);
    }

    #[test]
    fn marks_last_moves_in_upper_case() {
        let mut board = Board::new(5);
        board.set(0, 0, Cell::Stone(1));
        board.set(1, 0, Cell::Stone(1));
        board.set(4, 4, Cell::Stone(2));
        let mut last = BTreeMap::new();
        last.insert(1, (1, 0));
        last.insert(2, (4, 4));

        let text = TextRenderer::<Vec<u8>>::render_text(&board, 5, &last, 2);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "player 2 (r)");
        assert_eq!(lines[1], "b B . . .");
        assert_eq!(lines[5], ". . . . R");
    }

    #[test]
    fn winning_run_is_upper_cased() {
        let mut board = Board::new(6);
        for i in 0..5 {
            board.set(i, i, Cell::Stone(1));
        }
        board.set(5, 0, Cell::Stone(2));
        board.set(0, 5, Cell::Stone(1));
        let mut last = BTreeMap::new();
        last.insert(1, (2, 2));
        last.insert(2, (5, 0));

        let text = TextRenderer::<Vec<u8>>::render_text(&board, 6, &last, 1);
        let lines: Vec<&str> = text.lines().skip(1).collect();
        assert_eq!(lines[0], "B . . . . R");
        assert_eq!(lines[2], ". . B . . .");
        assert_eq!(lines[4], ". . . . B .");
        // Not part of the run.
        assert_eq!(lines[5], "b . . . . .");
    }

    #[test]
    fn draw_writes_the_rendered_text() {
        let board = Board::new(5);
        let last = BTreeMap::new();
        let mut renderer = TextRenderer::new(Vec::new());
        renderer.draw(&board, 5, &last, 1);
        renderer.draw(&board, 5, &last, 1);
        let written = String::from_utf8(renderer.into_inner()).unwrap();
        let expected = TextRenderer::<Vec<u8>>::render_text(&board, 5, &last, 1);
        assert_eq!(written, format!("{expected}{expected}"));
    }
}
