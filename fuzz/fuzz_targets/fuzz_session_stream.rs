#![no_main]

//! Feeds newline-separated server messages into a session. Whatever the
//! server says, the session must not panic and the board must stay square.

use libfuzzer_sys::fuzz_target;
use omok_client::protocol::ServerMessage;
use omok_client::Session;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let mut session = Session::new();
    for line in text.lines() {
        if let Ok(msg) = serde_json::from_str::<ServerMessage>(line) {
            let _ = session.handle(msg);
        }
        if let Some(game) = session.game() {
            assert_eq!(game.board().to_rows().len(), game.size());
            let _ = session.place(0, 0);
        }
    }
});
