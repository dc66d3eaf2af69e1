//! Fuzz target: `LineAccumulator::feed` + `decode`
//!
//! Splits arbitrary bytes into chunks, streams them through the line
//! accumulator and decodes every completed line. Neither stage may panic,
//! and no line may exceed the response cap.
//!
//! cargo fuzz run fuzz_response_decoder

#![no_main]

use climatebox::protocol::codec::{self, LineAccumulator, MAX_RESPONSE_LEN, SEP};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&chunk, rest)) = data.split_first() else {
        return;
    };
    let chunk = usize::from(chunk).max(1);

    let mut rx = LineAccumulator::new();
    for piece in rest.chunks(chunk) {
        let mut input = piece;
        loop {
            match rx.feed(input) {
                Ok(Some(line)) => {
                    assert!(line.len() <= MAX_RESPONSE_LEN, "line exceeds response cap");
                    if let Ok(frame) = codec::decode(&line) {
                        // Decoded fields never contain the separator.
                        let sep = char::from(SEP);
                        assert!(frame.fields.iter().all(|f| !f.contains(sep)));
                    }
                    // Drain any further buffered lines.
                    input = &[];
                }
                Ok(None) | Err(_) => break,
            }
        }
        assert!(rx.pending() <= MAX_RESPONSE_LEN);
    }
    if let Some(tail) = rx.finish() {
        let _ = codec::decode(&tail);
    }

    // Whole input as a single frame.
    let _ = codec::decode(rest);
});
