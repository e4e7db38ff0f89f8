#![no_main]
use libfuzzer_sys::fuzz_target;
use qsc::{CoderConfig, Decoded, Scheme, SequenceDecoder, SliceSource};

// Arbitrary bytes must decode to values or a clean error, never a panic.
fuzz_target!(|data: (Vec<u8>, bool)| {
    let (bytes, run_length) = data;
    let config = CoderConfig {
        scheme: if run_length { Scheme::RunLength } else { Scheme::Size },
        ..CoderConfig::default()
    };
    let Ok(mut decoder) = SequenceDecoder::new(&config, SliceSource::new(&bytes)) else {
        return;
    };
    // Runs can expand to many zeros; cap the work per input.
    for _ in 0..100_000 {
        match decoder.next_int() {
            Ok(Decoded::Ready(_)) => {}
            Ok(Decoded::NeedMoreBits) | Err(_) => break,
        }
    }
});
