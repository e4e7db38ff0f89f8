#![no_main]
use libfuzzer_sys::fuzz_target;
use qsc::{decode_ints, encode_ints, CoderConfig, PredictorConfig, Scheme};

fuzz_target!(|data: (Vec<i32>, u8, bool, i32, i32)| {
    let (input, order, run_length, a, b) = data;

    let Ok(predictor) = PredictorConfig::from_order(order % 3, a, b) else {
        return;
    };
    let config = CoderConfig {
        predictor,
        scheme: if run_length { Scheme::RunLength } else { Scheme::Size },
        ..CoderConfig::default()
    };

    let bytes = encode_ints(&config, &input).unwrap();
    let output = decode_ints(&config, &bytes, input.len()).unwrap();
    assert_eq!(input, output);
});
