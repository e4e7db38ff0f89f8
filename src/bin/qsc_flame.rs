use qsc::{decode_ints, encode_ints, CoderConfig, PredictorConfig, Scheme};

fn main() {
    // Slow sine with occasional flat stretches: exercises both schemes.
    let input = (0..10000i32)
        .map(|i| {
            let t = f64::from(i) / 50.0;
            if i % 400 < 100 {
                0
            } else {
                (t.sin() * 5000.0) as i32
            }
        })
        .collect::<Vec<_>>();

    for scheme in [Scheme::Size, Scheme::RunLength] {
        let config = CoderConfig {
            predictor: PredictorConfig::Second { prev1: 0, prev2: 0 },
            scheme,
            ..CoderConfig::default()
        };
        for _ in 0..200 {
            let bytes = encode_ints(&config, &input).unwrap();
            let out = decode_ints(&config, &bytes, input.len()).unwrap();
            assert_eq!(out.len(), input.len());
        }
    }
}
