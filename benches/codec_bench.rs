use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use qsc::{
    decode_ints, encode_ints, BitSink, BitSource, CoderConfig, Decoded, HuffmanCoder,
    HuffmanDecoder, HuffmanTable, PredictorConfig, Scheme, SliceSource,
};

/// Temperature-like signal: slow drift, noise, flat stretches.
fn signal(len: usize) -> Vec<i32> {
    (0..len)
        .map(|i| {
            if i % 500 < 120 {
                2200
            } else {
                2200 + ((i as f64 / 40.0).sin() * 300.0) as i32 + (i % 7) as i32 - 3
            }
        })
        .collect()
}

fn bench_huffman(c: &mut Criterion) {
    let mut group = c.benchmark_group("huffman");
    let input = (0..10_000u32).map(|i| ((i * 31) % 256) as u8).collect::<Vec<_>>();
    group.throughput(Throughput::Elements(input.len() as u64));
    let table = HuffmanTable::default();
    let coder = HuffmanCoder::new(&table);
    let decoder = HuffmanDecoder::new(&table);

    group.bench_function("encode", |b| {
        b.iter(|| {
            let mut sink = BitSink::new(Vec::with_capacity(input.len() * 2));
            for &s in &input {
                coder.code(&mut sink, u32::from(s)).unwrap();
            }
            sink.close();
            sink.into_inner()
        })
    });

    let mut sink = BitSink::new(Vec::new());
    for &s in &input {
        coder.code(&mut sink, u32::from(s)).unwrap();
    }
    sink.close();
    let bytes = sink.into_inner();

    group.bench_function("decode", |b| {
        b.iter(|| {
            let mut bits = BitSource::new(SliceSource::new(&bytes));
            let mut n = 0usize;
            while let Decoded::Ready(_) = decoder.decode(&mut bits).unwrap() {
                n += 1;
            }
            n
        })
    });
}

fn bench_sequence(c: &mut Criterion) {
    let mut group = c.benchmark_group("sequence");
    let input = signal(10_000);
    group.throughput(Throughput::Elements(input.len() as u64));

    for (name, scheme) in [("size", Scheme::Size), ("run_length", Scheme::RunLength)] {
        let config = CoderConfig {
            predictor: PredictorConfig::First { initial: 2200 },
            scheme,
            ..CoderConfig::default()
        };
        group.bench_function(format!("{name}/encode"), |b| {
            b.iter(|| encode_ints(&config, &input).unwrap())
        });

        let bytes = encode_ints(&config, &input).unwrap();
        group.bench_function(format!("{name}/decode"), |b| {
            b.iter(|| decode_ints(&config, &bytes, input.len()).unwrap())
        });
    }
}

criterion_group!(benches, bench_huffman, bench_sequence);
criterion_main!(benches);
