use std::collections::VecDeque;

use proptest::prelude::*;
use qsc::{
    decode_ints, encode_ints, BitSink, BitSource, ChunkedSource, CoderConfig, Decoded,
    HuffmanCoder, HuffmanDecoder, HuffmanTable, PredictorConfig, Scheme, SequenceDecoder,
};

fn scheme() -> impl Strategy<Value = Scheme> {
    prop_oneof![Just(Scheme::Size), Just(Scheme::RunLength)]
}

fn predictor() -> impl Strategy<Value = PredictorConfig> {
    (0u8..3, any::<i32>(), any::<i32>())
        .prop_map(|(order, a, b)| PredictorConfig::from_order(order, a, b).unwrap())
}

/// Mostly small, sometimes huge, often repeated.
fn samples() -> impl Strategy<Value = Vec<i32>> {
    prop::collection::vec(
        prop_oneof![
            4 => -50i32..50,
            2 => Just(0i32),
            1 => any::<i32>(),
            1 => prop_oneof![Just(i32::MIN), Just(i32::MAX)],
        ],
        0..300,
    )
}

proptest! {
    #[test]
    fn test_sequence_roundtrip(values in samples(), scheme in scheme(), predictor in predictor()) {
        let config = CoderConfig { predictor, scheme, ..CoderConfig::default() };
        let bytes = encode_ints(&config, &values).unwrap();
        let decoded = decode_ints(&config, &bytes, values.len()).unwrap();
        prop_assert_eq!(decoded, values);
    }

    #[test]
    fn test_tuned_table_roundtrip(
        mut values in samples(),
        trailing_zeros in 0usize..40,
        scheme in scheme(),
    ) {
        values.extend(std::iter::repeat(0).take(trailing_zeros));
        prop_assume!(!values.is_empty());
        let base = CoderConfig { scheme, ..CoderConfig::default() };
        let mut coder = qsc::SequenceCoder::new(&base, Vec::new()).unwrap();
        for &v in &values {
            coder.push_int(v).unwrap();
        }
        let (_, counts) = coder.finish_with_counts().unwrap();
        let config = CoderConfig {
            table: HuffmanTable::from_counts(&counts).unwrap(),
            ..base
        };
        let bytes = encode_ints(&config, &values).unwrap();
        prop_assert_eq!(decode_ints(&config, &bytes, values.len()).unwrap(), values);
    }

    #[test]
    fn test_byte_at_a_time_matches_whole_buffer(values in samples(), scheme in scheme()) {
        let config = CoderConfig { scheme, ..CoderConfig::default() };
        let bytes = encode_ints(&config, &values).unwrap();

        let mut decoder = SequenceDecoder::new(&config, VecDeque::new()).unwrap();
        let mut streamed = Vec::new();
        for &b in &bytes {
            decoder.get_mut().push_back(b);
            while streamed.len() < values.len() {
                match decoder.next_int().unwrap() {
                    Decoded::Ready(x) => streamed.push(x),
                    Decoded::NeedMoreBits => break,
                }
            }
        }
        prop_assert_eq!(streamed, values);
    }

    #[test]
    fn test_huffman_chunked_decode(
        symbols in prop::collection::vec(any::<u8>(), 0..500),
        chunk in 1usize..8,
    ) {
        let table = HuffmanTable::default();
        let coder = HuffmanCoder::new(&table);
        let mut sink = BitSink::new(Vec::new());
        for &s in &symbols {
            coder.code(&mut sink, u32::from(s)).unwrap();
        }
        sink.close();
        let bytes = sink.into_inner();

        let decoder = HuffmanDecoder::new(&table);
        let mut bits = BitSource::new(ChunkedSource::new(&bytes, chunk));
        let mut out = Vec::new();
        while let Decoded::Ready(s) = decoder.decode(&mut bits).unwrap() {
            out.push(s);
        }
        prop_assert_eq!(out, symbols);
    }
}

#[test]
fn test_bit_order_contract() {
    let mut sink = BitSink::new(Vec::new());
    sink.receive(0xFF, 8);
    sink.flush();
    assert_eq!(sink.get_ref(), &vec![0xFF]);

    let mut sink = BitSink::new(Vec::new());
    for byte in [0x00, 0x01, 0x02] {
        sink.receive(byte, 8);
    }
    for bit in [0, 1, 0, 1, 1, 0, 1, 0] {
        sink.receive(bit, 1);
    }
    sink.flush();
    assert_eq!(sink.get_ref(), &vec![0x00, 0x01, 0x02, 0x5A]);
}

#[test]
fn test_canonical_table_bytes() {
    let table = HuffmanTable::new(&[1, 0, 3], &[0, 1, 2, 3]).unwrap();
    let coder = HuffmanCoder::new(&table);
    let mut sink = BitSink::new(Vec::new());
    for s in 0..4 {
        coder.code(&mut sink, s).unwrap();
    }
    sink.close();
    assert_eq!(sink.into_inner(), vec![0x4B, 0xBF]);
}
