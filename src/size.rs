//! Size scheme: each value is a Huffman-coded size followed by its amplitude.

use tracing::{trace, warn};

use crate::bits::{BitSink, BitSource, ByteSink, ByteSource};
use crate::coder::{IntCoder, IntDecoder, Run};
use crate::error::{Error, Result};
use crate::huffman::{Decoded, HuffmanCoder, HuffmanDecoder, HuffmanTable, MAX_SYMBOLS};
use crate::model::{MagnitudeModeller, Model, Modeller, MIN_VALUE_SIZE};

/// Amplitudes wider than this are read as a high chunk, then 16 low bits.
const AMPLITUDE_CHUNK: u32 = 16;

/// Codes each value as `size` (a Huffman symbol) plus `size` raw bits.
#[derive(Debug, Clone)]
pub struct SizeIntCoder<M: Modeller = MagnitudeModeller> {
    huffman: HuffmanCoder,
    modeller: M,
    counts: Vec<u32>,
}

impl SizeIntCoder {
    /// Size coder over `table` with the magnitude model.
    pub fn new(table: &HuffmanTable) -> Self {
        Self::with_modeller(table, MagnitudeModeller)
    }
}

impl<M: Modeller> SizeIntCoder<M> {
    /// Size coder over `table` with a custom model.
    pub fn with_modeller(table: &HuffmanTable, modeller: M) -> Self {
        Self {
            huffman: HuffmanCoder::new(table),
            modeller,
            counts: vec![0; MAX_SYMBOLS],
        }
    }
}

impl<M: Modeller> IntCoder for SizeIntCoder<M> {
    fn code<S: ByteSink>(&mut self, sink: &mut BitSink<S>, v: i32) -> Result<()> {
        let Model { size, bits } = self.modeller.model(v);
        self.huffman.code(sink, size)?;
        self.counts[size as usize] += 1;
        // i32::MIN is implied by its size alone.
        if size > 0 && size < MIN_VALUE_SIZE {
            sink.receive(bits as u32, size);
        }
        Ok(())
    }

    fn flush<S: ByteSink>(&mut self, _sink: &mut BitSink<S>) -> Result<()> {
        Ok(())
    }

    fn counts(&self) -> &[u32] {
        &self.counts
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    AwaitingSymbol,
    /// Size decoded, amplitude bits not yet available.
    AwaitingAmplitude { size: u32 },
}

/// Decoder for [`SizeIntCoder`] streams.
#[derive(Debug, Clone)]
pub struct SizeIntDecoder<M: Modeller = MagnitudeModeller> {
    huffman: HuffmanDecoder,
    modeller: M,
    state: State,
}

impl SizeIntDecoder {
    /// Size decoder over `table` with the magnitude model.
    pub fn new(table: &HuffmanTable) -> Self {
        Self::with_modeller(table, MagnitudeModeller)
    }
}

impl<M: Modeller> SizeIntDecoder<M> {
    /// Size decoder over `table` with a custom model.
    pub fn with_modeller(table: &HuffmanTable, modeller: M) -> Self {
        Self {
            huffman: HuffmanDecoder::new(table),
            modeller,
            state: State::AwaitingSymbol,
        }
    }
}

impl<M: Modeller> IntDecoder for SizeIntDecoder<M> {
    fn decode<S: ByteSource>(&mut self, bits: &mut BitSource<S>) -> Result<Decoded<Run>> {
        let size = match self.state {
            State::AwaitingAmplitude { size } => size,
            State::AwaitingSymbol => match self.huffman.decode(bits)? {
                Decoded::Ready(symbol) => u32::from(symbol),
                Decoded::NeedMoreBits => return Ok(Decoded::NeedMoreBits),
            },
        };

        if size == MIN_VALUE_SIZE {
            self.state = State::AwaitingSymbol;
            return Ok(Decoded::Ready(Run::single(i32::MIN)));
        }
        if size > MIN_VALUE_SIZE {
            warn!(size, "decoded magnitude size too wide");
            self.state = State::AwaitingSymbol;
            return Err(Error::SizeOverflow(size));
        }
        if !bits.ensure(size) {
            trace!(size, available = bits.available_bits(), "size decoder awaiting amplitude");
            self.state = State::AwaitingAmplitude { size };
            return Ok(Decoded::NeedMoreBits);
        }

        let field = if size > AMPLITUDE_CHUNK {
            let high = bits.pop(size - AMPLITUDE_CHUNK);
            (high << AMPLITUDE_CHUNK) | bits.pop(AMPLITUDE_CHUNK)
        } else {
            bits.pop(size)
        };
        self.state = State::AwaitingSymbol;
        Ok(Decoded::Ready(Run::single(self.modeller.reconstruct(size, field))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::SliceSource;
    use crate::error::ErrorKind;
    use std::collections::VecDeque;

    fn encode(values: &[i32]) -> Vec<u8> {
        let mut coder = SizeIntCoder::new(&HuffmanTable::default());
        let mut sink = BitSink::new(Vec::new());
        for &v in values {
            coder.code(&mut sink, v).unwrap();
        }
        coder.flush(&mut sink).unwrap();
        sink.close();
        sink.into_inner()
    }

    fn decode_all<S: ByteSource>(bits: &mut BitSource<S>, decoder: &mut SizeIntDecoder) -> Vec<i32> {
        let mut out = Vec::new();
        while let Decoded::Ready(run) = decoder.decode(bits).unwrap() {
            assert_eq!(run.run, 0);
            out.push(run.value);
        }
        out
    }

    #[test]
    fn test_roundtrip_widths() {
        let values = [
            0, 1, -1, 2, -2, 255, -256, 0xABCD, 65535, 65536, -65537,
            (1 << 24) + 3, -(1 << 25), i32::MAX, i32::MIN + 1, i32::MIN,
        ];
        let bytes = encode(&values);
        let mut decoder = SizeIntDecoder::new(&HuffmanTable::default());
        let mut bits = BitSource::new(SliceSource::new(&bytes));
        assert_eq!(decode_all(&mut bits, &mut decoder), values);
    }

    #[test]
    fn test_zero_and_min_write_no_amplitude() {
        let table = HuffmanTable::default();
        let lengths = HuffmanCoder::new(&table);
        let mut coder = SizeIntCoder::new(&table);
        let mut sink = BitSink::new(Vec::new());
        coder.code(&mut sink, 0).unwrap();
        let zero_len = u64::from(lengths.code_len(0).unwrap());
        assert_eq!(sink.bits_written(), zero_len);
        coder.code(&mut sink, i32::MIN).unwrap();
        let min_len = u64::from(lengths.code_len(32).unwrap());
        assert_eq!(sink.bits_written(), zero_len + min_len);
        assert_eq!(coder.counts()[0], 1);
        assert_eq!(coder.counts()[32], 1);
    }

    #[test]
    fn test_resumes_after_symbol_without_redecoding() {
        let values = [-70000, 3, 1 << 20];
        let bytes = encode(&values);
        let mut decoder = SizeIntDecoder::new(&HuffmanTable::default());
        let mut bits = BitSource::new(VecDeque::new());
        let mut out = Vec::new();
        for &b in &bytes {
            bits.get_mut().push_back(b);
            while let Decoded::Ready(run) = decoder.decode(&mut bits).unwrap() {
                out.push(run.value);
            }
        }
        assert_eq!(out, values);
    }

    #[test]
    fn test_oversized_symbol_is_corruption() {
        // A table whose only symbol is 40: a size no 32-bit value has.
        let table = HuffmanTable::new(&[1], &[40]).unwrap();
        let mut decoder = SizeIntDecoder::new(&table);
        let data = [0x00];
        let mut bits = BitSource::new(SliceSource::new(&data));
        let err = decoder.decode(&mut bits).unwrap_err();
        assert!(matches!(err, Error::SizeOverflow(40)));
        assert_eq!(err.kind(), ErrorKind::Corrupt);
    }

    #[test]
    fn test_size_missing_from_table() {
        let table = HuffmanTable::new(&[1, 1], &[0, 1]).unwrap();
        let mut coder = SizeIntCoder::new(&table);
        let mut sink = BitSink::new(Vec::new());
        coder.code(&mut sink, 1).unwrap();
        assert!(matches!(coder.code(&mut sink, 2), Err(Error::InvalidSymbol(2))));
    }
}
