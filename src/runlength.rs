//! Run-length scheme: zero runs folded into a joint Huffman symbol.
//!
//! Each nonzero value, together with the zeros before it, is coded as
//!
//! ```text
//! symbol = (run_size << 4) | min(value_size, 15)
//! [run bits: run_size - 1]  [value bits: value_size, or 32 if escaped]
//! ```
//!
//! The top bit of the run is implied by its size. A value-size nibble of 15
//! escapes to a full 32-bit two's-complement field. Runs longer than a 15-bit
//! run field can describe are split: every 32768 zeros go out as a
//! `(32767, 0)` pair. Trailing zeros are emitted by [`IntCoder::flush`] as a
//! final `(zeros - 1, 0)` pair.

use tracing::trace;

use crate::bits::{BitSink, BitSource, ByteSink, ByteSource};
use crate::coder::{IntCoder, IntDecoder, Run};
use crate::error::Result;
use crate::huffman::{Decoded, HuffmanCoder, HuffmanDecoder, HuffmanTable, MAX_SYMBOLS};
use crate::model::{MagnitudeModeller, Model, Modeller};

/// Longest run a single symbol can carry.
pub const MAX_RUN: u32 = (1 << 15) - 1;

/// Value-size nibble that escapes to a 32-bit field.
const ESCAPE: u32 = 15;

/// Bits in the escaped value field.
const ESCAPE_BITS: u32 = 32;

/// Bit length of a non-negative run.
fn run_size(run: u32) -> u32 {
    u32::BITS - run.leading_zeros()
}

/// Codes zero runs and values as joint symbols.
#[derive(Debug, Clone)]
pub struct RunLengthIntCoder<M: Modeller = MagnitudeModeller> {
    huffman: HuffmanCoder,
    modeller: M,
    counts: Vec<u32>,
    /// Zeros seen since the last emission.
    pending: u16,
}

impl RunLengthIntCoder {
    /// Run-length coder over `table` with the magnitude model.
    pub fn new(table: &HuffmanTable) -> Self {
        Self::with_modeller(table, MagnitudeModeller)
    }
}

impl<M: Modeller> RunLengthIntCoder<M> {
    /// Run-length coder over `table` with a custom model.
    pub fn with_modeller(table: &HuffmanTable, modeller: M) -> Self {
        Self {
            huffman: HuffmanCoder::new(table),
            modeller,
            counts: vec![0; MAX_SYMBOLS],
            pending: 0,
        }
    }

    /// Zeros waiting for a value or a flush.
    pub fn pending_run(&self) -> u32 {
        u32::from(self.pending)
    }

    /// `run` must not exceed [`MAX_RUN`]; `code` splits longer runs first.
    fn emit<S: ByteSink>(&mut self, sink: &mut BitSink<S>, run: u32, v: i32) -> Result<()> {
        debug_assert!(run <= MAX_RUN, "run {run} exceeds the run field");
        let run_size = run_size(run);
        let Model { size, bits } = self.modeller.model(v);
        let nibble = size.min(ESCAPE);
        let symbol = (run_size << 4) | nibble;

        self.huffman.code(sink, symbol)?;
        self.counts[symbol as usize] += 1;
        if run_size > 1 {
            sink.receive(run, run_size - 1);
        }
        match nibble {
            0 => {}
            ESCAPE => sink.receive(v as u32, ESCAPE_BITS),
            n => sink.receive(bits as u32, n),
        }
        Ok(())
    }
}

impl<M: Modeller> IntCoder for RunLengthIntCoder<M> {
    fn code<S: ByteSink>(&mut self, sink: &mut BitSink<S>, v: i32) -> Result<()> {
        if v == 0 {
            if u32::from(self.pending) == MAX_RUN {
                self.pending = 0;
                return self.emit(sink, MAX_RUN, 0);
            }
            self.pending += 1;
            return Ok(());
        }
        let run = u32::from(std::mem::take(&mut self.pending));
        self.emit(sink, run, v)
    }

    fn flush<S: ByteSink>(&mut self, sink: &mut BitSink<S>) -> Result<()> {
        match std::mem::take(&mut self.pending) {
            0 => Ok(()),
            n => self.emit(sink, u32::from(n) - 1, 0),
        }
    }

    fn counts(&self) -> &[u32] {
        &self.counts
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    AwaitingSymbol,
    /// Joint symbol decoded, its bit fields not yet available.
    AwaitingFields { symbol: u8 },
}

/// Decoder for [`RunLengthIntCoder`] streams.
#[derive(Debug, Clone)]
pub struct RunLengthIntDecoder<M: Modeller = MagnitudeModeller> {
    huffman: HuffmanDecoder,
    modeller: M,
    state: State,
}

impl RunLengthIntDecoder {
    /// Run-length decoder over `table` with the magnitude model.
    pub fn new(table: &HuffmanTable) -> Self {
        Self::with_modeller(table, MagnitudeModeller)
    }
}

impl<M: Modeller> RunLengthIntDecoder<M> {
    /// Run-length decoder over `table` with a custom model.
    pub fn with_modeller(table: &HuffmanTable, modeller: M) -> Self {
        Self {
            huffman: HuffmanDecoder::new(table),
            modeller,
            state: State::AwaitingSymbol,
        }
    }
}

impl<M: Modeller> IntDecoder for RunLengthIntDecoder<M> {
    fn decode<S: ByteSource>(&mut self, bits: &mut BitSource<S>) -> Result<Decoded<Run>> {
        let symbol = match self.state {
            State::AwaitingFields { symbol } => symbol,
            State::AwaitingSymbol => match self.huffman.decode(bits)? {
                Decoded::Ready(symbol) => symbol,
                Decoded::NeedMoreBits => return Ok(Decoded::NeedMoreBits),
            },
        };

        let run_size = u32::from(symbol >> 4);
        let nibble = u32::from(symbol & 0x0f);
        let run_bits = run_size.saturating_sub(1);
        let value_bits = if nibble == ESCAPE { ESCAPE_BITS } else { nibble };
        if !bits.ensure(run_bits + value_bits) {
            trace!(symbol, available = bits.available_bits(), "run-length decoder awaiting fields");
            self.state = State::AwaitingFields { symbol };
            return Ok(Decoded::NeedMoreBits);
        }
        self.state = State::AwaitingSymbol;

        let run = match run_size {
            0 => 0,
            n => (1 << (n - 1)) | bits.pop(run_bits),
        };
        let value = match nibble {
            ESCAPE => bits.pop(ESCAPE_BITS) as i32,
            n => self.modeller.reconstruct(n, bits.pop(n)),
        };
        Ok(Decoded::Ready(Run { run, value }))
    }
}
