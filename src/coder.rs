//! Integer coder and decoder interfaces.
//!
//! An [`IntCoder`] turns residuals into Huffman symbols plus raw bit fields.
//! The matching [`IntDecoder`] yields [`Run`]s: zero or more zeros followed by
//! one value. The size scheme always yields runs of length one; the
//! run-length scheme folds zero runs into a single symbol.

use serde::{Deserialize, Serialize};

use crate::bits::{BitSink, BitSource, ByteSink, ByteSource};
use crate::error::Result;
use crate::huffman::{Decoded, HuffmanTable};
use crate::runlength::{RunLengthIntCoder, RunLengthIntDecoder};
use crate::size::{SizeIntCoder, SizeIntDecoder};

/// `run` zeros followed by `value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Run {
    /// Zeros preceding `value`.
    pub run: u32,
    /// Final value of the run.
    pub value: i32,
}

impl Run {
    /// A single value with no preceding zeros.
    pub fn single(value: i32) -> Self {
        Self { run: 0, value }
    }

    /// Number of values this run expands to.
    pub fn len(&self) -> u64 {
        u64::from(self.run) + 1
    }

    /// Always false: a run contains at least its final value.
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Codes integers into a bit stream.
pub trait IntCoder {
    /// Code one value.
    fn code<S: ByteSink>(&mut self, sink: &mut BitSink<S>, v: i32) -> Result<()>;

    /// Emit anything still pending. Call once after the last value.
    fn flush<S: ByteSink>(&mut self, sink: &mut BitSink<S>) -> Result<()>;

    /// How often each Huffman symbol has been emitted.
    ///
    /// Symbols `flush` has yet to emit are not counted; read this after
    /// flushing when it feeds [`HuffmanTable::from_counts`](crate::huffman::HuffmanTable::from_counts).
    fn counts(&self) -> &[u32];
}

/// Decodes integers from a bit stream, resumably.
pub trait IntDecoder {
    /// Decode the next run, or report that more input is needed.
    ///
    /// After [`Decoded::NeedMoreBits`] the caller supplies more bytes to the
    /// source and calls again; decoding resumes where it stopped.
    fn decode<S: ByteSource>(&mut self, bits: &mut BitSource<S>) -> Result<Decoded<Run>>;
}

/// Integer coding scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scheme {
    /// Huffman-coded size, then the amplitude bits.
    #[default]
    Size,
    /// Joint (zero-run size, value size) symbol, then run and amplitude bits.
    RunLength,
}

/// An integer coder of either scheme.
#[derive(Debug, Clone)]
pub enum AnyIntCoder {
    /// Size scheme.
    Size(SizeIntCoder),
    /// Run-length scheme.
    RunLength(RunLengthIntCoder),
}

impl AnyIntCoder {
    /// Build the coder for `scheme` over `table`.
    pub fn new(scheme: Scheme, table: &HuffmanTable) -> Self {
        match scheme {
            Scheme::Size => AnyIntCoder::Size(SizeIntCoder::new(table)),
            Scheme::RunLength => AnyIntCoder::RunLength(RunLengthIntCoder::new(table)),
        }
    }
}

impl IntCoder for AnyIntCoder {
    fn code<S: ByteSink>(&mut self, sink: &mut BitSink<S>, v: i32) -> Result<()> {
        match self {
            AnyIntCoder::Size(c) => c.code(sink, v),
            AnyIntCoder::RunLength(c) => c.code(sink, v),
        }
    }

    fn flush<S: ByteSink>(&mut self, sink: &mut BitSink<S>) -> Result<()> {
        match self {
            AnyIntCoder::Size(c) => c.flush(sink),
            AnyIntCoder::RunLength(c) => c.flush(sink),
        }
    }

    fn counts(&self) -> &[u32] {
        match self {
            AnyIntCoder::Size(c) => c.counts(),
            AnyIntCoder::RunLength(c) => c.counts(),
        }
    }
}

/// An integer decoder of either scheme.
#[derive(Debug, Clone)]
pub enum AnyIntDecoder {
    /// Size scheme.
    Size(SizeIntDecoder),
    /// Run-length scheme.
    RunLength(RunLengthIntDecoder),
}

impl AnyIntDecoder {
    /// Build the decoder for `scheme` over `table`.
    pub fn new(scheme: Scheme, table: &HuffmanTable) -> Self {
        match scheme {
            Scheme::Size => AnyIntDecoder::Size(SizeIntDecoder::new(table)),
            Scheme::RunLength => AnyIntDecoder::RunLength(RunLengthIntDecoder::new(table)),
        }
    }
}

impl IntDecoder for AnyIntDecoder {
    fn decode<S: ByteSource>(&mut self, bits: &mut BitSource<S>) -> Result<Decoded<Run>> {
        match self {
            AnyIntDecoder::Size(d) => d.decode(bits),
            AnyIntDecoder::RunLength(d) => d.decode(bits),
        }
    }
}
