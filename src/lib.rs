//! # Quantized Sequence Coding (qsc)
//!
//! *Compact, streamable coding of quantized sensor and telemetry samples.*
//!
//! ## Intuition First
//!
//! Successive readings from a sensor rarely jump far. Predict the next
//! reading from the previous ones and what is left over (the residual) is
//! usually a small number. Small numbers need few bits, so code each residual
//! as two parts: how many bits it needs (its *size*), and then those bits.
//! Sizes repeat a lot, so they go through a Huffman code; the bits themselves
//! are sent raw.
//!
//! When a signal sits still, residuals are zero for long stretches. The
//! run-length scheme folds "this many zeros, then this value" into a single
//! Huffman symbol, the way JPEG codes runs of zero coefficients.
//!
//! ## The Pipeline
//!
//! ```text
//! sample ─► quantize ─► − prediction ─► IntCoder ─► HuffmanCoder ─► BitSink ─► bytes
//!                                          │                           ▲
//!                                          └──── raw amplitude bits ───┘
//! ```
//!
//! Decoding runs the same pipeline backwards. Every decoder is resumable: if
//! the byte source runs dry in the middle of a value, it returns
//! [`Decoded::NeedMoreBits`] without losing its place, and the caller tries
//! again once more bytes have arrived.
//!
//! ## Wire Format
//!
//! A stream is Huffman codewords and raw bit fields, most significant bit
//! first, padded to a byte boundary with 1-bits. Huffman codes never use the
//! all-ones codeword, so padding cannot decode as a symbol. The Huffman table
//! is not part of the stream; both ends must be configured with the same one
//! ([`HuffmanTable::to_bytes`] gives a compact form for exchanging it).
//!
//! ## Historical Context
//!
//! ```text
//! 1952  Huffman     Minimum-redundancy prefix codes
//! 1966  Golomb      Run-length codes for geometric sources
//! 1992  JPEG        Canonical tables, (run, size) symbols, magnitude categories
//! ```
//!
//! The size/amplitude split is JPEG's DC coefficient coding; the joint
//! (run, size) symbol is its AC coefficient coding.
//!
//! ## Failure Modes
//!
//! 1. **Table mismatch**: a decoder with a different table than its coder
//!    produces garbage or [`Error::InvalidCode`]; nothing in the stream detects
//!    it.
//! 2. **Quantization range**: samples whose quantized value falls outside
//!    `i32` are rejected with [`Error::Unquantizable`].
//!
//! ## Example
//!
//! ```
//! use qsc::{decode, encode, CoderConfig, Scheme};
//!
//! let config = CoderConfig { q_step: 0.1, scheme: Scheme::RunLength, ..Default::default() };
//! let samples = [20.0, 20.1, 20.1, 20.1, 20.3];
//! let bytes = encode(&config, &samples)?;
//! let back = decode(&config, &bytes, samples.len())?;
//! for (a, b) in samples.iter().zip(&back) {
//!     assert!((a - b).abs() < 1e-9);
//! }
//! # Ok::<(), qsc::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bits;
pub mod coder;
pub mod error;
pub mod huffman;
pub mod model;
pub mod predict;
pub mod runlength;
pub mod sequence;
pub mod size;

pub use bits::{BitSink, BitSource, ByteSink, ByteSource, ChunkedSource, SliceSource};
pub use coder::{AnyIntCoder, AnyIntDecoder, IntCoder, IntDecoder, Run, Scheme};
pub use error::{Error, ErrorKind, Result};
pub use huffman::{Decoded, HuffmanCoder, HuffmanDecoder, HuffmanTable};
pub use model::{magnitude, MagnitudeModeller, Model, Modeller};
pub use predict::{IntPredictor, PredictorConfig};
pub use runlength::{RunLengthIntCoder, RunLengthIntDecoder};
pub use sequence::{
    decode, decode_ints, encode, encode_ints, CoderConfig, FrameCoder, QStep, SequenceCoder,
    SequenceDecoder,
};
pub use size::{SizeIntCoder, SizeIntDecoder};
