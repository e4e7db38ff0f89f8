//! Error types for coding and decoding residual streams.
//!
//! Running out of input while decoding is not an error: decoders report it as
//! [`Decoded::NeedMoreBits`](crate::huffman::Decoded::NeedMoreBits) and can be
//! called again once more bytes have arrived.

use thiserror::Error;

/// Error variants for codec operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Predictor order outside `0..=2`.
    #[error("invalid predictor order {0}: must be 0, 1 or 2")]
    InvalidPredictorOrder(u8),

    /// Quantization step is zero, negative or not finite.
    #[error("invalid quantization step: {0}")]
    InvalidQuantStep(f64),

    /// Huffman table declares no codewords at all.
    #[error("huffman table has no symbols")]
    EmptyTable,

    /// More per-length codeword counts than the longest code length.
    #[error("huffman table gives {0} code lengths, at most 16 are allowed")]
    TooManyLengths(usize),

    /// Count of listed symbols differs from the codeword counts.
    #[error("huffman table declares {declared} codes but lists {listed} symbols")]
    SymbolCount {
        /// Sum of the per-length codeword counts.
        declared: usize,
        /// Number of entries in the symbol list.
        listed: usize,
    },

    /// More codewords than the symbol alphabet can hold.
    #[error("huffman table declares {0} codes, at most 256 are allowed")]
    TooManySymbols(usize),

    /// Codeword counts overflow their bit width (not a prefix code, or the
    /// all-ones codeword would be used).
    #[error("huffman table is not a valid prefix code: codes of length {len} overflow")]
    NotPrefixFree {
        /// Code length at which the canonical assignment overflowed.
        len: u32,
    },

    /// Symbol listed twice in a table.
    #[error("symbol {0} appears more than once in huffman table")]
    DuplicateSymbol(u8),

    /// Serialized table shorter than its header claims.
    #[error("serialized huffman table truncated at {len} bytes")]
    TruncatedTable {
        /// Length of the buffer that was provided.
        len: usize,
    },

    /// Symbol has no codeword in the table.
    #[error("symbol {0} is not in the huffman table")]
    InvalidSymbol(u32),

    /// Sample cannot be represented as a quantized 32-bit integer.
    #[error("value {value} cannot be quantized with step {step}")]
    Unquantizable {
        /// Raw sample.
        value: f64,
        /// Quantization step in use.
        step: f64,
    },

    /// Frame width differs from the number of channels.
    #[error("frame has {got} values for {expected} channels")]
    FrameWidth {
        /// Channels configured.
        expected: usize,
        /// Values supplied.
        got: usize,
    },

    /// Stream ended before the requested number of values was decoded.
    #[error("stream ended after {decoded} of {expected} values")]
    UnexpectedEnd {
        /// Values decoded before the stream ran out.
        decoded: usize,
        /// Values requested.
        expected: usize,
    },

    /// Bit pattern matches no codeword up to the maximum code length.
    #[error("invalid huffman code in stream")]
    InvalidCode,

    /// Decoded magnitude size is wider than a 32-bit integer.
    #[error("decoded magnitude size {0} exceeds 32 bits")]
    SizeOverflow(u32),

    /// An I/O error occurred while reading or writing a stream.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Broad classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad construction parameters; nothing was coded.
    Config,
    /// Input value cannot be represented by the configured coder.
    Encode,
    /// Coded stream is corrupt; decoding of the stream must stop.
    Corrupt,
    /// Transport failure outside the codec.
    Io,
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidPredictorOrder(_)
            | Error::InvalidQuantStep(_)
            | Error::EmptyTable
            | Error::TooManyLengths(_)
            | Error::SymbolCount { .. }
            | Error::TooManySymbols(_)
            | Error::NotPrefixFree { .. }
            | Error::DuplicateSymbol(_)
            | Error::TruncatedTable { .. } => ErrorKind::Config,
            Error::InvalidSymbol(_)
            | Error::Unquantizable { .. }
            | Error::FrameWidth { .. } => ErrorKind::Encode,
            Error::UnexpectedEnd { .. } | Error::InvalidCode | Error::SizeOverflow(_) => {
                ErrorKind::Corrupt
            }
            Error::Io(_) => ErrorKind::Io,
        }
    }
}

/// A specialized Result type for codec operations.
pub type Result<T> = std::result::Result<T, Error>;
