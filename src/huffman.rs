//! Canonical Huffman tables, encoding and lookahead decoding.
//!
//! A table is stored the way JPEG stores it: the number of codewords of each
//! length (1..=16) and the symbols listed in codeword-value order. Codewords
//! are then implied: each length continues one past the last codeword of the
//! previous length, shifted left by one bit. The all-ones codeword of every
//! length is never assigned, so a stream padded with 1-bits never decodes a
//! spurious symbol.
//!
//! # Historical Context
//!
//! David Huffman (1952) developed the tree construction as a term paper at MIT.
//! The canonical representation and the length-limiting adjustment used by
//! [`HuffmanTable::from_counts`] come from the JPEG standard (ITU T.81,
//! Annexes C and K).

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::bits::{BitSink, BitSource, ByteSink, ByteSource};
use crate::error::{Error, Result};

/// Longest codeword length.
pub const MAX_CODE_LEN: usize = 16;

/// Size of the symbol alphabet.
pub const MAX_SYMBOLS: usize = 256;

/// Bits resolved by a single decoder table lookup.
pub const LOOKAHEAD: u32 = 8;

/// Codeword counts of the default table, indexed by length (index 0 unused).
const DEFAULT_NUM_CODES: [u8; MAX_CODE_LEN + 1] =
    [0, 0, 2, 1, 3, 3, 2, 4, 3, 4, 2, 10, 0, 0, 32, 1, 0xbd];

/// JPEG luminance AC symbols, followed by the symbols JPEG leaves unused.
#[rustfmt::skip]
const DEFAULT_SYMBOLS: [u8; MAX_SYMBOLS] = [
    0x01, 0x02, 0x03, 0x00, 0x04, 0x11, 0x05, 0x12,
    0x21, 0x31, 0x41, 0x06, 0x13, 0x51, 0x61, 0x07,
    0x22, 0x71, 0x14, 0x32, 0x81, 0x91, 0xa1, 0x08,
    0x23, 0x42, 0xb1, 0xc1, 0x15, 0x52, 0xd1, 0xf0,
    0x24, 0x33, 0x62, 0x72, 0x82, 0x09, 0x0a, 0x16,
    0x17, 0x18, 0x19, 0x1a, 0x25, 0x26, 0x27, 0x28,
    0x29, 0x2a, 0x34, 0x35, 0x36, 0x37, 0x38, 0x39,
    0x3a, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48, 0x49,
    0x4a, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58, 0x59,
    0x5a, 0x63, 0x64, 0x65, 0x66, 0x67, 0x68, 0x69,
    0x6a, 0x73, 0x74, 0x75, 0x76, 0x77, 0x78, 0x79,
    0x7a, 0x83, 0x84, 0x85, 0x86, 0x87, 0x88, 0x89,
    0x8a, 0x92, 0x93, 0x94, 0x95, 0x96, 0x97, 0x98,
    0x99, 0x9a, 0xa2, 0xa3, 0xa4, 0xa5, 0xa6, 0xa7,
    0xa8, 0xa9, 0xaa, 0xb2, 0xb3, 0xb4, 0xb5, 0xb6,
    0xb7, 0xb8, 0xb9, 0xba, 0xc2, 0xc3, 0xc4, 0xc5,
    0xc6, 0xc7, 0xc8, 0xc9, 0xca, 0xd2, 0xd3, 0xd4,
    0xd5, 0xd6, 0xd7, 0xd8, 0xd9, 0xda, 0xe1, 0xe2,
    0xe3, 0xe4, 0xe5, 0xe6, 0xe7, 0xe8, 0xe9, 0xea,
    0xf1, 0xf2, 0xf3, 0xf4, 0xf5, 0xf6, 0xf7, 0xf8,
    0xf9, 0xfa,
    0x10, 0x20, 0x30, 0x40, 0x50, 0x60, 0x70, 0x80, 0x90, 0xa0, 0xb0, 0xc0, 0xd0, 0xe0,
    0x0b, 0x1b, 0x2b, 0x3b, 0x4b, 0x5b, 0x6b, 0x7b, 0x8b, 0x9b, 0xab, 0xbb, 0xcb, 0xdb, 0xeb, 0xfb,
    0x0c, 0x1c, 0x2c, 0x3c, 0x4c, 0x5c, 0x6c, 0x7c, 0x8c, 0x9c, 0xac, 0xbc, 0xcc, 0xdc, 0xec, 0xfc,
    0x0d, 0x1d, 0x2d, 0x3d, 0x4d, 0x5d, 0x6d, 0x7d, 0x8d, 0x9d, 0xad, 0xbd, 0xcd, 0xdd, 0xed, 0xfd,
    0x0e, 0x1e, 0x2e, 0x3e, 0x4e, 0x5e, 0x6e, 0x7e, 0x8e, 0x9e, 0xae, 0xbe, 0xce, 0xde, 0xee, 0xfe,
    0x0f, 0x1f, 0x2f, 0x3f, 0x4f, 0x5f, 0x6f, 0x7f, 0x8f, 0x9f, 0xaf, 0xbf, 0xcf, 0xdf, 0xef, 0xff,
];

/// Kraft sum of the code lengths, scaled by `2^max_len`.
///
/// `num_codes[i]` is the number of codewords of length `i + 1`; lengths above
/// `max_len` are ignored. A prefix code exists iff the result is at most
/// `1 << max_len`. Tables here also reserve the all-ones codeword, so a valid
/// table stays strictly below that bound.
pub fn kraft_sum(num_codes: &[u8], max_len: u32) -> u32 {
    num_codes
        .iter()
        .zip(1..=max_len)
        .map(|(&n, len)| u32::from(n) << (max_len - len))
        .sum()
}

/// Outcome of a decode attempt on a possibly incomplete stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded<T> {
    /// A complete item was decoded and its bits consumed.
    Ready(T),
    /// Not enough bits are buffered yet; nothing was consumed.
    NeedMoreBits,
}

impl<T> Decoded<T> {
    /// The decoded item, if any.
    pub fn ready(self) -> Option<T> {
        match self {
            Decoded::Ready(v) => Some(v),
            Decoded::NeedMoreBits => None,
        }
    }

    /// Map the decoded item.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Decoded<U> {
        match self {
            Decoded::Ready(v) => Decoded::Ready(f(v)),
            Decoded::NeedMoreBits => Decoded::NeedMoreBits,
        }
    }
}

/// A validated canonical Huffman table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTable", into = "RawTable")]
pub struct HuffmanTable {
    /// Codeword count per length; index 0 is unused.
    num_codes: [u8; MAX_CODE_LEN + 1],
    /// Symbols in codeword-value order.
    symbols: Vec<u8>,
}

/// Unvalidated wire form of a table.
#[derive(Serialize, Deserialize)]
struct RawTable {
    num_codes: Vec<u8>,
    symbols: Vec<u8>,
}

impl TryFrom<RawTable> for HuffmanTable {
    type Error = Error;

    fn try_from(raw: RawTable) -> Result<Self> {
        HuffmanTable::new(&raw.num_codes, &raw.symbols)
    }
}

impl From<HuffmanTable> for RawTable {
    fn from(table: HuffmanTable) -> Self {
        RawTable {
            num_codes: table.num_codes[1..].to_vec(),
            symbols: table.symbols,
        }
    }
}

impl HuffmanTable {
    /// Build a table from codeword counts and the symbol order.
    ///
    /// `num_codes[i]` is the number of codewords of length `i + 1` (at most 16
    /// entries); `symbols` lists every symbol in codeword-value order.
    ///
    /// # Errors
    /// Returns a configuration error if the table is empty, the symbol list
    /// does not match the counts, a symbol repeats, or the counts do not form
    /// a prefix code that leaves the all-ones codeword unused.
    pub fn new(num_codes: &[u8], symbols: &[u8]) -> Result<Self> {
        if num_codes.len() > MAX_CODE_LEN {
            return Err(Error::TooManyLengths(num_codes.len()));
        }
        let mut counts = [0u8; MAX_CODE_LEN + 1];
        counts[1..=num_codes.len()].copy_from_slice(num_codes);

        let codes = canonical_codes(&counts)?;
        if codes.len() != symbols.len() {
            return Err(Error::SymbolCount {
                declared: codes.len(),
                listed: symbols.len(),
            });
        }
        let mut seen = [false; MAX_SYMBOLS];
        for &s in symbols {
            if std::mem::replace(&mut seen[s as usize], true) {
                return Err(Error::DuplicateSymbol(s));
            }
        }

        Ok(Self {
            num_codes: counts,
            symbols: symbols.to_vec(),
        })
    }

    /// Build a length-limited optimal table for a symbol histogram.
    ///
    /// `counts[s]` is the frequency of symbol `s`; symbols with a zero count
    /// get no codeword. A reserved zero-weight symbol takes the all-ones
    /// codeword during construction and is then dropped.
    ///
    /// # Errors
    /// Returns [`Error::EmptyTable`] if every count is zero and
    /// [`Error::TooManySymbols`] if the histogram is wider than the alphabet.
    pub fn from_counts(counts: &[u32]) -> Result<Self> {
        if counts.len() > MAX_SYMBOLS {
            return Err(Error::TooManySymbols(counts.len()));
        }

        let mut pq = BinaryHeap::new();
        for (s, &f) in counts.iter().enumerate() {
            if f > 0 {
                pq.push(Node::Leaf {
                    symbol: s as u16,
                    freq: u64::from(f),
                });
            }
        }
        if pq.is_empty() {
            return Err(Error::EmptyTable);
        }
        pq.push(Node::Leaf {
            symbol: RESERVED_SYMBOL,
            freq: 0,
        });

        while pq.len() > 1 {
            let (Some(left), Some(right)) = (pq.pop(), pq.pop()) else {
                break;
            };
            let freq = left.freq() + right.freq();
            pq.push(Node::Internal {
                left: Box::new(left),
                right: Box::new(right),
                freq,
            });
        }

        let mut depths = Vec::new();
        if let Some(root) = pq.pop() {
            Self::assign_depths(&root, 0, &mut depths);
        }
        // Shortest codes first; the reserved symbol sorts last at the longest length.
        depths.sort_unstable();

        let max_depth = depths.last().map_or(0, |&(d, _)| d);
        let mut bits = vec![0u32; max_depth.max(MAX_CODE_LEN) + 1];
        for &(depth, _) in &depths {
            bits[depth] += 1;
        }
        limit_code_lengths(&mut bits);

        let mut num_codes = [0u8; MAX_CODE_LEN];
        for (len, n) in num_codes.iter_mut().zip(&bits[1..=MAX_CODE_LEN]) {
            *len = *n as u8;
        }
        let symbols: Vec<u8> = depths
            .iter()
            .filter(|&&(_, s)| s != RESERVED_SYMBOL)
            .map(|&(_, s)| s as u8)
            .collect();

        let table = Self::new(&num_codes, &symbols)?;
        debug!(
            symbols = symbols.len(),
            max_code_len = table.max_code_len(),
            "built huffman table from histogram"
        );
        Ok(table)
    }

    fn assign_depths(node: &Node, depth: usize, depths: &mut Vec<(usize, u16)>) {
        match node {
            Node::Leaf { symbol, .. } => depths.push((depth.max(1), *symbol)),
            Node::Internal { left, right, .. } => {
                Self::assign_depths(left, depth + 1, depths);
                Self::assign_depths(right, depth + 1, depths);
            }
        }
    }

    /// Parse the serialized form: 16 count bytes, then the symbols.
    ///
    /// # Errors
    /// Returns [`Error::TruncatedTable`] if `bytes` is too short, or any error
    /// from [`HuffmanTable::new`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < MAX_CODE_LEN {
            return Err(Error::TruncatedTable { len: bytes.len() });
        }
        let (num_codes, rest) = bytes.split_at(MAX_CODE_LEN);
        let total: usize = num_codes.iter().map(|&n| n as usize).sum();
        if rest.len() < total {
            return Err(Error::TruncatedTable { len: bytes.len() });
        }
        Self::new(num_codes, &rest[..total])
    }

    /// Serialize as 16 count bytes followed by the symbols in code order.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(MAX_CODE_LEN + self.symbols.len());
        out.extend_from_slice(&self.num_codes[1..]);
        out.extend_from_slice(&self.symbols);
        out
    }

    /// Number of codewords of length `len`.
    pub fn num_codes(&self, len: usize) -> u8 {
        self.num_codes.get(len).copied().unwrap_or(0)
    }

    /// Symbols in codeword-value order.
    pub fn symbols(&self) -> &[u8] {
        &self.symbols
    }

    /// Longest codeword length in use.
    pub fn max_code_len(&self) -> u32 {
        (1..=MAX_CODE_LEN)
            .rev()
            .find(|&len| self.num_codes[len] > 0)
            .map_or(0, |len| len as u32)
    }

    /// Kraft sum of this table scaled by `2^max_len`.
    pub fn kraft_sum(&self, max_len: u32) -> u32 {
        kraft_sum(&self.num_codes[1..], max_len)
    }

    /// `(code, length)` for each symbol, in codeword-value order.
    pub fn codes(&self) -> Vec<(u32, u8)> {
        // Validated on construction.
        canonical_codes(&self.num_codes).unwrap_or_default()
    }
}

impl Default for HuffmanTable {
    /// The JPEG-derived default table, covering all 256 symbols.
    fn default() -> Self {
        Self {
            num_codes: DEFAULT_NUM_CODES,
            symbols: DEFAULT_SYMBOLS.to_vec(),
        }
    }
}

/// Assign canonical codewords in codeword-value order (JPEG Figures C.1, C.2).
fn canonical_codes(num_codes: &[u8; MAX_CODE_LEN + 1]) -> Result<Vec<(u32, u8)>> {
    let total: usize = num_codes[1..].iter().map(|&n| n as usize).sum();
    if total == 0 {
        return Err(Error::EmptyTable);
    }
    if total > MAX_SYMBOLS {
        return Err(Error::TooManySymbols(total));
    }

    let mut out = Vec::with_capacity(total);
    let mut code = 0u32;
    for len in 1..=MAX_CODE_LEN {
        for _ in 0..num_codes[len] {
            out.push((code, len as u8));
            code += 1;
        }
        // One past the last codeword must still fit: no overflow, no all-ones.
        if code >= 1 << len {
            return Err(Error::NotPrefixFree { len: len as u32 });
        }
        code <<= 1;
    }
    Ok(out)
}

/// Limit code lengths to [`MAX_CODE_LEN`] (JPEG Figure K.3), then drop the
/// reserved codeword from the longest length.
fn limit_code_lengths(bits: &mut [u32]) {
    let mut i = bits.len() - 1;
    while i > MAX_CODE_LEN {
        while bits[i] > 0 {
            let mut j = i - 2;
            while bits[j] == 0 {
                j -= 1;
            }
            bits[i] -= 2;
            bits[i - 1] += 1;
            bits[j + 1] += 2;
            bits[j] -= 1;
        }
        i -= 1;
    }
    while i > 0 && bits[i] == 0 {
        i -= 1;
    }
    if i > 0 {
        bits[i] -= 1;
    }
}

const RESERVED_SYMBOL: u16 = MAX_SYMBOLS as u16;

/// Huffman tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Leaf {
        symbol: u16,
        freq: u64,
    },
    Internal {
        left: Box<Node>,
        right: Box<Node>,
        freq: u64,
    },
}

impl Node {
    fn freq(&self) -> u64 {
        match self {
            Node::Leaf { freq, .. } => *freq,
            Node::Internal { freq, .. } => *freq,
        }
    }
}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        other.freq().cmp(&self.freq()) // Min-priority queue
    }
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Huffman encoder: direct symbol → (code, length) lookup.
#[derive(Debug, Clone)]
pub struct HuffmanCoder {
    codes: [u32; MAX_SYMBOLS],
    /// Zero marks a symbol with no codeword.
    lengths: [u8; MAX_SYMBOLS],
}

impl HuffmanCoder {
    /// Build the encoding lookup for `table`.
    pub fn new(table: &HuffmanTable) -> Self {
        let mut codes = [0u32; MAX_SYMBOLS];
        let mut lengths = [0u8; MAX_SYMBOLS];
        for (&s, (code, len)) in table.symbols.iter().zip(table.codes()) {
            codes[s as usize] = code;
            lengths[s as usize] = len;
        }
        Self { codes, lengths }
    }

    /// Codeword length of `symbol`, or `None` if it has no codeword.
    pub fn code_len(&self, symbol: u32) -> Option<u32> {
        match self.lengths.get(symbol as usize) {
            Some(&len) if len > 0 => Some(u32::from(len)),
            _ => None,
        }
    }

    /// Emit the codeword for `symbol`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidSymbol`] if `symbol` has no codeword.
    #[inline]
    pub fn code<S: ByteSink>(&self, sink: &mut BitSink<S>, symbol: u32) -> Result<()> {
        let len = self.code_len(symbol).ok_or(Error::InvalidSymbol(symbol))?;
        sink.receive(self.codes[symbol as usize], len);
        Ok(())
    }

    /// Emit a 7-bit all-ones end marker.
    pub fn flush<S: ByteSink>(&self, sink: &mut BitSink<S>) {
        sink.receive(0x7F, 7);
    }
}

/// Huffman decoder: 8-bit lookahead table plus canonical long-code search.
#[derive(Debug, Clone)]
pub struct HuffmanDecoder {
    symbols: Vec<u8>,
    /// `(length, symbol)` per 8-bit window; length 0 means "longer code".
    lookup: [(u8, u8); 1 << LOOKAHEAD],
    /// Largest codeword of each length, -1 if none.
    max_code: [i32; MAX_CODE_LEN + 1],
    /// Index into `symbols` of the first code of each length, minus that code.
    val_offset: [i32; MAX_CODE_LEN + 1],
}

impl HuffmanDecoder {
    /// Build the decoding tables for `table` (JPEG Figure F.15).
    pub fn new(table: &HuffmanTable) -> Self {
        let codes = table.codes();
        let mut max_code = [-1i32; MAX_CODE_LEN + 1];
        let mut val_offset = [0i32; MAX_CODE_LEN + 1];
        let mut p = 0usize;
        for len in 1..=MAX_CODE_LEN {
            let n = table.num_codes[len] as usize;
            if n > 0 {
                val_offset[len] = p as i32 - codes[p].0 as i32;
                p += n;
                max_code[len] = codes[p - 1].0 as i32;
            }
        }

        let mut lookup = [(0u8, 0u8); 1 << LOOKAHEAD];
        for (&symbol, &(code, len)) in table.symbols.iter().zip(&codes) {
            if u32::from(len) > LOOKAHEAD {
                break;
            }
            // Every window that starts with this codeword.
            let shift = LOOKAHEAD - u32::from(len);
            let first = (code << shift) as usize;
            for entry in &mut lookup[first..first + (1 << shift)] {
                *entry = (len, symbol);
            }
        }

        Self {
            symbols: table.symbols.clone(),
            lookup,
            max_code,
            val_offset,
        }
    }

    /// Decode one symbol.
    ///
    /// Returns [`Decoded::NeedMoreBits`] without consuming anything if the
    /// buffered bits end inside a codeword.
    ///
    /// # Errors
    /// Returns [`Error::InvalidCode`] if no codeword of up to 16 bits matches.
    #[inline]
    pub fn decode<S: ByteSource>(&self, bits: &mut BitSource<S>) -> Result<Decoded<u8>> {
        let mut first_len = 1;
        if bits.ensure(LOOKAHEAD) {
            let (len, symbol) = self.lookup[bits.peek(LOOKAHEAD) as usize];
            if len > 0 {
                bits.consume(u32::from(len));
                return Ok(Decoded::Ready(symbol));
            }
            first_len = LOOKAHEAD + 1;
        }
        self.decode_long(bits, first_len)
    }

    /// Bit-serial canonical search starting at length `first_len`.
    fn decode_long<S: ByteSource>(
        &self,
        bits: &mut BitSource<S>,
        first_len: u32,
    ) -> Result<Decoded<u8>> {
        for len in first_len..=MAX_CODE_LEN as u32 {
            if !bits.ensure(len) {
                trace!(available = bits.available_bits(), len, "huffman decode needs more bits");
                return Ok(Decoded::NeedMoreBits);
            }
            let code = bits.peek(len) as i32;
            if code <= self.max_code[len as usize] {
                bits.consume(len);
                let idx = (code + self.val_offset[len as usize]) as usize;
                return Ok(Decoded::Ready(self.symbols[idx]));
            }
        }
        warn!(consumed = bits.bits_consumed(), "no huffman codeword matches stream");
        Err(Error::InvalidCode)
    }
}
