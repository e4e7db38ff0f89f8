//! MSB-first bit packing over caller-supplied byte sinks and sources.
//!
//! The first bit handed to a [`BitSink`] becomes the most significant bit of the
//! first byte it emits. [`BitSource`] reads fields back in the same order.
//!
//! Neither side performs I/O itself. Bytes leave through a [`ByteSink`] and
//! arrive through a [`ByteSource`]; both may be borrowed (`&mut T` implements
//! the traits) when several coders share one transport.

use std::collections::VecDeque;

/// Widest field merged into the 32-bit accumulator in one step.
///
/// Up to 7 bits may already be queued, so 25 new bits always fit.
pub const MAX_PUT_BITS: u32 = 25;

/// Widest field [`BitSource::peek`] can return.
pub const MAX_PEEK_BITS: u32 = 25;

/// Completed bytes buffered before they are handed downstream.
const BYTE_BUFFER_SIZE: usize = 1024;

/// Destination for coded bytes.
pub trait ByteSink {
    /// Accept an ordered run of bytes.
    fn receive(&mut self, bytes: &[u8]);

    /// Signal that no more data follows.
    fn close(&mut self) {}
}

impl ByteSink for Vec<u8> {
    fn receive(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }
}

impl<T: ByteSink + ?Sized> ByteSink for &mut T {
    fn receive(&mut self, bytes: &[u8]) {
        (**self).receive(bytes);
    }

    fn close(&mut self) {
        (**self).close();
    }
}

/// Origin of coded bytes.
pub trait ByteSource {
    /// Append the next available chunk to `buf` and return its length.
    ///
    /// Zero means nothing is available *right now*; it does not necessarily
    /// mean the stream has ended.
    fn get_bytes(&mut self, buf: &mut Vec<u8>) -> usize;
}

/// Drains everything queued so far. Callers push more bytes between decodes.
impl ByteSource for VecDeque<u8> {
    fn get_bytes(&mut self, buf: &mut Vec<u8>) -> usize {
        let n = self.len();
        buf.extend(self.drain(..));
        n
    }
}

impl<T: ByteSource + ?Sized> ByteSource for &mut T {
    fn get_bytes(&mut self, buf: &mut Vec<u8>) -> usize {
        (**self).get_bytes(buf)
    }
}

/// Hands out a whole buffer in one chunk, then nothing.
#[derive(Debug, Clone)]
pub struct SliceSource<'a> {
    data: &'a [u8],
}

impl<'a> SliceSource<'a> {
    /// Create a source over `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }
}

impl ByteSource for SliceSource<'_> {
    fn get_bytes(&mut self, buf: &mut Vec<u8>) -> usize {
        buf.extend_from_slice(self.data);
        std::mem::take(&mut self.data).len()
    }
}

/// Hands out a buffer in fixed-size chunks, one chunk per call.
#[derive(Debug, Clone)]
pub struct ChunkedSource<'a> {
    data: &'a [u8],
    chunk: usize,
}

impl<'a> ChunkedSource<'a> {
    /// Create a source returning at most `chunk` bytes per call (minimum 1).
    pub fn new(data: &'a [u8], chunk: usize) -> Self {
        Self {
            data,
            chunk: chunk.max(1),
        }
    }
}

impl ByteSource for ChunkedSource<'_> {
    fn get_bytes(&mut self, buf: &mut Vec<u8>) -> usize {
        let n = self.chunk.min(self.data.len());
        let (head, rest) = self.data.split_at(n);
        buf.extend_from_slice(head);
        self.data = rest;
        n
    }
}

/// Packs variable-width bit fields into bytes, MSB first.
///
/// Queued bits live in the top of a 32-bit accumulator; whole bytes move to an
/// internal buffer and reach the [`ByteSink`] on [`flush`](Self::flush),
/// [`close`](Self::close), when the buffer fills, or when the sink is dropped.
pub struct BitSink<S: ByteSink> {
    sink: S,
    bit_buf: u32,
    queued_bits: u32,
    bytes: Vec<u8>,
    flushed: u64,
}

impl<S: ByteSink> BitSink<S> {
    /// Create a bit sink writing to `sink`.
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            bit_buf: 0,
            queued_bits: 0,
            bytes: Vec::with_capacity(BYTE_BUFFER_SIZE),
            flushed: 0,
        }
    }

    /// Append the low `size` bits of `code`, most significant first.
    ///
    /// # Panics
    /// If `size` is not in `1..=32`.
    #[inline]
    pub fn receive(&mut self, code: u32, size: u32) {
        assert!(
            (1..=32).contains(&size),
            "bit field of {size} bits, must be 1..=32"
        );
        // Wide fields go out as high part then low part.
        let extra = size.saturating_sub(MAX_PUT_BITS);
        for (bits, n) in [(code >> extra, size - extra), (code, extra)] {
            if n > 0 {
                self.put(bits, n);
            }
        }
    }

    #[inline]
    fn put(&mut self, code: u32, size: u32) {
        debug_assert!(size <= MAX_PUT_BITS && self.queued_bits < 8);
        let mut put_bits = self.queued_bits + size;
        let mut acc = ((code & ((1 << size) - 1)) << (32 - put_bits)) | self.bit_buf;
        while put_bits >= 8 {
            self.emit((acc >> 24) as u8);
            acc <<= 8;
            put_bits -= 8;
        }
        self.bit_buf = acc;
        self.queued_bits = put_bits;
    }

    fn emit(&mut self, byte: u8) {
        self.bytes.push(byte);
        if self.bytes.len() == BYTE_BUFFER_SIZE {
            self.flush();
        }
    }

    /// Hand all completed bytes to the byte sink. A partial byte stays queued.
    pub fn flush(&mut self) {
        if !self.bytes.is_empty() {
            self.sink.receive(&self.bytes);
            self.flushed += self.bytes.len() as u64;
            self.bytes.clear();
        }
    }

    /// Pad to a byte boundary with 1-bits, flush, and close the byte sink.
    pub fn close(&mut self) {
        if self.queued_bits > 0 {
            self.receive(0xFF, 8 - self.queued_bits);
        }
        self.flush();
        self.sink.close();
    }

    /// Bits still waiting for a complete byte (always below 8).
    pub fn queued_bits(&self) -> u32 {
        self.queued_bits
    }

    /// Total bits received so far, including queued ones.
    pub fn bits_written(&self) -> u64 {
        (self.flushed + self.bytes.len() as u64) * 8 + u64::from(self.queued_bits)
    }

    /// Borrow the byte sink.
    pub fn get_ref(&self) -> &S {
        &self.sink
    }

    /// Mutably borrow the byte sink.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Flush completed bytes and take the byte sink back.
    pub fn into_inner(mut self) -> S
    where
        S: Default,
    {
        self.flush();
        std::mem::take(&mut self.sink)
    }
}

impl<S: ByteSink> Drop for BitSink<S> {
    fn drop(&mut self) {
        self.flush();
    }
}

/// Reads variable-width bit fields from a byte stream, MSB first.
///
/// Bytes pulled from the [`ByteSource`] are kept in a buffer that is rotated
/// (consumed bytes dropped) before each pull. Up to 64 upcoming bits are cached
/// MSB-aligned in `window`.
pub struct BitSource<S: ByteSource> {
    source: S,
    buf: Vec<u8>,
    pos: usize,
    window: u64,
    window_bits: u32,
    consumed: u64,
}

impl<S: ByteSource> BitSource<S> {
    /// Create a bit source reading from `source`.
    pub fn new(source: S) -> Self {
        Self {
            source,
            buf: Vec::new(),
            pos: 0,
            window: 0,
            window_bits: 0,
            consumed: 0,
        }
    }

    /// Bits buffered and ready to be read without touching the byte source.
    #[inline]
    pub fn available_bits(&self) -> usize {
        self.window_bits as usize + 8 * (self.buf.len() - self.pos)
    }

    /// Pull chunks from the byte source until at least `n` bits are buffered.
    ///
    /// Returns `false` if the source ran dry first. Buffered bits are kept, so
    /// a later call can succeed once the source has more bytes.
    pub fn ensure(&mut self, n: u32) -> bool {
        while self.available_bits() < n as usize {
            if self.pos > 0 {
                self.buf.drain(..self.pos);
                self.pos = 0;
            }
            if self.source.get_bytes(&mut self.buf) == 0 {
                return false;
            }
        }
        true
    }

    #[inline]
    fn refill(&mut self) {
        while self.window_bits <= 56 && self.pos < self.buf.len() {
            self.window |= u64::from(self.buf[self.pos]) << (56 - self.window_bits);
            self.window_bits += 8;
            self.pos += 1;
        }
    }

    /// Return the next `n` bits without consuming them.
    ///
    /// # Panics
    /// If `n` exceeds [`MAX_PEEK_BITS`] or the buffered bits.
    #[inline]
    pub fn peek(&mut self, n: u32) -> u32 {
        assert!(n <= MAX_PEEK_BITS, "peek of {n} bits, at most 25 allowed");
        self.check_available(n);
        if n == 0 {
            return 0;
        }
        if self.window_bits < n {
            self.refill();
        }
        (self.window >> (64 - n)) as u32
    }

    /// Advance past `n` bits (at most 32).
    ///
    /// # Panics
    /// If `n` exceeds 32 or the buffered bits.
    #[inline]
    pub fn consume(&mut self, n: u32) {
        assert!(n <= 32, "consume of {n} bits, at most 32 allowed");
        self.check_available(n);
        let extra = n.saturating_sub(MAX_PEEK_BITS);
        for step in [n - extra, extra] {
            if step > 0 {
                self.skip(step);
            }
        }
    }

    /// Read and consume `n` bits (at most 32).
    ///
    /// # Panics
    /// If `n` exceeds 32 or the buffered bits.
    #[inline]
    pub fn pop(&mut self, n: u32) -> u32 {
        assert!(n <= 32, "pop of {n} bits, at most 32 allowed");
        self.check_available(n);
        let extra = n.saturating_sub(MAX_PEEK_BITS);
        let mut value = 0u32;
        for step in [n - extra, extra] {
            if step > 0 {
                value = (value << step) | self.peek(step);
                self.skip(step);
            }
        }
        value
    }

    #[inline]
    fn skip(&mut self, n: u32) {
        if self.window_bits < n {
            self.refill();
        }
        self.window <<= n;
        self.window_bits -= n;
        self.consumed += u64::from(n);
    }

    #[inline]
    fn check_available(&self, n: u32) {
        let available = self.available_bits();
        assert!(
            n as usize <= available,
            "read of {n} bits with only {available} available"
        );
    }

    /// Total bits consumed so far.
    pub fn bits_consumed(&self) -> u64 {
        self.consumed
    }

    /// Borrow the byte source.
    pub fn get_ref(&self) -> &S {
        &self.source
    }

    /// Mutably borrow the byte source, e.g. to queue more bytes.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Take the byte source back, discarding buffered bits.
    pub fn into_inner(self) -> S {
        self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sink_bytes(f: impl FnOnce(&mut BitSink<&mut Vec<u8>>)) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut sink = BitSink::new(&mut out);
            f(&mut sink);
        }
        out
    }

    #[test]
    fn test_single_byte() {
        let out = sink_bytes(|s| {
            s.receive(0xFF, 8);
            s.flush();
        });
        assert_eq!(out, vec![0xFF]);
    }

    #[test]
    fn test_first_bit_is_msb() {
        let out = sink_bytes(|s| {
            s.receive(0x00, 8);
            s.receive(0x01, 8);
            s.receive(0x02, 8);
            for bit in [0, 1, 0, 1, 1, 0, 1, 0] {
                s.receive(bit, 1);
            }
            s.flush();
        });
        assert_eq!(out, vec![0x00, 0x01, 0x02, 0x5A]);
    }

    #[test]
    fn test_flush_keeps_partial_byte() {
        let mut out = Vec::new();
        let mut sink = BitSink::new(&mut out);
        sink.receive(0b101, 3);
        sink.flush();
        assert_eq!(sink.queued_bits(), 3);
        assert!(sink.get_ref().is_empty());
        sink.receive(0b11111, 5);
        sink.flush();
        drop(sink);
        assert_eq!(out, vec![0b1011_1111]);
    }

    #[test]
    fn test_close_pads_with_ones() {
        let out = sink_bytes(|s| {
            s.receive(0, 1);
            s.close();
        });
        assert_eq!(out, vec![0x7F]);

        let out = sink_bytes(|s| {
            s.receive(0x12, 8);
            s.close();
        });
        assert_eq!(out, vec![0x12]);
    }

    #[test]
    fn test_drop_flushes() {
        let out = sink_bytes(|s| {
            s.receive(0xAB, 8);
            s.receive(0x1, 1);
        });
        assert_eq!(out, vec![0xAB]);
    }

    #[test]
    fn test_wide_field_split_is_invisible() {
        let value = 0xDEAD_BEEF;
        let whole = sink_bytes(|s| {
            s.receive(1, 3);
            s.receive(value, 32);
            s.close();
        });
        let parts = sink_bytes(|s| {
            s.receive(1, 3);
            s.receive(value >> 7, 25);
            s.receive(value, 7);
            s.close();
        });
        assert_eq!(whole, parts);
    }

    #[test]
    fn test_large_output_passes_through_buffer() {
        let mut out = Vec::new();
        let mut sink = BitSink::new(&mut out);
        for i in 0..3000u32 {
            sink.receive(i & 0xFF, 8);
        }
        assert_eq!(sink.bits_written(), 3000 * 8);
        drop(sink);
        assert_eq!(out.len(), 3000);
        assert_eq!(out[2999], (2999 & 0xFF) as u8);
    }

    #[test]
    fn test_into_inner_returns_bytes() {
        let mut sink = BitSink::new(Vec::new());
        sink.receive(0xCAFE, 16);
        assert_eq!(sink.into_inner(), vec![0xCA, 0xFE]);
    }

    #[test]
    fn test_field_widths_25_31_32_roundtrip() {
        let fields = [(0x1AB_CDEF, 25), (0x5555_AAAA, 31), (0xFFFF_FFFE, 32), (0xABCD, 31), (0xABCD, 32)];
        let out = sink_bytes(|s| {
            for &(v, n) in &fields {
                s.receive(v, n);
            }
            s.close();
        });
        let mut src = BitSource::new(SliceSource::new(&out));
        for &(v, n) in &fields {
            assert!(src.ensure(n));
            let mask = if n == 32 { u32::MAX } else { (1 << n) - 1 };
            assert_eq!(src.pop(n), v & mask);
        }
    }

    #[test]
    fn test_peek_does_not_consume() {
        let data = [0b1100_1010, 0xFF];
        let mut src = BitSource::new(SliceSource::new(&data));
        assert_eq!(src.available_bits(), 0);
        assert!(src.ensure(8));
        assert_eq!(src.peek(4), 0b1100);
        assert_eq!(src.peek(4), 0b1100);
        assert_eq!(src.available_bits(), 16);
        src.consume(3);
        assert_eq!(src.peek(5), 0b01010);
        assert_eq!(src.bits_consumed(), 3);
        assert_eq!(src.available_bits(), 13);
    }

    #[test]
    fn test_ensure_reports_dry_source_and_resumes() {
        let mut src = BitSource::new(VecDeque::new());
        assert!(!src.ensure(1));
        src.get_mut().push_back(0xA5);
        assert!(!src.ensure(9));
        assert_eq!(src.available_bits(), 8);
        src.get_mut().push_back(0x80);
        assert!(src.ensure(9));
        assert_eq!(src.pop(9), 0b1010_0101_1);
    }

    #[test]
    fn test_chunked_source_one_byte_at_a_time() {
        let data = [1u8, 2, 3, 4, 5];
        let mut chunked = ChunkedSource::new(&data, 1);
        let mut buf = Vec::new();
        assert_eq!(chunked.get_bytes(&mut buf), 1);
        assert_eq!(chunked.get_bytes(&mut buf), 1);
        assert_eq!(buf, vec![1, 2]);

        let mut src = BitSource::new(ChunkedSource::new(&data, 1));
        assert!(src.ensure(40));
        assert_eq!(src.pop(32), 0x0102_0304);
        assert_eq!(src.pop(8), 5);
        assert!(!src.ensure(1));
    }

    #[test]
    #[should_panic(expected = "only")]
    fn test_consume_past_available_panics() {
        let data = [0u8];
        let mut src = BitSource::new(SliceSource::new(&data));
        src.ensure(8);
        src.consume(9);
    }

    #[test]
    #[should_panic(expected = "at most 25")]
    fn test_wide_peek_panics() {
        let data = [0u8; 8];
        let mut src = BitSource::new(SliceSource::new(&data));
        src.ensure(64);
        src.peek(26);
    }

    proptest! {
        #[test]
        fn prop_fields_roundtrip(
            fields in prop::collection::vec((any::<u32>(), 1u32..=32), 1..200),
            chunk in 1usize..9,
        ) {
            let mut out = Vec::new();
            {
                let mut sink = BitSink::new(&mut out);
                for &(v, n) in &fields {
                    sink.receive(v, n);
                }
                sink.close();
            }
            let total: u32 = fields.iter().map(|&(_, n)| n).sum();
            prop_assert_eq!(out.len() as u32, total.div_ceil(8));

            let mut src = BitSource::new(ChunkedSource::new(&out, chunk));
            for &(v, n) in &fields {
                prop_assert!(src.ensure(n));
                let mask = if n == 32 { u32::MAX } else { (1u32 << n) - 1 };
                prop_assert_eq!(src.pop(n), v & mask);
            }
            let pad = src.available_bits() as u32;
            prop_assert!(pad < 8);
            if pad > 0 {
                prop_assert_eq!(src.pop(pad), (1u32 << pad) - 1);
            }
        }
    }
}
