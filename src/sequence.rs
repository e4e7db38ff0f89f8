//! Sample sequences: quantize, predict, code.
//!
//! A [`SequenceCoder`] turns floating-point samples into a coded byte stream:
//!
//! ```text
//! x        = round(sample / q_step)
//! residual = x - predictor.predict()     (wrapping)
//! ```
//!
//! and hands each residual to the configured integer coder. A
//! [`SequenceDecoder`] with the same [`CoderConfig`] reverses every step. The
//! decoder is resumable: when the source runs dry mid-value it reports
//! [`Decoded::NeedMoreBits`] and picks up where it stopped on the next call.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bits::{BitSink, BitSource, ByteSink, ByteSource, SliceSource};
use crate::coder::{AnyIntCoder, AnyIntDecoder, IntCoder, IntDecoder, Run};
pub use crate::coder::Scheme;
use crate::error::{Error, Result};
use crate::huffman::{Decoded, HuffmanTable};
use crate::predict::{IntPredictor, PredictorConfig};

/// Compact quantization step: `(1 + sig / 256) * 2^exp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QStep {
    /// Mantissa fraction in 256ths.
    pub sig: u8,
    /// Power-of-two exponent.
    pub exp: i8,
}

impl QStep {
    /// Step as a float.
    pub fn step(self) -> f64 {
        (1.0 + f64::from(self.sig) / 256.0) * 2f64.powi(i32::from(self.exp))
    }
}

impl From<QStep> for f64 {
    fn from(q: QStep) -> f64 {
        q.step()
    }
}

/// Everything both ends of a stream must agree on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoderConfig {
    /// Predictor and its initial state.
    pub predictor: PredictorConfig,
    /// Quantization step; finite and positive.
    pub q_step: f64,
    /// Integer coding scheme.
    pub scheme: Scheme,
    /// Huffman table shared out of band.
    pub table: HuffmanTable,
}

impl Default for CoderConfig {
    fn default() -> Self {
        Self {
            predictor: PredictorConfig::default(),
            q_step: 1.0,
            scheme: Scheme::Size,
            table: HuffmanTable::default(),
        }
    }
}

impl CoderConfig {
    /// Check the configuration.
    ///
    /// # Errors
    /// Returns [`Error::InvalidQuantStep`] if `q_step` is not finite and
    /// positive. Predictor and table are valid by construction.
    pub fn validate(&self) -> Result<()> {
        if !(self.q_step.is_finite() && self.q_step > 0.0) {
            return Err(Error::InvalidQuantStep(self.q_step));
        }
        Ok(())
    }

    /// Quantize one sample.
    ///
    /// # Errors
    /// Returns [`Error::Unquantizable`] if the quantized value is not finite
    /// or falls outside `i32`.
    pub fn quantize(&self, value: f64) -> Result<i32> {
        let x = (value / self.q_step).round();
        if !(x >= f64::from(i32::MIN) && x <= f64::from(i32::MAX)) {
            return Err(Error::Unquantizable {
                value,
                step: self.q_step,
            });
        }
        Ok(x as i32)
    }

    /// Map a quantized value back to sample units.
    pub fn reconstruct(&self, x: i32) -> f64 {
        f64::from(x) * self.q_step
    }
}

/// Codes a sequence of samples into one byte sink.
pub struct SequenceCoder<S: ByteSink> {
    config: CoderConfig,
    predictor: Box<dyn IntPredictor + Send>,
    coder: AnyIntCoder,
    sink: BitSink<S>,
    count: u64,
}

impl<S: ByteSink> SequenceCoder<S> {
    /// Start a stream into `sink`.
    ///
    /// # Errors
    /// Returns a configuration error if `config` is invalid.
    pub fn new(config: &CoderConfig, sink: S) -> Result<Self> {
        config.validate()?;
        debug!(
            scheme = ?config.scheme,
            order = config.predictor.order(),
            q_step = config.q_step,
            "built sequence coder"
        );
        Ok(Self {
            predictor: config.predictor.build(),
            coder: AnyIntCoder::new(config.scheme, &config.table),
            sink: BitSink::new(sink),
            config: config.clone(),
            count: 0,
        })
    }

    /// Quantize and code one sample.
    pub fn push(&mut self, value: f64) -> Result<()> {
        let x = self.config.quantize(value)?;
        self.push_int(x)
    }

    /// Code one already-quantized value.
    pub fn push_int(&mut self, x: i32) -> Result<()> {
        let residual = x.wrapping_sub(self.predictor.predict());
        self.coder.code(&mut self.sink, residual)?;
        self.predictor.update(x);
        self.count += 1;
        Ok(())
    }

    /// Code every sample of `values`.
    pub fn push_all(&mut self, values: &[f64]) -> Result<()> {
        values.iter().try_for_each(|&v| self.push(v))
    }

    /// Values coded so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Bits produced so far, excluding anything a flush has yet to emit.
    pub fn bits_written(&self) -> u64 {
        self.sink.bits_written()
    }

    /// Histogram of the Huffman symbols emitted so far.
    ///
    /// A pending zero run is not counted until [`finish`](Self::finish);
    /// use [`finish_with_counts`](Self::finish_with_counts) to tune a table.
    pub fn counts(&self) -> &[u32] {
        self.coder.counts()
    }

    /// Flush the integer coder, pad to a byte boundary and return the sink.
    pub fn finish(self) -> Result<S>
    where
        S: Default,
    {
        self.finish_with_counts().map(|(sink, _)| sink)
    }

    /// Like [`finish`](Self::finish), also returning the histogram of every
    /// symbol in the stream, including those emitted by the flush.
    pub fn finish_with_counts(mut self) -> Result<(S, Vec<u32>)>
    where
        S: Default,
    {
        self.coder.flush(&mut self.sink)?;
        self.sink.close();
        debug!(
            values = self.count,
            bytes = self.sink.bits_written() / 8,
            "finished sequence"
        );
        let counts = self.coder.counts().to_vec();
        Ok((self.sink.into_inner(), counts))
    }
}

/// Decodes a sequence of samples from one byte source.
pub struct SequenceDecoder<S: ByteSource> {
    config: CoderConfig,
    predictor: Box<dyn IntPredictor + Send>,
    decoder: AnyIntDecoder,
    bits: BitSource<S>,
    /// Zeros of the current run still to be returned.
    zeros: u32,
    /// Final value of the current run.
    tail: Option<i32>,
    count: u64,
}

impl<S: ByteSource> SequenceDecoder<S> {
    /// Start decoding from `source`.
    ///
    /// # Errors
    /// Returns a configuration error if `config` is invalid.
    pub fn new(config: &CoderConfig, source: S) -> Result<Self> {
        config.validate()?;
        debug!(
            scheme = ?config.scheme,
            order = config.predictor.order(),
            q_step = config.q_step,
            "built sequence decoder"
        );
        Ok(Self {
            predictor: config.predictor.build(),
            decoder: AnyIntDecoder::new(config.scheme, &config.table),
            bits: BitSource::new(source),
            config: config.clone(),
            zeros: 0,
            tail: None,
            count: 0,
        })
    }

    /// Decode the next quantized value.
    pub fn next_int(&mut self) -> Result<Decoded<i32>> {
        loop {
            if self.zeros > 0 {
                self.zeros -= 1;
                return Ok(Decoded::Ready(self.apply(0)));
            }
            if let Some(residual) = self.tail.take() {
                return Ok(Decoded::Ready(self.apply(residual)));
            }
            match self.decoder.decode(&mut self.bits)? {
                Decoded::Ready(Run { run, value }) => {
                    self.zeros = run;
                    self.tail = Some(value);
                }
                Decoded::NeedMoreBits => return Ok(Decoded::NeedMoreBits),
            }
        }
    }

    /// Decode the next sample.
    pub fn next_sample(&mut self) -> Result<Decoded<f64>> {
        let q_step = self.config.q_step;
        Ok(self.next_int()?.map(|x| f64::from(x) * q_step))
    }

    fn apply(&mut self, residual: i32) -> i32 {
        let x = self.predictor.predict().wrapping_add(residual);
        self.predictor.update(x);
        self.count += 1;
        x
    }

    /// Values decoded so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Bits consumed from the source so far.
    pub fn bits_consumed(&self) -> u64 {
        self.bits.bits_consumed()
    }

    /// Mutably borrow the byte source, e.g. to queue more bytes.
    pub fn get_mut(&mut self) -> &mut S {
        self.bits.get_mut()
    }
}

/// One sequence coder per channel, fed a frame (one sample per channel) at
/// a time. Each channel writes to its own sink.
pub struct FrameCoder<S: ByteSink> {
    channels: Vec<SequenceCoder<S>>,
}

impl<S: ByteSink> FrameCoder<S> {
    /// One channel per `(config, sink)` pair, in frame order.
    pub fn new(channels: impl IntoIterator<Item = (CoderConfig, S)>) -> Result<Self> {
        let channels = channels
            .into_iter()
            .map(|(config, sink)| SequenceCoder::new(&config, sink))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { channels })
    }

    /// Number of channels.
    pub fn width(&self) -> usize {
        self.channels.len()
    }

    /// Code one sample per channel.
    ///
    /// # Errors
    /// Returns [`Error::FrameWidth`] if `frame` does not have one value per
    /// channel; nothing is coded in that case.
    pub fn push_frame(&mut self, frame: &[f64]) -> Result<()> {
        if frame.len() != self.channels.len() {
            return Err(Error::FrameWidth {
                expected: self.channels.len(),
                got: frame.len(),
            });
        }
        for (channel, &v) in self.channels.iter_mut().zip(frame) {
            channel.push(v)?;
        }
        Ok(())
    }

    /// Finish every channel and return the sinks in frame order.
    pub fn finish(self) -> Result<Vec<S>>
    where
        S: Default,
    {
        self.channels.into_iter().map(SequenceCoder::finish).collect()
    }
}

/// Code `values` into a fresh byte vector.
pub fn encode(config: &CoderConfig, values: &[f64]) -> Result<Vec<u8>> {
    let mut coder = SequenceCoder::new(config, Vec::new())?;
    coder.push_all(values)?;
    coder.finish()
}

/// Code already-quantized values into a fresh byte vector.
pub fn encode_ints(config: &CoderConfig, values: &[i32]) -> Result<Vec<u8>> {
    let mut coder = SequenceCoder::new(config, Vec::new())?;
    for &x in values {
        coder.push_int(x)?;
    }
    coder.finish()
}

/// Decode `count` samples from `bytes`.
///
/// # Errors
/// Returns [`Error::UnexpectedEnd`] if `bytes` holds fewer than `count`
/// values, or any decoding error.
pub fn decode(config: &CoderConfig, bytes: &[u8], count: usize) -> Result<Vec<f64>> {
    Ok(decode_ints(config, bytes, count)?
        .into_iter()
        .map(|x| config.reconstruct(x))
        .collect())
}

/// Decode `count` quantized values from `bytes`.
///
/// # Errors
/// Returns [`Error::UnexpectedEnd`] if `bytes` holds fewer than `count`
/// values, or any decoding error.
pub fn decode_ints(config: &CoderConfig, bytes: &[u8], count: usize) -> Result<Vec<i32>> {
    let mut decoder = SequenceDecoder::new(config, SliceSource::new(bytes))?;
    let mut out = Vec::with_capacity(count);
    while out.len() < count {
        match decoder.next_int()? {
            Decoded::Ready(x) => out.push(x),
            Decoded::NeedMoreBits => {
                return Err(Error::UnexpectedEnd {
                    decoded: out.len(),
                    expected: count,
                })
            }
        }
    }
    Ok(out)
}
