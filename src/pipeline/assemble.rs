//! Audio assembly: ordered chunks → one WAV.
//!
//! Each chunk is decoded to PCM, the samples are concatenated in chunk
//! order and the result is encoded exactly once. No cross-fade, no silence
//! trimming: the output is sample-exact, so assembling `[a, b, c]` gives the
//! same bytes as assembling `[assemble([a, b]), c]`.

use crate::error::NarrationError;
use crate::output::{AssembledAudio, AudioChunk};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::io::Cursor;
use tracing::debug;

/// Decoded PCM samples, interleaved by channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Samples {
    Int(Vec<i32>),
    Float(Vec<f32>),
}

impl Samples {
    pub fn len(&self) -> usize {
        match self {
            Samples::Int(s) => s.len(),
            Samples::Float(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One decoded audio clip.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmClip {
    pub spec: WavSpec,
    pub samples: Samples,
}

impl PcmClip {
    pub fn duration_secs(&self) -> f64 {
        let frames = self.samples.len() as f64 / self.spec.channels.max(1) as f64;
        frames / self.spec.sample_rate.max(1) as f64
    }
}

/// Container codec used by the assembler.
pub trait AudioCodec: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<PcmClip, NarrationError>;
    fn encode(&self, clip: &PcmClip) -> Result<Vec<u8>, NarrationError>;
}

/// WAV codec backed by `hound`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WavCodec;

fn assembly(detail: impl Into<String>) -> NarrationError {
    NarrationError::Assembly {
        detail: detail.into(),
    }
}

/// Collect samples, stopping cleanly at end of input.
///
/// Streamed WAVs may declare a data chunk larger than what follows (up to
/// `0xFFFF_FFFF` bytes), so the header count only bounds the loop and the
/// allocation is capped by the payload actually present.
fn read_samples<S: hound::Sample>(
    reader: &mut WavReader<Cursor<&[u8]>>,
    payload_len: usize,
) -> Result<Vec<S>, NarrationError> {
    let bytes_per_sample = (reader.spec().bits_per_sample as usize).div_ceil(8).max(1);
    let present = payload_len / bytes_per_sample;
    let mut samples = Vec::with_capacity((reader.len() as usize).min(present));
    for sample in reader.samples::<S>() {
        match sample {
            Ok(s) => samples.push(s),
            // A cursor over a slice only fails on a short read.
            Err(hound::Error::IoError(_)) => break,
            Err(e) => return Err(assembly(format!("invalid WAV samples: {e}"))),
        }
    }
    Ok(samples)
}

impl AudioCodec for WavCodec {
    fn decode(&self, bytes: &[u8]) -> Result<PcmClip, NarrationError> {
        let mut reader = WavReader::new(Cursor::new(bytes))
            .map_err(|e| assembly(format!("not a WAV file: {e}")))?;
        let spec = reader.spec();
        let samples = match spec.sample_format {
            SampleFormat::Int => Samples::Int(read_samples::<i32>(&mut reader, bytes.len())?),
            SampleFormat::Float => Samples::Float(read_samples::<f32>(&mut reader, bytes.len())?),
        };
        Ok(PcmClip { spec, samples })
    }

    fn encode(&self, clip: &PcmClip) -> Result<Vec<u8>, NarrationError> {
        let mut buf = Vec::new();
        {
            let mut writer = WavWriter::new(Cursor::new(&mut buf), clip.spec)
                .map_err(|e| assembly(format!("WAV writer: {e}")))?;
            match &clip.samples {
                Samples::Int(samples) => {
                    for &s in samples {
                        writer
                            .write_sample(s)
                            .map_err(|e| assembly(format!("WAV write: {e}")))?;
                    }
                }
                Samples::Float(samples) => {
                    for &s in samples {
                        writer
                            .write_sample(s)
                            .map_err(|e| assembly(format!("WAV write: {e}")))?;
                    }
                }
            }
            writer
                .finalize()
                .map_err(|e| assembly(format!("WAV finalize: {e}")))?;
        }
        Ok(buf)
    }
}

/// Concatenate chunks, in order, into one asset.
///
/// # Errors
/// [`NarrationError::Assembly`] when there are no chunks, a chunk is not
/// valid audio, or a chunk's format differs from the first chunk's.
pub fn assemble(
    codec: &dyn AudioCodec,
    chunks: &[AudioChunk],
) -> Result<AssembledAudio, NarrationError> {
    let (first, rest) = chunks
        .split_first()
        .ok_or_else(|| assembly("no audio chunks to assemble"))?;

    let PcmClip { spec, mut samples } = codec
        .decode(&first.bytes)
        .map_err(|e| assembly(format!("chunk {}: {e}", first.index + 1)))?;

    for chunk in rest {
        let clip = codec
            .decode(&chunk.bytes)
            .map_err(|e| assembly(format!("chunk {}: {e}", chunk.index + 1)))?;
        if clip.spec != spec {
            return Err(assembly(format!(
                "chunk {} format {:?} differs from {:?}",
                chunk.index + 1,
                clip.spec,
                spec
            )));
        }
        match (&mut samples, clip.samples) {
            (Samples::Int(all), Samples::Int(more)) => all.extend(more),
            (Samples::Float(all), Samples::Float(more)) => all.extend(more),
            _ => return Err(assembly("sample format changed between chunks")),
        }
    }

    let clip = PcmClip { spec, samples };
    let bytes = codec.encode(&clip)?;
    let duration_secs = clip.duration_secs();
    debug!(
        "Assembled {} chunks → {:.1}s, {} bytes",
        chunks.len(),
        duration_secs,
        bytes.len()
    );

    Ok(AssembledAudio {
        bytes,
        duration_secs,
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        chunk_count: chunks.len(),
    })
}
