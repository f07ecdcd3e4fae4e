//! FLAC transform: the PCM payload is re-encoded as a complete FLAC stream
//! using the container's real sample geometry.
//!
//! Encoding uses flacenc (pure Rust); decoding uses claxon.  Geometries FLAC
//! cannot carry losslessly are rejected up front with
//! [`CodecError::UnsupportedGeometry`] so a non-round-trippable payload is
//! never produced.

use std::io::{Cursor, Read};

use flacenc::bitsink::ByteSink;
use flacenc::component::BitRepr;
use flacenc::config::Encoder as FlacConfig;
use flacenc::error::Verify;
use flacenc::source::MemSource;
use tracing::debug;

use super::pcm::{decode_samples, push_sample};
use super::{Codec, CodecError, CompressionKind, PcmLayout};

/// Samples per channel in every FLAC frame but the last.
pub const FLAC_BLOCK_SIZE: usize = 4608;

const MAX_CHANNELS:    u16 = 8;
const MAX_SAMPLE_RATE: u32 = 655_350;

pub struct FlacCodec {
    pub block_size: usize,
}

impl Default for FlacCodec {
    fn default() -> Self {
        Self { block_size: FLAC_BLOCK_SIZE }
    }
}

fn geometry_error(reason: String) -> CodecError {
    CodecError::UnsupportedGeometry { codec: "flac", reason }
}

/// Reject layouts FLAC cannot carry losslessly.
pub fn check_layout(layout: &PcmLayout) -> Result<(), CodecError> {
    if !matches!(layout.bits_per_sample, 8 | 16 | 24) {
        return Err(geometry_error(format!("{} bits per sample", layout.bits_per_sample)));
    }
    if layout.channels == 0 || layout.channels > MAX_CHANNELS {
        return Err(geometry_error(format!("{} channels", layout.channels)));
    }
    if layout.sample_rate == 0 || layout.sample_rate > MAX_SAMPLE_RATE {
        return Err(geometry_error(format!("{} Hz", layout.sample_rate)));
    }
    Ok(())
}

impl Codec for FlacCodec {
    fn kind(&self) -> CompressionKind { CompressionKind::Flac }

    fn compress(&self, data: &[u8], layout: &PcmLayout, _: i32) -> Result<Vec<u8>, CodecError> {
        check_layout(layout)?;
        if data.is_empty() {
            // A FLAC stream needs at least one frame to be decodable.
            return Err(geometry_error("empty payload".into()));
        }
        let frame_bytes = layout.channels as usize * (layout.bits_per_sample as usize / 8);
        if data.len() % frame_bytes != 0 {
            return Err(geometry_error(format!(
                "payload of {} bytes is not a whole number of {}-byte frames",
                data.len(),
                frame_bytes,
            )));
        }

        let samples = decode_samples(data, layout.bits_per_sample)?;

        let mut config = FlacConfig::default();
        config.block_size = self.block_size;
        let config = config
            .into_verified()
            .map_err(|e| CodecError::Compression(format!("invalid FLAC config: {:?}", e)))?;

        let source = MemSource::from_samples(
            &samples,
            layout.channels as usize,
            layout.bits_per_sample as usize,
            layout.sample_rate as usize,
        );
        let stream = flacenc::encode_with_fixed_block_size(&config, source, self.block_size)
            .map_err(|e| CodecError::Compression(format!("FLAC encoding failed: {:?}", e)))?;

        let mut sink = ByteSink::new();
        stream
            .write(&mut sink)
            .map_err(|e| CodecError::Compression(format!("FLAC serialisation failed: {:?}", e)))?;
        debug!(samples = samples.len(), bytes = sink.as_slice().len(), "flac stream encoded");
        Ok(sink.as_slice().to_vec())
    }

    fn decoder<'a>(
        &self,
        input:  Box<dyn Read + 'a>,
        layout: &PcmLayout,
    ) -> Result<Box<dyn Read + 'a>, CodecError> {
        let mut reader = claxon::FlacReader::new(input)
            .map_err(|e| CodecError::Decompression(e.to_string()))?;

        let info = reader.streaminfo();
        if info.bits_per_sample != layout.bits_per_sample as u32
            || info.channels != layout.channels as u32
        {
            return Err(CodecError::Decompression(format!(
                "FLAC stream is {} ch / {} bit but the container declares {} ch / {} bit",
                info.channels, info.bits_per_sample, layout.channels, layout.bits_per_sample,
            )));
        }

        let mut pcm = Vec::new();
        for sample in reader.samples() {
            let sample = sample.map_err(|e| CodecError::Decompression(e.to_string()))?;
            push_sample(&mut pcm, sample, layout.bits_per_sample)?;
        }
        Ok(Box::new(Cursor::new(pcm)))
    }
}
