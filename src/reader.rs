//! Container reader: RIFF/WAVE bytes → [`Wave`].
//!
//! Chunks are scanned until the source is exhausted.  `fmt `, `fact` and
//! `data` are interpreted; every other chunk is kept verbatim in file order.
//!
//! # Leniency
//! Structural headers (`RIFF`, `fmt `, `fact`) must be complete and valid.
//! Payload-bearing chunks shorter than declared are accepted as far as they
//! go, and a decoded payload shorter than the `fact` sample count is
//! zero-filled.  Neither condition is detected as corruption.

use std::io::{self, Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::chunk::{
    fourcc_str, ChunkHeader, ExtraChunk, FourCC, DATA_ID, FACT_ID, FMT_ID, FORMAT_UUID, RIFF_ID,
    WAVE_ID,
};
use crate::codec::CompressionKind;
use crate::crypto::EncryptionKind;
use crate::error::{Result, WaveError};
use crate::transform::{decoder_for, TransformOptions};
use crate::wave::{
    sample_count_for, Wave, WaveFormat, EXTENSION_SIZE, FMT_LEGACY_SIZE, FORMAT_TAG_EXTENSIBLE,
    FORMAT_TAG_PCM, MIN_EXTENSION_SIZE,
};

/// Result of parsing a `fmt ` chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatChunk {
    pub format:      WaveFormat,
    pub compression: CompressionKind,
    pub encryption:  EncryptionKind,
}

fn truncated(what: &str) -> impl FnOnce(io::Error) -> WaveError + '_ {
    move |e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            WaveError::format(format!("truncated {what}"))
        } else {
            WaveError::Io(e)
        }
    }
}

/// Parse a `fmt ` chunk payload.
pub fn parse_format_chunk(payload: &[u8]) -> Result<FormatChunk> {
    let size = payload.len();
    let mut r = Cursor::new(payload);
    let tag = r.read_u16::<LittleEndian>().map_err(truncated("fmt chunk"))?;
    if tag != FORMAT_TAG_PCM && tag != FORMAT_TAG_EXTENSIBLE {
        return Err(WaveError::format(format!(
            "format tag 0x{tag:04X} is not PCM; only PCM WAVE files are supported"
        )));
    }
    if size < FMT_LEGACY_SIZE {
        return Err(WaveError::format(format!("fmt chunk of {size} bytes is too small")));
    }

    let mut format = WaveFormat {
        format_tag:      tag,
        channels:        r.read_u16::<LittleEndian>()?,
        sample_rate:     r.read_u32::<LittleEndian>()?,
        byte_rate:       r.read_u32::<LittleEndian>()?,
        block_align:     r.read_u16::<LittleEndian>()?,
        bits_per_sample: r.read_u16::<LittleEndian>()?,
    };

    if tag == FORMAT_TAG_PCM {
        return Ok(FormatChunk {
            format,
            compression: CompressionKind::Uncompressed,
            encryption:  EncryptionKind::Unencrypted,
        });
    }

    if size < FMT_LEGACY_SIZE + 2 {
        return Err(WaveError::format("extended fmt chunk is missing its extension size"));
    }
    let ext_size = r.read_u16::<LittleEndian>()?;
    if ext_size < MIN_EXTENSION_SIZE {
        return Err(WaveError::format(format!(
            "extended format with {ext_size}-byte extension is not recognised"
        )));
    }
    let mut body = Vec::new();
    (&mut r).take(ext_size as u64).read_to_end(&mut body)?;
    if body.len() < MIN_EXTENSION_SIZE as usize {
        return Err(WaveError::format("truncated fmt extension"));
    }
    let found = Uuid::from_slice_le(&body[6..22]).map_err(|e| WaveError::format(e.to_string()))?;
    if found != FORMAT_UUID {
        return Err(WaveError::format(format!(
            "extended format GUID {found} does not identify a wavcomp file"
        )));
    }
    if ext_size != EXTENSION_SIZE {
        return Err(WaveError::format(format!(
            "extension size {ext_size} (expected {EXTENSION_SIZE}); \
             the file was written by a newer wavcomp"
        )));
    }
    if body.len() < EXTENSION_SIZE as usize {
        return Err(WaveError::format("truncated fmt extension"));
    }

    let compression = CompressionKind::from(body[22]);
    let encryption = EncryptionKind::from(body[23]);
    format.format_tag = u16::from_le_bytes([body[24], body[25]]);
    format.byte_rate =
        WaveFormat::pcm_byte_rate(format.channels, format.sample_rate, format.bits_per_sample);

    Ok(FormatChunk { format, compression, encryption })
}

/// Read up to `len` bytes, warning if the source ends first.
fn read_lenient<R: Read>(reader: &mut R, tag: &FourCC, len: u32) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.take(len as u64).read_to_end(&mut buf)?;
    if buf.len() < len as usize {
        warn!(
            chunk = %fourcc_str(tag),
            declared = len,
            available = buf.len(),
            "chunk shorter than declared"
        );
    }
    Ok(buf)
}

fn read_exact_chunk<R: Read>(reader: &mut R, tag: &FourCC, len: u32) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.take(len as u64).read_to_end(&mut buf)?;
    if buf.len() < len as usize {
        return Err(WaveError::format(format!("truncated '{}' chunk", fourcc_str(tag))));
    }
    Ok(buf)
}

/// Pull from `src` until `out` is full or the stream ends.  Returns the
/// number of bytes produced; the rest of `out` is left untouched.
fn fill_from<R: Read + ?Sized>(src: &mut R, out: &mut [u8]) -> Result<usize> {
    let mut pos = 0;
    while pos < out.len() {
        match src.read(&mut out[pos..]) {
            Ok(0) => break,
            Ok(n) => pos += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                warn!(error = %e, "payload stream ended early");
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(pos)
}

/// Largest PCM payload a `data` chunk can declare.
pub const MAX_PCM_LEN: u64 = u32::MAX as u64;

const DECODE_CHUNK: usize = 64 * 1024;

/// Pull decoded bytes into a growing buffer, stopping at `limit` if given.
fn drain<R: Read + ?Sized>(src: &mut R, limit: Option<usize>) -> Result<Vec<u8>> {
    let mut pcm = Vec::new();
    let mut chunk = vec![0u8; DECODE_CHUNK];
    loop {
        let want = match limit {
            Some(limit) => (limit - pcm.len()).min(DECODE_CHUNK),
            None => DECODE_CHUNK,
        };
        if want == 0 {
            break;
        }
        let n = fill_from(src, &mut chunk[..want])?;
        pcm.extend_from_slice(&chunk[..n]);
        if n < want {
            break;
        }
    }
    Ok(pcm)
}

fn decode_payload(
    raw:          &[u8],
    fmt:          &FormatChunk,
    sample_count: Option<u32>,
    opts:         &TransformOptions,
) -> Result<(Vec<u8>, u32)> {
    let layout = fmt.format.layout();
    let decoder = decoder_for(fmt.compression, fmt.encryption, opts)?;

    match sample_count {
        Some(count) => {
            let frame_bytes = fmt.format.frame_bytes() as u64;
            let expected = (count as u64)
                .checked_mul(frame_bytes)
                .filter(|&len| len <= MAX_PCM_LEN)
                .ok_or_else(|| {
                    WaveError::format(format!(
                        "fact count {count} of {frame_bytes}-byte frames exceeds the data chunk limit"
                    ))
                })? as usize;
            let mut src = decoder.reader(raw, &layout)?;
            let mut pcm = drain(&mut src, Some(expected))?;
            if pcm.len() < expected {
                warn!(expected, produced = pcm.len(), "decoded payload short; remainder zero-filled");
                pcm.resize(expected, 0);
            }
            Ok((pcm, count))
        }
        None => {
            let mut src = decoder.reader(raw, &layout)?;
            let pcm = drain(&mut src, None)?;
            let count = sample_count_for(&fmt.format, pcm.len());
            Ok((pcm, count))
        }
    }
}

/// Parse a complete WAVE container from `reader`.
pub fn read_wave<R: Read>(mut reader: R, opts: &TransformOptions) -> Result<Wave> {
    let mut riff = [0u8; 4];
    reader.read_exact(&mut riff).map_err(truncated("RIFF header"))?;
    if riff != RIFF_ID {
        return Err(WaveError::format("missing RIFF signature"));
    }
    let _riff_size = reader.read_u32::<LittleEndian>().map_err(truncated("RIFF header"))?;
    let mut wave_id = [0u8; 4];
    reader.read_exact(&mut wave_id).map_err(truncated("RIFF header"))?;
    if wave_id != WAVE_ID {
        return Err(WaveError::format("missing WAVE form type"));
    }

    let mut fmt: Option<FormatChunk> = None;
    let mut fact_samples: Option<u32> = None;
    let mut payload: Option<(Vec<u8>, u32)> = None;
    let mut extra_chunks = Vec::new();

    while let Some(header) = ChunkHeader::read_next(&mut reader).map_err(truncated("chunk header"))? {
        debug!(chunk = %fourcc_str(&header.tag), len = header.len, "chunk");
        match header.tag {
            FMT_ID => {
                let body = read_exact_chunk(&mut reader, &header.tag, header.len)?;
                fmt = Some(parse_format_chunk(&body)?);
            }
            FACT_ID => {
                if header.len < 4 {
                    return Err(WaveError::format("unrecognised 'fact' chunk format"));
                }
                let body = read_exact_chunk(&mut reader, &header.tag, header.len)?;
                fact_samples = Some(u32::from_le_bytes([body[0], body[1], body[2], body[3]]));
            }
            DATA_ID => {
                let f = fmt.as_ref().ok_or_else(|| WaveError::format("'data' chunk before 'fmt '"))?;
                let raw = read_lenient(&mut reader, &header.tag, header.len)?;
                payload = Some(if f.compression == CompressionKind::Uncompressed
                    && f.encryption == EncryptionKind::Unencrypted
                {
                    let count = sample_count_for(&f.format, raw.len());
                    (raw, count)
                } else {
                    decode_payload(&raw, f, fact_samples, opts)?
                });
            }
            tag => {
                let data = read_lenient(&mut reader, &tag, header.len)?;
                extra_chunks.push(ExtraChunk { tag, data });
            }
        }
    }

    let fmt = fmt.ok_or_else(|| WaveError::format("missing 'fmt ' chunk"))?;
    let (data, sample_count) = payload.ok_or_else(|| WaveError::format("missing 'data' chunk"))?;

    Ok(Wave {
        format: fmt.format,
        compression: fmt.compression,
        encryption: fmt.encryption,
        data,
        sample_count,
        extra_chunks,
    })
}
