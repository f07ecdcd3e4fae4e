//! Container writer: [`Wave`] → RIFF/WAVE bytes.
//!
//! # Plain layout
//! ```text
//! RIFF | fmt (16 B, tag 1) | extra chunks… | data (PCM)
//! ```
//!
//! # Extended layout
//! ```text
//! RIFF | fmt (44 B, tag 0xFFFE) | fact | extra chunks… | data (payload)
//!
//! fmt:  tag(2)=0xFFFE channels(2) rate(4) avg_payload_rate(4) align(2) bits(2)
//!       cbSize(2)=26 reserved(2) reserved(4) GUID(16) comp(1) enc(1) orig_tag(2)
//! ```
//! The byte-rate field of the extended layout carries the *average encoded*
//! byte rate, a hint only.
//!
//! Output is assembled in memory; nothing is returned until the payload has
//! been fully encoded.

use byteorder::{LittleEndian, WriteBytesExt};
use std::io::Write;

use crate::chunk::{ChunkHeader, ExtraChunk, DATA_ID, FACT_ID, FMT_ID, FORMAT_GUID, RIFF_ID, WAVE_ID};
use crate::codec::CompressionKind;
use crate::crypto::EncryptionKind;
use crate::error::Result;
use crate::transform::{encoder_for, TransformOptions};
use crate::wave::{
    Wave, EXTENSION_SIZE, FMT_EXTENDED_SIZE, FMT_LEGACY_SIZE, FORMAT_TAG_EXTENSIBLE, FORMAT_TAG_PCM,
};

const FACT_SIZE: usize = 4;

fn write_riff_header<W: Write>(mut w: W, body_len: usize) -> Result<()> {
    let header = ChunkHeader::new(RIFF_ID, 4 + body_len)?;
    header.write(&mut w)?;
    w.write_all(&WAVE_ID)?;
    Ok(())
}

fn write_extras<W: Write>(mut w: W, extras: &[ExtraChunk]) -> Result<()> {
    for chunk in extras {
        chunk.write(&mut w)?;
    }
    Ok(())
}

fn extras_len(extras: &[ExtraChunk]) -> usize {
    extras.iter().map(ExtraChunk::encoded_len).sum()
}

/// Average payload bytes per second of playback, saturating.
fn average_byte_rate(payload_len: usize, wave: &Wave) -> u32 {
    if wave.sample_count == 0 || wave.format.sample_rate == 0 {
        return 0;
    }
    let rate = payload_len as f64 * wave.format.sample_rate as f64 / wave.sample_count as f64;
    rate.round().min(u32::MAX as f64) as u32
}

/// Serialise `wave` in the plain legacy layout.
pub fn write_plain(wave: &Wave) -> Result<Vec<u8>> {
    let body_len = 8 + FMT_LEGACY_SIZE + extras_len(&wave.extra_chunks) + 8 + wave.data.len();
    let mut out = Vec::with_capacity(12 + body_len);
    write_riff_header(&mut out, body_len)?;

    ChunkHeader::new(FMT_ID, FMT_LEGACY_SIZE)?.write(&mut out)?;
    let f = &wave.format;
    out.write_u16::<LittleEndian>(FORMAT_TAG_PCM)?;
    out.write_u16::<LittleEndian>(f.channels)?;
    out.write_u32::<LittleEndian>(f.sample_rate)?;
    out.write_u32::<LittleEndian>(f.byte_rate)?;
    out.write_u16::<LittleEndian>(f.block_align)?;
    out.write_u16::<LittleEndian>(f.bits_per_sample)?;

    write_extras(&mut out, &wave.extra_chunks)?;

    ChunkHeader::new(DATA_ID, wave.data.len())?.write(&mut out)?;
    out.write_all(&wave.data)?;
    Ok(out)
}

/// Serialise `wave` with the given methods.
///
/// The identity pair `(Uncompressed, Unencrypted)` produces the plain layout;
/// anything else produces the extended layout with an encoded payload.
pub fn write_wave(
    wave:        &Wave,
    compression: CompressionKind,
    encryption:  EncryptionKind,
    opts:        &TransformOptions,
) -> Result<Vec<u8>> {
    if compression == CompressionKind::Uncompressed && encryption == EncryptionKind::Unencrypted {
        return write_plain(wave);
    }

    let payload = encoder_for(compression, encryption, opts)?.encode(&wave.data, &wave.format.layout())?;

    let body_len = 8 + FMT_EXTENDED_SIZE
        + 8 + FACT_SIZE
        + extras_len(&wave.extra_chunks)
        + 8 + payload.len();
    let mut out = Vec::with_capacity(12 + body_len);
    write_riff_header(&mut out, body_len)?;

    ChunkHeader::new(FMT_ID, FMT_EXTENDED_SIZE)?.write(&mut out)?;
    let f = &wave.format;
    out.write_u16::<LittleEndian>(FORMAT_TAG_EXTENSIBLE)?;
    out.write_u16::<LittleEndian>(f.channels)?;
    out.write_u32::<LittleEndian>(f.sample_rate)?;
    out.write_u32::<LittleEndian>(average_byte_rate(payload.len(), wave))?;
    out.write_u16::<LittleEndian>(f.block_align)?;
    out.write_u16::<LittleEndian>(f.bits_per_sample)?;
    out.write_u16::<LittleEndian>(EXTENSION_SIZE)?;
    out.write_u16::<LittleEndian>(0)?;
    out.write_u32::<LittleEndian>(0)?;
    out.write_all(&FORMAT_GUID)?;
    out.write_u8(compression as u8)?;
    out.write_u8(encryption as u8)?;
    out.write_u16::<LittleEndian>(f.format_tag)?;

    ChunkHeader::new(FACT_ID, FACT_SIZE)?.write(&mut out)?;
    out.write_u32::<LittleEndian>(wave.sample_count)?;

    write_extras(&mut out, &wave.extra_chunks)?;

    ChunkHeader::new(DATA_ID, payload.len())?.write(&mut out)?;
    out.write_all(&payload)?;
    Ok(out)
}
