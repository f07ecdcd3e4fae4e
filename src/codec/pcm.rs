//! Little-endian PCM sample packing.
//!
//! WAVE stores 8-bit samples unsigned (offset 128) and wider samples as
//! signed little-endian integers.  These helpers convert between that wire
//! form and signed `i32` sample values without reinterpreting memory.

use super::CodecError;

fn unsupported(bits: u16) -> CodecError {
    CodecError::UnsupportedGeometry {
        codec:  "pcm",
        reason: format!("{bits} bits per sample"),
    }
}

/// Bytes occupied by one sample of `bits` width.
pub fn bytes_per_sample(bits: u16) -> Result<usize, CodecError> {
    match bits {
        8  => Ok(1),
        16 => Ok(2),
        24 => Ok(3),
        32 => Ok(4),
        _  => Err(unsupported(bits)),
    }
}

/// Decode interleaved PCM bytes into signed samples.
///
/// A trailing partial sample is ignored.
pub fn decode_samples(data: &[u8], bits: u16) -> Result<Vec<i32>, CodecError> {
    let width = bytes_per_sample(bits)?;
    let samples = data
        .chunks_exact(width)
        .map(|c| match width {
            1 => c[0] as i32 - 128,
            2 => i16::from_le_bytes([c[0], c[1]]) as i32,
            3 => i32::from_le_bytes([0, c[0], c[1], c[2]]) >> 8,
            _ => i32::from_le_bytes([c[0], c[1], c[2], c[3]]),
        })
        .collect();
    Ok(samples)
}

/// Append one signed sample to `out` in wire form.
pub fn push_sample(out: &mut Vec<u8>, sample: i32, bits: u16) -> Result<(), CodecError> {
    match bits {
        8  => out.push((sample + 128) as u8),
        16 => out.extend_from_slice(&(sample as i16).to_le_bytes()),
        24 => out.extend_from_slice(&sample.to_le_bytes()[..3]),
        32 => out.extend_from_slice(&sample.to_le_bytes()),
        _  => return Err(unsupported(bits)),
    }
    Ok(())
}
