//! RIFF chunk framing.
//!
//! ```text
//! RIFF header  "RIFF" | u32 size-8 | "WAVE"
//! chunk        tag(4) | u32 payload length | payload
//! ```
//! All integers are little-endian.  Chunks are not word-padded.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};
use uuid::Uuid;

pub type FourCC = [u8; 4];

pub const RIFF_ID: FourCC = *b"RIFF";
pub const WAVE_ID: FourCC = *b"WAVE";
pub const FMT_ID:  FourCC = *b"fmt ";
pub const FACT_ID: FourCC = *b"fact";
pub const DATA_ID: FourCC = *b"data";

pub const CHUNK_HEADER_SIZE: usize = 8;

/// Identifier of the extended layout this crate writes:
/// `0f5b9db9-8747-45b8-810f-0d56c02499f7`.
pub const FORMAT_UUID: Uuid = Uuid::from_u128(0x0f5b9db9_8747_45b8_810f_0d56c02499f7);

/// [`FORMAT_UUID`] in on-disk byte order (first three fields little-endian).
pub const FORMAT_GUID: [u8; 16] = [
    0xb9, 0x9d, 0x5b, 0x0f, 0x47, 0x87, 0xb8, 0x45,
    0x81, 0x0f, 0x0d, 0x56, 0xc0, 0x24, 0x99, 0xf7,
];

/// Render a tag for diagnostics, escaping non-printable bytes.
pub fn fourcc_str(tag: &FourCC) -> String {
    tag.iter().flat_map(|b| std::ascii::escape_default(*b)).map(char::from).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub tag: FourCC,
    pub len: u32,
}

impl ChunkHeader {
    pub fn new(tag: FourCC, len: usize) -> io::Result<Self> {
        let len = u32::try_from(len)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "chunk exceeds 4 GiB"))?;
        Ok(Self { tag, len })
    }

    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_all(&self.tag)?;
        writer.write_u32::<LittleEndian>(self.len)?;
        Ok(())
    }

    /// Read the next header, or `None` if the source is exhausted exactly at
    /// a chunk boundary.
    pub fn read_next<R: Read>(mut reader: R) -> io::Result<Option<Self>> {
        let mut tag = [0u8; 4];
        let mut filled = 0;
        while filled < tag.len() {
            match reader.read(&mut tag[filled..]) {
                Ok(0) if filled == 0 => return Ok(None),
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "truncated chunk tag",
                    ))
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        let len = reader.read_u32::<LittleEndian>()?;
        Ok(Some(Self { tag, len }))
    }
}

/// A chunk this crate does not interpret, kept byte-exact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtraChunk {
    pub tag:  FourCC,
    pub data: Vec<u8>,
}

impl ExtraChunk {
    pub fn new(tag: FourCC, data: impl Into<Vec<u8>>) -> Self {
        Self { tag, data: data.into() }
    }

    /// Bytes this chunk occupies on disk, header included.
    pub fn encoded_len(&self) -> usize {
        CHUNK_HEADER_SIZE + self.data.len()
    }

    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        ChunkHeader::new(self.tag, self.data.len())?.write(&mut writer)?;
        writer.write_all(&self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guid_bytes_match_uuid() {
        assert_eq!(FORMAT_UUID.to_bytes_le(), FORMAT_GUID);
        assert_eq!(FORMAT_UUID.to_string(), "0f5b9db9-8747-45b8-810f-0d56c02499f7");
    }

    #[test]
    fn header_roundtrip_and_clean_eof() {
        let mut buf = Vec::new();
        ChunkHeader::new(*b"LIST", 12).unwrap().write(&mut buf).unwrap();
        assert_eq!(buf, b"LIST\x0c\x00\x00\x00");

        let mut cur = io::Cursor::new(buf);
        let h = ChunkHeader::read_next(&mut cur).unwrap().unwrap();
        assert_eq!(h, ChunkHeader { tag: *b"LIST", len: 12 });
        assert!(ChunkHeader::read_next(&mut cur).unwrap().is_none());
    }

    #[test]
    fn partial_tag_is_an_error() {
        let err = ChunkHeader::read_next(&b"da"[..]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn fourcc_escapes() {
        assert_eq!(fourcc_str(b"fmt "), "fmt ");
        assert_eq!(fourcc_str(&[b'a', 0, b'b', b'c']), "a\\x00bc");
    }
}
