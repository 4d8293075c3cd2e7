use flate2::Crc;
use nom::number::complete::{le_u16, le_u32};
use serde::Serialize;
use strum_macros::{Display, IntoStaticStr};
use tracing::debug;

use crate::cursor::{cstring, reversed_tag};
use crate::types::GameClock;
use crate::{ByteCursor, ErrorKind, IResult, failure_from_kind};

/// Zero-terminated magic string every replay starts with (terminator excluded).
pub const TITLE: &[u8] = b"Warcraft III recorded game\x1A";
/// Header size for patch 1.07 and later. 0x40 (patch <= 1.06) is not supported.
pub const SUPPORTED_HEADER_SIZE: u32 = 0x44;
pub const SUPPORTED_HEADER_VERSION: u32 = 1;
/// Offset of the header's own CRC-32 field.
pub const CHECKSUM_OFFSET: usize = 0x40;

const FLAGS_SINGLE_PLAYER: u16 = 0x0000;
const FLAGS_MULTI_PLAYER: u16 = 0x8000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, IntoStaticStr)]
pub enum GameKind {
    SinglePlayer,
    /// LAN or Battle.net
    MultiPlayer,
}

impl GameKind {
    fn from_flags(flags: u16) -> Option<GameKind> {
        match flags {
            FLAGS_SINGLE_PLAYER => Some(GameKind::SinglePlayer),
            FLAGS_MULTI_PLAYER => Some(GameKind::MultiPlayer),
            _ => None,
        }
    }
}

/// The fixed 68-byte replay header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplayHeader {
    pub title: String,
    pub header_size: u32,
    /// Overall size of the compressed file. Informational only.
    pub compressed_size: u32,
    pub header_version: u32,
    /// Overall size of the decompressed payload, excluding the header.
    pub uncompressed_size: u32,
    pub block_count: u32,
    /// `WAR3` for Reign of Chaos, `W3XP` for The Frozen Throne.
    pub product: String,
    /// Minor patch number, e.g. 24 for 1.24.
    pub version: u32,
    pub build: u16,
    pub flags: u16,
    pub kind: GameKind,
    pub duration_ms: u32,
    pub checksum: u32,
}

impl ReplayHeader {
    pub fn duration(&self) -> GameClock {
        GameClock(self.duration_ms)
    }

    /// `1.<version>.<build>`, as shown by the game.
    pub fn patch(&self) -> String {
        format!("1.{}.{}", self.version, self.build)
    }
}

fn parse_header(i: &[u8]) -> IResult<&[u8], ReplayHeader> {
    let (i, title) = cstring(i)?;
    if title != TITLE {
        return Err(failure_from_kind(ErrorKind::BadTitle {
            expected: String::from_utf8_lossy(TITLE).into_owned(),
            found: String::from_utf8_lossy(title).into_owned(),
        }));
    }

    let (i, header_size) = le_u32(i)?;
    let (i, compressed_size) = le_u32(i)?;
    let (i, header_version) = le_u32(i)?;
    if header_size != SUPPORTED_HEADER_SIZE || header_version != SUPPORTED_HEADER_VERSION {
        return Err(failure_from_kind(ErrorKind::UnsupportedHeader {
            header_size,
            header_version,
        }));
    }

    let (i, uncompressed_size) = le_u32(i)?;
    let (i, block_count) = le_u32(i)?;
    // Stored byte-reversed: "PX3W" on disk is "W3XP"
    let (i, product) = reversed_tag(4)(i)?;
    let (i, version) = le_u32(i)?;
    let (i, build) = le_u16(i)?;
    let (i, flags) = le_u16(i)?;
    let kind =
        GameKind::from_flags(flags).ok_or(failure_from_kind(ErrorKind::InvalidGameFlags(flags)))?;
    let (i, duration_ms) = le_u32(i)?;
    let (i, checksum) = le_u32(i)?;

    Ok((
        i,
        ReplayHeader {
            title: String::from_utf8_lossy(title).into_owned(),
            header_size,
            compressed_size,
            header_version,
            uncompressed_size,
            block_count,
            product: String::from_utf8_lossy(&product).into_owned(),
            version,
            build,
            flags,
            kind,
            duration_ms,
            checksum,
        },
    ))
}

/// CRC-32 of the first 64 header bytes followed by the checksum field
/// itself as four zero bytes.
pub fn header_checksum(header: &[u8; CHECKSUM_OFFSET]) -> u32 {
    let mut crc = Crc::new();
    crc.update(header);
    crc.update(&[0u8; 4]);
    crc.sum()
}

/// Decodes and validates the header, leaving `cursor` at the first
/// compressed block.
pub fn decode_header(cursor: &mut ByteCursor<'_>) -> Result<ReplayHeader, ErrorKind> {
    let start = cursor.rest();
    let header = cursor.parse(parse_header)?;

    let covered: &[u8; CHECKSUM_OFFSET] = start
        .get(..CHECKSUM_OFFSET)
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or(ErrorKind::OutOfBounds {
            offset: 0,
            remaining: start.len(),
        })?;
    let computed = header_checksum(covered);
    if computed != header.checksum {
        return Err(ErrorKind::ChecksumMismatch {
            stored: header.checksum,
            computed,
        });
    }

    debug!(
        "replay header: {} {}, {:?}, {} block(s), {} bytes uncompressed",
        header.product,
        header.patch(),
        header.kind,
        header.block_count,
        header.uncompressed_size
    );

    Ok(header)
}
