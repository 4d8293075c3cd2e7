use std::io::Read;

use flate2::read::{DeflateDecoder, ZlibDecoder};
use nom::number::complete::{le_u16, le_u32};
use tracing::trace;

use crate::header::ReplayHeader;
use crate::{BlockEncoding, ByteCursor, ErrorKind, IResult};

/// Decompressed size of every block except possibly the last.
pub const BLOCK_SIZE: usize = 8192;

/// Sub-header preceding each compressed chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressedBlock {
    pub compressed_len: u16,
    pub uncompressed_len: u16,
}

fn parse_block_header(i: &[u8]) -> IResult<&[u8], CompressedBlock> {
    let (i, compressed_len) = le_u16(i)?;
    let (i, uncompressed_len) = le_u16(i)?;
    let (i, _reserved) = le_u32(i)?;
    Ok((
        i,
        CompressedBlock {
            compressed_len,
            uncompressed_len,
        },
    ))
}

/// Whether `data` opens with a plausible zlib header: deflate method and a
/// valid FCHECK.
fn has_zlib_header(data: &[u8]) -> bool {
    match data {
        [cmf, flg, ..] => cmf & 0x0F == 8 && ((u16::from(*cmf) << 8) | u16::from(*flg)) % 31 == 0,
        _ => false,
    }
}

/// Inflates `input` into `out`, returning how many bytes were produced. Never
/// writes past the end of `out`.
fn inflate_into(
    input: &[u8],
    out: &mut [u8],
    encoding: BlockEncoding,
) -> std::io::Result<usize> {
    let zlib = match encoding {
        BlockEncoding::Raw => false,
        BlockEncoding::Zlib => true,
        BlockEncoding::Auto => has_zlib_header(input),
    };
    let mut decoder: Box<dyn Read + '_> = if zlib {
        Box::new(ZlibDecoder::new(input))
    } else {
        Box::new(DeflateDecoder::new(input))
    };

    let mut produced = 0;
    while produced < out.len() {
        match decoder.read(&mut out[produced..])? {
            0 => break,
            n => produced += n,
        }
    }
    Ok(produced)
}

/// Reads `header.block_count` compressed blocks from `cursor` and reassembles
/// them into one buffer of `max(uncompressed_size, 8192)` bytes. Bytes past
/// the last block's output stay zero.
pub fn decompress_blocks(
    cursor: &mut ByteCursor<'_>,
    header: &ReplayHeader,
    encoding: BlockEncoding,
) -> Result<Vec<u8>, ErrorKind> {
    let capacity = (header.uncompressed_size as usize).max(BLOCK_SIZE);
    let mut out = vec![0u8; capacity];
    let mut written = 0usize;

    for index in 0..header.block_count {
        let block = cursor.parse(parse_block_header)?;
        let input = cursor.read_bytes(usize::from(block.compressed_len))?;

        let produced = inflate_into(input, &mut out[written..], encoding)
            .map_err(|err| ErrorKind::Inflate { index, err })?;
        if produced != usize::from(block.uncompressed_len) {
            return Err(ErrorKind::BlockSizeMismatch {
                index,
                declared: block.uncompressed_len,
                actual: produced,
            });
        }

        trace!(
            "block {index}: {} -> {} bytes at offset {written:#x}",
            block.compressed_len, block.uncompressed_len
        );
        written += produced;
    }

    Ok(out)
}
