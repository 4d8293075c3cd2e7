use nom::bytes::complete::{take, take_till};
use nom::number::complete::{le_u8, le_u16, le_u32};

use crate::{Error, ErrorKind, IResult};

/// Reads a zero-terminated byte string, returning the bytes before the terminator.
pub(crate) fn cstring(i: &[u8]) -> IResult<&[u8], &[u8]> {
    let (i, bytes) = take_till(|b| b == 0)(i)?;
    let (i, _) = take(1usize)(i)?;
    Ok((i, bytes))
}

/// Takes `n` bytes and returns them in reverse order. Product tags such as
/// `W3XP` are stored this way.
pub(crate) fn reversed_tag(n: usize) -> impl Fn(&[u8]) -> IResult<&[u8], Vec<u8>> {
    move |i| {
        let (i, bytes) = take(n)(i)?;
        Ok((i, bytes.iter().rev().copied().collect()))
    }
}

/// Little-endian sequential reader over an immutable byte buffer.
///
/// Every read either succeeds and advances the position, or fails with
/// [`ErrorKind::OutOfBounds`] and leaves the position where it was.
#[derive(Debug, Clone, Copy)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
    /// Absolute offset of `data[0]` in the buffer this cursor was split from.
    base: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        ByteCursor {
            data,
            pos: 0,
            base: 0,
        }
    }

    /// Absolute offset of the next byte to be read.
    pub fn offset(&self) -> usize {
        self.base + self.pos
    }

    /// Bytes read so far from this cursor's own window.
    pub fn consumed(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// The unread tail of the window.
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Runs a nom parser against the unread bytes and advances past what it consumed.
    pub fn parse<O, F>(&mut self, mut parser: F) -> Result<O, ErrorKind>
    where
        F: FnMut(&'a [u8]) -> IResult<&'a [u8], O>,
    {
        match parser(self.rest()) {
            Ok((rest, out)) => {
                self.pos = self.data.len() - rest.len();
                Ok(out)
            }
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(self.locate(e)),
            Err(nom::Err::Incomplete(_)) => Err(self.out_of_bounds()),
        }
    }

    fn locate(&self, e: Error) -> ErrorKind {
        match e.kind {
            ErrorKind::Nom { .. } => self.out_of_bounds(),
            kind => kind,
        }
    }

    fn out_of_bounds(&self) -> ErrorKind {
        ErrorKind::OutOfBounds {
            offset: self.offset(),
            remaining: self.remaining(),
        }
    }

    pub fn peek_u8(&self) -> Result<u8, ErrorKind> {
        self.rest()
            .first()
            .copied()
            .ok_or_else(|| self.out_of_bounds())
    }

    pub fn read_u8(&mut self) -> Result<u8, ErrorKind> {
        self.parse(le_u8)
    }

    pub fn read_u16(&mut self) -> Result<u16, ErrorKind> {
        self.parse(le_u16)
    }

    pub fn read_u32(&mut self) -> Result<u32, ErrorKind> {
        self.parse(le_u32)
    }

    /// Reads up to (and past) the next zero byte; the terminator is not returned.
    pub fn read_cstring(&mut self) -> Result<&'a [u8], ErrorKind> {
        self.parse(cstring)
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], ErrorKind> {
        self.parse(take(n))
    }

    /// See [`reversed_tag`].
    pub fn read_reversed_tag(&mut self, n: usize) -> Result<Vec<u8>, ErrorKind> {
        self.parse(reversed_tag(n))
    }

    pub fn skip(&mut self, n: usize) -> Result<(), ErrorKind> {
        self.read_bytes(n).map(|_| ())
    }

    /// Splits off the next `n` bytes as their own cursor and advances past them.
    pub fn take(&mut self, n: usize) -> Result<ByteCursor<'a>, ErrorKind> {
        let base = self.offset();
        let data = self.read_bytes(n)?;
        Ok(ByteCursor { data, pos: 0, base })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian_words() {
        let data = [0x01, 0x34, 0x12, 0x78, 0x56, 0x34, 0x12];
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.peek_u8().unwrap(), 0x01);
        assert_eq!(cursor.read_u8().unwrap(), 0x01);
        assert_eq!(cursor.read_u16().unwrap(), 0x1234);
        assert_eq!(cursor.read_u32().unwrap(), 0x1234_5678);
        assert!(cursor.is_empty());
    }

    #[test]
    fn cstring_excludes_terminator() {
        let data = b"gg\0rest";
        let mut cursor = ByteCursor::new(data);
        assert_eq!(cursor.read_cstring().unwrap(), b"gg");
        assert_eq!(cursor.offset(), 3);
        assert_eq!(cursor.rest(), b"rest");
    }

    #[test]
    fn unterminated_cstring_is_out_of_bounds() {
        let mut cursor = ByteCursor::new(b"abc");
        assert!(matches!(
            cursor.read_cstring(),
            Err(ErrorKind::OutOfBounds { offset: 0, .. })
        ));
        assert_eq!(cursor.offset(), 0);
    }

    #[test]
    fn reads_reversed_tags() {
        let mut cursor = ByteCursor::new(b"PX3W");
        assert_eq!(cursor.read_reversed_tag(4).unwrap(), b"W3XP");
        assert!(cursor.is_empty());

        let (rest, tag) = reversed_tag(4)(&b"3RAWxyz"[..]).unwrap();
        assert_eq!(tag, b"WAR3");
        assert_eq!(rest, b"xyz");
        assert!(reversed_tag(4)(&b"3RA"[..]).is_err());
    }

    #[test]
    fn overrun_reports_offset_and_does_not_advance() {
        let data = [0u8; 5];
        let mut cursor = ByteCursor::new(&data);
        cursor.skip(3).unwrap();
        match cursor.read_u32() {
            Err(ErrorKind::OutOfBounds { offset, remaining }) => {
                assert_eq!(offset, 3);
                assert_eq!(remaining, 2);
            }
            other => panic!("expected OutOfBounds, got {other:?}"),
        }
        assert_eq!(cursor.offset(), 3);
    }

    #[test]
    fn sub_cursor_keeps_absolute_offsets() {
        let data = [9u8, 1, 2, 3, 4];
        let mut cursor = ByteCursor::new(&data);
        cursor.skip(1).unwrap();
        let mut window = cursor.take(2).unwrap();
        assert_eq!(cursor.offset(), 3);
        assert_eq!(window.read_u8().unwrap(), 1);
        assert_eq!(window.read_u8().unwrap(), 2);
        assert!(matches!(
            window.read_u8(),
            Err(ErrorKind::OutOfBounds { offset: 3, remaining: 0 })
        ));
    }

    #[test]
    fn custom_failures_pass_through_parse() {
        fn reject(_: &[u8]) -> IResult<&[u8], ()> {
            Err(crate::failure_from_kind(ErrorKind::UnknownPlayer(4)))
        }
        let mut cursor = ByteCursor::new(&[1, 2, 3]);
        assert!(matches!(
            cursor.parse(reject),
            Err(ErrorKind::UnknownPlayer(4))
        ));
    }
}
