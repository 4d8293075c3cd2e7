use thiserror::Error;

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("Nom error: {err:?}")]
    Nom { err: nom::error::ErrorKind },
    #[error("IO error: {err}")]
    IoError {
        #[from]
        err: std::io::Error,
    },
    #[error("wrong replay title: expected {expected:?}, found {found:?}")]
    BadTitle { expected: String, found: String },
    #[error(
        "unsupported replay header (size {header_size:#x}, version {header_version}); only size 0x44 / version 1 is supported"
    )]
    UnsupportedHeader { header_size: u32, header_version: u32 },
    #[error("header checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch { stored: u32, computed: u32 },
    #[error("invalid game flags {0:#06x}: expected 0x0000 or 0x8000")]
    InvalidGameFlags(u16),
    #[error("block {index} inflated to {actual} bytes, but its header declared {declared}")]
    BlockSizeMismatch {
        index: u32,
        declared: u16,
        actual: usize,
    },
    #[error("block {index} could not be inflated: {err}")]
    Inflate { index: u32, err: std::io::Error },
    #[error("unknown player record data tag {0:#04x}: expected 0x01 (custom) or 0x08 (ladder)")]
    UnknownPlayerRecordKind(u8),
    #[error("unexpected record id: expected {expected:#04x}, found {found:#04x}")]
    UnexpectedRecord { expected: u8, found: u8 },
    #[error("reference to unknown player id {0}")]
    UnknownPlayer(u8),
    #[error("player id {0} appears in more than one player record")]
    DuplicatePlayer(u8),
    #[error("invalid event block id {id:#04x} at offset {offset:#x}")]
    UnknownEventBlock { id: u8, offset: usize },
    #[error("time slice declares {0} following bytes, fewer than its 2-byte time increment")]
    MalformedTimeSlice(u16),
    #[error("unknown action opcode {opcode:#04x} for player {player}")]
    UnknownAction { opcode: u8, player: u8 },
    #[error("read past the end of the buffer at offset {offset:#x} ({remaining} byte(s) remaining)")]
    OutOfBounds { offset: usize, remaining: usize },
}

impl ErrorKind {
    /// Everything except a failure to read the input is a format error.
    pub fn is_format_error(&self) -> bool {
        !matches!(self, ErrorKind::IoError { .. })
    }
}

#[derive(Debug, Error)]
#[error("{kind}")]
pub struct Error {
    pub kind: ErrorKind,
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error { kind }
    }
}

impl<I> nom::error::ParseError<I> for Error {
    fn from_error_kind(_input: I, kind: nom::error::ErrorKind) -> Self {
        ErrorKind::Nom { err: kind }.into()
    }

    fn append(_input: I, _kind: nom::error::ErrorKind, other: Self) -> Self {
        other
    }
}

pub fn failure_from_kind(kind: ErrorKind) -> nom::Err<Error> {
    nom::Err::Failure(kind.into())
}

pub type IResult<I, T> = nom::IResult<I, T, Error>;
