//! Error types shared by the ODS-2 volume reader crates.

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] IoError),
    #[error("decode: {0}")]
    Decode(#[from] DecodeError),
    #[error("file header fid does not match the requested fid")]
    FidMismatch,
    #[error("vbn is not covered by any extent")]
    VbnNotMapped,
    #[error("not a directory")]
    NotADirectory,
    #[error("not found")]
    NotFound,
    #[error("already mounted")]
    AlreadyMounted,
    #[error("not mounted")]
    NotMounted,
}

#[derive(thiserror::Error, Debug)]
pub enum IoError {
    #[error("read-only")]
    ReadOnly,
    #[error("short read at offset {offset}: wanted {wanted} bytes, got {got}")]
    ShortRead { offset: u64, wanted: usize, got: usize },
    #[error("seek to {offset} is past the end of the device ({size} bytes)")]
    SeekPastEnd { offset: u64, size: u64 },
    #[error(transparent)]
    Os(std::io::Error),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(IoError::Os(err))
    }
}

/// The kind of malformed on-disk structure a decoder rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeErrorKind {
    ShortBuffer,
    BadFormat,
    SizeMismatch,
    OutOfBounds,
}

impl std::fmt::Display for DecodeErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DecodeErrorKind::ShortBuffer => "buffer too short",
            DecodeErrorKind::BadFormat => "malformed record",
            DecodeErrorKind::SizeMismatch => "size mismatch",
            DecodeErrorKind::OutOfBounds => "region out of bounds",
        };
        f.write_str(s)
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{kind} at offset {offset}")]
pub struct DecodeError {
    pub kind: DecodeErrorKind,
    pub offset: usize,
}

impl DecodeError {
    pub fn new(kind: DecodeErrorKind, offset: usize) -> Self {
        Self { kind, offset }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
