use std::io;

use thiserror::Error;

use crate::Tag;

/// Nesting limit for compounds and lists. Deeper trees are rejected so a
/// malicious file cannot overflow the stack.
pub const MAX_DEPTH: usize = 512;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors that can occur when decoding or encoding NBT, or when reading a
/// bit-packed array.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("invalid tag id {0}")]
    InvalidTag(u8),
    #[error("root tag must be a compound, found {}", .0.name())]
    RootNotCompound(Tag),
    #[error("negative {} length of {len}", .tag.name())]
    NegativeLength { tag: Tag, len: i32 },
    #[error("list with element type end has {0} elements")]
    NonEmptyEndList(i32),
    #[error("invalid modified UTF-8 string")]
    InvalidString,
    #[error("maximum nesting depth of {MAX_DEPTH} exceeded")]
    DepthLimit,
    #[error("{len} elements do not fit in a {} length prefix", .tag.name())]
    TooLong { tag: Tag, len: usize },
    #[error("bit width {0} is out of range")]
    InvalidBitWidth(u32),
    #[error("reading {width} bits at bit offset {offset} overruns a {len} byte buffer")]
    BitsOutOfRange { offset: usize, width: u32, len: usize },
    #[error(transparent)]
    Io(#[from] io::Error),
}
