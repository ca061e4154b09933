//! Errors reported by the pipeline.
//!
//! None of these are fatal. The call that produced them has no effect, and the context keeps the
//! last one around until it is read with [`Context::take_error`](crate::Context::take_error).

use thiserror::Error;

use crate::matrix::MatrixMode;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("{0:?} matrix stack overflow")]
    StackOverflow(MatrixMode),

    #[error("{0:?} matrix stack underflow")]
    StackUnderflow(MatrixMode),

    #[error("invalid enum 0x{0:04X}")]
    InvalidEnum(u32),

    #[error("invalid value passed to {0}")]
    InvalidValue(&'static str),

    #[error("{0} called in the wrong begin/end state")]
    BracketMisuse(&'static str),

    #[error("resize callback rejected {width}x{height}")]
    ResizeFailed { width: i32, height: i32 },
}

pub type Result<T> = core::result::Result<T, Error>;
