// A library symbolizing native crash and stack trace logs.
//
// symsift acts as a streaming filter: bytes go in as arbitrarily
// sized chunks, lines referencing a shared library and an offset
// within it come out rewritten to carry a human readable symbol name,
// and everything else is passed through unchanged.
#![doc = include_str!("../README.md")]

mod cache;
mod error;
mod frame;
mod lines;
mod log;
mod source;
mod symbolize;

pub use crate::error::Error;
pub use crate::error::ErrorExt;
pub use crate::error::ErrorKind;
pub use crate::error::IntoCowStr;
pub use crate::error::Result;
pub use crate::lines::CompleteLines;
pub use crate::lines::LineBuffer;
pub use crate::source::LibSym;
pub use crate::source::NmTool;
pub use crate::source::SymbolSource;
pub use crate::symbolize::SymFilter;
pub use crate::symbolize::Symbolizer;

/// A type representing addresses and offsets within a library.
pub type Addr = u64;
