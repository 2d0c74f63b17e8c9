//! Binary module codec for the replayer tracker.
//!
//! Reads and writes the classic 4-channel-family tracker container.
//! Decoding is strict about framing (sizes, signatures) and lenient about
//! musical values: a period the tables don't know becomes "no note", not
//! an error.

mod mod_format;

pub use mod_format::{load_module, save_module};

/// Why a byte buffer could not be decoded.
///
/// `ExtendedModule` is deliberately distinct from `Unrecognized`: callers
/// show "this format is not supported" for the former and "not a module
/// file" for the latter. Neither is recoverable for a given input.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FormatError {
    /// Shorter than the fixed header.
    #[error("file too short for module header")]
    TooShort,
    /// Recognized extended-module signature; a different format.
    #[error("extended module format is not supported")]
    ExtendedModule,
    /// Channel-count tag was unreadable or out of range.
    #[error("unrecognized channel tag {0:?}")]
    BadChannelTag([u8; 4]),
    /// Declared pattern or sample extents run past the buffer.
    #[error("file truncated: {0}")]
    Truncated(&'static str),
}

/// Why a module could not be encoded.
///
/// Encoding only fails on producer-side invariant violations; a module
/// built through the data model's edit functions always encodes.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EncodeError {
    /// A pattern's channel count disagrees with the module's.
    #[error("pattern {0} has {1} channels, module has {2}")]
    ShapeMismatch(u8, u8, u8),
    /// The sequence references a pattern the module does not contain.
    #[error("sequence references missing pattern {0}")]
    MissingPattern(u8),
}
