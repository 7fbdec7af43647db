//! Classification of raw PICA+ bytes into structural kinds.
//!
//! PICA+ dumps reuse a handful of control bytes both as delimiters and as
//! ordinary content. Whether a byte is structural depends on the byte right
//! before it, so classification takes the current byte together with its
//! lookback byte and returns one [`ByteKind`]. Everything downstream matches on
//! the kind and never compares raw bytes again.
//!
//! # Examples
//!
//! ```
//! use picarc::classify::{classify, ByteKind};
//!
//! // A subfield separator after a space delimits tag and payload.
//! assert_eq!(classify(0x1F, Some(b' ')), ByteKind::SubfieldSep);
//! // Anywhere else it is content, split later by the tokenizer.
//! assert_eq!(classify(0x1F, Some(b'a')), ByteKind::Data(0x1F));
//! ```

/// Carriage return.
pub const CARRIAGE_RETURN: u8 = 0x0D;
/// Line feed.
pub const LINE_FEED: u8 = 0x0A;
/// Field terminator; ends a line when it follows a line feed.
pub const FIELD_TERMINATOR: u8 = 0x1E;
/// Record terminator; ends a record when it follows a line feed.
pub const RECORD_TERMINATOR: u8 = 0x1D;
/// Subfield separator; delimits tag and payload when it follows a space.
pub const SUBFIELD_SEPARATOR: u8 = 0x1F;
/// UTF-8 lead byte of the combining diacritical marks (U+0300..U+033F).
pub const UNICODE_LEAD: u8 = 0xCC;

/// Structural meaning of a byte given the byte before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteKind {
    /// Content byte, decoded into the current line.
    Data(u8),
    /// End of a logical line (`CR LF` or `LF 0x1E`).
    FieldEnd,
    /// End of a record (`LF 0x1D`).
    RecordEnd,
    /// Tag/payload delimiter (`SP 0x1F`).
    SubfieldSep,
    /// Lead byte of a combining mark that must be composed with the previous character.
    UnicodeLead,
    /// Structural byte without an effect of its own: bare `CR`, bare `LF` and
    /// field terminators that do not follow a line feed.
    Control,
}

/// Classify `current` using the `lookback` byte that preceded it in the stream.
///
/// `lookback` is `None` for the first byte of a stream.
#[must_use]
pub fn classify(current: u8, lookback: Option<u8>) -> ByteKind {
    match (current, lookback) {
        (LINE_FEED, Some(CARRIAGE_RETURN)) | (FIELD_TERMINATOR, Some(LINE_FEED)) => {
            ByteKind::FieldEnd
        },
        (RECORD_TERMINATOR, Some(LINE_FEED)) => ByteKind::RecordEnd,
        (SUBFIELD_SEPARATOR, Some(b' ')) => ByteKind::SubfieldSep,
        (UNICODE_LEAD, _) => ByteKind::UnicodeLead,
        (CARRIAGE_RETURN | LINE_FEED | FIELD_TERMINATOR, _) => ByteKind::Control,
        (byte, _) => ByteKind::Data(byte),
    }
}
