//! Byte-at-a-time access to a source with one byte of lookback.

use std::io::{BufRead, BufReader, ErrorKind, Read};

/// Yields the bytes of a source one at a time and remembers the byte before
/// the current one.
///
/// Reads go through an internal [`BufReader`]; the cursor itself holds no more
/// than the current and the previous byte. I/O failures are returned unchanged
/// and never retried, except [`ErrorKind::Interrupted`] which is not a failure.
///
/// # Examples
///
/// ```
/// use picarc::cursor::ByteCursor;
/// use std::io::Cursor;
///
/// let mut cursor = ByteCursor::new(Cursor::new(b"ab".to_vec()));
/// assert_eq!(cursor.next_byte()?, Some(b'a'));
/// assert_eq!(cursor.lookback(), None);
/// assert_eq!(cursor.next_byte()?, Some(b'b'));
/// assert_eq!(cursor.lookback(), Some(b'a'));
/// assert_eq!(cursor.next_byte()?, None);
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug)]
pub struct ByteCursor<R: Read> {
    reader: BufReader<R>,
    current: Option<u8>,
    lookback: Option<u8>,
    position: u64,
}

impl<R: Read> ByteCursor<R> {
    /// Create a cursor positioned before the first byte of `reader`.
    pub fn new(reader: R) -> Self {
        ByteCursor {
            reader: BufReader::with_capacity(64 * 1024, reader),
            current: None,
            lookback: None,
            position: 0,
        }
    }

    /// Advance to the next byte.
    ///
    /// Returns `Ok(None)` once the source is exhausted.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the source cannot be read.
    pub fn next_byte(&mut self) -> std::io::Result<Option<u8>> {
        let byte = loop {
            match self.reader.fill_buf() {
                Ok(buf) => break buf.first().copied(),
                Err(e) if e.kind() == ErrorKind::Interrupted => {},
                Err(e) => return Err(e),
            }
        };

        if let Some(byte) = byte {
            self.reader.consume(1);
            self.lookback = self.current;
            self.current = Some(byte);
            self.position += 1;
        }
        Ok(byte)
    }

    /// The byte immediately before the one last returned by [`next_byte`](Self::next_byte).
    #[must_use]
    pub fn lookback(&self) -> Option<u8> {
        self.lookback
    }

    /// Number of bytes consumed so far; the offset of the current byte is `position() - 1`.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor};

    #[test]
    fn test_empty_source() {
        let mut cursor = ByteCursor::new(Cursor::new(Vec::new()));
        assert_eq!(cursor.next_byte().unwrap(), None);
        assert_eq!(cursor.lookback(), None);
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn test_lookback_tracks_previous_byte() {
        let mut cursor = ByteCursor::new(Cursor::new(b"xyz".to_vec()));
        let mut seen = Vec::new();
        while let Some(byte) = cursor.next_byte().unwrap() {
            seen.push((byte, cursor.lookback()));
        }
        assert_eq!(
            seen,
            vec![(b'x', None), (b'y', Some(b'x')), (b'z', Some(b'y'))]
        );
        assert_eq!(cursor.position(), 3);
    }

    #[test]
    fn test_end_of_stream_keeps_state() {
        let mut cursor = ByteCursor::new(Cursor::new(b"ab".to_vec()));
        cursor.next_byte().unwrap();
        cursor.next_byte().unwrap();
        assert_eq!(cursor.next_byte().unwrap(), None);
        assert_eq!(cursor.lookback(), Some(b'a'));
        assert_eq!(cursor.next_byte().unwrap(), None);
    }

    #[derive(Debug)]
    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(ErrorKind::PermissionDenied, "denied"))
        }
    }

    #[test]
    fn test_io_error_kind_is_propagated() {
        let mut cursor = ByteCursor::new(FailingReader);
        let err = cursor.next_byte().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    }
}
