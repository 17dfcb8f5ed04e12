use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::trace;

use super::VerifyError;

/// Receives each piece as soon as it is complete.
pub(crate) trait PieceSink {
    /// Handle piece `index`. The sink may swap `data` for another buffer;
    /// whatever is left behind is cleared and refilled with the next piece.
    fn piece(&mut self, index: usize, data: &mut Vec<u8>) -> Result<(), VerifyError>;
}

/// Allocate an empty piece buffer, failing with [`VerifyError::Alloc`]
/// instead of aborting when `capacity` bytes are not available.
pub(crate) fn piece_buffer(capacity: usize) -> Result<Vec<u8>, VerifyError> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(capacity)
        .map_err(|source| VerifyError::Alloc {
            size: capacity,
            source,
        })?;
    Ok(buffer)
}

/// Cuts the concatenated payload into pieces, ignoring file boundaries.
pub(crate) struct PieceAssembler {
    piece_length: usize,
    buffer: Vec<u8>,
    next_index: usize,
}

impl PieceAssembler {
    /// `capacity` is what the first buffer reserves up front; it never needs
    /// to exceed the payload size, however long the torrent claims pieces are.
    pub fn new(piece_length: usize, capacity: usize) -> Result<Self, VerifyError> {
        Ok(Self {
            piece_length,
            buffer: piece_buffer(capacity)?,
            next_index: 0,
        })
    }

    /// Number of pieces handed to a sink so far.
    pub fn pieces_emitted(&self) -> usize {
        self.next_index
    }

    /// Append the contents of `path`, emitting every piece it completes. A
    /// partial piece at the end carries over to the next file.
    pub fn feed_file(&mut self, path: &Path, sink: &mut dyn PieceSink) -> Result<(), VerifyError> {
        let read_err = |source| VerifyError::Read {
            path: path.to_path_buf(),
            source,
        };
        let mut file = File::open(path).map_err(read_err)?;

        loop {
            let wanted = self.piece_length - self.buffer.len();
            let read = (&mut file)
                .take(wanted as u64)
                .read_to_end(&mut self.buffer)
                .map_err(read_err)?;
            trace!(path = %path.display(), read, "read chunk");

            if self.buffer.len() == self.piece_length {
                self.emit(sink)?;
            }
            if read < wanted {
                return Ok(());
            }
        }
    }

    /// Emit the trailing partial piece, if any.
    pub fn finish(&mut self, sink: &mut dyn PieceSink) -> Result<(), VerifyError> {
        if !self.buffer.is_empty() {
            self.emit(sink)?;
        }
        Ok(())
    }

    fn emit(&mut self, sink: &mut dyn PieceSink) -> Result<(), VerifyError> {
        sink.piece(self.next_index, &mut self.buffer)?;
        self.next_index += 1;
        self.buffer.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    #[derive(Default)]
    struct Collect {
        pieces: Vec<(usize, Vec<u8>)>,
    }

    impl PieceSink for Collect {
        fn piece(&mut self, index: usize, data: &mut Vec<u8>) -> Result<(), VerifyError> {
            self.pieces.push((index, data.clone()));
            Ok(())
        }
    }

    #[test]
    fn test_pieces_span_file_boundaries() {
        let dir = tempfile::tempdir().unwrap();
        let a = test_support::payload(10, 1);
        let b = test_support::payload(7, 2);
        let c = test_support::payload(0, 3);
        let d = test_support::payload(5, 4);
        for (name, data) in [("a", &a), ("b", &b), ("c", &c), ("d", &d)] {
            test_support::write_file(dir.path(), &[name], data);
        }

        let mut assembler = PieceAssembler::new(8, 8).unwrap();
        let mut sink = Collect::default();
        for name in ["a", "b", "c", "d"] {
            assembler.feed_file(&dir.path().join(name), &mut sink).unwrap();
        }
        assembler.finish(&mut sink).unwrap();

        let stream: Vec<u8> = [a, b, c, d].concat();
        let expected: Vec<(usize, Vec<u8>)> = stream
            .chunks(8)
            .enumerate()
            .map(|(i, chunk)| (i, chunk.to_vec()))
            .collect();
        assert_eq!(sink.pieces, expected);
        assert_eq!(assembler.pieces_emitted(), 3);
    }

    #[test]
    fn test_exact_multiple_has_no_trailing_piece() {
        let dir = tempfile::tempdir().unwrap();
        test_support::write_file(dir.path(), &["a"], &[1u8; 16]);

        let mut assembler = PieceAssembler::new(8, 8).unwrap();
        let mut sink = Collect::default();
        assembler.feed_file(&dir.path().join("a"), &mut sink).unwrap();
        assembler.finish(&mut sink).unwrap();
        assert_eq!(sink.pieces.len(), 2);
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut assembler = PieceAssembler::new(8, 8).unwrap();
        let err = assembler
            .feed_file(&dir.path().join("gone"), &mut Collect::default())
            .unwrap_err();
        assert!(matches!(err, VerifyError::Read { .. }));
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_unavailable_capacity_is_an_error() {
        let err = piece_buffer(1 << 62).unwrap_err();
        assert!(matches!(err, VerifyError::Alloc { size, .. } if size == 1 << 62));

        assert!(piece_buffer(0).unwrap().is_empty());
        assert!(piece_buffer(64).unwrap().capacity() >= 64);
    }

    #[test]
    fn test_small_capacity_still_fills_whole_pieces() {
        let dir = tempfile::tempdir().unwrap();
        let data = test_support::payload(20, 5);
        test_support::write_file(dir.path(), &["a"], &data);

        let mut assembler = PieceAssembler::new(8, 2).unwrap();
        let mut sink = Collect::default();
        assembler.feed_file(&dir.path().join("a"), &mut sink).unwrap();
        assembler.finish(&mut sink).unwrap();

        let lengths: Vec<usize> = sink.pieces.iter().map(|(_, data)| data.len()).collect();
        assert_eq!(lengths, vec![8, 8, 4]);
    }
}
