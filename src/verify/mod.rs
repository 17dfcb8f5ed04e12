//! Checking payload data on disk against a torrent's piece hashes.
//!
//! Verification runs in two phases. First every payload file must exist and
//! be readable; nothing is hashed until that holds. Then the files are read
//! in stream order, cut into pieces and each piece is compared with its
//! SHA-1 from the torrent, either on the calling thread or through a pool of
//! hashing workers.

mod assembler;
mod path;
mod pipeline;
mod walker;


use std::collections::TryReserveError;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use sha1::{Digest, Sha1};
use thiserror::Error;
use tracing::{debug, info};

use crate::torrent::{Metainfo, MetainfoError, PieceHash};

use assembler::{PieceAssembler, PieceSink};
use pipeline::Pipeline;

pub use path::resolve_path;
pub use walker::for_each_file;

#[derive(Debug, Error)]
pub enum VerifyError {
    /// A payload file is missing or cannot be opened.
    #[error("{}: {source}", path.display())]
    Missing { path: PathBuf, source: io::Error },

    /// A payload file failed while being read.
    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("piece {index} does not match its hash")]
    PieceMismatch { index: usize },

    #[error("data continues past the last of {piece_count} pieces")]
    ExcessData { piece_count: usize },

    #[error("data ends before piece {index}")]
    MissingPiece { index: usize },

    #[error("piece length is missing or not positive")]
    InvalidPieceLength,

    #[error("cannot allocate a {size}-byte piece buffer: {source}")]
    Alloc {
        size: usize,
        source: TryReserveError,
    },

    #[error(transparent)]
    Metainfo(#[from] MetainfoError),

    #[error("failed to start hashing worker: {0}")]
    Spawn(#[source] io::Error),

    #[error("a hashing worker exited unexpectedly")]
    WorkerLost,
}

impl VerifyError {
    /// True when the data was read but does not match the torrent.
    pub fn is_content_mismatch(&self) -> bool {
        matches!(
            self,
            VerifyError::PieceMismatch { .. }
                | VerifyError::ExcessData { .. }
                | VerifyError::MissingPiece { .. }
        )
    }
}

/// How pieces are hashed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Engine {
    /// Read and hash on the calling thread.
    Sequential,
    /// Read on the calling thread, hash on a worker pool.
    #[default]
    Concurrent,
}

/// Configuration for a verification run.
#[derive(Debug, Clone, Default)]
pub struct VerifyConfig {
    pub engine: Engine,
    /// Hashing workers for [`Engine::Concurrent`]; the number of CPUs when
    /// unset.
    pub threads: Option<usize>,
}

impl VerifyConfig {
    pub fn worker_count(&self) -> usize {
        self.threads.unwrap_or_else(num_cpus::get).max(1)
    }
}

/// Where a run is, passed to the progress callback before each file is read.
#[derive(Debug, Clone, Copy)]
pub struct FileProgress<'p> {
    /// 1-based position of the file.
    pub index: usize,
    pub count: usize,
    pub path: &'p Path,
}

type ProgressFn<'a> = Box<dyn FnMut(FileProgress<'_>) + 'a>;

/// A verification run over one torrent.
pub struct Verifier<'a> {
    meta: &'a Metainfo,
    data_dir: PathBuf,
    use_torrent_folder: bool,
    config: VerifyConfig,
    on_file: Option<ProgressFn<'a>>,
}

impl<'a> Verifier<'a> {
    pub fn new(meta: &'a Metainfo, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            meta,
            data_dir: data_dir.into(),
            use_torrent_folder: true,
            config: VerifyConfig::default(),
            on_file: None,
        }
    }

    /// Whether multi-file payloads sit in a folder named after the torrent.
    /// On by default.
    pub fn use_torrent_folder(mut self, enabled: bool) -> Self {
        self.use_torrent_folder = enabled;
        self
    }

    pub fn config(mut self, config: VerifyConfig) -> Self {
        self.config = config;
        self
    }

    pub fn on_file(mut self, callback: impl FnMut(FileProgress<'_>) + 'a) -> Self {
        self.on_file = Some(Box::new(callback));
        self
    }

    pub fn run(mut self) -> Result<(), VerifyError> {
        self.check_files_exist()?;

        let piece_length = self
            .meta
            .piece_length()
            .and_then(|n| usize::try_from(n).ok())
            .ok_or(VerifyError::InvalidPieceLength)?;
        let capacity = buffer_capacity(self.meta, piece_length)?;

        match self.config.engine {
            Engine::Sequential => self.check_sequential(piece_length, capacity),
            Engine::Concurrent => self.check_concurrent(piece_length, capacity),
        }
    }

    fn check_files_exist(&self) -> Result<(), VerifyError> {
        for_each_file(self.meta, &self.data_dir, self.use_torrent_folder, |path, _| {
            File::open(path)
                .map(drop)
                .map_err(|source| VerifyError::Missing {
                    path: path.to_path_buf(),
                    source,
                })
        })?;
        debug!("all payload files present");
        Ok(())
    }

    fn check_sequential(
        &mut self,
        piece_length: usize,
        capacity: usize,
    ) -> Result<(), VerifyError> {
        info!(pieces = self.meta.piece_count(), "verifying sequentially");
        let mut assembler = PieceAssembler::new(piece_length, capacity)?;
        let mut checker = HashChecker { meta: self.meta };
        self.read_pieces(&mut assembler, &mut checker)?;
        ensure_complete(self.meta, &assembler)
    }

    fn check_concurrent(
        &mut self,
        piece_length: usize,
        capacity: usize,
    ) -> Result<(), VerifyError> {
        let workers = self.config.worker_count();
        info!(pieces = self.meta.piece_count(), workers, "verifying concurrently");

        let mut assembler = PieceAssembler::new(piece_length, capacity)?;
        let mut pipeline = Pipeline::start(self.meta, capacity, workers)?;
        let read = self.read_pieces(&mut assembler, &mut pipeline);
        let settled = pipeline.finish();

        // A settled mismatch sits earlier in the stream than anything the
        // reader stopped on.
        settled?;
        read?;
        ensure_complete(self.meta, &assembler)
    }

    fn read_pieces(
        &mut self,
        assembler: &mut PieceAssembler,
        sink: &mut dyn PieceSink,
    ) -> Result<(), VerifyError> {
        let count = self.meta.file_count();
        let mut index = 0;
        let on_file = &mut self.on_file;
        for_each_file(self.meta, &self.data_dir, self.use_torrent_folder, |path, _| {
            index += 1;
            if let Some(callback) = on_file.as_mut() {
                callback(FileProgress { index, count, path });
            }
            assembler.feed_file(path, sink)
        })?;
        assembler.finish(sink)
    }
}

/// Verify the payload of `meta` under `data_dir` with the default
/// configuration.
pub fn verify(
    meta: &Metainfo,
    data_dir: impl AsRef<Path>,
    use_torrent_folder: bool,
) -> Result<(), VerifyError> {
    Verifier::new(meta, data_dir.as_ref())
        .use_torrent_folder(use_torrent_folder)
        .run()
}

struct HashChecker<'m> {
    meta: &'m Metainfo,
}

impl PieceSink for HashChecker<'_> {
    fn piece(&mut self, index: usize, data: &mut Vec<u8>) -> Result<(), VerifyError> {
        let expected = expected_hash(self.meta, index)?;
        if !piece_matches(data, expected) {
            return Err(VerifyError::PieceMismatch { index });
        }
        debug!(index, "piece verified");
        Ok(())
    }
}

/// Bytes to reserve per piece buffer: a piece is never larger than the
/// payload it is cut from.
fn buffer_capacity(meta: &Metainfo, piece_length: usize) -> Result<usize, VerifyError> {
    let total = meta.total_length()?;
    Ok(usize::try_from(total).map_or(piece_length, |total| total.min(piece_length)))
}

fn expected_hash(meta: &Metainfo, index: usize) -> Result<&PieceHash, VerifyError> {
    meta.piece_hash(index).ok_or(VerifyError::ExcessData {
        piece_count: meta.piece_count(),
    })
}

fn piece_matches(data: &[u8], expected: &PieceHash) -> bool {
    let actual: PieceHash = Sha1::digest(data).into();
    &actual == expected
}

fn ensure_complete(meta: &Metainfo, assembler: &PieceAssembler) -> Result<(), VerifyError> {
    let emitted = assembler.pieces_emitted();
    if emitted < meta.piece_count() {
        return Err(VerifyError::MissingPiece { index: emitted });
    }
    Ok(())
}
