use std::io::{self, Read};
use std::time::{Duration, Instant};

use tracing::info;

use super::error::MetainfoError;

/// Quiet period before a download starts reporting progress.
const PROGRESS_DELAY: Duration = Duration::from_secs(1);
const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

/// State of a download, handed to the progress callback of
/// [`fetch_with_progress`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadProgress {
    /// `received` bytes so far; `total` when the server sent a length.
    Running { received: u64, total: Option<u64> },
    /// The transfer ended after progress had been reported.
    Done,
}

pub(super) fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Download a torrent over HTTP(S), refusing bodies larger than `limit`.
pub fn fetch(url: &str, limit: u64) -> Result<Vec<u8>, MetainfoError> {
    fetch_with_progress(url, limit, &mut |_| {})
}

/// Like [`fetch`], reporting progress once the download has run for a
/// second, then every half second.
pub fn fetch_with_progress(
    url: &str,
    limit: u64,
    on_progress: &mut dyn FnMut(DownloadProgress),
) -> Result<Vec<u8>, MetainfoError> {
    let fetch_err = |source| MetainfoError::Fetch {
        url: url.to_string(),
        source,
    };

    let client = reqwest::blocking::Client::new();
    let response = client
        .get(url)
        .send()
        .and_then(|response| response.error_for_status())
        .map_err(fetch_err)?;

    let total = response.content_length();
    if let Some(size) = total {
        if size > limit {
            return Err(MetainfoError::TooLarge { size, limit });
        }
    }
    info!(url, size = ?total, "downloading torrent");

    let mut bytes = Vec::new();
    let mut throttle = Throttle::new(Instant::now());
    let read = read_body(response.take(limit + 1), &mut bytes, |received| {
        if throttle.due(Instant::now()) {
            on_progress(DownloadProgress::Running { received, total });
        }
    });
    if throttle.shown() {
        on_progress(DownloadProgress::Done);
    }
    read.map_err(|source| MetainfoError::Transfer {
        url: url.to_string(),
        source,
    })?;

    let size = bytes.len() as u64;
    if size > limit {
        return Err(MetainfoError::TooLarge { size, limit });
    }

    info!(url, size, "downloaded torrent");
    Ok(bytes)
}

fn read_body(
    mut body: impl Read,
    bytes: &mut Vec<u8>,
    mut on_chunk: impl FnMut(u64),
) -> io::Result<()> {
    let mut chunk = [0u8; 16 * 1024];
    loop {
        match body.read(&mut chunk) {
            Ok(0) => return Ok(()),
            Ok(n) => {
                bytes.extend_from_slice(&chunk[..n]);
                on_chunk(bytes.len() as u64);
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
}

struct Throttle {
    started: Instant,
    last: Option<Instant>,
}

impl Throttle {
    fn new(started: Instant) -> Self {
        Self {
            started,
            last: None,
        }
    }

    fn due(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.started) < PROGRESS_DELAY {
            return false;
        }
        match self.last {
            Some(last) if now.saturating_duration_since(last) < PROGRESS_INTERVAL => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }

    fn shown(&self) -> bool {
        self.last.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("http://example.com/a.torrent"));
        assert!(is_url("https://example.com/a.torrent"));
        assert!(!is_url("httpx.torrent"));
        assert!(!is_url("/tmp/http://weird"));
        assert!(!is_url("ftp://example.com/a.torrent"));
    }

    #[test]
    fn test_fetch_unreachable_host() {
        // Nothing serves HTTP on the discard port.
        let mut reports = 0;
        let err = fetch_with_progress("http://127.0.0.1:9/a.torrent", 1024, &mut |_| reports += 1)
            .unwrap_err();
        assert!(matches!(err, MetainfoError::Fetch { .. }));
        assert!(err.is_resource());
        assert_eq!(reports, 0);
    }

    #[test]
    fn test_progress_waits_then_throttles() {
        let start = Instant::now();
        let mut throttle = Throttle::new(start);
        assert!(!throttle.due(start));
        assert!(!throttle.due(start + Duration::from_millis(999)));
        assert!(!throttle.shown());

        let first = start + PROGRESS_DELAY;
        assert!(throttle.due(first));
        assert!(throttle.shown());
        assert!(!throttle.due(first + Duration::from_millis(100)));
        assert!(throttle.due(first + PROGRESS_INTERVAL));
    }

    #[test]
    fn test_read_body_reports_running_total() {
        let data = vec![7u8; 40_000];
        let mut bytes = Vec::new();
        let mut seen = Vec::new();
        read_body(&data[..], &mut bytes, |received| seen.push(received)).unwrap();

        assert_eq!(bytes, data);
        assert_eq!(seen.last(), Some(&40_000));
        assert!(seen.windows(2).all(|pair| pair[0] < pair[1]));
    }
}
