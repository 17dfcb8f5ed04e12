use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use torrent_verify::verify::{Engine, VerifyConfig};

/// Verify downloaded data against .torrent files.
///
/// Exits with 0 when every torrent loaded and, with `--verify`, every
/// torrent's data verified; otherwise exits non-zero.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Args {
    /// Show information about each torrent
    #[arg(short, long)]
    pub info: bool,

    /// Don't write any output
    #[arg(short, long)]
    pub silent: bool,

    /// Print a single field for use in scripts
    #[arg(short = 'S', long, value_enum, value_name = "FIELD")]
    pub script: Option<ScriptField>,

    /// Don't use the torrent name as a folder when verifying
    #[arg(short, long = "no-torrent-dir")]
    pub no_torrent_dir: bool,

    /// Verify each torrent against the data under PATH
    #[arg(short, long, value_name = "PATH")]
    pub verify: Option<PathBuf>,

    /// Number of hashing threads (default: one per CPU)
    #[arg(short = 'j', long, value_name = "N")]
    pub threads: Option<usize>,

    /// Hash on the main thread only
    #[arg(long)]
    pub sequential: bool,

    /// Torrent files or http(s) URLs
    #[arg(required = true, value_name = "TORRENT")]
    pub torrents: Vec<String>,
}

/// Fields printable with `--script`.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScriptField {
    /// Lowercase hex info hash
    Infohash,
}

impl Args {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn verify_config(&self) -> VerifyConfig {
        VerifyConfig {
            engine: if self.sequential {
                Engine::Sequential
            } else {
                Engine::Concurrent
            },
            threads: self.threads,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_verify_flags() {
        let args = Args::try_parse_from([
            "torrent-verify",
            "-n",
            "-v",
            "/data",
            "-j",
            "4",
            "a.torrent",
            "b.torrent",
        ])
        .unwrap();
        assert!(args.no_torrent_dir);
        assert_eq!(args.verify, Some(PathBuf::from("/data")));
        assert_eq!(args.torrents, vec!["a.torrent", "b.torrent"]);

        let config = args.verify_config();
        assert_eq!(config.engine, Engine::Concurrent);
        assert_eq!(config.threads, Some(4));
    }

    #[test]
    fn test_parse_info_and_script() {
        let args =
            Args::try_parse_from(["torrent-verify", "-i", "-S", "infohash", "x.torrent"]).unwrap();
        assert!(args.info);
        assert_eq!(args.script, Some(ScriptField::Infohash));
        assert!(args.verify.is_none());

        let args =
            Args::try_parse_from(["torrent-verify", "--sequential", "-s", "x.torrent"]).unwrap();
        assert!(args.silent);
        assert_eq!(args.verify_config().engine, Engine::Sequential);
    }

    #[test]
    fn test_requires_a_torrent() {
        assert!(Args::try_parse_from(["torrent-verify", "-i"]).is_err());
        assert!(Args::try_parse_from(["torrent-verify", "-S", "name", "x.torrent"]).is_err());
    }
}
