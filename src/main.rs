use std::io::{self, IsTerminal, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use torrent_verify::torrent::{self, DownloadProgress, Metainfo};
use torrent_verify::verify::Verifier;

mod cli;

use cli::{Args, ScriptField};

fn main() -> ExitCode {
    let args = Args::parse();

    let filter = if args.silent {
        EnvFilter::new("off")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "starting");

    let mut ok = true;
    for source in &args.torrents {
        match process(&args, source) {
            Ok(passed) => ok &= passed,
            Err(e) => {
                ok = false;
                if !args.silent {
                    error!("{e:#}");
                }
            }
        }
    }

    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Load one torrent and run the requested actions on it. Returns whether
/// verification passed, or `true` when there was nothing to verify.
fn process(args: &Args, source: &str) -> Result<bool> {
    let mut bar = DownloadBar::default();
    let show_progress = !args.silent && io::stderr().is_terminal();
    let meta = torrent::load_with_progress(source, &mut |progress| {
        if show_progress {
            bar.draw(progress);
        }
    })
    .with_context(|| format!("failed to load {source}"))?;

    if !args.silent {
        if args.info {
            print!("{}", meta.summary());
        }
        if let Some(field) = args.script {
            print_script_field(&meta, field);
        }
    }

    let Some(data_dir) = &args.verify else {
        return Ok(true);
    };

    let silent = args.silent;
    let result = Verifier::new(&meta, data_dir)
        .use_torrent_folder(!args.no_torrent_dir)
        .config(args.verify_config())
        .on_file(|progress| {
            if !silent {
                println!(
                    "[{}/{}] Verifying file: {}",
                    progress.index,
                    progress.count,
                    progress.path.display()
                );
            }
        })
        .run();

    if !silent {
        match &result {
            Ok(()) => println!("Torrent verified successfully"),
            Err(e) if e.is_content_mismatch() => println!("Torrent verify failed: {e}"),
            Err(e) => println!("Torrent could not be verified: {e}"),
        }
    }
    Ok(result.is_ok())
}

fn print_script_field(meta: &Metainfo, field: ScriptField) {
    match field {
        ScriptField::Infohash => println!("{}", hex::encode(meta.info_hash())),
    }
}

const BAR_WIDTH: usize = 40;
const SPINNER: [char; 4] = ['/', '-', '\\', '|'];

/// Download indicator drawn on stderr: a bar when the size is known,
/// a spinner otherwise.
#[derive(Default)]
struct DownloadBar {
    ticks: usize,
}

impl DownloadBar {
    fn draw(&mut self, progress: DownloadProgress) {
        let mut stderr = io::stderr().lock();
        let line = match progress {
            DownloadProgress::Running {
                received,
                total: Some(total),
            } if total > 0 => {
                let filled = (received.min(total) * BAR_WIDTH as u64 / total) as usize;
                format!(
                    "[{:<width$}] {:>3}%",
                    "#".repeat(filled),
                    received.min(total) * 100 / total,
                    width = BAR_WIDTH
                )
            }
            DownloadProgress::Running { .. } => {
                self.ticks += 1;
                format!("[ {} ] Downloading...", SPINNER[self.ticks % SPINNER.len()])
            }
            DownloadProgress::Done => String::new(),
        };
        // Progress is best effort.
        let _ = write!(stderr, "\x1b[2K\x1b[1G{line}");
        let _ = stderr.flush();
    }
}
