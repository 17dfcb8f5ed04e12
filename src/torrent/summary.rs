use std::fmt;

use crate::utils::{format_timestamp, human_size};

use super::info::Layout;
use super::metainfo::Metainfo;

/// Shown in place of a missing or unusable name.
pub const UNKNOWN_NAME: &str = "[UNKNOWN (>_<)]";

/// Human-readable overview of a torrent, as printed by `--info`.
pub struct Summary<'a> {
    meta: &'a Metainfo,
}

impl Metainfo {
    pub fn summary(&self) -> Summary<'_> {
        Summary { meta: self }
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

fn write_file(f: &mut fmt::Formatter<'_>, name: &str, length: u64) -> fmt::Result {
    writeln!(f, "\t{:>8} {}", human_size(length), name)
}

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let meta = self.meta;
        writeln!(f, "Name: {}", meta.display_name(UNKNOWN_NAME))?;
        writeln!(f, "Info hash: {}", hex::encode(meta.info_hash()))?;
        writeln!(f, "Piece count: {}", meta.piece_count())?;
        match meta.piece_length() {
            Some(len) => writeln!(f, "Piece size: {} ({})", len, human_size(len))?,
            None => writeln!(f, "Piece size: unknown")?,
        }
        writeln!(f, "Is multi file: {}", yes_no(meta.is_multi_file()))?;
        if meta.is_multi_file() {
            writeln!(f, "File count is: {}", meta.file_count())?;
        }
        writeln!(f, "Is private: {}", yes_no(meta.is_private()))?;

        if let Ok(tracker) = meta.announce() {
            writeln!(f, "Tracker: {}", String::from_utf8_lossy(tracker))?;
        }
        if let Some(date) = meta.creation_date() {
            match format_timestamp(date) {
                Some(date) => writeln!(f, "Creation date: {date}")?,
                None => writeln!(f, "Creation date: {date} (out of range)")?,
            }
        }
        if let Ok(created_by) = meta.created_by() {
            writeln!(f, "Created by: {}", String::from_utf8_lossy(created_by))?;
        }
        if let Ok(source) = meta.source() {
            writeln!(f, "Source: {}", String::from_utf8_lossy(source))?;
        }
        if let Ok(comment) = meta.comment() {
            writeln!(f, "Comment: {}", String::from_utf8_lossy(comment))?;
        }

        writeln!(f, "Files:")?;
        let mut total = 0u64;
        match meta.layout() {
            Layout::SingleFile { length } => {
                write_file(f, &meta.display_name(UNKNOWN_NAME), *length)?;
                total = *length;
            }
            Layout::MultiFile { .. } => {
                if let Ok(files) = meta.files() {
                    for entry in files {
                        match entry {
                            Ok(entry) => {
                                write_file(f, &entry.display_path(), entry.length)?;
                                total = total.saturating_add(entry.length);
                            }
                            Err(e) => writeln!(f, "\t{e}")?,
                        }
                    }
                }
            }
        }
        writeln!(f, "Total size: {}", human_size(total))
    }
}
