use std::path::Path;

use tracing::warn;

use crate::torrent::{FileEntry, Layout, Metainfo, MetainfoError};

use super::path::resolve_path;

/// Visit every payload file in stream order with its on-disk path.
///
/// Multi-file payloads are looked up inside a folder named after the torrent
/// when `use_torrent_folder` is set; single files never are. The first error,
/// from the visitor or from a malformed file entry, stops the walk.
pub fn for_each_file<F, E>(
    meta: &Metainfo,
    data_dir: &Path,
    use_torrent_folder: bool,
    mut visitor: F,
) -> Result<(), E>
where
    F: FnMut(&Path, &FileEntry<'_>) -> Result<(), E>,
    E: From<MetainfoError>,
{
    match meta.layout() {
        Layout::SingleFile { .. } => {
            let entry = meta.single_file()?;
            visitor(&resolve_path(&entry, data_dir, None), &entry)
        }
        Layout::MultiFile { .. } => {
            let folder = if use_torrent_folder {
                match meta.name() {
                    Ok(name) => Some(name),
                    Err(e) => {
                        warn!("{e}; looking for files directly in the data directory");
                        None
                    }
                }
            } else {
                None
            };

            for entry in meta.files()? {
                let entry = entry?;
                visitor(&resolve_path(&entry, data_dir, folder), &entry)?;
            }
            Ok(())
        }
    }
}
