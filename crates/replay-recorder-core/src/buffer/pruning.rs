use crate::{CoreResult, RecorderError};

use std::{
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
};

use tracing::{debug, warn};

/// Delete every `extension` file in `dir` except the `retain` newest.
///
/// Files are ordered by modification time, newest first; ties fall back to
/// the file name, which the engine derives from the recording start time.
/// A missing directory is not an error. Returns how many files were deleted.
#[track_caller]
pub fn prune_buffer_dir(dir: &Path, extension: &str, retain: usize) -> CoreResult<usize> {
    let mut files = match list_buffer_files(dir, extension) {
        Ok(files) => files,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(RecorderError::io(dir, e)),
    };

    files.sort_by(|(a_path, a_time), (b_path, b_time)| {
        b_time.cmp(a_time).then_with(|| b_path.cmp(a_path))
    });

    let mut deleted = 0;
    for (path, _) in files.iter().skip(retain) {
        match fs::remove_file(path) {
            Ok(()) => deleted += 1,
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to delete buffer file"),
        }
    }

    debug!(dir = %dir.display(), retain, deleted, "Buffer directory pruned");
    Ok(deleted)
}

fn list_buffer_files(dir: &Path, extension: &str) -> std::io::Result<Vec<(PathBuf, SystemTime)>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let matches = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
        if !matches {
            continue;
        }

        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        files.push((path, modified));
    }
    Ok(files)
}
