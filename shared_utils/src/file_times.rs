//! File timestamp preservation.
//!
//! Copies access/modification times from the source to the converted file.
//! Must run after the destination is fully written and closed.

use std::io;
use std::path::Path;

pub fn copy_file_times(src: &Path, dst: &Path) -> io::Result<()> {
    let m = std::fs::metadata(src)?;
    let atime = filetime::FileTime::from_last_access_time(&m);
    let mtime = filetime::FileTime::from_last_modification_time(&m);
    filetime::set_file_times(dst, atime, mtime)
}

/// Best-effort variant used by the worker pool.
pub fn apply_file_timestamps(src: &Path, dst: &Path) {
    if let Err(e) = copy_file_times(src, dst) {
        tracing::warn!(
            src = %src.display(),
            dst = %dst.display(),
            error = %e,
            "Failed to copy file times"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::FileTime;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_copy_file_times() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("a.heic");
        let dst = dir.path().join("a.jpg");
        fs::write(&src, b"src").unwrap();
        fs::write(&dst, b"dst").unwrap();

        let stamp = FileTime::from_unix_time(1_600_000_000, 0);
        filetime::set_file_times(&src, stamp, stamp).unwrap();

        copy_file_times(&src, &dst).unwrap();

        let m = fs::metadata(&dst).unwrap();
        assert_eq!(FileTime::from_last_modification_time(&m), stamp);
    }

    #[test]
    fn test_missing_source_is_error() {
        let dir = TempDir::new().unwrap();
        let dst = dir.path().join("a.jpg");
        fs::write(&dst, b"dst").unwrap();
        assert!(copy_file_times(&dir.path().join("missing"), &dst).is_err());
        // best-effort variant only logs
        apply_file_timestamps(&dir.path().join("missing"), &dst);
    }
}
