//! Utility functions for log formatting and file system checks.
//!
//! This module provides helper functions used throughout the application:
//! - String truncation for logging large HTML fragments
//! - File system validation for output directories

use std::error::Error;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Truncate a string for logging purposes.
///
/// Long strings are cut to at most `max` bytes, backing off to the nearest
/// character boundary, with an ellipsis and byte count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log("a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Ensure a directory exists and is writable.
///
/// This function creates the directory if it doesn't exist, then performs
/// a write test by creating and immediately deleting a probe file.
///
/// # Errors
///
/// Returns an error if:
/// - The directory cannot be created
/// - The directory is not writable (permission denied, read-only filesystem, etc.)
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    // Try a small sync write using std fs (simpler error surface)
    let probe_path = path.join("..__probe_write__");
    stdfs::File::create(&probe_path)?;
    let _ = stdfs::remove_file(&probe_path);
    info!("Directory is writable");
    Ok(())
}

/// Ensure the directory a file will be written into exists and is writable.
///
/// A bare file name refers to the working directory.
pub async fn ensure_writable_parent(file: &Path) -> Result<(), Box<dyn Error>> {
    match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_writable_dir(parent).await,
        _ => ensure_writable_dir(Path::new(".")).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_log_short_string() {
        let s = "Hello, world!";
        assert_eq!(truncate_for_log(s, 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundaries() {
        // "é" is two bytes; cutting at 3 would split the second one.
        let result = truncate_for_log("éééé", 3);
        assert!(result.starts_with("é…"));
        assert!(result.contains("(+6 bytes)"));
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_missing_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("a").join("b");
        ensure_writable_dir(&target).await.unwrap();
        assert!(target.is_dir());
        assert!(!target.join("..__probe_write__").exists());
    }

    #[tokio::test]
    async fn test_ensure_writable_parent_creates_output_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let output = tmp.path().join("reports").join("stories.csv");
        ensure_writable_parent(&output).await.unwrap();
        assert!(tmp.path().join("reports").is_dir());
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_ensure_writable_parent_rejects_file_as_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("file");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let result = ensure_writable_parent(&blocker.join("stories.csv")).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_ensure_writable_parent_accepts_bare_file_name() {
        ensure_writable_parent(Path::new("stories.csv")).await.unwrap();
    }
}
