//! File utility functions

use std::io::Write;
use std::path::{Path, PathBuf};

/// Expand a path string to an absolute path.
///
/// Handles `~` and `~/rest` via the home directory, and resolves relative
/// paths (including bare names) against the current working directory.
/// Absolute paths pass through unchanged. Components are not canonicalized.
pub fn expand_path(path: &str) -> PathBuf {
    let path = path.trim();

    if path.is_empty() {
        return std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    }

    let expanded = match path.strip_prefix('~') {
        Some("") => dirs::home_dir().unwrap_or_else(|| PathBuf::from(path)),
        Some(rest) if rest.starts_with('/') || rest.starts_with('\\') => match dirs::home_dir() {
            Some(home) => home.join(&rest[1..]),
            None => PathBuf::from(path),
        },
        _ => PathBuf::from(path),
    };

    if expanded.is_relative() {
        std::env::current_dir()
            .map(|cwd| cwd.join(&expanded))
            .unwrap_or(expanded)
    } else {
        expanded
    }
}

/// Replace `path` with `data` without ever exposing a truncated file.
///
/// Writes a uniquely named sibling staging file, syncs it, then renames it
/// over the destination. Rename is atomic on the same filesystem, and
/// concurrent writers to one path each get their own staging file, so the
/// last rename wins.
pub fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    replace_file(path, data, true)
}

/// Like [`write_atomic`] without the fsync, for files that are only an
/// inspection point and not a durability guarantee.
pub fn overwrite_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    replace_file(path, data, false)
}

fn replace_file(path: &Path, data: &[u8], sync: bool) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    // Removed on drop if anything below fails
    let mut staging = tempfile::Builder::new()
        .prefix(&format!(".{}.", file_name))
        .suffix(".tmp")
        .tempfile_in(dir)?;
    staging.write_all(data)?;
    if sync {
        staging.as_file().sync_all()?;
    }
    staging.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_path_absolute_unix() {
        let result = expand_path("/absolute/path");
        assert_eq!(result, PathBuf::from("/absolute/path"));
    }

    #[test]
    fn test_expand_path_bare_name() {
        let result = expand_path("staging");
        assert!(result.is_absolute());
        assert!(result.ends_with("staging"));
    }

    #[test]
    fn test_expand_path_tilde() {
        let result = expand_path("~/.tracerelay");
        assert!(result.is_absolute());
        assert!(!result.to_string_lossy().contains('~'));
        assert!(result.ends_with(".tracerelay"));
    }

    #[test]
    fn test_expand_path_tilde_only() {
        let result = expand_path("~");
        if let Some(home) = dirs::home_dir() {
            assert_eq!(result, home);
        }
    }

    #[test]
    fn test_expand_path_tilde_user_is_literal() {
        // `~other` is not a home-directory reference
        let result = expand_path("~other/x");
        assert!(result.ends_with("~other/x"));
    }

    #[test]
    fn test_expand_path_trims_whitespace() {
        let result = expand_path("  /path/to/dir  ");
        assert_eq!(result, PathBuf::from("/path/to/dir"));
    }

    #[test]
    fn test_expand_path_empty_string() {
        let result = expand_path("   ");
        assert!(result.is_absolute());
    }

    #[test]
    fn test_write_atomic_replaces_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_overwrite_atomic_replaces_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracer.json");
        overwrite_atomic(&path, b"{}").unwrap();
        overwrite_atomic(&path, b"[]").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_concurrent_writers_to_one_path_all_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracer.json");

        let handles: Vec<_> = (0..4)
            .map(|n| {
                let path = path.clone();
                std::thread::spawn(move || {
                    let body = format!("{{\"writer\":{}}}", n);
                    (0..250)
                        .filter(|i| {
                            let result = if i % 2 == 0 {
                                write_atomic(&path, body.as_bytes())
                            } else {
                                overwrite_atomic(&path, body.as_bytes())
                            };
                            result.is_err()
                        })
                        .count()
                })
            })
            .collect();

        let failures: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(failures, 0);

        let last: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert!(last["writer"].is_u64());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_write_atomic_missing_parent_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.json");
        assert!(write_atomic(&path, b"x").is_err());
    }
}
