// Filesystem helpers for output files and the archive directory.

use crate::error::Result;
use std::path::{Path, PathBuf};

/// Expand a leading `~` and make the path absolute against the current
/// directory.
pub fn resolve_path(path: &Path) -> Result<PathBuf> {
    let expanded = match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(rest),
        Err(_) => path.to_path_buf(),
    };
    if expanded.is_absolute() {
        Ok(expanded)
    } else {
        Ok(std::env::current_dir()?.join(expanded))
    }
}

pub fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)?;
    Ok(())
}

/// A file-name-safe version of an arbitrary title.
pub fn safe_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == ' ' || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect::<String>()
        .trim()
        .trim_start_matches('.')
        .to_string()
}

pub fn write_to_file(path: &Path, content: &[u8]) -> Result<()> {
    std::fs::write(path, content)?;
    tracing::debug!(path = %path.display(), bytes = content.len(), "file written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_safe_name() {
        assert_eq!(safe_name("Hello World"), "Hello World");
        assert_eq!(safe_name("foo/bar"), "foo_bar");
        assert_eq!(safe_name("baz\\qux: a <story>?"), "baz_qux_ a _story__");
        assert_eq!(safe_name("../etc/passwd"), "_etc_passwd");
    }

    #[test]
    fn test_resolve_path_expands_home() {
        let resolved = resolve_path(Path::new("~/pocket")).unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("pocket"));
        assert!(!resolved.to_string_lossy().contains('~'));
    }

    #[test]
    fn test_resolve_path_relative_is_absolutised() {
        let resolved = resolve_path(Path::new("out.txt")).unwrap();
        assert_eq!(resolved, std::env::current_dir().unwrap().join("out.txt"));
    }

    #[test]
    fn test_ensure_dir_and_write() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("a").join("b");
        ensure_dir(&dir).unwrap();

        let file = dir.join("note.html");
        write_to_file(&file, b"<p>hi</p>").unwrap();
        assert_eq!(std::fs::read(&file).unwrap(), b"<p>hi</p>");
    }
}
