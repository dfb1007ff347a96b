//! Shared utilities

use anyhow::Context;
use cirrus_api::FileInfo;
use std::path::Path;

/// Truncate a string to `max` characters, appending "..." if truncated.
/// Operates on Unicode char boundaries, not bytes.
pub fn truncate_chars(s: &str, max: usize) -> String {
    let mut chars = s.chars();
    let truncated: String = chars.by_ref().take(max).collect();
    if chars.next().is_some() {
        format!("{}...", truncated)
    } else {
        truncated
    }
}

/// Name and size of each file to attach
pub fn file_infos<P: AsRef<Path>>(paths: &[P]) -> anyhow::Result<Vec<FileInfo>> {
    paths
        .iter()
        .map(|path| {
            let path = path.as_ref();
            let meta = std::fs::metadata(path)
                .with_context(|| format!("Cannot read {}", path.display()))?;
            if !meta.is_file() {
                anyhow::bail!("{} is not a file", path.display());
            }
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            Ok(FileInfo {
                name,
                size: meta.len(),
            })
        })
        .collect()
}

/// Human-readable byte count
pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    let b = bytes as f64;
    if b < KB {
        format!("{} B", bytes)
    } else if b < KB * KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{:.1} MB", b / (KB * KB))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("abcdef", 3), "abc...");
        assert_eq!(truncate_chars("héllo wörld", 5), "héllo...");
    }

    #[test]
    fn test_file_infos() {
        let dir = std::env::temp_dir().join(format!("cirrus-utils-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("main.tf");
        std::fs::write(&path, "resource {}").unwrap();

        let infos = file_infos(&[&path]).unwrap();
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].name, "main.tf");
        assert_eq!(infos[0].size, 11);

        assert!(file_infos(&[dir.join("absent.tf")]).is_err());
        assert!(file_infos(&[&dir]).is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }
}
