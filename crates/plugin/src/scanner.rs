//! Build output scanning.
//!
//! Recursively walks the dist directory and produces relative paths
//! normalized to forward slashes, for hosts that do not supply a file list.

use std::path::Path;

use crate::error::PluginError;

/// Scans `root` recursively and returns sorted relative file paths.
pub fn scan_dist_dir(root: &Path) -> Result<Vec<String>, PluginError> {
    let mut files = Vec::new();
    walk_dir(root, root, &mut files)?;
    files.sort();
    Ok(files)
}

fn walk_dir(root: &Path, current: &Path, files: &mut Vec<String>) -> Result<(), PluginError> {
    for entry in std::fs::read_dir(current)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            walk_dir(root, &path, files)?;
        } else if file_type.is_file() {
            let rel_path = path.strip_prefix(root).map_err(std::io::Error::other)?;
            files.push(rel_path.to_string_lossy().replace('\\', "/"));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn scan_finds_nested_files_sorted() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::write(root.join("index.html"), b"<html>").unwrap();
        fs::write(root.join("app.js"), b"js").unwrap();
        fs::create_dir_all(root.join("assets").join("img")).unwrap();
        fs::write(root.join("assets").join("img").join("logo.png"), b"png").unwrap();
        fs::write(root.join(".htaccess"), b"deny").unwrap();

        let files = scan_dist_dir(root).unwrap();
        assert_eq!(
            files,
            vec![".htaccess", "app.js", "assets/img/logo.png", "index.html"]
        );
    }

    #[test]
    fn scan_empty_dir() {
        let dir = TempDir::new().unwrap();
        assert!(scan_dist_dir(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn scan_nonexistent_dir() {
        let result = scan_dist_dir(Path::new("/nonexistent/dist/that/does/not/exist"));
        assert!(matches!(result, Err(PluginError::Io(_))));
    }
}
