//! Recursive discovery of video files under a library root.

use std::path::{Path, PathBuf};

use rv_core::Result;

/// Extensions treated as video files, matched case-sensitively.
pub const VIDEO_EXTENSIONS: &[&str] = &[
    ".mp4", ".m4v", ".mkv", ".avi", ".wmv", ".flv", ".webm", ".f4v", ".mpg", ".m2ts", ".mov",
];

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => extensions
            .iter()
            .any(|allowed| allowed.strip_prefix('.') == Some(ext)),
        None => false,
    }
}

/// Walk `root` and return the absolute paths of every file whose extension
/// is in `extensions` (leading dot included), sorted.
///
/// The first I/O error encountered aborts the walk; a missing root is an
/// error too.
pub fn crawl(root: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>> {
    let root = std::fs::canonicalize(root)?;
    let mut found = Vec::new();

    for entry in walkdir::WalkDir::new(&root) {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_file() && has_extension(entry.path(), extensions) {
            found.push(entry.into_path());
        }
    }

    found.sort();
    tracing::debug!(root = %root.display(), files = found.len(), "Crawl finished");
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn finds_only_allowed_files_recursively() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("b.mkv"));
        touch(&root.join("a.mp4"));
        touch(&root.join("nested/deeper/c.m2ts"));
        touch(&root.join("notes.txt"));
        touch(&root.join("poster.jpg"));
        touch(&root.join("noext"));
        fs::create_dir_all(root.join("folder.mkv")).unwrap();

        let found = crawl(root, VIDEO_EXTENSIONS).unwrap();
        let canon = fs::canonicalize(root).unwrap();
        assert_eq!(
            found,
            vec![
                canon.join("a.mp4"),
                canon.join("b.mkv"),
                canon.join("nested/deeper/c.m2ts"),
            ]
        );
        assert!(found.iter().all(|p| p.is_absolute()));
    }

    #[test]
    fn extension_match_is_case_sensitive() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("LOUD.MKV"));
        touch(&dir.path().join("quiet.mkv"));

        let found = crawl(dir.path(), VIDEO_EXTENSIONS).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("quiet.mkv"));
    }

    #[test]
    fn custom_extension_list() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.mp4"));
        touch(&dir.path().join("b.mkv"));

        let found = crawl(dir.path(), &[".mkv"]).unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn missing_root_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(crawl(&dir.path().join("gone"), VIDEO_EXTENSIONS).is_err());
    }
}
