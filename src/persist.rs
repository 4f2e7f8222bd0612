//! Storage collaborators: saving artifacts to a directory and listing a directory tree
//!
//! Neither is needed by the codecs themselves; they serve callers that persist written
//! artifacts or ingest a folder of source files.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use indexmap::IndexSet;
use log::{debug, warn};
use regex::Regex;

use crate::error::{CodecError, Result};
use crate::types::Artifact;

static FILE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w\-. ]+$").expect("valid file name regex"));

/// Destination for finished artifacts
pub trait ArtifactStore {
    /// Store `bytes` under `name` and return where they landed
    fn persist(&self, name: &str, bytes: &[u8]) -> Result<PathBuf>;
}

/// Store writing plain files into one directory, created on demand
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    directory: PathBuf,
}

impl DirectoryStore {
    pub fn new<P: Into<PathBuf>>(directory: P) -> Self {
        DirectoryStore {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

impl ArtifactStore for DirectoryStore {
    /// Write the file, creating the directory tree first
    ///
    /// # Errors
    /// - [`CodecError::Validation`] when the name has characters outside `[\w\-. ]`,
    ///   contains `..`, or the payload is empty
    /// - [`CodecError::Io`] when the directory or file cannot be written
    fn persist(&self, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let mut issues = Vec::new();
        if name.is_empty() {
            issues.push("name: must not be empty".to_string());
        } else if !FILE_NAME.is_match(name) {
            issues.push(format!("name: '{}' contains invalid characters", name));
        }
        if name.contains("..") {
            issues.push(format!("name: '{}' cannot contain '..'", name));
        }
        if bytes.is_empty() {
            issues.push("bytes: must not be empty".to_string());
        }
        if self.directory.as_os_str().is_empty() {
            issues.push("directory: must not be empty".to_string());
        }
        if !issues.is_empty() {
            return Err(CodecError::Validation { issues });
        }

        fs::create_dir_all(&self.directory)
            .map_err(|e| with_path(e, "create directory", &self.directory))?;
        let directory = self
            .directory
            .canonicalize()
            .map_err(|e| with_path(e, "resolve directory", &self.directory))?;

        let path = directory.join(name);
        if path.parent() != Some(directory.as_path()) {
            return Err(CodecError::validation([format!(
                "name: '{}' resolves outside {}",
                name,
                directory.display()
            )]));
        }

        fs::write(&path, bytes).map_err(|e| with_path(e, "write", &path))?;
        debug!("Persisted {} bytes to {}", bytes.len(), path.display());
        Ok(path)
    }
}

/// Persist an artifact as `<stem>.<extension>`, the extension following its codec
pub fn persist_artifact<S: ArtifactStore + ?Sized>(
    store: &S,
    stem: &str,
    artifact: &Artifact,
) -> Result<PathBuf> {
    let name = format!("{}.{}", stem, artifact.kind.extension());
    store.persist(&name, &artifact.bytes)
}

fn with_path(err: io::Error, action: &str, path: &Path) -> CodecError {
    CodecError::Io(io::Error::new(
        err.kind(),
        format!("Failed to {} {}: {}", action, path.display(), err),
    ))
}

/// One entry found while scanning a directory tree
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FileItem {
    pub name: String,
    pub full_path: PathBuf,
    /// Path relative to the scanned root
    pub relative_path: PathBuf,
    pub is_directory: bool,
    /// Nesting level; entries directly under the root have depth 0
    pub depth: usize,
}

/// Result of [`scan_folder_structure`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FolderStructure {
    pub files: Vec<FileItem>,
    pub folders: Vec<FileItem>,
    /// Every directory (relative to the root) that holds a file, directly or below,
    /// ordered shallow to deep so parents come before children
    pub folder_paths: Vec<PathBuf>,
}

/// Recursively list `root`
///
/// Entries are visited in name order. Directories or entries that cannot be read are
/// logged and skipped; only a missing root is an error.
pub fn scan_folder_structure<P: AsRef<Path>>(root: P) -> Result<FolderStructure> {
    let root = root.as_ref();
    if !root.is_dir() {
        return Err(CodecError::NotFound(format!(
            "Directory not found: {}",
            root.display()
        )));
    }

    let mut items = Vec::new();
    let mut visited = HashSet::new();
    if let Ok(canonical) = root.canonicalize() {
        visited.insert(canonical);
    }
    scan_recursive(root, root, 0, &mut items, &mut visited);

    let (folders, files): (Vec<FileItem>, Vec<FileItem>) =
        items.into_iter().partition(|item| item.is_directory);

    let mut folder_paths: IndexSet<PathBuf> = IndexSet::new();
    for file in &files {
        if let Some(parent) = file.relative_path.parent() {
            let mut current = PathBuf::new();
            for part in parent.components() {
                current.push(part);
                folder_paths.insert(current.clone());
            }
        }
    }
    let mut folder_paths: Vec<PathBuf> = folder_paths.into_iter().collect();
    folder_paths.sort_by_key(|p| p.components().count());

    debug!(
        "Scanned {}: {} files, {} folders",
        root.display(),
        files.len(),
        folders.len()
    );

    Ok(FolderStructure {
        files,
        folders,
        folder_paths,
    })
}

fn scan_recursive(
    root: &Path,
    dir: &Path,
    depth: usize,
    items: &mut Vec<FileItem>,
    visited: &mut HashSet<PathBuf>,
) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Cannot read directory {}: {}", dir.display(), e);
            return;
        }
    };

    let mut entries: Vec<fs::DirEntry> = entries
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Cannot read entry in {}: {}", dir.display(), e);
                None
            }
        })
        .collect();
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let full_path = entry.path();
        // Follows symlinks, like a plain stat
        let is_directory = match fs::metadata(&full_path) {
            Ok(meta) => meta.is_dir(),
            Err(e) => {
                warn!("Cannot access {}: {}", full_path.display(), e);
                continue;
            }
        };

        let relative_path = full_path
            .strip_prefix(root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| PathBuf::from(entry.file_name()));

        items.push(FileItem {
            name: entry.file_name().to_string_lossy().into_owned(),
            full_path: full_path.clone(),
            relative_path,
            is_directory,
            depth,
        });

        if !is_directory {
            continue;
        }
        // Symlinked directories are listed but each real directory is entered once
        match full_path.canonicalize() {
            Ok(canonical) if visited.insert(canonical.clone()) => {
                scan_recursive(root, &full_path, depth + 1, items, visited)
            }
            Ok(_) => debug!("Skipping already visited directory {}", full_path.display()),
            Err(e) => warn!("Cannot resolve {}: {}", full_path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Delimiter;
    use crate::types::ArtifactKind;
    use tempfile::tempdir;

    #[test]
    fn test_persist_creates_directory() -> Result<()> {
        let dir = tempdir()?;
        let store = DirectoryStore::new(dir.path().join("exports").join("2024"));

        let path = store.persist("report 1.csv", b"a,b\n")?;
        assert!(path.ends_with("exports/2024/report 1.csv"));
        assert_eq!(fs::read(&path)?, b"a,b\n");
        Ok(())
    }

    #[test]
    fn test_persist_rejects_bad_input() {
        let dir = tempdir().unwrap();
        let store = DirectoryStore::new(dir.path());

        for name in ["../escape.csv", "sub/file.csv", "a..b", "", "what?.csv", "."] {
            let err = store.persist(name, b"x").unwrap_err();
            assert!(err.is_validation(), "{} should be rejected", name);
        }

        match store.persist("ok.csv", b"") {
            Err(CodecError::Validation { issues }) => assert_eq!(issues.len(), 1),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_persist_artifact_extension() -> Result<()> {
        let dir = tempdir()?;
        let store = DirectoryStore::new(dir.path());
        let artifact = Artifact {
            kind: ArtifactKind::Delimited(Delimiter::Pipe),
            bytes: b"a|b\n".to_vec(),
        };
        let path = persist_artifact(&store, "people", &artifact)?;
        assert_eq!(path.file_name().unwrap(), "people.csv");
        Ok(())
    }

    #[test]
    fn test_scan_folder_structure() -> Result<()> {
        let dir = tempdir()?;
        let root = dir.path();
        fs::create_dir_all(root.join("a").join("b"))?;
        fs::create_dir_all(root.join("empty"))?;
        fs::write(root.join("top.txt"), "1")?;
        fs::write(root.join("a").join("mid.txt"), "2")?;
        fs::write(root.join("a").join("b").join("deep.txt"), "3")?;

        let tree = scan_folder_structure(root)?;

        let files: Vec<_> = tree.files.iter().map(|f| f.relative_path.clone()).collect();
        assert_eq!(
            files,
            vec![
                PathBuf::from("a").join("b").join("deep.txt"),
                PathBuf::from("a").join("mid.txt"),
                PathBuf::from("top.txt"),
            ]
        );
        assert_eq!(tree.files[0].depth, 2);
        assert_eq!(tree.files[0].name, "deep.txt");
        assert_eq!(tree.files[2].depth, 0);

        let folders: Vec<_> = tree.folders.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(folders, vec!["a", "b", "empty"]);
        assert!(tree.folders.iter().all(|f| f.is_directory));

        assert_eq!(
            tree.folder_paths,
            vec![PathBuf::from("a"), PathBuf::from("a").join("b")]
        );
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_survives_symlink_cycle() -> Result<()> {
        let dir = tempdir()?;
        let root = dir.path();
        fs::create_dir_all(root.join("a"))?;
        fs::write(root.join("a").join("file.txt"), "1")?;
        std::os::unix::fs::symlink(root, root.join("a").join("loop"))?;

        let tree = scan_folder_structure(root)?;
        let folders: Vec<_> = tree.folders.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(folders, vec!["a", "loop"]);
        assert_eq!(tree.files.len(), 1);
        Ok(())
    }

    #[test]
    fn test_scan_missing_root() {
        let err = scan_folder_structure("/definitely/not/here").unwrap_err();
        assert!(err.is_not_found());
    }
}
