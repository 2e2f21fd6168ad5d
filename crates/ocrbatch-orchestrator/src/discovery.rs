//! Input enumeration
//!
//! Walks input roots and yields candidate documents filtered by extension.
//! Roots are checked up front so that a bad path fails the run before any
//! work starts; the walk itself is lazy and can be restarted with `iter()`.
//!
//! Every yielded `relative_path` is unique within one walk, ignoring case and
//! extension, so each document gets its own text artifact. A repeat keeps its
//! directory and gains a digest of its source path:
//! `2024/report.pdf` after `2023/report.pdf` (both file roots) becomes
//! `report-<digest>.pdf`.

use crate::stager::path_digest;
use crate::OrchestratorError;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A discovered input document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentDescriptor {
    /// Path of the file as reached from its root
    pub path: PathBuf,

    /// Path relative to the root it was found under (file name for file roots),
    /// disambiguated when another document already claimed the same output
    pub relative_path: PathBuf,
}

/// Validated set of input roots
#[derive(Debug, Clone)]
pub struct Discovery {
    roots: Vec<PathBuf>,
    recursive: bool,
    extensions: Vec<String>,
}

impl Discovery {
    /// Validate `roots` and build an enumerator
    ///
    /// # Errors
    ///
    /// Returns `OrchestratorError::Discovery` if any root does not exist or is
    /// neither a regular file nor a directory.
    pub fn new(
        roots: &[PathBuf],
        recursive: bool,
        extensions: &[String],
    ) -> Result<Self, OrchestratorError> {
        for root in roots {
            let meta = std::fs::metadata(root).map_err(|e| {
                OrchestratorError::Discovery(format!("{}: {}", root.display(), e))
            })?;
            if !meta.is_file() && !meta.is_dir() {
                return Err(OrchestratorError::Discovery(format!(
                    "{}: not a regular file or directory",
                    root.display()
                )));
            }
        }

        let extensions = extensions
            .iter()
            .map(|e| e.trim().trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();

        Ok(Self {
            roots: roots.to_vec(),
            recursive,
            extensions,
        })
    }

    /// Whether `path` has one of the accepted extensions
    pub fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
            .unwrap_or(false)
    }

    /// Start a fresh walk over all roots
    pub fn iter(&self) -> DiscoveryIter<'_> {
        DiscoveryIter {
            discovery: self,
            next_root: 0,
            current: None,
            seen: HashSet::new(),
            claimed: HashSet::new(),
        }
    }
}

struct RootWalk {
    root: PathBuf,
    entries: walkdir::IntoIter,
}

/// Lazy walk produced by [`Discovery::iter`]
///
/// Each distinct file is yielded once even when roots overlap. Directory
/// entries are visited in file-name order.
pub struct DiscoveryIter<'a> {
    discovery: &'a Discovery,
    next_root: usize,
    current: Option<RootWalk>,
    seen: HashSet<PathBuf>,
    claimed: HashSet<String>,
}

/// Hex digits of the path digest tried when disambiguating, shortest first
const CLAIM_DIGEST_LENS: [usize; 3] = [8, 16, 64];

fn output_identity(relative: &Path) -> String {
    relative
        .with_extension("")
        .to_string_lossy()
        .to_lowercase()
}

impl DiscoveryIter<'_> {
    /// Record `path` as seen; false if it was already yielded
    fn first_sighting(&mut self, path: &Path) -> bool {
        let identity = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        self.seen.insert(identity)
    }

    /// Reserve an output slot for `path`, renaming `relative` on a clash
    fn claim_output(&mut self, path: &Path, relative: PathBuf) -> PathBuf {
        if self.claimed.insert(output_identity(&relative)) {
            return relative;
        }

        let digest = path_digest(path);
        let stem = relative
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        for len in CLAIM_DIGEST_LENS {
            let mut name = format!("{}-{}", stem, &digest[..len]);
            if let Some(ext) = relative.extension() {
                name.push('.');
                name.push_str(&ext.to_string_lossy());
            }
            let candidate = relative.with_file_name(name);
            if self.claimed.insert(output_identity(&candidate)) {
                tracing::debug!(
                    path = %path.display(),
                    output = %candidate.display(),
                    "Output name already taken, disambiguating"
                );
                return candidate;
            }
        }
        relative
    }

    fn open_next_root(&mut self) -> Option<Result<DocumentDescriptor, OrchestratorError>> {
        while self.next_root < self.discovery.roots.len() {
            let root = self.discovery.roots[self.next_root].clone();
            self.next_root += 1;

            if root.is_file() {
                if !self.discovery.matches(&root) {
                    tracing::debug!(path = %root.display(), "Skipping file root with unmatched extension");
                    continue;
                }
                if !self.first_sighting(&root) {
                    continue;
                }
                let relative_path = root
                    .file_name()
                    .map(PathBuf::from)
                    .unwrap_or_else(|| root.clone());
                let relative_path = self.claim_output(&root, relative_path);
                return Some(Ok(DocumentDescriptor {
                    path: root,
                    relative_path,
                }));
            }

            let max_depth = if self.discovery.recursive { usize::MAX } else { 1 };
            let entries = WalkDir::new(&root)
                .min_depth(1)
                .max_depth(max_depth)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter();
            self.current = Some(RootWalk { root, entries });
            return None;
        }
        None
    }
}

impl Iterator for DiscoveryIter<'_> {
    type Item = Result<DocumentDescriptor, OrchestratorError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let Some(walk) = self.current.as_mut() else {
                if self.next_root >= self.discovery.roots.len() {
                    return None;
                }
                if let Some(item) = self.open_next_root() {
                    return Some(item);
                }
                continue;
            };

            let entry = match walk.entries.next() {
                Some(Ok(entry)) => entry,
                Some(Err(e)) => {
                    let root = walk.root.display().to_string();
                    self.current = None;
                    self.next_root = self.discovery.roots.len();
                    return Some(Err(OrchestratorError::Discovery(format!(
                        "walking {}: {}",
                        root, e
                    ))));
                }
                None => {
                    self.current = None;
                    continue;
                }
            };

            if !entry.file_type().is_file() || !self.discovery.matches(entry.path()) {
                continue;
            }

            let path = entry.path().to_path_buf();
            let relative_path = path
                .strip_prefix(&walk.root)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| PathBuf::from(entry.file_name()));

            if !self.first_sighting(&path) {
                continue;
            }
            let relative_path = self.claim_output(&path, relative_path);
            return Some(Ok(DocumentDescriptor {
                path,
                relative_path,
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn pdf_exts() -> Vec<String> {
        vec!["pdf".to_string()]
    }

    fn tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.pdf"), b"%PDF b").unwrap();
        fs::write(dir.path().join("a.PDF"), b"%PDF a").unwrap();
        fs::write(dir.path().join("notes.txt"), b"skip").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("c.pdf"), b"%PDF c").unwrap();
        dir
    }

    fn relative(discovery: &Discovery) -> Vec<PathBuf> {
        discovery
            .iter()
            .map(|d| d.unwrap().relative_path)
            .collect()
    }

    #[test]
    fn test_recursive_walk_filters_and_sorts() {
        let dir = tree();
        let discovery = Discovery::new(&[dir.path().to_path_buf()], true, &pdf_exts()).unwrap();
        assert_eq!(
            relative(&discovery),
            vec![
                PathBuf::from("a.PDF"),
                PathBuf::from("b.pdf"),
                PathBuf::from("sub").join("c.pdf"),
            ]
        );
    }

    #[test]
    fn test_non_recursive_walk() {
        let dir = tree();
        let discovery = Discovery::new(&[dir.path().to_path_buf()], false, &pdf_exts()).unwrap();
        assert_eq!(
            relative(&discovery),
            vec![PathBuf::from("a.PDF"), PathBuf::from("b.pdf")]
        );
    }

    #[test]
    fn test_file_root_ignores_recursion_flag() {
        let dir = tree();
        let file = dir.path().join("sub").join("c.pdf");
        let discovery = Discovery::new(&[file.clone()], false, &pdf_exts()).unwrap();
        let found: Vec<_> = discovery.iter().map(|d| d.unwrap()).collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, file);
        assert_eq!(found[0].relative_path, PathBuf::from("c.pdf"));
    }

    #[test]
    fn test_overlapping_roots_are_deduplicated() {
        let dir = tree();
        let roots = vec![dir.path().to_path_buf(), dir.path().join("b.pdf")];
        let discovery = Discovery::new(&roots, true, &pdf_exts()).unwrap();
        assert_eq!(discovery.iter().count(), 3);
    }

    #[test]
    fn test_missing_root_fails_up_front() {
        let dir = tree();
        let missing = dir.path().join("nope");
        let err = Discovery::new(&[missing], true, &pdf_exts()).unwrap_err();
        assert!(matches!(err, OrchestratorError::Discovery(_)));
    }

    #[test]
    fn test_iteration_is_restartable() {
        let dir = tree();
        let discovery = Discovery::new(&[dir.path().to_path_buf()], true, &pdf_exts()).unwrap();
        let first: Vec<_> = discovery.iter().map(|d| d.unwrap()).collect();
        let second: Vec<_> = discovery.iter().map(|d| d.unwrap()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_extension_normalization() {
        let dir = tree();
        let exts = vec![".TXT".to_string()];
        let discovery = Discovery::new(&[dir.path().to_path_buf()], true, &exts).unwrap();
        assert_eq!(relative(&discovery), vec![PathBuf::from("notes.txt")]);
    }

    #[test]
    fn test_same_named_file_roots_get_distinct_outputs() {
        let dir = TempDir::new().unwrap();
        let mut roots = Vec::new();
        for year in ["2023", "2024"] {
            fs::create_dir(dir.path().join(year)).unwrap();
            let file = dir.path().join(year).join("report.pdf");
            fs::write(&file, b"%PDF").unwrap();
            roots.push(file);
        }

        let discovery = Discovery::new(&roots, true, &pdf_exts()).unwrap();
        let found = relative(&discovery);
        let digest = path_digest(&roots[1]);
        assert_eq!(
            found,
            vec![
                PathBuf::from("report.pdf"),
                PathBuf::from(format!("report-{}.pdf", &digest[..8])),
            ]
        );
        // a fresh walk makes the same choice
        assert_eq!(relative(&discovery), found);
    }

    #[test]
    fn test_outputs_differing_only_in_case_are_disambiguated() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.PDF"), b"%PDF").unwrap();
        fs::write(dir.path().join("a.pdf"), b"%PDF").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("a.pdf"), b"%PDF").unwrap();

        let discovery = Discovery::new(&[dir.path().to_path_buf()], true, &pdf_exts()).unwrap();
        let found = relative(&discovery);
        assert_eq!(found.len(), 3);
        assert_eq!(found[0], PathBuf::from("a.PDF"));
        assert!(found[1].to_string_lossy().starts_with("a-"));
        // different directory, no clash
        assert_eq!(found[2], PathBuf::from("sub").join("a.pdf"));
    }

    #[cfg(unix)]
    #[test]
    fn test_link_loop_is_an_error_after_earlier_entries() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.pdf"), b"%PDF").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        std::os::unix::fs::symlink(dir.path(), dir.path().join("sub").join("loop")).unwrap();

        let discovery = Discovery::new(&[dir.path().to_path_buf()], true, &pdf_exts()).unwrap();
        let items: Vec<_> = discovery.iter().collect();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap().relative_path, PathBuf::from("a.pdf"));
        assert!(matches!(items[1], Err(OrchestratorError::Discovery(_))));
    }
}
