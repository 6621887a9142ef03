//! Directory scanning that turns the selected root folders into the ordered
//! list of images the slideshow walks through.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::config::Configuration;
use crate::error::Error;

/// Extensions recognised as images (lowercase, without dot).
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp", "tiff", "tif"];

/// Options controlling directory scanning.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Optional maximum recursion depth. `None` or `Some(0)` means unlimited.
    pub max_depth: Option<usize>,
    /// Skip dot-directories below the root.
    pub skip_hidden_dirs: bool,
}

impl From<&Configuration> for ScanOptions {
    fn from(cfg: &Configuration) -> Self {
        Self {
            max_depth: cfg.max_depth,
            skip_hidden_dirs: cfg.skip_hidden_dirs,
        }
    }
}

/// Absolute path of a file with a recognised image extension.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImagePath(PathBuf);

impl ImagePath {
    /// Wrap `path` if it carries a recognised image extension.
    #[must_use]
    pub fn new(path: PathBuf) -> Option<Self> {
        is_supported_image(&path).then_some(Self(path))
    }

    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Name of the folder that holds the image, for status display.
    #[must_use]
    pub fn folder_name(&self) -> String {
        self.0
            .parent()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

impl AsRef<Path> for ImagePath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

/// Ordered, read-only list of discovered images.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    images: Vec<ImagePath>,
    skipped: usize,
}

impl Catalog {
    /// Build a catalog directly from already-collected paths, keeping only
    /// recognised images.
    #[must_use]
    pub fn from_paths<I>(paths: I) -> Self
    where
        I: IntoIterator<Item = PathBuf>,
    {
        Self {
            images: paths.into_iter().filter_map(ImagePath::new).collect(),
            skipped: 0,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.images.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&ImagePath> {
        self.images.get(index)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[ImagePath] {
        &self.images
    }

    /// Entries that could not be read during the scan.
    #[must_use]
    pub const fn skipped(&self) -> usize {
        self.skipped
    }
}

/// Return `true` if `path` has a recognised image extension (case-insensitive).
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.iter().any(|e| *e == ext)
        })
}

/// Walk every root depth-first and collect images in folder-then-name order.
///
/// Roots are processed in the order supplied; a root listed twice is scanned
/// once. Unreadable entries, missing roots and symlink cycles are logged and
/// skipped. An empty result is a valid catalog, not an error.
pub fn build(roots: &[PathBuf], opts: &ScanOptions) -> Catalog {
    let mut seen_roots = HashSet::new();
    let mut catalog = Catalog::default();

    for root in roots {
        if !seen_roots.insert(root.clone()) {
            debug!(root = %root.display(), "duplicate root ignored");
            continue;
        }
        if !root.is_dir() {
            warn!(root = %root.display(), "folder does not exist or is not a directory");
            catalog.skipped += 1;
            continue;
        }

        let mut wd = WalkDir::new(root).follow_links(true).sort_by_file_name();
        if let Some(d) = opts.max_depth
            && d > 0
        {
            wd = wd.max_depth(d);
        }

        let skip_hidden = opts.skip_hidden_dirs;
        let before = catalog.images.len();
        for entry in wd.into_iter().filter_entry(|e| !(skip_hidden && is_hidden_dir(e))) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(source) => {
                    let err = Error::Scan {
                        path: source
                            .path()
                            .map_or_else(|| root.clone(), Path::to_path_buf),
                        source,
                    };
                    debug!(error = %err, "skipping unreadable entry");
                    catalog.skipped += 1;
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(image) = ImagePath::new(absolute(entry.into_path())) {
                catalog.images.push(image);
            }
        }
        debug!(
            root = %root.display(),
            found = catalog.images.len() - before,
            "root scanned"
        );
    }

    info!(
        images = catalog.images.len(),
        skipped = catalog.skipped,
        roots = seen_roots.len(),
        "catalog built"
    );
    catalog
}

fn absolute(path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        return path;
    }
    std::path::absolute(&path).unwrap_or(path)
}

fn is_hidden_dir(entry: &DirEntry) -> bool {
    // Never skip the root; tempfile roots can be dot-dirs.
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    entry
        .file_name()
        .to_str()
        .is_some_and(|n| n.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn names(catalog: &Catalog, root: &Path) -> Vec<String> {
        catalog
            .as_slice()
            .iter()
            .map(|p| {
                p.as_path()
                    .strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn extensions_are_case_insensitive() {
        assert!(is_supported_image(Path::new("a.JPG")));
        assert!(is_supported_image(Path::new("b.Tiff")));
        assert!(is_supported_image(Path::new("c.webp")));
        assert!(!is_supported_image(Path::new("d.txt")));
        assert!(!is_supported_image(Path::new("jpg")));
    }

    #[test]
    fn orders_folders_and_files_by_name() {
        let tmp = tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("b_dir")).unwrap();
        fs::create_dir_all(root.join("a_dir/inner")).unwrap();
        fs::write(root.join("z.png"), b"x").unwrap();
        fs::write(root.join("b_dir/2.jpg"), b"x").unwrap();
        fs::write(root.join("b_dir/1.jpg"), b"x").unwrap();
        fs::write(root.join("a_dir/inner/x.gif"), b"x").unwrap();
        fs::write(root.join("a_dir/notes.txt"), b"x").unwrap();

        let catalog = build(&[root.to_path_buf()], &ScanOptions::default());
        assert_eq!(
            names(&catalog, root),
            vec!["a_dir/inner/x.gif", "b_dir/1.jpg", "b_dir/2.jpg", "z.png"]
        );
    }

    #[test]
    fn roots_keep_supplied_order_and_dedupe() {
        let tmp = tempdir().unwrap();
        let first = tmp.path().join("zz");
        let second = tmp.path().join("aa");
        fs::create_dir_all(&first).unwrap();
        fs::create_dir_all(&second).unwrap();
        fs::write(first.join("one.jpg"), b"x").unwrap();
        fs::write(second.join("two.jpg"), b"x").unwrap();

        let catalog = build(
            &[first.clone(), second.clone(), first.clone()],
            &ScanOptions::default(),
        );
        assert_eq!(names(&catalog, tmp.path()), vec!["zz/one.jpg", "aa/two.jpg"]);
    }

    #[test]
    fn missing_root_is_skipped_not_fatal() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("a.bmp"), b"x").unwrap();
        let catalog = build(
            &[tmp.path().join("missing"), tmp.path().to_path_buf()],
            &ScanOptions::default(),
        );
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.skipped(), 1);
    }

    #[test]
    fn hidden_dirs_skipped_only_when_asked() {
        let tmp = tempdir().unwrap();
        fs::create_dir_all(tmp.path().join(".cache")).unwrap();
        fs::write(tmp.path().join(".cache/thumb.jpg"), b"x").unwrap();
        fs::write(tmp.path().join("photo.jpg"), b"x").unwrap();

        let all = build(&[tmp.path().to_path_buf()], &ScanOptions::default());
        assert_eq!(all.len(), 2);

        let opts = ScanOptions {
            skip_hidden_dirs: true,
            ..ScanOptions::default()
        };
        let visible = build(&[tmp.path().to_path_buf()], &opts);
        assert_eq!(names(&visible, tmp.path()), vec!["photo.jpg"]);
    }

    #[test]
    fn max_depth_limits_recursion() {
        let tmp = tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("deep")).unwrap();
        fs::write(tmp.path().join("top.jpg"), b"x").unwrap();
        fs::write(tmp.path().join("deep/low.jpg"), b"x").unwrap();
        let opts = ScanOptions {
            max_depth: Some(1),
            ..ScanOptions::default()
        };
        let catalog = build(&[tmp.path().to_path_buf()], &opts);
        assert_eq!(names(&catalog, tmp.path()), vec!["top.jpg"]);
    }

    #[test]
    fn empty_tree_gives_empty_catalog() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("readme.md"), b"x").unwrap();
        let catalog = build(&[tmp.path().to_path_buf()], &ScanOptions::default());
        assert!(catalog.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn symlink_cycle_does_not_abort_scan() {
        let tmp = tempdir().unwrap();
        let sub = tmp.path().join("sub");
        fs::create_dir_all(&sub).unwrap();
        fs::write(sub.join("a.jpg"), b"x").unwrap();
        std::os::unix::fs::symlink(tmp.path(), sub.join("loop")).unwrap();

        let catalog = build(&[tmp.path().to_path_buf()], &ScanOptions::default());
        assert_eq!(names(&catalog, tmp.path()), vec!["sub/a.jpg"]);
        assert!(catalog.skipped() >= 1);
    }
}
