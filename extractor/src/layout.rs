use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

const VCS_DIR: &str = ".git";

fn is_vcs_dir(name: &OsStr) -> bool {
    name == VCS_DIR
}

/// True when at least one file under `root` has the given extension.
pub fn has_source_files(root: &Path, extension: &str) -> bool {
    WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| !(e.file_type().is_dir() && is_vcs_dir(e.file_name())))
        .filter_map(Result::ok)
        .any(|e| {
            e.file_type().is_file()
                && e.path()
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
        })
}

/// Directories below `root` whose relative path ends with `module_root`
/// (e.g. `core/src/main/java`), sorted. Found roots are not searched further.
pub fn find_module_roots(root: &Path, module_root: &Path) -> Vec<PathBuf> {
    let mut roots = Vec::new();
    let mut walker = WalkDir::new(root).sort_by_file_name().into_iter();

    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }
        if is_vcs_dir(entry.file_name()) {
            walker.skip_current_dir();
            continue;
        }
        let matches = entry
            .path()
            .strip_prefix(root)
            .is_ok_and(|relative| relative.ends_with(module_root));
        if matches {
            roots.push(entry.into_path());
            walker.skip_current_dir();
        }
    }
    roots
}

/// Short label for a module directory, used in log file names:
/// `core/src/main/java` becomes `core`, the top-level module becomes `root`.
pub fn module_label(checkout: &Path, module_dir: &Path, module_root: &Path) -> String {
    let relative = module_dir.strip_prefix(checkout).unwrap_or(module_dir);
    let base: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    let keep = base.len().saturating_sub(module_root.components().count());
    if keep == 0 {
        "root".to_owned()
    } else {
        base[..keep].join("_")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    fn java_root() -> PathBuf {
        PathBuf::from("src").join("main").join("java")
    }

    #[test]
    fn test_detects_source_files() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "lib/src/Foo.java");
        assert!(has_source_files(dir.path(), "java"));
    }

    #[test]
    fn test_ignores_vcs_metadata() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "README.md");
        touch(dir.path(), ".git/hooks/Template.java");
        assert!(!has_source_files(dir.path(), "java"));
    }

    #[test]
    fn test_finds_modules_sorted() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "web/src/main/java/App.java");
        touch(dir.path(), "core/src/main/java/Core.java");
        touch(dir.path(), "core/src/test/java/CoreTest.java");

        let roots = find_module_roots(dir.path(), &java_root());
        assert_eq!(
            roots,
            vec![
                dir.path().join("core/src/main/java"),
                dir.path().join("web/src/main/java"),
            ]
        );
    }

    #[test]
    fn test_single_module_at_checkout_root() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "src/main/java/App.java");
        let roots = find_module_roots(dir.path(), &java_root());
        assert_eq!(roots, vec![dir.path().join("src/main/java")]);
    }

    #[test]
    fn test_flat_layout_has_no_modules() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "src/org/acme/App.java");
        assert!(find_module_roots(dir.path(), &java_root()).is_empty());
    }

    #[test]
    fn test_module_labels() {
        let checkout = Path::new("/tmp/repos/demo");
        assert_eq!(
            module_label(checkout, &checkout.join("core/src/main/java"), &java_root()),
            "core"
        );
        assert_eq!(
            module_label(checkout, &checkout.join("a/b/src/main/java"), &java_root()),
            "a_b"
        );
        assert_eq!(
            module_label(checkout, &checkout.join("src/main/java"), &java_root()),
            "root"
        );
    }
}
