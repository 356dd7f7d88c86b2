use std::ffi::OsStr;
use std::fmt::Write as _;
use std::path::{Component, Path, PathBuf};

/// Renders a path for messages, preferring its canonical form.
pub fn best_effort_path_display(path: &Path) -> String {
    match path.canonicalize() {
        Ok(canonical_path) => canonical_path.display().to_string(),
        Err(_) => {
            let absolute_path = if path.is_absolute() {
                path.to_path_buf()
            } else {
                match std::env::current_dir() {
                    Ok(current_dir) => current_dir.join(path),
                    Err(_) => path.to_path_buf(),
                }
            };

            lexical_normalize(&absolute_path).display().to_string()
        }
    }
}

/// Returns the name a directory node should carry for `path`.
///
/// Paths without a final normal component (`.`, `..`, `/`, `foo/..`) are
/// resolved through their canonical form first. If even that has no file
/// name (the filesystem root), the path text itself is used.
pub fn base_name(path: &Path) -> String {
    if let Some(Component::Normal(name)) = path.components().next_back() {
        return name.to_string_lossy().into_owned();
    }

    path.canonicalize()
        .ok()
        .and_then(|canonical| canonical.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| path.display().to_string())
}

/// Name of a directory entry as text. Bytes that are not valid UTF-8 are
/// written as `\xNN` escapes, so distinct names never decode to the same key.
pub fn entry_name(name: &OsStr) -> String {
    if let Some(name) = name.to_str() {
        return name.to_owned();
    }

    let mut escaped = String::new();
    for chunk in name.as_encoded_bytes().utf8_chunks() {
        escaped.push_str(chunk.valid());
        for byte in chunk.invalid() {
            let _ = write!(escaped, "\\x{byte:02X}");
        }
    }
    escaped
}

fn lexical_normalize(path: &Path) -> PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(components.last(), Some(Component::Normal(_))) {
                    components.pop();
                }
            }
            _ => components.push(component),
        }
    }

    components.iter().collect()
}

pub trait PathExt {
    fn best_effort_display(&self) -> String;
    fn base_name(&self) -> String;
}

impl PathExt for Path {
    fn best_effort_display(&self) -> String {
        best_effort_path_display(self)
    }

    fn base_name(&self) -> String {
        base_name(self)
    }
}

impl PathExt for PathBuf {
    fn best_effort_display(&self) -> String {
        best_effort_path_display(self)
    }

    fn base_name(&self) -> String {
        base_name(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[rstest]
    #[case("some/dir", "dir")]
    #[case("some/dir/", "dir")]
    #[case("/abs/path/leaf", "leaf")]
    #[case("single", "single")]
    fn base_name_uses_last_normal_component(#[case] path: &str, #[case] expected: &str) {
        assert_eq!(Path::new(path).base_name(), expected);
    }

    #[test]
    fn base_name_resolves_parent_components() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let nested = temp_dir.path().join("outer").join("inner");
        std::fs::create_dir_all(&nested).expect("Failed to create nested dirs");

        let expected = temp_dir
            .path()
            .canonicalize()
            .expect("Failed to canonicalize temp dir")
            .join("outer");
        let expected_name = expected.file_name().unwrap().to_string_lossy().into_owned();

        assert_eq!(nested.join("..").base_name(), expected_name);
    }

    #[cfg(unix)]
    #[test]
    fn base_name_of_filesystem_root_is_path_text() {
        assert_eq!(Path::new("/").base_name(), "/");
    }

    #[test]
    fn entry_name_keeps_valid_names() {
        assert_eq!(entry_name(OsStr::new("ünïcödé 🚀")), "ünïcödé 🚀");
    }

    #[cfg(unix)]
    #[test]
    fn entry_name_escapes_invalid_bytes() {
        use std::os::unix::ffi::OsStrExt;

        assert_eq!(entry_name(OsStr::from_bytes(b"d\xff")), "d\\xFF");
        assert_eq!(entry_name(OsStr::from_bytes(b"\xfe\xffz")), "\\xFE\\xFFz");
        assert_ne!(
            entry_name(OsStr::from_bytes(b"d\xff")),
            entry_name(OsStr::from_bytes(b"d\xfe"))
        );
    }

    #[cfg(unix)]
    #[test]
    fn best_effort_display_normalizes_missing_paths() {
        let display = Path::new("/definitely/missing/../gone.txt").best_effort_display();
        assert_eq!(display, "/definitely/gone.txt");
    }
}
