//! Path utilities.

use std::path::{Component, Path, PathBuf};

/// Normalize a path lexically.
///
/// Removes `.` components and folds `..` into the preceding component
/// without touching the file system, so symlinked packages keep the
/// identity they were reached through.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Resolve `path` against `base` unless it is already absolute.
pub fn absolutize(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize_path(path)
    } else {
        normalize_path(&base.join(path))
    }
}

/// Path of `to` relative to the directory `from_dir`.
///
/// Both paths are expected to be absolute and normalized.
pub fn relative_path(from_dir: &Path, to: &Path) -> PathBuf {
    let from: Vec<_> = from_dir.components().collect();
    let target: Vec<_> = to.components().collect();
    let common = from
        .iter()
        .zip(&target)
        .take_while(|(a, b)| a == b)
        .count();

    let mut out = PathBuf::new();
    for _ in common..from.len() {
        out.push("..");
    }
    for component in &target[common..] {
        out.push(component);
    }
    out
}

/// Render a path with `/` separators.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| match c {
            Component::RootDir => String::new(),
            other => other.as_os_str().to_string_lossy().into_owned(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Specifier that reaches `target` from a module emitted at `from_file`.
///
/// Always starts with `./` or `../` so loaders never mistake it for a
/// package name.
pub fn relative_specifier(from_file: &Path, target: &Path) -> String {
    let from_dir = from_file.parent().unwrap_or(Path::new(""));
    let relative = to_slash(&relative_path(from_dir, target));
    if relative.starts_with("..") {
        relative
    } else {
        format!("./{relative}")
    }
}

/// File name without its last extension.
pub fn file_stem(path: &str) -> &str {
    let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    match name.rfind('.') {
        Some(0) | None => name,
        Some(dot) => &name[..dot],
    }
}

/// Last extension of `path`, including the leading dot, or `""`.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}
