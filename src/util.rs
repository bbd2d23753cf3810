use anyhow::{Context, Result};
use std::fs;
use std::path::{Component, Path};

pub fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("read {}", path.display()))
}

/// `path` relative to `repo_root`, with `/` separators on every platform.
pub fn normalize_rel_path(repo_root: &Path, path: &Path) -> Result<String> {
    let rel = path
        .strip_prefix(repo_root)
        .with_context(|| format!("{} is outside {}", path.display(), repo_root.display()))?;
    Ok(normalize_path(rel))
}

pub fn normalize_path(path: &Path) -> String {
    let parts: Vec<_> = path
        .components()
        .filter_map(|comp| match comp {
            Component::Normal(part) => Some(part.to_string_lossy()),
            Component::ParentDir => Some("..".into()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

/// Lines `start_line..=end_line` (1-based) joined with `\n`.
pub fn slice_lines(content: &str, start_line: usize, end_line: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    if lines.is_empty() {
        return String::new();
    }
    let start = start_line.max(1) - 1;
    if start >= lines.len() {
        return String::new();
    }
    let end = end_line.max(start + 1).min(lines.len());
    lines[start..end].join("\n")
}

/// Uppercased identifier fragment: every non-alphanumeric character becomes `_`.
pub fn sanitize_id_part(raw: &str) -> String {
    raw.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() {
                ch.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slices_inclusive_line_ranges() {
        let content = "a\nb\nc\nd";
        assert_eq!(slice_lines(content, 2, 3), "b\nc");
        assert_eq!(slice_lines(content, 4, 9), "d");
        assert_eq!(slice_lines(content, 7, 9), "");
    }

    #[test]
    fn normalizes_relative_paths() {
        let root = Path::new("/repo");
        assert_eq!(
            normalize_rel_path(root, Path::new("/repo/app/./main.py")).unwrap(),
            "app/main.py"
        );
        assert!(normalize_rel_path(root, Path::new("/elsewhere/x.py")).is_err());
        assert_eq!(normalize_path(Path::new("")), ".");
    }

    #[test]
    fn sanitizes_paths() {
        assert_eq!(sanitize_id_part("app/api/users"), "APP_API_USERS");
        assert_eq!(sanitize_id_part("fastapi-nano"), "FASTAPI_NANO");
    }
}
