// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Slash separated path helpers
//!
//! Tree paths are plain strings so that digests and manifests are identical
//! on every host, regardless of the native separator.

pub fn join(a: &str, b: &str) -> String {
    let b = b.strip_prefix("./").unwrap_or(b);

    if a.is_empty() {
        b.to_owned()
    } else if b.is_empty() {
        a.to_owned()
    } else if a.ends_with('/') {
        format!("{a}{b}")
    } else {
        format!("{a}/{b}")
    }
}

pub fn file_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return path;
    }
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// Normalise a user supplied relative path: `./certs/`, `/certs` and `certs`
/// all become `certs`.
pub fn normalize(path: &str) -> String {
    path.split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Strip `root` from `path`, yielding the remainder without a leading `/`
///
/// Returns `None` when `path` doesn't live beneath `root`.
pub fn relative_to<'a>(path: &'a str, root: &str) -> Option<&'a str> {
    if path == root {
        return Some("");
    }
    let rest = path.strip_prefix(root)?;
    if root.ends_with('/') {
        Some(rest)
    } else {
        rest.strip_prefix('/')
    }
}

/// Returns true if the relative path would resolve outside of its root
pub fn escapes(path: &str) -> bool {
    path.starts_with('/') || path.split('/').any(|s| s == "..")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join() {
        assert_eq!(join(".", "a.txt"), "./a.txt");
        assert_eq!(join("1_1_5_14", "./lib/a.py"), "1_1_5_14/lib/a.py");
        assert_eq!(join("/", "usr"), "/usr");
        assert_eq!(join("", "usr"), "usr");
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name("./lib/a.py"), "a.py");
        assert_eq!(file_name("lib/"), "lib");
        assert_eq!(file_name("."), ".");
        assert_eq!(file_name("/"), "/");
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("./certs/"), "certs");
        assert_eq!(normalize("/ugm//backup"), "ugm/backup");
        assert_eq!(normalize("settings.toml"), "settings.toml");
    }

    #[test]
    fn test_relative_to() {
        assert_eq!(relative_to("./lib/a.py", "."), Some("lib/a.py"));
        assert_eq!(relative_to("/dev/root/a", "/dev/root"), Some("a"));
        assert_eq!(relative_to("/dev/rootfs/a", "/dev/root"), None);
        assert_eq!(relative_to(".", "."), Some(""));
    }

    #[test]
    fn test_escapes() {
        assert!(escapes("../etc/passwd"));
        assert!(escapes("lib/../../x"));
        assert!(escapes("/etc/passwd"));
        assert!(!escapes("lib/a.py"));
    }
}
