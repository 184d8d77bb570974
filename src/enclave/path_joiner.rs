/*!
 * Host path joining strategies
 */

use std::fmt;
use std::path::Path;

/// Joins a base directory with a relative path the way the host expects
pub trait PathJoiner: Send + Sync + fmt::Debug {
    fn join(&self, base: &str, relative: &str) -> String;
}

/// Uses the platform's own path rules (`\` on Windows)
#[derive(Debug, Default, Clone, Copy)]
pub struct NativePathJoiner;

impl PathJoiner for NativePathJoiner {
    fn join(&self, base: &str, relative: &str) -> String {
        Path::new(base)
            .join(relative.trim_start_matches('/'))
            .to_string_lossy()
            .into_owned()
    }
}

/// Always joins with `/`, whatever the platform
#[derive(Debug, Default, Clone, Copy)]
pub struct PosixPathJoiner;

impl PathJoiner for PosixPathJoiner {
    fn join(&self, base: &str, relative: &str) -> String {
        posix_join(base, relative)
    }
}

/// Join two `/`-separated paths without doubling or dropping separators
pub fn posix_join(base: &str, relative: &str) -> String {
    let relative = relative.trim_start_matches('/');
    if relative.is_empty() {
        return base.to_string();
    }
    if base.is_empty() {
        return relative.to_string();
    }

    let trimmed = base.trim_end_matches('/');
    if trimmed.is_empty() {
        // base was "/" (or "//")
        format!("/{}", relative)
    } else {
        format!("{}/{}", trimmed, relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_posix_join() {
        assert_eq!(posix_join("/data", "svc"), "/data/svc");
        assert_eq!(posix_join("/data/", "/svc"), "/data/svc");
        assert_eq!(posix_join("/", "svc"), "/svc");
        assert_eq!(posix_join("/data", ""), "/data");
        assert_eq!(posix_join("", "svc/x"), "svc/x");
    }

    #[test]
    fn test_native_join_relative() {
        let joined = NativePathJoiner.join("base", "svc");
        assert_eq!(Path::new(&joined), Path::new("base").join("svc"));
    }

    #[test]
    fn test_native_join_ignores_leading_slash() {
        let joined = NativePathJoiner.join("base", "/svc");
        assert_eq!(Path::new(&joined), Path::new("base").join("svc"));
    }
}
