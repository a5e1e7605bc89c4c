// Path resolution for sandboxed tool arguments
//
// Tool paths come from model output, so they are resolved without consulting
// the process working directory and compared component by component.

use std::path::{Component, Path, PathBuf};

/// Resolves tool-supplied paths against a fixed home directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResolver {
    home: PathBuf,
}

impl PathResolver {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self {
            home: normalize(&home.into()),
        }
    }

    /// Resolver rooted at the current user's home directory
    pub fn for_current_user() -> Option<Self> {
        dirs::home_dir().map(Self::new)
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Resolve a raw path argument
    ///
    /// - `~` / `~/x` expand to the home directory
    /// - absolute paths are taken as-is
    /// - relative paths resolve against home, never the working directory
    ///
    /// Surrounding whitespace is ignored. The result is lexically normalized
    /// (`.` and `..` folded). Symlinks are not resolved.
    pub fn resolve(&self, input: &str) -> PathBuf {
        let input = input.trim();
        let joined = if let Some(rest) = input.strip_prefix('~') {
            self.home.join(rest.trim_start_matches(['/', '\\']))
        } else {
            let path = Path::new(input);
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                self.home.join(path)
            }
        };
        normalize(&joined)
    }

    /// Render a path with the home directory replaced by `~`
    pub fn display(&self, path: &Path) -> String {
        match path.strip_prefix(&self.home) {
            Ok(rest) if rest.as_os_str().is_empty() => "~".to_string(),
            Ok(rest) => format!("~/{}", rest.display()),
            Err(_) => path.display().to_string(),
        }
    }
}

/// Fold `.` and `..` components without touching the filesystem
///
/// `..` at the root stays at the root, so `/../etc` normalizes to `/etc`.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
            Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                let at_root = out.parent().is_none();
                if !at_root {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

/// Whether `path` equals `root` or lies beneath it
///
/// Comparison is per path segment: `/Users/bobby` is not inside `/Users/bob`.
pub fn is_within(path: &Path, root: &Path) -> bool {
    path.starts_with(root)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> PathResolver {
        PathResolver::new("/home/tester")
    }

    #[test]
    fn test_tilde_expansion() {
        let r = resolver();
        assert_eq!(r.resolve("~"), PathBuf::from("/home/tester"));
        assert_eq!(
            r.resolve("~/Documents/a.txt"),
            PathBuf::from("/home/tester/Documents/a.txt")
        );
    }

    #[test]
    fn test_absolute_path_unchanged() {
        assert_eq!(resolver().resolve("/etc/passwd"), PathBuf::from("/etc/passwd"));
    }

    #[test]
    fn test_relative_path_resolves_against_home() {
        assert_eq!(
            resolver().resolve("Documents/notes.md"),
            PathBuf::from("/home/tester/Documents/notes.md")
        );
    }

    #[test]
    fn test_parent_components_are_folded() {
        let r = resolver();
        assert_eq!(
            r.resolve("~/Documents/../../../etc/passwd"),
            PathBuf::from("/etc/passwd")
        );
        assert_eq!(r.resolve("/../../etc"), PathBuf::from("/etc"));
        assert_eq!(
            r.resolve("~/Documents/./sub/../a.txt"),
            PathBuf::from("/home/tester/Documents/a.txt")
        );
    }

    #[test]
    fn test_segment_containment() {
        assert!(is_within(Path::new("/Users/bob/Documents"), Path::new("/Users/bob")));
        assert!(is_within(Path::new("/Users/bob"), Path::new("/Users/bob")));
        assert!(!is_within(Path::new("/Users/bobby"), Path::new("/Users/bob")));
        assert!(!is_within(Path::new("/Users/bobby/x"), Path::new("/Users/bob")));
    }

    #[test]
    fn test_display_with_home_marker() {
        let r = resolver();
        assert_eq!(r.display(Path::new("/home/tester/Documents")), "~/Documents");
        assert_eq!(r.display(Path::new("/home/tester")), "~");
        assert_eq!(r.display(Path::new("/srv/data")), "/srv/data");
    }
}
