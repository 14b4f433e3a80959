//! Archive-relative naming.
//!
//! The prefix is the longest common ancestor of the *parent directories* of
//! the roots. A single root therefore keeps its own name inside the archive
//! (`/data/photos` imports as `photos/...`, `/data/notes.txt` as `notes.txt`),
//! and sibling roots keep theirs (`/a/x` + `/a/y` import as `x/...`, `y/...`).

use std::path::{Component, Path, PathBuf};

use crate::error::ImportError;

/// Collapse `.` and `..` lexically. `..` above the root stays at the root.
///
/// `std::path::absolute` keeps `..`, which would leave roots like
/// `/t/work/../x` outside a prefix computed segment by segment.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for c in path.components() {
        match c {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(c),
            },
            _ => out.push(c),
        }
    }
    out.into_iter().collect()
}

/// Longest shared ancestor of the roots' parents; purely lexical, no I/O.
pub fn common_prefix<P: AsRef<Path>>(roots: &[P]) -> PathBuf {
    let mut shared: Option<Vec<Component<'_>>> = None;
    for root in roots {
        let root = root.as_ref();
        let anchor = root.parent().unwrap_or(root);
        let comps: Vec<Component<'_>> = anchor.components().collect();
        shared = Some(match shared {
            None => comps,
            Some(mut acc) => {
                let n = acc
                    .iter()
                    .zip(comps.iter())
                    .take_while(|(a, b)| a == b)
                    .count();
                acc.truncate(n);
                acc
            }
        });
    }
    shared.unwrap_or_default().into_iter().collect()
}

/// `path` with `prefix` stripped, joined with `/`.
pub fn archive_name(prefix: &Path, path: &Path) -> Result<String, ImportError> {
    let outside = || ImportError::OutsidePrefix {
        path: path.to_path_buf(),
        prefix: prefix.to_path_buf(),
    };
    let rel = path.strip_prefix(prefix).map_err(|_| outside())?;

    let mut parts = Vec::new();
    for c in rel.components() {
        match c {
            Component::Normal(s) => parts.push(s.to_string_lossy()),
            Component::CurDir => {}
            _ => return Err(outside()),
        }
    }
    if parts.is_empty() {
        return Err(outside());
    }
    Ok(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_directory_root_keeps_its_name() {
        let prefix = common_prefix(&["/data/photos"]);
        assert_eq!(prefix, PathBuf::from("/data"));
        assert_eq!(
            archive_name(&prefix, Path::new("/data/photos/2024/a.jpg")).unwrap(),
            "photos/2024/a.jpg"
        );
    }

    #[test]
    fn single_file_root_imports_as_its_file_name() {
        let prefix = common_prefix(&["/data/notes.txt"]);
        assert_eq!(prefix, PathBuf::from("/data"));
        assert_eq!(
            archive_name(&prefix, Path::new("/data/notes.txt")).unwrap(),
            "notes.txt"
        );
    }

    #[test]
    fn siblings_share_their_parent() {
        let prefix = common_prefix(&["/a/b/x", "/a/b/y/z.txt"]);
        assert_eq!(prefix, PathBuf::from("/a/b"));
        assert_eq!(archive_name(&prefix, Path::new("/a/b/y/z.txt")).unwrap(), "y/z.txt");
    }

    #[test]
    fn nested_roots_collapse_to_the_outer_parent() {
        let prefix = common_prefix(&["/a/b", "/a/b/c"]);
        assert_eq!(prefix, PathBuf::from("/a"));
        assert_eq!(archive_name(&prefix, Path::new("/a/b/c/f")).unwrap(), "b/c/f");
    }

    #[test]
    fn segment_level_not_character_level() {
        // "/srv/app1" and "/srv/app10" share "/srv", not "/srv/app1"
        let prefix = common_prefix(&["/srv/app1/f", "/srv/app10/g"]);
        assert_eq!(prefix, PathBuf::from("/srv"));
    }

    #[test]
    fn filesystem_root_is_its_own_prefix() {
        let prefix = common_prefix(&["/"]);
        assert_eq!(prefix, PathBuf::from("/"));
        assert_eq!(archive_name(&prefix, Path::new("/etc/hosts")).unwrap(), "etc/hosts");
    }

    #[test]
    fn names_never_start_with_a_separator_or_escape() {
        let prefix = PathBuf::from("/a");
        let name = archive_name(&prefix, Path::new("/a/b/c")).unwrap();
        assert!(!name.starts_with('/'));
        assert!(archive_name(&prefix, Path::new("/other/c")).is_err());
        assert!(archive_name(&prefix, Path::new("/a")).is_err());
        assert!(archive_name(&prefix, Path::new("/a/../etc")).is_err());
    }

    #[test]
    fn normalize_collapses_dot_segments() {
        assert_eq!(normalize(Path::new("/t/work/../x")), PathBuf::from("/t/x"));
        assert_eq!(normalize(Path::new("/t/./work/y/")), PathBuf::from("/t/work/y"));
        assert_eq!(normalize(Path::new("/../etc")), PathBuf::from("/etc"));
        assert_eq!(normalize(Path::new("a/../../b")), PathBuf::from("../b"));
    }

    #[test]
    fn parent_segments_in_roots_do_not_escape_the_prefix() {
        let roots = ["/t/work/../x", "/t/work/y"].map(|r| normalize(Path::new(r)));
        let prefix = common_prefix(&roots);
        assert_eq!(prefix, PathBuf::from("/t"));
        assert_eq!(
            archive_name(&prefix, &roots[0].join("g.txt")).unwrap(),
            "x/g.txt"
        );
        assert_eq!(archive_name(&prefix, &roots[1].join("h")).unwrap(), "work/y/h");
    }

    #[test]
    fn empty_root_set_has_empty_prefix() {
        let none: [&str; 0] = [];
        assert_eq!(common_prefix(&none), PathBuf::new());
    }
}
