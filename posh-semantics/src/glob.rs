//! Filename generation (`*`/`**`) over a [`System`]'s directory entries.
//!
//! A pattern is split on `/` into segments; each wildcard segment is
//! matched, sorted, against the current directory set's entries before the
//! next segment is considered. `**` additionally descends into every
//! subdirectory reachable from the current set, recursively.

use posh_env::System;
use posh_fnmatch::Pattern;
use std::path::Path;

fn join(dir: &str, name: &str) -> String {
    if dir == "/" {
        format!("/{name}")
    } else if dir == "." {
        name.to_owned()
    } else {
        format!("{dir}/{name}")
    }
}

fn collect_recursive<S: System>(system: &mut S, dir: &str, out: &mut Vec<String>) {
    out.push(dir.to_owned());
    let Ok(mut entries) = system.read_dir(Path::new(dir)) else {
        return;
    };
    entries.sort();
    for name in entries {
        if name == "." || name == ".." || name.starts_with('.') {
            continue;
        }
        let child = join(dir, &name);
        if system.read_dir(Path::new(&child)).is_ok() {
            collect_recursive(system, &child, out);
        }
    }
}

/// Expands `pattern` (already a fully-expanded, concatenated word) against
/// `system`'s directory tree. Returns the literal pattern unchanged, as a
/// single-element vector, if it carries no wildcard.
pub fn glob_expand<S: System>(pattern: &str, system: &mut S) -> Vec<String> {
    if !posh_fnmatch::has_wildcard(pattern) {
        return vec![pattern.to_owned()];
    }

    let absolute = pattern.starts_with('/');
    let segments: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    let base = if absolute { "/".to_owned() } else { ".".to_owned() };
    let mut candidates = vec![base];

    for segment in segments {
        let mut next = Vec::new();
        if segment == "**" {
            for dir in &candidates {
                collect_recursive(system, dir, &mut next);
            }
        } else if posh_fnmatch::has_wildcard(segment) {
            let Ok(pat) = Pattern::parse_filename_segment(segment) else {
                return Vec::new();
            };
            for dir in &candidates {
                if let Ok(mut entries) = system.read_dir(Path::new(dir)) {
                    entries.sort();
                    for name in entries {
                        if name != "." && name != ".." && pat.is_match(&name) {
                            next.push(join(dir, &name));
                        }
                    }
                }
            }
        } else {
            for dir in &candidates {
                next.push(join(dir, segment));
            }
        }
        candidates = next;
        if candidates.is_empty() {
            break;
        }
    }

    candidates.sort();
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use posh_env::system::r#virtual::VirtualSystem;

    #[test]
    fn literal_pattern_with_no_wildcard_passes_through() {
        let mut sys = VirtualSystem::new();
        assert_eq!(glob_expand("plain/path", &mut sys), vec!["plain/path".to_owned()]);
    }

    #[test]
    fn star_expands_to_sorted_matches_excluding_dotfiles() {
        let mut sys = VirtualSystem::new().with_dir(".", vec!["b.txt".into(), "a.txt".into(), ".hidden".into()]);
        assert_eq!(glob_expand("*.txt", &mut sys), vec!["a.txt".to_owned(), "b.txt".to_owned()]);
    }

    #[test]
    fn no_matches_yields_empty_list() {
        let mut sys = VirtualSystem::new().with_dir(".", vec!["a.txt".into()]);
        assert!(glob_expand("*.md", &mut sys).is_empty());
    }

    #[test]
    fn nested_segment_matches_within_each_directory() {
        let mut sys = VirtualSystem::new()
            .with_dir(".", vec!["sub".into()])
            .with_dir("sub", vec!["x.rs".into()]);
        assert_eq!(glob_expand("sub/*.rs", &mut sys), vec!["sub/x.rs".to_owned()]);
    }

    #[test]
    fn starstar_descends_recursively_before_matching_the_final_segment() {
        let mut sys = VirtualSystem::new()
            .with_dir(".", vec!["sub".into(), "top.rs".into()])
            .with_dir("sub", vec!["deep.rs".into()]);
        assert_eq!(
            glob_expand("**/*.rs", &mut sys),
            vec!["sub/deep.rs".to_owned(), "top.rs".to_owned()]
        );
    }
}
