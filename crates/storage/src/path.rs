//! Path validation for deployment-scoped storage.
//!
//! Every path handed to a backend is relative to the deployment root. The
//! snapshot path comes from configuration, so it is validated like any other
//! untrusted input before it reaches the filesystem.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Validates and normalizes a storage path.
///
/// `.` components and repeated or trailing separators are dropped, `..` is
/// resolved lexically and rejected if it would climb above the root. Null
/// bytes and Windows prefixes are rejected outright, as is a path that
/// normalizes to nothing.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use bestiary_storage::validate_path;
///
/// assert!(validate_path("indexes/creatures.json").is_ok());
/// assert!(validate_path("indexes/../creatures.json").is_ok());
/// assert!(validate_path("../creatures.json").is_err());
/// assert!(validate_path("a\0b").is_err());
/// assert_eq!(
///     validate_path("./indexes//old/../creatures.json").unwrap(),
///     Path::new("indexes/creatures.json")
/// );
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let original = path.as_ref();
    let invalid = || ErrorKind::InvalidPath(original.to_path_buf());
    let mut kept = Vec::new();
    for component in original.components() {
        match component {
            // Null bytes survive Path::components() on Unix but truncate
            // paths in the underlying syscalls.
            Component::Normal(part) if part.as_encoded_bytes().contains(&0) => exn::bail!(invalid()),
            Component::Normal(part) => kept.push(part),
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => exn::bail!(invalid()),
            Component::ParentDir => {
                if kept.pop().is_none() {
                    exn::bail!(invalid());
                }
            },
        }
    }
    if kept.is_empty() {
        exn::bail!(invalid());
    }
    Ok(kept.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_paths_pass_through() {
        assert_eq!(validate("creatures.json").unwrap(), Path::new("creatures.json"));
        assert_eq!(validate("indexes/v1/creatures.json").unwrap(), Path::new("indexes/v1/creatures.json"));
    }

    #[test]
    fn test_normalization() {
        assert_eq!(validate("indexes//creatures.json").unwrap(), Path::new("indexes/creatures.json"));
        assert_eq!(validate("./indexes/./creatures.json").unwrap(), Path::new("indexes/creatures.json"));
        assert_eq!(validate("indexes/").unwrap(), Path::new("indexes"));
        assert_eq!(validate("indexes/old/..").unwrap(), Path::new("indexes"));
    }

    #[test]
    fn test_leading_root_is_relative_to_deployment() {
        assert_eq!(validate("/indexes/creatures.json").unwrap(), Path::new("indexes/creatures.json"));
    }

    #[test]
    fn test_escaping_the_root_is_rejected() {
        assert!(validate("../creatures.json").is_err());
        assert!(validate("indexes/../../creatures.json").is_err());
        assert!(validate("..").is_err());
    }

    #[test]
    fn test_degenerate_paths_are_rejected() {
        assert!(validate("").is_err());
        assert!(validate(".").is_err());
        assert!(validate("//").is_err());
        assert!(validate("a\0b").is_err());
    }
}
