//! Mapping of lock keys onto file names and semaphore names.

use sha2::{Digest, Sha512};
use std::path::{Path, PathBuf};

use keyed_mutex_core::error::{LockError, LockResult};

/// Portable file name length (includes hash and extension).
const PORTABLE_FILE_NAME_LENGTH: usize = 64;

/// Hash length in Base32 characters (160 bits / 5 bits per char).
const HASH_LENGTH_IN_CHARS: usize = 32;

/// Hash characters used in semaphore names; macOS caps names at 31 bytes.
const SEMAPHORE_HASH_CHARS: usize = 24;

/// Base32 alphabet (RFC 4648).
const BASE32_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

const EXTENSION: &str = ".lock";

/// Builds the lock file path for `key` inside `directory`.
///
/// # Rules
///
/// - Alphanumeric characters and `_` are kept, everything else becomes `_`
/// - A Base32 hash of the full key is appended, so keys differing only in
///   replaced characters or case never share a file
/// - The readable prefix is truncated to keep the name portable
pub fn lock_file_path(directory: &Path, key: &str) -> LockResult<PathBuf> {
    validate_key(key)?;

    let base_name = convert_to_valid_base_name(key);
    let key_hash = compute_hash(key.as_bytes());

    let prefix_chars = PORTABLE_FILE_NAME_LENGTH
        .saturating_sub(key_hash.len())
        .saturating_sub(EXTENSION.len());
    let prefix: String = base_name.chars().take(prefix_chars).collect();

    Ok(directory.join(format!("{prefix}{key_hash}{EXTENSION}")))
}

/// Builds the POSIX semaphore name for `key`.
///
/// Names are `/km` followed by a hash of the key, which satisfies the
/// single-leading-slash rule and the platform length limits.
pub fn semaphore_name(key: &str) -> LockResult<String> {
    validate_key(key)?;
    let key_hash = compute_hash(key.as_bytes());
    Ok(format!("/km{}", &key_hash[..SEMAPHORE_HASH_CHARS]))
}

fn validate_key(key: &str) -> LockResult<()> {
    if key.is_empty() {
        return Err(LockError::InvalidKey("lock key cannot be empty".to_string()));
    }
    if key.contains('\0') {
        return Err(LockError::InvalidKey(
            "lock key cannot contain NUL characters".to_string(),
        ));
    }
    Ok(())
}

fn convert_to_valid_base_name(key: &str) -> String {
    const REPLACEMENT_CHAR: char = '_';

    key.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == REPLACEMENT_CHAR {
                ch
            } else {
                REPLACEMENT_CHAR
            }
        })
        .collect()
}

fn compute_hash(bytes: &[u8]) -> String {
    let hash_bytes = Sha512::digest(bytes);

    // 160 bits encode to exactly 32 Base32 characters.
    let mut chars = String::with_capacity(HASH_LENGTH_IN_CHARS);
    let mut bit_buffer = 0u32;
    let mut bits_remaining = 0u32;

    for &byte in &hash_bytes[..20] {
        bit_buffer |= (byte as u32) << bits_remaining;
        bits_remaining += 8;

        while bits_remaining >= 5 {
            chars.push(BASE32_ALPHABET[(bit_buffer & 0x1f) as usize] as char);
            bit_buffer >>= 5;
            bits_remaining -= 5;
        }
    }

    chars
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readable_prefix_and_extension() {
        let dir = Path::new("/tmp/locks");
        let path = lock_file_path(dir, "my-lock").unwrap();
        let file_name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(file_name.starts_with("my_lock"));
        assert!(file_name.ends_with(".lock"));
        assert_eq!(path.parent(), Some(dir));
    }

    #[test]
    fn test_invalid_chars_do_not_collide() {
        let dir = Path::new("/tmp/locks");
        let slash = lock_file_path(dir, "foo/bar").unwrap();
        let underscore = lock_file_path(dir, "foo_bar").unwrap();
        assert!(slash.to_string_lossy().contains("foo_bar"));
        assert_ne!(slash, underscore);
    }

    #[test]
    fn test_long_keys_stay_portable() {
        let key = "k".repeat(1000);
        let path = lock_file_path(Path::new("/tmp"), &key).unwrap();
        let file_name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert_eq!(file_name.len(), PORTABLE_FILE_NAME_LENGTH);
    }

    #[test]
    fn test_empty_key_is_rejected() {
        assert!(matches!(
            lock_file_path(Path::new("/tmp"), ""),
            Err(LockError::InvalidKey(_))
        ));
        assert!(matches!(semaphore_name(""), Err(LockError::InvalidKey(_))));
    }

    #[test]
    fn test_semaphore_name_shape() {
        let name = semaphore_name("orders/42").unwrap();
        assert!(name.starts_with("/km"));
        assert_eq!(name.len(), 3 + SEMAPHORE_HASH_CHARS);
        assert_eq!(name.matches('/').count(), 1);
        assert_eq!(name, semaphore_name("orders/42").unwrap());
        assert_ne!(name, semaphore_name("orders/43").unwrap());
    }
}
