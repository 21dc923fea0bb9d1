//! Object key generation

use std::path::Path;

use uuid::Uuid;

/// Generate a fresh storage key for `path`
///
/// The key is a random UUID followed by the original extension, if any.
/// Nothing else from the path ends up in the key.
pub fn object_key(path: &Path) -> String {
    let token = Uuid::new_v4();
    match path.extension() {
        Some(ext) if !ext.is_empty() => format!("{token}.{}", ext.to_string_lossy()),
        _ => token.to_string(),
    }
}
