//! Storage key construction.
//!
//! Key format: `[{environment}/]{root_folder}/{relative_name}`. Segments are
//! joined with `/` on every platform; backslashes are rewritten and empty
//! segments dropped so the same inputs always yield the same key.

/// Compose a storage key from an optional environment prefix, a root folder
/// and the relative name produced by the caller's naming function.
///
/// A leading `/` on the first non-empty segment is kept, so absolute local
/// directories can be used as root folders.
pub fn build_storage_key(environment: Option<&str>, root_folder: &str, relative_name: &str) -> String {
    let segments = [environment.unwrap_or(""), root_folder, relative_name];
    let mut key = String::new();

    for segment in segments {
        let normalized = segment.replace('\\', "/");
        let trimmed = if key.is_empty() {
            normalized.trim_end_matches('/')
        } else {
            normalized.trim_matches('/')
        };
        if trimmed.is_empty() {
            continue;
        }
        if !key.is_empty() && !key.ends_with('/') {
            key.push('/');
        }
        key.push_str(trimmed);
    }

    key
}
