//! File persistence helpers.
//!
//! Handles loading and saving state to disk with proper security. Every
//! file this crate writes holds either session tokens or data derived from
//! them, so all of them are written owner-only.

use serde::{Serialize, de::DeserializeOwned};
use std::path::{Path, PathBuf};
use std::io::Write;
use tracing::debug;

use crate::error::StoreError;

/// Settings file name.
pub const SETTINGS_FILE: &str = "settings.json";

/// Credential file name.
pub const CREDENTIALS_FILE: &str = "credentials.json";

/// Usage cache file name.
pub const USAGE_CACHE_FILE: &str = "usage_cache.json";

// ============================================================================
// Default Paths
// ============================================================================

/// Returns the default configuration directory.
///
/// - macOS: `~/Library/Application Support/usagebar`
/// - Linux: `~/.config/usagebar`
/// - Windows: `%APPDATA%\usagebar`
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|c| c.join("usagebar"))
        .unwrap_or_else(|| PathBuf::from(".usagebar"))
}

/// Returns the default settings file path.
pub fn default_settings_path() -> PathBuf {
    default_config_dir().join(SETTINGS_FILE)
}

/// Returns the default credential file path.
pub fn default_credentials_path() -> PathBuf {
    default_config_dir().join(CREDENTIALS_FILE)
}

/// Returns the default usage cache file path.
pub fn default_cache_path() -> PathBuf {
    default_config_dir().join(USAGE_CACHE_FILE)
}

// ============================================================================
// Security: File Permissions
// ============================================================================

/// Sets restrictive file permissions (0o600) on Unix systems.
#[cfg(unix)]
fn set_restrictive_permissions(file: &std::fs::File) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;

    file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}

/// Sets restrictive directory permissions (0o700) on Unix systems.
#[cfg(unix)]
async fn set_restrictive_dir_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;

    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700)).await?;
    debug!(path = %path.display(), mode = "0700", "Set restrictive directory permissions");
    Ok(())
}

/// No-op for non-Unix systems.
#[cfg(not(unix))]
fn set_restrictive_permissions(_file: &std::fs::File) -> Result<(), StoreError> {
    Ok(())
}

/// No-op for non-Unix systems.
#[cfg(not(unix))]
async fn set_restrictive_dir_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

// ============================================================================
// File Operations
// ============================================================================

/// Ensures a directory exists. Newly created directories are owner-only.
pub async fn ensure_dir(path: &Path) -> Result<(), StoreError> {
    if !tokio::fs::try_exists(path).await? {
        debug!(path = %path.display(), "Creating directory");
        tokio::fs::create_dir_all(path).await?;
        set_restrictive_dir_permissions(path).await?;
    }
    Ok(())
}

/// Saves data to a JSON file with secure permissions.
///
/// The data is written to a uniquely named sibling temp file that is
/// restricted to the owner before any content lands in it, flushed to disk,
/// then renamed over the target. A reader sees either the old file or the
/// new one, never a partial write, and concurrent writers never share a
/// temp file.
pub async fn save_json<T: Serialize>(path: &Path, data: &T) -> Result<(), StoreError> {
    debug!(path = %path.display(), "Saving JSON file");

    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    ensure_dir(&parent).await?;

    let json = serde_json::to_string_pretty(data)?;
    let bytes = json.len();

    let target = path.to_path_buf();
    tokio::task::spawn_blocking(move || write_atomic(&parent, &target, json.as_bytes()))
        .await
        .map_err(|e| StoreError::Io(std::io::Error::other(e)))??;

    debug!(path = %path.display(), bytes, "JSON file saved securely");
    Ok(())
}

/// The temp file is removed on drop unless it was persisted.
fn write_atomic(dir: &Path, target: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let mut file = tempfile::Builder::new()
        .prefix(".usagebar-")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    set_restrictive_permissions(file.as_file())?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(target).map_err(|e| e.error)?;
    Ok(())
}

/// Loads data from a JSON file.
pub async fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    debug!(path = %path.display(), "Loading JSON file");

    let content = tokio::fs::read_to_string(path).await?;
    let data = serde_json::from_str(&content)?;

    debug!(path = %path.display(), "JSON file loaded");
    Ok(data)
}

/// Removes a file. A missing file is not an error.
pub async fn remove_file(path: &Path) -> Result<bool, StoreError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            debug!(path = %path.display(), "Removed file");
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

// ============================================================================
// Tests
// ============================================================================
