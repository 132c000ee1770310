//! Installation identity for license binding.
//!
//! Each installation owns a random identifier persisted at
//! `~/.ploston/instance_id`. Offline licenses are bound to it and online
//! validation requests carry it so the server can count seats.

use crate::error::{LicenseError, LicenseResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

/// File name of the persisted identifier inside the config directory.
pub const INSTANCE_ID_FILE: &str = "instance_id";

const WINNER_READ_ATTEMPTS: u32 = 20;
const WINNER_READ_INTERVAL: Duration = Duration::from_millis(10);

/// Information about the current host, sent alongside online validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Operating system name.
    pub os_name: String,
    /// CPU architecture.
    pub arch: String,
    /// Hostname.
    pub hostname: String,
}

impl DeviceInfo {
    /// Collects information about the current device.
    #[must_use]
    pub fn collect() -> Self {
        Self {
            os_name: env::consts::OS.to_string(),
            arch: env::consts::ARCH.to_string(),
            hostname: get_hostname(),
        }
    }
}

/// Gets the machine hostname.
fn get_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Stable per-installation identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(String);

impl InstanceId {
    /// Returns the textual identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reads or issues the instance identifier stored under a config directory.
#[derive(Debug, Clone)]
pub struct InstanceIdentity {
    path: PathBuf,
}

impl InstanceIdentity {
    /// Uses `<config_dir>/instance_id`.
    #[must_use]
    pub fn new(config_dir: impl AsRef<Path>) -> Self {
        Self {
            path: config_dir.as_ref().join(INSTANCE_ID_FILE),
        }
    }

    /// Returns the path of the persisted identifier.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the persisted identifier, issuing one on first use.
    ///
    /// Creation is atomic: the new identifier is written to a private
    /// temporary file and hard-linked into place, so concurrent first calls
    /// (threads or processes sharing the directory) all converge on the
    /// winner's value and a reader never sees a half-written file.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::IdentityPersistFailure`] if the directory or
    /// file cannot be created or read.
    pub fn get_or_create(&self) -> LicenseResult<InstanceId> {
        if let Some(existing) = self.read_existing()? {
            debug!(path = ?self.path, "Reusing instance identity");
            return Ok(existing);
        }

        let dir = self
            .path
            .parent()
            .ok_or_else(|| persist_failure(&self.path, "path has no parent directory"))?;
        fs::create_dir_all(dir).map_err(|e| persist_failure(dir, e))?;

        let candidate = Uuid::new_v4().to_string();
        let staging = dir.join(format!(".{INSTANCE_ID_FILE}.{candidate}"));
        let linked = write_staged(&staging, &candidate).and_then(|()| fs::hard_link(&staging, &self.path));
        let _ = fs::remove_file(&staging);

        match linked {
            Ok(()) => {
                info!(path = ?self.path, "Issued new instance identity");
                Ok(InstanceId(candidate))
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => self.read_winner(),
            // vfat and some network mounts reject link(2) with EPERM.
            Err(e) if matches!(e.kind(), ErrorKind::Unsupported | ErrorKind::PermissionDenied) => {
                self.create_exclusive(candidate)
            }
            Err(e) => Err(persist_failure(&self.path, e)),
        }
    }

    /// Fallback for filesystems without hard links.
    fn create_exclusive(&self, candidate: String) -> LicenseResult<InstanceId> {
        match OpenOptions::new().write(true).create_new(true).open(&self.path) {
            Ok(mut file) => {
                file.write_all(candidate.as_bytes())
                    .and_then(|()| file.sync_all())
                    .map_err(|e| persist_failure(&self.path, e))?;
                info!(path = ?self.path, "Issued new instance identity");
                Ok(InstanceId(candidate))
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => self.read_winner(),
            Err(e) => Err(persist_failure(&self.path, e)),
        }
    }

    /// Reads the identity another process created, giving a concurrent
    /// `create_exclusive` writer a moment to fill the file.
    fn read_winner(&self) -> LicenseResult<InstanceId> {
        for _ in 0..WINNER_READ_ATTEMPTS {
            if let Some(existing) = self.read_existing()? {
                return Ok(existing);
            }
            thread::sleep(WINNER_READ_INTERVAL);
        }
        Err(persist_failure(&self.path, "identity file is empty"))
    }

    fn read_existing(&self) -> LicenseResult<Option<InstanceId>> {
        match fs::read_to_string(&self.path) {
            Ok(content) => {
                let id = content.trim();
                if id.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(InstanceId(id.to_string())))
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(persist_failure(&self.path, e)),
        }
    }
}

fn write_staged(path: &Path, content: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    file.write_all(content.as_bytes())?;
    file.sync_all()
}

fn persist_failure(path: &Path, cause: impl std::fmt::Display) -> LicenseError {
    LicenseError::IdentityPersistFailure(format!("{}: {cause}", path.display()))
}

/// Default per-user config directory (`~/.ploston`).
#[must_use]
pub fn default_config_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".ploston"))
        .unwrap_or_else(|| PathBuf::from(".ploston"))
}
