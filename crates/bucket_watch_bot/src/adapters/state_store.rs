use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::runtime::contract::{KnownState, NotificationId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateStoreError {
    #[error("{0}")]
    Io(String),
    #[error("{0}")]
    InvalidFormat(String),
}

pub trait StateStore {
    /// Last saved state, or an empty state when nothing was saved yet.
    fn load(&self) -> Result<KnownState, StateStoreError>;

    /// Replaces the saved state. A crash mid-save leaves the previous file intact.
    fn save(&self, state: &KnownState) -> Result<(), StateStoreError>;
}

/// Known keys as a JSON array, notification ids as a JSON object keyed by object key.
///
/// The keys file is written before the ids file; `load` prunes ids whose key is
/// not known, so a crash between the two writes never breaks the subset rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonFileStateStore {
    known_keys_path: PathBuf,
    notification_ids_path: Option<PathBuf>,
}

impl JsonFileStateStore {
    pub fn new(known_keys_path: impl Into<PathBuf>, notification_ids_path: Option<PathBuf>) -> Self {
        Self {
            known_keys_path: known_keys_path.into(),
            notification_ids_path,
        }
    }

    pub fn known_keys_path(&self) -> &Path {
        &self.known_keys_path
    }

    pub fn notification_ids_path(&self) -> Option<&Path> {
        self.notification_ids_path.as_deref()
    }
}

impl StateStore for JsonFileStateStore {
    fn load(&self) -> Result<KnownState, StateStoreError> {
        let known_keys: BTreeSet<String> =
            read_json_or_default(&self.known_keys_path, "known keys")?;
        let notification_ids: BTreeMap<String, NotificationId> = match &self.notification_ids_path
        {
            Some(path) => read_json_or_default(path, "notification ids")?,
            None => BTreeMap::new(),
        };

        let mut state = KnownState {
            known_keys,
            notification_ids,
        };
        let pruned = state.prune_orphaned_ids();
        if pruned > 0 {
            tracing::warn!(
                component = "state_store",
                event = "orphaned_ids_pruned",
                pruned,
                "dropped notification ids for keys that are no longer known"
            );
        }
        Ok(state)
    }

    fn save(&self, state: &KnownState) -> Result<(), StateStoreError> {
        write_json_atomic(&self.known_keys_path, &state.known_keys, "known keys")?;
        if let Some(path) = &self.notification_ids_path {
            write_json_atomic(path, &state.notification_ids, "notification ids")?;
        }
        Ok(())
    }
}

fn read_json_or_default<T>(path: &Path, label: &str) -> Result<T, StateStoreError>
where
    T: DeserializeOwned + Default,
{
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
        Err(error) => {
            return Err(StateStoreError::Io(format!(
                "failed to read {label} file '{}': {error}",
                path.display()
            )))
        }
    };

    serde_json::from_str(&contents).map_err(|error| {
        StateStoreError::InvalidFormat(format!(
            "invalid {label} file '{}': {error}",
            path.display()
        ))
    })
}

fn write_json_atomic(
    path: &Path,
    value: &impl Serialize,
    label: &str,
) -> Result<(), StateStoreError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|error| {
            StateStoreError::Io(format!(
                "failed to create {label} directory '{}': {error}",
                parent.display()
            ))
        })?;
    }

    let serialized = serde_json::to_string_pretty(value).map_err(|error| {
        StateStoreError::Io(format!("failed to serialize {label} to json: {error}"))
    })?;

    let temp_path = temp_path_for(path);
    let mut temp_file = File::create(&temp_path).map_err(|error| {
        StateStoreError::Io(format!(
            "failed to create temp {label} file '{}': {error}",
            temp_path.display()
        ))
    })?;
    let written = temp_file
        .write_all(serialized.as_bytes())
        .and_then(|()| temp_file.sync_all());
    if let Err(error) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(StateStoreError::Io(format!(
            "failed to write temp {label} file '{}': {error}",
            temp_path.display()
        )));
    }
    drop(temp_file);

    fs::rename(&temp_path, path).map_err(|error| {
        let _ = fs::remove_file(&temp_path);
        StateStoreError::Io(format!(
            "failed to move temp {label} file '{}' to '{}': {error}",
            temp_path.display(),
            path.display()
        ))
    })?;

    sync_parent_dir(path).map_err(|error| {
        StateStoreError::Io(format!(
            "failed to sync directory of {label} file '{}': {error}",
            path.display()
        ))
    })
}

/// Makes the rename itself durable.
#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> std::io::Result<()> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    File::open(parent)?.sync_all()
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_nanos())
        .unwrap_or(0);
    let mut file_name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    file_name.push(format!(".tmp.{}.{nanos}", std::process::id()));
    path.with_file_name(file_name)
}
