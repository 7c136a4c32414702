//! Bincode world snapshots with atomic writes, listing, pruning and fallback loading.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{debug, warn};

use crate::world::World;

const PREFIX: &str = "pixelciv-tick";
const EXTENSION: &str = ".bin";

/// A snapshot file found on disk.
#[derive(Debug, Clone)]
pub struct SnapshotMetadata {
    pub path: PathBuf,
    pub tick_count: u64,
    /// Milliseconds since the Unix epoch at save time.
    pub timestamp: u64,
    pub file_size: u64,
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("deserialization error: {0}")]
    Deserialize(String),

    #[error("corrupt snapshot {}: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("no valid snapshots found, create a world with: pixelciv generate")]
    NoValidSnapshots,
}

fn snapshot_filename(tick_count: u64, timestamp: u64) -> String {
    format!("{}{}-{}{}", PREFIX, tick_count, timestamp, EXTENSION)
}

/// Inverse of [`snapshot_filename`]: `pixelciv-tick{N}-{millis}.bin`.
fn parse_snapshot_filename(filename: &str) -> Option<(u64, u64)> {
    let (tick, ts) = filename
        .strip_suffix(EXTENSION)?
        .strip_prefix(PREFIX)?
        .split_once('-')?;
    Some((tick.parse().ok()?, ts.parse().ok()?))
}

fn unix_millis_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Structural checks a deserialized world must pass before it is simulated.
fn check_consistency(world: &World) -> Result<(), String> {
    let grid = &world.grid;
    let expected = grid.width() as usize * grid.height() as usize;
    if grid.cells().len() != expected {
        return Err(format!(
            "grid holds {} cells, expected {}x{}",
            grid.cells().len(),
            grid.width(),
            grid.height()
        ));
    }
    if world.terrain.width() != grid.width() || world.terrain.height() != grid.height() {
        return Err(format!(
            "terrain is {}x{} but grid is {}x{}",
            world.terrain.width(),
            world.terrain.height(),
            grid.width(),
            grid.height()
        ));
    }
    if world.terrain.cells().len() != expected {
        return Err("terrain cell count does not match its dimensions".to_string());
    }
    Ok(())
}

/// Write a snapshot of `world` into `snapshot_dir`.
///
/// The bytes go to a hidden temp file first and are renamed into place, so a
/// failed write never leaves a half-written snapshot behind.
pub fn save_snapshot(world: &World, snapshot_dir: &Path) -> Result<PathBuf, SnapshotError> {
    fs::create_dir_all(snapshot_dir)?;

    let filename = snapshot_filename(world.tick_count, unix_millis_now());
    let target = snapshot_dir.join(&filename);
    let tmp = snapshot_dir.join(format!(".{}.tmp", filename));

    let encoded = bincode::serialize(world).map_err(|e| SnapshotError::Serialize(e.to_string()))?;

    let written = fs::write(&tmp, &encoded).and_then(|_| fs::rename(&tmp, &target));
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(SnapshotError::Io(e));
    }

    debug!(path = %target.display(), bytes = encoded.len(), "Snapshot written");
    Ok(target)
}

pub fn load_snapshot(path: &Path) -> Result<World, SnapshotError> {
    let data = fs::read(path)?;
    let world: World =
        bincode::deserialize(&data).map_err(|e| SnapshotError::Deserialize(e.to_string()))?;

    check_consistency(&world).map_err(|reason| SnapshotError::Corrupt {
        path: path.to_path_buf(),
        reason,
    })?;

    Ok(world)
}

/// Snapshots in `snapshot_dir`, newest first. A missing directory lists as empty.
pub fn list_snapshots(snapshot_dir: &Path) -> Result<Vec<SnapshotMetadata>, SnapshotError> {
    if !snapshot_dir.exists() {
        return Ok(Vec::new());
    }

    let mut snapshots = Vec::new();
    for entry in fs::read_dir(snapshot_dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some((tick_count, timestamp)) = parse_snapshot_filename(name) else {
            continue;
        };
        let file_size = entry.metadata().map(|m| m.len()).unwrap_or(0);
        snapshots.push(SnapshotMetadata {
            path,
            tick_count,
            timestamp,
            file_size,
        });
    }

    snapshots.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then(b.tick_count.cmp(&a.tick_count))
    });
    Ok(snapshots)
}

/// Delete all but the `max_snapshots` newest snapshots. Returns the deleted paths.
pub fn prune_snapshots(
    snapshot_dir: &Path,
    max_snapshots: usize,
) -> Result<Vec<PathBuf>, SnapshotError> {
    let snapshots = list_snapshots(snapshot_dir)?;
    let mut deleted = Vec::new();
    for snapshot in snapshots.iter().skip(max_snapshots) {
        fs::remove_file(&snapshot.path)?;
        deleted.push(snapshot.path.clone());
    }
    Ok(deleted)
}

/// Load the newest snapshot that decodes and passes consistency checks.
pub fn load_latest_valid_snapshot(snapshot_dir: &Path) -> Result<World, SnapshotError> {
    for snapshot in list_snapshots(snapshot_dir)? {
        match load_snapshot(&snapshot.path) {
            Ok(world) => return Ok(world),
            Err(e) => warn!(
                path = %snapshot.path.display(),
                error = %e,
                "Skipping unreadable snapshot"
            ),
        }
    }
    Err(SnapshotError::NoValidSnapshots)
}
