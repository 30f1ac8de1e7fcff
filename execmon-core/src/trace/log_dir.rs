//! Trace logs stored as one JSON snapshot per reactor and tick.

use super::TraceReader;
use crate::error::TraceError;
use crate::model::{Assembly, Conflict, Core, EntitySet, Token};
use execmon_types::{ReactorName, Tick, TokenKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// File name suffix of a per-reactor, per-tick snapshot
pub const SNAPSHOT_SUFFIX: &str = ".assembly.json";

/// On-disk form of one core: `<log>/<reactor>/<tick>.assembly.json`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblySnapshot {
    #[serde(default)]
    pub tokens: Vec<Token>,
    #[serde(default)]
    pub conflicts: Vec<ConflictRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictRecord {
    #[serde(default)]
    pub token: Option<TokenKey>,
    pub message: String,
}

impl AssemblySnapshot {
    pub fn from_core(core: &Core) -> Self {
        Self {
            tokens: core.assembly.tokens().cloned().collect(),
            conflicts: core
                .conflicts
                .iter()
                .map(|c| ConflictRecord {
                    token: c.token.clone(),
                    message: c.message.clone(),
                })
                .collect(),
        }
    }

    pub fn into_core(self, reactor: ReactorName, tick: Tick) -> Core {
        let conflicts = self
            .conflicts
            .into_iter()
            .map(|record| Conflict {
                tick,
                reactor: reactor.clone(),
                token: record.token,
                message: record.message,
            })
            .collect();
        Core::new(tick, Assembly::with_tokens(reactor, self.tokens)).with_conflicts(conflicts)
    }
}

/// Trace reader over a log directory of per-reactor snapshot files
#[derive(Debug)]
pub struct LogDirReader {
    root: PathBuf,
    index: BTreeMap<Tick, BTreeMap<ReactorName, PathBuf>>,
}

impl LogDirReader {
    /// Open and index a log directory. A missing directory is an error.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, TraceError> {
        let root = path.as_ref().to_path_buf();
        let meta = fs::metadata(&root).map_err(|source| TraceError::Open {
            path: root.clone(),
            source,
        })?;
        if !meta.is_dir() {
            return Err(TraceError::Open {
                path: root,
                source: io::Error::new(io::ErrorKind::InvalidInput, "not a directory"),
            });
        }

        let mut reader = Self {
            root,
            index: BTreeMap::new(),
        };
        reader.refresh()?;
        Ok(reader)
    }

    /// Rescan the directory, picking up snapshots written since the last scan
    pub fn refresh(&mut self) -> Result<(), TraceError> {
        let mut index: BTreeMap<Tick, BTreeMap<ReactorName, PathBuf>> = BTreeMap::new();

        for entry in WalkDir::new(&self.root).min_depth(2).max_depth(2) {
            let entry = entry.map_err(|e| TraceError::Open {
                path: self.root.clone(),
                source: e.into(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some((reactor, tick)) = parse_snapshot_path(entry.path()) else {
                continue;
            };
            index
                .entry(tick)
                .or_default()
                .insert(reactor, entry.path().to_path_buf());
        }

        tracing::debug!(
            root = %self.root.display(),
            ticks = index.len(),
            "indexed trace log"
        );
        self.index = index;
        Ok(())
    }

    pub fn reactors(&self) -> Vec<ReactorName> {
        let mut names: Vec<ReactorName> = self
            .index
            .values()
            .flat_map(|frame| frame.keys().cloned())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    fn load(&self, reactor: &ReactorName, tick: Tick, path: &Path) -> Result<Core, TraceError> {
        let contents = fs::read_to_string(path).map_err(|source| TraceError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let snapshot: AssemblySnapshot =
            serde_json::from_str(&contents).map_err(|source| TraceError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(snapshot.into_core(reactor.clone(), tick))
    }
}

impl TraceReader for LogDirReader {
    fn query_at_tick(&self, tick: Tick) -> Result<EntitySet, TraceError> {
        let frame = self
            .index
            .get(&tick)
            .ok_or(TraceError::TickOutOfRange(tick))?;

        let mut set = EntitySet::new(tick);
        for (reactor, path) in frame {
            let core = self.load(reactor, tick, path)?;
            set.insert(reactor.clone(), Arc::new(core))?;
        }
        Ok(set)
    }

    fn ticks(&self) -> Vec<Tick> {
        self.index.keys().copied().collect()
    }

    fn log_path(&self) -> Option<&Path> {
        Some(&self.root)
    }
}

/// `<reactor>/<tick>.assembly.json` into its reactor and tick
fn parse_snapshot_path(path: &Path) -> Option<(ReactorName, Tick)> {
    let file_name = path.file_name()?.to_str()?;
    let tick = Tick::parse(file_name.strip_suffix(SNAPSHOT_SUFFIX)?)?;
    let reactor = path.parent()?.file_name()?.to_str()?;
    Some((ReactorName::new(reactor), tick))
}

/// Write `core` into a log directory in the layout `LogDirReader` reads
pub fn write_core(root: &Path, core: &Core) -> Result<PathBuf, TraceError> {
    let dir = root.join(core.reactor_name.as_str());
    fs::create_dir_all(&dir).map_err(|source| TraceError::Write {
        path: dir.clone(),
        source,
    })?;
    let path = dir.join(format!("{}{}", core.tick.as_u64(), SNAPSHOT_SUFFIX));
    let json = serde_json::to_string_pretty(&AssemblySnapshot::from_core(core)).map_err(
        |source| TraceError::Serialize {
            path: path.clone(),
            source,
        },
    )?;
    fs::write(&path, json).map_err(|source| TraceError::Write {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}
