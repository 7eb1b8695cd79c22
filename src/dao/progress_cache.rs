//! Local key/value cache mirroring a session's progress so a client can resume after a
//! reload. The cache is advisory: the record store always wins on conflict.

use std::{collections::BTreeMap, fs, io::ErrorKind, path::PathBuf, sync::RwLock};

use dashmap::DashMap;
use thiserror::Error;

use crate::state::{
    outcome::Outcome,
    session::{Round, Session},
};

/// Cached team identifier.
pub const KEY_TEAM_ID: &str = "teamId";
/// Present with `true` once round 2 is recorded.
pub const KEY_ROUND2_DRAWN: &str = "round2Drawn";
/// Present with `true` once round 3 is recorded.
pub const KEY_ROUND3_DRAWN: &str = "round3Drawn";
/// Type key of the round 2 outcome, used to constrain round 3.
pub const KEY_ROUND2_OUTCOME_TYPE: &str = "round2OutcomeType";

const FLAG_SET: &str = "true";

/// Result alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Failures raised by persistent cache backends.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Reading or writing the cache file failed.
    #[error("failed to access progress cache `{path}`")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The cache file does not hold a JSON object of strings.
    #[error("failed to decode progress cache `{path}`")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// The cache content could not be serialised.
    #[error("failed to encode progress cache")]
    Encode {
        #[source]
        source: serde_json::Error,
    },
}

/// Progress read back from the cache.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CachedProgress {
    /// Team the session was last verified for.
    pub team_id: Option<String>,
    /// Round 2 was recorded at last sync.
    pub round2_drawn: bool,
    /// Round 3 was recorded at last sync.
    pub round3_drawn: bool,
    /// Round 2 outcome type, when known.
    pub round2_outcome: Option<Outcome>,
}

/// Scoped key/value surface backing a single session.
pub trait ProgressCache: Send + Sync {
    /// Read `key`.
    fn get(&self, key: &str) -> Option<String>;
    /// Write `key`.
    fn set(&self, key: &str, value: String) -> CacheResult<()>;
    /// Delete `key` if present.
    fn remove(&self, key: &str) -> CacheResult<()>;
    /// Delete every key.
    fn clear(&self) -> CacheResult<()>;
    /// Keys currently present.
    fn keys(&self) -> Vec<String>;

    /// Decode the typed progress stored under the well-known keys.
    fn load_progress(&self) -> CachedProgress {
        CachedProgress {
            team_id: self.get(KEY_TEAM_ID).filter(|team| !team.is_empty()),
            round2_drawn: self.get(KEY_ROUND2_DRAWN).is_some(),
            round3_drawn: self.get(KEY_ROUND3_DRAWN).is_some(),
            round2_outcome: self
                .get(KEY_ROUND2_OUTCOME_TYPE)
                .as_deref()
                .and_then(Outcome::from_type_key),
        }
    }

    /// Overwrite cached progress with the values of a freshly verified session.
    fn store_verified(&self, session: &Session) -> CacheResult<()> {
        self.set(KEY_TEAM_ID, session.team_id.clone())?;
        self.write_flag(KEY_ROUND2_DRAWN, session.draw_flags.round2)?;
        self.write_flag(KEY_ROUND3_DRAWN, session.draw_flags.round3)?;
        match session.round2_outcome {
            Some(outcome) => self.set(KEY_ROUND2_OUTCOME_TYPE, outcome.type_key().into()),
            None => self.remove(KEY_ROUND2_OUTCOME_TYPE),
        }
    }

    /// Flag `round` as recorded after the record store acknowledged `outcome`.
    fn mark_drawn(&self, round: Round, outcome: Outcome) -> CacheResult<()> {
        match round {
            Round::Two => {
                self.write_flag(KEY_ROUND2_DRAWN, true)?;
                self.set(KEY_ROUND2_OUTCOME_TYPE, outcome.type_key().into())
            }
            Round::Three => self.write_flag(KEY_ROUND3_DRAWN, true),
        }
    }

    /// Flags are stored by presence; an unset flag is removed.
    fn write_flag(&self, key: &str, value: bool) -> CacheResult<()> {
        if value {
            self.set(key, FLAG_SET.into())
        } else {
            self.remove(key)
        }
    }
}

/// Cache that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryProgressCache {
    entries: DashMap<String, String>,
}

impl MemoryProgressCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressCache for MemoryProgressCache {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    fn set(&self, key: &str, value: String) -> CacheResult<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> CacheResult<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn clear(&self) -> CacheResult<()> {
        self.entries.clear();
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }
}

/// Cache persisted as a JSON object in a single file, rewritten on every change.
#[derive(Debug)]
pub struct FileProgressCache {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl FileProgressCache {
    /// Open the cache stored at `path`, starting empty when the file does not exist.
    pub fn open(path: impl Into<PathBuf>) -> CacheResult<Self> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str::<BTreeMap<String, String>>(&contents)
                .map_err(|source| CacheError::Decode {
                    path: path.clone(),
                    source,
                })?,
            Err(err) if err.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(CacheError::Io { path, source }),
        };

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    fn mutate<F>(&self, change: F) -> CacheResult<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let mut guard = self
            .entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        change(&mut *guard);

        if guard.is_empty() {
            return match fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
                Err(source) => Err(CacheError::Io {
                    path: self.path.clone(),
                    source,
                }),
            };
        }

        let encoded =
            serde_json::to_string_pretty(&*guard).map_err(|source| CacheError::Encode { source })?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| CacheError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&self.path, encoded).map_err(|source| CacheError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl ProgressCache for FileProgressCache {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: String) -> CacheResult<()> {
        self.mutate(|entries| {
            entries.insert(key.to_string(), value);
        })
    }

    fn remove(&self, key: &str) -> CacheResult<()> {
        self.mutate(|entries| {
            entries.remove(key);
        })
    }

    fn clear(&self) -> CacheResult<()> {
        self.mutate(BTreeMap::clear)
    }

    fn keys(&self) -> Vec<String> {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .keys()
            .cloned()
            .collect()
    }
}
