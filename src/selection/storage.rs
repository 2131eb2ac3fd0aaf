use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sled::IVec;

use crate::errors::ToolModeError;
use crate::selection::{AgentId, SelectionState};

pub const SELECTION_SCHEMA_VERSION: u8 = 1;

const TREE_SELECTIONS: &str = "toolmodes_selections";
const AGENT_PREFIX: &str = "agents:";

/// Persisted form of one agent's selections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionRecord {
    pub agent: AgentId,
    pub state: SelectionState,
    pub updated_at: DateTime<Utc>,
    pub schema_version: u8,
}

/// Helper builder so tests can easily create throwaway databases with custom paths.
pub struct SelectionDbBuilder {
    path: PathBuf,
}

impl SelectionDbBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn open(self) -> Result<SelectionDb, ToolModeError> {
        SelectionDb::open(self.path)
    }
}

/// Sled-backed save data for agent tool mode selections.
pub struct SelectionDb {
    _db: sled::Db,
    selections: sled::Tree,
}

impl SelectionDb {
    /// Open (or create) the selection database rooted at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ToolModeError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::open(path_ref)?;
        let selections = db.open_tree(TREE_SELECTIONS)?;
        Ok(Self {
            _db: db,
            selections,
        })
    }

    fn agent_key(agent: &AgentId) -> Vec<u8> {
        format!("{}{}", AGENT_PREFIX, agent).into_bytes()
    }

    fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>, ToolModeError> {
        Ok(bincode::serialize(value)?)
    }

    fn deserialize(bytes: IVec) -> Result<SelectionRecord, ToolModeError> {
        let record: SelectionRecord = bincode::deserialize(&bytes)?;
        if record.schema_version != SELECTION_SCHEMA_VERSION {
            return Err(ToolModeError::SchemaMismatch {
                entity: "selection",
                expected: SELECTION_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(record)
    }

    /// Insert or replace an agent's selections. Empty states are removed instead.
    pub fn put_state(&self, agent: &AgentId, state: &SelectionState) -> Result<(), ToolModeError> {
        let key = Self::agent_key(agent);
        if state.is_empty() {
            self.selections.remove(key)?;
        } else {
            let record = SelectionRecord {
                agent: agent.clone(),
                state: state.clone(),
                updated_at: Utc::now(),
                schema_version: SELECTION_SCHEMA_VERSION,
            };
            self.selections.insert(key, Self::serialize(&record)?)?;
        }
        self.selections.flush()?;
        Ok(())
    }

    pub fn get_record(&self, agent: &AgentId) -> Result<Option<SelectionRecord>, ToolModeError> {
        let Some(bytes) = self.selections.get(Self::agent_key(agent))? else {
            return Ok(None);
        };
        Ok(Some(Self::deserialize(bytes)?))
    }

    pub fn get_state(&self, agent: &AgentId) -> Result<Option<SelectionState>, ToolModeError> {
        Ok(self.get_record(agent)?.map(|record| record.state))
    }

    /// List all agent ids with stored selections.
    pub fn list_agent_ids(&self) -> Result<Vec<AgentId>, ToolModeError> {
        let mut ids = Vec::new();
        for entry in self.selections.scan_prefix(AGENT_PREFIX.as_bytes()) {
            let (key, _) = entry?;
            let text = String::from_utf8_lossy(&key);
            if let Some(agent) = text.strip_prefix(AGENT_PREFIX) {
                ids.push(AgentId::new(agent));
            }
        }
        Ok(ids)
    }

    pub fn load_all(&self) -> Result<Vec<SelectionRecord>, ToolModeError> {
        self.selections
            .scan_prefix(AGENT_PREFIX.as_bytes())
            .map(|entry| {
                entry
                    .map_err(ToolModeError::from)
                    .and_then(|(_key, value)| Self::deserialize(value))
            })
            .collect()
    }
}
