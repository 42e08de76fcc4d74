//! Persisted search state (§6 "Persisted state layout: opaque, versioned by
//! a single integer tag").
//!
//! [`crate::allocation::AllocationSearchNode`]'s open/closed/pruned buckets
//! are an `Arc`-owned parent-chain graph full of `Cell`/`RefCell` caches and,
//! for custom trait reductions, boxed closures — none of it meaningfully
//! serializable. Since ITAGS/DITAGS is deterministic given its inputs,
//! persisting the resolved problem document and replaying `search()` from
//! it reconstructs byte-identical search state, so that document *is* the
//! opaque payload this format carries.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GrstapseError, Result};

use super::model::ProblemDocument;

pub const PERSISTED_SEARCH_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedSearch {
    pub version: u32,
    pub problem: ProblemDocument,
}

impl PersistedSearch {
    pub fn new(problem: ProblemDocument) -> Self {
        PersistedSearch {
            version: PERSISTED_SEARCH_VERSION,
            problem,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| GrstapseError::interface("file", e))?;
        let persisted: PersistedSearch = serde_json::from_str(&contents).map_err(|e| GrstapseError::interface("json", e))?;
        if persisted.version != PERSISTED_SEARCH_VERSION {
            return Err(GrstapseError::interface(
                "json",
                std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("persisted search version {} is not supported (expected {})", persisted.version, PERSISTED_SEARCH_VERSION),
                ),
            ));
        }
        Ok(persisted)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self).map_err(|e| GrstapseError::interface("json", e))?;
        fs::write(path, contents).map_err(|e| GrstapseError::interface("file", e))
    }
}
