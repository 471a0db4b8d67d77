//! Cached access to the rules document on disk.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

/// Why the rules document could not be served.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error("rules file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read rules from {}: {message}", path.display())]
    Read { path: PathBuf, message: String },
}

impl LoadError {
    /// Text shown in place of the rules when loading fails.
    pub fn placeholder(&self) -> String {
        match self {
            LoadError::NotFound { path } => format!(
                "⚠️ RULES FILE NOT FOUND: {}\n\nPlease set the RULE_ROOT environment variable to point directly to your rules file.",
                path.display()
            ),
            LoadError::Read { message, .. } => format!("❌ ERROR LOADING RULES: {}", message),
        }
    }
}

/// Outcome of a single [`RulesStore::get`] call.
pub type LoadResult = Result<String, LoadError>;

/// Content of the last successful read, kept together so a refresh replaces all of it at once.
#[derive(Debug, Clone)]
struct CachedRules {
    content: String,
    modified: SystemTime,
    loaded_at: DateTime<Utc>,
}

/// Lazily refreshed cache of one rules file.
///
/// Every [`get`](Self::get) stats the file and re-reads it only when its
/// modification time is strictly newer than the cached one.
#[derive(Debug)]
pub struct RulesStore {
    path: PathBuf,
    cache: Option<CachedRules>,
    reads: u64,
}

impl RulesStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: None,
            reads: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of times the file contents have actually been read.
    pub fn read_count(&self) -> u64 {
        self.reads
    }

    /// When the cached content was last loaded from disk.
    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.cache.as_ref().map(|c| c.loaded_at)
    }

    /// Return the current rules text, re-reading the file if it changed.
    pub fn get(&mut self) -> LoadResult {
        if !self.path.exists() {
            let err = LoadError::NotFound {
                path: self.path.clone(),
            };
            warn!(path = %self.path.display(), "rules file not found");
            return Err(err);
        }

        self.refresh().map_err(|message| {
            warn!(path = %self.path.display(), error = %message, "error loading rules");
            LoadError::Read {
                path: self.path.clone(),
                message,
            }
        })
    }

    fn refresh(&mut self) -> Result<String, String> {
        let modified = fs::metadata(&self.path)
            .and_then(|m| m.modified())
            .map_err(|e| e.to_string())?;

        if let Some(cached) = &self.cache {
            if modified <= cached.modified {
                debug!(path = %self.path.display(), "rules cache hit");
                return Ok(cached.content.clone());
            }
        }

        let content = fs::read_to_string(&self.path).map_err(|e| e.to_string())?;
        self.reads += 1;

        info!(
            path = %self.path.display(),
            chars = content.chars().count(),
            "rules loaded"
        );

        self.cache = Some(CachedRules {
            content: content.clone(),
            modified,
            loaded_at: Utc::now(),
        });
        Ok(content)
    }
}
