//! Static question sets, loaded once at startup.

use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QuestionsError {
    #[error("Failed to read question data from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse question data from {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Question data in {0} must be a JSON object keyed by topic name")]
    NotAnObject(PathBuf),
}

/// Question sets keyed by topic name.
///
/// Each topic's value is served verbatim, so its shape is whatever the data
/// file holds.
#[derive(Debug, Clone, Default)]
pub struct QuestionBank {
    topics: Map<String, Value>,
}

impl QuestionBank {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, QuestionsError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| QuestionsError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let value: Value = serde_json::from_str(&raw).map_err(|source| QuestionsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        match value {
            Value::Object(topics) => {
                tracing::info!(
                    topics = topics.len(),
                    path = %path.display(),
                    "Loaded question data"
                );
                Ok(Self { topics })
            }
            _ => Err(QuestionsError::NotAnObject(path.to_path_buf())),
        }
    }

    pub fn from_topics(topics: Map<String, Value>) -> Self {
        Self { topics }
    }

    pub fn topic(&self, name: &str) -> Option<&Value> {
        self.topics.get(name)
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}
