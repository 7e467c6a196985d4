#![forbid(unsafe_code)]

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("collection path is empty")]
    Empty,
    #[error("collection path has an empty segment at position {0}")]
    EmptySegment(usize),
    #[error("path with {0} segments names a document, not a collection")]
    NotACollection(usize),
}

/// Fully-qualified collection path such as `artifacts/app/public/data/quant_strategies`.
/// Segments alternate collection/document and the path ends on a collection.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CollectionPath {
    segments: Vec<String>,
}

impl CollectionPath {
    /// Default location of the public strategy collection for an app.
    pub fn for_app(app_id: &str, collection: &str) -> Result<Self, PathError> {
        format!("artifacts/{}/public/data/{}", app_id, collection).parse()
    }

    pub fn segments(&self) -> &[String] { &self.segments }

    /// Last segment, the collection id.
    pub fn collection_id(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or("")
    }
}

impl FromStr for CollectionPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_matches('/');
        if trimmed.is_empty() {
            return Err(PathError::Empty);
        }
        let segments: Vec<String> = trimmed.split('/').map(|p| p.to_string()).collect();
        if let Some(pos) = segments.iter().position(|p| p.is_empty()) {
            return Err(PathError::EmptySegment(pos));
        }
        if segments.len() % 2 == 0 {
            return Err(PathError::NotACollection(segments.len()));
        }
        Ok(Self { segments })
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}
