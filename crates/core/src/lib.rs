//! Quantboard core types: documents, strategy records and dataset snapshots.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub mod display;
pub mod filter;

/// Field names used by the strategy collection.
pub mod fields {
    pub const ID: &str = "id";
    pub const NAME: &str = "Strategy_Name";
    pub const TYPE: &str = "Strategy_Type";
    pub const DESCRIPTION: &str = "Description";
    pub const PERFORMANCE: &str = "Performance_Metrics";
    pub const RISK_LEVEL: &str = "Risk_Level";
    pub const RECOMMENDED_CAPITAL: &str = "Recommended_Capital";
    pub const LAST_UPDATED: &str = "Last_Updated";
}

/// One document as delivered by the remote store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Document {
    pub id: String,
    pub fields: Map<String, Value>,
    /// Store-side modification stamp, when the store reports one.
    pub update_time: Option<String>,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self { id: id.into(), fields, update_time: None }
    }
}

/// Full current document list carried by one change notification.
pub type Listing = Vec<Document>;

/// A strategy as stored in the collection. Read-only; the field map is kept
/// as delivered so display fields stay opaque.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StrategyRecord {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl StrategyRecord {
    /// Build a record from a document, attaching the store identifier.
    /// Returns None for documents without any fields.
    pub fn from_document(doc: Document) -> Option<Self> {
        if doc.fields.is_empty() {
            return None;
        }
        let mut fields = doc.fields;
        fields.insert(fields::ID.to_string(), Value::String(doc.id.clone()));
        Some(Self { id: doc.id, fields })
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(|v| v.as_str())
    }

    pub fn name(&self) -> Option<&str> {
        self.str_field(fields::NAME)
    }

    /// Sort key: missing or non-string names sort as the empty string.
    pub fn sort_name(&self) -> &str {
        self.name().unwrap_or("")
    }

    pub fn strategy_type(&self) -> Option<&str> {
        self.str_field(fields::TYPE)
    }

    pub fn description(&self) -> Option<&Value> {
        self.get(fields::DESCRIPTION)
    }

    /// The metric mapping, if present and shaped as an object.
    pub fn performance_metrics(&self) -> Option<&Map<String, Value>> {
        self.get(fields::PERFORMANCE).and_then(|v| v.as_object())
    }

    pub fn risk_level(&self) -> Option<&Value> {
        self.get(fields::RISK_LEVEL)
    }

    pub fn recommended_capital(&self) -> Option<&Value> {
        self.get(fields::RECOMMENDED_CAPITAL)
    }

    pub fn last_updated(&self) -> Option<&Value> {
        self.get(fields::LAST_UPDATED)
    }
}

/// The entire collection as of one notification.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DatasetSnapshot {
    /// 0 means nothing has been received yet.
    pub epoch: u64,
    pub records: Vec<StrategyRecord>,
}

impl DatasetSnapshot {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub mod prelude {
    pub use super::filter::{apply_filters, category_options, Category, FilterOutcome, FilterState, MetricError, MetricKey};
    pub use super::{DatasetSnapshot, Document, Listing, StrategyRecord};
}
