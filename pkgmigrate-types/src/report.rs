use crate::outcome::ItemOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Aggregate result of one batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub schema: String,
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,

    pub summary: BatchSummary,

    #[serde(default)]
    pub items: Vec<ItemOutcome>,
}

impl BatchReport {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            schema: crate::schema::PKGMIGRATE_REPORT_V1.to_string(),
            run_id: Uuid::new_v4(),
            started_at,
            ended_at: None,
            summary: BatchSummary::default(),
            items: vec![],
        }
    }

    /// Attach outcomes and recompute the summary.
    pub fn with_items(mut self, items: Vec<ItemOutcome>) -> Self {
        self.summary = BatchSummary::from_items(&items);
        self.items = items;
        self
    }

    pub fn all_succeeded(&self) -> bool {
        self.summary.failed == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: u64,
    pub succeeded: u64,
    pub failed: u64,
}

impl BatchSummary {
    pub fn from_items(items: &[ItemOutcome]) -> Self {
        let succeeded = items.iter().filter(|i| i.is_success()).count() as u64;
        Self {
            total: items.len() as u64,
            succeeded,
            failed: items.len() as u64 - succeeded,
        }
    }
}
