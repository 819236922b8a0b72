//! Quiz assignments and their in-memory catalog.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::AssignmentId;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{AssignmentError, Result};

/// A quiz published to a group with an optional time window and an attempt quota.
///
/// Assignments are immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: AssignmentId,
    pub quiz_id: i64,
    pub allowed_group: Option<String>,
    pub open_at: Option<DateTime<Utc>>,
    pub close_at: Option<DateTime<Utc>>,
    pub max_attempts: u32,
    pub created_at: DateTime<Utc>,
}

/// Command to create an assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssignment {
    pub quiz_id: i64,
    pub allowed_group: Option<String>,
    pub open_at: Option<DateTime<Utc>>,
    pub close_at: Option<DateTime<Utc>>,
    pub max_attempts: u32,
}

impl CreateAssignment {
    /// An always-open assignment with the given quota.
    pub fn new(quiz_id: i64, max_attempts: u32) -> Self {
        Self {
            quiz_id,
            allowed_group: None,
            open_at: None,
            close_at: None,
            max_attempts,
        }
    }

    pub fn with_window(
        mut self,
        open_at: Option<DateTime<Utc>>,
        close_at: Option<DateTime<Utc>>,
    ) -> Self {
        self.open_at = open_at;
        self.close_at = close_at;
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.allowed_group = Some(group.into());
        self
    }

    /// Validates the command and builds the assignment.
    pub fn into_assignment(self, now: DateTime<Utc>) -> Result<Assignment> {
        if self.max_attempts < 1 {
            return Err(AssignmentError::InvalidAssignment(
                "max_attempts must be >= 1".to_string(),
            ));
        }
        if let (Some(open), Some(close)) = (self.open_at, self.close_at)
            && open > close
        {
            return Err(AssignmentError::InvalidAssignment(
                "open_at must not be after close_at".to_string(),
            ));
        }

        Ok(Assignment {
            id: AssignmentId::new(),
            quiz_id: self.quiz_id,
            allowed_group: self.allowed_group,
            open_at: self.open_at,
            close_at: self.close_at,
            max_attempts: self.max_attempts,
            created_at: now,
        })
    }
}

/// In-memory assignment catalog.
#[derive(Debug, Clone, Default)]
pub struct AssignmentCatalog {
    assignments: Arc<RwLock<HashMap<AssignmentId, Assignment>>>,
}

impl AssignmentCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, assignment: Assignment) {
        self.assignments
            .write()
            .await
            .insert(assignment.id, assignment);
    }

    pub async fn get(&self, id: AssignmentId) -> Option<Assignment> {
        self.assignments.read().await.get(&id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.assignments.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.assignments.read().await.is_empty()
    }
}
