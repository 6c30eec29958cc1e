// src/assignment_store.rs
use async_trait::async_trait;
use chrono::NaiveDate;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, MutexGuard},
};
use thiserror::Error;
use tracing::{debug, info};

use crate::slot_layout::SlotTask;

pub type EmployeeId = String;
pub type AssignmentId = String;

const ASSIGNMENT_ID_PREFIX: &str = "asg_";
const ASSIGNMENT_ID_LEN: usize = 12;

// --- Slot Keys ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HalfDay {
    Morning,
    Afternoon,
}

impl fmt::Display for HalfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HalfDay::Morning => write!(f, "morning"),
            HalfDay::Afternoon => write!(f, "afternoon"),
        }
    }
}

/// Identifies one half-day slot on the planning board.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotKey {
    pub employee_id: EmployeeId,
    pub date: NaiveDate,
    pub half_day: HalfDay,
}

impl SlotKey {
    pub fn new(employee_id: impl Into<EmployeeId>, date: NaiveDate, half_day: HalfDay) -> Self {
        Self {
            employee_id: employee_id.into(),
            date,
            half_day,
        }
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.employee_id, self.date, self.half_day)
    }
}

// --- Assignment Records ---

/// A task placed in an employee's slot, as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: AssignmentId,
    #[serde(flatten)]
    pub slot: SlotKey,
    pub task_id: String,
    pub title: String,
    pub column_start: Decimal,
    pub hours: Decimal,
}

impl Assignment {
    pub fn to_slot_task(&self) -> SlotTask {
        SlotTask {
            id: self.id.clone(),
            column_start: self.column_start,
            width: self.hours,
            title: self.title.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewAssignment {
    pub slot: SlotKey,
    pub task_id: String,
    pub title: String,
    pub column_start: Decimal,
    pub hours: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssignmentUpdate {
    pub column_start: Decimal,
    pub hours: Decimal,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Assignment not found: {0}")]
    NotFound(AssignmentId),
    #[error("Lock acquisition failed: {0}")]
    LockError(String),
}

// --- Store Interface ---

/// CRUD access to persisted assignments. The planner computes layouts; the store only keeps them.
#[async_trait]
pub trait AssignmentStore: Send + Sync {
    /// All assignments in one slot, left to right.
    async fn slot_assignments(&self, slot: &SlotKey) -> Result<Vec<Assignment>, StoreError>;

    async fn find_assignment(&self, id: &str) -> Result<Option<Assignment>, StoreError>;

    async fn create_assignment(&self, new: NewAssignment) -> Result<Assignment, StoreError>;

    async fn update_assignment(
        &self,
        id: &str,
        update: AssignmentUpdate,
    ) -> Result<Assignment, StoreError>;

    async fn delete_assignment(&self, id: &str) -> Result<Assignment, StoreError>;
}

// --- In-Memory Store ---

#[derive(Clone, Default)]
pub struct InMemoryAssignmentStore {
    assignments: Arc<Mutex<HashMap<AssignmentId, Assignment>>>,
}

impl InMemoryAssignmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<AssignmentId, Assignment>>, StoreError> {
        self.assignments
            .lock()
            .map_err(|e| StoreError::LockError(e.to_string()))
    }

    fn generate_id(existing: &HashMap<AssignmentId, Assignment>) -> AssignmentId {
        loop {
            let suffix: String = thread_rng()
                .sample_iter(&Alphanumeric)
                .take(ASSIGNMENT_ID_LEN)
                .map(char::from)
                .collect();
            let id = format!("{}{}", ASSIGNMENT_ID_PREFIX, suffix);
            if !existing.contains_key(&id) {
                return id;
            }
        }
    }
}

#[async_trait]
impl AssignmentStore for InMemoryAssignmentStore {
    async fn slot_assignments(&self, slot: &SlotKey) -> Result<Vec<Assignment>, StoreError> {
        let assignments = self.lock()?;
        let mut in_slot: Vec<Assignment> = assignments
            .values()
            .filter(|a| a.slot == *slot)
            .cloned()
            .collect();
        in_slot.sort_by(|a, b| {
            a.column_start
                .cmp(&b.column_start)
                .then_with(|| a.id.cmp(&b.id))
        });
        debug!("Loaded {} assignments for slot {}", in_slot.len(), slot);
        Ok(in_slot)
    }

    async fn find_assignment(&self, id: &str) -> Result<Option<Assignment>, StoreError> {
        Ok(self.lock()?.get(id).cloned())
    }

    async fn create_assignment(&self, new: NewAssignment) -> Result<Assignment, StoreError> {
        let mut assignments = self.lock()?;
        let assignment = Assignment {
            id: Self::generate_id(&assignments),
            slot: new.slot,
            task_id: new.task_id,
            title: new.title,
            column_start: new.column_start,
            hours: new.hours,
        };
        info!(
            "Created assignment {} for task {} in slot {} (column {}, {}h)",
            assignment.id,
            assignment.task_id,
            assignment.slot,
            assignment.column_start,
            assignment.hours
        );
        assignments.insert(assignment.id.clone(), assignment.clone());
        Ok(assignment)
    }

    async fn update_assignment(
        &self,
        id: &str,
        update: AssignmentUpdate,
    ) -> Result<Assignment, StoreError> {
        let mut assignments = self.lock()?;
        let assignment = assignments
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        assignment.column_start = update.column_start;
        assignment.hours = update.hours;
        debug!(
            "Updated assignment {}: column {}, {}h",
            id, update.column_start, update.hours
        );
        Ok(assignment.clone())
    }

    async fn delete_assignment(&self, id: &str) -> Result<Assignment, StoreError> {
        let removed = self
            .lock()?
            .remove(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        info!("Deleted assignment {} from slot {}", id, removed.slot);
        Ok(removed)
    }
}
