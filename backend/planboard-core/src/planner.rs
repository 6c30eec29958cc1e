// src/planner.rs
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::assignment_store::{
    Assignment, AssignmentStore, AssignmentUpdate, NewAssignment, SlotKey, StoreError,
};
use crate::slot_layout::{
    is_valid_layout, left_pack, place_task, resolve_column, validate_drop, DropRejection,
    SlotBounds, SlotTask, SLOT_COLUMNS,
};

/// Stand-in id for a task that has no assignment yet while its slot is laid out.
const PENDING_ASSIGNMENT_ID: &str = "pending";

// --- Planner Structures ---

/// Where in a slot a task was dropped: an explicit column, or a pointer position
/// plus the slot's on-screen bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DropTarget {
    Column { target_column: u8 },
    Pointer { drop_x: f64, slot_bounds: SlotBounds },
}

impl DropTarget {
    pub fn column(&self) -> u8 {
        match *self {
            DropTarget::Column { target_column } => target_column.min(SLOT_COLUMNS - 1),
            DropTarget::Pointer {
                drop_x,
                slot_bounds,
            } => resolve_column(drop_x, slot_bounds),
        }
    }
}

/// The catalogue task being scheduled; opaque to the layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRef {
    pub task_id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DropVerdict {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<Result<(), DropRejection>> for DropVerdict {
    fn from(result: Result<(), DropRejection>) -> Self {
        match result {
            Ok(()) => DropVerdict {
                accepted: true,
                reason: None,
            },
            Err(rejection) => DropVerdict {
                accepted: false,
                reason: Some(rejection.to_string()),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoveOutcome {
    pub source: Vec<Assignment>,
    pub destination: Vec<Assignment>,
}

#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("Drop rejected: {0}")]
    Rejected(#[from] DropRejection),
    #[error("Assignment store error: {0}")]
    Store(#[from] StoreError),
}

// --- Slot Planner ---

/// Runs drops, moves and removals against the assignment store. Each operation
/// reads the slot, computes the new layout and writes the changed positions back
/// while holding the planner's write lock.
pub struct SlotPlanner {
    store: Arc<dyn AssignmentStore>,
    write_lock: Mutex<()>,
}

impl SlotPlanner {
    pub fn new(store: Arc<dyn AssignmentStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    pub async fn slot(&self, key: &SlotKey) -> Result<Vec<Assignment>, PlannerError> {
        Ok(self.store.slot_assignments(key).await?)
    }

    /// Reports whether a drop would be accepted, without writing anything.
    /// `moving_id` names an assignment being dragged; its hours are used when `hours` is absent.
    pub async fn check_drop(
        &self,
        key: &SlotKey,
        hours: Option<Decimal>,
        moving_id: Option<&str>,
    ) -> Result<DropVerdict, PlannerError> {
        let moving = match moving_id {
            Some(id) => Some(
                self.store
                    .find_assignment(id)
                    .await?
                    .ok_or_else(|| StoreError::NotFound(id.to_string()))?,
            ),
            None => None,
        };

        let incoming = match &moving {
            Some(assignment) => SlotTask {
                width: hours.unwrap_or(assignment.hours),
                ..assignment.to_slot_task()
            },
            None => SlotTask::new(PENDING_ASSIGNMENT_ID, "", hours),
        };

        let current = self.load_tasks(key).await?;
        Ok(validate_drop(&current, &incoming).into())
    }

    /// Drops a catalogue task into a slot and returns the slot's new arrangement.
    pub async fn drop_task(
        &self,
        key: &SlotKey,
        task: TaskRef,
        hours: Option<Decimal>,
        target: DropTarget,
    ) -> Result<Vec<Assignment>, PlannerError> {
        let _guard = self.write_lock.lock().await;

        let column = target.column();
        let current = self.store.slot_assignments(key).await?;
        let incoming = SlotTask::new(PENDING_ASSIGNMENT_ID, task.title.clone(), hours);
        let layout = self.arrange(key, &current, incoming, column)?;

        self.apply_layout(key, &current, &layout, Some(&task)).await?;
        info!(
            "Dropped task {} into slot {} at column {}",
            task.task_id, key, column
        );
        self.slot(key).await
    }

    /// Moves an assignment to `to_key` (possibly its own slot). The destination is
    /// validated before the source slot is touched.
    pub async fn move_assignment(
        &self,
        id: &str,
        to_key: &SlotKey,
        target: DropTarget,
    ) -> Result<MoveOutcome, PlannerError> {
        let _guard = self.write_lock.lock().await;

        let moving = self
            .store
            .find_assignment(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let column = target.column();
        let destination = self.store.slot_assignments(to_key).await?;

        if moving.slot == *to_key {
            let layout = self.arrange(to_key, &destination, moving.to_slot_task(), column)?;
            self.apply_layout(to_key, &destination, &layout, None).await?;
            info!(
                "Moved assignment {} within slot {} to column {}",
                id, to_key, column
            );
            let slot = self.slot(to_key).await?;
            return Ok(MoveOutcome {
                source: slot.clone(),
                destination: slot,
            });
        }

        let incoming = SlotTask {
            id: PENDING_ASSIGNMENT_ID.to_string(),
            ..moving.to_slot_task()
        };
        let layout = self.arrange(to_key, &destination, incoming, column)?;

        self.store.delete_assignment(id).await?;
        let source = self.pack_slot(&moving.slot).await?;

        let task = TaskRef {
            task_id: moving.task_id.clone(),
            title: moving.title.clone(),
        };
        self.apply_layout(to_key, &destination, &layout, Some(&task))
            .await?;
        info!(
            "Moved assignment {} from slot {} to slot {} at column {}",
            id, moving.slot, to_key, column
        );

        Ok(MoveOutcome {
            source,
            destination: self.slot(to_key).await?,
        })
    }

    /// Removes an assignment and closes the gap it leaves. Returns the remaining arrangement.
    pub async fn remove_assignment(&self, id: &str) -> Result<Vec<Assignment>, PlannerError> {
        let _guard = self.write_lock.lock().await;

        let removed = self.store.delete_assignment(id).await?;
        info!("Removed assignment {} from slot {}", id, removed.slot);
        self.pack_slot(&removed.slot).await
    }

    // --- Internal Helpers ---

    async fn load_tasks(&self, key: &SlotKey) -> Result<Vec<SlotTask>, PlannerError> {
        let current = self.store.slot_assignments(key).await?;
        Ok(current.iter().map(Assignment::to_slot_task).collect())
    }

    fn arrange(
        &self,
        key: &SlotKey,
        current: &[Assignment],
        incoming: SlotTask,
        column: u8,
    ) -> Result<Vec<SlotTask>, PlannerError> {
        let tasks: Vec<SlotTask> = current.iter().map(Assignment::to_slot_task).collect();
        if !is_valid_layout(&tasks) {
            warn!("Stored layout for slot {} overlaps or overflows; relaying it out", key);
        }

        place_task(&tasks, incoming, column).map_err(|rejection| {
            warn!("Drop into slot {} rejected: {}", key, rejection);
            PlannerError::Rejected(rejection)
        })
    }

    async fn pack_slot(&self, key: &SlotKey) -> Result<Vec<Assignment>, PlannerError> {
        let remaining = self.store.slot_assignments(key).await?;
        let tasks: Vec<SlotTask> = remaining.iter().map(Assignment::to_slot_task).collect();
        let layout = left_pack(&tasks);
        self.apply_layout(key, &remaining, &layout, None).await?;
        self.slot(key).await
    }

    /// Writes a computed layout back: creates the pending task (when `dropped` is
    /// given) and updates every existing assignment whose position or hours changed.
    async fn apply_layout(
        &self,
        key: &SlotKey,
        current: &[Assignment],
        layout: &[SlotTask],
        dropped: Option<&TaskRef>,
    ) -> Result<(), PlannerError> {
        for placed in layout {
            if placed.id == PENDING_ASSIGNMENT_ID {
                if let Some(task) = dropped {
                    self.store
                        .create_assignment(NewAssignment {
                            slot: key.clone(),
                            task_id: task.task_id.clone(),
                            title: task.title.clone(),
                            column_start: placed.column_start,
                            hours: placed.width,
                        })
                        .await?;
                }
                continue;
            }

            let Some(before) = current.iter().find(|a| a.id == placed.id) else {
                continue;
            };
            if before.column_start != placed.column_start || before.hours != placed.width {
                debug!(
                    "Repositioning assignment {}: column {} -> {}, {}h -> {}h",
                    placed.id, before.column_start, placed.column_start, before.hours, placed.width
                );
                self.store
                    .update_assignment(
                        &placed.id,
                        AssignmentUpdate {
                            column_start: placed.column_start,
                            hours: placed.width,
                        },
                    )
                    .await?;
            }
        }
        Ok(())
    }
}
