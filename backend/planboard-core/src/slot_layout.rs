// src/slot_layout.rs
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

// --- Slot Geometry ---

/// Number of one-hour columns in a half-day slot.
pub const SLOT_COLUMNS: u8 = 4;
/// Total hours a half-day slot can hold.
pub const SLOT_HOURS: Decimal = dec!(4);
/// Smallest width a task may be compressed to.
pub const MIN_TASK_HOURS: Decimal = dec!(1);
pub const MAX_TASKS_PER_SLOT: usize = 4;

// --- Layout Structures ---

/// A task as the layout engine sees it: an id, a horizontal position and a width in hours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotTask {
    pub id: String,
    pub column_start: Decimal,
    pub width: Decimal,
    #[serde(default)]
    pub title: String,
}

impl SlotTask {
    /// Builds a task that has not been positioned yet. A missing width means one hour.
    pub fn new(id: impl Into<String>, title: impl Into<String>, width: Option<Decimal>) -> Self {
        Self {
            id: id.into(),
            column_start: Decimal::ZERO,
            width: width.unwrap_or(MIN_TASK_HOURS),
            title: title.into(),
        }
    }

    pub fn column_end(&self) -> Decimal {
        self.column_start + self.width
    }
}

/// Horizontal pixel extent of a rendered slot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlotBounds {
    pub left: f64,
    pub width: f64,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DropRejection {
    #[error("slot full")]
    SlotFull { occupied: usize },
    #[error("too many tasks for 4 columns")]
    CapacityExceeded { after_drop: usize },
    #[error("task width {width}h is outside the allowed 1h-4h range")]
    InvalidWidth { width: Decimal },
}

// --- Column Resolver ---

/// Maps a pointer x coordinate to the column under it. Coordinates outside the
/// slot snap to the nearest edge column.
pub fn resolve_column(drop_x: f64, bounds: SlotBounds) -> u8 {
    let column_width = bounds.width / f64::from(SLOT_COLUMNS);
    if !column_width.is_finite() || column_width <= 0.0 {
        return 0;
    }

    let column = ((drop_x - bounds.left) / column_width).floor();
    if column.is_nan() {
        return 0;
    }
    column.clamp(0.0, f64::from(SLOT_COLUMNS - 1)) as u8
}

// --- Drop Validator ---

/// Decides whether `incoming` may be dropped into a slot currently holding `existing`.
///
/// Capacity is counted in tasks, not hours: any four tasks of at least one hour
/// can always be compressed into the slot. A task already in the slot (same id)
/// is being moved and does not count twice.
pub fn validate_drop(existing: &[SlotTask], incoming: &SlotTask) -> Result<(), DropRejection> {
    let staying = existing.iter().filter(|t| t.id != incoming.id).count();

    if staying > MAX_TASKS_PER_SLOT {
        return Err(DropRejection::SlotFull { occupied: staying });
    }
    if staying + 1 > MAX_TASKS_PER_SLOT {
        return Err(DropRejection::CapacityExceeded {
            after_drop: staying + 1,
        });
    }
    if incoming.width < MIN_TASK_HOURS || incoming.width > SLOT_HOURS {
        return Err(DropRejection::InvalidWidth {
            width: incoming.width,
        });
    }

    Ok(())
}

// --- Insertion/Compression Engine ---

/// Inserts `incoming` among the slot's tasks at the ordinal position implied by
/// `target_column`, shrinks the widest tasks if the slot overflows, and lays the
/// result out left to right from column 0.
///
/// The drop is re-validated; a rejected drop returns the rejection and computes nothing.
pub fn place_task(
    existing: &[SlotTask],
    incoming: SlotTask,
    target_column: u8,
) -> Result<Vec<SlotTask>, DropRejection> {
    validate_drop(existing, &incoming)?;

    let mut order: Vec<SlotTask> = existing
        .iter()
        .filter(|t| t.id != incoming.id)
        .cloned()
        .collect();
    sort_left_to_right(&mut order);

    let target = Decimal::from(target_column.min(SLOT_COLUMNS - 1));
    let insert_at = if target.is_zero() {
        0
    } else {
        order
            .iter()
            .take_while(|t| t.column_start < target)
            .count()
    };
    order.insert(insert_at, incoming);

    let total: Decimal = order.iter().map(|t| t.width).sum();
    if total > SLOT_HOURS {
        compress(&mut order, total - SLOT_HOURS);
    }

    pack_from_zero(&mut order);
    Ok(order)
}

/// Removes `excess` hours, widest tasks first, never taking a task below one hour.
/// Widths are worked out in an id-keyed map and written back in slot order.
fn compress(order: &mut [SlotTask], mut excess: Decimal) {
    let mut largest_first: Vec<(String, Decimal)> =
        order.iter().map(|t| (t.id.clone(), t.width)).collect();
    // Stable: equal widths keep their left-to-right order.
    largest_first.sort_by(|a, b| b.1.cmp(&a.1));

    let mut widths: HashMap<String, Decimal> = HashMap::with_capacity(largest_first.len());
    for (id, width) in largest_first {
        let shrink = if excess > Decimal::ZERO {
            (width - MIN_TASK_HOURS).max(Decimal::ZERO).min(excess)
        } else {
            Decimal::ZERO
        };
        excess -= shrink;
        widths.insert(id, width - shrink);
    }

    for task in order.iter_mut() {
        if let Some(width) = widths.get(&task.id) {
            task.width = *width;
        }
    }
}

// --- Left-Pack Reducer ---

/// Closes the gaps left by a removed task. Order is kept and widths are never changed.
pub fn left_pack(tasks: &[SlotTask]) -> Vec<SlotTask> {
    let mut packed = tasks.to_vec();
    sort_left_to_right(&mut packed);
    pack_from_zero(&mut packed);
    packed
}

// --- Helpers ---

/// Orders by column, then by id so tasks sharing a column sort deterministically.
pub fn sort_left_to_right(tasks: &mut [SlotTask]) {
    tasks.sort_by(|a, b| {
        a.column_start
            .cmp(&b.column_start)
            .then_with(|| a.id.cmp(&b.id))
    });
}

fn pack_from_zero(tasks: &mut [SlotTask]) {
    let mut position = Decimal::ZERO;
    for task in tasks.iter_mut() {
        task.column_start = position;
        position += task.width;
    }
}

/// True when every task lies inside the slot, no two tasks overlap and the
/// slot holds at most four tasks.
pub fn is_valid_layout(tasks: &[SlotTask]) -> bool {
    if tasks.len() > MAX_TASKS_PER_SLOT {
        return false;
    }

    let mut sorted = tasks.to_vec();
    sort_left_to_right(&mut sorted);

    let mut previous_end = Decimal::ZERO;
    for task in &sorted {
        if task.column_start < previous_end || task.column_end() > SLOT_HOURS {
            return false;
        }
        previous_end = task.column_end();
    }
    true
}
