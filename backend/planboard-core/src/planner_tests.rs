// src/planner_tests.rs

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use crate::assignment_store::*;
    use crate::planner::*;
    use crate::slot_layout::{DropRejection, SlotBounds};

    // --- Test Setup ---

    fn setup() -> (SlotPlanner, InMemoryAssignmentStore) {
        let store = InMemoryAssignmentStore::new();
        let planner = SlotPlanner::new(Arc::new(store.clone()));
        (planner, store)
    }

    fn morning(employee_id: &str) -> SlotKey {
        SlotKey::new(
            employee_id,
            NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
            HalfDay::Morning,
        )
    }

    fn task_ref(task_id: &str) -> TaskRef {
        TaskRef {
            task_id: task_id.to_string(),
            title: format!("Task {}", task_id),
        }
    }

    fn column(target_column: u8) -> DropTarget {
        DropTarget::Column { target_column }
    }

    // Inserts a stored assignment directly, bypassing the planner
    async fn seed(
        store: &InMemoryAssignmentStore,
        slot: &SlotKey,
        task_id: &str,
        column_start: Decimal,
        hours: Decimal,
    ) -> Assignment {
        store
            .create_assignment(NewAssignment {
                slot: slot.clone(),
                task_id: task_id.to_string(),
                title: format!("Task {}", task_id),
                column_start,
                hours,
            })
            .await
            .unwrap()
    }

    fn layout(assignments: &[Assignment]) -> Vec<(&str, Decimal, Decimal)> {
        assignments
            .iter()
            .map(|a| (a.task_id.as_str(), a.column_start, a.hours))
            .collect()
    }

    // --- Drops ---

    #[tokio::test]
    async fn test_drop_into_empty_slot_creates_assignment_at_zero() {
        let (planner, store) = setup();
        let slot = morning("E1");

        let result = planner
            .drop_task(&slot, task_ref("T1"), Some(dec!(1)), column(2))
            .await
            .unwrap();

        assert_eq!(layout(&result), vec![("T1", dec!(0), dec!(1))]);
        assert!(result[0].id.starts_with("asg_"));
        assert_eq!(store.slot_assignments(&slot).await.unwrap(), result);
    }

    #[tokio::test]
    async fn test_drop_compresses_and_persists_sibling() {
        let (planner, store) = setup();
        let slot = morning("E1");
        let existing = seed(&store, &slot, "A", dec!(0), dec!(4)).await;

        let result = planner
            .drop_task(&slot, task_ref("N"), None, column(0))
            .await
            .unwrap();

        assert_eq!(
            layout(&result),
            vec![("N", dec!(0), dec!(1)), ("A", dec!(1), dec!(3))]
        );
        let stored = store.find_assignment(&existing.id).await.unwrap().unwrap();
        assert_eq!(stored.column_start, dec!(1));
        assert_eq!(stored.hours, dec!(3));
    }

    #[tokio::test]
    async fn test_drop_with_pointer_target_resolves_column() {
        let (planner, store) = setup();
        let slot = morning("E1");
        seed(&store, &slot, "A", dec!(0), dec!(1)).await;
        seed(&store, &slot, "B", dec!(1), dec!(1)).await;

        let target = DropTarget::Pointer {
            drop_x: 160.0,
            slot_bounds: SlotBounds {
                left: 100.0,
                width: 200.0,
            },
        };
        let result = planner
            .drop_task(&slot, task_ref("N"), Some(dec!(2)), target)
            .await
            .unwrap();

        let order: Vec<&str> = result.iter().map(|a| a.task_id.as_str()).collect();
        assert_eq!(order, vec!["A", "N", "B"]);
    }

    #[tokio::test]
    async fn test_drop_into_full_slot_is_rejected_without_writes() {
        let (planner, store) = setup();
        let slot = morning("E1");
        for (i, id) in ["A", "B", "C", "D"].iter().enumerate() {
            seed(&store, &slot, id, Decimal::from(i as u32), dec!(1)).await;
        }
        let before = store.slot_assignments(&slot).await.unwrap();

        let result = planner
            .drop_task(&slot, task_ref("E"), None, column(1))
            .await;

        assert!(matches!(
            result,
            Err(PlannerError::Rejected(DropRejection::CapacityExceeded { .. }))
        ));
        assert_eq!(store.slot_assignments(&slot).await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_check_drop_reports_verdict() {
        let (planner, store) = setup();
        let slot = morning("E1");
        let mut seeded = Vec::new();
        for (i, id) in ["A", "B", "C", "D"].iter().enumerate() {
            seeded.push(seed(&store, &slot, id, Decimal::from(i as u32), dec!(1)).await);
        }

        let new_task = planner.check_drop(&slot, None, None).await.unwrap();
        assert!(!new_task.accepted);
        assert_eq!(
            new_task.reason.as_deref(),
            Some("too many tasks for 4 columns")
        );

        let moving = planner
            .check_drop(&slot, None, Some(&seeded[2].id))
            .await
            .unwrap();
        assert!(moving.accepted);
        assert_eq!(moving.reason, None);
    }

    // --- Moves ---

    #[tokio::test]
    async fn test_move_within_slot_reorders() {
        let (planner, store) = setup();
        let slot = morning("E1");
        let a = seed(&store, &slot, "A", dec!(0), dec!(1)).await;
        seed(&store, &slot, "B", dec!(1), dec!(2)).await;

        let outcome = planner
            .move_assignment(&a.id, &slot, column(3))
            .await
            .unwrap();

        assert_eq!(
            layout(&outcome.destination),
            vec![("B", dec!(0), dec!(2)), ("A", dec!(2), dec!(1))]
        );
        assert_eq!(outcome.source, outcome.destination);
        // same assignment, new position
        assert_eq!(outcome.destination[1].id, a.id);
    }

    #[tokio::test]
    async fn test_move_across_slots_packs_source_and_keeps_hours() {
        let (planner, store) = setup();
        let from = morning("E1");
        let to = morning("E2");
        let a = seed(&store, &from, "A", dec!(0), dec!(2)).await;
        seed(&store, &from, "B", dec!(2), dec!(1)).await;
        seed(&store, &to, "C", dec!(0), dec!(1)).await;

        let outcome = planner
            .move_assignment(&a.id, &to, column(1))
            .await
            .unwrap();

        assert_eq!(layout(&outcome.source), vec![("B", dec!(0), dec!(1))]);
        assert_eq!(
            layout(&outcome.destination),
            vec![("C", dec!(0), dec!(1)), ("A", dec!(1), dec!(2))]
        );
        assert!(store.find_assignment(&a.id).await.unwrap().is_none());
        assert_eq!(outcome.destination[1].slot, to);
    }

    #[tokio::test]
    async fn test_move_into_full_slot_leaves_source_untouched() {
        let (planner, store) = setup();
        let from = morning("E1");
        let to = morning("E2");
        let a = seed(&store, &from, "A", dec!(0), dec!(1)).await;
        seed(&store, &from, "B", dec!(1), dec!(1)).await;
        for (i, id) in ["C", "D", "E", "F"].iter().enumerate() {
            seed(&store, &to, id, Decimal::from(i as u32), dec!(1)).await;
        }
        let source_before = store.slot_assignments(&from).await.unwrap();

        let result = planner.move_assignment(&a.id, &to, column(0)).await;

        assert!(matches!(result, Err(PlannerError::Rejected(_))));
        assert_eq!(store.slot_assignments(&from).await.unwrap(), source_before);
        assert_eq!(store.slot_assignments(&to).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_move_unknown_assignment_is_not_found() {
        let (planner, _store) = setup();
        let result = planner
            .move_assignment("asg_missing", &morning("E1"), column(0))
            .await;
        assert!(matches!(
            result,
            Err(PlannerError::Store(StoreError::NotFound(_)))
        ));
    }

    // --- Removals ---

    #[tokio::test]
    async fn test_remove_left_packs_remaining_without_resizing() {
        let (planner, store) = setup();
        let slot = morning("E1");
        let a = seed(&store, &slot, "A", dec!(0), dec!(1)).await;
        seed(&store, &slot, "B", dec!(1), dec!(1.5)).await;
        seed(&store, &slot, "C", dec!(2.5), dec!(1.5)).await;

        let result = planner.remove_assignment(&a.id).await.unwrap();

        assert_eq!(
            layout(&result),
            vec![("B", dec!(0), dec!(1.5)), ("C", dec!(1.5), dec!(1.5))]
        );
        assert_eq!(store.slot_assignments(&slot).await.unwrap(), result);
    }

    #[tokio::test]
    async fn test_remove_last_assignment_leaves_empty_slot() {
        let (planner, store) = setup();
        let slot = morning("E1");
        let a = seed(&store, &slot, "A", dec!(0), dec!(2)).await;

        let result = planner.remove_assignment(&a.id).await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_remove_unknown_assignment_is_not_found() {
        let (planner, _store) = setup();
        let result = planner.remove_assignment("asg_missing").await;
        assert!(matches!(
            result,
            Err(PlannerError::Store(StoreError::NotFound(_)))
        ));
    }

    // --- Store ---

    #[tokio::test]
    async fn test_store_keeps_slots_apart() {
        let store = InMemoryAssignmentStore::new();
        let slot = morning("E1");
        let afternoon = SlotKey {
            half_day: HalfDay::Afternoon,
            ..slot.clone()
        };
        seed(&store, &slot, "A", dec!(1), dec!(1)).await;
        seed(&store, &slot, "B", dec!(0), dec!(1)).await;
        seed(&store, &afternoon, "C", dec!(0), dec!(4)).await;

        let morning_tasks = store.slot_assignments(&slot).await.unwrap();
        let order: Vec<&str> = morning_tasks.iter().map(|a| a.task_id.as_str()).collect();
        assert_eq!(order, vec!["B", "A"]);
        assert_eq!(store.slot_assignments(&afternoon).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_store_update_unknown_assignment_fails() {
        let store = InMemoryAssignmentStore::new();
        let result = store
            .update_assignment(
                "asg_missing",
                AssignmentUpdate {
                    column_start: dec!(0),
                    hours: dec!(1),
                },
            )
            .await;
        assert!(matches!(result, Err(StoreError::NotFound(id)) if id == "asg_missing"));
    }

    #[test]
    fn test_drop_target_clamps_explicit_column() {
        assert_eq!(column(9).column(), 3);
        assert_eq!(column(2).column(), 2);
    }
}
