//! Field-level change detection.

use crate::snapshot::{ChangeSnapshot, TransitionKind};

/// Returns true if the snapshot represents a change in persisted state.
///
/// Creates and deletes always count. A modification counts if any field of
/// the current state differs from the original.
#[must_use]
pub fn has_changed(snapshot: &ChangeSnapshot) -> bool {
    match snapshot.kind {
        TransitionKind::Created | TransitionKind::Deleted => true,
        TransitionKind::Modified => !changed_fields(snapshot).is_empty(),
    }
}

/// Names of the fields that differ between current and original state.
///
/// For creates every current field is reported.
#[must_use]
pub fn changed_fields(snapshot: &ChangeSnapshot) -> Vec<&str> {
    match &snapshot.original {
        Some(original) if snapshot.kind != TransitionKind::Created => {
            snapshot.current.changed_fields(original)
        }
        _ => snapshot.current.names().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use retrace_model::{Record, Value};

    fn snapshot(kind: TransitionKind, current: Record, original: Option<Record>) -> ChangeSnapshot {
        ChangeSnapshot {
            table: "products".into(),
            key: Value::Integer(1),
            kind,
            current,
            original,
        }
    }

    fn product(name: &str, price: i64) -> Record {
        Record::new()
            .with("id", 1i32)
            .with("name", name)
            .with("price", price)
    }

    #[test]
    fn create_always_changes() {
        let snap = snapshot(TransitionKind::Created, product("A", 10), None);
        assert!(has_changed(&snap));
        assert_eq!(changed_fields(&snap), vec!["id", "name", "price"]);
    }

    #[test]
    fn delete_always_changes() {
        let state = product("A", 10);
        let snap = snapshot(TransitionKind::Deleted, state.clone(), Some(state));
        assert!(has_changed(&snap));
    }

    #[test]
    fn identical_update_is_unchanged() {
        let snap = snapshot(
            TransitionKind::Modified,
            product("B", 10),
            Some(product("B", 10)),
        );
        assert!(!has_changed(&snap));
    }

    #[test]
    fn single_field_difference_is_a_change() {
        let snap = snapshot(
            TransitionKind::Modified,
            product("B", 11),
            Some(product("B", 10)),
        );
        assert!(has_changed(&snap));
        assert_eq!(changed_fields(&snap), vec!["price"]);
    }

    #[test]
    fn null_to_value_is_a_change() {
        let snap = snapshot(
            TransitionKind::Modified,
            product("B", 10).with("description", "new"),
            Some(product("B", 10).with("description", Value::Null)),
        );
        assert!(has_changed(&snap));
    }

    proptest! {
        #[test]
        fn modified_changes_iff_records_differ(
            a in "[a-c]{1,2}", b in "[a-c]{1,2}", p in 0i64..3, q in 0i64..3
        ) {
            let current = product(&a, p);
            let original = product(&b, q);
            let expected = current != original;
            let snap = snapshot(TransitionKind::Modified, current, Some(original));
            prop_assert_eq!(has_changed(&snap), expected);
        }
    }
}
