//! End-to-end tests for history recording, version queries and restore.

use retrace_core::{
    CancellationToken, CommitMode, Config, CoreError, HistoryContext, HistoryRegistry,
    RestoreOutcome, TimestampPolicy,
};
use retrace_store::{InMemoryStore, Store, UnitOfWorkState};
use retrace_testkit::{
    product_context, product_registry, scenarios, ticking_clock, FaultyStore, PricelessHistory,
    PricelessProduct, Product, TextPriceProduct,
};

fn faulty_context(config: Config) -> HistoryContext<FaultyStore<InMemoryStore>> {
    HistoryContext::with_clock(
        FaultyStore::new(InMemoryStore::new()),
        product_registry(),
        config,
        ticking_clock(),
    )
    .unwrap()
}

fn states(ctx: &HistoryContext<impl Store>, id: i32) -> Vec<Product> {
    ctx.list_versions::<Product>(&id)
        .unwrap()
        .into_iter()
        .map(|v| v.record.state())
        .collect()
}

#[test]
fn rename_then_identical_save() {
    let ctx = product_context(Config::default());

    ctx.insert(&Product::new(1, "A", 10)).unwrap();
    ctx.update(&Product::new(1, "B", 10)).unwrap();
    let report = ctx.update(&Product::new(1, "B", 10)).unwrap();

    assert_eq!(report.history_written(), 0);
    assert_eq!(report.unchanged, 1);

    let versions = ctx.list_versions::<Product>(&1).unwrap();
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[0].version, 1);
    assert_eq!(versions[0].record.name, "A");
    assert_eq!(versions[1].version, 2);
    assert_eq!(versions[1].record.name, "B");
    assert!(versions[0].record.created_at < versions[1].record.created_at);
}

#[test]
fn repeated_identical_saves_are_idempotent() {
    let ctx = product_context(Config::default());
    let product = Product::new(1, "A", 10).with_description("boxed");
    ctx.insert(&product).unwrap();

    for _ in 0..5 {
        let report = ctx.update(&product).unwrap();
        assert!(report.history_sequence.is_none());
    }
    assert_eq!(ctx.history::<Product>().unwrap().len(), 1);
}

#[test]
fn restore_round_trip() {
    let ctx = product_context(Config::default());
    let recorded = scenarios::three_states(&ctx, 1);

    let restored = ctx.restore::<Product>(&1, 1).unwrap();
    assert_eq!(restored.outcome, RestoreOutcome::Updated);
    assert_eq!(restored.report.history_written(), 1);

    let versions = states(&ctx, 1);
    assert_eq!(versions.len(), 4);
    assert_eq!(versions[3], recorded[0]);
    assert_eq!(ctx.get::<Product>(&1).unwrap(), Some(recorded[0].clone()));
}

#[test]
fn restore_to_current_state_is_noop() {
    let ctx = product_context(Config::default());
    scenarios::three_states(&ctx, 1);

    let restored = ctx.restore::<Product>(&1, 3).unwrap();
    assert_eq!(restored.outcome, RestoreOutcome::Unchanged);
    assert_eq!(restored.report.history_written(), 0);
    assert_eq!(states(&ctx, 1).len(), 3);
}

#[test]
fn delete_then_restore_recreates() {
    let ctx = product_context(Config::default());
    ctx.insert(&Product::new(1, "A", 10)).unwrap();
    ctx.update(&Product::new(1, "B", 10)).unwrap();

    let report = ctx.delete::<Product>(&1).unwrap();
    assert_eq!(report.history_written(), 1);
    assert_eq!(ctx.get::<Product>(&1).unwrap(), None);
    assert_eq!(states(&ctx, 1)[2], Product::new(1, "B", 10));

    let restored = ctx.restore::<Product>(&1, 1).unwrap();
    assert_eq!(restored.outcome, RestoreOutcome::Recreated);
    assert_eq!(ctx.get::<Product>(&1).unwrap(), Some(Product::new(1, "A", 10)));
    assert_eq!(states(&ctx, 1).len(), 4);
}

#[test]
fn missing_versions_are_reported() {
    let ctx = product_context(Config::default());
    ctx.insert(&Product::new(1, "A", 10)).unwrap();

    for version in [0, 2, 100] {
        let err = ctx.find_version::<Product>(&1, version).unwrap_err();
        assert!(matches!(err, CoreError::VersionNotFound { version: v, .. } if v == version));
    }
    assert!(matches!(
        ctx.restore::<Product>(&2, 1),
        Err(CoreError::VersionNotFound { .. })
    ));
    assert!(ctx.list_versions::<Product>(&2).unwrap().is_empty());
}

#[test]
fn histories_of_different_entities_are_independent() {
    let ctx = product_context(Config::default());
    scenarios::three_states(&ctx, 1);
    ctx.insert(&Product::new(2, "Z", 99)).unwrap();

    let all = ctx.all_versions::<Product>().unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[&1].len(), 3);
    assert_eq!(all[&2].len(), 1);
    assert_eq!(all[&2][0].version, 1);
}

#[test]
fn one_unit_of_work_records_every_changed_entity() {
    let ctx = product_context(Config::default());
    ctx.insert(&Product::new(3, "C", 30)).unwrap();

    let mut uow = ctx.begin().unwrap();
    ctx.stage_insert(&mut uow, &Product::new(1, "A", 10)).unwrap();
    ctx.stage_insert(&mut uow, &Product::new(2, "B", 20)).unwrap();
    ctx.stage_update(&mut uow, &Product::new(3, "C", 30)).unwrap();
    let report = ctx.save_changes(&mut uow).unwrap();

    assert_eq!(report.snapshots, 3);
    assert_eq!(report.unchanged, 1);
    assert_eq!(report.history_written(), 2);

    let rows = ctx.history::<Product>().unwrap();
    let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![3, 1, 2]);
}

#[test]
fn schema_mismatch_is_rejected_at_build() {
    match HistoryRegistry::builder().register::<PricelessProduct>().build() {
        Err(CoreError::SchemaMismatch { history, field, .. }) => {
            assert_eq!(history, std::any::type_name::<PricelessHistory>());
            assert_eq!(field, "price");
        }
        other => panic!("expected schema mismatch, got {other:?}"),
    }

    match HistoryRegistry::builder().register::<TextPriceProduct>().build() {
        Err(CoreError::SchemaMismatch { field, reason, .. }) => {
            assert_eq!(field, "price");
            assert!(reason.contains("history"));
        }
        other => panic!("expected schema mismatch, got {other:?}"),
    }
}

#[test]
fn failed_history_commit_leaves_primary_row() {
    let ctx = faulty_context(Config::default());
    ctx.insert(&Product::new(1, "A", 10)).unwrap();

    ctx.store().fail_next_commit_to("products_history");
    let err = ctx.update(&Product::new(1, "B", 10)).unwrap_err();

    match &err {
        CoreError::HistoryPersist { unwritten, .. } => assert_eq!(*unwritten, 1),
        other => panic!("expected history persist failure, got {other:?}"),
    }
    assert!(err.requires_operator_attention());
    assert_eq!(ctx.get::<Product>(&1).unwrap(), Some(Product::new(1, "B", 10)));
    assert_eq!(states(&ctx, 1), vec![Product::new(1, "A", 10)]);
}

#[test]
fn atomic_commit_failure_writes_nothing() {
    let ctx = faulty_context(Config::new().commit_mode(CommitMode::Atomic));
    ctx.insert(&Product::new(1, "A", 10)).unwrap();

    ctx.store().fail_next_commit_to("products_history");
    let err = ctx.update(&Product::new(1, "B", 10)).unwrap_err();

    assert!(!err.requires_operator_attention());
    assert_eq!(ctx.get::<Product>(&1).unwrap(), Some(Product::new(1, "A", 10)));
    assert_eq!(states(&ctx, 1), vec![Product::new(1, "A", 10)]);
}

#[test]
fn atomic_mode_shares_one_sequence() {
    let ctx = product_context(Config::new().commit_mode(CommitMode::Atomic));
    let report = ctx.insert(&Product::new(1, "A", 10)).unwrap();

    assert_eq!(report.history_sequence, Some(report.sequence));
    assert_eq!(report.history_written(), 1);
    assert_eq!(ctx.store().committed_sequence(), report.sequence);
}

#[test]
fn cancellation_before_commit_writes_nothing() {
    let ctx = product_context(Config::default());
    let token = CancellationToken::new();
    token.cancel();

    let mut uow = ctx.begin().unwrap();
    ctx.stage_insert(&mut uow, &Product::new(1, "A", 10)).unwrap();
    let err = ctx.save_changes_with(&mut uow, &token).unwrap_err();

    assert!(matches!(err, CoreError::Cancelled));
    assert_eq!(uow.state(), UnitOfWorkState::Aborted);
    assert_eq!(ctx.get::<Product>(&1).unwrap(), None);
    assert!(ctx.history::<Product>().unwrap().is_empty());
}

#[test]
fn cancellation_after_commit_still_writes_history() {
    let ctx = faulty_context(Config::default());
    let token = CancellationToken::new();
    ctx.store().cancel_after_next_commit(token.clone());

    let mut uow = ctx.begin().unwrap();
    ctx.stage_insert(&mut uow, &Product::new(1, "A", 10)).unwrap();
    let report = ctx.save_changes_with(&mut uow, &token).unwrap();

    assert!(token.is_cancelled());
    assert!(report.cancelled_after_commit);
    assert_eq!(report.history_written(), 1);
    assert_eq!(states(&ctx, 1), vec![Product::new(1, "A", 10)]);
}

#[test]
fn row_deleted_underneath_is_a_concurrent_modification() {
    let ctx = product_context(Config::default());
    ctx.insert(&Product::new(1, "A", 10)).unwrap();

    let mut uow = ctx.begin().unwrap();
    ctx.stage_update(&mut uow, &Product::new(1, "B", 10)).unwrap();
    ctx.delete::<Product>(&1).unwrap();

    let err = ctx.save_changes(&mut uow).unwrap_err();
    assert!(matches!(err, CoreError::ConcurrentModification { .. }));
    assert_eq!(uow.state(), UnitOfWorkState::Aborted);
    assert_eq!(states(&ctx, 1).len(), 2);
}

#[test]
fn duplicate_insert_is_a_concurrent_modification() {
    let ctx = product_context(Config::default());
    ctx.insert(&Product::new(1, "A", 10)).unwrap();

    let err = ctx.insert(&Product::new(1, "B", 10)).unwrap_err();
    assert!(matches!(err, CoreError::ConcurrentModification { .. }));
    assert_eq!(states(&ctx, 1).len(), 1);
}

#[test]
fn missing_entities_cannot_be_updated_or_deleted() {
    let ctx = product_context(Config::default());
    assert!(matches!(
        ctx.update(&Product::new(1, "A", 10)),
        Err(CoreError::EntityNotFound { .. })
    ));
    assert!(matches!(
        ctx.delete::<Product>(&1),
        Err(CoreError::EntityNotFound { .. })
    ));
    assert!(ctx.history::<Product>().unwrap().is_empty());
}

#[test]
fn create_only_stamps_sort_unstamped_rows_first() {
    let ctx = product_context(Config::new().timestamp_policy(TimestampPolicy::CreateOnly));
    ctx.insert(&Product::new(1, "A", 10)).unwrap();
    ctx.update(&Product::new(1, "B", 10)).unwrap();

    let versions = ctx.list_versions::<Product>(&1).unwrap();
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[0].record.name, "B");
    assert!(versions[0].record.created_at.is_none());
    assert_eq!(versions[1].record.name, "A");
    assert!(versions[1].record.created_at.is_some());
}

#[test]
fn history_rows_get_increasing_ids() {
    let ctx = product_context(Config::default());
    scenarios::three_states(&ctx, 1);

    let rows = ctx.history_of::<Product>(&1).unwrap();
    assert_eq!(rows.len(), 3);
    assert!(rows.windows(2).all(|w| w[0].history_id < w[1].history_id));
    assert!(rows.iter().all(|r| r.history_id.is_assigned()));
}
