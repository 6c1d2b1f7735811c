//! End-to-end projection behaviour: blocks go into a `BlockFeed`, rows come
//! out of the in-memory store.

use std::sync::Arc;

use contentindex_core::config::ProjectorConfig;
use contentindex_core::feed::BlockFeed;
use contentindex_core::record::OperationKind;
use contentindex_core::types::{
    AppliedOperation, Block, ContentCreate, ContentRemove, ContentUpdate, ObjectId, Operation,
    OperationResult, PermissionCreate, PermissionCreateMany, PermissionGrant, PermissionRemove,
    Transaction,
};
use contentindex_plugin::{ContentIndexPlugin, ProjectorBuilder};
use contentindex_storage::InMemoryStore;

// ─── Fixtures ────────────────────────────────────────────────────────────────

const ALICE: ObjectId = ObjectId::new(1, 2, 17);
const BOB: ObjectId = ObjectId::new(1, 2, 18);

fn content_create(hash: &str, description: &str) -> Operation {
    Operation::ContentCreate(ContentCreate {
        subject_account: ALICE,
        hash: hash.into(),
        url: format!("ipfs://{hash}"),
        content_type: "image".into(),
        description: description.into(),
        content_key: "k1".into(),
        storage_data: "{}".into(),
    })
}

fn content_update(id: ObjectId, hash: &str, description: &str) -> Operation {
    Operation::ContentUpdate(ContentUpdate {
        subject_account: ALICE,
        content_id: id,
        hash: hash.into(),
        url: format!("ipfs://{hash}"),
        content_type: "video".into(),
        description: description.into(),
        content_key: "k2".into(),
        storage_data: "{\"size\":1}".into(),
    })
}

fn grant(operator: ObjectId, permission_type: &str) -> PermissionGrant {
    PermissionGrant {
        operator_account: operator,
        permission_type: permission_type.into(),
        object_id: None,
        content_key: String::new(),
    }
}

fn applied(op: Operation, result: OperationResult, trx_in_block: u32) -> Option<AppliedOperation> {
    Some(AppliedOperation {
        op,
        result,
        trx_in_block,
    })
}

fn block(number: u64, trx_ids: &[&str], ops: Vec<Option<AppliedOperation>>) -> Block {
    Block {
        number,
        timestamp: 1_700_000_000 + number as i64 * 3,
        transactions: trx_ids.iter().map(|id| Transaction::new(*id)).collect(),
        applied_operations: ops,
    }
}

async fn started(start_block: u64) -> (Arc<BlockFeed>, Arc<InMemoryStore>, ContentIndexPlugin) {
    let feed = Arc::new(BlockFeed::new());
    let store = Arc::new(InMemoryStore::new());
    let mut plugin = ContentIndexPlugin::new(ProjectorConfig {
        storage_connection_url: None,
        start_block,
    });
    plugin
        .startup_with_store(&feed, store.clone())
        .await
        .expect("startup");
    (feed, store, plugin)
}

// ─── Idempotence ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn replaying_a_block_is_idempotent() {
    let (feed, store, _plugin) = started(0).await;
    let content_id = ObjectId::new(1, 21, 0);
    let perm_id = ObjectId::new(1, 22, 0);

    let b = block(
        100,
        &["t0", "t1", "t2"],
        vec![
            applied(content_create("h0", "first"), OperationResult::ObjectId(content_id), 0),
            applied(
                Operation::PermissionCreate(PermissionCreate {
                    subject_account: ALICE,
                    operator_account: BOB,
                    permission_type: "read".into(),
                    object_id: Some(content_id),
                    content_key: "ck".into(),
                }),
                OperationResult::ObjectId(perm_id),
                1,
            ),
            applied(
                Operation::PermissionCreateMany(PermissionCreateMany {
                    subject_account: ALICE,
                    permissions: vec![grant(BOB, "write"), grant(BOB, "share")],
                }),
                OperationResult::Generic {
                    new_objects: vec![ObjectId::new(1, 22, 1), ObjectId::new(1, 22, 2)],
                    updated_objects: vec![],
                    removed_objects: vec![],
                },
                2,
            ),
        ],
    );

    feed.apply(&b).await;
    let content_once = store.content_rows();
    let perms_once = store.permission_rows();

    feed.apply(&b).await;
    assert_eq!(store.content_rows(), content_once);
    assert_eq!(store.permission_rows(), perms_once);
    assert_eq!(perms_once.len(), 3);

    let scoped = store.permission("1.22.0").unwrap();
    assert_eq!(scoped.referenced_object_id, "1.21.0");
    assert_eq!(scoped.transaction_id, "t1");
}

#[tokio::test]
async fn replaying_a_remove_is_idempotent() {
    let (feed, store, _plugin) = started(0).await;
    let id = ObjectId::new(1, 21, 3);

    feed.apply(&block(
        1,
        &["t0"],
        vec![applied(content_create("h", "d"), OperationResult::ObjectId(id), 0)],
    ))
    .await;

    let remove = block(
        2,
        &["t1"],
        vec![applied(
            Operation::ContentRemove(ContentRemove {
                subject_account: ALICE,
                content_id: id,
            }),
            OperationResult::Void,
            0,
        )],
    );
    feed.apply(&remove).await;
    let once = store.content_rows();
    feed.apply(&remove).await;
    assert_eq!(store.content_rows(), once);
}

// ─── Merge and soft delete ───────────────────────────────────────────────────

#[tokio::test]
async fn create_then_update_merges_into_one_row() {
    let (feed, store, _plugin) = started(0).await;
    let id = ObjectId::new(1, 21, 5);

    feed.apply(&block(
        10,
        &["t-create"],
        vec![applied(content_create("h1", "original"), OperationResult::ObjectId(id), 0)],
    ))
    .await;
    feed.apply(&block(
        11,
        &["t-update"],
        vec![applied(content_update(id, "h2", "edited"), OperationResult::Void, 0)],
    ))
    .await;

    let rows = store.content_rows();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.id, "1.21.5");
    assert_eq!(row.hash, "h2");
    assert_eq!(row.url, "ipfs://h2");
    assert_eq!(row.content_type, "video");
    assert_eq!(row.description, "edited");
    assert_eq!(row.content_key, "k2");
    assert_eq!(row.operation_kind, OperationKind::Updated);
    assert_eq!(row.block_num, 11);
    assert_eq!(row.transaction_id, "t-update");
}

#[tokio::test]
async fn remove_preserves_fields_and_is_terminal() {
    let (feed, store, _plugin) = started(0).await;
    let id = ObjectId::new(1, 21, 6);

    feed.apply(&block(
        20,
        &["t0"],
        vec![applied(content_create("h1", "kept"), OperationResult::ObjectId(id), 0)],
    ))
    .await;
    feed.apply(&block(
        21,
        &["t1"],
        vec![applied(
            Operation::ContentRemove(ContentRemove {
                subject_account: ALICE,
                content_id: id,
            }),
            OperationResult::Void,
            0,
        )],
    ))
    .await;

    let row = store.content("1.21.6").unwrap();
    assert!(row.removed);
    assert_eq!(row.operation_kind, OperationKind::Removed);
    assert_eq!(row.block_num, 21);
    assert_eq!(row.subject_account, "1.2.17");
    assert_eq!(row.hash, "h1");
    assert_eq!(row.description, "kept");
    assert_eq!(row.transaction_id, "t0");

    // A later update does not bring the row back.
    feed.apply(&block(
        22,
        &["t2"],
        vec![applied(content_update(id, "h3", "revived?"), OperationResult::Void, 0)],
    ))
    .await;
    assert!(store.content("1.21.6").unwrap().removed);
}

#[tokio::test]
async fn remove_before_create_is_a_noop() {
    let (feed, store, plugin) = started(0).await;

    feed.apply(&block(
        30,
        &["t0", "t1"],
        vec![
            applied(
                Operation::ContentRemove(ContentRemove {
                    subject_account: ALICE,
                    content_id: ObjectId::new(1, 21, 99),
                }),
                OperationResult::Void,
                0,
            ),
            applied(
                Operation::PermissionRemove(PermissionRemove {
                    subject_account: ALICE,
                    permission_id: ObjectId::new(1, 22, 99),
                }),
                OperationResult::Void,
                1,
            ),
        ],
    ))
    .await;

    assert!(store.content_rows().is_empty());
    assert!(store.permission_rows().is_empty());
    let totals = plugin.totals();
    assert_eq!(totals.unchanged, 2);
    assert_eq!(totals.failed, 0);
}

// ─── Identity ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn batch_slots_pair_with_ids_in_order() {
    let (feed, store, _plugin) = started(0).await;
    let ids = [
        ObjectId::new(1, 22, 40),
        ObjectId::new(1, 22, 41),
        ObjectId::new(1, 22, 42),
    ];

    feed.apply(&block(
        40,
        &["t-batch"],
        vec![applied(
            Operation::PermissionCreateMany(PermissionCreateMany {
                subject_account: ALICE,
                permissions: vec![grant(BOB, "a"), grant(BOB, "b"), grant(BOB, "c")],
            }),
            OperationResult::Generic {
                new_objects: ids.to_vec(),
                updated_objects: vec![],
                removed_objects: vec![],
            },
            0,
        )],
    ))
    .await;

    assert_eq!(store.permission("1.22.40").unwrap().permission_type, "a");
    assert_eq!(store.permission("1.22.41").unwrap().permission_type, "b");
    assert_eq!(store.permission("1.22.42").unwrap().permission_type, "c");
    let row = store.permission("1.22.41").unwrap();
    assert_eq!(row.subject_account, "1.2.17");
    assert_eq!(row.operator_account, "1.2.18");
}

#[tokio::test]
async fn short_batch_result_falls_back_per_slot() {
    let (feed, store, _plugin) = started(0).await;

    feed.apply(&block(
        41,
        &["abc"],
        vec![applied(
            Operation::PermissionCreateMany(PermissionCreateMany {
                subject_account: ALICE,
                permissions: vec![grant(BOB, "a"), grant(BOB, "b"), grant(BOB, "c")],
            }),
            OperationResult::Generic {
                new_objects: vec![ObjectId::new(1, 22, 50)],
                updated_objects: vec![],
                removed_objects: vec![],
            },
            0,
        )],
    ))
    .await;

    let ids: Vec<_> = store.permission_rows().into_iter().map(|r| r.id).collect();
    assert_eq!(ids, vec!["1.22.50", "pending-abc-1", "pending-abc-2"]);
}

#[tokio::test]
async fn reordered_batch_result_follows_delivery_order() {
    let (feed, store, _plugin) = started(0).await;

    feed.apply(&block(
        42,
        &["t0"],
        vec![applied(
            Operation::PermissionCreateMany(PermissionCreateMany {
                subject_account: ALICE,
                permissions: vec![grant(BOB, "a"), grant(BOB, "b")],
            }),
            OperationResult::Generic {
                new_objects: vec![ObjectId::new(1, 22, 61), ObjectId::new(1, 22, 60)],
                updated_objects: vec![],
                removed_objects: vec![],
            },
            0,
        )],
    ))
    .await;

    // Pairing is positional, so a reordered result mis-assigns.
    assert_eq!(store.permission("1.22.61").unwrap().permission_type, "a");
    assert_eq!(store.permission("1.22.60").unwrap().permission_type, "b");
}

#[tokio::test]
async fn create_without_id_gets_provisional_row() {
    let (feed, store, _plugin) = started(0).await;

    feed.apply(&block(
        50,
        &["deadbeef"],
        vec![
            applied(content_create("h", "d"), OperationResult::Void, 0),
            applied(
                Operation::PermissionCreate(PermissionCreate {
                    subject_account: ALICE,
                    operator_account: BOB,
                    permission_type: "read".into(),
                    object_id: None,
                    content_key: String::new(),
                }),
                OperationResult::Asset {
                    amount: 5,
                    asset_id: ObjectId::new(1, 3, 0),
                },
                0,
            ),
        ],
    ))
    .await;

    let content = store.content("pending-deadbeef").unwrap();
    assert_eq!(content.transaction_id, "deadbeef");
    assert_eq!(content.operation_kind, OperationKind::Created);
    assert!(store.permission("pending-deadbeef").is_some());
}

// ─── Gating and ordering ─────────────────────────────────────────────────────

#[tokio::test]
async fn blocks_below_start_block_write_nothing() {
    let (feed, store, plugin) = started(1_000).await;
    let op = || applied(content_create("h", "d"), OperationResult::ObjectId(ObjectId::new(1, 21, 1)), 0);

    feed.apply(&block(999, &["t0"], vec![op()])).await;
    assert_eq!(store.write_count(), 0);
    assert_eq!(plugin.totals().gated, 1);

    feed.apply(&block(1_000, &["t0"], vec![op()])).await;
    assert_eq!(store.content_rows().len(), 1);
}

#[tokio::test]
async fn same_block_collision_keeps_the_later_write() {
    let (feed, store, _plugin) = started(0).await;
    let id = ObjectId::new(1, 21, 70);

    feed.apply(&block(
        70,
        &["t-first", "t-second"],
        vec![
            applied(content_create("first", "first"), OperationResult::ObjectId(id), 0),
            applied(content_create("second", "second"), OperationResult::ObjectId(id), 1),
        ],
    ))
    .await;

    let row = store.content("1.21.70").unwrap();
    assert_eq!(row.hash, "second");
    assert_eq!(row.description, "second");
    assert_eq!(row.transaction_id, "t-second");
}

#[tokio::test]
async fn unrecognized_operations_are_skipped() {
    let (feed, store, plugin) = started(0).await;

    feed.apply(&block(
        80,
        &["t0"],
        vec![
            None,
            applied(Operation::Unrecognized, OperationResult::Void, 0),
            applied(content_create("h", "d"), OperationResult::ObjectId(ObjectId::new(1, 21, 80)), 0),
        ],
    ))
    .await;

    assert_eq!(store.content_rows().len(), 1);
    let totals = plugin.totals();
    assert_eq!(totals.ignored, 1);
    assert_eq!(totals.applied, 1);
}

// ─── Lifecycle ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn startup_from_url_and_shutdown() {
    let feed = Arc::new(BlockFeed::new());
    let mut plugin = ProjectorBuilder::new()
        .storage_connection_url("sqlite::memory:")
        .build();

    plugin.startup(&feed).await.unwrap();
    feed.apply(&block(
        1,
        &["t0"],
        vec![applied(content_create("h", "d"), OperationResult::ObjectId(ObjectId::new(1, 21, 1)), 0)],
    ))
    .await;
    assert_eq!(plugin.totals().applied, 1);

    plugin.shutdown().await;
    assert_eq!(feed.subscriber_count(), 0);
    assert_eq!(plugin.totals().applied, 1);

    // Nothing is projected after shutdown.
    feed.apply(&block(2, &["t0"], vec![])).await;
    assert_eq!(plugin.totals().writes(), 1);
}
