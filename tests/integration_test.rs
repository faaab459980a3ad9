//! End-to-end scenarios across the buffer pool, heap files, and locking.

use anyhow::Result;
use pagedb::access::value::{DataType, Field};
use pagedb::access::{TupleDesc, Tuple};
use pagedb::catalog::TableId;
use pagedb::database::Database;
use pagedb::error::EngineError;
use pagedb::storage::page::PageId;
use pagedb::storage::{BufferPoolConfig, EvictionPolicy};
use pagedb::transaction::{Permission, TransactionId};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// 49 int columns: tuple width 196 bytes, exactly 20 slots per 4KB page.
fn twenty_slot_desc() -> TupleDesc {
    TupleDesc::new(vec![DataType::Int; 49])
}

fn wide_tuple(desc: &TupleDesc, tag: i32) -> Tuple {
    Tuple::new(desc.clone(), vec![Field::Int(tag); 49]).unwrap()
}

fn tag_of(tuple: &Tuple) -> i32 {
    match tuple.field(0) {
        Field::Int(v) => *v,
        _ => unreachable!(),
    }
}

fn scan_tags(db: &Database, table_id: TableId, tid: TransactionId) -> Result<Vec<i32>> {
    let file = db.table(table_id)?;
    let mut scan = file.scan(db.pool(), tid);
    scan.open()?;
    let mut tags = Vec::new();
    while let Some(tuple) = scan.next()? {
        tags.push(tag_of(&tuple));
    }
    scan.close();
    Ok(tags)
}

#[test]
fn test_growth_appends_exactly_one_page() -> Result<()> {
    init_logging();
    let dir = TempDir::new()?;
    let db = Database::default();
    let desc = twenty_slot_desc();
    let table_id = db.create_table(&dir.path().join("t.db"), desc.clone())?;
    let tid = TransactionId::new();

    // Fill page 0 completely.
    for tag in 0..20 {
        let mut tuple = wide_tuple(&desc, tag);
        db.pool().insert_tuple(tid, table_id, &mut tuple)?;
        assert_eq!(tuple.record_id().unwrap().page_id.page_no, 0);
    }
    assert_eq!(db.table(table_id)?.num_pages()?, 1);

    // Every page full: the next insert grows the table by exactly one page
    // and lands on it.
    let mut overflow = wide_tuple(&desc, 99);
    db.pool().insert_tuple(tid, table_id, &mut overflow)?;
    assert_eq!(db.table(table_id)?.num_pages()?, 2);
    assert_eq!(overflow.record_id().unwrap().page_id.page_no, 1);

    let tags = scan_tags(&db, table_id, tid)?;
    assert_eq!(tags.len(), 21);
    assert_eq!(tags[20], 99);
    Ok(())
}

#[test]
fn test_shrink_and_renumber() -> Result<()> {
    init_logging();
    let dir = TempDir::new()?;
    let db = Database::default();
    let desc = twenty_slot_desc();
    let table_id = db.create_table(&dir.path().join("t.db"), desc.clone())?;
    let tid = TransactionId::new();

    // Three pages: 20 tuples tagged 0, 20 tagged 1, one tagged 2.
    for page in 0..2 {
        for _ in 0..20 {
            let mut tuple = wide_tuple(&desc, page);
            db.pool().insert_tuple(tid, table_id, &mut tuple)?;
        }
    }
    let mut last = wide_tuple(&desc, 2);
    db.pool().insert_tuple(tid, table_id, &mut last)?;
    assert_eq!(last.record_id().unwrap().page_id.page_no, 2);
    assert_eq!(db.table(table_id)?.num_pages()?, 3);

    // Collect the middle page's tuples and delete them all.
    let file = db.table(table_id)?;
    let mut scan = file.scan(db.pool(), tid);
    scan.open()?;
    let mut middle = Vec::new();
    while let Some(tuple) = scan.next()? {
        if tuple.record_id().unwrap().page_id.page_no == 1 {
            middle.push(tuple);
        }
    }
    scan.close();
    assert_eq!(middle.len(), 20);
    for tuple in &middle {
        db.pool().delete_tuple(tid, tuple)?;
    }

    // Page 1 is gone, page 2 was renumbered to 1, numbering stays dense.
    assert_eq!(db.table(table_id)?.num_pages()?, 2);
    let tags = scan_tags(&db, table_id, tid)?;
    assert_eq!(tags.len(), 21);
    assert!(tags[..20].iter().all(|&t| t == 0));
    assert_eq!(tags[20], 2);

    // The survivor is reachable under its new page number.
    let renumbered = db.pool().get_page(
        tid,
        PageId::new(table_id, 1),
        Permission::ReadOnly,
    )?;
    assert_eq!(renumbered.read().tuples()?.len(), 1);
    Ok(())
}

#[test]
fn test_scenario_a_lru_eviction_reloads_from_disk() -> Result<()> {
    init_logging();
    let dir = TempDir::new()?;
    let db = Database::new(BufferPoolConfig {
        capacity: 2,
        eviction: EvictionPolicy::FlushDirty,
        lock_timeout: None,
    });
    let desc = twenty_slot_desc();
    let table_id = db.create_table(&dir.path().join("t.db"), desc.clone())?;
    let tid = TransactionId::new();

    // Three pages on disk, created through inserts then flushed.
    for page in 0..3 {
        for _ in 0..20 {
            let mut tuple = wide_tuple(&desc, page);
            db.pool().insert_tuple(tid, table_id, &mut tuple)?;
        }
    }
    db.pool().flush_all_pages()?;

    let file = db.table(table_id)?;
    let a = PageId::new(table_id, 0);
    let b = PageId::new(table_id, 1);
    let c = PageId::new(table_id, 2);

    db.pool().get_page(tid, a, Permission::ReadOnly)?;
    db.pool().get_page(tid, b, Permission::ReadOnly)?;
    let reads_when_full = file.read_count();

    // C evicts A; re-fetching A is a fresh disk read.
    db.pool().get_page(tid, c, Permission::ReadOnly)?;
    db.pool().get_page(tid, a, Permission::ReadOnly)?;
    assert_eq!(file.read_count(), reads_when_full + 2);
    assert!(db.pool().cached_page_count() <= 2);
    Ok(())
}

#[test]
fn test_scenario_b_single_page_lifecycle() -> Result<()> {
    init_logging();
    let dir = TempDir::new()?;
    let db = Database::default();
    let desc = twenty_slot_desc();
    let table_id = db.create_table(&dir.path().join("t.db"), desc.clone())?;
    let tid = TransactionId::new();

    let mut tuple = wide_tuple(&desc, 7);
    db.pool().insert_tuple(tid, table_id, &mut tuple)?;

    let page = db.pool().get_page(
        tid,
        PageId::new(table_id, 0),
        Permission::ReadOnly,
    )?;
    assert_eq!(page.read().num_slots(), 20);
    assert_eq!(page.read().empty_slot_count(), 19);
    drop(page);

    // Deleting the only tuple empties the page; the table shrinks to zero
    // pages and the page is dropped from the cache.
    db.pool().delete_tuple(tid, &tuple)?;
    assert_eq!(db.table(table_id)?.num_pages()?, 0);
    assert_eq!(scan_tags(&db, table_id, tid)?.len(), 0);
    Ok(())
}

#[test]
fn test_round_trip_survives_reopen() -> Result<()> {
    init_logging();
    let dir = TempDir::new()?;
    let path = dir.path().join("t.db");
    let desc = TupleDesc::new(vec![DataType::Int, DataType::Text]);

    {
        let db = Database::default();
        let table_id = db.create_table(&path, desc.clone())?;
        let tid = TransactionId::new();
        for v in 0..5 {
            let mut tuple = Tuple::new(
                desc.clone(),
                vec![Field::Int(v), Field::text(format!("row-{}", v))?],
            )?;
            db.pool().insert_tuple(tid, table_id, &mut tuple)?;
        }
        db.pool().flush_all_pages()?;
    }

    let db = Database::default();
    let table_id = db.open_table(&path, desc.clone())?;
    let tid = TransactionId::new();
    let file = db.table(table_id)?;
    let mut scan = file.scan(db.pool(), tid);
    scan.open()?;
    let mut rows = Vec::new();
    while let Some(tuple) = scan.next()? {
        rows.push((tag_of(&tuple), tuple.field(1).clone()));
    }
    assert_eq!(rows.len(), 5);
    for (v, text) in rows {
        assert_eq!(text, Field::text(format!("row-{}", v))?);
    }
    Ok(())
}

#[test]
fn test_writers_are_mutually_exclusive() -> Result<()> {
    init_logging();
    let dir = TempDir::new()?;
    let db = Arc::new(Database::default());
    let desc = twenty_slot_desc();
    let table_id = db.create_table(&dir.path().join("t.db"), desc.clone())?;

    // One page on disk for everyone to fight over.
    let setup_tid = TransactionId::new();
    let mut tuple = wide_tuple(&desc, 0);
    db.pool().insert_tuple(setup_tid, table_id, &mut tuple)?;
    let pid = PageId::new(table_id, 0);
    db.pool().release_page(setup_tid, pid)?;

    let inside = Arc::new(AtomicUsize::new(0));
    let mut handles = Vec::new();
    for _ in 0..4 {
        let db = Arc::clone(&db);
        let inside = Arc::clone(&inside);
        handles.push(thread::spawn(move || {
            let tid = TransactionId::new();
            db.pool().get_page(tid, pid, Permission::ReadWrite).unwrap();

            // Exclusive access: no other writer may be in here.
            assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
            thread::sleep(Duration::from_millis(10));
            assert_eq!(inside.fetch_sub(1, Ordering::SeqCst), 1);

            db.pool().release_page(tid, pid).unwrap();
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }
    Ok(())
}

#[test]
fn test_readers_coexist() -> Result<()> {
    init_logging();
    let dir = TempDir::new()?;
    let db = Arc::new(Database::default());
    let desc = twenty_slot_desc();
    let table_id = db.create_table(&dir.path().join("t.db"), desc.clone())?;

    let setup_tid = TransactionId::new();
    let mut tuple = wide_tuple(&desc, 0);
    db.pool().insert_tuple(setup_tid, table_id, &mut tuple)?;
    let pid = PageId::new(table_id, 0);
    db.pool().release_page(setup_tid, pid)?;

    // A reader on the main thread plus several in threads all get the page
    // without blocking each other.
    let main_tid = TransactionId::new();
    db.pool().get_page(main_tid, pid, Permission::ReadOnly)?;

    let mut handles = Vec::new();
    for _ in 0..4 {
        let db = Arc::clone(&db);
        handles.push(thread::spawn(move || {
            let tid = TransactionId::new();
            db.pool().get_page(tid, pid, Permission::ReadOnly).unwrap();
            assert!(db.pool().holds_lock(tid, pid));
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }
    assert!(db.pool().holds_lock(main_tid, pid));
    Ok(())
}

#[test]
fn test_lock_timeout_aborts_transaction() -> Result<()> {
    init_logging();
    let dir = TempDir::new()?;
    let db = Database::new(BufferPoolConfig {
        capacity: 8,
        eviction: EvictionPolicy::FlushDirty,
        lock_timeout: Some(Duration::from_millis(50)),
    });
    let desc = twenty_slot_desc();
    let table_id = db.create_table(&dir.path().join("t.db"), desc.clone())?;

    let holder = TransactionId::new();
    let mut tuple = wide_tuple(&desc, 0);
    db.pool().insert_tuple(holder, table_id, &mut tuple)?;
    let pid = PageId::new(table_id, 0);

    let other = TransactionId::new();
    let err = db
        .pool()
        .get_page(other, pid, Permission::ReadOnly)
        .unwrap_err();
    assert!(matches!(err, EngineError::TransactionAborted { .. }));
    Ok(())
}
