use crate::silent_logs;
use sluice::{Session, into, use_};
use std::cell::RefCell;

const ROWS: i32 = 10;
const BATCH: usize = 4;

fn setup(session: &mut Session) {
    session
        .once("drop table if exists sluice_bulk")
        .run()
        .expect("Failed to drop the sluice_bulk table");
    session
        .once("create table sluice_bulk (id integer, name varchar(20))")
        .run()
        .expect("Failed to create the sluice_bulk table");
    let ids: Vec<i32> = (0..ROWS).collect();
    let names: Vec<String> = ids.iter().map(|v| format!("name {}", v)).collect();
    let mut statement = session
        .prepare("insert into sluice_bulk (id, name) values (:id, :name)")
        .expect("Failed to prepare the bulk insert");
    statement
        .exchange(use_(&ids))
        .and_then(|s| s.exchange(use_(&names)))
        .expect("Failed to bind the bulk insert");
    statement.execute(true).expect("Failed to run the bulk insert");
    assert_eq!(
        statement.affected_rows().expect("Affected rows not available"),
        ROWS as u64
    );
}

fn teardown(session: &mut Session) {
    session
        .once("drop table sluice_bulk")
        .run()
        .expect("Failed to drop the sluice_bulk table");
}

pub fn bulk_insert(session: &mut Session) {
    setup(session);
    let mut count = 0i32;
    let mut sum = 0i64;
    session
        .once("select count(*), sum(id) from sluice_bulk")
        .exchange(into(&mut count))
        .exchange(into(&mut sum))
        .run()
        .expect("Failed to count the inserted rows");
    assert_eq!(count, ROWS);
    assert_eq!(sum, 45);

    // A window of the use vectors
    let ids = vec![100i32, 101, 102, 103];
    let names = vec![String::from("skip"), "a".into(), "b".into(), "skip".into()];
    session
        .once("insert into sluice_bulk (id, name) values (:id, :name)")
        .exchange(use_(&ids).range(1..3))
        .exchange(use_(&names).range(1..3))
        .run()
        .expect("Failed to insert a window of the vectors");
    let mut inserted = vec![String::new(); 5];
    session
        .once("select name from sluice_bulk where id >= 100 order by id")
        .exchange(into(&mut inserted))
        .run()
        .expect("Failed to select the window rows");
    assert_eq!(inserted, ["a", "b"]);
    teardown(session);
}

pub fn bulk_fetch(session: &mut Session) {
    setup(session);
    let ids = RefCell::new(vec![0i32; BATCH]);
    let mut statement = session
        .prepare("select id from sluice_bulk order by id")
        .expect("Failed to prepare the bulk select");
    statement
        .exchange(into(&ids))
        .expect("Failed to bind the bulk select");
    assert!(statement.execute(true).expect("Failed to execute"));
    assert_eq!(*ids.borrow(), [0, 1, 2, 3]);
    assert!(statement.fetch().expect("Failed to fetch the second batch"));
    assert_eq!(*ids.borrow(), [4, 5, 6, 7]);
    // Fewer rows than the vector size remain: they are still delivered
    assert!(statement.fetch().expect("Failed to fetch the last batch"));
    assert_eq!(*ids.borrow(), [8, 9]);
    assert!(!statement.fetch().expect("Failed to fetch past the end"));
    assert!(ids.borrow().is_empty());
    assert!(!statement.fetch().expect("Failed to fetch after the end"));
    assert!(ids.borrow().is_empty());

    // Executing again restarts the rowset with the initial vector size
    ids.borrow_mut().resize(BATCH, 0);
    assert!(statement.execute(true).expect("Failed to execute again"));
    assert_eq!(*ids.borrow(), [0, 1, 2, 3]);

    // The caller can shrink the vector between fetches but not grow it
    ids.borrow_mut().truncate(2);
    assert!(statement.fetch().expect("Failed to fetch a smaller batch"));
    assert_eq!(*ids.borrow(), [4, 5]);
    ids.borrow_mut().resize(BATCH + 1, 0);
    silent_logs! {
        let error = statement
            .fetch()
            .expect_err("Growing the vector must fail");
        assert!(
            format!("{:#}", error)
                .contains("Increasing the size of the output vector is not supported."),
            "Unexpected error: {:#}",
            error
        );
    }
    drop(statement);

    // An exact multiple of the batch size ends with an empty fetch
    session
        .once("delete from sluice_bulk where id >= 8")
        .run()
        .expect("Failed to delete the last rows");
    let ids = RefCell::new(vec![0i32; BATCH]);
    let mut statement = session
        .prepare("select id from sluice_bulk order by id")
        .expect("Failed to prepare the bulk select");
    statement
        .exchange(into(&ids))
        .expect("Failed to bind the bulk select");
    assert!(statement.execute(true).expect("Failed to execute"));
    assert!(statement.fetch().expect("Failed to fetch the second batch"));
    assert_eq!(*ids.borrow(), [4, 5, 6, 7]);
    assert!(!statement.fetch().expect("Failed to fetch past the end"));
    assert!(ids.borrow().is_empty());
    drop(statement);
    teardown(session);
}

pub fn bulk_errors(session: &mut Session) {
    setup(session);
    let ids = vec![1i32, 2, 3];
    let mut name = String::new();
    silent_logs! {
        let error = session
            .once("select name from sluice_bulk where id = :id")
            .exchange(into(&mut name))
            .exchange(use_(&ids))
            .run()
            .expect_err("Bulk use with a scalar into must fail");
        assert!(
            format!("{:#}", error).contains("Bulk use with single into elements is not supported."),
            "Unexpected error: {:#}",
            error
        );
    }

    let mut names = vec![String::new(); 3];
    silent_logs! {
        let error = session
            .once("select name from sluice_bulk where id = :id")
            .exchange(into(&mut names))
            .exchange(use_(&ids))
            .run()
            .expect_err("Bulk use with bulk into must fail");
        assert!(
            format!("{:#}", error)
                .contains("Bulk insert/update and bulk select not allowed in same query"),
            "Unexpected error: {:#}",
            error
        );
    }

    let mut empty: Vec<i32> = Vec::new();
    silent_logs! {
        let error = session
            .once("select id from sluice_bulk")
            .exchange(into(&mut empty))
            .run()
            .expect_err("Empty into vectors must fail");
        assert!(
            format!("{:#}", error).contains("Vectors of size 0 are not allowed."),
            "Unexpected error: {:#}",
            error
        );
    }

    let short = vec![String::from("only one")];
    silent_logs! {
        let error = session
            .once("insert into sluice_bulk (id, name) values (:id, :name)")
            .exchange(use_(&ids))
            .exchange(use_(&short))
            .run()
            .expect_err("Use vectors of different sizes must fail");
        assert!(
            format!("{:#}", error).contains("Bind variable size mismatch"),
            "Unexpected error: {:#}",
            error
        );
    }
    teardown(session);
}
