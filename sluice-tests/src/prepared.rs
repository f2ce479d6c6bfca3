use crate::silent_logs;
use sluice::{Session, StatementType, into, use_cell};
use std::cell::RefCell;

pub fn prepared(session: &mut Session) {
    session
        .once("drop table if exists sluice_prepared")
        .run()
        .expect("Failed to drop the sluice_prepared table");
    session
        .once("create table sluice_prepared (id integer, name varchar(20))")
        .run()
        .expect("Failed to create the sluice_prepared table");

    // One preparation, many executions with values changed in between
    let id = RefCell::new(0i32);
    let name = RefCell::new(String::new());
    let mut insert = session
        .prepare("insert into sluice_prepared (id, name) values (:id, :name)")
        .expect("Failed to prepare the insert");
    insert
        .exchange(use_cell(&id).name("id"))
        .and_then(|s| s.exchange(use_cell(&name).name("name")))
        .expect("Failed to bind the insert");
    for i in 0..5 {
        *id.borrow_mut() = i;
        *name.borrow_mut() = format!("row {}", i);
        insert.execute(true).expect("Failed to insert a row");
        assert_eq!(insert.affected_rows().expect("Affected rows"), 1);
    }
    drop(insert);

    let fetched = RefCell::new(String::new());
    let mut select = session
        .prepare("select name from sluice_prepared where id = :id")
        .expect("Failed to prepare the select");
    select
        .exchange(into(&fetched))
        .and_then(|s| s.exchange(use_cell(&id)))
        .expect("Failed to bind the select");
    for i in (0..5).rev() {
        *id.borrow_mut() = i;
        assert!(select.execute(true).expect("Failed to execute the select"));
        assert_eq!(*fetched.borrow(), format!("row {}", i));
    }
    *id.borrow_mut() = 99;
    assert!(!select.execute(true).expect("Failed to execute the select"));
    assert!(!select.got_data());

    // Preparing again keeps the bindings
    select
        .prepare(
            "select name from sluice_prepared where id = :id + 1",
            StatementType::RepeatableQuery,
        )
        .expect("Failed to prepare the select again");
    *id.borrow_mut() = 0;
    assert!(select.execute(true).expect("Failed to execute the new query"));
    assert_eq!(*fetched.borrow(), "row 1");
    drop(select);

    // Execute without data exchange, then fetch row by row
    let current = RefCell::new(0i32);
    let mut cursor = session
        .prepare("select id from sluice_prepared order by id")
        .expect("Failed to prepare the cursor");
    cursor
        .exchange(into(&current))
        .expect("Failed to bind the cursor");
    silent_logs! {
        cursor
            .fetch()
            .expect_err("Fetching before executing must fail");
    }
    assert!(!cursor.execute(false).expect("Failed to execute the cursor"));
    let mut seen = Vec::new();
    while cursor.fetch().expect("Failed to fetch a row") {
        seen.push(*current.borrow());
    }
    assert_eq!(seen, [0, 1, 2, 3, 4]);
    drop(cursor);

    session
        .once("drop table sluice_prepared")
        .run()
        .expect("Failed to drop the sluice_prepared table");
}
