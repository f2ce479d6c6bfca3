use crate::silent_logs;
use sluice::{Session, into};

fn count(session: &mut Session) -> i32 {
    let mut result = 0i32;
    session
        .once("select count(*) from sluice_transaction")
        .exchange(into(&mut result))
        .run()
        .expect("Failed to count the rows of sluice_transaction");
    result
}

pub fn transaction(session: &mut Session) {
    session
        .once("drop table if exists sluice_transaction")
        .run()
        .expect("Failed to drop the sluice_transaction table");
    session
        .once("create table sluice_transaction (id integer)")
        .run()
        .expect("Failed to create the sluice_transaction table");

    let mut transaction = session
        .transaction()
        .expect("Could not begin a transaction");
    transaction
        .once("insert into sluice_transaction values (1)")
        .run()
        .expect("Failed to insert in the transaction");
    transaction
        .commit()
        .expect("Failed to commit the transaction");
    assert_eq!(count(session), 1);

    let mut transaction = session
        .transaction()
        .expect("Could not begin a transaction");
    transaction
        .once("insert into sluice_transaction values (2)")
        .run()
        .expect("Failed to insert in the transaction");
    assert_eq!(count(&mut transaction), 2);
    transaction
        .rollback()
        .expect("Failed to roll back the transaction");
    assert_eq!(count(session), 1);

    {
        let mut transaction = session
            .transaction()
            .expect("Could not begin a transaction");
        assert!(transaction.is_active());
        transaction
            .once("insert into sluice_transaction values (3)")
            .run()
            .expect("Failed to insert in the transaction");
        // Dropped without commit
    }
    assert_eq!(count(session), 1);

    // Explicit calls on the session
    session.begin().expect("Could not begin");
    session
        .once("insert into sluice_transaction values (4)")
        .run()
        .expect("Failed to insert");
    silent_logs! {
        session
            .begin()
            .expect_err("Nested transactions must fail");
    }
    session.commit().expect("Could not commit");
    assert_eq!(count(session), 2);

    session
        .once("drop table sluice_transaction")
        .run()
        .expect("Failed to drop the sluice_transaction table");
}
