use crate::silent_logs;
use indoc::indoc;
use sluice::{Session, into, use_};

pub fn named(session: &mut Session) {
    session
        .once("drop table if exists sluice_named")
        .run()
        .expect("Failed to drop the sluice_named table");
    session
        .once("create table sluice_named (code varchar(10), amount integer)")
        .run()
        .expect("Failed to create the sluice_named table");

    // Bound in a different order than they appear
    let amount = 30i32;
    let code = String::from("X1");
    session
        .once("insert into sluice_named (code, amount) values (:code, :amount)")
        .exchange(use_(&amount).name("amount"))
        .exchange(use_(&code).name("code"))
        .run()
        .expect("Failed to insert with named parameters");
    let mut fetched = 0i32;
    session
        .once("select amount from sluice_named where code = :code")
        .exchange(into(&mut fetched))
        .exchange(use_(&code).name("code"))
        .run()
        .expect("Failed to select with a named parameter");
    assert_eq!(fetched, 30);

    // Repeated name, one binding
    let mut doubled = 0i32;
    session
        .once("select :v + :v as doubled")
        .exchange(into(&mut doubled))
        .exchange(use_(&21i32).name("v"))
        .run()
        .expect("Failed to use a repeated name");
    assert_eq!(doubled, 42);

    // Quoted text is not a placeholder
    let (mut literal, mut bound) = (String::new(), String::new());
    session
        .once(indoc! {"
            select 'x:y' as literal,
                   :value as bound
        "})
        .exchange(into(&mut literal))
        .exchange(into(&mut bound))
        .exchange(use_(&String::from("real")).name("value"))
        .run()
        .expect("Failed to select a quoted colon");
    assert_eq!(literal, "x:y");
    assert_eq!(bound, "real");

    // Named and positional cannot be mixed
    silent_logs! {
        let error = session
            .once("select amount from sluice_named where code = :code and amount = :amount")
            .exchange(into(&mut fetched))
            .exchange(use_(&code).name("code"))
            .exchange(use_(&amount))
            .run()
            .expect_err("Mixed binding must fail");
        assert!(
            format!("{:#}", error)
                .contains("Binding for use elements must be either by position or by name."),
            "Unexpected error: {:#}",
            error
        );
    }

    // Every name of the query must be bound
    silent_logs! {
        let error = session
            .once("select amount from sluice_named where code = :code and amount = :amount")
            .exchange(into(&mut fetched))
            .exchange(use_(&code).name("code"))
            .run()
            .expect_err("A missing name must fail");
        assert!(
            format!("{:#}", error).contains("Missing use element for bind by name (amount)."),
            "Unexpected error: {:#}",
            error
        );
    }

    // Names that are not in the query
    silent_logs! {
        let error = session
            .once("select amount from sluice_named where code = :code")
            .exchange(into(&mut fetched))
            .exchange(use_(&code).name("other"))
            .run()
            .expect_err("An unknown name must fail");
        assert!(
            format!("{:#}", error).contains("Cannot bind to (by name) other"),
            "Unexpected error: {:#}",
            error
        );
    }

    session
        .once("drop table sluice_named")
        .run()
        .expect("Failed to drop the sluice_named table");
}
