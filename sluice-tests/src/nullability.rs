use crate::silent_logs;
use sluice::{Indicator, Session, into, use_};

pub fn nullability(session: &mut Session) {
    // Null use, indicator on the into side
    let value = 5i32;
    let null = Indicator::Null;
    let mut result = 11i32;
    let mut indicator = Indicator::Ok;
    let got_data = session
        .once("select :value as value")
        .exchange(into(&mut result).indicator(&mut indicator))
        .exchange(use_(&value).indicator(&null))
        .run()
        .expect("Could not select a null value");
    assert!(got_data);
    assert_eq!(indicator, Indicator::Null);
    assert_eq!(result, 11, "A null must leave the into value untouched");

    // Null use, no indicator on the into side
    silent_logs! {
        let error = session
            .once("select :value as value")
            .exchange(into(&mut result))
            .exchange(use_(&value).indicator(&null))
            .run()
            .expect_err("A null without indicator must fail");
        assert!(
            format!("{:#}", error).contains("Null value fetched and no indicator defined."),
            "Unexpected error: {:#}",
            error
        );
    }

    // Option is the built in user type mapping null to None
    let mut maybe: Option<i32> = Some(1);
    let nothing: Option<i32> = None;
    session
        .once("select :value as value")
        .exchange(into(&mut maybe))
        .exchange(use_(&nothing))
        .run()
        .expect("Could not select a null Option");
    assert_eq!(maybe, None);
    let something = Some(String::from("present"));
    let mut text: Option<String> = None;
    session
        .once("select :value as value")
        .exchange(into(&mut text))
        .exchange(use_(&something))
        .run()
        .expect("Could not select an Option");
    assert_eq!(text.as_deref(), Some("present"));

    // Vectors carry one indicator per row
    session
        .once("drop table if exists sluice_nullability")
        .run()
        .expect("Failed to drop the sluice_nullability table");
    session
        .once("create table sluice_nullability (id integer, name varchar(20))")
        .run()
        .expect("Failed to create the sluice_nullability table");
    let ids = vec![1i32, 2, 3];
    let names = vec![String::from("a"), String::from("ignored"), String::from("c")];
    let name_indicators = vec![Indicator::Ok, Indicator::Null, Indicator::Ok];
    session
        .once("insert into sluice_nullability (id, name) values (:id, :name)")
        .exchange(use_(&ids))
        .exchange(use_(&names).indicator(&name_indicators))
        .run()
        .expect("Failed to insert rows with nulls");

    let mut fetched = vec![String::new(); 3];
    let mut indicators = vec![Indicator::Ok; 3];
    let got_data = session
        .once("select name from sluice_nullability order by id")
        .exchange(into(&mut fetched).indicator(&mut indicators))
        .run()
        .expect("Failed to select rows with nulls");
    assert!(got_data);
    assert_eq!(indicators, [Indicator::Ok, Indicator::Null, Indicator::Ok]);
    assert_eq!(fetched[0], "a");
    assert_eq!(fetched[2], "c");

    let mut fetched = vec![String::new(); 3];
    silent_logs! {
        session
            .once("select name from sluice_nullability order by id")
            .exchange(into(&mut fetched))
            .run()
            .expect_err("A null row without indicators must fail");
    }

    let mut count = 0i32;
    session
        .once("select count(*) from sluice_nullability where name is null")
        .exchange(into(&mut count))
        .run()
        .expect("Failed to count the null names");
    assert_eq!(count, 1);

    session
        .once("drop table sluice_nullability")
        .run()
        .expect("Failed to drop the sluice_nullability table");
}
