use indoc::indoc;
use sluice::{
    Bindable, Indicator, LongString, Primitive, Session, WideString, XmlType, into, use_,
};
use std::fmt::Debug;
use time::macros::datetime;

fn round_trip<T>(session: &mut Session, value: &T) -> T
where
    T: Primitive + Bindable<Indicator = Indicator> + PartialEq + Debug,
{
    let mut result = T::empty();
    let mut indicator = Indicator::Null;
    let got_data = session
        .once("select :value as value")
        .exchange(into(&mut result).indicator(&mut indicator))
        .exchange(use_(value))
        .run()
        .expect("Could not select the bound value back");
    assert!(got_data);
    assert_eq!(indicator, Indicator::Ok);
    result
}

pub fn simple(session: &mut Session) {
    // Round trip of every tag through a trivial select
    assert_eq!(round_trip(session, &'z'), 'z');
    assert_eq!(
        round_trip(session, &String::from("simple text")),
        "simple text"
    );
    assert_eq!(
        round_trip(session, &WideString::from("wide ✓")),
        WideString::from("wide ✓")
    );
    assert_eq!(round_trip(session, &-128i8), -128);
    assert_eq!(round_trip(session, &200u8), 200);
    assert_eq!(round_trip(session, &-32_768i16), -32_768);
    assert_eq!(round_trip(session, &65_535u16), 65_535);
    assert_eq!(round_trip(session, &-2_147_483_648i32), -2_147_483_648);
    assert_eq!(round_trip(session, &4_294_967_295u32), 4_294_967_295);
    assert_eq!(round_trip(session, &i64::MIN), i64::MIN);
    assert_eq!(round_trip(session, &(1u64 << 40)), 1u64 << 40);
    assert_eq!(round_trip(session, &u64::MAX), u64::MAX);
    assert_eq!(round_trip(session, &3.25f64), 3.25);
    assert_eq!(round_trip(session, &-0.1f64), -0.1);
    assert_eq!(
        round_trip(session, &datetime!(2024-02-29 13:45:10)),
        datetime!(2024-02-29 13:45:10)
    );
    assert_eq!(
        round_trip(session, &LongString::from("x".repeat(10_000))),
        LongString::from("x".repeat(10_000))
    );
    assert_eq!(
        round_trip(session, &XmlType::from("<a><b/></a>")),
        XmlType::from("<a><b/></a>")
    );

    // Table round trip
    session
        .once("drop table if exists sluice_simple")
        .run()
        .expect("Failed to drop the sluice_simple table");
    session
        .once(indoc! {"
            create table sluice_simple (
                id integer,
                name varchar(40),
                height double precision,
                born timestamp
            )
        "})
        .run()
        .expect("Failed to create the sluice_simple table");
    let id = 7i32;
    let name = String::from("Grace");
    let height = 1.52f64;
    let born = datetime!(1906-12-09 08:30:00);
    session
        .once("insert into sluice_simple (id, name, height, born) values (:id, :name, :height, :born)")
        .exchange(use_(&id))
        .exchange(use_(&name))
        .exchange(use_(&height))
        .exchange(use_(&born))
        .run()
        .expect("Failed to insert a row in sluice_simple");

    let (mut out_name, mut out_height, mut out_born) =
        (String::new(), 0.0f64, datetime!(2000-01-01 00:00:00));
    let got_data = session
        .once("select name, height, born from sluice_simple where id = :id")
        .exchange(into(&mut out_name))
        .exchange(into(&mut out_height))
        .exchange(into(&mut out_born))
        .exchange(use_(&id))
        .run()
        .expect("Failed to select the row from sluice_simple");
    assert!(got_data);
    assert_eq!(out_name, "Grace");
    assert_eq!(out_height, 1.52);
    assert_eq!(out_born, born);

    // No row
    let mut missing = String::from("untouched");
    let got_data = session
        .once("select name from sluice_simple where id = 999")
        .exchange(into(&mut missing))
        .run()
        .expect("A select without rows is not an error");
    assert!(!got_data);
    assert_eq!(missing, "untouched");

    // Affected rows
    let mut statement = session
        .prepare("update sluice_simple set height = height + 0.01 where id = :id")
        .expect("Failed to prepare the update");
    statement
        .exchange(use_(&id))
        .expect("Failed to bind the update parameter");
    statement.execute(true).expect("Failed to run the update");
    assert_eq!(
        statement.affected_rows().expect("Affected rows not available"),
        1
    );
    drop(statement);
    assert_eq!(
        session.last_query(),
        "update sluice_simple set height = height + 0.01 where id = :id"
    );

    session
        .once("drop table sluice_simple")
        .run()
        .expect("Failed to drop the sluice_simple table");
}
