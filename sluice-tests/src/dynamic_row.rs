use indoc::indoc;
use sluice::{DataType, Indicator, Row, Session, use_};
use std::cell::RefCell;
use time::macros::datetime;

pub fn dynamic_row(session: &mut Session) {
    session
        .once("drop table if exists sluice_row")
        .run()
        .expect("Failed to drop the sluice_row table");
    session
        .once(indoc! {"
            create table sluice_row (
                id integer,
                name varchar(20),
                height double,
                born datetime
            )
        "})
        .run()
        .expect("Failed to create the sluice_row table");
    session
        .once(indoc! {"
            insert into sluice_row values
                (1, 'Ada', 1.65, '1815-12-10 12:00:00'),
                (2, 'Alan', 1.78, '1912-06-23 04:15:00'),
                (3, 'Edsger', 1.80, '1930-05-11 09:00:00')
        "})
        .run()
        .expect("Failed to insert in the sluice_row table");

    let mut row = Row::new();
    let id = 1i32;
    let got_data = session
        .once("select id, name, height, born, null as vacant from sluice_row where id = :id")
        .exchange(&mut row)
        .exchange(use_(&id))
        .run()
        .expect("Failed to select a dynamic row");
    assert!(got_data);
    assert_eq!(row.size(), 5);
    assert_eq!(
        row.columns()
            .iter()
            .map(|v| v.data_type)
            .collect::<Vec<_>>(),
        [
            DataType::Integer,
            DataType::String,
            DataType::Double,
            DataType::Date,
            DataType::String
        ]
    );
    assert_eq!(row.get::<i32>(0usize).expect("id"), 1);
    assert_eq!(row.get::<i64>("id").expect("id as i64"), 1);
    assert_eq!(row.get::<String>("name").expect("name"), "Ada");
    assert_eq!(row.get::<f64>("height").expect("height"), 1.65);
    assert_eq!(
        row.get::<time::PrimitiveDateTime>("born").expect("born"),
        datetime!(1815-12-10 12:00:00)
    );
    assert_eq!(row.indicator("vacant").expect("vacant"), Indicator::Null);
    assert_eq!(row.get::<Option<i32>>("vacant").expect("vacant"), None);
    assert!(row.get::<i32>("vacant").is_err());
    assert!(row.get::<i32>("missing").is_err());
    assert_eq!(row.properties(1usize).expect("name").name, "name");

    // Walking a result row by row
    let row = RefCell::new(Row::new());
    let mut statement = session
        .prepare("select name from sluice_row order by id")
        .expect("Failed to prepare the select");
    statement
        .exchange(&row)
        .expect("Failed to bind the dynamic row");
    let mut names = Vec::new();
    let mut got_data = statement.execute(true).expect("Failed to execute");
    while got_data {
        names.push(row.borrow().get::<String>(0usize).expect("name"));
        got_data = statement.fetch().expect("Failed to fetch");
    }
    assert_eq!(names, ["Ada", "Alan", "Edsger"]);
    drop(statement);

    // Describing without fetching
    let mut statement = session
        .prepare("select id, name from sluice_row")
        .expect("Failed to prepare the select");
    let columns = statement.describe().expect("Failed to describe");
    assert_eq!(columns.len(), 2);
    assert_eq!(columns[0].name, "id");
    assert_eq!(columns[1].data_type, DataType::String);
    drop(statement);

    // Upper case column names
    session.set_uppercase_column_names(true);
    let mut row = Row::new();
    session
        .once("select name from sluice_row where id = 2")
        .exchange(&mut row)
        .run()
        .expect("Failed to select with upper case names");
    session.set_uppercase_column_names(false);
    assert_eq!(row.find("NAME"), Some(0));
    assert_eq!(row.get::<String>("NAME").expect("NAME"), "Alan");

    session
        .once("drop table sluice_row")
        .run()
        .expect("Failed to drop the sluice_row table");
}
