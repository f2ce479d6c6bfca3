#[cfg(test)]
mod tests {
    use sluice::{
        ColumnProperties, ConnectionParameters, DataType, Indicator, Row, Session, Value, into,
        use_,
    };
    use sluice_empty::EmptyBackendFactory;
    use sluice_tests::{init_logs, silent_logs};
    use std::cell::RefCell;

    const NUMBERS: &str = "select n from numbers";

    fn numbers(count: i32) -> &'static EmptyBackendFactory {
        EmptyBackendFactory::new()
            .with_result(
                NUMBERS,
                vec![ColumnProperties::new("n", DataType::Integer)],
                (0..count).map(|v| vec![Some(Value::Int32(v))]).collect(),
            )
            .leak()
    }

    fn connect(factory: &'static EmptyBackendFactory) -> Session {
        Session::with_factory(factory, ConnectionParameters::new("empty", ""))
            .expect("Could not open the empty session")
    }

    #[test]
    fn vector_batches() {
        init_logs();
        let mut session = connect(numbers(10));
        let values = RefCell::new(vec![0i32; 4]);
        let mut statement = session.prepare(NUMBERS).expect("Failed to prepare");
        statement.exchange(into(&values)).expect("Failed to bind");
        assert!(statement.execute(true).expect("Failed to execute"));
        assert_eq!(*values.borrow(), [0, 1, 2, 3]);
        assert!(statement.fetch().expect("Failed to fetch"));
        assert_eq!(*values.borrow(), [4, 5, 6, 7]);
        assert!(statement.fetch().expect("Failed to fetch the last batch"));
        assert_eq!(*values.borrow(), [8, 9]);
        assert!(!statement.fetch().expect("Failed to fetch past the end"));
        assert!(values.borrow().is_empty());
        assert!(!statement.fetch().expect("Fetching again stays at the end"));
        assert!(!statement.got_data());
    }

    #[test]
    fn scalar_rows() {
        init_logs();
        let mut session = connect(numbers(3));
        let value = RefCell::new(-1i32);
        let mut statement = session.prepare(NUMBERS).expect("Failed to prepare");
        statement.exchange(into(&value)).expect("Failed to bind");
        let mut seen = Vec::new();
        let mut got_data = statement.execute(true).expect("Failed to execute");
        while got_data {
            seen.push(*value.borrow());
            got_data = statement.fetch().expect("Failed to fetch");
        }
        assert_eq!(seen, [0, 1, 2]);
        assert_eq!(*value.borrow(), 2);
    }

    #[test]
    fn execute_without_exchange() {
        init_logs();
        let mut session = connect(numbers(3));
        let values = RefCell::new(vec![0i32; 2]);
        let mut statement = session.prepare(NUMBERS).expect("Failed to prepare");
        statement.exchange(into(&values)).expect("Failed to bind");
        assert!(!statement.execute(false).expect("Failed to execute"));
        assert!(statement.fetch().expect("Failed to fetch"));
        assert_eq!(*values.borrow(), [0, 1]);
        assert!(statement.fetch().expect("Failed to fetch"));
        assert_eq!(*values.borrow(), [2]);
        assert!(!statement.fetch().expect("Failed to fetch past the end"));
    }

    #[test]
    fn rejected_shapes() {
        init_logs();
        let mut session = connect(numbers(3));
        let ids = vec![1i32, 2];
        let mut single = 0i32;
        let mut many = vec![0i32; 2];
        let mut none: Vec<i32> = Vec::new();
        let other = vec![1i32, 2, 3];
        silent_logs! {
            let error = session
                .once("select n from numbers where id = :id")
                .exchange(into(&mut single))
                .exchange(use_(&ids))
                .run()
                .expect_err("Bulk use with a scalar into");
            assert!(format!("{:#}", error).contains("Bulk use with single into elements is not supported."));
            let error = session
                .once("select n from numbers where id = :id")
                .exchange(into(&mut many))
                .exchange(use_(&ids))
                .run()
                .expect_err("Bulk use with bulk into");
            assert!(format!("{:#}", error).contains("Bulk insert/update and bulk select not allowed in same query"));
            let error = session
                .once(NUMBERS)
                .exchange(into(&mut none))
                .run()
                .expect_err("Empty into vector");
            assert!(format!("{:#}", error).contains("Vectors of size 0 are not allowed."));
            let error = session
                .once("insert into numbers values (:a, :b)")
                .exchange(use_(&ids))
                .exchange(use_(&other))
                .run()
                .expect_err("Use vectors of different sizes");
            assert!(format!("{:#}", error).contains("Bind variable size mismatch"));
            let error = session
                .once("insert into numbers values (:a, :b)")
                .exchange(use_(&single).name("a"))
                .exchange(use_(&single))
                .run()
                .expect_err("Mixed named and positional uses");
            assert!(format!("{:#}", error).contains("either by position or by name"));
        }
    }

    #[test]
    fn fetch_before_execute() {
        init_logs();
        let mut session = connect(numbers(3));
        let mut statement = session.prepare(NUMBERS).expect("Failed to prepare");
        silent_logs! {
            let error = statement.fetch().expect_err("Fetch before execute");
            assert_eq!(error.to_string(), "Statement must be executed before fetching.");
        }
    }

    #[test]
    fn growing_vector() {
        init_logs();
        let mut session = connect(numbers(10));
        let values = RefCell::new(vec![0i32; 2]);
        let mut statement = session.prepare(NUMBERS).expect("Failed to prepare");
        statement.exchange(into(&values)).expect("Failed to bind");
        statement.execute(true).expect("Failed to execute");
        values.borrow_mut().truncate(1);
        assert!(statement.fetch().expect("Failed to fetch"));
        assert_eq!(*values.borrow(), [2]);
        values.borrow_mut().resize(3, 0);
        silent_logs! {
            let error = statement.fetch().expect_err("Growing the vector");
            assert!(format!("{:#}", error).contains("Increasing the size of the output vector is not supported."));
        }
    }

    #[test]
    fn failed_fetch_closes_cursor() {
        init_logs();
        let mut session = connect(numbers(10));
        let values = RefCell::new(vec![0i32; 2]);
        let mut statement = session.prepare(NUMBERS).expect("Failed to prepare");
        statement.exchange(into(&values)).expect("Failed to bind");
        statement.execute(true).expect("Failed to execute");
        values.borrow_mut().resize(4, 0);
        silent_logs! {
            statement.fetch().expect_err("Growing the vector");
            let error = statement.fetch().expect_err("The rowset was dropped");
            assert_eq!(error.to_string(), "Statement must be executed before fetching.");
        }
        assert_eq!(statement.backend().number_of_rows(), 0);
        values.borrow_mut().truncate(3);
        assert!(statement.execute(true).expect("Failed to execute again"));
        assert_eq!(*values.borrow(), [0, 1, 2]);
        assert!(statement.fetch().expect("Failed to fetch"));
        assert_eq!(*values.borrow(), [3, 4, 5]);
    }

    #[test]
    fn nulls() {
        init_logs();
        let factory = EmptyBackendFactory::new()
            .with_result(
                "select nothing",
                vec![ColumnProperties::new("nothing", DataType::Integer)],
                vec![vec![None]],
            )
            .leak();
        let mut session = connect(factory);
        let mut value = 5i32;
        let mut indicator = Indicator::Ok;
        session
            .once("select nothing")
            .exchange(into(&mut value).indicator(&mut indicator))
            .run()
            .expect("Null with an indicator");
        assert_eq!(indicator, Indicator::Null);
        assert_eq!(value, 5);
        let mut optional = Some(1i32);
        session
            .once("select nothing")
            .exchange(into(&mut optional))
            .run()
            .expect("Null into an option");
        assert_eq!(optional, None);
        silent_logs! {
            let error = session
                .once("select nothing")
                .exchange(into(&mut value))
                .run()
                .expect_err("Null without an indicator");
            assert!(format!("{:#}", error).contains("Null value fetched and no indicator defined."));
        }

        // A null use value travels to the backend as NULL
        let mut echoed = 0i32;
        let mut echoed_indicator = Indicator::Ok;
        let null = Indicator::Null;
        session
            .once("select :v")
            .exchange(into(&mut echoed).indicator(&mut echoed_indicator))
            .exchange(use_(&7i32).indicator(&null))
            .run()
            .expect("Echo of a null use");
        assert_eq!(echoed_indicator, Indicator::Null);
        assert_eq!(
            factory.journal().last().map(|v| v.parameters.clone()),
            Some(vec![None])
        );
    }

    #[test]
    fn dynamic_row() {
        init_logs();
        let factory = EmptyBackendFactory::new()
            .with_result(
                "select * from people",
                vec![
                    ColumnProperties::new("id", DataType::LongLong),
                    ColumnProperties::new("name", DataType::String),
                ],
                vec![
                    vec![Some(Value::Int64(1)), Some(Value::String("Grace".into()))],
                    vec![Some(Value::Int64(2)), None],
                ],
            )
            .leak();
        let mut session = connect(factory);
        let row = RefCell::new(Row::new());
        let mut statement = session
            .prepare("select * from people")
            .expect("Failed to prepare");
        statement.exchange(&row).expect("Failed to bind");
        assert!(statement.execute(true).expect("Failed to execute"));
        assert_eq!(row.borrow().get::<i64>("id").expect("id"), 1);
        assert_eq!(row.borrow().get::<String>(1usize).expect("name"), "Grace");
        assert!(statement.fetch().expect("Failed to fetch"));
        assert_eq!(row.borrow().indicator("name").expect("name"), Indicator::Null);
        assert!(!statement.fetch().expect("Failed to fetch past the end"));

        let mut other = 0i32;
        silent_logs! {
            let mut row = Row::new();
            session
                .once("select * from people")
                .exchange(&mut row)
                .exchange(into(&mut other))
                .run()
                .expect_err("A dynamic row must be alone");
        }
    }

    #[test]
    fn re_execution() {
        init_logs();
        let factory = EmptyBackendFactory::new().leak();
        let mut session = connect(factory);
        let id = RefCell::new(0i32);
        let mut statement = session
            .prepare("delete from t where id = :id")
            .expect("Failed to prepare");
        statement
            .exchange(sluice::use_cell(&id))
            .expect("Failed to bind");
        for i in 1..=3 {
            *id.borrow_mut() = i;
            statement.execute(true).expect("Failed to execute");
        }
        drop(statement);
        assert_eq!(
            factory
                .journal()
                .into_iter()
                .flat_map(|v| v.parameters)
                .collect::<Vec<_>>(),
            [
                Some(Value::Int32(1)),
                Some(Value::Int32(2)),
                Some(Value::Int32(3))
            ]
        );
    }
}
