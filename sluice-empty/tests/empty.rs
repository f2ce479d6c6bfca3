#[cfg(test)]
mod tests {
    use sluice_core::{
        BackendRegistry, ColumnProperties, ConnectionParameters, DataType, ExecFetchResult,
        Indicator, Session, Value, into, use_,
    };
    use sluice_empty::{EmptyBackendFactory, Execution, register_factory_empty};
    use sluice_tests::{init_logs, silent_logs};

    fn session(factory: &'static EmptyBackendFactory) -> Session {
        Session::with_factory(factory, ConnectionParameters::new("empty", ""))
            .expect("Could not open the empty session")
    }

    fn numbers(count: i32) -> Vec<Vec<Option<Value>>> {
        (0..count).map(|v| vec![Some(Value::Int32(v))]).collect()
    }

    #[test]
    fn echo() {
        init_logs();
        let factory = EmptyBackendFactory::new().leak();
        let mut session = session(factory);
        let (mut a, mut b) = (0i32, String::new());
        let got_data = session
            .once("select :a, :b")
            .exchange(into(&mut a))
            .exchange(into(&mut b))
            .exchange(use_(&7i32))
            .exchange(use_(&String::from("seven")))
            .run()
            .expect("Failed to run the echo select");
        assert!(got_data);
        assert_eq!(a, 7);
        assert_eq!(b, "seven");
        assert_eq!(
            factory.journal(),
            [Execution {
                query: "select $1, $2".into(),
                parameters: vec![
                    Some(Value::Int32(7)),
                    Some(Value::String("seven".into()))
                ],
            }]
        );
    }

    #[test]
    fn scripted_fetch() {
        init_logs();
        let factory = EmptyBackendFactory::new()
            .with_result(
                "select n from numbers",
                vec![ColumnProperties::new("n", DataType::Integer)],
                numbers(5),
            )
            .leak();
        let mut session = session(factory);
        let mut values = vec![0i32; 2];
        let mut statement = session
            .prepare("select n from numbers")
            .expect("Failed to prepare");
        statement
            .exchange(into(&mut values))
            .expect("Failed to bind the vector");
        assert!(statement.execute(true).expect("Failed to execute"));
        assert!(statement.fetch().expect("Failed to fetch"));
        assert!(statement.fetch().expect("Failed to fetch the last row"));
        assert!(!statement.fetch().expect("Failed to fetch past the end"));
        drop(statement);
        assert!(values.is_empty());
    }

    #[test]
    fn out_values() {
        init_logs();
        let factory = EmptyBackendFactory::new()
            .with_out_value("call double_it(:x)", 1usize, Some(Value::Int32(8)))
            .with_out_value("call erase(:x)", 1usize, None)
            .leak();
        let mut session = session(factory);

        let mut x = 4i32;
        let mut procedure = session
            .procedure("double_it(:x)")
            .expect("Failed to prepare the procedure");
        procedure
            .exchange(use_(&mut x))
            .expect("Failed to bind");
        procedure.execute(true).expect("Failed to call");
        drop(procedure);
        assert_eq!(x, 8);

        let constant = 4i32;
        silent_logs! {
            let mut procedure = session
                .procedure("double_it(:x)")
                .expect("Failed to prepare the procedure");
            procedure
                .exchange(use_(&constant))
                .expect("Failed to bind");
            let error = procedure
                .execute(true)
                .expect_err("A read only use element must not be modified");
            assert!(format!("{:#}", error).contains("Attempted modification of const use element"));
        }

        let mut indicator = Indicator::Ok;
        let mut procedure = session
            .procedure("erase(:x)")
            .expect("Failed to prepare the procedure");
        procedure
            .exchange(use_(&mut x).indicator(&mut indicator))
            .expect("Failed to bind");
        procedure.execute(true).expect("Failed to call");
        drop(procedure);
        assert_eq!(indicator, Indicator::Null);
        assert_eq!(
            factory
                .journal()
                .iter()
                .map(|v| v.query.as_str())
                .collect::<Vec<_>>(),
            ["call double_it($1)", "call double_it($1)", "call erase($1)"]
        );
    }

    #[test]
    fn missing_parameters() {
        init_logs();
        let factory = EmptyBackendFactory::new().leak();
        let mut session = session(factory);
        let value = 1i32;
        silent_logs! {
            session
                .once("insert into t values (:a, :b)")
                .exchange(use_(&value).name("a"))
                .run()
                .expect_err("A named parameter without a use element must fail");
            session
                .once("insert into t values (:a, :b)")
                .exchange(use_(&value))
                .run()
                .expect_err("A positional parameter without a use element must fail");
        }
        assert!(factory.journal().is_empty());
    }

    #[test]
    fn bulk_journal() {
        init_logs();
        let factory = EmptyBackendFactory::new().leak();
        let mut session = session(factory);
        let values = vec![1i64, 2, 3];
        let mut statement = session
            .prepare("insert into t values (:v)")
            .expect("Failed to prepare");
        statement.exchange(use_(&values)).expect("Failed to bind");
        statement.execute(true).expect("Failed to execute");
        assert_eq!(statement.affected_rows().expect("Affected rows"), 3);
        drop(statement);
        assert_eq!(
            factory
                .journal()
                .into_iter()
                .flat_map(|v| v.parameters)
                .collect::<Vec<_>>(),
            [
                Some(Value::Int64(1)),
                Some(Value::Int64(2)),
                Some(Value::Int64(3))
            ]
        );
    }

    #[test]
    fn transaction_rollback_on_drop() {
        init_logs();
        let factory = EmptyBackendFactory::new().leak();
        let mut session = session(factory);
        {
            let mut transaction = session.transaction().expect("Could not begin");
            transaction
                .once("delete from t")
                .run()
                .expect("Failed to delete");
        }
        let transaction = session.transaction().expect("Could not begin");
        transaction.commit().expect("Could not commit");
        assert_eq!(
            factory
                .journal()
                .iter()
                .map(|v| v.query.as_str())
                .collect::<Vec<_>>(),
            ["begin", "delete from t", "rollback", "begin", "commit"]
        );
    }

    #[test]
    fn registry() {
        init_logs();
        let registry = BackendRegistry::new();
        register_factory_empty(&registry).expect("Could not register the empty backend");
        let session = Session::connect_with(&registry, "empty://user=me")
            .expect("Could not connect through the registry");
        assert_eq!(session.backend_name().expect("Connected"), "empty");
        silent_logs! {
            Session::connect_with(&registry, "empty://user")
                .expect_err("A malformed connect string must fail");
        }
    }

    #[test]
    fn fetch_windows() {
        init_logs();
        use ExecFetchResult::{NoData, Success};
        let cases: [(i32, &[(ExecFetchResult, usize)]); 3] = [
            (5, &[(Success, 2), (Success, 2), (NoData, 1), (NoData, 0)]),
            (4, &[(Success, 2), (Success, 2), (NoData, 0)]),
            (1, &[(NoData, 1), (NoData, 0)]),
        ];
        for (count, windows) in cases {
            let factory = EmptyBackendFactory::new()
                .with_result(
                    "select n from numbers",
                    vec![ColumnProperties::new("n", DataType::Integer)],
                    numbers(count),
                )
                .leak();
            let mut session = session(factory);
            let mut statement = session
                .prepare("select n from numbers")
                .expect("Failed to prepare");
            statement.execute(false).expect("Failed to execute");
            let backend = statement.backend_mut();
            for (i, (result, rows)) in windows.iter().enumerate() {
                assert_eq!(
                    backend.fetch(2).expect("Failed to fetch"),
                    *result,
                    "window {} of {} rows",
                    i,
                    count
                );
                assert_eq!(backend.number_of_rows(), *rows, "window {} of {} rows", i, count);
            }
        }
    }
}
