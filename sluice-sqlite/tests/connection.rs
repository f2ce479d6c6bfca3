#[cfg(test)]
mod tests {
    use indoc::indoc;
    use sluice::{
        BackendRegistry, ConnectionParameters, ExecFetchResult, NativeError, Row, Session, into,
        use_,
    };
    use sluice_sqlite::{SQLITE_FACTORY, SqliteStatement, register_factory_sqlite};
    use sluice_tests::{init_logs, silent_logs};
    use std::{
        fs,
        path::Path,
        sync::Mutex,
        time::{Duration, Instant},
    };

    static MUTEX: Mutex<()> = Mutex::new(());

    fn memory() -> Session {
        Session::with_factory(
            &SQLITE_FACTORY,
            ConnectionParameters::new("sqlite", "db=:memory:"),
        )
        .expect("Could not open the in memory database")
    }

    #[test]
    fn create_database() {
        init_logs();
        const DB_PATH: &'static str = "../target/debug/creation.sqlite";
        let _guard = MUTEX.lock().unwrap();
        if Path::new(DB_PATH).exists() {
            fs::remove_file(DB_PATH)
                .expect(format!("Failed to remove test database file {}", DB_PATH).as_str());
        }
        silent_logs! {
            assert!(
                Session::with_factory(
                    &SQLITE_FACTORY,
                    ConnectionParameters::new("sqlite", format!("db={} nocreate=1", DB_PATH)),
                )
                .is_err(),
                "Should not be able to open an unexisting database with nocreate"
            );
        }
        Session::with_factory(&SQLITE_FACTORY, ConnectionParameters::new("sqlite", DB_PATH))
            .expect("Could not create the database");
        assert!(
            Path::new(DB_PATH).exists(),
            "Database file should be created after connection"
        );
        let mut session = Session::with_factory(
            &SQLITE_FACTORY,
            ConnectionParameters::new("sqlite", format!("db={} readonly=true", DB_PATH)),
        )
        .expect("Could not open the database read only");
        silent_logs! {
            session
                .once("create table sluice_readonly (id integer)")
                .run()
                .expect_err("A read only database must refuse writes");
        }
        drop(session);
        fs::remove_file(DB_PATH)
            .expect(format!("Failed to remove existing test database file {}", DB_PATH).as_str());
    }

    #[test]
    fn wrong_parameters() {
        init_logs();
        silent_logs! {
            assert!(
                Session::with_factory(
                    &SQLITE_FACTORY,
                    ConnectionParameters::new("sqlite", "db=:memory: timeout=never"),
                )
                .is_err()
            );
            assert!(
                Session::with_factory(&SQLITE_FACTORY, ConnectionParameters::new("sqlite", ""))
                    .is_err()
            );
        }
    }

    #[test]
    fn registry() {
        init_logs();
        let registry = BackendRegistry::new();
        register_factory_sqlite(&registry).expect("Could not register the sqlite factory");
        assert_eq!(registry.list_all(), ["sqlite"]);
        let mut session = Session::connect_with(&registry, "sqlite://db=:memory:")
            .expect("Could not connect through the registry");
        assert_eq!(session.backend_name().expect("Connected"), "sqlite");
        assert_eq!(registry.use_count("sqlite"), Some(1));
        session.close();
        assert!(!session.is_connected());
        assert_eq!(registry.use_count("sqlite"), Some(1));
        session.reconnect().expect("Could not reconnect");
        assert!(session.is_connected());
        drop(session);
        assert_eq!(registry.use_count("sqlite"), Some(0));
    }

    #[test]
    fn rowid_outlives_session() {
        init_logs();
        let registry = BackendRegistry::new();
        register_factory_sqlite(&registry).expect("Could not register the sqlite factory");
        let mut session = Session::connect_with(&registry, "sqlite://db=:memory:")
            .expect("Could not connect through the registry");
        let rowid = session.make_rowid().expect("Could not create the row id");
        assert_eq!(rowid.backend_module(), Some("sqlite"));
        assert_eq!(registry.use_count("sqlite"), Some(2));
        registry.unload("sqlite");
        drop(session);
        assert_eq!(registry.list_all(), ["sqlite"]);
        assert_eq!(registry.use_count("sqlite"), Some(1));
        drop(rowid);
        assert!(registry.list_all().is_empty());
    }

    #[test]
    fn last_insert_id() {
        init_logs();
        let mut session = memory();
        session
            .once(indoc! {"
                create table sluice_identity (
                    id integer primary key autoincrement,
                    name text
                )
            "})
            .run()
            .expect("Failed to create the table");
        for name in ["a", "b", "c"] {
            session
                .once(format!("insert into sluice_identity (name) values ('{}')", name))
                .run()
                .expect("Failed to insert");
        }
        assert_eq!(
            session
                .last_insert_id("sluice_identity")
                .expect("Last insert id"),
            Some(3)
        );
    }

    #[test]
    fn native_errors() {
        init_logs();
        let mut session = memory();
        silent_logs! {
            let error = session
                .once("select * from sluice_missing_table")
                .run()
                .expect_err("Selecting from a missing table must fail");
            let native = error
                .downcast_ref::<NativeError>()
                .expect("The error should carry the native sqlite error");
            assert_eq!(native.backend, "sqlite");
            assert!(native.message.contains("no such table"));

            let error = session
                .prepare("select 1; select 2")
                .expect_err("Two statements at once must fail");
            assert!(format!("{:#}", error).contains("Cannot prepare more than one statement at a time"));
        }
    }

    #[test]
    fn unknown_declared_type() {
        init_logs();
        let mut session = memory();
        session
            .once("create table sluice_geometry (shape geometry)")
            .run()
            .expect("Failed to create the table");
        session
            .once("insert into sluice_geometry values ('point')")
            .run()
            .expect("Failed to insert");
        let mut row = Row::new();
        silent_logs! {
            let error = session
                .once("select shape from sluice_geometry")
                .exchange(&mut row)
                .run()
                .expect_err("An unknown declared type must fail");
            assert!(format!("{:#}", error).contains("unknown data type: geometry"));
        }
        let mut shape = String::new();
        session
            .once("select shape from sluice_geometry")
            .exchange(into(&mut shape))
            .run()
            .expect("Fixed type binding does not need the declared type");
        assert_eq!(shape, "point");
    }

    #[test]
    fn native_query() {
        init_logs();
        let mut session = memory();
        let mut statement = session
            .prepare("select :a, :b, :a")
            .expect("Failed to prepare");
        let native = statement
            .backend_mut()
            .as_any_mut()
            .downcast_mut::<SqliteStatement>()
            .expect("The statement backend is a sqlite statement");
        assert_eq!(native.native_query(), "select ?1, ?2, ?1");
    }

    #[test]
    fn unsigned_vectors() {
        init_logs();
        let mut session = memory();
        session
            .once("create table sluice_unsigned (v integer)")
            .run()
            .expect("Failed to create the table");
        let values = vec![u64::MAX, 1, 1 << 63];
        session
            .once("insert into sluice_unsigned values (:v)")
            .exchange(use_(&values))
            .run()
            .expect("Failed to insert the unsigned values");
        let mut fetched = vec![0u64; 3];
        session
            .once("select v from sluice_unsigned order by rowid")
            .exchange(into(&mut fetched))
            .run()
            .expect("Failed to select the unsigned values");
        assert_eq!(fetched, values);
    }

    #[test]
    fn busy_database() {
        init_logs();
        const DB_PATH: &'static str = "../target/debug/busy.sqlite";
        let _guard = MUTEX.lock().unwrap();
        if Path::new(DB_PATH).exists() {
            fs::remove_file(DB_PATH)
                .expect(format!("Failed to remove test database file {}", DB_PATH).as_str());
        }
        let mut writer = Session::with_factory(
            &SQLITE_FACTORY,
            ConnectionParameters::new("sqlite", format!("db={}", DB_PATH)),
        )
        .expect("Could not open the writer session");
        writer
            .once("create table sluice_busy (id integer)")
            .run()
            .expect("Failed to create the table");
        writer
            .once("begin exclusive")
            .run()
            .expect("Failed to lock the database");
        writer
            .once("insert into sluice_busy values (1)")
            .run()
            .expect("Failed to insert while locked");

        let mut reader = Session::with_factory(
            &SQLITE_FACTORY,
            ConnectionParameters::new("sqlite", format!("db={} timeout=1", DB_PATH)),
        )
        .expect("Could not open the reader session");
        let mut count = 0i32;
        let start = Instant::now();
        silent_logs! {
            let error = reader
                .once("select count(*) from sluice_busy")
                .exchange(into(&mut count))
                .run()
                .expect_err("The database is locked by the writer");
            let native = error
                .downcast_ref::<NativeError>()
                .expect("The error should carry the native sqlite error");
            assert_eq!(native.code, Some(5));
        }
        assert!(start.elapsed() < Duration::from_secs(10));

        writer.once("commit").run().expect("Failed to commit");
        reader
            .once("select count(*) from sluice_busy")
            .exchange(into(&mut count))
            .run()
            .expect("The lock was released");
        assert_eq!(count, 1);
    }

    #[test]
    fn fetch_windows() {
        init_logs();
        let mut session = memory();
        session
            .once("create table sluice_window (n integer)")
            .run()
            .expect("Failed to create the table");
        let numbers: Vec<i32> = (0..5).collect();
        session
            .once("insert into sluice_window values (:n)")
            .exchange(use_(&numbers))
            .run()
            .expect("Failed to insert the rows");
        use ExecFetchResult::{NoData, Success};
        let cases: [(&str, &[(ExecFetchResult, usize)]); 3] = [
            // The last window is partial
            (
                "select n from sluice_window",
                &[(Success, 2), (Success, 2), (NoData, 1), (NoData, 0)],
            ),
            (
                "select n from sluice_window where n < 4",
                &[(Success, 2), (Success, 2), (NoData, 0)],
            ),
            ("select n from sluice_window where n > 10", &[(NoData, 0)]),
        ];
        for (query, windows) in cases {
            let mut statement = session.prepare(query).expect("Failed to prepare");
            statement.execute(false).expect("Failed to execute");
            let backend = statement.backend_mut();
            for (i, (result, rows)) in windows.iter().enumerate() {
                assert_eq!(
                    backend.fetch(2).expect("Failed to fetch"),
                    *result,
                    "window {} of {}",
                    i,
                    query
                );
                assert_eq!(backend.number_of_rows(), *rows, "window {} of {}", i, query);
            }
        }
    }
}
