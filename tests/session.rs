#[cfg(test)]
mod tests {
    use sluice::{BackendRegistry, ConnectionParameters, Session, into};
    use sluice_empty::{empty_factory, register_factory_empty};
    use sluice_tests::{init_logs, silent_logs};

    #[test]
    fn not_connected() {
        init_logs();
        let mut session = Session::new();
        assert!(!session.is_connected());
        silent_logs! {
            let error = session.once("select 1").run().expect_err("Not connected");
            assert_eq!(error.to_string(), "Session is not connected.");
            session.begin().expect_err("Not connected");
            session.make_blob().expect_err("Not connected");
            let error = session.reconnect().expect_err("Nothing to reconnect to");
            assert_eq!(error.to_string(), "Cannot reconnect without previous connection.");
        }
    }

    #[test]
    fn already_connected() {
        init_logs();
        let mut session = Session::with_factory(empty_factory(), ConnectionParameters::new("empty", ""))
            .expect("Could not open the empty session");
        silent_logs! {
            let error = session
                .open_with_factory(empty_factory(), ConnectionParameters::new("empty", ""))
                .expect_err("Already connected");
            assert_eq!(error.to_string(), "Cannot open already connected session.");
        }
        session.close();
        session
            .open_with_factory(empty_factory(), ConnectionParameters::new("empty", "x=1"))
            .expect("Opening a closed session");
        assert_eq!(
            session.parameters().map(|v| v.connect_string()),
            Some("x=1")
        );
    }

    #[test]
    fn connection_strings() {
        init_logs();
        silent_logs! {
            let error = Session::connect_with(&BackendRegistry::new(), "no backend here")
                .expect_err("Missing backend name");
            assert!(format!("{:#}", error).contains("No backend name found in"));
            let error = Session::connect_with(&BackendRegistry::new(), "missing://x=1")
                .expect_err("Unknown backend");
            assert!(format!("{:#}", error).contains("Failed to find shared library for backend missing"));
        }
    }

    #[test]
    fn backend_lifetime() {
        init_logs();
        let registry = BackendRegistry::new();
        register_factory_empty(&registry).expect("Could not register the empty backend");
        let mut session =
            Session::connect_with(&registry, "empty://").expect("Could not connect");
        assert_eq!(registry.use_count("empty"), Some(1));
        let mut value = 0i32;
        let statement = session.prepare("select 1").expect("Failed to prepare");
        assert_eq!(registry.use_count("empty"), Some(2));
        assert_eq!(statement.backend_module(), Some("empty"));

        registry.unload("empty");
        assert!(registry.is_unload_requested("empty"));
        assert_eq!(registry.list_all(), ["empty"]);
        silent_logs! {
            register_factory_empty(&registry).expect_err("The backend is still in use");
        }
        drop(statement);
        assert_eq!(registry.use_count("empty"), Some(1));
        session
            .once("select 1")
            .exchange(into(&mut value))
            .run()
            .expect("The session still works while the unload is pending");
        drop(session);
        assert!(registry.list_all().is_empty());
        assert_eq!(registry.use_count("empty"), None);

        register_factory_empty(&registry).expect("Registering again after the unload");
        registry.unload_all();
        assert!(registry.list_all().is_empty());
    }

    #[test]
    fn blob_outlives_session() {
        init_logs();
        let registry = BackendRegistry::new();
        register_factory_empty(&registry).expect("Could not register the empty backend");
        let mut session =
            Session::connect_with(&registry, "empty://").expect("Could not connect");
        let mut blob = session.make_blob().expect("Could not create the blob");
        assert_eq!(blob.backend_module(), Some("empty"));
        assert_eq!(registry.use_count("empty"), Some(2));

        registry.unload("empty");
        drop(session);
        assert_eq!(registry.list_all(), ["empty"]);
        assert_eq!(registry.use_count("empty"), Some(1));
        blob.append(b"still here").expect("The blob works after the session is gone");
        assert_eq!(blob.read_all().expect("Failed to read the blob"), b"still here");

        drop(blob);
        assert!(registry.list_all().is_empty());
        assert_eq!(registry.use_count("empty"), None);
    }

    #[test]
    fn uppercase_column_names() {
        init_logs();
        let mut session = Session::with_factory(empty_factory(), ConnectionParameters::new("empty", ""))
            .expect("Could not open the empty session");
        assert!(!session.uppercase_column_names());
        session.set_uppercase_column_names(true);
        let mut row = sluice::Row::new();
        session
            .once("select :name")
            .exchange(&mut row)
            .exchange(sluice::use_(&String::from("x")))
            .run()
            .expect("Failed to select a dynamic row");
        assert_eq!(row.find("NAME"), Some(0));
        assert_eq!(session.last_query(), "select :name");
    }
}
