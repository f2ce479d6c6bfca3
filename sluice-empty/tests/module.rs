#[cfg(test)]
mod tests {
    use sluice_core::{
        BACKENDS_PATH_ENV, BackendRegistry, Session, into, library_file_name, search_paths, use_,
    };
    use sluice_tests::{init_logs, silent_logs};
    use std::{
        env,
        path::{Path, PathBuf},
        sync::Mutex,
    };

    static MUTEX: Mutex<()> = Mutex::new(());

    /// Directory of the built `cdylib`, cargo leaves it in `deps` and next to it.
    fn module_dir() -> PathBuf {
        let exe = env::current_exe().expect("Could not locate the test executable");
        exe.ancestors()
            .skip(1)
            .take(2)
            .find(|v| v.join(library_file_name("empty")).exists())
            .map(Path::to_path_buf)
            .expect("The empty backend module was not built along with the tests")
    }

    #[test]
    fn load_from_file() {
        init_logs();
        let _guard = MUTEX.lock().unwrap();
        let registry = BackendRegistry::new();
        registry
            .register_backend_file("empty", module_dir().join(library_file_name("empty")))
            .expect("Could not load the empty backend module");
        assert_eq!(registry.list_all(), ["empty"]);
        assert_eq!(registry.use_count("empty"), Some(0));

        let mut session =
            Session::connect_with(&registry, "empty://").expect("Could not connect");
        let mut value = 0i32;
        session
            .once("select :x")
            .exchange(into(&mut value))
            .exchange(use_(&42i32))
            .run()
            .expect("Failed to run the echo select");
        assert_eq!(value, 42);
        let mut blob = session.make_blob().expect("Could not create the blob");
        assert_eq!(registry.use_count("empty"), Some(2));

        registry.unload("empty");
        assert!(registry.is_unload_requested("empty"));
        drop(session);
        assert_eq!(registry.list_all(), ["empty"]);
        blob.append(b"kept").expect("The module code is still loaded");
        assert_eq!(blob.len().expect("Failed to read the blob length"), 4);
        drop(blob);
        assert!(registry.list_all().is_empty());
    }

    #[test]
    fn load_from_search_path() {
        init_logs();
        let _guard = MUTEX.lock().unwrap();
        let dir = module_dir();
        let registry = BackendRegistry::new();
        unsafe { env::set_var(BACKENDS_PATH_ENV, &dir) };
        assert_eq!(search_paths(), [dir.clone()]);
        let session = Session::connect_with(&registry, "empty://");
        unsafe { env::remove_var(BACKENDS_PATH_ENV) };
        let session = session.expect("Could not load the module from the search path");
        assert_eq!(session.backend_name().expect("Connected"), "empty");
        assert_eq!(registry.use_count("empty"), Some(1));
        drop(session);
        assert_eq!(registry.use_count("empty"), Some(0));
        registry.unload("empty");
        assert!(registry.list_all().is_empty());

        silent_logs! {
            let error = registry
                .register_backend_file("empty", dir.join("missing_module"))
                .expect_err("The module file does not exist");
            assert!(format!("{:#}", error).contains("Failed to find shared library for backend empty"));
        }
        assert!(registry.list_all().is_empty());
    }
}
