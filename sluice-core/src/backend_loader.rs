use crate::{BackendFactory, Error, FactoryFn, Result};
use libloading::Library;
use std::{
    collections::BTreeMap,
    env::{self, consts},
    ffi::OsString,
    fmt::{self, Debug},
    path::{Path, PathBuf},
    sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError},
};

/// Environment variable with additional directories to search for backend modules.
pub const BACKENDS_PATH_ENV: &str = "SLUICE_BACKENDS_PATH";

static GLOBAL: LazyLock<BackendRegistry> = LazyLock::new(BackendRegistry::new);

struct Entry {
    factory: &'static dyn BackendFactory,
    use_count: usize,
    unload_requested: bool,
    // Dropped last, the factory points into it
    library: Option<Library>,
}

/// Name to backend mapping, with reference counting of the loaded modules.
///
/// Every operation holds the registry lock for its whole duration. A backend with live
/// [`BackendHandle`]s is never unloaded, an unload request is deferred until the last handle goes
/// away.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    entries: Arc<Mutex<BTreeMap<String, Entry>>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process wide registry used by `Session::connect`.
    pub fn global() -> &'static BackendRegistry {
        &GLOBAL
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the factory of the backend, loading its module from the search paths if needed.
    pub fn get(&self, name: &str) -> Result<BackendHandle> {
        let mut entries = self.lock();
        if !entries.contains_key(name) {
            let (library, factory) = load_module(name, None, &search_paths())?;
            entries.insert(
                name.to_string(),
                Entry {
                    factory,
                    use_count: 0,
                    unload_requested: false,
                    library: Some(library),
                },
            );
        }
        let Some(entry) = entries.get_mut(name) else {
            return Err(Error::msg(format!("Backend {} is not registered", name)));
        };
        entry.use_count += 1;
        Ok(BackendHandle {
            registry: self.clone(),
            name: name.to_string(),
            factory: entry.factory,
        })
    }

    fn acquire(&self, name: &str) {
        match self.lock().get_mut(name) {
            Some(entry) => entry.use_count += 1,
            None => log::warn!("Backend handle cloned for {} which is not registered", name),
        }
    }

    fn unget(&self, name: &str) {
        let mut entries = self.lock();
        let Some(entry) = entries.get_mut(name) else {
            log::warn!("Backend {} released but it is not registered", name);
            return;
        };
        entry.use_count = entry.use_count.saturating_sub(1);
        if entry.use_count == 0 && entry.unload_requested {
            log::debug!("Unloading backend {} after its last use", name);
            entries.remove(name);
        }
    }

    /// Loads the backend from an explicit module file.
    pub fn register_backend_file(&self, name: &str, path: impl AsRef<Path>) -> Result<()> {
        let mut entries = self.lock();
        unload_or_fail_if_in_use(&mut entries, name)?;
        let (library, factory) = load_module(name, Some(path.as_ref()), &[])?;
        entries.insert(
            name.to_string(),
            Entry {
                factory,
                use_count: 0,
                unload_requested: false,
                library: Some(library),
            },
        );
        Ok(())
    }

    /// Registers an in process factory, for backends linked statically.
    pub fn register_backend_factory(
        &self,
        name: &str,
        factory: &'static dyn BackendFactory,
    ) -> Result<()> {
        let mut entries = self.lock();
        unload_or_fail_if_in_use(&mut entries, name)?;
        log::debug!("Registered backend {} from a static factory", name);
        entries.insert(
            name.to_string(),
            Entry {
                factory,
                use_count: 0,
                unload_requested: false,
                library: None,
            },
        );
        Ok(())
    }

    /// Unloads the backend now, or as soon as it is no longer in use.
    pub fn unload(&self, name: &str) {
        let mut entries = self.lock();
        request_unload(&mut entries, name);
    }

    pub fn unload_all(&self) {
        let mut entries = self.lock();
        let names: Vec<String> = entries.keys().cloned().collect();
        for name in names {
            request_unload(&mut entries, &name);
        }
    }

    /// Names of the registered backends, including the ones waiting to be unloaded.
    pub fn list_all(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    pub fn use_count(&self, name: &str) -> Option<usize> {
        self.lock().get(name).map(|v| v.use_count)
    }

    pub fn is_unload_requested(&self, name: &str) -> bool {
        self.lock().get(name).is_some_and(|v| v.unload_requested)
    }
}

impl Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("backends", &self.list_all())
            .finish()
    }
}

fn request_unload(entries: &mut BTreeMap<String, Entry>, name: &str) {
    let Some(entry) = entries.get_mut(name) else {
        return;
    };
    if entry.use_count > 0 {
        log::debug!(
            "Backend {} is in use by {} sessions or statements, unload deferred",
            name,
            entry.use_count
        );
        entry.unload_requested = true;
    } else {
        log::debug!("Unloading backend {}", name);
        entries.remove(name);
    }
}

fn unload_or_fail_if_in_use(entries: &mut BTreeMap<String, Entry>, name: &str) -> Result<()> {
    if let Some(entry) = entries.get(name) {
        if entry.use_count > 0 {
            let error = Error::msg(format!("Backend {} is used and can't be unloaded", name));
            log::error!("{:#}", error);
            return Err(error);
        }
        entries.remove(name);
    }
    Ok(())
}

/// File name of the module implementing the backend, e.g. `libsluice_sqlite.so`.
pub fn library_file_name(name: &str) -> String {
    format!("{}sluice_{}{}", consts::DLL_PREFIX, name, consts::DLL_SUFFIX)
}

/// Directories searched for backend modules.
pub fn search_paths() -> Vec<PathBuf> {
    search_paths_from(env::var_os(BACKENDS_PATH_ENV))
}

/// Search paths for the given value of the environment variable, the directory of the running
/// executable and the current directory when it is not set.
pub fn search_paths_from(variable: Option<OsString>) -> Vec<PathBuf> {
    match variable {
        Some(value) if !value.is_empty() => env::split_paths(&value)
            .filter(|v| !v.as_os_str().is_empty())
            .collect(),
        _ => {
            let mut result = Vec::new();
            if let Some(dir) = env::current_exe()
                .ok()
                .and_then(|v| v.parent().map(Path::to_path_buf))
            {
                result.push(dir);
            }
            result.push(PathBuf::from("."));
            result
        }
    }
}

fn load_module(
    name: &str,
    file: Option<&Path>,
    paths: &[PathBuf],
) -> Result<(Library, &'static dyn BackendFactory)> {
    let file_name = library_file_name(name);
    let candidates: Vec<PathBuf> = match file {
        Some(file) => vec![file.to_path_buf()],
        // The bare name lets the system loader look in its own paths first
        None => std::iter::once(PathBuf::from(&file_name))
            .chain(paths.iter().map(|v| v.join(&file_name)))
            .collect(),
    };
    let mut failures = Vec::new();
    let mut loaded = None;
    for candidate in &candidates {
        match unsafe { Library::new(candidate) } {
            Ok(library) => {
                loaded = Some((candidate, library));
                break;
            }
            Err(e) => failures.push(format!("{} ({})", candidate.display(), e)),
        }
    }
    let Some((path, library)) = loaded else {
        let error = Error::msg(format!(
            "Failed to find shared library for backend {} (looked for {} in the search paths [{}], attempts: {})",
            name,
            file.map_or(file_name.clone(), |v| v.display().to_string()),
            paths
                .iter()
                .map(|v| v.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
            failures.join("; ")
        ));
        log::error!("{:#}", error);
        return Err(error);
    };
    let symbol = format!("factory_{}", name);
    let constructor: FactoryFn = match unsafe { library.get::<FactoryFn>(symbol.as_bytes()) } {
        Ok(v) => *v,
        Err(e) => {
            let error = Error::new(e).context(format!(
                "Failed to resolve dynamic symbol: {} (backend {}, module {})",
                symbol,
                name,
                path.display()
            ));
            log::error!("{:#}", error);
            return Err(error);
        }
    };
    log::debug!("Loaded backend {} from {}", name, path.display());
    Ok((library, constructor()))
}

/// Counted reference to a registered backend.
///
/// The module stays loaded while any handle exists, dropping the last handle applies a pending
/// unload.
pub struct BackendHandle {
    registry: BackendRegistry,
    name: String,
    factory: &'static dyn BackendFactory,
}

impl BackendHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn factory(&self) -> &dyn BackendFactory {
        self.factory
    }
}

impl Clone for BackendHandle {
    fn clone(&self) -> Self {
        self.registry.acquire(&self.name);
        Self {
            registry: self.registry.clone(),
            name: self.name.clone(),
            factory: self.factory,
        }
    }
}

impl Drop for BackendHandle {
    fn drop(&mut self) {
        self.registry.unget(&self.name);
    }
}

impl Debug for BackendHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendHandle")
            .field("name", &self.name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConnectionParameters, SessionBackend};

    struct NoFactory;

    impl BackendFactory for NoFactory {
        fn make_session(&self, _: &ConnectionParameters) -> Result<Box<dyn SessionBackend>> {
            Err(Error::msg("no sessions here"))
        }
    }

    static NO_FACTORY: NoFactory = NoFactory;

    #[test]
    fn file_name() {
        let name = library_file_name("sqlite");
        assert!(name.contains("sluice_sqlite"));
        assert!(name.starts_with(consts::DLL_PREFIX));
        assert!(name.ends_with(consts::DLL_SUFFIX));
    }

    #[test]
    fn paths_from_variable() {
        let joined = env::join_paths(["/opt/a", "/opt/b"]).expect("valid paths");
        assert_eq!(
            search_paths_from(Some(joined)),
            [PathBuf::from("/opt/a"), PathBuf::from("/opt/b")]
        );
        let defaults = search_paths_from(None);
        assert_eq!(defaults.last(), Some(&PathBuf::from(".")));
    }

    #[test]
    fn deferred_unload() {
        let registry = BackendRegistry::new();
        registry
            .register_backend_factory("none", &NO_FACTORY)
            .expect("nothing registered yet");
        let first = registry.get("none").expect("registered");
        let second = registry.get("none").expect("registered");
        assert_eq!(registry.use_count("none"), Some(2));
        registry.unload("none");
        assert!(registry.is_unload_requested("none"));
        assert_eq!(registry.list_all(), ["none"]);
        assert!(
            registry
                .register_backend_factory("none", &NO_FACTORY)
                .is_err()
        );
        let third = second.clone();
        drop(first);
        drop(second);
        assert_eq!(registry.use_count("none"), Some(1));
        drop(third);
        assert!(registry.list_all().is_empty());
    }

    #[test]
    fn missing_module() {
        let registry = BackendRegistry::new();
        let error = registry
            .get("definitely_not_a_backend")
            .expect_err("there is no such module");
        let message = format!("{:#}", error);
        assert!(message.starts_with(
            "Failed to find shared library for backend definitely_not_a_backend"
        ));
        assert!(message.contains(&library_file_name("definitely_not_a_backend")));
        assert!(registry.list_all().is_empty());
    }
}
