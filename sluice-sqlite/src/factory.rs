use crate::SqliteSession;
use sluice_core::{
    BackendFactory, BackendRegistry, ConnectionParameters, Result, SessionBackend,
};

pub const BACKEND_NAME: &str = "sqlite";

#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteBackendFactory;

impl SqliteBackendFactory {
    pub const fn new() -> Self {
        Self
    }
}

impl BackendFactory for SqliteBackendFactory {
    fn make_session(&self, parameters: &ConnectionParameters) -> Result<Box<dyn SessionBackend>> {
        Ok(Box::new(SqliteSession::open(parameters)?))
    }
}

pub static SQLITE_FACTORY: SqliteBackendFactory = SqliteBackendFactory::new();

/// Entry point looked up by the backend loader.
#[unsafe(no_mangle)]
pub fn factory_sqlite() -> &'static dyn BackendFactory {
    &SQLITE_FACTORY
}

/// Makes the statically linked backend available to `Session::connect_with(registry, "sqlite://..")`.
pub fn register_factory_sqlite(registry: &BackendRegistry) -> Result<()> {
    registry.register_backend_factory(BACKEND_NAME, &SQLITE_FACTORY)
}
