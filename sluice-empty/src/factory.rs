use crate::{EmptySession, Execution, ParameterKey, Script, ScriptedResult};
use sluice_core::{
    BackendFactory, BackendRegistry, ColumnProperties, ConnectionParameters, Result,
    SessionBackend, Value,
};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};

pub const BACKEND_NAME: &str = "empty";

static EMPTY_FACTORY: LazyLock<EmptyBackendFactory> = LazyLock::new(EmptyBackendFactory::new);

/// Backend without a database.
///
/// Queries are answered from a script: results registered with [`with_result`](Self::with_result),
/// otherwise a `select` returns one row per use row holding the use values, anything else returns
/// no rows. Every execution is recorded in the [`journal`](Self::journal).
#[derive(Debug, Default, Clone)]
pub struct EmptyBackendFactory {
    script: Arc<Mutex<Script>>,
}

impl EmptyBackendFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows returned by `query`, matched against the query text before placeholder rewriting.
    pub fn with_result(
        self,
        query: impl Into<String>,
        columns: Vec<ColumnProperties>,
        rows: Vec<Vec<Option<Value>>>,
    ) -> Self {
        self.script()
            .results
            .insert(query.into(), ScriptedResult { columns, rows });
        self
    }

    /// Value the backend writes back into a use element of `query` after execution, simulating
    /// an in/out parameter. `None` writes back a NULL.
    pub fn with_out_value(
        self,
        query: impl Into<String>,
        parameter: impl Into<ParameterKey>,
        value: Option<Value>,
    ) -> Self {
        self.script()
            .out_values
            .entry(query.into())
            .or_default()
            .insert(parameter.into(), value);
        self
    }

    /// Executions seen so far by every session of this factory.
    pub fn journal(&self) -> Vec<Execution> {
        self.script().journal.clone()
    }

    pub fn clear_journal(&self) {
        self.script().journal.clear();
    }

    /// Turns the factory into the `'static` reference sessions and registries expect.
    pub fn leak(self) -> &'static Self {
        Box::leak(Box::new(self))
    }

    pub(crate) fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BackendFactory for EmptyBackendFactory {
    fn make_session(&self, parameters: &ConnectionParameters) -> Result<Box<dyn SessionBackend>> {
        // Rejects malformed connect strings like any other backend would
        parameters.options()?;
        log::debug!(
            "Opening an empty session with \"{}\"",
            parameters.connect_string()
        );
        Ok(Box::new(EmptySession::new(self.script.clone())))
    }
}

/// Process wide factory, the one exported by the backend module.
pub fn empty_factory() -> &'static EmptyBackendFactory {
    &EMPTY_FACTORY
}

/// Entry point looked up by the backend loader.
#[unsafe(no_mangle)]
pub fn factory_empty() -> &'static dyn BackendFactory {
    empty_factory()
}

/// Makes the statically linked backend available to `Session::connect_with(registry, "empty://")`.
pub fn register_factory_empty(registry: &BackendRegistry) -> Result<()> {
    registry.register_backend_factory(BACKEND_NAME, empty_factory())
}
