use sluice_core::{ColumnProperties, Value};
use std::collections::BTreeMap;

/// Identifies a use element of a statement, by native position (one based) or by name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ParameterKey {
    Position(usize),
    Name(String),
}

impl From<usize> for ParameterKey {
    fn from(value: usize) -> Self {
        ParameterKey::Position(value)
    }
}

impl From<&str> for ParameterKey {
    fn from(value: &str) -> Self {
        ParameterKey::Name(value.into())
    }
}

/// Result set returned for a query.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ScriptedResult {
    pub columns: Vec<ColumnProperties>,
    pub rows: Vec<Vec<Option<Value>>>,
}

/// One execution seen by the backend, bulk executions record one entry per use row.
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    /// Query as sent to the backend, after the placeholders were rewritten.
    pub query: String,
    pub parameters: Vec<Option<Value>>,
}

/// What the backend answers and what it saw.
#[derive(Debug, Default)]
pub(crate) struct Script {
    pub(crate) results: BTreeMap<String, ScriptedResult>,
    pub(crate) out_values: BTreeMap<String, BTreeMap<ParameterKey, Option<Value>>>,
    pub(crate) journal: Vec<Execution>,
}

impl Script {
    pub(crate) fn record(&mut self, query: &str, parameters: Vec<Option<Value>>) {
        self.journal.push(Execution {
            query: query.to_string(),
            parameters,
        });
    }
}
