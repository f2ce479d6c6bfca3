use crate::{
    EmptyStandardInto, EmptyStandardUse, EmptyVectorInto, EmptyVectorUse, ParameterKey, Script,
    ScriptedResult,
};
use sluice_core::{
    ColumnProperties, DataType, Error, ExecFetchResult, PlaceholderStyle, Result,
    StandardIntoTypeBackend, StandardUseTypeBackend, StatementBackend, StatementType, Value,
    VectorIntoTypeBackend, VectorUseTypeBackend, rewrite_named_parameters,
};
use std::{
    any::Any,
    collections::BTreeMap,
    sync::{Arc, Mutex, PoisonError},
};

/// Statement of the empty backend.
///
/// The whole result is computed at execution and then walked with a cursor, the way client side
/// materializing drivers do: `fetch(n)` reports `NoData` as soon as fewer than `n` rows remain.
pub struct EmptyStatement {
    script: Arc<Mutex<Script>>,
    allocated: bool,
    query: String,
    native_query: String,
    kind: StatementType,
    names: Vec<String>,
    parameters: BTreeMap<ParameterKey, Vec<Option<Value>>>,
    out_values: BTreeMap<ParameterKey, Option<Value>>,
    result: ScriptedResult,
    described: Vec<ColumnProperties>,
    current_row: usize,
    rows_in_window: usize,
    affected_rows: u64,
}

impl EmptyStatement {
    pub(crate) fn new(script: Arc<Mutex<Script>>) -> Self {
        Self {
            script,
            allocated: false,
            query: String::new(),
            native_query: String::new(),
            kind: StatementType::default(),
            names: Vec::new(),
            parameters: BTreeMap::new(),
            out_values: BTreeMap::new(),
            result: ScriptedResult::default(),
            described: Vec::new(),
            current_row: 0,
            rows_in_window: 0,
            affected_rows: 0,
        }
    }

    /// Query with the native `$N` placeholders.
    pub fn native_query(&self) -> &str {
        &self.native_query
    }

    pub fn kind(&self) -> StatementType {
        self.kind
    }

    pub(crate) fn has_parameter_name(&self, name: &str) -> bool {
        self.names.iter().any(|v| v == name)
    }

    pub(crate) fn set_parameter(&mut self, key: ParameterKey, values: Vec<Option<Value>>) {
        self.parameters.insert(key, values);
    }

    pub(crate) fn remove_parameter(&mut self, key: &ParameterKey) {
        self.parameters.remove(key);
    }

    /// Value written back into the use element after the last execution.
    pub(crate) fn out_value(&self, key: &ParameterKey) -> Option<Option<Value>> {
        self.out_values.get(key).cloned()
    }

    /// Column of a row in the current window, `None` is a NULL.
    pub(crate) fn window_value(&self, row: usize, column: usize) -> Result<Option<Value>> {
        self.result
            .rows
            .get(self.current_row + row)
            .and_then(|v| v.get(column))
            .cloned()
            .ok_or_else(|| {
                Error::msg(format!(
                    "The result has no column {} at row {}",
                    column + 1,
                    self.current_row + row + 1
                ))
            })
    }

    fn ensure_allocated(&self) -> Result<()> {
        if !self.allocated {
            return Err(Error::msg("The empty statement was not allocated"));
        }
        Ok(())
    }

    fn is_select(&self) -> bool {
        let query = self.native_query.trim_start();
        let keyword = query
            .split(|c: char| !c.is_alphanumeric())
            .next()
            .unwrap_or_default();
        keyword.eq_ignore_ascii_case("select") || keyword.eq_ignore_ascii_case("with")
    }

    fn use_rows(&self) -> usize {
        self.parameters.values().map(Vec::len).max().unwrap_or(0)
    }

    /// Parameters of the use row in the order the placeholders appear in the query.
    fn parameters_for_row(&self, row: usize) -> Result<Vec<Option<Value>>> {
        let value = |values: &Vec<Option<Value>>| values.get(row).cloned().flatten();
        let by_name = self
            .parameters
            .keys()
            .any(|v| matches!(v, ParameterKey::Name(..)));
        if by_name {
            return self
                .names
                .iter()
                .map(|name| {
                    self.parameters
                        .get(&ParameterKey::Name(name.clone()))
                        .map(value)
                        .ok_or_else(|| {
                            Error::msg(format!("Missing use element for bind by name ({}).", name))
                        })
                })
                .collect();
        }
        let bound = self.parameters.len();
        if bound < self.names.len() {
            return Err(Error::msg(format!(
                "The query expects {} parameters but {} were bound",
                self.names.len(),
                bound
            )));
        }
        (1..=bound)
            .map(|position| {
                self.parameters
                    .get(&ParameterKey::Position(position))
                    .map(value)
                    .ok_or_else(|| {
                        Error::msg(format!("No use element bound at position {}", position))
                    })
            })
            .collect()
    }

    /// Result a select without a scripted answer produces: the use values, one row per use row.
    fn echo_columns(&self, row: Option<&Vec<Option<Value>>>) -> Vec<ColumnProperties> {
        let count = row.map_or(0, Vec::len);
        (0..count)
            .map(|i| {
                let name = self
                    .names
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| format!("p{}", i + 1));
                let data_type = row
                    .and_then(|v| v[i].as_ref())
                    .and_then(|v| DataType::from_exchange_type(v.exchange_type()))
                    .unwrap_or(DataType::String);
                ColumnProperties::new(name, data_type)
            })
            .collect()
    }

    fn scripted_result(&self) -> Option<ScriptedResult> {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .results
            .get(&self.query)
            .cloned()
    }
}

impl StatementBackend for EmptyStatement {
    fn alloc(&mut self) -> Result<()> {
        self.allocated = true;
        Ok(())
    }

    fn clean_up(&mut self) {
        self.allocated = false;
        self.parameters.clear();
        self.out_values.clear();
        self.result = ScriptedResult::default();
        self.described.clear();
        self.current_row = 0;
        self.rows_in_window = 0;
    }

    fn prepare(&mut self, query: &str, kind: StatementType) -> Result<()> {
        self.ensure_allocated()?;
        let rewritten = rewrite_named_parameters(query, PlaceholderStyle::Dollar);
        self.query = query.to_string();
        self.native_query = rewritten.query;
        self.names = rewritten.names;
        self.kind = kind;
        Ok(())
    }

    fn execute(&mut self, number: usize) -> Result<ExecFetchResult> {
        self.ensure_allocated()?;
        let has_uses = self.use_rows() > 0;
        let rows = (0..self.use_rows().max(1))
            .map(|row| self.parameters_for_row(row))
            .collect::<Result<Vec<_>>>()?;
        let scripted = {
            let mut script = self.script.lock().unwrap_or_else(PoisonError::into_inner);
            for parameters in &rows {
                script.record(&self.native_query, parameters.clone());
            }
            self.out_values = script
                .out_values
                .get(&self.query)
                .cloned()
                .unwrap_or_default();
            script.results.get(&self.query).cloned()
        };
        let select = self.is_select();
        self.affected_rows = if select { 0 } else { rows.len() as u64 };
        self.result = match scripted {
            Some(result) => result,
            None if select && has_uses => ScriptedResult {
                columns: self.echo_columns(rows.first()),
                rows,
            },
            None => ScriptedResult::default(),
        };
        self.current_row = 0;
        self.rows_in_window = 0;
        if self.result.rows.is_empty() {
            return Ok(ExecFetchResult::NoData);
        }
        if number == 0 {
            return Ok(ExecFetchResult::Success);
        }
        self.fetch(number)
    }

    fn fetch(&mut self, number: usize) -> Result<ExecFetchResult> {
        self.current_row += self.rows_in_window;
        let total = self.result.rows.len();
        if self.current_row >= total {
            self.rows_in_window = 0;
            return Ok(ExecFetchResult::NoData);
        }
        let remaining = total - self.current_row;
        if remaining < number {
            self.rows_in_window = remaining;
            Ok(ExecFetchResult::NoData)
        } else {
            self.rows_in_window = number;
            Ok(ExecFetchResult::Success)
        }
    }

    fn number_of_rows(&self) -> usize {
        self.rows_in_window
    }

    fn close_cursor(&mut self) {
        self.result = ScriptedResult::default();
        self.current_row = 0;
        self.rows_in_window = 0;
    }

    fn affected_rows(&self) -> Result<u64> {
        Ok(self.affected_rows)
    }

    fn parameter_name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    fn rewrite_for_procedure_call(&self, query: &str) -> String {
        format!("call {}", query)
    }

    fn prepare_for_describe(&mut self) -> Result<usize> {
        self.ensure_allocated()?;
        self.described = match self.scripted_result() {
            Some(result) => result.columns,
            None if self.is_select() => {
                let row = self.parameters_for_row(0)?;
                self.echo_columns(Some(&row))
            }
            None => Vec::new(),
        };
        Ok(self.described.len())
    }

    fn describe_column(&mut self, index: usize) -> Result<ColumnProperties> {
        self.described.get(index).cloned().ok_or_else(|| {
            Error::msg(format!(
                "Column {} is out of range for a result of {} columns",
                index + 1,
                self.described.len()
            ))
        })
    }

    fn make_into_type_backend(&self) -> Box<dyn StandardIntoTypeBackend> {
        Box::new(EmptyStandardInto::default())
    }

    fn make_use_type_backend(&self) -> Box<dyn StandardUseTypeBackend> {
        Box::new(EmptyStandardUse::default())
    }

    fn make_vector_into_type_backend(&self) -> Box<dyn VectorIntoTypeBackend> {
        Box::new(EmptyVectorInto::default())
    }

    fn make_vector_use_type_backend(&self) -> Box<dyn VectorUseTypeBackend> {
        Box::new(EmptyVectorUse::default())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
