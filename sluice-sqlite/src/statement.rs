use crate::{
    CBox, SqliteConnection, SqliteStandardInto, SqliteStandardUse, SqliteVectorInto,
    SqliteVectorUse, connection_error,
    extract::{bind_value, extract_decltype, extract_name, extract_value},
};
use libsqlite3_sys::*;
use sluice_core::{
    ColumnProperties, Context, DataType, Error, ExecFetchResult, PlaceholderStyle, Result,
    StandardIntoTypeBackend, StandardUseTypeBackend, StatementBackend, StatementType, Value,
    VectorIntoTypeBackend, VectorUseTypeBackend, rewrite_named_parameters, truncate_long,
};
use std::{
    any::Any,
    collections::BTreeMap,
    ffi::{CStr, CString, c_char, c_int},
    ptr,
    sync::Arc,
};

/// Prepared statement of the sqlite backend.
///
/// Rows are stepped into a buffer of at most `number` rows per fetch, the binders read from that
/// buffer.
pub struct SqliteStatement {
    statement: CBox<*mut sqlite3_stmt>,
    connection: Arc<SqliteConnection>,
    query: String,
    names: Vec<String>,
    parameters: BTreeMap<c_int, Vec<Option<Value>>>,
    rows: Vec<Vec<Option<Value>>>,
    columns: Vec<ColumnProperties>,
    done: bool,
    affected_rows: u64,
}

fn finalize(statement: *mut sqlite3_stmt) {
    unsafe {
        sqlite3_finalize(statement);
    }
}

impl SqliteStatement {
    pub(crate) fn new(connection: Arc<SqliteConnection>) -> Self {
        Self {
            statement: CBox::new(ptr::null_mut(), finalize),
            connection,
            query: String::new(),
            names: Vec::new(),
            parameters: BTreeMap::new(),
            rows: Vec::new(),
            columns: Vec::new(),
            done: false,
            affected_rows: 0,
        }
    }

    /// Query as it was handed to sqlite, with the `?N` placeholders.
    pub fn native_query(&self) -> &str {
        &self.query
    }

    /// 1 based index of the named parameter.
    pub(crate) fn parameter_index(&self, name: &str) -> Option<c_int> {
        self.names
            .iter()
            .position(|v| v == name)
            .map(|i| i as c_int + 1)
    }

    pub(crate) fn set_parameter(&mut self, index: c_int, values: Vec<Option<Value>>) {
        self.parameters.insert(index, values);
    }

    pub(crate) fn remove_parameter(&mut self, index: c_int) {
        self.parameters.remove(&index);
    }

    /// Column of a buffered row, `None` is a NULL.
    pub(crate) fn row_value(&self, row: usize, column: usize) -> Result<Option<Value>> {
        self.rows
            .get(row)
            .and_then(|v| v.get(column))
            .cloned()
            .ok_or_else(|| {
                Error::msg(format!(
                    "The result has no column {} at row {}",
                    column + 1,
                    row + 1
                ))
            })
    }

    fn db(&self) -> *mut sqlite3 {
        *self.connection.handle
    }

    fn ensure_prepared(&self) -> Result<()> {
        if self.statement.is_null() {
            return Err(Error::msg("The sqlite statement was not prepared"));
        }
        Ok(())
    }

    fn column_count(&self) -> c_int {
        unsafe { sqlite3_column_count(*self.statement) }
    }

    fn use_rows(&self) -> usize {
        self.parameters.values().map(Vec::len).max().unwrap_or(0)
    }

    fn check_parameters(&self) -> Result<()> {
        let count = unsafe { sqlite3_bind_parameter_count(*self.statement) };
        for index in 1..=count {
            if self.parameters.contains_key(&index) {
                continue;
            }
            return Err(match self.names.get(index as usize - 1) {
                Some(name) => {
                    Error::msg(format!("Missing use element for bind by name ({}).", name))
                }
                None => Error::msg(format!("No use element bound at position {}", index)),
            });
        }
        Ok(())
    }

    fn reset(&mut self) {
        unsafe {
            sqlite3_reset(*self.statement);
            sqlite3_clear_bindings(*self.statement);
        }
    }

    fn bind_row(&mut self, row: usize) -> Result<()> {
        for (index, values) in &self.parameters {
            let value = values.get(row).and_then(Option::as_ref);
            bind_value(*self.statement, *index, value)?;
        }
        Ok(())
    }

    /// Advances the native cursor, `true` when a row is available. A locked database is reported
    /// as an error once the busy timeout of the connection expires.
    fn step(&mut self) -> Result<bool> {
        match unsafe { sqlite3_step(*self.statement) } {
            SQLITE_ROW => Ok(true),
            SQLITE_DONE => {
                if self.column_count() == 0 {
                    self.affected_rows += unsafe { sqlite3_changes(self.db()) } as u64;
                }
                self.done = true;
                Ok(false)
            }
            _ => Err(connection_error(self.db())),
        }
    }

    fn load_rows(&mut self, number: usize) -> Result<ExecFetchResult> {
        self.rows.clear();
        if self.done {
            return Ok(ExecFetchResult::NoData);
        }
        let count = self.column_count();
        while self.rows.len() < number {
            if !self.step()? {
                return Ok(ExecFetchResult::NoData);
            }
            let row = (0..count)
                .map(|i| extract_value(*self.statement, i))
                .collect::<Result<Vec<_>>>()?;
            self.rows.push(row);
        }
        Ok(ExecFetchResult::Success)
    }

    fn run(&mut self, number: usize) -> Result<ExecFetchResult> {
        if number > 0 {
            return self.load_rows(number);
        }
        if self.column_count() == 0 {
            self.step()?;
            return Ok(ExecFetchResult::NoData);
        }
        Ok(ExecFetchResult::Success)
    }
}

/// Maps a declared column type the way sqlite assigns affinities, with the common names first.
fn data_type_from_decltype(decltype: &str) -> Result<DataType> {
    let lower = decltype.to_lowercase();
    let base = lower.split('(').next().unwrap_or_default().trim();
    Ok(match base {
        "date" | "time" | "datetime" | "timestamp" => DataType::Date,
        "int8" | "bigint" | "unsigned big int" => DataType::LongLong,
        "int" | "integer" | "tinyint" | "smallint" | "mediumint" | "int2" | "boolean" => {
            DataType::Integer
        }
        "real" | "float" | "double" | "double precision" | "numeric" | "decimal" | "number" => {
            DataType::Double
        }
        "text" | "char" | "varchar" | "nchar" | "nvarchar" | "character" | "clob"
        | "varying character" | "native character" => DataType::String,
        "blob" => DataType::Blob,
        _ if base.contains("int") => DataType::Integer,
        _ if base.contains("char") || base.contains("clob") || base.contains("text") => {
            DataType::String
        }
        _ if base.contains("blob") => DataType::Blob,
        _ if base.contains("real") || base.contains("floa") || base.contains("doub") => {
            DataType::Double
        }
        _ => {
            return Err(Error::msg(format!("unknown data type: {}", decltype)));
        }
    })
}

impl StatementBackend for SqliteStatement {
    fn alloc(&mut self) -> Result<()> {
        Ok(())
    }

    fn clean_up(&mut self) {
        self.statement = CBox::new(ptr::null_mut(), finalize);
        self.parameters.clear();
        self.rows.clear();
        self.columns.clear();
        self.done = false;
        self.affected_rows = 0;
    }

    fn prepare(&mut self, query: &str, _kind: StatementType) -> Result<()> {
        let rewritten = rewrite_named_parameters(query, PlaceholderStyle::NumberedQuestion);
        let context = || format!("While preparing the query:\n{}", truncate_long!(query));
        let sql = CString::new(rewritten.query.as_bytes())
            .context("Could not create a CString from the query String")
            .with_context(context)?;
        let mut statement = CBox::new(ptr::null_mut(), finalize);
        let mut tail: *const c_char = ptr::null();
        unsafe {
            let rc = sqlite3_prepare_v2(
                self.db(),
                sql.as_ptr(),
                -1,
                &mut *statement,
                &mut tail,
            );
            if rc != SQLITE_OK {
                return Err(connection_error(self.db()).context(context()));
            }
            if statement.is_null() {
                return Err(Error::msg("The query does not contain any statement").context(context()));
            }
            if !tail.is_null()
                && !CStr::from_ptr(tail)
                    .to_bytes()
                    .iter()
                    .all(u8::is_ascii_whitespace)
            {
                return Err(
                    Error::msg("Cannot prepare more than one statement at a time").context(context())
                );
            }
        }
        self.names = rewritten
            .distinct_names()
            .into_iter()
            .map(String::from)
            .collect();
        self.query = rewritten.query;
        self.statement = statement;
        self.rows.clear();
        self.columns.clear();
        self.done = false;
        Ok(())
    }

    fn execute(&mut self, number: usize) -> Result<ExecFetchResult> {
        self.ensure_prepared()?;
        self.check_parameters()?;
        self.rows.clear();
        self.done = false;
        self.affected_rows = 0;
        let use_rows = self.use_rows();
        if use_rows <= 1 {
            self.reset();
            self.bind_row(0)?;
            return self.run(number);
        }
        for row in 0..use_rows {
            self.reset();
            self.bind_row(row)
                .and_then(|_| self.step().map(|_| ()))
                .with_context(|| format!("at the use row {}", row + 1))?;
        }
        self.done = true;
        Ok(ExecFetchResult::NoData)
    }

    fn fetch(&mut self, number: usize) -> Result<ExecFetchResult> {
        self.ensure_prepared()?;
        self.load_rows(number)
    }

    fn number_of_rows(&self) -> usize {
        self.rows.len()
    }

    fn close_cursor(&mut self) {
        if !self.statement.is_null() {
            self.reset();
        }
        self.rows.clear();
        self.done = false;
    }

    fn affected_rows(&self) -> Result<u64> {
        Ok(self.affected_rows)
    }

    fn parameter_name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    fn rewrite_for_procedure_call(&self, query: &str) -> String {
        query.to_string()
    }

    fn prepare_for_describe(&mut self) -> Result<usize> {
        self.ensure_prepared()?;
        let count = self.column_count();
        let mut stepped: Option<bool> = None;
        let mut columns = Vec::with_capacity(count as usize);
        for i in 0..count {
            let name = extract_name(*self.statement, i)?;
            let data_type = match extract_decltype(*self.statement, i) {
                Some(decltype) => data_type_from_decltype(&decltype)?,
                None => {
                    let has_row = match stepped {
                        Some(v) => v,
                        None => {
                            self.reset();
                            self.bind_row(0)?;
                            let v = self.step()?;
                            stepped = Some(v);
                            v
                        }
                    };
                    let column_type = if has_row {
                        unsafe { sqlite3_column_type(*self.statement, i) }
                    } else {
                        SQLITE_TEXT
                    };
                    match column_type {
                        SQLITE_INTEGER => DataType::LongLong,
                        SQLITE_FLOAT => DataType::Double,
                        SQLITE_BLOB => DataType::Blob,
                        _ => DataType::String,
                    }
                }
            };
            columns.push(ColumnProperties::new(name, data_type));
        }
        if stepped.is_some() {
            self.reset();
            self.done = false;
            self.affected_rows = 0;
        }
        self.columns = columns;
        Ok(self.columns.len())
    }

    fn describe_column(&mut self, index: usize) -> Result<ColumnProperties> {
        self.columns.get(index).cloned().ok_or_else(|| {
            Error::msg(format!(
                "Column {} is out of range for a result of {} columns",
                index + 1,
                self.columns.len()
            ))
        })
    }

    fn make_into_type_backend(&self) -> Box<dyn StandardIntoTypeBackend> {
        Box::new(SqliteStandardInto::default())
    }

    fn make_use_type_backend(&self) -> Box<dyn StandardUseTypeBackend> {
        Box::new(SqliteStandardUse::default())
    }

    fn make_vector_into_type_backend(&self) -> Box<dyn VectorIntoTypeBackend> {
        Box::new(SqliteVectorInto::default())
    }

    fn make_vector_use_type_backend(&self) -> Box<dyn VectorUseTypeBackend> {
        Box::new(SqliteVectorUse::default())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_types() {
        assert_eq!(data_type_from_decltype("INTEGER").expect("known type"), DataType::Integer);
        assert_eq!(data_type_from_decltype("bigint").expect("known type"), DataType::LongLong);
        assert_eq!(data_type_from_decltype("varchar(20)").expect("known type"), DataType::String);
        assert_eq!(data_type_from_decltype("DECIMAL(10, 2)").expect("known type"), DataType::Double);
        assert_eq!(data_type_from_decltype("datetime").expect("known type"), DataType::Date);
        assert_eq!(data_type_from_decltype("BLOB").expect("known type"), DataType::Blob);
        assert_eq!(data_type_from_decltype("unsigned int").expect("known type"), DataType::Integer);
        assert_eq!(data_type_from_decltype("long text").expect("known type"), DataType::String);
        assert!(data_type_from_decltype("geometry").is_err());
    }
}
