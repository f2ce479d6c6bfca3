use crate::{
    Basic, Blob, DataType, Error, Exchange, ExchangeTraits, ExchangeType, Indicator, IntoType,
    Place, Primitive, Result, StandardIntoTypeBackend, StatementBackend, Value,
};
use std::{cell::RefCell, collections::BTreeMap};

/// Name and portable type of a result column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnProperties {
    pub name: String,
    pub data_type: DataType,
}

impl ColumnProperties {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Column reference accepted by [`Row::get`].
pub trait ColumnIndex {
    fn position(&self, row: &Row) -> Result<usize>;
}

impl ColumnIndex for usize {
    fn position(&self, row: &Row) -> Result<usize> {
        if *self >= row.size() {
            return Err(Error::msg(format!(
                "Column index {} is out of range for a row of {} columns",
                self,
                row.size()
            )));
        }
        Ok(*self)
    }
}

impl ColumnIndex for &str {
    fn position(&self, row: &Row) -> Result<usize> {
        row.find(self)
            .ok_or_else(|| Error::msg(format!("Column '{}' not found", self)))
    }
}

/// Dynamically described result row.
///
/// Bound with `Statement::exchange(&mut row)`, its columns are learnt from the backend the first
/// time the statement is executed.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Row {
    columns: Vec<ColumnProperties>,
    values: Vec<Option<Value>>,
    index: BTreeMap<String, usize>,
    uppercase_column_names: bool,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn size(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn clear(&mut self) {
        self.columns.clear();
        self.values.clear();
        self.index.clear();
    }

    pub fn uppercase_column_names(&mut self, value: bool) {
        self.uppercase_column_names = value;
    }

    pub fn add_properties(&mut self, mut properties: ColumnProperties) {
        if self.uppercase_column_names {
            properties.name = properties.name.to_uppercase();
        }
        self.index
            .entry(properties.name.clone())
            .or_insert(self.columns.len());
        self.columns.push(properties);
        self.values.push(None);
    }

    pub fn properties(&self, column: impl ColumnIndex) -> Result<&ColumnProperties> {
        Ok(&self.columns[column.position(self)?])
    }

    pub fn columns(&self) -> &[ColumnProperties] {
        &self.columns
    }

    /// Position of the first column with this name.
    pub fn find(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn indicator(&self, column: impl ColumnIndex) -> Result<Indicator> {
        Ok(match self.values[column.position(self)?] {
            Some(..) => Indicator::Ok,
            None => Indicator::Null,
        })
    }

    /// Raw value, `None` is a SQL NULL.
    pub fn value(&self, column: impl ColumnIndex) -> Result<Option<&Value>> {
        Ok(self.values[column.position(self)?].as_ref())
    }

    /// Value converted to `T`. Fetching a NULL this way is an error, use `Option<T>` to accept it.
    pub fn get<T: RowValue>(&self, column: impl ColumnIndex) -> Result<T> {
        let position = column.position(self)?;
        T::from_row_value(self.values[position].clone()).map_err(|e| {
            e.context(format!(
                "while reading the column '{}'",
                self.columns[position].name
            ))
        })
    }

    pub fn set_value(&mut self, column: usize, value: Option<Value>) -> Result<()> {
        let len = self.values.len();
        *self.values.get_mut(column).ok_or_else(|| {
            Error::msg(format!(
                "Column index {} is out of range for a row of {} columns",
                column, len
            ))
        })? = value;
        Ok(())
    }
}

/// Types a row value can be read as.
pub trait RowValue: Sized {
    fn from_row_value(value: Option<Value>) -> Result<Self>;
}

macro_rules! row_values {
    ($($type:ty),+ $(,)?) => {
        $(
            impl RowValue for $type {
                fn from_row_value(value: Option<Value>) -> Result<Self> {
                    match value {
                        Some(value) => <$type>::from_value(value.cast(<$type>::X_TYPE)?),
                        None => Err(Error::msg("Null value fetched and no indicator defined.")),
                    }
                }
            }
        )+
    };
}

row_values!(
    char,
    String,
    crate::WideString,
    i8,
    u8,
    i16,
    u16,
    i32,
    u32,
    i64,
    u64,
    f64,
    time::PrimitiveDateTime,
    crate::LongString,
    crate::XmlType,
);

impl<T: Primitive> RowValue for Option<T> {
    fn from_row_value(value: Option<Value>) -> Result<Self> {
        value
            .map(|v| T::from_value(v.cast(T::X_TYPE)?))
            .transpose()
    }
}

/// Content of a blob column.
impl RowValue for Vec<u8> {
    fn from_row_value(value: Option<Value>) -> Result<Self> {
        match value.map(|v| v.cast(ExchangeType::Blob)) {
            Some(Ok(Value::Blob(data))) => Ok(data),
            Some(Err(e)) => Err(e),
            Some(Ok(..)) | None => Err(Error::msg("Null value fetched and no indicator defined.")),
        }
    }
}

enum Holder {
    Value(Value),
    Blob(Blob),
}

struct RowColumn {
    holder: Holder,
    indicator: Indicator,
    backend: Box<dyn StandardIntoTypeBackend>,
}

pub(crate) struct RowInto<'a> {
    row: Place<'a, Row>,
    columns: Vec<RowColumn>,
}

impl<'a> RowInto<'a> {
    pub(crate) fn new(row: Place<'a, Row>) -> Self {
        Self {
            row,
            columns: Vec::new(),
        }
    }
}

impl IntoType for RowInto<'_> {
    fn define(&mut self, _statement: &mut dyn StatementBackend, _position: &mut usize) -> Result<()> {
        Ok(())
    }

    fn pre_fetch(&mut self, statement: &mut dyn StatementBackend) -> Result<()> {
        for column in &mut self.columns {
            column.backend.pre_fetch(statement)?;
        }
        Ok(())
    }

    fn post_fetch(
        &mut self,
        statement: &mut dyn StatementBackend,
        got_data: bool,
        called_from_fetch: bool,
    ) -> Result<()> {
        for (i, column) in self.columns.iter_mut().enumerate() {
            let data = match &mut column.holder {
                Holder::Blob(blob) => blob.scalar_mut(),
                Holder::Value(value) => value.scalar_mut().ok_or_else(|| {
                    Error::msg("Into element used with non-supported type.")
                })?,
            };
            column
                .backend
                .post_fetch(
                    statement,
                    got_data,
                    called_from_fetch,
                    data,
                    Some(&mut column.indicator),
                )
                .map_err(|e| e.context(format!("for the column number {}", i + 1)))?;
        }
        if !got_data {
            return Ok(());
        }
        let mut row = self.row.get_mut()?;
        for (i, column) in self.columns.iter().enumerate() {
            let value = match (column.indicator, &column.holder) {
                (Indicator::Null, ..) => None,
                (_, Holder::Value(value)) => Some(value.clone()),
                (_, Holder::Blob(blob)) => Some(Value::Blob(blob.read_all()?)),
            };
            row.set_value(i, value)?;
        }
        Ok(())
    }

    fn clean_up(&mut self, statement: &mut dyn StatementBackend) {
        for mut column in self.columns.drain(..) {
            column.backend.clean_up(statement);
        }
    }

    fn size(&self) -> Result<usize> {
        Ok(1)
    }

    fn resize(&mut self, _size: usize) -> Result<()> {
        Ok(())
    }

    fn is_vector(&self) -> bool {
        false
    }

    fn is_dynamic(&self) -> bool {
        true
    }

    fn define_columns(
        &mut self,
        statement: &mut dyn StatementBackend,
        columns: Vec<ColumnProperties>,
        uppercase_column_names: bool,
        position: &mut usize,
    ) -> Result<()> {
        let mut row = self.row.get_mut()?;
        row.clear();
        row.uppercase_column_names(uppercase_column_names);
        for properties in columns {
            let exchange_type = properties.data_type.exchange_type();
            let holder = match Value::default_for(exchange_type) {
                Some(Value::Blob(..)) => Holder::Blob(Blob::default()),
                Some(value) => Holder::Value(value),
                None => return Err(Error::msg("Into element used with non-supported type.")),
            };
            let mut backend = statement.make_into_type_backend();
            backend
                .define_by_pos(statement, position, exchange_type)
                .map_err(|e| e.context(format!("for the column number {}", row.size() + 1)))?;
            self.columns.push(RowColumn {
                holder,
                indicator: Indicator::Ok,
                backend,
            });
            row.add_properties(properties);
        }
        Ok(())
    }
}

impl<'a> From<&'a mut Row> for Exchange<'a> {
    fn from(value: &'a mut Row) -> Self {
        Exchange::Into(Box::new(RowInto::new(Place::Exclusive(value))))
    }
}

impl<'a> From<&'a RefCell<Row>> for Exchange<'a> {
    fn from(value: &'a RefCell<Row>) -> Self {
        Exchange::Into(Box::new(RowInto::new(Place::Cell(value))))
    }
}
