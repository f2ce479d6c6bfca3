use crate::{SqliteRowId, SqliteStatement};
use sluice_core::{
    Error, ExchangeType, Indicator, Result, ScalarMut, ScalarRef, StandardIntoTypeBackend,
    StandardUseTypeBackend, StatementBackend, Value, VectorIntoTypeBackend, VectorMut,
    VectorRange, VectorRef, VectorUseTypeBackend, downcast_statement, store_fetched,
    store_fetched_row,
};
use std::ffi::c_int;

fn unknown_name(name: &str) -> Error {
    Error::msg(format!("Cannot bind to (by name) {}", name))
}

fn not_bound() -> Error {
    Error::msg("Use element used before being bound")
}

/// Sqlite integers are signed 64 bits, unsigned 64 bit values are stored with the same bits.
fn reinterpret_unsigned(value: Option<Value>, target: ExchangeType) -> Option<Value> {
    match value {
        Some(Value::Int64(v)) if target == ExchangeType::UInt64 => Some(Value::UInt64(v as u64)),
        value => value,
    }
}

fn parameter_index(statement: &mut dyn StatementBackend, name: &str) -> Result<c_int> {
    downcast_statement::<SqliteStatement>(statement)?
        .parameter_index(name)
        .ok_or_else(|| unknown_name(name))
}

fn next_position(position: &mut usize) -> c_int {
    let index = *position as c_int;
    *position += 1;
    index
}

fn release(statement: &mut dyn StatementBackend, index: Option<c_int>) {
    if let (Some(index), Ok(statement)) = (index, downcast_statement::<SqliteStatement>(statement))
    {
        statement.remove_parameter(index);
    }
}

#[derive(Default)]
pub struct SqliteStandardInto {
    column: usize,
}

impl StandardIntoTypeBackend for SqliteStandardInto {
    fn define_by_pos(
        &mut self,
        _statement: &mut dyn StatementBackend,
        position: &mut usize,
        exchange_type: ExchangeType,
    ) -> Result<()> {
        if exchange_type == ExchangeType::Statement {
            return Err(Error::msg("Into element used with non-supported type."));
        }
        self.column = position.saturating_sub(1);
        *position += 1;
        Ok(())
    }

    fn post_fetch(
        &mut self,
        statement: &mut dyn StatementBackend,
        got_data: bool,
        _called_from_fetch: bool,
        data: ScalarMut<'_>,
        indicator: Option<&mut Indicator>,
    ) -> Result<()> {
        if !got_data {
            return Ok(());
        }
        let statement = downcast_statement::<SqliteStatement>(statement)?;
        let value = statement.row_value(0, self.column)?;
        match data {
            ScalarMut::RowId(rowid) => {
                let Some(value) = value else {
                    return Err(Error::msg("Null value fetched into a row id"));
                };
                let Value::Int64(value) = value.cast(ExchangeType::Int64)? else {
                    return Err(Error::msg("The row id is not an integer"));
                };
                rowid.backend_mut::<SqliteRowId>()?.value = value;
                if let Some(indicator) = indicator {
                    *indicator = Indicator::Ok;
                }
                Ok(())
            }
            data => {
                let value = reinterpret_unsigned(value, data.exchange_type());
                store_fetched(value, data, indicator)
            }
        }
    }
}

#[derive(Default)]
pub struct SqliteVectorInto {
    column: usize,
    range: VectorRange,
}

impl VectorIntoTypeBackend for SqliteVectorInto {
    fn define_by_pos(
        &mut self,
        _statement: &mut dyn StatementBackend,
        position: &mut usize,
        _exchange_type: ExchangeType,
        begin: usize,
        end: Option<usize>,
    ) -> Result<()> {
        self.column = position.saturating_sub(1);
        *position += 1;
        self.range = VectorRange::new(begin, end);
        Ok(())
    }

    fn post_fetch(
        &mut self,
        statement: &mut dyn StatementBackend,
        got_data: bool,
        mut data: VectorMut<'_>,
        mut indicators: Option<&mut Vec<Indicator>>,
    ) -> Result<()> {
        if !got_data {
            return Ok(());
        }
        let statement = downcast_statement::<SqliteStatement>(statement)?;
        let target = data.exchange_type();
        for row in 0..statement.number_of_rows() {
            store_fetched_row(
                reinterpret_unsigned(statement.row_value(row, self.column)?, target),
                &mut data,
                self.range.begin + row,
                indicators.as_deref_mut(),
            )
            .map_err(|e| e.context(format!("at row {}", row + 1)))?;
        }
        Ok(())
    }

    fn resize(&mut self, data: VectorMut<'_>, size: usize) -> Result<()> {
        self.range.resize(data, size);
        Ok(())
    }

    fn size(&self, data: VectorRef<'_>) -> usize {
        self.range.size(data.len())
    }
}

#[derive(Default)]
pub struct SqliteStandardUse {
    index: Option<c_int>,
}

impl StandardUseTypeBackend for SqliteStandardUse {
    fn bind_by_pos(
        &mut self,
        _statement: &mut dyn StatementBackend,
        position: &mut usize,
        _exchange_type: ExchangeType,
        _read_only: bool,
    ) -> Result<()> {
        self.index = Some(next_position(position));
        Ok(())
    }

    fn bind_by_name(
        &mut self,
        statement: &mut dyn StatementBackend,
        name: &str,
        _exchange_type: ExchangeType,
        _read_only: bool,
    ) -> Result<()> {
        self.index = Some(parameter_index(statement, name)?);
        Ok(())
    }

    fn pre_use(
        &mut self,
        statement: &mut dyn StatementBackend,
        data: ScalarRef<'_>,
        indicator: Option<Indicator>,
    ) -> Result<()> {
        let index = self.index.ok_or_else(not_bound)?;
        let value = match indicator {
            Some(Indicator::Null) => None,
            _ => match data {
                ScalarRef::RowId(rowid) => {
                    Some(Value::Int64(rowid.backend::<SqliteRowId>()?.value))
                }
                data => Some(data.to_value()?),
            },
        };
        downcast_statement::<SqliteStatement>(statement)?.set_parameter(index, vec![value]);
        Ok(())
    }

    fn clean_up(&mut self, statement: &mut dyn StatementBackend) {
        release(statement, self.index.take());
    }
}

#[derive(Default)]
pub struct SqliteVectorUse {
    index: Option<c_int>,
    range: VectorRange,
}

impl VectorUseTypeBackend for SqliteVectorUse {
    fn bind_by_pos(
        &mut self,
        _statement: &mut dyn StatementBackend,
        position: &mut usize,
        _exchange_type: ExchangeType,
        begin: usize,
        end: Option<usize>,
    ) -> Result<()> {
        self.index = Some(next_position(position));
        self.range = VectorRange::new(begin, end);
        Ok(())
    }

    fn bind_by_name(
        &mut self,
        statement: &mut dyn StatementBackend,
        name: &str,
        _exchange_type: ExchangeType,
        begin: usize,
        end: Option<usize>,
    ) -> Result<()> {
        self.index = Some(parameter_index(statement, name)?);
        self.range = VectorRange::new(begin, end);
        Ok(())
    }

    fn pre_use(
        &mut self,
        statement: &mut dyn StatementBackend,
        data: VectorRef<'_>,
        indicators: Option<&[Indicator]>,
    ) -> Result<()> {
        let index = self.index.ok_or_else(not_bound)?;
        let values = (self.range.begin..self.range.end(data.len()))
            .map(|i| match indicators.and_then(|v| v.get(i)) {
                Some(Indicator::Null) => Ok(None),
                _ => data.get(i).map(Some),
            })
            .collect::<Result<Vec<_>>>()?;
        downcast_statement::<SqliteStatement>(statement)?.set_parameter(index, values);
        Ok(())
    }

    fn size(&self, data: VectorRef<'_>) -> usize {
        self.range.size(data.len())
    }

    fn clean_up(&mut self, statement: &mut dyn StatementBackend) {
        release(statement, self.index.take());
    }
}
