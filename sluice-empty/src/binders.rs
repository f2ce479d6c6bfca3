use crate::{EmptyStatement, ParameterKey};
use sluice_core::{
    Error, ExchangeType, Indicator, Result, ScalarMut, ScalarRef, StandardIntoTypeBackend,
    StandardUseTypeBackend, StatementBackend, UseSlot, VectorIntoTypeBackend, VectorMut,
    VectorRange, VectorRef, VectorUseTypeBackend, downcast_statement, store_fetched,
    store_fetched_row,
};

fn column_of(position: &mut usize) -> usize {
    let column = position.saturating_sub(1);
    *position += 1;
    column
}

fn unknown_name(name: &str) -> Error {
    Error::msg(format!("Cannot bind to (by name) {}", name))
}

fn not_bound() -> Error {
    Error::msg("Use element used before being bound")
}

#[derive(Default)]
pub struct EmptyStandardInto {
    column: usize,
}

impl StandardIntoTypeBackend for EmptyStandardInto {
    fn define_by_pos(
        &mut self,
        _statement: &mut dyn StatementBackend,
        position: &mut usize,
        exchange_type: ExchangeType,
    ) -> Result<()> {
        if matches!(exchange_type, ExchangeType::Statement | ExchangeType::RowId) {
            return Err(Error::msg("Into element used with non-supported type."));
        }
        self.column = column_of(position);
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
        let statement = downcast_statement::<EmptyStatement>(statement)?;
        store_fetched(statement.window_value(0, self.column)?, data, indicator)
    }
}

#[derive(Default)]
pub struct EmptyVectorInto {
    column: usize,
    range: VectorRange,
}

impl VectorIntoTypeBackend for EmptyVectorInto {
    fn define_by_pos(
        &mut self,
        _statement: &mut dyn StatementBackend,
        position: &mut usize,
        _exchange_type: ExchangeType,
        begin: usize,
        end: Option<usize>,
    ) -> Result<()> {
        self.column = column_of(position);
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
        let statement = downcast_statement::<EmptyStatement>(statement)?;
        for row in 0..statement.number_of_rows() {
            store_fetched_row(
                statement.window_value(row, self.column)?,
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
pub struct EmptyStandardUse {
    key: Option<ParameterKey>,
}

impl StandardUseTypeBackend for EmptyStandardUse {
    fn bind_by_pos(
        &mut self,
        _statement: &mut dyn StatementBackend,
        position: &mut usize,
        _exchange_type: ExchangeType,
        _read_only: bool,
    ) -> Result<()> {
        self.key = Some(ParameterKey::Position(*position));
        *position += 1;
        Ok(())
    }

    fn bind_by_name(
        &mut self,
        statement: &mut dyn StatementBackend,
        name: &str,
        _exchange_type: ExchangeType,
        _read_only: bool,
    ) -> Result<()> {
        let statement = downcast_statement::<EmptyStatement>(statement)?;
        if !statement.has_parameter_name(name) {
            return Err(unknown_name(name));
        }
        self.key = Some(ParameterKey::Name(name.into()));
        Ok(())
    }

    fn pre_use(
        &mut self,
        statement: &mut dyn StatementBackend,
        data: ScalarRef<'_>,
        indicator: Option<Indicator>,
    ) -> Result<()> {
        let key = self.key.clone().ok_or_else(not_bound)?;
        let value = match indicator {
            Some(Indicator::Null) => None,
            _ => match data {
                ScalarRef::RowId(..) => {
                    return Err(Error::msg("Use element used with non-supported type."));
                }
                data => Some(data.to_value()?),
            },
        };
        downcast_statement::<EmptyStatement>(statement)?.set_parameter(key, vec![value]);
        Ok(())
    }

    fn post_use(
        &mut self,
        statement: &mut dyn StatementBackend,
        _got_data: bool,
        data: UseSlot<'_>,
        indicator: Option<&mut Indicator>,
    ) -> Result<()> {
        let key = self.key.as_ref().ok_or_else(not_bound)?;
        let statement = downcast_statement::<EmptyStatement>(statement)?;
        match statement.out_value(key) {
            None => Ok(()),
            Some(Some(value)) => {
                data.write_back(value)?;
                if let Some(indicator) = indicator {
                    *indicator = Indicator::Ok;
                }
                Ok(())
            }
            Some(None) => {
                if let UseSlot::Const(..) = data {
                    return Err(Error::msg("Attempted modification of const use element"));
                }
                match indicator {
                    Some(indicator) => {
                        *indicator = Indicator::Null;
                        Ok(())
                    }
                    None => Err(Error::msg("Null value fetched and no indicator defined.")),
                }
            }
        }
    }

    fn clean_up(&mut self, statement: &mut dyn StatementBackend) {
        if let (Some(key), Ok(statement)) = (
            self.key.take(),
            downcast_statement::<EmptyStatement>(statement),
        ) {
            statement.remove_parameter(&key);
        }
    }
}

#[derive(Default)]
pub struct EmptyVectorUse {
    key: Option<ParameterKey>,
    range: VectorRange,
}

impl VectorUseTypeBackend for EmptyVectorUse {
    fn bind_by_pos(
        &mut self,
        _statement: &mut dyn StatementBackend,
        position: &mut usize,
        _exchange_type: ExchangeType,
        begin: usize,
        end: Option<usize>,
    ) -> Result<()> {
        self.key = Some(ParameterKey::Position(*position));
        *position += 1;
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
        let statement = downcast_statement::<EmptyStatement>(statement)?;
        if !statement.has_parameter_name(name) {
            return Err(unknown_name(name));
        }
        self.key = Some(ParameterKey::Name(name.into()));
        self.range = VectorRange::new(begin, end);
        Ok(())
    }

    fn pre_use(
        &mut self,
        statement: &mut dyn StatementBackend,
        data: VectorRef<'_>,
        indicators: Option<&[Indicator]>,
    ) -> Result<()> {
        let key = self.key.clone().ok_or_else(not_bound)?;
        let values = (self.range.begin..self.range.end(data.len()))
            .map(|i| match indicators.and_then(|v| v.get(i)) {
                Some(Indicator::Null) => Ok(None),
                _ => data.get(i).map(Some),
            })
            .collect::<Result<Vec<_>>>()?;
        downcast_statement::<EmptyStatement>(statement)?.set_parameter(key, values);
        Ok(())
    }

    fn size(&self, data: VectorRef<'_>) -> usize {
        self.range.size(data.len())
    }

    fn clean_up(&mut self, statement: &mut dyn StatementBackend) {
        if let (Some(key), Ok(statement)) = (
            self.key.take(),
            downcast_statement::<EmptyStatement>(statement),
        ) {
            statement.remove_parameter(&key);
        }
    }
}
