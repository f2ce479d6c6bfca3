use crate::{
    Basic, ColumnProperties, Error, ExchangeTraits, Indicator, Place, Primitive, Result,
    StandardIntoTypeBackend, StatementBackend, TypeConversion, VectorIntoTypeBackend, VectorRange,
};

/// Into binding as seen by the statement engine.
///
/// Positions are one based and shared by all the into bindings of a statement, each binding
/// advances `position` by the number of columns it consumes.
pub trait IntoType {
    fn define(&mut self, statement: &mut dyn StatementBackend, position: &mut usize) -> Result<()>;

    fn pre_fetch(&mut self, statement: &mut dyn StatementBackend) -> Result<()>;

    fn post_fetch(
        &mut self,
        statement: &mut dyn StatementBackend,
        got_data: bool,
        called_from_fetch: bool,
    ) -> Result<()>;

    fn clean_up(&mut self, statement: &mut dyn StatementBackend);

    /// Number of rows this binding receives at once, 1 for scalars.
    fn size(&self) -> Result<usize>;

    fn resize(&mut self, size: usize) -> Result<()>;

    fn is_vector(&self) -> bool;

    /// Whether the columns are only known after describing the result (dynamic rows).
    fn is_dynamic(&self) -> bool {
        false
    }

    fn define_columns(
        &mut self,
        _statement: &mut dyn StatementBackend,
        _columns: Vec<ColumnProperties>,
        _uppercase_column_names: bool,
        _position: &mut usize,
    ) -> Result<()> {
        Err(Error::msg("Only dynamic rows can define columns from a description"))
    }
}

fn not_defined() -> Error {
    Error::msg("Into element used before being defined")
}

pub(crate) struct ScalarInto<'a, T> {
    target: Place<'a, T>,
    indicator: Option<Place<'a, Indicator>>,
    backend: Option<Box<dyn StandardIntoTypeBackend>>,
}

impl<'a, T: Basic> ScalarInto<'a, T> {
    pub(crate) fn new(target: Place<'a, T>, indicator: Option<Place<'a, Indicator>>) -> Self {
        Self {
            target,
            indicator,
            backend: None,
        }
    }
}

impl<'a, T: Basic> IntoType for ScalarInto<'a, T> {
    fn define(&mut self, statement: &mut dyn StatementBackend, position: &mut usize) -> Result<()> {
        let mut backend = statement.make_into_type_backend();
        backend.define_by_pos(statement, position, T::X_TYPE)?;
        self.backend = Some(backend);
        Ok(())
    }

    fn pre_fetch(&mut self, statement: &mut dyn StatementBackend) -> Result<()> {
        self.backend
            .as_mut()
            .ok_or_else(not_defined)?
            .pre_fetch(statement)
    }

    fn post_fetch(
        &mut self,
        statement: &mut dyn StatementBackend,
        got_data: bool,
        called_from_fetch: bool,
    ) -> Result<()> {
        let backend = self.backend.as_mut().ok_or_else(not_defined)?;
        let mut target = self.target.get_mut()?;
        let mut indicator = match &mut self.indicator {
            Some(v) => Some(v.get_mut()?),
            None => None,
        };
        backend.post_fetch(
            statement,
            got_data,
            called_from_fetch,
            target.scalar_mut(),
            indicator.as_deref_mut(),
        )
    }

    fn clean_up(&mut self, statement: &mut dyn StatementBackend) {
        if let Some(mut backend) = self.backend.take() {
            backend.clean_up(statement);
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
}

pub(crate) struct VectorInto<'a, T> {
    target: Place<'a, Vec<T>>,
    indicator: Option<Place<'a, Vec<Indicator>>>,
    range: VectorRange,
    backend: Option<Box<dyn VectorIntoTypeBackend>>,
}

impl<'a, T: Primitive> VectorInto<'a, T> {
    pub(crate) fn new(
        target: Place<'a, Vec<T>>,
        indicator: Option<Place<'a, Vec<Indicator>>>,
        range: Option<VectorRange>,
    ) -> Self {
        Self {
            target,
            indicator,
            range: range.unwrap_or_default(),
            backend: None,
        }
    }
}

impl<'a, T: Primitive> IntoType for VectorInto<'a, T> {
    fn define(&mut self, statement: &mut dyn StatementBackend, position: &mut usize) -> Result<()> {
        let mut backend = statement.make_vector_into_type_backend();
        backend.define_by_pos(
            statement,
            position,
            T::X_TYPE,
            self.range.begin,
            self.range.end,
        )?;
        self.backend = Some(backend);
        Ok(())
    }

    fn pre_fetch(&mut self, statement: &mut dyn StatementBackend) -> Result<()> {
        self.backend
            .as_mut()
            .ok_or_else(not_defined)?
            .pre_fetch(statement)
    }

    fn post_fetch(
        &mut self,
        statement: &mut dyn StatementBackend,
        got_data: bool,
        _called_from_fetch: bool,
    ) -> Result<()> {
        let backend = self.backend.as_mut().ok_or_else(not_defined)?;
        let mut target = self.target.get_mut()?;
        let mut indicator = match &mut self.indicator {
            Some(v) => Some(v.get_mut()?),
            None => None,
        };
        backend.post_fetch(
            statement,
            got_data,
            T::vector_mut(&mut target),
            indicator.as_deref_mut(),
        )
    }

    fn clean_up(&mut self, statement: &mut dyn StatementBackend) {
        if let Some(mut backend) = self.backend.take() {
            backend.clean_up(statement);
        }
    }

    fn size(&self) -> Result<usize> {
        let target = self.target.get()?;
        Ok(match &self.backend {
            Some(backend) => backend.size(T::vector_ref(&target)),
            None => self.range.size(target.len()),
        })
    }

    fn resize(&mut self, size: usize) -> Result<()> {
        let mut target = self.target.get_mut()?;
        match &mut self.backend {
            Some(backend) => backend.resize(T::vector_mut(&mut target), size)?,
            None => self.range.resize(T::vector_mut(&mut target), size),
        }
        let len = target.len();
        if let Some(indicator) = &mut self.indicator {
            indicator.get_mut()?.resize(len, Indicator::Ok);
        }
        Ok(())
    }

    fn is_vector(&self) -> bool {
        true
    }
}

/// Into binding of a user type, fetched as its base type then converted.
pub(crate) struct ConversionInto<'a, T: TypeConversion> {
    target: Place<'a, T>,
    indicator: Option<Place<'a, Indicator>>,
    base: T::Base,
    base_indicator: Indicator,
    backend: Option<Box<dyn StandardIntoTypeBackend>>,
}

impl<'a, T: TypeConversion> ConversionInto<'a, T> {
    pub(crate) fn new(target: Place<'a, T>, indicator: Option<Place<'a, Indicator>>) -> Self {
        Self {
            target,
            indicator,
            base: <T::Base as Primitive>::empty(),
            base_indicator: Indicator::Ok,
            backend: None,
        }
    }
}

impl<'a, T: TypeConversion> IntoType for ConversionInto<'a, T> {
    fn define(&mut self, statement: &mut dyn StatementBackend, position: &mut usize) -> Result<()> {
        let mut backend = statement.make_into_type_backend();
        backend.define_by_pos(statement, position, <T::Base as ExchangeTraits>::X_TYPE)?;
        self.backend = Some(backend);
        Ok(())
    }

    fn pre_fetch(&mut self, statement: &mut dyn StatementBackend) -> Result<()> {
        self.backend
            .as_mut()
            .ok_or_else(not_defined)?
            .pre_fetch(statement)
    }

    fn post_fetch(
        &mut self,
        statement: &mut dyn StatementBackend,
        got_data: bool,
        called_from_fetch: bool,
    ) -> Result<()> {
        let backend = self.backend.as_mut().ok_or_else(not_defined)?;
        backend.post_fetch(
            statement,
            got_data,
            called_from_fetch,
            self.base.scalar_mut(),
            Some(&mut self.base_indicator),
        )?;
        if !got_data {
            return Ok(());
        }
        *self.target.get_mut()? = T::from_base(&self.base, self.base_indicator)?;
        if let Some(indicator) = &mut self.indicator {
            *indicator.get_mut()? = self.base_indicator;
        }
        Ok(())
    }

    fn clean_up(&mut self, statement: &mut dyn StatementBackend) {
        if let Some(mut backend) = self.backend.take() {
            backend.clean_up(statement);
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
}
