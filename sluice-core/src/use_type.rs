use crate::{
    Basic, Error, ExchangeTraits, Indicator, Place, Primitive, Result, ScalarRef,
    StandardUseTypeBackend, StatementBackend, TypeConversion, UseSlot, VectorRange,
    VectorUseTypeBackend,
};

/// Use binding as seen by the statement engine.
pub trait UseType {
    /// Binds by name when the binding has one, otherwise at `position` which is then advanced.
    fn bind(&mut self, statement: &mut dyn StatementBackend, position: &mut usize) -> Result<()>;

    fn name(&self) -> Option<&str>;

    fn pre_use(&mut self, statement: &mut dyn StatementBackend) -> Result<()>;

    fn post_use(&mut self, statement: &mut dyn StatementBackend, got_data: bool) -> Result<()>;

    fn clean_up(&mut self, statement: &mut dyn StatementBackend);

    /// Number of rows this binding provides, 1 for scalars.
    fn size(&self) -> Result<usize>;

    fn is_vector(&self) -> bool;

    /// Current value for error messages.
    fn dump_value(&self) -> String;
}

fn not_bound() -> Error {
    Error::msg("Use element used before being bound")
}

fn dump_scalar(value: ScalarRef<'_>, indicator: Option<Indicator>) -> String {
    if indicator == Some(Indicator::Null) {
        return "NULL".into();
    }
    match value {
        ScalarRef::Blob(..) => "<blob>".into(),
        ScalarRef::RowId(..) => "<row id>".into(),
        value => value
            .to_value()
            .map_or_else(|_| "<unprintable>".into(), |v| v.to_string()),
    }
}

pub(crate) struct ScalarUse<'a, T> {
    source: Place<'a, T>,
    indicator: Option<Place<'a, Indicator>>,
    name: Option<String>,
    backend: Option<Box<dyn StandardUseTypeBackend>>,
}

impl<'a, T: Basic> ScalarUse<'a, T> {
    pub(crate) fn new(
        source: Place<'a, T>,
        indicator: Option<Place<'a, Indicator>>,
        name: Option<String>,
    ) -> Self {
        Self {
            source,
            indicator,
            name,
            backend: None,
        }
    }
}

fn current_indicator(indicator: &Option<Place<'_, Indicator>>) -> Result<Option<Indicator>> {
    Ok(match indicator {
        Some(v) => Some(*v.get()?),
        None => None,
    })
}

impl<'a, T: Basic> UseType for ScalarUse<'a, T> {
    fn bind(&mut self, statement: &mut dyn StatementBackend, position: &mut usize) -> Result<()> {
        let mut backend = statement.make_use_type_backend();
        let read_only = self.source.is_read_only();
        match &self.name {
            Some(name) => backend.bind_by_name(statement, name, T::X_TYPE, read_only)?,
            None => backend.bind_by_pos(statement, position, T::X_TYPE, read_only)?,
        }
        self.backend = Some(backend);
        Ok(())
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn pre_use(&mut self, statement: &mut dyn StatementBackend) -> Result<()> {
        let backend = self.backend.as_mut().ok_or_else(not_bound)?;
        let indicator = current_indicator(&self.indicator)?;
        let source = self.source.get()?;
        backend.pre_use(statement, source.scalar_ref(), indicator)
    }

    fn post_use(&mut self, statement: &mut dyn StatementBackend, got_data: bool) -> Result<()> {
        let backend = self.backend.as_mut().ok_or_else(not_bound)?;
        let mut indicator = match &mut self.indicator {
            Some(v) if !v.is_read_only() => Some(v.get_mut()?),
            _ => None,
        };
        if self.source.is_read_only() {
            let source = self.source.get()?;
            backend.post_use(
                statement,
                got_data,
                UseSlot::Const(source.scalar_ref()),
                indicator.as_deref_mut(),
            )
        } else {
            let mut source = self.source.get_mut()?;
            backend.post_use(
                statement,
                got_data,
                UseSlot::Mut(source.scalar_mut()),
                indicator.as_deref_mut(),
            )
        }
    }

    fn clean_up(&mut self, statement: &mut dyn StatementBackend) {
        if let Some(mut backend) = self.backend.take() {
            backend.clean_up(statement);
        }
    }

    fn size(&self) -> Result<usize> {
        Ok(1)
    }

    fn is_vector(&self) -> bool {
        false
    }

    fn dump_value(&self) -> String {
        let indicator = current_indicator(&self.indicator).ok().flatten();
        match self.source.get() {
            Ok(source) => dump_scalar(source.scalar_ref(), indicator),
            Err(..) => "<borrowed>".into(),
        }
    }
}

pub(crate) struct VectorUse<'a, T> {
    source: Place<'a, Vec<T>>,
    indicator: Option<Place<'a, Vec<Indicator>>>,
    range: VectorRange,
    name: Option<String>,
    backend: Option<Box<dyn VectorUseTypeBackend>>,
}

impl<'a, T: Primitive> VectorUse<'a, T> {
    pub(crate) fn new(
        source: Place<'a, Vec<T>>,
        indicator: Option<Place<'a, Vec<Indicator>>>,
        range: Option<VectorRange>,
        name: Option<String>,
    ) -> Self {
        Self {
            source,
            indicator,
            range: range.unwrap_or_default(),
            name,
            backend: None,
        }
    }
}

impl<'a, T: Primitive> UseType for VectorUse<'a, T> {
    fn bind(&mut self, statement: &mut dyn StatementBackend, position: &mut usize) -> Result<()> {
        let mut backend = statement.make_vector_use_type_backend();
        let (begin, end) = (self.range.begin, self.range.end);
        match &self.name {
            Some(name) => backend.bind_by_name(statement, name, T::X_TYPE, begin, end)?,
            None => backend.bind_by_pos(statement, position, T::X_TYPE, begin, end)?,
        }
        self.backend = Some(backend);
        Ok(())
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn pre_use(&mut self, statement: &mut dyn StatementBackend) -> Result<()> {
        let backend = self.backend.as_mut().ok_or_else(not_bound)?;
        let source = self.source.get()?;
        let indicator = match &self.indicator {
            Some(v) => Some(v.get()?),
            None => None,
        };
        backend.pre_use(
            statement,
            T::vector_ref(&source),
            indicator.as_deref().map(Vec::as_slice),
        )
    }

    fn post_use(&mut self, _statement: &mut dyn StatementBackend, _got_data: bool) -> Result<()> {
        Ok(())
    }

    fn clean_up(&mut self, statement: &mut dyn StatementBackend) {
        if let Some(mut backend) = self.backend.take() {
            backend.clean_up(statement);
        }
    }

    fn size(&self) -> Result<usize> {
        let source = self.source.get()?;
        Ok(match &self.backend {
            Some(backend) => backend.size(T::vector_ref(&source)),
            None => self.range.size(source.len()),
        })
    }

    fn is_vector(&self) -> bool {
        true
    }

    fn dump_value(&self) -> String {
        match self.size() {
            Ok(size) => format!("<vector of {} rows>", size),
            Err(..) => "<borrowed>".into(),
        }
    }
}

/// Use binding of a user type, converted to its base type before every execution.
pub(crate) struct ConversionUse<'a, T: TypeConversion> {
    source: Place<'a, T>,
    indicator: Option<Place<'a, Indicator>>,
    name: Option<String>,
    base: T::Base,
    base_indicator: Indicator,
    backend: Option<Box<dyn StandardUseTypeBackend>>,
}

impl<'a, T: TypeConversion> ConversionUse<'a, T> {
    pub(crate) fn new(
        source: Place<'a, T>,
        indicator: Option<Place<'a, Indicator>>,
        name: Option<String>,
    ) -> Self {
        Self {
            source,
            indicator,
            name,
            base: <T::Base as Primitive>::empty(),
            base_indicator: Indicator::Ok,
            backend: None,
        }
    }

    fn convert_to_base(&mut self) -> Result<()> {
        let (base, indicator) = self.source.get()?.to_base()?;
        self.base = base;
        self.base_indicator = match (indicator, current_indicator(&self.indicator)?) {
            (Indicator::Null, _) => Indicator::Null,
            (_, Some(explicit)) => explicit,
            (indicator, None) => indicator,
        };
        Ok(())
    }
}

impl<'a, T: TypeConversion> UseType for ConversionUse<'a, T> {
    fn bind(&mut self, statement: &mut dyn StatementBackend, position: &mut usize) -> Result<()> {
        let mut backend = statement.make_use_type_backend();
        let read_only = self.source.is_read_only();
        let tag = <T::Base as ExchangeTraits>::X_TYPE;
        match &self.name {
            Some(name) => backend.bind_by_name(statement, name, tag, read_only)?,
            None => backend.bind_by_pos(statement, position, tag, read_only)?,
        }
        self.backend = Some(backend);
        Ok(())
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn pre_use(&mut self, statement: &mut dyn StatementBackend) -> Result<()> {
        self.convert_to_base()?;
        let backend = self.backend.as_mut().ok_or_else(not_bound)?;
        backend.pre_use(statement, self.base.scalar_ref(), Some(self.base_indicator))
    }

    fn post_use(&mut self, statement: &mut dyn StatementBackend, got_data: bool) -> Result<()> {
        let backend = self.backend.as_mut().ok_or_else(not_bound)?;
        if self.source.is_read_only() {
            return backend.post_use(
                statement,
                got_data,
                UseSlot::Const(self.base.scalar_ref()),
                None,
            );
        }
        backend.post_use(
            statement,
            got_data,
            UseSlot::Mut(self.base.scalar_mut()),
            Some(&mut self.base_indicator),
        )?;
        *self.source.get_mut()? = T::from_base(&self.base, self.base_indicator)?;
        if let Some(indicator) = &mut self.indicator {
            if !indicator.is_read_only() {
                *indicator.get_mut()? = self.base_indicator;
            }
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

    fn is_vector(&self) -> bool {
        false
    }

    fn dump_value(&self) -> String {
        match self.source.get().and_then(|v| v.to_base()) {
            Ok((base, indicator)) => dump_scalar(base.scalar_ref(), Some(indicator)),
            Err(..) => "<borrowed>".into(),
        }
    }
}
