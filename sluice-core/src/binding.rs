use crate::{
    Blob, ConversionInto, ConversionUse, ExchangeTraits, Indicator, IntoTarget, IntoType, Place,
    Primitive, RowId, ScalarInto, ScalarUse, UseSource, UseType, VectorInto, VectorRange,
    VectorUse,
};
use std::{cell::RefCell, ops::Range};

/// Rust types that can appear in an into or use binding.
///
/// Implemented for every basic type, `Blob`, `RowId`, vectors of the primitive types, `Option` of
/// the primitive types and, through [`exchange_user_type!`](crate::exchange_user_type), for types
/// implementing [`TypeConversion`](crate::TypeConversion).
pub trait Bindable: ExchangeTraits + Sized {
    /// `Indicator` for scalars, `Vec<Indicator>` for vectors.
    type Indicator: 'static;

    fn into_type<'a>(
        target: Place<'a, Self>,
        indicator: Option<Place<'a, Self::Indicator>>,
        range: Option<VectorRange>,
    ) -> Box<dyn IntoType + 'a>
    where
        Self: 'a;

    fn use_type<'a>(
        source: Place<'a, Self>,
        indicator: Option<Place<'a, Self::Indicator>>,
        range: Option<VectorRange>,
        name: Option<String>,
    ) -> Box<dyn UseType + 'a>
    where
        Self: 'a;
}

macro_rules! bindable_scalars {
    ($($type:ty),+ $(,)?) => {
        $(
            impl Bindable for $type {
                type Indicator = Indicator;

                fn into_type<'a>(
                    target: Place<'a, Self>,
                    indicator: Option<Place<'a, Indicator>>,
                    _range: Option<VectorRange>,
                ) -> Box<dyn IntoType + 'a>
                where
                    Self: 'a,
                {
                    Box::new(ScalarInto::new(target, indicator))
                }

                fn use_type<'a>(
                    source: Place<'a, Self>,
                    indicator: Option<Place<'a, Indicator>>,
                    _range: Option<VectorRange>,
                    name: Option<String>,
                ) -> Box<dyn UseType + 'a>
                where
                    Self: 'a,
                {
                    Box::new(ScalarUse::new(source, indicator, name))
                }
            }
        )+
    };
}

bindable_scalars!(
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
    Blob,
    RowId,
);

impl<T: Primitive> Bindable for Vec<T> {
    type Indicator = Vec<Indicator>;

    fn into_type<'a>(
        target: Place<'a, Self>,
        indicator: Option<Place<'a, Vec<Indicator>>>,
        range: Option<VectorRange>,
    ) -> Box<dyn IntoType + 'a>
    where
        Self: 'a,
    {
        Box::new(VectorInto::new(target, indicator, range))
    }

    fn use_type<'a>(
        source: Place<'a, Self>,
        indicator: Option<Place<'a, Vec<Indicator>>>,
        range: Option<VectorRange>,
        name: Option<String>,
    ) -> Box<dyn UseType + 'a>
    where
        Self: 'a,
    {
        Box::new(VectorUse::new(source, indicator, range, name))
    }
}

impl<T: Primitive> Bindable for Option<T> {
    type Indicator = Indicator;

    fn into_type<'a>(
        target: Place<'a, Self>,
        indicator: Option<Place<'a, Indicator>>,
        _range: Option<VectorRange>,
    ) -> Box<dyn IntoType + 'a>
    where
        Self: 'a,
    {
        Box::new(ConversionInto::new(target, indicator))
    }

    fn use_type<'a>(
        source: Place<'a, Self>,
        indicator: Option<Place<'a, Indicator>>,
        _range: Option<VectorRange>,
        name: Option<String>,
    ) -> Box<dyn UseType + 'a>
    where
        Self: 'a,
    {
        Box::new(ConversionUse::new(source, indicator, name))
    }
}

#[doc(hidden)]
pub fn conversion_into<'a, T: crate::TypeConversion + 'a>(
    target: Place<'a, T>,
    indicator: Option<Place<'a, Indicator>>,
) -> Box<dyn IntoType + 'a> {
    Box::new(ConversionInto::new(target, indicator))
}

#[doc(hidden)]
pub fn conversion_use<'a, T: crate::TypeConversion + 'a>(
    source: Place<'a, T>,
    indicator: Option<Place<'a, Indicator>>,
    name: Option<String>,
) -> Box<dyn UseType + 'a> {
    Box::new(ConversionUse::new(source, indicator, name))
}

/// Makes a type implementing [`TypeConversion`](crate::TypeConversion) usable in bindings.
///
/// ```ignore
/// struct Celsius(f64);
///
/// impl TypeConversion for Celsius {
///     type Base = f64;
///     fn from_base(base: &f64, _: Indicator) -> Result<Self> { Ok(Celsius(*base)) }
///     fn to_base(&self) -> Result<(f64, Indicator)> { Ok((self.0, Indicator::Ok)) }
/// }
///
/// exchange_user_type!(Celsius);
/// ```
#[macro_export]
macro_rules! exchange_user_type {
    ($($type:ty),+ $(,)?) => {
        $(
            impl $crate::ExchangeTraits for $type {
                type Family = $crate::UserType;
                const X_TYPE: $crate::ExchangeType =
                    <<$type as $crate::TypeConversion>::Base as $crate::ExchangeTraits>::X_TYPE;
            }

            impl $crate::Bindable for $type {
                type Indicator = $crate::Indicator;

                fn into_type<'a>(
                    target: $crate::Place<'a, Self>,
                    indicator: ::std::option::Option<$crate::Place<'a, $crate::Indicator>>,
                    _range: ::std::option::Option<$crate::VectorRange>,
                ) -> ::std::boxed::Box<dyn $crate::IntoType + 'a>
                where
                    Self: 'a,
                {
                    $crate::conversion_into(target, indicator)
                }

                fn use_type<'a>(
                    source: $crate::Place<'a, Self>,
                    indicator: ::std::option::Option<$crate::Place<'a, $crate::Indicator>>,
                    _range: ::std::option::Option<$crate::VectorRange>,
                    name: ::std::option::Option<::std::string::String>,
                ) -> ::std::boxed::Box<dyn $crate::UseType + 'a>
                where
                    Self: 'a,
                {
                    $crate::conversion_use(source, indicator, name)
                }
            }
        )+
    };
}

/// Output binding, created by [`into`].
pub struct IntoBinding<'a, T: Bindable> {
    target: Place<'a, T>,
    indicator: Option<Place<'a, T::Indicator>>,
    range: Option<VectorRange>,
}

impl<'a, T: Bindable> IntoBinding<'a, T> {
    pub fn indicator(mut self, indicator: impl IntoTarget<'a, T::Indicator>) -> Self {
        self.indicator = Some(indicator.into_place());
        self
    }
}

impl<'a, T: Primitive> IntoBinding<'a, Vec<T>> {
    /// Receives rows only in `range` of the vector, the part before `range.start` is kept.
    pub fn range(mut self, range: Range<usize>) -> Self {
        self.range = Some(VectorRange::new(range.start, Some(range.end)));
        self
    }
}

/// Binds a destination for a fetched column, `&mut T` or `&RefCell<T>`.
pub fn into<'a, T: Bindable + 'a>(target: impl IntoTarget<'a, T>) -> IntoBinding<'a, T> {
    IntoBinding {
        target: target.into_place(),
        indicator: None,
        range: None,
    }
}

/// Input binding, created by [`use_`] or [`use_cell`].
pub struct UseBinding<'a, T: Bindable> {
    source: Place<'a, T>,
    indicator: Option<Place<'a, T::Indicator>>,
    range: Option<VectorRange>,
    name: Option<String>,
}

impl<'a, T: Bindable> UseBinding<'a, T> {
    /// Binds to the `:name` placeholder instead of the next position.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn indicator(mut self, indicator: impl UseSource<'a, T::Indicator>) -> Self {
        self.indicator = Some(indicator.into_place());
        self
    }

    pub fn indicator_cell(mut self, indicator: &'a RefCell<T::Indicator>) -> Self {
        self.indicator = Some(Place::Cell(indicator));
        self
    }
}

impl<'a, T: Primitive> UseBinding<'a, Vec<T>> {
    /// Sends only the rows in `range`.
    pub fn range(mut self, range: Range<usize>) -> Self {
        self.range = Some(VectorRange::new(range.start, Some(range.end)));
        self
    }
}

/// Binds a parameter value. A shared reference makes the binding read only, the backend is then
/// not allowed to modify it.
pub fn use_<'a, T: Bindable + 'a>(source: impl UseSource<'a, T>) -> UseBinding<'a, T> {
    UseBinding {
        source: source.into_place(),
        indicator: None,
        range: None,
        name: None,
    }
}

/// Binds a parameter the caller keeps updating between executions.
pub fn use_cell<'a, T: Bindable + 'a>(source: &'a RefCell<T>) -> UseBinding<'a, T> {
    UseBinding {
        source: Place::Cell(source),
        indicator: None,
        range: None,
        name: None,
    }
}

/// Any binding a statement accepts.
pub enum Exchange<'a> {
    Into(Box<dyn IntoType + 'a>),
    Use(Box<dyn UseType + 'a>),
}

impl<'a, T: Bindable + 'a> From<IntoBinding<'a, T>> for Exchange<'a> {
    fn from(value: IntoBinding<'a, T>) -> Self {
        Exchange::Into(T::into_type(value.target, value.indicator, value.range))
    }
}

impl<'a, T: Bindable + 'a> From<UseBinding<'a, T>> for Exchange<'a> {
    fn from(value: UseBinding<'a, T>) -> Self {
        Exchange::Use(T::use_type(
            value.source,
            value.indicator,
            value.range,
            value.name,
        ))
    }
}
