use crate::{
    Blob, Error, ExchangeType, Indicator, LongString, Result, RowId, Value, WideString, XmlType,
};
use time::{Date, PrimitiveDateTime};

/// Family of types the engine exchanges without any conversion.
#[derive(Debug)]
pub struct BasicType;

/// Family of types converted to and from a basic base type.
#[derive(Debug)]
pub struct UserType;

pub trait TypeFamily {
    const BASIC: bool;
}

impl TypeFamily for BasicType {
    const BASIC: bool = true;
}

impl TypeFamily for UserType {
    const BASIC: bool = false;
}

/// Compile time mapping of a Rust type to its exchange tag and family.
///
/// Vectors inherit both the tag and the family of their element.
pub trait ExchangeTraits {
    type Family: TypeFamily;
    const X_TYPE: ExchangeType;
}

/// Types directly supported by backends, exposed to them through tagged views.
pub trait Basic: ExchangeTraits<Family = BasicType> {
    fn scalar_ref(&self) -> ScalarRef<'_>;
    fn scalar_mut(&mut self) -> ScalarMut<'_>;
}

/// Basic types with an owned [`Value`] form, these are the ones that can be exchanged in vectors.
pub trait Primitive: Basic + Clone + 'static {
    fn empty() -> Self;
    fn to_value(&self) -> Value;
    fn from_value(value: Value) -> Result<Self>;
    fn vector_ref(vector: &Vec<Self>) -> VectorRef<'_>;
    fn vector_mut(vector: &mut Vec<Self>) -> VectorMut<'_>;
}

/// Conversion of a user type from and to one of the primitive types.
pub trait TypeConversion: Sized {
    type Base: Primitive;

    fn from_base(base: &Self::Base, indicator: Indicator) -> Result<Self>;
    fn to_base(&self) -> Result<(Self::Base, Indicator)>;
}

impl<T: Primitive> TypeConversion for Option<T> {
    type Base = T;

    fn from_base(base: &T, indicator: Indicator) -> Result<Self> {
        Ok(match indicator {
            Indicator::Null => None,
            Indicator::Ok | Indicator::Truncated => Some(base.clone()),
        })
    }

    fn to_base(&self) -> Result<(T, Indicator)> {
        Ok(match self {
            Some(v) => (v.clone(), Indicator::Ok),
            None => (T::empty(), Indicator::Null),
        })
    }
}

impl<T: Primitive> ExchangeTraits for Option<T> {
    type Family = UserType;
    const X_TYPE: ExchangeType = T::X_TYPE;
}

impl<T: Primitive> ExchangeTraits for Vec<T> {
    type Family = T::Family;
    const X_TYPE: ExchangeType = T::X_TYPE;
}

fn mismatch(from: ExchangeType, to: ExchangeType) -> Error {
    Error::msg(format!(
        "Cannot assign a {} value to a {} binding",
        from, to
    ))
}

fn out_of_range(index: usize, len: usize) -> Error {
    Error::msg(format!(
        "Row {} is outside of the bound vector of size {}",
        index, len
    ))
}

fn row_id_error() -> Error {
    Error::msg("Row id values are specific to the backend that created them")
}

macro_rules! exchange_types {
    ($($variant:ident: $type:ty = $empty:expr),+ $(,)?) => {
        /// Read only view over the caller storage of a scalar binding.
        #[derive(Debug)]
        pub enum ScalarRef<'v> {
            $($variant(&'v $type),)+
            Blob(&'v Blob),
            RowId(&'v RowId),
        }

        /// Writable view over the caller storage of a scalar binding.
        #[derive(Debug)]
        pub enum ScalarMut<'v> {
            $($variant(&'v mut $type),)+
            Blob(&'v mut Blob),
            RowId(&'v mut RowId),
        }

        /// Read only view over the caller storage of a vector binding.
        #[derive(Debug)]
        pub enum VectorRef<'v> {
            $($variant(&'v Vec<$type>),)+
        }

        /// Writable view over the caller storage of a vector binding.
        #[derive(Debug)]
        pub enum VectorMut<'v> {
            $($variant(&'v mut Vec<$type>),)+
        }

        impl ScalarRef<'_> {
            pub fn exchange_type(&self) -> ExchangeType {
                match self {
                    $(Self::$variant(..) => ExchangeType::$variant,)+
                    Self::Blob(..) => ExchangeType::Blob,
                    Self::RowId(..) => ExchangeType::RowId,
                }
            }

            pub fn to_value(&self) -> Result<Value> {
                match self {
                    $(Self::$variant(v) => Ok(<$type as Primitive>::to_value(v)),)+
                    Self::Blob(v) => Ok(Value::Blob(v.read_all()?)),
                    Self::RowId(..) => Err(row_id_error()),
                }
            }
        }

        impl ScalarMut<'_> {
            pub fn exchange_type(&self) -> ExchangeType {
                match self {
                    $(Self::$variant(..) => ExchangeType::$variant,)+
                    Self::Blob(..) => ExchangeType::Blob,
                    Self::RowId(..) => ExchangeType::RowId,
                }
            }

            pub fn to_value(&self) -> Result<Value> {
                match self {
                    $(Self::$variant(v) => Ok(<$type as Primitive>::to_value(v)),)+
                    Self::Blob(v) => Ok(Value::Blob(v.read_all()?)),
                    Self::RowId(..) => Err(row_id_error()),
                }
            }

            /// Stores the value, which must carry the same tag as the binding.
            pub fn assign(self, value: Value) -> Result<()> {
                match self {
                    $(Self::$variant(v) => *v = <$type as Primitive>::from_value(value)?,)+
                    Self::Blob(v) => match value {
                        Value::Blob(data) => v.replace(&data)?,
                        other => return Err(mismatch(other.exchange_type(), ExchangeType::Blob)),
                    },
                    Self::RowId(..) => return Err(row_id_error()),
                }
                Ok(())
            }
        }

        impl VectorRef<'_> {
            pub fn exchange_type(&self) -> ExchangeType {
                match self {
                    $(Self::$variant(..) => ExchangeType::$variant,)+
                }
            }

            pub fn len(&self) -> usize {
                match self {
                    $(Self::$variant(v) => v.len(),)+
                }
            }

            pub fn is_empty(&self) -> bool {
                self.len() == 0
            }

            pub fn get(&self, index: usize) -> Result<Value> {
                match self {
                    $(Self::$variant(v) => v
                        .get(index)
                        .map(<$type as Primitive>::to_value)
                        .ok_or_else(|| out_of_range(index, v.len())),)+
                }
            }
        }

        impl VectorMut<'_> {
            pub fn exchange_type(&self) -> ExchangeType {
                match self {
                    $(Self::$variant(..) => ExchangeType::$variant,)+
                }
            }

            pub fn len(&self) -> usize {
                match self {
                    $(Self::$variant(v) => v.len(),)+
                }
            }

            pub fn is_empty(&self) -> bool {
                self.len() == 0
            }

            pub fn resize(&mut self, len: usize) {
                match self {
                    $(Self::$variant(v) => v.resize_with(len, <$type as Primitive>::empty),)+
                }
            }

            pub fn get(&self, index: usize) -> Result<Value> {
                match self {
                    $(Self::$variant(v) => v
                        .get(index)
                        .map(<$type as Primitive>::to_value)
                        .ok_or_else(|| out_of_range(index, v.len())),)+
                }
            }

            pub fn set(&mut self, index: usize, value: Value) -> Result<()> {
                match self {
                    $(Self::$variant(v) => {
                        let len = v.len();
                        *v.get_mut(index).ok_or_else(|| out_of_range(index, len))? =
                            <$type as Primitive>::from_value(value)?;
                    })+
                }
                Ok(())
            }
        }

        impl Value {
            /// Read only view, `None` for blobs which are exchanged through a [`Blob`] object.
            pub fn scalar_ref(&self) -> Option<ScalarRef<'_>> {
                match self {
                    $(Value::$variant(v) => Some(ScalarRef::$variant(v)),)+
                    Value::Blob(..) => None,
                }
            }

            pub fn scalar_mut(&mut self) -> Option<ScalarMut<'_>> {
                match self {
                    $(Value::$variant(v) => Some(ScalarMut::$variant(v)),)+
                    Value::Blob(..) => None,
                }
            }
        }

        $(
            impl ExchangeTraits for $type {
                type Family = BasicType;
                const X_TYPE: ExchangeType = ExchangeType::$variant;
            }

            impl Basic for $type {
                fn scalar_ref(&self) -> ScalarRef<'_> {
                    ScalarRef::$variant(self)
                }

                fn scalar_mut(&mut self) -> ScalarMut<'_> {
                    ScalarMut::$variant(self)
                }
            }

            impl Primitive for $type {
                fn empty() -> Self {
                    $empty
                }

                fn to_value(&self) -> Value {
                    Value::$variant(self.clone())
                }

                fn from_value(value: Value) -> Result<Self> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        other => Err(mismatch(other.exchange_type(), ExchangeType::$variant)),
                    }
                }

                fn vector_ref(vector: &Vec<Self>) -> VectorRef<'_> {
                    VectorRef::$variant(vector)
                }

                fn vector_mut(vector: &mut Vec<Self>) -> VectorMut<'_> {
                    VectorMut::$variant(vector)
                }
            }
        )+
    };
}

exchange_types! {
    Char: char = '\0',
    String: String = String::new(),
    WString: WideString = WideString::default(),
    Int8: i8 = 0,
    UInt8: u8 = 0,
    Int16: i16 = 0,
    UInt16: u16 = 0,
    Int32: i32 = 0,
    UInt32: u32 = 0,
    Int64: i64 = 0,
    UInt64: u64 = 0,
    Double: f64 = 0.0,
    DateTime: PrimitiveDateTime = Date::MIN.midnight(),
    LongString: LongString = LongString::default(),
    XmlType: XmlType = XmlType::default(),
}

impl ExchangeTraits for Blob {
    type Family = BasicType;
    const X_TYPE: ExchangeType = ExchangeType::Blob;
}

impl Basic for Blob {
    fn scalar_ref(&self) -> ScalarRef<'_> {
        ScalarRef::Blob(self)
    }

    fn scalar_mut(&mut self) -> ScalarMut<'_> {
        ScalarMut::Blob(self)
    }
}

impl ExchangeTraits for RowId {
    type Family = BasicType;
    const X_TYPE: ExchangeType = ExchangeType::RowId;
}

impl Basic for RowId {
    fn scalar_ref(&self) -> ScalarRef<'_> {
        ScalarRef::RowId(self)
    }

    fn scalar_mut(&mut self) -> ScalarMut<'_> {
        ScalarMut::RowId(self)
    }
}

/// Use storage handed to `post_use`, read only bindings must never be modified by the backend.
#[derive(Debug)]
pub enum UseSlot<'v> {
    Const(ScalarRef<'v>),
    Mut(ScalarMut<'v>),
}

impl UseSlot<'_> {
    pub fn exchange_type(&self) -> ExchangeType {
        match self {
            UseSlot::Const(v) => v.exchange_type(),
            UseSlot::Mut(v) => v.exchange_type(),
        }
    }

    pub fn to_value(&self) -> Result<Value> {
        match self {
            UseSlot::Const(v) => v.to_value(),
            UseSlot::Mut(v) => v.to_value(),
        }
    }

    /// Stores a value the backend produced for an in/out parameter.
    pub fn write_back(self, value: Value) -> Result<()> {
        let value = value.cast(self.exchange_type())?;
        match self {
            UseSlot::Const(current) => {
                if current.to_value()? != value {
                    return Err(Error::msg("Attempted modification of const use element"));
                }
                Ok(())
            }
            UseSlot::Mut(target) => target.assign(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags() {
        assert_eq!(<i8 as ExchangeTraits>::X_TYPE, ExchangeType::Int8);
        assert_eq!(<Vec<u64> as ExchangeTraits>::X_TYPE, ExchangeType::UInt64);
        assert_eq!(<Option<f64> as ExchangeTraits>::X_TYPE, ExchangeType::Double);
        assert!(<<String as ExchangeTraits>::Family as TypeFamily>::BASIC);
        assert!(<<Vec<String> as ExchangeTraits>::Family as TypeFamily>::BASIC);
        assert!(!<<Option<i32> as ExchangeTraits>::Family as TypeFamily>::BASIC);
    }

    #[test]
    fn views() {
        let mut value = 5i32;
        assert_eq!(value.scalar_ref().exchange_type(), ExchangeType::Int32);
        value
            .scalar_mut()
            .assign(Value::Int32(9))
            .expect("same tag assignment");
        assert_eq!(value, 9);
        assert!(value.scalar_mut().assign(Value::Int64(9)).is_err());

        let mut vector = vec![String::from("a")];
        let mut view = String::vector_mut(&mut vector);
        view.resize(3);
        view.set(2, Value::String("c".into()))
            .expect("index is in range");
        assert!(view.set(3, Value::String("d".into())).is_err());
        assert_eq!(vector, ["a", "", "c"]);
    }

    #[test]
    fn write_back() {
        let constant = 1i64;
        UseSlot::Const(constant.scalar_ref())
            .write_back(Value::Int64(1))
            .expect("same value is not a modification");
        let error = UseSlot::Const(constant.scalar_ref())
            .write_back(Value::Int64(2))
            .expect_err("read only binding");
        assert_eq!(error.to_string(), "Attempted modification of const use element");

        let mut variable = 1i64;
        UseSlot::Mut(variable.scalar_mut())
            .write_back(Value::Int32(7))
            .expect("writable binding");
        assert_eq!(variable, 7);
    }

    #[test]
    fn optional() {
        let (base, indicator) = None::<i32>.to_base().expect("conversion");
        assert_eq!((base, indicator), (0, Indicator::Null));
        assert_eq!(
            Option::<i32>::from_base(&4, Indicator::Ok).expect("conversion"),
            Some(4)
        );
    }
}
