use crate::{Error, ExchangeType, Result};
use atoi::FromRadix10SignedChecked;
use std::fmt::{self, Display, Write};
use time::{
    Date, PrimitiveDateTime, format_description::BorrowedFormatItem, macros::format_description,
};

const DATE_TIME: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
const DATE_TIME_FRACTION: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]");
const DATE_TIME_PARSE: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day] [hour]:[minute]:[second][optional [.[subsecond]]]"
);
const DATE_TIME_ISO_PARSE: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"
);
const DATE: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// UTF-16 string, exchanged with the wide string tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct WideString(pub Vec<u16>);

impl WideString {
    pub fn decode(&self) -> Result<String> {
        String::from_utf16(&self.0)
            .map_err(|e| Error::new(e).context("Wide string is not valid UTF-16"))
    }
}

impl From<&str> for WideString {
    fn from(value: &str) -> Self {
        Self(value.encode_utf16().collect())
    }
}

impl From<String> for WideString {
    fn from(value: String) -> Self {
        value.as_str().into()
    }
}

/// Character large object, text that backends store out of line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct LongString(pub String);

impl From<&str> for LongString {
    fn from(value: &str) -> Self {
        Self(value.into())
    }
}

impl From<String> for LongString {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Xml document carried as text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct XmlType(pub String);

impl From<&str> for XmlType {
    fn from(value: &str) -> Self {
        Self(value.into())
    }
}

impl From<String> for XmlType {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Owned value of one of the portable exchange types.
///
/// Absence of a value (SQL NULL) is never a `Value`, it is expressed through `Option<Value>` or an
/// `Indicator`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Char(char),
    String(String),
    WString(WideString),
    Int8(i8),
    UInt8(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Double(f64),
    DateTime(PrimitiveDateTime),
    LongString(LongString),
    XmlType(XmlType),
    Blob(Vec<u8>),
}

enum Scalar {
    Integer(i128),
    Double(f64),
    Text(String),
    DateTime(PrimitiveDateTime),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn exchange_type(&self) -> ExchangeType {
        match self {
            Value::Char(..) => ExchangeType::Char,
            Value::String(..) => ExchangeType::String,
            Value::WString(..) => ExchangeType::WString,
            Value::Int8(..) => ExchangeType::Int8,
            Value::UInt8(..) => ExchangeType::UInt8,
            Value::Int16(..) => ExchangeType::Int16,
            Value::UInt16(..) => ExchangeType::UInt16,
            Value::Int32(..) => ExchangeType::Int32,
            Value::UInt32(..) => ExchangeType::UInt32,
            Value::Int64(..) => ExchangeType::Int64,
            Value::UInt64(..) => ExchangeType::UInt64,
            Value::Double(..) => ExchangeType::Double,
            Value::DateTime(..) => ExchangeType::DateTime,
            Value::LongString(..) => ExchangeType::LongString,
            Value::XmlType(..) => ExchangeType::XmlType,
            Value::Blob(..) => ExchangeType::Blob,
        }
    }

    /// Empty value of the given type, `None` for types that have no owned representation.
    pub fn default_for(exchange_type: ExchangeType) -> Option<Value> {
        Some(match exchange_type {
            ExchangeType::Char => Value::Char('\0'),
            ExchangeType::String => Value::String(Default::default()),
            ExchangeType::WString => Value::WString(Default::default()),
            ExchangeType::Int8 => Value::Int8(0),
            ExchangeType::UInt8 => Value::UInt8(0),
            ExchangeType::Int16 => Value::Int16(0),
            ExchangeType::UInt16 => Value::UInt16(0),
            ExchangeType::Int32 => Value::Int32(0),
            ExchangeType::UInt32 => Value::UInt32(0),
            ExchangeType::Int64 => Value::Int64(0),
            ExchangeType::UInt64 => Value::UInt64(0),
            ExchangeType::Double => Value::Double(0.0),
            ExchangeType::DateTime => Value::DateTime(Date::MIN.midnight()),
            ExchangeType::LongString => Value::LongString(Default::default()),
            ExchangeType::XmlType => Value::XmlType(Default::default()),
            ExchangeType::Blob => Value::Blob(Default::default()),
            ExchangeType::Statement | ExchangeType::RowId => return None,
        })
    }

    /// Checked conversion into another exchange type.
    ///
    /// Numbers are range checked, text is parsed only when the whole content is a valid literal of
    /// the target type. Anything lossy is rejected.
    pub fn cast(self, target: ExchangeType) -> Result<Value> {
        let source = self.exchange_type();
        if source == target {
            return Ok(self);
        }
        let fail = |value: &dyn Display| {
            Error::msg(format!(
                "Cannot convert data ({} `{}` to {})",
                source, value, target
            ))
        };
        let dump = self.to_string();
        let scalar = match self {
            Value::Char(v) => Scalar::Text(v.into()),
            Value::String(v) => Scalar::Text(v),
            Value::WString(v) => Scalar::Text(v.decode()?),
            Value::Int8(v) => Scalar::Integer(v.into()),
            Value::UInt8(v) => Scalar::Integer(v.into()),
            Value::Int16(v) => Scalar::Integer(v.into()),
            Value::UInt16(v) => Scalar::Integer(v.into()),
            Value::Int32(v) => Scalar::Integer(v.into()),
            Value::UInt32(v) => Scalar::Integer(v.into()),
            Value::Int64(v) => Scalar::Integer(v.into()),
            Value::UInt64(v) => Scalar::Integer(v.into()),
            Value::Double(v) => Scalar::Double(v),
            Value::DateTime(v) => Scalar::DateTime(v),
            Value::LongString(v) => Scalar::Text(v.0),
            Value::XmlType(v) => Scalar::Text(v.0),
            Value::Blob(v) => Scalar::Bytes(v),
        };
        if target.is_integer() {
            let integer = match scalar {
                Scalar::Integer(v) => v,
                Scalar::Double(v)
                    if v.is_finite()
                        && v.fract() == 0.0
                        && v >= i128::MIN as f64
                        && v <= i128::MAX as f64 =>
                {
                    v as i128
                }
                Scalar::Text(ref v) => parse_integer(v).ok_or_else(|| fail(&dump))?,
                _ => return Err(fail(&dump)),
            };
            return integer_value(integer, target).ok_or_else(|| fail(&dump));
        }
        Ok(match target {
            ExchangeType::Double => Value::Double(match scalar {
                Scalar::Integer(v) => v as f64,
                Scalar::Double(v) => v,
                Scalar::Text(v) => fast_float::parse(v.trim()).map_err(|_| fail(&dump))?,
                _ => return Err(fail(&dump)),
            }),
            ExchangeType::Char => match scalar {
                Scalar::Text(v) => {
                    let mut chars = v.chars();
                    match (chars.next(), chars.next()) {
                        (Some(c), None) => Value::Char(c),
                        _ => return Err(fail(&dump)),
                    }
                }
                _ => return Err(fail(&dump)),
            },
            ExchangeType::String
            | ExchangeType::WString
            | ExchangeType::LongString
            | ExchangeType::XmlType => {
                let text = match scalar {
                    Scalar::Integer(v) => itoa::Buffer::new().format(v).to_string(),
                    Scalar::Double(v) => ryu::Buffer::new().format(v).to_string(),
                    Scalar::Text(v) => v,
                    Scalar::DateTime(v) => format_date_time(&v)?,
                    Scalar::Bytes(v) => String::from_utf8(v).map_err(|_| fail(&dump))?,
                };
                match target {
                    ExchangeType::WString => Value::WString(text.into()),
                    ExchangeType::LongString => Value::LongString(text.into()),
                    ExchangeType::XmlType => Value::XmlType(text.into()),
                    _ => Value::String(text),
                }
            }
            ExchangeType::DateTime => match scalar {
                Scalar::Text(v) => Value::DateTime(parse_date_time(&v).ok_or_else(|| fail(&dump))?),
                _ => return Err(fail(&dump)),
            },
            ExchangeType::Blob => match scalar {
                Scalar::Bytes(v) => Value::Blob(v),
                Scalar::Text(v) => Value::Blob(v.into_bytes()),
                _ => return Err(fail(&dump)),
            },
            _ => return Err(fail(&dump)),
        })
    }
}

fn parse_integer(text: &str) -> Option<i128> {
    let text = text.trim().as_bytes();
    match i128::from_radix_10_signed_checked(text) {
        (Some(v), used) if used == text.len() && used > 0 => Some(v),
        _ => None,
    }
}

fn integer_value(v: i128, target: ExchangeType) -> Option<Value> {
    Some(match target {
        ExchangeType::Int8 => Value::Int8(v.try_into().ok()?),
        ExchangeType::UInt8 => Value::UInt8(v.try_into().ok()?),
        ExchangeType::Int16 => Value::Int16(v.try_into().ok()?),
        ExchangeType::UInt16 => Value::UInt16(v.try_into().ok()?),
        ExchangeType::Int32 => Value::Int32(v.try_into().ok()?),
        ExchangeType::UInt32 => Value::UInt32(v.try_into().ok()?),
        ExchangeType::Int64 => Value::Int64(v.try_into().ok()?),
        ExchangeType::UInt64 => Value::UInt64(v.try_into().ok()?),
        _ => return None,
    })
}

/// Text form used by backends that exchange date times as strings.
pub fn format_date_time(value: &PrimitiveDateTime) -> Result<String> {
    let format = if value.nanosecond() == 0 {
        DATE_TIME
    } else {
        DATE_TIME_FRACTION
    };
    value
        .format(format)
        .map_err(|e| Error::new(e).context("Could not format the date time value"))
}

/// Parses `YYYY-MM-DD HH:MM:SS[.fraction]`, the ISO `T` separated form, or a bare date.
pub fn parse_date_time(value: &str) -> Option<PrimitiveDateTime> {
    let value = value.trim();
    PrimitiveDateTime::parse(value, DATE_TIME_PARSE)
        .or_else(|_| PrimitiveDateTime::parse(value, DATE_TIME_ISO_PARSE))
        .ok()
        .or_else(|| Date::parse(value, DATE).ok().map(|v| v.midnight()))
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Char(v) => write!(f, "'{}'", v),
            Value::String(v) | Value::LongString(LongString(v)) | Value::XmlType(XmlType(v)) => {
                write!(f, "'{}'", v)
            }
            Value::WString(v) => write!(f, "'{}'", String::from_utf16_lossy(&v.0)),
            Value::Int8(v) => write!(f, "{}", v),
            Value::UInt8(v) => write!(f, "{}", v),
            Value::Int16(v) => write!(f, "{}", v),
            Value::UInt16(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::UInt32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::UInt64(v) => write!(f, "{}", v),
            Value::Double(v) => f.write_str(ryu::Buffer::new().format(*v)),
            Value::DateTime(v) => match format_date_time(v) {
                Ok(v) => write!(f, "'{}'", v),
                Err(..) => write!(f, "{:?}", v),
            },
            Value::Blob(v) => {
                f.write_str("X'")?;
                f.write_str(&hex::encode_upper(v))?;
                f.write_char('\'')
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn cast_integers() {
        assert_eq!(
            Value::Int64(100).cast(ExchangeType::Int8).expect("100 fits in i8"),
            Value::Int8(100)
        );
        assert!(Value::Int64(300).cast(ExchangeType::Int8).is_err());
        assert!(Value::Int32(-1).cast(ExchangeType::UInt32).is_err());
        assert_eq!(
            Value::Double(42.0).cast(ExchangeType::Int32).expect("integral double"),
            Value::Int32(42)
        );
        assert!(Value::Double(1.5).cast(ExchangeType::Int32).is_err());
    }

    #[test]
    fn cast_text() {
        assert_eq!(
            Value::String(" -17 ".into())
                .cast(ExchangeType::Int16)
                .expect("numeric text"),
            Value::Int16(-17)
        );
        let error = Value::String("true".into())
            .cast(ExchangeType::Int32)
            .expect_err("not a number");
        assert!(error.to_string().starts_with("Cannot convert data"));
        assert_eq!(
            Value::String("2.5".into())
                .cast(ExchangeType::Double)
                .expect("float text"),
            Value::Double(2.5)
        );
        assert_eq!(
            Value::UInt64(u64::MAX)
                .cast(ExchangeType::String)
                .expect("any integer formats"),
            Value::String("18446744073709551615".into())
        );
        assert_eq!(
            Value::String("x".into())
                .cast(ExchangeType::Char)
                .expect("single char"),
            Value::Char('x')
        );
        assert!(Value::String("xy".into()).cast(ExchangeType::Char).is_err());
    }

    #[test]
    fn date_time_text() {
        let value = datetime!(2024-02-29 13:45:10);
        let text = format_date_time(&value).expect("formats");
        assert_eq!(text, "2024-02-29 13:45:10");
        assert_eq!(parse_date_time(&text), Some(value));
        assert_eq!(
            parse_date_time("2024-02-29T13:45:10.25"),
            Some(datetime!(2024-02-29 13:45:10.25))
        );
        assert_eq!(
            parse_date_time("1999-12-31"),
            Some(datetime!(1999-12-31 0:00))
        );
        assert_eq!(parse_date_time("yesterday"), None);
    }

    #[test]
    fn display() {
        assert_eq!(Value::Blob(vec![0xde, 0xad]).to_string(), "X'DEAD'");
        assert_eq!(Value::String("a".into()).to_string(), "'a'");
        assert_eq!(Value::WString("w".into()).to_string(), "'w'");
    }
}
