use std::fmt::{self, Display};

/// Closed set of portable value kinds a binding can carry.
///
/// Every use or into binding is tagged with exactly one of these and backends only ever dispatch
/// on this enum, never on the caller's Rust type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExchangeType {
    Char,
    String,
    WString,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Double,
    DateTime,
    LongString,
    XmlType,
    Blob,
    Statement,
    RowId,
}

impl ExchangeType {
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            ExchangeType::Int8
                | ExchangeType::UInt8
                | ExchangeType::Int16
                | ExchangeType::UInt16
                | ExchangeType::Int32
                | ExchangeType::UInt32
                | ExchangeType::Int64
                | ExchangeType::UInt64
        )
    }

    pub fn is_text(&self) -> bool {
        matches!(
            self,
            ExchangeType::Char
                | ExchangeType::String
                | ExchangeType::WString
                | ExchangeType::LongString
                | ExchangeType::XmlType
        )
    }
}

impl Display for ExchangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExchangeType::Char => "char",
            ExchangeType::String => "string",
            ExchangeType::WString => "wide string",
            ExchangeType::Int8 => "int8",
            ExchangeType::UInt8 => "uint8",
            ExchangeType::Int16 => "int16",
            ExchangeType::UInt16 => "uint16",
            ExchangeType::Int32 => "int32",
            ExchangeType::UInt32 => "uint32",
            ExchangeType::Int64 => "int64",
            ExchangeType::UInt64 => "uint64",
            ExchangeType::Double => "double",
            ExchangeType::DateTime => "date time",
            ExchangeType::LongString => "long string",
            ExchangeType::XmlType => "xml",
            ExchangeType::Blob => "blob",
            ExchangeType::Statement => "statement",
            ExchangeType::RowId => "row id",
        })
    }
}

/// State of a single value after an exchange.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Indicator {
    #[default]
    Ok,
    Null,
    /// The fetched value did not fit the destination.
    Truncated,
}

/// Portable column type reported by `describe_column`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    String,
    Date,
    Double,
    Integer,
    LongLong,
    UnsignedLong,
    UnsignedLongLong,
    Blob,
}

impl DataType {
    /// Exchange type used to receive a column of this type.
    pub fn exchange_type(&self) -> ExchangeType {
        match self {
            DataType::String => ExchangeType::String,
            DataType::Date => ExchangeType::DateTime,
            DataType::Double => ExchangeType::Double,
            DataType::Integer => ExchangeType::Int32,
            DataType::LongLong => ExchangeType::Int64,
            DataType::UnsignedLong => ExchangeType::UInt32,
            DataType::UnsignedLongLong => ExchangeType::UInt64,
            DataType::Blob => ExchangeType::Blob,
        }
    }

    /// Column type that best describes values of the given exchange type.
    pub fn from_exchange_type(exchange_type: ExchangeType) -> Option<DataType> {
        Some(match exchange_type {
            ExchangeType::Char
            | ExchangeType::String
            | ExchangeType::WString
            | ExchangeType::LongString
            | ExchangeType::XmlType => DataType::String,
            ExchangeType::Int8
            | ExchangeType::UInt8
            | ExchangeType::Int16
            | ExchangeType::UInt16
            | ExchangeType::Int32 => DataType::Integer,
            ExchangeType::UInt32 => DataType::UnsignedLong,
            ExchangeType::Int64 => DataType::LongLong,
            ExchangeType::UInt64 => DataType::UnsignedLongLong,
            ExchangeType::Double => DataType::Double,
            ExchangeType::DateTime => DataType::Date,
            ExchangeType::Blob => DataType::Blob,
            ExchangeType::Statement | ExchangeType::RowId => return None,
        })
    }
}

/// How the statement is going to be used once prepared.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum StatementType {
    /// Executed once then discarded.
    OneTimeQuery,
    /// Compiled once, executed many times with fresh use values.
    #[default]
    RepeatableQuery,
}

/// Outcome reported by a backend `execute` or `fetch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecFetchResult {
    /// A full batch of rows is ready.
    Success,
    /// End of rowset, some rows of the last batch may still be buffered.
    NoData,
}
