#[cfg(test)]
mod tests {
    use sluice_core::{
        DataType, ExchangeType, LongString, Value, WideString, XmlType, format_date_time,
        parse_date_time,
    };
    use time::macros::datetime;

    #[test]
    fn casts() {
        macro_rules! test_cast {
            ($value:expr, $target:ident, $expected:expr) => {{
                assert_eq!(
                    $value
                        .cast(ExchangeType::$target)
                        .expect(concat!("Could not cast to ", stringify!($target))),
                    $expected
                );
            }};
            ($value:expr, $target:ident) => {{
                assert!(
                    $value.cast(ExchangeType::$target).is_err(),
                    concat!("Cast to ", stringify!($target), " should fail")
                );
            }};
        }

        test_cast!(Value::Int8(-1), Int64, Value::Int64(-1));
        test_cast!(Value::Int8(-1), UInt8);
        test_cast!(Value::UInt8(255), Int8);
        test_cast!(Value::UInt16(65535), Int32, Value::Int32(65535));
        test_cast!(Value::Int64(i64::MAX), UInt64, Value::UInt64(i64::MAX as u64));
        test_cast!(Value::UInt64(u64::MAX), Int64);
        test_cast!(Value::Int32(7), Double, Value::Double(7.0));
        test_cast!(Value::Double(-3.0), Int16, Value::Int16(-3));
        test_cast!(Value::Double(f64::NAN), Int16);
        test_cast!(Value::Double(0.5), String, Value::String("0.5".into()));
        test_cast!(Value::String("12".into()), UInt8, Value::UInt8(12));
        test_cast!(Value::String("12a".into()), UInt8);
        test_cast!(Value::String("".into()), Int32);
        test_cast!(Value::String("1e3".into()), Double, Value::Double(1000.0));
        test_cast!(
            Value::String("hello".into()),
            WString,
            Value::WString(WideString::from("hello"))
        );
        test_cast!(
            Value::WString("wide".into()),
            LongString,
            Value::LongString(LongString::from("wide"))
        );
        test_cast!(
            Value::XmlType(XmlType::from("<a/>")),
            String,
            Value::String("<a/>".into())
        );
        test_cast!(
            Value::String("2001-09-09 01:46:40".into()),
            DateTime,
            Value::DateTime(datetime!(2001-09-09 01:46:40))
        );
        test_cast!(
            Value::DateTime(datetime!(2001-09-09 01:46:40.5)),
            String,
            Value::String("2001-09-09 01:46:40.5".into())
        );
        test_cast!(Value::DateTime(datetime!(2001-09-09 01:46:40)), Int64);
        test_cast!(Value::Blob(b"abc".to_vec()), String, Value::String("abc".into()));
        test_cast!(Value::Blob(vec![0xff, 0xfe]), String);
        test_cast!(Value::String("abc".into()), Blob, Value::Blob(b"abc".to_vec()));
        test_cast!(Value::Int32(1), Blob);
        test_cast!(Value::Int32(1), Statement);
        test_cast!(Value::Char('9'), Int32, Value::Int32(9));
    }

    #[test]
    fn error_message() {
        let error = Value::Int32(300)
            .cast(ExchangeType::Int8)
            .expect_err("300 does not fit");
        assert_eq!(error.to_string(), "Cannot convert data (int32 `300` to int8)");
    }

    #[test]
    fn wide_strings() {
        let value = WideString::from("naïve ☃");
        assert_eq!(value.decode().expect("valid UTF-16"), "naïve ☃");
        assert!(WideString(vec![0xd800]).decode().is_err());
    }

    #[test]
    fn defaults() {
        assert_eq!(Value::default_for(ExchangeType::Int32), Some(Value::Int32(0)));
        assert_eq!(
            Value::default_for(ExchangeType::String),
            Some(Value::String(String::new()))
        );
        assert_eq!(Value::default_for(ExchangeType::RowId), None);
        assert_eq!(Value::default_for(ExchangeType::Statement), None);
    }

    #[test]
    fn data_types() {
        for data_type in [
            DataType::String,
            DataType::Date,
            DataType::Double,
            DataType::Integer,
            DataType::LongLong,
            DataType::UnsignedLong,
            DataType::UnsignedLongLong,
            DataType::Blob,
        ] {
            assert_eq!(
                DataType::from_exchange_type(data_type.exchange_type()),
                Some(data_type)
            );
        }
        assert_eq!(DataType::from_exchange_type(ExchangeType::Int8), Some(DataType::Integer));
        assert_eq!(DataType::from_exchange_type(ExchangeType::XmlType), Some(DataType::String));
        assert!(ExchangeType::UInt16.is_integer());
        assert!(!ExchangeType::Double.is_integer());
        assert!(ExchangeType::LongString.is_text());
    }

    #[test]
    fn date_times() {
        let value = datetime!(1969-07-20 20:17:40);
        assert_eq!(
            format_date_time(&value).expect("Could not format"),
            "1969-07-20 20:17:40"
        );
        assert_eq!(parse_date_time(" 1969-07-20 20:17:40 "), Some(value));
        assert_eq!(parse_date_time("1969-07-20T20:17:40"), Some(value));
        assert_eq!(parse_date_time("20:17:40"), None);
        assert_eq!(
            Value::DateTime(value).to_string(),
            "'1969-07-20 20:17:40'"
        );
    }
}
