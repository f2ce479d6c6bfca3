use crate::{Error, ExchangeType, Indicator, Result, ScalarMut, Value, VectorMut};

/// Converts a value read from a backend buffer to the tag of the binding receiving it.
///
/// Text fetched into a char keeps the first character and reports the value as truncated.
pub fn convert_fetched(value: Value, target: ExchangeType) -> Result<(Value, Indicator)> {
    if target == ExchangeType::Char && value.exchange_type() != ExchangeType::Char {
        if let Value::String(text) = &value {
            let mut chars = text.chars();
            return Ok(match (chars.next(), chars.next()) {
                (Some(c), None) => (Value::Char(c), Indicator::Ok),
                (Some(c), Some(..)) => (Value::Char(c), Indicator::Truncated),
                (None, ..) => (Value::Char('\0'), Indicator::Ok),
            });
        }
    }
    Ok((value.cast(target)?, Indicator::Ok))
}

fn null_without_indicator() -> Error {
    Error::msg("Null value fetched and no indicator defined.")
}

/// Stores a fetched column in the caller storage of a scalar into binding.
///
/// `None` is a SQL NULL: it is only accepted when the binding has an indicator, the target is left
/// untouched in that case.
pub fn store_fetched(
    value: Option<Value>,
    target: ScalarMut<'_>,
    indicator: Option<&mut Indicator>,
) -> Result<()> {
    let Some(value) = value else {
        let Some(indicator) = indicator else {
            return Err(null_without_indicator());
        };
        *indicator = Indicator::Null;
        return Ok(());
    };
    let (value, state) = convert_fetched(value, target.exchange_type())?;
    target.assign(value)?;
    if let Some(indicator) = indicator {
        *indicator = state;
    }
    Ok(())
}

/// Vector counterpart of [`store_fetched`], `index` is the absolute position in the caller vector.
pub fn store_fetched_row(
    value: Option<Value>,
    target: &mut VectorMut<'_>,
    index: usize,
    indicators: Option<&mut Vec<Indicator>>,
) -> Result<()> {
    let state = match value {
        None => {
            if indicators.is_none() {
                return Err(null_without_indicator());
            }
            Indicator::Null
        }
        Some(value) => {
            let (value, state) = convert_fetched(value, target.exchange_type())?;
            target.set(index, value)?;
            state
        }
    };
    if let Some(indicators) = indicators {
        if indicators.len() <= index {
            indicators.resize(index + 1, Indicator::Ok);
        }
        indicators[index] = state;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Basic, Primitive};

    #[test]
    fn null_needs_indicator() {
        let mut target = 7i32;
        let error = store_fetched(None, target.scalar_mut(), None).expect_err("no indicator");
        assert_eq!(
            error.to_string(),
            "Null value fetched and no indicator defined."
        );
        let mut indicator = Indicator::Ok;
        store_fetched(None, target.scalar_mut(), Some(&mut indicator)).expect("has indicator");
        assert_eq!(indicator, Indicator::Null);
        assert_eq!(target, 7);
    }

    #[test]
    fn char_truncation() {
        let mut target = ' ';
        let mut indicator = Indicator::Ok;
        store_fetched(
            Some(Value::String("abc".into())),
            target.scalar_mut(),
            Some(&mut indicator),
        )
        .expect("text fits a char with truncation");
        assert_eq!((target, indicator), ('a', Indicator::Truncated));
    }

    #[test]
    fn vector_rows() {
        let mut data = vec![0i64; 3];
        let mut indicators = Vec::new();
        let mut view = i64::vector_mut(&mut data);
        store_fetched_row(Some(Value::Int32(4)), &mut view, 0, Some(&mut indicators))
            .expect("integer widening");
        store_fetched_row(None, &mut view, 2, Some(&mut indicators)).expect("null with indicator");
        assert!(store_fetched_row(None, &mut view, 1, None).is_err());
        assert_eq!(data, [4, 0, 0]);
        assert_eq!(indicators, [Indicator::Ok, Indicator::Ok, Indicator::Null]);
    }
}
