//! Single-value extraction from a filter's result sequence

use serde_json::Value;

/// Pull results until the first meaningful one.
///
/// An error stops extraction immediately and is returned; later results are
/// never evaluated. `null` results are skipped. `Ok(None)` means the
/// sequence ended without a non-null value.
pub fn first_value<I, E>(outputs: I) -> Result<Option<Value>, E>
where
    I: IntoIterator<Item = Result<Value, E>>,
{
    for output in outputs {
        match output? {
            Value::Null => continue,
            value => return Ok(Some(value)),
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;

    #[test]
    fn test_returns_first_value() {
        let outputs: Vec<Result<Value, String>> = vec![Ok(json!(1)), Ok(json!(2))];
        assert_eq!(first_value(outputs), Ok(Some(json!(1))));
    }

    #[test]
    fn test_skips_nulls() {
        let outputs: Vec<Result<Value, String>> =
            vec![Ok(Value::Null), Ok(Value::Null), Ok(json!({"a": 1}))];
        assert_eq!(first_value(outputs), Ok(Some(json!({"a": 1}))));
    }

    #[test]
    fn test_false_and_zero_are_values() {
        let outputs: Vec<Result<Value, String>> = vec![Ok(json!(false))];
        assert_eq!(first_value(outputs), Ok(Some(json!(false))));

        let outputs: Vec<Result<Value, String>> = vec![Ok(json!(0))];
        assert_eq!(first_value(outputs), Ok(Some(json!(0))));
    }

    #[test]
    fn test_empty_sequence() {
        let outputs: Vec<Result<Value, String>> = Vec::new();
        assert_eq!(first_value(outputs), Ok(None));
    }

    #[test]
    fn test_only_nulls() {
        let outputs: Vec<Result<Value, String>> = vec![Ok(Value::Null)];
        assert_eq!(first_value(outputs), Ok(None));
    }

    #[test]
    fn test_error_after_null_is_surfaced() {
        let outputs: Vec<Result<Value, String>> =
            vec![Ok(Value::Null), Err("boom".to_string()), Ok(json!(1))];
        assert_eq!(first_value(outputs), Err("boom".to_string()));
    }

    #[test]
    fn test_stops_pulling_after_error() {
        let pulled = Cell::new(0);
        let outputs = (0..10).map(|i| {
            pulled.set(pulled.get() + 1);
            if i == 0 {
                Err("first")
            } else {
                Ok(json!(i))
            }
        });

        assert_eq!(first_value(outputs), Err("first"));
        assert_eq!(pulled.get(), 1);
    }

    #[test]
    fn test_stops_pulling_after_value() {
        let pulled = Cell::new(0);
        let outputs = (0..10).map(|i| {
            pulled.set(pulled.get() + 1);
            Ok::<_, String>(if i < 2 { Value::Null } else { json!(i) })
        });

        assert_eq!(first_value(outputs), Ok(Some(json!(2))));
        assert_eq!(pulled.get(), 3);
    }
}
