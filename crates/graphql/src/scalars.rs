//! Conversions between engine values and the JSON values resolvers see.

use {
    async_graphql::{Name, Value},
    serde_json::Value as Json,
};

#[derive(Debug, thiserror::Error)]
pub enum ScalarError {
    #[error("binary values are not accepted as arguments")]
    Binary,
}

/// An argument value as JSON. Enum values become their name.
pub fn to_json(value: Value) -> Result<Json, ScalarError> {
    Ok(match value {
        Value::Null => Json::Null,
        Value::Boolean(b) => Json::Bool(b),
        Value::String(s) => Json::String(s),
        Value::Enum(name) => Json::String(name.to_string()),
        Value::Number(n) => Json::Number(n),
        Value::List(items) => Json::Array(
            items
                .into_iter()
                .map(to_json)
                .collect::<Result<_, _>>()?,
        ),
        Value::Object(fields) => Json::Object(
            fields
                .into_iter()
                .map(|(name, v)| Ok((name.to_string(), to_json(v)?)))
                .collect::<Result<_, ScalarError>>()?,
        ),
        Value::Binary(_) => return Err(ScalarError::Binary),
    })
}

/// A scalar or list output value.
pub fn from_json(value: &Json) -> Value {
    match value {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Boolean(*b),
        Json::String(s) => Value::String(s.clone()),
        Json::Number(n) => Value::Number(n.clone()),
        Json::Array(items) => Value::List(items.iter().map(from_json).collect()),
        Json::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(k, v)| (Name::new(k), from_json(v)))
                .collect(),
        ),
    }
}

/// An output value for an enum-typed field: strings become enum names,
/// anything else is passed as-is and rejected by the engine.
pub fn enum_from_json(value: &Json) -> Value {
    match value {
        Json::String(s) => Value::Enum(Name::new(s)),
        other => from_json(other),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    #[test]
    fn arguments_convert_to_json() {
        let input = Value::from_json(json!({"id": "1", "tags": [2, null]})).unwrap();
        let Value::Object(mut fields) = input else {
            panic!("expected object");
        };
        fields.insert(Name::new("color"), Value::Enum(Name::new("RED")));
        let converted = to_json(Value::Object(fields)).unwrap();
        assert_eq!(converted, json!({"id": "1", "color": "RED", "tags": [2, null]}));
    }

    #[test]
    fn binary_is_rejected() {
        let err = to_json(Value::Binary(vec![1u8].into())).unwrap_err();
        assert!(matches!(err, ScalarError::Binary));
    }

    #[test]
    fn outputs_keep_numbers_and_nesting() {
        let value = from_json(&json!({"n": 1.5, "ok": true, "list": ["x"]}));
        let Value::Object(fields) = value else {
            panic!("expected object");
        };
        assert_eq!(fields[&Name::new("ok")], Value::Boolean(true));
        assert_eq!(fields[&Name::new("list")], Value::List(vec![Value::String("x".into())]));
        assert_eq!(to_json(fields[&Name::new("n")].clone()).unwrap(), json!(1.5));
    }

    #[test]
    fn enum_outputs_use_names() {
        assert_eq!(enum_from_json(&json!("BLACK")), Value::Enum(Name::new("BLACK")));
        assert_eq!(enum_from_json(&json!(3)), Value::Number(3.into()));
    }
}
