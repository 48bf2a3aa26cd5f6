//! Deserialization boundary for JSON columns.
//!
//! Depending on which client wrote a row, a JSON column may hold the native
//! structure or the same structure serialized into a JSON string. Every entity
//! read from storage passes through [`decode`] once, right at the boundary, so
//! the rest of the crate only ever sees the canonical typed value.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{CoreError, CoreResult};

/// Normalizes a stored JSON value (native or string-encoded) into `T`.
///
/// `entity` names the field in error messages.
pub fn decode<T: DeserializeOwned>(entity: &str, value: Value) -> CoreResult<T> {
    let native = match value {
        Value::String(encoded) => serde_json::from_str::<Value>(&encoded).map_err(|e| {
            CoreError::Persistence(format!("{entity} holds a string that is not JSON: {e}"))
        })?,
        other => other,
    };
    serde_json::from_value(native)
        .map_err(|e| CoreError::Persistence(format!("{entity} has an unexpected shape: {e}")))
}

/// Like [`decode`], but treats SQL/JSON null as an empty default.
pub fn decode_or_default<T: DeserializeOwned + Default>(
    entity: &str,
    value: Option<Value>,
) -> CoreResult<T> {
    match value {
        None | Some(Value::Null) => Ok(T::default()),
        Some(v) => decode(entity, v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::{MessageRole, TranscriptMessage};
    use serde_json::json;

    #[test]
    fn test_decode_native_and_string_forms_agree() {
        let native = json!([{ "role": "user", "content": "Hola", "timestamp": 10 }]);
        let encoded = Value::String(native.to_string());

        let a: Vec<TranscriptMessage> = decode("transcript", native).unwrap();
        let b: Vec<TranscriptMessage> = decode("transcript", encoded).unwrap();

        assert_eq!(a, b);
        assert_eq!(a[0].role, MessageRole::User);
    }

    #[test]
    fn test_decode_rejects_garbage_string() {
        let err = decode::<Vec<TranscriptMessage>>("transcript", json!("not json")).unwrap_err();
        assert!(matches!(err, CoreError::Persistence(msg) if msg.contains("transcript")));
    }

    #[test]
    fn test_decode_or_default_handles_null() {
        let empty: Vec<TranscriptMessage> = decode_or_default("transcript", None).unwrap();
        assert!(empty.is_empty());
        let empty: Vec<TranscriptMessage> =
            decode_or_default("transcript", Some(Value::Null)).unwrap();
        assert!(empty.is_empty());
    }
}
