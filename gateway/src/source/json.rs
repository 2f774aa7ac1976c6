//! JSON frame decoders
//!
//! [`JsonDecoder`] handles plain JSON - a single payload object or an array
//! of them. [`Base64JsonDecoder`] handles the managed event-hub framing the
//! original deployment used, where the JSON body arrives base64-encoded.

use base64::Engine as _;
use serde_json::Value;

use parkhub_core::{AdapterError, SensorPayload};

use super::SensorDecoder;

/// Decoder for plain JSON frames
///
/// Accepts either a single payload object or an array of payload objects.
/// Field spellings follow the [`SensorPayload`] schema, firmware aliases
/// included.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonDecoder;

impl JsonDecoder {
    /// Create a new JSON decoder
    pub fn new() -> Self {
        Self
    }
}

impl SensorDecoder for JsonDecoder {
    fn name(&self) -> &'static str {
        "json"
    }

    fn decode(&self, data: &[u8]) -> Result<Vec<SensorPayload>, AdapterError> {
        let value: Value =
            serde_json::from_slice(data).map_err(|e| AdapterError::Decode(e.to_string()))?;

        match value {
            Value::Array(items) => items
                .into_iter()
                .map(|item| {
                    serde_json::from_value(item).map_err(|e| AdapterError::Decode(e.to_string()))
                })
                .collect(),
            object => Ok(vec![
                serde_json::from_value(object).map_err(|e| AdapterError::Decode(e.to_string()))?,
            ]),
        }
    }
}

/// Decoder for base64-wrapped JSON frames (event-hub framing)
#[derive(Debug, Default, Clone, Copy)]
pub struct Base64JsonDecoder {
    inner: JsonDecoder,
}

impl Base64JsonDecoder {
    /// Create a new base64+JSON decoder
    pub fn new() -> Self {
        Self { inner: JsonDecoder }
    }
}

impl SensorDecoder for Base64JsonDecoder {
    fn name(&self) -> &'static str {
        "base64-json"
    }

    fn decode(&self, data: &[u8]) -> Result<Vec<SensorPayload>, AdapterError> {
        let text = std::str::from_utf8(data)
            .map_err(|e| AdapterError::Decode(format!("frame is not utf-8: {e}")))?;
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(text.trim())
            .map_err(|e| AdapterError::Decode(format!("bad base64 framing: {e}")))?;
        self.inner.decode(&decoded)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn single_object_decodes() {
        let payloads = JsonDecoder::new()
            .decode(br#"{"identity":"spot4L2","occupied":true}"#)
            .unwrap();
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0].identity, "spot4L2");
        assert_eq!(payloads[0].occupied, Some(true));
    }

    #[test]
    fn array_of_objects_decodes() {
        let payloads = JsonDecoder::new()
            .decode(br#"[{"identity":"a"},{"identity":"b","occupied":false}]"#)
            .unwrap();
        assert_eq!(payloads.len(), 2);
        assert_eq!(payloads[1].identity, "b");
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let err = JsonDecoder::new().decode(b"--not json--").unwrap_err();
        assert!(matches!(err, AdapterError::Decode(_)));
    }

    #[test]
    fn base64_framing_unwraps() {
        let body = base64::engine::general_purpose::STANDARD
            .encode(r#"{"deviceId":"spot4L2","isCarParked":true,"leftDistance":41.0}"#);
        let payloads = Base64JsonDecoder::new().decode(body.as_bytes()).unwrap();
        assert_eq!(payloads[0].identity, "spot4L2");
        assert_eq!(payloads[0].readings().left_distance, Some(41.0));
    }

    #[test]
    fn base64_framing_tolerates_trailing_newline() {
        let mut body = base64::engine::general_purpose::STANDARD.encode(r#"{"identity":"a"}"#);
        body.push('\n');
        assert!(Base64JsonDecoder::new().decode(body.as_bytes()).is_ok());
    }

    #[test]
    fn bad_base64_is_a_decode_error() {
        let err = Base64JsonDecoder::new().decode(b"!!!!").unwrap_err();
        assert!(matches!(err, AdapterError::Decode(_)));
    }
}
