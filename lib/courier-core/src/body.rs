//! Body encoding and decoding utilities.

use bytes::Bytes;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full};

use crate::Result;

/// Response body stream, read once.
pub type Body = UnsyncBoxBody<Bytes, crate::Error>;

/// Content types courier sets on request bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    /// Form URL-encoded content type (`application/x-www-form-urlencoded`).
    FormUrlEncoded,
    /// Binary content type (`application/octet-stream`).
    OctetStream,
}

impl ContentType {
    /// Get the MIME type string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::FormUrlEncoded => "application/x-www-form-urlencoded",
            Self::OctetStream => "application/octet-stream",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encode ordered key/value pairs as an `application/x-www-form-urlencoded` body.
///
/// Pairs keep their order; repeated keys are repeated in the output.
///
/// # Example
///
/// ```
/// use courier_core::encode_form;
///
/// let fields = vec![
///     ("name".to_string(), "John Doe".to_string()),
///     ("tag".to_string(), "a&b".to_string()),
/// ];
/// let body = encode_form(&fields).expect("encode");
/// assert_eq!(body.as_ref(), b"name=John+Doe&tag=a%26b");
/// ```
pub fn encode_form(fields: &[(String, String)]) -> Result<Bytes> {
    serde_urlencoded::to_string(fields)
        .map(|s| Bytes::from(s.into_bytes()))
        .map_err(Into::into)
}

/// Deserialize JSON bytes to a value with path-aware error messages.
///
/// Uses `serde_path_to_error` so the error names the field that failed
/// (e.g., "user.address.city").
pub fn from_json<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
        crate::Error::json_deserialization(e.path().to_string(), e.inner().to_string())
    })
}

/// A body holding the given bytes.
#[must_use]
pub fn full(data: impl Into<Bytes>) -> Body {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed_unsync()
}

/// A body with no data.
#[must_use]
pub fn empty() -> Body {
    Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed_unsync()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_as_str() {
        assert_eq!(
            ContentType::FormUrlEncoded.as_str(),
            "application/x-www-form-urlencoded"
        );
        assert_eq!(ContentType::OctetStream.to_string(), "application/octet-stream");
    }

    #[test]
    fn encode_form_keeps_call_order() {
        let fields = vec![
            ("zeta".to_string(), "1".to_string()),
            ("alpha".to_string(), "2".to_string()),
            ("zeta".to_string(), "3".to_string()),
        ];
        let body = encode_form(&fields).expect("encode");
        assert_eq!(body.as_ref(), b"zeta=1&alpha=2&zeta=3");
    }

    #[test]
    fn encode_form_escapes() {
        let fields = vec![("q".to_string(), "rust & go/=?".to_string())];
        let body = encode_form(&fields).expect("encode");
        assert_eq!(body.as_ref(), b"q=rust+%26+go%2F%3D%3F");
    }

    #[test]
    fn encode_form_empty() {
        let body = encode_form(&[]).expect("encode");
        assert!(body.is_empty());
    }

    #[test]
    fn from_json_missing_field_error_with_path() {
        #[derive(Debug, serde::Deserialize)]
        struct Address {
            #[allow(dead_code)]
            city: String,
        }

        #[derive(Debug, serde::Deserialize)]
        struct User {
            #[allow(dead_code)]
            address: Address,
        }

        let result: Result<User> = from_json(br#"{"address":{}}"#);
        let msg = result.expect_err("should fail").to_string();
        assert!(msg.contains("address"), "Expected path in error: {msg}");
        assert!(msg.contains("city"), "Expected field in error: {msg}");
    }

    #[tokio::test]
    async fn full_and_empty_bodies() {
        let collected = full("payload").collect().await.expect("collect");
        assert_eq!(collected.to_bytes().as_ref(), b"payload");

        let collected = empty().collect().await.expect("collect");
        assert!(collected.to_bytes().is_empty());
    }
}
