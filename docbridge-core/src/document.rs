//! Core traits and types for document representation and (de)serialization.
//!
//! The client never inspects a document: it hands raw field maps to a
//! [`DocumentCodec`] and gets typed values back. [`SerdeCodec`] covers every type
//! that derives `Serialize` and `Deserialize`; [`FnCodec`] wraps hand-written
//! conversion functions.

use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value, from_value, to_value};
use std::{fmt::Display, marker::PhantomData};
use uuid::Uuid;

use crate::error::CodecError;

/// The field map a backend stores for a document.
///
/// Records returned by a backend also carry its `$`-prefixed metadata
/// (`$id`, `$createdAt`, `$permissions`, ...).
pub type RawFields = Map<String, Value>;

/// Metadata key holding a document's identifier.
pub const ID_FIELD: &str = "$id";

/// Generates a fresh document identifier.
///
/// Identifiers are generated by the client, not the server: 32 lowercase hex
/// characters, unique across invocations.
pub fn unique_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Trait for types that live in a known collection.
///
/// Implementing this lets a [`DocumentClient`](crate::client::DocumentClient) be
/// built with [`SerdeCodec`] and the collection id inferred from the type.
///
/// # Example
///
/// ```ignore
/// use docbridge::document::Document;
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// pub struct Task {
///     #[serde(rename = "$id", default, skip_serializing)]
///     pub id: String,
///     pub title: String,
/// }
///
/// impl Document for Task {
///     fn collection_id() -> &'static str {
///         "tasks"
///     }
/// }
/// ```
pub trait Document: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Returns the id of the collection this document belongs to.
    fn collection_id() -> &'static str;
}

/// Converts between a document type and the raw fields a backend stores.
///
/// Implementations must be inverse to each other: `decode(encode(x))` has to
/// reconstruct an equivalent `x`. The client does not check this.
pub trait DocumentCodec<T>: Send + Sync {
    /// Builds a document from a record returned by the backend.
    fn decode(&self, fields: RawFields) -> Result<T, CodecError>;

    /// Turns a document into the fields sent to the backend.
    fn encode(&self, document: &T) -> Result<RawFields, CodecError>;
}

/// A [`DocumentCodec`] backed by the type's serde implementation.
pub struct SerdeCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> SerdeCodec<T> {
    pub fn new() -> Self {
        Self { _marker: PhantomData }
    }
}

impl<T> Default for SerdeCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> DocumentCodec<T> for SerdeCodec<T>
where
    T: Serialize + DeserializeOwned,
{
    fn decode(&self, fields: RawFields) -> Result<T, CodecError> {
        Ok(from_value(Value::Object(fields))?)
    }

    fn encode(&self, document: &T) -> Result<RawFields, CodecError> {
        match to_value(document)? {
            Value::Object(fields) => Ok(fields),
            other => Err(CodecError::NotAnObject(json_type_name(&other))),
        }
    }
}

type DecodeFn<T> = dyn Fn(RawFields) -> Result<T, CodecError> + Send + Sync;
type EncodeFn<T> = dyn Fn(&T) -> Result<RawFields, CodecError> + Send + Sync;

/// A [`DocumentCodec`] built from a pair of functions.
///
/// # Example
///
/// ```ignore
/// let codec = FnCodec::new(
///     |fields| Ok::<_, String>(Tag(fields["name"].as_str().unwrap_or_default().to_string())),
///     |tag: &Tag| Ok::<_, String>(serde_json::json!({ "name": tag.0 }).as_object().cloned().unwrap_or_default()),
/// );
/// ```
pub struct FnCodec<T> {
    decode: Box<DecodeFn<T>>,
    encode: Box<EncodeFn<T>>,
}

impl<T> FnCodec<T> {
    /// Creates a codec from a decode and an encode function.
    ///
    /// Errors returned by either function are kept as their display string.
    pub fn new<D, E, DE, EE>(decode: D, encode: E) -> Self
    where
        D: Fn(RawFields) -> Result<T, DE> + Send + Sync + 'static,
        E: Fn(&T) -> Result<RawFields, EE> + Send + Sync + 'static,
        DE: Display,
        EE: Display,
    {
        Self {
            decode: Box::new(move |fields| {
                decode(fields).map_err(|e| CodecError::Custom(e.to_string()))
            }),
            encode: Box::new(move |document| {
                encode(document).map_err(|e| CodecError::Custom(e.to_string()))
            }),
        }
    }
}

impl<T> DocumentCodec<T> for FnCodec<T> {
    fn decode(&self, fields: RawFields) -> Result<T, CodecError> {
        (self.decode)(fields)
    }

    fn encode(&self, document: &T) -> Result<RawFields, CodecError> {
        (self.encode)(document)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
