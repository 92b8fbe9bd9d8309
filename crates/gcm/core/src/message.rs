//! FCM message bodies.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

/// Top-level key holding the message itself; options may not override it.
const MESSAGE_KEY: &str = "message";

/// Notification payload.
///
/// Values are coerced to strings on insertion: strings are kept verbatim and
/// any other JSON value is stored as its JSON text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Payload(BTreeMap<String, String>);

impl Payload {
    /// Create an empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key, coercing the value to a string.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert a key, coercing the value to a string.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), coerce(value.into()));
    }

    /// Build a payload from a JSON object.
    pub fn from_json(map: Map<String, Value>) -> Self {
        Self(map.into_iter().map(|(k, v)| (k, coerce(v))).collect())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Notification title, taken from the `title` key.
    pub fn title(&self) -> Option<&str> {
        self.get("title")
    }

    /// Notification body, taken from the `message` key.
    pub fn message(&self) -> Option<&str> {
        self.get("message")
    }
}

fn coerce(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Extra top-level fields merged into the request body.
///
/// Falsy values (`false`, `null`, zero, empty string, array or object) are
/// dropped and `true` is sent as the literal `"1"`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SendOptions(Map<String, Value>);

impl SendOptions {
    /// Create an empty option set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an option.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Options as they go on the wire.
    pub fn normalized(&self) -> Map<String, Value> {
        let mut out = Map::new();

        for (key, value) in &self.0 {
            if key == MESSAGE_KEY {
                tracing::warn!(option = %key, "ignoring option that would replace the message");
                continue;
            }
            if is_falsy(value) {
                continue;
            }
            let value = match value {
                Value::Bool(true) => Value::String("1".to_string()),
                other => other.clone(),
            };
            out.insert(key.clone(), value);
        }

        out
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// FCM v1 send request.
#[derive(Debug, Serialize)]
pub struct SendRequest<'a> {
    pub message: Message<'a>,
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

/// Message addressed to a single registration token.
#[derive(Debug, Serialize)]
pub struct Message<'a> {
    pub token: &'a str,
    pub notification: Notification<'a>,
    pub data: &'a Payload,
}

/// Visible notification part of a message.
#[derive(Debug, Serialize)]
pub struct Notification<'a> {
    pub title: Option<&'a str>,
    pub body: Option<&'a str>,
}

impl<'a> SendRequest<'a> {
    /// Build the request body for one registration id.
    pub fn new(registration_id: &'a str, payload: &'a Payload, options: &SendOptions) -> Self {
        Self {
            message: Message {
                token: registration_id,
                notification: Notification {
                    title: payload.title(),
                    body: payload.message(),
                },
                data: payload,
            },
            options: options.normalized(),
        }
    }
}
