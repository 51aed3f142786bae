use crate::request::Method;
use serde_json::Value;
use std::collections::HashMap;

/// What is put on the wire for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestData {
    pub method: Method,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Value>,
}

/// The raw response handed to validation and to the after handler.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseData {
    pub status_code: u16,
    /// Header names are lowercase; repeated headers keep the first value.
    pub headers: HashMap<String, String>,
    pub body: Option<Value>,
    pub text: String,
}

impl ResponseData {
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type").map(String::as_str)
    }

    pub(crate) fn headers_value(&self) -> Value {
        Value::Object(
            self.headers
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        )
    }
}
