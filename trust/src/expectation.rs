use crate::{
    completion::AfterHandler,
    error::{DescriptorError, DescriptorErrorKind},
    Completion, ResponseData, Violation,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};
use std::{fmt::Display, str::FromStr};

pub const VALID_STATUS_CODES: [u16; 41] = [
    100, 101, 200, 201, 202, 203, 204, 205, 206, 207, 300, 301, 302, 303, 304, 305, 307, 400, 401,
    402, 403, 404, 405, 406, 407, 408, 409, 410, 411, 412, 413, 414, 415, 416, 417, 500, 501, 502,
    503, 504, 505,
];

pub const DEFAULT_STATUS_CODE: u16 = 200;

lazy_static! {
    pub(crate) static ref DEFAULT_CONTENT_TYPE: Regex = Regex::new("json").unwrap();
}

/// Primitive type tag of a JSON value. `null` has no tag.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ValueType {
    String,
    Number,
    Boolean,
    Object,
    Array,
}

impl ValueType {
    pub fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(_) => Some(ValueType::Boolean),
            Value::Number(_) => Some(ValueType::Number),
            Value::String(_) => Some(ValueType::String),
            Value::Array(_) => Some(ValueType::Array),
            Value::Object(_) => Some(ValueType::Object),
        }
    }

    pub fn matches(self, value: &Value) -> bool {
        Self::of(value) == Some(self)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::Number => "number",
            ValueType::Boolean => "boolean",
            ValueType::Object => "object",
            ValueType::Array => "array",
        }
    }
}

impl Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ValueType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(ValueType::String),
            "number" => Ok(ValueType::Number),
            "boolean" => Ok(ValueType::Boolean),
            "object" => Ok(ValueType::Object),
            "array" => Ok(ValueType::Array),
            _ => Err(()),
        }
    }
}

/// Shape of the top-level response body.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BodyType {
    Object,
    Array,
}

impl Default for BodyType {
    fn default() -> Self {
        BodyType::Object
    }
}

impl BodyType {
    pub fn value_type(self) -> ValueType {
        match self {
            BodyType::Object => ValueType::Object,
            BodyType::Array => ValueType::Array,
        }
    }
}

/// Rule for a single key of an expectation tree.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldExpectation {
    pub(crate) required: bool,
    pub(crate) value: Option<Value>,
    pub(crate) value_type: Option<ValueType>,
    pub(crate) allow_null: bool,
    pub(crate) nested: Option<ExpectationTree>,
}

impl Default for FieldExpectation {
    fn default() -> Self {
        Self {
            required: true,
            value: None,
            value_type: None,
            allow_null: false,
            nested: None,
        }
    }
}

impl FieldExpectation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a required key with the given literal value.
    pub fn equals(value: Value) -> Self {
        Self::new().value(value)
    }

    pub fn of(value_type: ValueType) -> Self {
        Self::new().of_type(value_type)
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn of_type(mut self, value_type: ValueType) -> Self {
        self.value_type = Some(value_type);
        self
    }

    pub fn allow_null(mut self) -> Self {
        self.allow_null = true;
        self
    }

    /// Sub-tree applied to an object value, or to every element of an array value.
    pub fn nested(mut self, nested: ExpectationTree) -> Self {
        self.nested = Some(nested);
        self
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn expected_value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn expected_type(&self) -> Option<ValueType> {
        self.value_type
    }

    pub fn allows_null(&self) -> bool {
        self.allow_null
    }

    pub fn nested_tree(&self) -> Option<&ExpectationTree> {
        self.nested.as_ref()
    }

    fn from_value(key: &str, value: &Value) -> Result<Self, DescriptorError> {
        let malformed = || {
            DescriptorError::response(DescriptorErrorKind::InvalidFieldExpectation {
                key: key.into(),
            })
        };
        let options = value.as_object().ok_or_else(malformed)?;
        let mut field = Self::new();

        if let Some(required) = options.get("required") {
            field.required = required.as_bool().ok_or_else(malformed)?;
        }

        field.value = options.get("value").cloned();

        if let Some(value_type) = options.get("type") {
            field.value_type = Some(
                value_type
                    .as_str()
                    .and_then(|s| s.parse().ok())
                    .ok_or_else(|| {
                        DescriptorError::response(DescriptorErrorKind::InvalidFieldType {
                            key: key.into(),
                        })
                    })?,
            );
        }

        if let Some(allow_null) = options.get("allow_null") {
            field.allow_null = allow_null.as_bool().ok_or_else(malformed)?;
        }

        if let Some(nested) = options.get("nested") {
            let nested = nested.as_object().ok_or_else(malformed)?;
            field.nested = Some(ExpectationTree::from_map(nested, key)?);
        }

        Ok(field)
    }
}

/// Ordered mapping from key to [`FieldExpectation`].
///
/// Keys are checked in insertion order, which is also the order of the JSON
/// object a tree was parsed from.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExpectationTree {
    fields: Vec<(String, FieldExpectation)>,
}

impl ExpectationTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule for `key`, replacing any earlier rule for the same key in place.
    pub fn field<S: Into<String>>(mut self, key: S, expectation: FieldExpectation) -> Self {
        let key = key.into();

        match self.fields.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, existing)) => *existing = expectation,
            None => self.fields.push((key, expectation)),
        }

        self
    }

    pub fn get(&self, key: &str) -> Option<&FieldExpectation> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, expectation)| expectation)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldExpectation)> {
        self.fields.iter().map(|(key, field)| (key.as_str(), field))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Parses `{ "key": { "required": .., "value": .., "type": .., "allow_null": .., "nested": {..} } }`.
    pub fn from_value(value: &Value) -> Result<Self, DescriptorError> {
        let map = value.as_object().ok_or_else(|| {
            DescriptorError::response(DescriptorErrorKind::InvalidExpectationBody)
        })?;

        Self::from_map(map, "")
    }

    fn from_map(map: &Map<String, Value>, prefix: &str) -> Result<Self, DescriptorError> {
        let mut tree = Self::new();

        for (key, options) in map {
            let path = child_path(prefix, key);
            tree = tree.field(key.clone(), FieldExpectation::from_value(&path, options)?);
        }

        Ok(tree)
    }

    /// Every rule carrying both a literal and a type must agree with itself.
    fn check_value_types(&self, prefix: &str) -> Result<(), DescriptorError> {
        for (key, field) in self.iter() {
            let path = child_path(prefix, key);

            if let (Some(value), Some(value_type)) = (&field.value, field.value_type) {
                let null_allowed = field.allow_null && value.is_null();

                if !null_allowed && !value_type.matches(value) {
                    return Err(DescriptorError::response(
                        DescriptorErrorKind::ValueTypeMismatch { key: path },
                    ));
                }
            }

            if let Some(nested) = &field.nested {
                nested.check_value_types(&path)?;
            }
        }

        Ok(())
    }
}

pub(crate) fn child_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.into()
    } else {
        format!("{}.{}", prefix, key)
    }
}

/// Tree describing the accepted responses of one call.
#[derive(Debug, Clone, Default)]
pub struct ResponseExpectation {
    code: Option<u16>,
    content_type: Option<Regex>,
    body_type: BodyType,
    body: Option<ExpectationTree>,
    headers: Option<ExpectationTree>,
    after_handler: Option<AfterHandler>,
}

impl ResponseExpectation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn code(mut self, code: u16) -> Self {
        self.code = Some(code);
        self
    }

    pub fn content_type(mut self, pattern: Regex) -> Self {
        self.content_type = Some(pattern);
        self
    }

    pub fn body_type(mut self, body_type: BodyType) -> Self {
        self.body_type = body_type;
        self
    }

    pub fn body(mut self, body: ExpectationTree) -> Self {
        self.body = Some(body);
        self
    }

    pub fn headers(mut self, headers: ExpectationTree) -> Self {
        self.headers = Some(headers);
        self
    }

    /// Hands the outcome and the raw response to `handler` instead of
    /// completing directly. The handler owns the [`Completion`] and must
    /// signal it.
    pub fn after_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(Option<Violation>, ResponseData, Completion) + Send + Sync + 'static,
    {
        self.after_handler = Some(AfterHandler::new(handler));
        self
    }

    pub fn expected_code(&self) -> u16 {
        self.code.unwrap_or(DEFAULT_STATUS_CODE)
    }

    pub fn expected_content_type(&self) -> &Regex {
        self.content_type.as_ref().unwrap_or(&DEFAULT_CONTENT_TYPE)
    }

    pub fn expected_body_type(&self) -> BodyType {
        self.body_type
    }

    pub fn expected_body(&self) -> Option<&ExpectationTree> {
        self.body.as_ref()
    }

    pub fn expected_headers(&self) -> Option<&ExpectationTree> {
        self.headers.as_ref()
    }

    pub(crate) fn handler(&self) -> Option<&AfterHandler> {
        self.after_handler.as_ref()
    }

    /// Parses the JSON form `{ "code": .., "content_type": "..", "type": .., "body": {..}, "headers": {..} }`.
    pub fn from_value(value: &Value) -> Result<Self, DescriptorError> {
        use DescriptorErrorKind::*;

        let options = match value {
            Value::Null => return Ok(Self::new()),
            Value::Object(options) => options,
            _ => return Err(DescriptorError::response(InvalidExpectationBody)),
        };
        let mut expectation = Self::new();

        if let Some(code) = options.get("code") {
            let code = code
                .as_u64()
                .filter(|code| *code <= u64::from(u16::MAX))
                .ok_or_else(|| DescriptorError::response(InvalidStatusCode))?;
            expectation.code = Some(code as u16);
        }
        expectation.check_code()?;

        if let Some(content_type) = options.get("content_type") {
            let pattern = content_type
                .as_str()
                .and_then(|pattern| Regex::new(pattern).ok())
                .ok_or_else(|| DescriptorError::response(InvalidContentType))?;
            expectation.content_type = Some(pattern);
        }

        if let Some(body_type) = options.get("type") {
            expectation.body_type = match body_type.as_str() {
                Some("object") => BodyType::Object,
                Some("array") => BodyType::Array,
                _ => return Err(DescriptorError::response(InvalidResponseType)),
            };
        }

        if let Some(body) = options.get("body") {
            expectation.body = Some(ExpectationTree::from_value(body)?);
        }

        if let Some(headers) = options.get("headers") {
            expectation.headers = Some(ExpectationTree::from_value(headers)?);
        }

        expectation.validate()?;

        Ok(expectation)
    }

    pub fn validate(&self) -> Result<(), DescriptorError> {
        self.check_code()?;

        if let Some(body) = &self.body {
            body.check_value_types("")?;
        }

        if let Some(headers) = &self.headers {
            headers.check_value_types("")?;
        }

        Ok(())
    }

    fn check_code(&self) -> Result<(), DescriptorError> {
        match self.code {
            Some(code) if !VALID_STATUS_CODES.contains(&code) => Err(DescriptorError::response(
                DescriptorErrorKind::InvalidStatusCode,
            )),
            _ => Ok(()),
        }
    }
}
