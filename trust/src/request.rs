use crate::{
    data::RequestData,
    error::{DescriptorError, DescriptorErrorKind},
};
use serde_json::Value;
use std::{collections::HashMap, fmt::Display, str::FromStr};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Method {
    Get,
    Put,
    Post,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }

    /// GET and DELETE requests never carry a body.
    pub fn allows_body(self) -> bool {
        matches!(self, Method::Put | Method::Post)
    }
}

impl Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Method {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "get" => Ok(Method::Get),
            "put" => Ok(Method::Put),
            "post" => Ok(Method::Post),
            "delete" => Ok(Method::Delete),
            _ => Err(DescriptorError::request(DescriptorErrorKind::InvalidMethod)),
        }
    }
}

/// Intent for one outgoing call.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    method: Method,
    path: String,
    headers: HashMap<String, String>,
    body: Option<Value>,
}

impl RequestDescriptor {
    pub fn new<S: Into<String>>(method: Method, path: S) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HashMap::new(),
            body: None,
        }
    }

    pub fn get<S: Into<String>>(path: S) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn put<S: Into<String>>(path: S) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn post<S: Into<String>>(path: S) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn delete<S: Into<String>>(path: S) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn header<S1: Into<String>, S2: Into<String>>(mut self, name: S1, value: S2) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Parses the JSON form `{ "method": "get", "path": "/x", "headers": {..}, "body": .. }`.
    ///
    /// Checks run in the same order as [`RequestDescriptor::validate`] so the
    /// first failure is the same whichever form the caller uses.
    pub fn from_value(value: &Value) -> Result<Self, DescriptorError> {
        use DescriptorErrorKind::*;

        let options = value
            .as_object()
            .ok_or_else(|| DescriptorError::request(MissingRequest))?;

        let method = options
            .get("method")
            .ok_or_else(|| DescriptorError::request(MissingMethod))?
            .as_str()
            .ok_or_else(|| DescriptorError::request(InvalidMethodType))?
            .parse::<Method>()?;

        let path = options
            .get("path")
            .ok_or_else(|| DescriptorError::request(MissingPath))?
            .as_str()
            .ok_or_else(|| DescriptorError::request(InvalidPathType))?;

        let mut descriptor = Self::new(method, path);
        descriptor.body = options.get("body").cloned();
        descriptor.validate()?;

        if let Some(headers) = options.get("headers") {
            descriptor.headers = parse_headers(headers)?;
        }

        Ok(descriptor)
    }

    pub fn validate(&self) -> Result<(), DescriptorError> {
        use DescriptorErrorKind::*;

        if !self.path.contains('/') {
            return Err(DescriptorError::request(InvalidPathFormat));
        }

        if !self.method.allows_body() && self.body.is_some() {
            return Err(DescriptorError::request(UnexpectedBody));
        }

        match &self.body {
            None | Some(Value::Null) | Some(Value::Object(_)) | Some(Value::Array(_)) => Ok(()),
            Some(_) => Err(DescriptorError::request(InvalidBodyType)),
        }
    }

    pub(crate) fn to_request_data(&self) -> RequestData {
        RequestData {
            method: self.method,
            path: self.path.clone(),
            headers: self.headers.clone(),
            body: self.body.clone().filter(|body| !body.is_null()),
        }
    }
}

fn parse_headers(value: &Value) -> Result<HashMap<String, String>, DescriptorError> {
    let invalid = || DescriptorError::request(DescriptorErrorKind::InvalidHeaders);
    let mut headers = HashMap::new();

    for (name, value) in value.as_object().ok_or_else(invalid)? {
        let value = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => return Err(invalid()),
        };
        headers.insert(name.clone(), value);
    }

    Ok(headers)
}
