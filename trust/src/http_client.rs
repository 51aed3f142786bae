use crate::{
    error::{Error, TransportError},
    util, RequestData, ResponseData,
};
use async_trait::async_trait;
use hyper::{body, client::HttpConnector, header, Body, Client, Request, Uri};
use hyper_tls::HttpsConnector;
use serde_json::Value;
use std::fmt::Debug;
use tracing::debug;

/// Performs one exchange against `base_url`. Timeouts and cancellation are
/// the implementation's business.
#[async_trait]
pub trait HttpClient: Debug {
    async fn make_request(
        &self,
        base_url: &str,
        request_data: &RequestData,
    ) -> Result<ResponseData, Error>;
}

#[derive(Debug, Clone)]
pub struct HyperHttpClient {
    client: Client<HttpsConnector<HttpConnector>>,
}

impl HyperHttpClient {
    pub fn new() -> Self {
        Self {
            client: Client::builder().build(HttpsConnector::new()),
        }
    }

    fn parse_body(content_type: Option<&str>, text: &str) -> Result<Option<Value>, Error> {
        if text.trim().is_empty() {
            return Ok(None);
        }

        match content_type {
            Some(content_type) if content_type.contains("json") => {
                let body = serde_json::from_str(text).map_err(TransportError::MalformedJson)?;
                Ok(Some(body))
            }
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl HttpClient for HyperHttpClient {
    async fn make_request(
        &self,
        base_url: &str,
        request_data: &RequestData,
    ) -> Result<ResponseData, Error> {
        let url = util::join_url(base_url, &request_data.path);
        let uri: Uri = url
            .parse()
            .map_err(|_| TransportError::InvalidUri(url.clone()))?;

        let mut request_builder = Request::builder()
            .uri(uri)
            .method(request_data.method.as_str());

        let mut request_body = Body::empty();

        if let Some(headers_mut) = request_builder.headers_mut() {
            util::put_headers(headers_mut, &request_data.headers)?;

            if let Some(body) = &request_data.body {
                if !headers_mut.contains_key(header::CONTENT_TYPE) {
                    headers_mut.insert(
                        header::CONTENT_TYPE,
                        header::HeaderValue::from_static("application/json"),
                    );
                }
                request_body = Body::from(body.to_string());
            }
        }

        let request = request_builder.body(request_body)?;

        debug!(method = %request_data.method, %url, "sending request");
        let response = self.client.request(request).await?;

        let status_code = response.status().as_u16();
        let headers = util::extract_headers(response.headers());
        let body = body::to_bytes(response.into_body()).await?;
        let text: String = String::from_utf8_lossy(&body).into();
        let body = Self::parse_body(headers.get("content-type").map(String::as_str), &text)?;

        debug!(status_code, "received response");

        Ok(ResponseData {
            status_code,
            headers,
            body,
            text,
        })
    }
}

impl Default for HyperHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_json_bodies_only() {
        assert_eq!(
            HyperHttpClient::parse_body(Some("application/json"), r#"{"test":"test"}"#).unwrap(),
            Some(json!({ "test": "test" }))
        );
        assert_eq!(
            HyperHttpClient::parse_body(Some("text/html"), "<p>hi</p>").unwrap(),
            None
        );
        assert_eq!(
            HyperHttpClient::parse_body(Some("application/json"), "  ").unwrap(),
            None
        );
    }

    #[test]
    fn malformed_json_is_a_transport_error() {
        let error = HyperHttpClient::parse_body(Some("application/json"), "{").unwrap_err();

        assert!(error.is_transport());
    }
}
