//! Declarative assertions over one HTTP request/response exchange.
//!
//! Describe the request with a [`RequestDescriptor`] and the accepted responses
//! with a [`ResponseExpectation`], then hand both to [`Trust::run`]:
//!
//! ```no_run
//! use serde_json::json;
//! use trust::{ExpectationTree, FieldExpectation, RequestDescriptor, ResponseExpectation, ValueType};
//!
//! # async fn example() -> Result<(), trust::Error> {
//! let trust = trust::create("http://127.0.0.1:8080");
//!
//! trust
//!     .run(
//!         RequestDescriptor::get("/test"),
//!         ResponseExpectation::new().code(200).body(
//!             ExpectationTree::new()
//!                 .field("test", FieldExpectation::of(ValueType::String).value(json!("test"))),
//!         ),
//!     )
//!     .await
//! # }
//! ```

mod completion;
mod data;
mod error;
mod expectation;
mod http_client;
mod pipeline;
mod request;
mod schema_validator;
mod trust_configuration;
mod util;

pub use completion::{Completion, Outcome};
pub use data::{RequestData, ResponseData};
pub use error::{
    DescriptorError, DescriptorErrorKind, DescriptorScope, Error, TransportError, Violation,
    ViolationKind, ViolationScope,
};
pub use expectation::{
    BodyType, ExpectationTree, FieldExpectation, ResponseExpectation, ValueType,
    DEFAULT_STATUS_CODE, VALID_STATUS_CODES,
};
pub use http_client::{HttpClient, HyperHttpClient};
pub use pipeline::{create, Trust};
pub use request::{Method, RequestDescriptor};
pub use schema_validator::{check_response, json_eq, validate_value};
pub use trust_configuration::{TrustConfiguration, DEFAULT_BASE_URL};
