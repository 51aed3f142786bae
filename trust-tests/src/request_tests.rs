use crate::{trust_test, TestServer};
use serde_json::{json, Value};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use trust::{
    DescriptorErrorKind, DescriptorScope, Error, ExpectationTree, FieldExpectation, RequestDescriptor,
    ResponseExpectation, Trust, ViolationKind, VALID_STATUS_CODES,
};

fn expect_test() -> Value {
    json!({ "body": { "test": { "value": "test" } } })
}

fn valid_request() -> Value {
    json!({ "method": "get", "path": "/test" })
}

fn valid_response() -> Value {
    json!({
        "code": 200,
        "content_type": "json",
        "headers": {},
        "body": { "test": { "required": true, "value": "test", "type": "string" } }
    })
}

fn with(base: Value, key: &str, value: Value) -> Value {
    let mut base = base;
    base[key] = value;
    base
}

fn without(base: Value, key: &str) -> Value {
    let mut base = base;
    if let Some(map) = base.as_object_mut() {
        map.remove(key);
    }
    base
}

async fn descriptor_error_of(trust: &Trust, request: Value, response: Value) -> DescriptorErrorKind {
    let error = trust
        .run_value(&request, &response)
        .await
        .expect_err("the descriptors should have been rejected");

    error
        .descriptor_kind()
        .cloned()
        .unwrap_or_else(|| panic!("expected a descriptor error, got: {}", error))
}

#[trust_test]
async fn sends_each_method(server: &TestServer, trust: &Trust) {
    for method in &["get", "post", "put", "delete"] {
        let expected = method.to_uppercase();
        server.set_request_validator(move |request| {
            assert_eq!(request.path, "/validation");
            assert_eq!(request.method, expected);
        });

        trust
            .run_value(
                &json!({ "method": method, "path": "/validation" }),
                &expect_test(),
            )
            .await
            .unwrap();

        assert_eq!(server.take_validator_failure(), None);
    }

    assert_eq!(server.requests().len(), 4);
}

#[trust_test]
async fn sends_body_for_post_and_put(server: &TestServer, trust: &Trust) {
    let body = json!({ "test": "test" });
    let expected = body.clone();
    server.set_request_validator(move |request| {
        assert_eq!(request.body.as_ref(), Some(&expected));
    });

    trust
        .run(
            RequestDescriptor::post("/validation").body(body.clone()),
            ResponseExpectation::from_value(&expect_test()).unwrap(),
        )
        .await
        .unwrap();
    trust
        .run_value(
            &json!({ "method": "put", "path": "/validation", "body": body }),
            &expect_test(),
        )
        .await
        .unwrap();
}

#[trust_test]
async fn sends_array_body(server: &TestServer, trust: &Trust) {
    trust
        .run(
            RequestDescriptor::put("/validation").body(json!([1, 2])),
            ResponseExpectation::from_value(&expect_test()).unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(server.requests()[0].body, Some(json!([1, 2])));
}

#[trust_test]
async fn sends_headers(server: &TestServer, trust: &Trust) {
    server.set_request_validator(|request| {
        assert_eq!(request.headers.get("test").map(String::as_str), Some("test"));
    });

    trust
        .run_value(
            &json!({ "method": "put", "path": "/validation", "headers": { "test": "test" } }),
            &expect_test(),
        )
        .await
        .unwrap();
}

#[trust_test]
async fn after_handler_runs_before_completion_on_success(_server: &TestServer, trust: &Trust) {
    let after_handler_called = Arc::new(AtomicBool::new(false));
    let called = after_handler_called.clone();

    let response = ResponseExpectation::from_value(&expect_test())
        .unwrap()
        .after_handler(move |violation, _, complete| {
            called.store(true, Ordering::SeqCst);
            complete.finish(violation);
        });

    trust
        .run_with(RequestDescriptor::get("/test"), response, |outcome| {
            assert!(outcome.is_ok());
            assert!(after_handler_called.load(Ordering::SeqCst));
        })
        .await
        .unwrap();
}

#[trust_test]
async fn after_handler_runs_before_completion_on_failure(_server: &TestServer, trust: &Trust) {
    let after_handler_called = Arc::new(AtomicBool::new(false));
    let called = after_handler_called.clone();

    let response = ResponseExpectation::new()
        .body(ExpectationTree::new().field("test", FieldExpectation::equals(json!("wrong"))))
        .after_handler(move |violation, raw, complete| {
            called.store(true, Ordering::SeqCst);
            assert_eq!(raw.status_code, 200);
            complete.finish(violation);
        });

    let outcome = trust
        .run_with(RequestDescriptor::get("/test"), response, |outcome| {
            assert!(outcome.is_err());
            assert!(after_handler_called.load(Ordering::SeqCst));
        })
        .await;

    assert_eq!(
        outcome.unwrap_err().violation_kind(),
        Some(ViolationKind::IncorrectValue)
    );
}

#[trust_test]
async fn rejects_malformed_methods(server: &TestServer, trust: &Trust) {
    assert_eq!(
        descriptor_error_of(trust, without(valid_request(), "method"), valid_response()).await,
        DescriptorErrorKind::MissingMethod
    );
    assert_eq!(
        descriptor_error_of(trust, with(valid_request(), "method", json!(1)), valid_response())
            .await,
        DescriptorErrorKind::InvalidMethodType
    );
    assert_eq!(
        descriptor_error_of(
            trust,
            with(valid_request(), "method", json!("NOT CORRECT")),
            valid_response()
        )
        .await,
        DescriptorErrorKind::InvalidMethod
    );

    assert!(server.requests().is_empty());
}

#[trust_test]
async fn rejects_malformed_paths(server: &TestServer, trust: &Trust) {
    assert_eq!(
        descriptor_error_of(trust, without(valid_request(), "path"), valid_response()).await,
        DescriptorErrorKind::MissingPath
    );
    assert_eq!(
        descriptor_error_of(trust, with(valid_request(), "path", json!(1)), valid_response())
            .await,
        DescriptorErrorKind::InvalidPathType
    );

    let error = trust
        .run_value(
            &with(valid_request(), "path", json!("NOT CORRECT")),
            &valid_response(),
        )
        .await
        .unwrap_err();
    assert_eq!(
        error.to_string(),
        "request_options: path should contain /"
    );

    assert!(server.requests().is_empty());
}

#[trust_test]
async fn rejects_body_on_get_and_delete(server: &TestServer, trust: &Trust) {
    for method in &["get", "delete"] {
        let request = json!({ "method": method, "path": "/test", "body": {} });

        assert_eq!(
            descriptor_error_of(trust, request, valid_response()).await,
            DescriptorErrorKind::UnexpectedBody
        );

        let error = trust
            .run(
                RequestDescriptor::new(method.parse().unwrap(), "/test").body(json!({})),
                ResponseExpectation::new(),
            )
            .await
            .unwrap_err();
        assert_eq!(
            error.descriptor_kind(),
            Some(&DescriptorErrorKind::UnexpectedBody)
        );
    }

    assert!(server.requests().is_empty());
}

#[trust_test]
async fn accepts_null_body_on_post(server: &TestServer, trust: &Trust) {
    trust
        .run_value(
            &json!({ "method": "post", "path": "/test", "body": null }),
            &valid_response(),
        )
        .await
        .unwrap();

    assert_eq!(server.requests()[0].body, None);
}

#[trust_test]
async fn rejects_scalar_body(_server: &TestServer, trust: &Trust) {
    assert_eq!(
        descriptor_error_of(
            trust,
            json!({ "method": "post", "path": "/test", "body": "text" }),
            valid_response()
        )
        .await,
        DescriptorErrorKind::InvalidBodyType
    );
}

#[trust_test]
async fn rejects_invalid_status_codes_before_sending(server: &TestServer, trust: &Trust) {
    for code in &[0, 42, 208, 418, 600] {
        let error = trust
            .run_value(&valid_request(), &with(valid_response(), "code", json!(code)))
            .await
            .unwrap_err();

        assert_eq!(
            error.descriptor_kind(),
            Some(&DescriptorErrorKind::InvalidStatusCode)
        );
        assert!(error
            .to_string()
            .starts_with("response_options: code not a valid http response code"));
    }

    assert!(server.requests().is_empty());
}

#[trust_test]
async fn accepts_every_valid_status_code(server: &TestServer, trust: &Trust) {
    for code in VALID_STATUS_CODES.iter() {
        let response = ResponseExpectation::new().code(*code);

        if let Err(error) = trust.run(RequestDescriptor::get("/test"), response).await {
            assert!(
                error.descriptor_kind().is_none(),
                "code {} should be accepted: {}",
                code,
                error
            );
        }
    }

    assert_eq!(server.requests().len(), VALID_STATUS_CODES.len());
}

#[trust_test]
async fn request_errors_precede_response_errors(_server: &TestServer, trust: &Trust) {
    let error = trust
        .run_value(
            &without(valid_request(), "method"),
            &with(valid_response(), "code", json!(999)),
        )
        .await
        .unwrap_err();

    match error {
        Error::Descriptor(error) => assert_eq!(error.scope, DescriptorScope::Request),
        other => panic!("expected a descriptor error, got: {}", other),
    }
}

#[trust_test]
async fn rejects_value_type_disagreement(server: &TestServer, trust: &Trust) {
    let kind = descriptor_error_of(
        trust,
        valid_request(),
        json!({ "body": { "test": { "value": "test", "type": "number" } } }),
    )
    .await;

    assert_eq!(
        kind,
        DescriptorErrorKind::ValueTypeMismatch { key: "test".into() }
    );
    assert!(server.requests().is_empty());
}
