use crate::error::Error;
use hyper::{
    body,
    header::{HeaderName, HeaderValue, CONTENT_TYPE},
    server::conn::AddrStream,
    service::{make_service_fn, service_fn},
    Body, Request, Response, Server, StatusCode,
};
use serde_json::{json, Value};
use std::{
    collections::HashMap,
    convert::Infallible,
    net::SocketAddr,
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use tokio::{sync::oneshot, task::JoinHandle};
use tracing::{debug, error};

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// A request as the fixture server received it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Value>,
}

type RequestValidator = dyn Fn(&RecordedRequest) + Send + Sync;

#[derive(Debug, Clone)]
enum CannedBody {
    Json(Value),
    Text(String, String),
    Empty,
}

struct FixtureState {
    status_code: u16,
    body: CannedBody,
    headers: Vec<(String, String)>,
    validator: Option<Arc<RequestValidator>>,
    validator_failure: Option<String>,
    requests: Vec<RecordedRequest>,
}

impl Default for FixtureState {
    fn default() -> Self {
        Self {
            status_code: 200,
            body: CannedBody::Json(json!({ "test": "test" })),
            headers: Vec::new(),
            validator: None,
            validator_failure: None,
            requests: Vec::new(),
        }
    }
}

/// Throwaway HTTP server answering every request with one canned response.
///
/// Each instance owns its state, so tests running in parallel never see each
/// other's responses.
pub struct TestServer {
    address: SocketAddr,
    state: Arc<Mutex<FixtureState>>,
    shutdown: Option<oneshot::Sender<()>>,
    join_handle: Option<JoinHandle<Result<(), hyper::Error>>>,
}

impl TestServer {
    /// Binds an ephemeral port on 127.0.0.1 and starts serving on the current runtime.
    pub async fn start() -> Result<Self, Error> {
        let state = Arc::new(Mutex::new(FixtureState::default()));
        let service_state = state.clone();

        let make_service = make_service_fn(move |_: &AddrStream| {
            let state = service_state.clone();

            async move {
                Ok::<_, Infallible>(service_fn(move |request| {
                    handle_request(state.clone(), request)
                }))
            }
        });

        let server =
            Server::try_bind(&SocketAddr::from(([127, 0, 0, 1], 0)))?.serve(make_service);
        let address = server.local_addr();
        let (shutdown, shutdown_signal) = oneshot::channel::<()>();

        let join_handle = tokio::spawn(server.with_graceful_shutdown(async {
            let _ = shutdown_signal.await;
        }));

        debug!(%address, "fixture server listening");

        Ok(Self {
            address,
            state,
            shutdown: Some(shutdown),
            join_handle: Some(join_handle),
        })
    }

    pub fn port(&self) -> u16 {
        self.address.port()
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.address)
    }

    /// Serves `body` as JSON with the given status from now on.
    pub fn set_response(&self, body: Value, status_code: u16) {
        let mut state = self.state();
        state.body = CannedBody::Json(body);
        state.status_code = status_code;
    }

    pub fn set_text_response<S1: Into<String>, S2: Into<String>>(
        &self,
        text: S1,
        content_type: S2,
        status_code: u16,
    ) {
        let mut state = self.state();
        state.body = CannedBody::Text(text.into(), content_type.into());
        state.status_code = status_code;
    }

    /// Serves no body and no content type.
    pub fn set_empty_response(&self, status_code: u16) {
        let mut state = self.state();
        state.body = CannedBody::Empty;
        state.status_code = status_code;
    }

    pub fn set_response_header<S1: Into<String>, S2: Into<String>>(&self, name: S1, value: S2) {
        self.state().headers.push((name.into(), value.into()));
    }

    /// Runs `validator` against every incoming request.
    ///
    /// A panic inside the validator is caught and reported by
    /// [`TestServer::stop`] or [`TestServer::take_validator_failure`].
    pub fn set_request_validator<F>(&self, validator: F)
    where
        F: Fn(&RecordedRequest) + Send + Sync + 'static,
    {
        self.state().validator = Some(Arc::new(validator));
    }

    pub fn take_validator_failure(&self) -> Option<String> {
        self.state().validator_failure.take()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state().requests.clone()
    }

    pub async fn stop(mut self) -> Result<(), Error> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }

        if let Some(join_handle) = self.join_handle.take() {
            join_handle.await??;
        }

        debug!(address = %self.address, "fixture server stopped");

        match self.take_validator_failure() {
            Some(failure) => Err(Error::RequestValidation(failure)),
            None => Ok(()),
        }
    }

    fn state(&self) -> MutexGuard<'_, FixtureState> {
        lock(&self.state)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

fn lock(state: &Mutex<FixtureState>) -> MutexGuard<'_, FixtureState> {
    // a panicking validator must not take the fixture down with it
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn handle_request(
    state: Arc<Mutex<FixtureState>>,
    mut request: Request<Body>,
) -> Result<Response<Body>, Infallible> {
    let response = match read_request(&mut request).await {
        Ok(recorded) => {
            debug!(method = %recorded.method, path = %recorded.path, "fixture request");
            validate_request(&state, &recorded);
            lock(&state).requests.push(recorded);

            let state = lock(&state);
            build_response(&state)
        }
        Err(e) => Err(e),
    };

    Ok(response.unwrap_or_else(|e| {
        error!(error = %e, "fixture server failed to answer");
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        response
    }))
}

fn validate_request(state: &Mutex<FixtureState>, recorded: &RecordedRequest) {
    let validator = lock(state).validator.clone();

    if let Some(validator) = validator {
        if let Err(panic) = panic::catch_unwind(AssertUnwindSafe(|| validator(recorded))) {
            let message = panic
                .downcast_ref::<String>()
                .cloned()
                .or_else(|| panic.downcast_ref::<&str>().map(|s| String::from(*s)))
                .unwrap_or_else(|| String::from("request validator panicked"));

            lock(state).validator_failure.get_or_insert(message);
        }
    }
}

async fn read_request(request: &mut Request<Body>) -> Result<RecordedRequest, Error> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let headers = request
        .headers()
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
        .collect();

    let body = body::to_bytes(request.body_mut()).await?;
    let body = serde_json::from_slice(&body).ok();

    Ok(RecordedRequest {
        method,
        path,
        headers,
        body,
    })
}

fn build_response(state: &FixtureState) -> Result<Response<Body>, Error> {
    let mut response_builder = Response::builder().status(state.status_code);

    let body = match &state.body {
        CannedBody::Json(value) => {
            response_builder = response_builder.header(CONTENT_TYPE, JSON_CONTENT_TYPE);
            Body::from(value.to_string())
        }
        CannedBody::Text(text, content_type) => {
            response_builder = response_builder.header(CONTENT_TYPE, content_type.as_str());
            Body::from(text.clone())
        }
        CannedBody::Empty => Body::empty(),
    };

    for (name, value) in &state.headers {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| Error::InvalidHeader)?;
        let value = HeaderValue::from_str(value).map_err(|_| Error::InvalidHeader)?;
        response_builder = response_builder.header(name, value);
    }

    Ok(response_builder.body(body)?)
}
