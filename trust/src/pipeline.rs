use crate::{
    completion::{Completion, Outcome},
    error::Error,
    http_client::HttpClient,
    schema_validator::check_response,
    trust_configuration::{TrustConfiguration, DEFAULT_BASE_URL},
    RequestDescriptor, ResponseExpectation,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Builds a [`Trust`] that sends every request to `base_url`.
pub fn create<S: Into<String>>(base_url: S) -> Trust {
    let mut configuration = TrustConfiguration::new();
    configuration.set_base_url(base_url);

    Trust::with_configuration(&configuration)
}

/// Runs request/response assertions against one base url.
///
/// A `Trust` holds no per-call state, so concurrent calls need no coordination
/// beyond what the configured [`HttpClient`] requires.
#[derive(Debug, Clone)]
pub struct Trust {
    base_url: String,
    http_client: Arc<dyn HttpClient + Send + Sync>,
}

impl Trust {
    pub fn with_configuration(configuration: &TrustConfiguration) -> Self {
        Self {
            base_url: configuration.base_url().into(),
            http_client: configuration.http_client(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Validates both descriptors, performs the exchange and checks the response.
    ///
    /// Descriptor and transport failures resolve immediately. Otherwise the
    /// after handler, when set, decides the outcome through its [`Completion`].
    pub async fn run(&self, request: RequestDescriptor, response: ResponseExpectation) -> Outcome {
        let (completion, receiver) = Completion::channel();

        self.dispatch(&request, &response, completion).await;

        let outcome = receiver.await.unwrap_or(Err(Error::CompletionDropped));
        debug!(path = request.path(), success = outcome.is_ok(), "assertion finished");

        outcome
    }

    /// Like [`Trust::run`], also handing the outcome to `done` before returning it.
    pub async fn run_with<F>(
        &self,
        request: RequestDescriptor,
        response: ResponseExpectation,
        done: F,
    ) -> Outcome
    where
        F: FnOnce(&Outcome),
    {
        let outcome = self.run(request, response).await;
        done(&outcome);

        outcome
    }

    /// Parses both descriptors from their JSON form, then runs them.
    pub async fn run_value(&self, request: &Value, response: &Value) -> Outcome {
        let request = RequestDescriptor::from_value(request)?;
        let response = ResponseExpectation::from_value(response)?;

        self.run(request, response).await
    }

    /// Like [`Trust::run_value`], also handing the outcome to `done` before
    /// returning it. Parse failures reach `done` too.
    pub async fn run_value_with<F>(&self, request: &Value, response: &Value, done: F) -> Outcome
    where
        F: FnOnce(&Outcome),
    {
        let outcome = self.run_value(request, response).await;
        done(&outcome);

        outcome
    }

    async fn dispatch(
        &self,
        request: &RequestDescriptor,
        response: &ResponseExpectation,
        completion: Completion,
    ) {
        if let Err(error) = request.validate().and_then(|_| response.validate()) {
            debug!(%error, "rejected descriptors");
            return completion.fail(error);
        }

        let request_data = request.to_request_data();
        let response_data = match self
            .http_client
            .make_request(&self.base_url, &request_data)
            .await
        {
            Ok(response_data) => response_data,
            Err(error) => {
                debug!(%error, "request failed");
                return completion.fail(error);
            }
        };

        let violation = check_response(response, &response_data).err();

        match response.handler() {
            Some(handler) => handler.call(violation, response_data, completion),
            None => completion.finish(violation),
        }
    }
}

impl Default for Trust {
    fn default() -> Self {
        create(DEFAULT_BASE_URL)
    }
}
