//! Scripted transport for client tests.
//!
//! ```ignore
//! use graphql_test_utils::MockTransport;
//!
//! let transport = MockTransport::new()
//!     .respond(RawResult::data(json!({ "user": { "id": "1" } })))
//!     .respond_after(Duration::from_millis(50), RawResult::errors(vec![]));
//! let client = Client::new(fixture_definitions(), transport, ClientOptions::default());
//! ```

use futures_util::stream::{self, BoxStream, StreamExt};
use graphql_dispatch::{DispatchOptions, GraphQLRequest, RawResult, StreamTransport, Transport, TransportError};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::future::Future;
use std::time::Duration;

/// A request the mock received.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub request: GraphQLRequest,
    pub options: DispatchOptions,
}

#[derive(Debug, Clone)]
struct Scripted {
    result: RawResult,
    delay: Option<Duration>,
}

/// A [`Transport`] that replays scripted results in order and records every
/// request it receives.
///
/// When the script runs out, the fallback set with
/// [`MockTransport::otherwise`] is returned, or an unstructured error if none
/// was set.
#[derive(Debug, Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<Scripted>>,
    fallback: Mutex<Option<RawResult>>,
    streams: Mutex<VecDeque<Result<Vec<RawResult>, TransportError>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an immediate result.
    pub fn respond(self, result: RawResult) -> Self {
        self.push(result, None);
        self
    }

    /// Queues a result delivered after `delay`.
    pub fn respond_after(self, delay: Duration, result: RawResult) -> Self {
        self.push(result, Some(delay));
        self
    }

    /// Result for every call once the script is exhausted.
    pub fn otherwise(self, result: RawResult) -> Self {
        *self.fallback.lock() = Some(result);
        self
    }

    /// Queues a subscription stream that yields `items` and then ends.
    pub fn stream(self, items: Vec<RawResult>) -> Self {
        self.streams.lock().push_back(Ok(items));
        self
    }

    /// Queues a subscription that fails to open.
    pub fn stream_error(self, error: TransportError) -> Self {
        self.streams.lock().push_back(Err(error));
        self
    }

    pub fn push(&self, result: RawResult, delay: Option<Duration>) {
        self.script.lock().push_back(Scripted { result, delay });
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.requests.lock().last().cloned()
    }

    fn next(&self) -> Scripted {
        self.script.lock().pop_front().unwrap_or_else(|| Scripted {
            result: self.fallback.lock().clone().unwrap_or_else(|| {
                RawResult::Unstructured("mock transport has no scripted response".to_string())
            }),
            delay: None,
        })
    }

    fn record(&self, request: &GraphQLRequest, options: &DispatchOptions) {
        self.requests.lock().push(RecordedRequest {
            request: request.clone(),
            options: options.clone(),
        });
    }
}

impl Transport for MockTransport {
    fn execute(
        &self,
        request: &GraphQLRequest,
        options: &DispatchOptions,
    ) -> impl Future<Output = RawResult> + Send {
        self.record(request, options);
        let Scripted { result, delay } = self.next();
        async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            result
        }
    }
}

impl StreamTransport for MockTransport {
    fn open_stream(
        &self,
        request: &GraphQLRequest,
    ) -> impl Future<Output = Result<BoxStream<'static, RawResult>, TransportError>> + Send {
        self.record(request, &DispatchOptions::default());
        let next = self
            .streams
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::network("mock transport has no scripted stream")));
        async move { next.map(|items| stream::iter(items).boxed()) }
    }
}
