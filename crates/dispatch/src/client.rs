//! The dispatching client.
//!
//! Builds documents from the catalog, sends them through a [`Transport`] and
//! normalizes whatever comes back. Timeouts, the retry hook and the
//! stale-response guard all live here, independent of the transport.

use crate::normalize::{normalize, NormalizeOptions, UniformResult};
use crate::redact::{log_failure, log_request};
use crate::{
    DispatchOptions, GraphQLError, GraphQLRequest, RawResult, RequestTracker, Result,
    StreamTransport, Transport, TransportError,
};
use futures_util::future::BoxFuture;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use graphql_builder::{
    build_batch, build_document, chunk_operations, fragment, BatchDocument, BuildError, Document,
    IncludeSpec, OperationRequest, Selection, Variables, DEFAULT_CHUNK_SIZE,
};
use graphql_definitions::{Definitions, OperationKind};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Decides whether a failed call is sent once more.
pub type RetryHook = Arc<dyn Fn(&UniformResult) -> BoxFuture<'static, bool> + Send + Sync>;

/// Wraps an async closure as a [`RetryHook`].
pub fn retry_hook<F, Fut>(hook: F) -> RetryHook
where
    F: Fn(&UniformResult) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = bool> + Send + 'static,
{
    Arc::new(move |result: &UniformResult| -> BoxFuture<'static, bool> { Box::pin(hook(result)) })
}

/// Client-wide settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Named in synthesized unknown-error records.
    pub endpoint: String,
    /// Log documents and failures at debug level.
    pub debug: bool,
    /// Applied when a call does not set its own timeout.
    pub timeout: Option<Duration>,
    /// Operations per request in [`Client::batch_chunked`].
    pub chunk_size: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            debug: false,
            timeout: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl ClientOptions {
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }
}

/// Progress of a chunked batch, reported after every chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkReport {
    pub index: usize,
    pub total: usize,
    /// Operations in this chunk.
    pub operations: usize,
    pub succeeded: bool,
}

/// Merged outcome of a chunked batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    /// Results of every chunk that returned data, keyed by caller alias.
    pub data: Map<String, Value>,
    /// Errors of failed chunks, keyed by chunk index.
    pub chunk_errors: BTreeMap<usize, Vec<GraphQLError>>,
    /// A newer call with the same request id superseded this one.
    pub lapsed: bool,
}

impl BatchOutcome {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.chunk_errors.is_empty() && !self.lapsed
    }
}

/// A running subscription. Dropping the handle leaves it running; call
/// [`SubscriptionHandle::abort`] to stop it.
#[derive(Debug)]
pub struct SubscriptionHandle {
    task: JoinHandle<()>,
}

impl SubscriptionHandle {
    pub fn abort(&self) {
        self.task.abort();
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits until the server ends the stream or the subscription is aborted.
    pub async fn finished(self) {
        let _ = self.task.await;
    }
}

/// Builds, dispatches and normalizes operations against one endpoint.
pub struct Client<T> {
    definitions: Arc<Definitions>,
    transport: Arc<T>,
    options: ClientOptions,
    retry: Option<RetryHook>,
    tracker: Arc<RequestTracker>,
}

impl<T> Clone for Client<T> {
    fn clone(&self) -> Self {
        Self {
            definitions: Arc::clone(&self.definitions),
            transport: Arc::clone(&self.transport),
            options: self.options.clone(),
            retry: self.retry.clone(),
            tracker: Arc::clone(&self.tracker),
        }
    }
}

impl<T> std::fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("options", &self.options)
            .field("entities", &self.definitions.entities.len())
            .field("retry", &self.retry.is_some())
            .finish_non_exhaustive()
    }
}

impl<T> Client<T> {
    pub fn new(definitions: impl Into<Arc<Definitions>>, transport: T, options: ClientOptions) -> Self {
        Self {
            definitions: definitions.into(),
            transport: Arc::new(transport),
            options,
            retry: None,
            tracker: Arc::new(RequestTracker::new()),
        }
    }

    #[must_use]
    pub fn with_retry_hook(mut self, hook: RetryHook) -> Self {
        self.retry = Some(hook);
        self
    }

    #[must_use]
    pub fn definitions(&self) -> &Definitions {
        &self.definitions
    }

    #[must_use]
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The stale-response guard shared by clones of this client.
    #[must_use]
    pub fn tracker(&self) -> &RequestTracker {
        &self.tracker
    }

    /// Builds the document for `request` without sending it.
    pub fn build_query(
        &self,
        kind: OperationKind,
        request: &OperationRequest,
    ) -> std::result::Result<Document, BuildError> {
        build_document(&self.definitions, kind, request)
    }

    /// Inline selection text of an entity.
    pub fn fragment(
        &self,
        entity: &str,
        include: Option<&IncludeSpec>,
        fields: Option<&str>,
    ) -> std::result::Result<Selection, BuildError> {
        fragment(&self.definitions, entity, include, fields)
    }

    fn normalize_options(&self, multi: bool) -> NormalizeOptions {
        NormalizeOptions {
            multi,
            endpoint: self.options.endpoint.clone(),
        }
    }
}

impl<T: Transport> Client<T> {
    /// Runs a query.
    pub async fn get(&self, request: &OperationRequest, options: &DispatchOptions) -> Result<UniformResult> {
        self.submit(OperationKind::Query, request, options).await
    }

    /// Runs a mutation.
    pub async fn mutate(
        &self,
        request: &OperationRequest,
        options: &DispatchOptions,
    ) -> Result<UniformResult> {
        self.submit(OperationKind::Mutation, request, options).await
    }

    /// Builds and dispatches one operation of any kind.
    ///
    /// Only catalog errors fail the call; every request-level failure is
    /// reported through the returned [`UniformResult`].
    #[tracing::instrument(skip(self, request, options), fields(operation = %request.name))]
    pub async fn submit(
        &self,
        kind: OperationKind,
        request: &OperationRequest,
        options: &DispatchOptions,
    ) -> Result<UniformResult> {
        let document = build_document(&self.definitions, kind, request)?;
        Ok(self
            .dispatch(document.into(), &request.name, self.normalize_options(false), options)
            .await)
    }

    /// Sends a hand-written document. The result is unwrapped at
    /// `expected_key` when given, otherwise at the only root key.
    pub async fn execute_document(
        &self,
        text: &str,
        variables: &Variables,
        expected_key: Option<&str>,
        options: &DispatchOptions,
    ) -> UniformResult {
        let document = Document::raw(text, variables);
        self.dispatch(
            document.into(),
            expected_key.unwrap_or_default(),
            self.normalize_options(false),
            options,
        )
        .await
    }

    /// Sends all `operations` in one aliased request. Data comes back keyed by
    /// the caller's aliases.
    #[tracing::instrument(skip(self, operations, options), fields(operations = operations.len()))]
    pub async fn batch(
        &self,
        kind: OperationKind,
        operations: &IndexMap<String, OperationRequest>,
        options: &DispatchOptions,
    ) -> Result<UniformResult> {
        let batch = build_batch(&self.definitions, kind, operations)?;
        let request = GraphQLRequest::from(batch.document.clone());
        let result = self
            .dispatch(request, "", self.normalize_options(true), options)
            .await;
        Ok(rekey(result, &batch))
    }

    /// Sends `operations` in sequential chunks of `chunk_size`.
    ///
    /// A failing chunk does not stop the batch: its errors are recorded under
    /// its index and later chunks still run. `on_chunk` is called after each
    /// chunk.
    pub async fn batch_chunked<F>(
        &self,
        kind: OperationKind,
        operations: &IndexMap<String, OperationRequest>,
        options: &DispatchOptions,
        mut on_chunk: F,
    ) -> Result<BatchOutcome>
    where
        F: FnMut(ChunkReport),
    {
        let chunks = chunk_operations(operations, self.options.chunk_size);
        let total = chunks.len();
        let mut outcome = BatchOutcome::default();

        for (index, chunk) in chunks.iter().enumerate() {
            tracing::debug!(index, total, operations = chunk.len(), "Dispatching chunk");
            let result = self.batch(kind, chunk, options).await?;

            let succeeded = match result {
                UniformResult::Data(data) => {
                    merge_data(&mut outcome.data, data);
                    true
                }
                UniformResult::Errors { errors, data } => {
                    if let Some(data) = data {
                        merge_data(&mut outcome.data, data);
                    }
                    tracing::warn!(index, errors = errors.len(), "Chunk failed");
                    outcome.chunk_errors.insert(index, errors);
                    false
                }
                UniformResult::Lapsed { .. } => {
                    outcome.lapsed = true;
                    false
                }
            };

            on_chunk(ChunkReport {
                index,
                total,
                operations: chunk.len(),
                succeeded,
            });
            if outcome.lapsed {
                break;
            }
        }

        Ok(outcome)
    }

    /// Sends `request`, applying the timeout, the stale-response guard and
    /// the retry hook.
    async fn dispatch(
        &self,
        request: GraphQLRequest,
        expected_key: &str,
        normalize_options: NormalizeOptions,
        options: &DispatchOptions,
    ) -> UniformResult {
        let timeout = options.timeout.or(self.options.timeout);
        let mut retried = false;

        loop {
            let stamp = options
                .request_id
                .as_deref()
                .map(|id| (id, self.tracker.stamp(id)));

            log_request(self.options.debug, expected_key, &request);
            let raw = match timeout {
                Some(limit) => tokio::time::timeout(limit, self.transport.execute(&request, options))
                    .await
                    .unwrap_or(RawResult::Timeout(limit)),
                None => self.transport.execute(&request, options).await,
            };

            if let Some((id, stamp)) = stamp {
                if !self.tracker.finish(id, stamp) {
                    tracing::debug!(request_id = id, "Discarding stale response");
                    return UniformResult::Lapsed {
                        request_id: id.to_string(),
                    };
                }
            }

            let result = normalize(raw, expected_key, &normalize_options);
            if !result.is_error() {
                return result;
            }
            log_failure(self.options.debug, expected_key, &request, result.errors().len());

            if retried {
                return result;
            }
            let Some(hook) = &self.retry else {
                return result;
            };
            if !hook(&result).await {
                return result;
            }
            tracing::debug!(operation = expected_key, "Retrying request");
            retried = true;
        }
    }
}

impl<T: StreamTransport> Client<T> {
    /// Opens a subscription and calls `on_message` with every normalized
    /// message and `on_error` when the stream fails.
    pub async fn subscribe<M, E>(
        &self,
        request: &OperationRequest,
        mut on_message: M,
        mut on_error: E,
    ) -> Result<SubscriptionHandle>
    where
        M: FnMut(UniformResult) + Send + 'static,
        E: FnMut(TransportError) + Send + 'static,
    {
        let mut stream = self.open_raw(request).await?;
        let expected_key = request.name.clone();
        let normalize_options = self.normalize_options(false);

        let task = tokio::spawn(async move {
            while let Some(raw) = stream.next().await {
                match raw {
                    RawResult::Network(error) => on_error(error),
                    raw => on_message(normalize(raw, &expected_key, &normalize_options)),
                }
            }
            tracing::debug!(operation = %expected_key, "Subscription ended");
        });

        Ok(SubscriptionHandle { task })
    }

    /// Opens a subscription as a stream of normalized messages.
    pub async fn subscribe_stream(
        &self,
        request: &OperationRequest,
    ) -> Result<BoxStream<'static, UniformResult>> {
        let stream = self.open_raw(request).await?;
        let expected_key = request.name.clone();
        let normalize_options = self.normalize_options(false);
        Ok(stream
            .map(move |raw| normalize(raw, &expected_key, &normalize_options))
            .boxed())
    }

    #[tracing::instrument(skip(self, request), fields(operation = %request.name))]
    async fn open_raw(&self, request: &OperationRequest) -> Result<BoxStream<'static, RawResult>> {
        let document = build_document(&self.definitions, OperationKind::Subscription, request)?;
        let graphql_request = GraphQLRequest::from(document);
        log_request(self.options.debug, &request.name, &graphql_request);
        self.transport
            .open_stream(&graphql_request)
            .await
            .map_err(|e| crate::DispatchError::Connect(e.to_string()))
    }
}

/// Re-keys batch data from emitted aliases to caller aliases.
fn rekey(result: UniformResult, batch: &BatchDocument) -> UniformResult {
    let rekey_data = |data: Value| match data {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| {
                    let alias = batch.caller_alias(&key).map_or(key, str::to_string);
                    (alias, value)
                })
                .collect(),
        ),
        other => other,
    };

    match result {
        UniformResult::Data(data) => UniformResult::Data(rekey_data(data)),
        UniformResult::Errors { errors, data } => UniformResult::Errors {
            errors,
            data: data.map(rekey_data),
        },
        lapsed @ UniformResult::Lapsed { .. } => lapsed,
    }
}

fn merge_data(target: &mut Map<String, Value>, data: Value) {
    if let Value::Object(map) = data {
        target.extend(map);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_options_default() {
        let options = ClientOptions::new("http://localhost:4000/graphql");
        assert_eq!(options.chunk_size, DEFAULT_CHUNK_SIZE);
        assert!(options.timeout.is_none());
        assert!(!options.debug);
    }

    #[test]
    fn test_merge_data_ignores_non_objects() {
        let mut target = Map::new();
        merge_data(&mut target, json!({ "a": 1 }));
        merge_data(&mut target, json!(null));
        merge_data(&mut target, json!({ "b": 2 }));
        assert_eq!(Value::Object(target), json!({ "a": 1, "b": 2 }));
    }

    #[test]
    fn test_batch_outcome_is_complete() {
        let mut outcome = BatchOutcome::default();
        assert!(outcome.is_complete());
        outcome.chunk_errors.insert(1, vec![GraphQLError::new("boom")]);
        assert!(!outcome.is_complete());
    }
}
