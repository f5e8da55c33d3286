use crate::{
    DispatchOptions, GraphQLRequest, HttpTransport, RawResult, TransportError, WebSocketTransport,
};
use futures_util::stream::BoxStream;
use std::future::Future;
use std::sync::Arc;

/// Sends one request and decodes whatever comes back.
///
/// Implementations never fail: every outcome, including network failures, is
/// a [`RawResult`].
pub trait Transport: Send + Sync {
    fn execute(
        &self,
        request: &GraphQLRequest,
        options: &DispatchOptions,
    ) -> impl Future<Output = RawResult> + Send;
}

/// Opens a long-lived stream of results for a subscription document.
pub trait StreamTransport: Send + Sync {
    fn open_stream(
        &self,
        request: &GraphQLRequest,
    ) -> impl Future<Output = Result<BoxStream<'static, RawResult>, TransportError>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    fn execute(
        &self,
        request: &GraphQLRequest,
        options: &DispatchOptions,
    ) -> impl Future<Output = RawResult> + Send {
        T::execute(self, request, options)
    }
}

impl<T: StreamTransport> StreamTransport for Arc<T> {
    fn open_stream(
        &self,
        request: &GraphQLRequest,
    ) -> impl Future<Output = Result<BoxStream<'static, RawResult>, TransportError>> + Send {
        T::open_stream(self, request)
    }
}

/// HTTP for queries and mutations, websockets for subscriptions.
#[derive(Debug, Clone)]
pub struct NetworkTransport {
    pub http: HttpTransport,
    pub ws: WebSocketTransport,
}

impl NetworkTransport {
    #[must_use]
    pub fn new(http: HttpTransport, ws: WebSocketTransport) -> Self {
        Self { http, ws }
    }
}

impl Transport for NetworkTransport {
    fn execute(
        &self,
        request: &GraphQLRequest,
        options: &DispatchOptions,
    ) -> impl Future<Output = RawResult> + Send {
        self.http.execute(request, options)
    }
}

impl StreamTransport for NetworkTransport {
    fn open_stream(
        &self,
        request: &GraphQLRequest,
    ) -> impl Future<Output = Result<BoxStream<'static, RawResult>, TransportError>> + Send {
        self.ws.open_stream(request)
    }
}
