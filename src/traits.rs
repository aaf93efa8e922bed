//! Seams between the synchronisation engine and its collaborators.

use std::future::Future;
use std::sync::Arc;

use crate::cancel::CancelToken;
use crate::error::RoutingError;
use crate::model::{RouteResponse, RoutesRequest};

/// Submits a bundled routing request to the backend.
///
/// Implementations must observe `cancel`: once it fires, the returned future
/// resolves to [`RoutingError::Cancelled`] rather than a genuine failure.
pub trait RoutingClient: Send + Sync + 'static {
    fn submit(
        &self,
        request: &RoutesRequest,
        cancel: CancelToken,
    ) -> impl Future<Output = Result<RouteResponse, RoutingError>> + Send;
}

impl<C: RoutingClient> RoutingClient for Arc<C> {
    fn submit(
        &self,
        request: &RoutesRequest,
        cancel: CancelToken,
    ) -> impl Future<Output = Result<RouteResponse, RoutingError>> + Send {
        (**self).submit(request, cancel)
    }
}
