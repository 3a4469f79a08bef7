//! Executing resources through a `Transport`.
//!
//! # Design
//! `classify` is the whole decision procedure and is pure, so it is tested
//! directly with hand-made outcomes. The order is fixed: a transport error
//! wins over everything, a missing response comes next, then the status
//! predicate, and only an accepted response reaches the parser.
//!
//! `Load` is an extension trait over every cloneable `Transport`, so a
//! `reqwest::Client` gains `fetch` and `load` directly. Each call is
//! independent; nothing is shared between in-flight loads. Every `load`
//! reports back exactly once, even when it is cancelled.

use std::future::Future;
use std::marker::PhantomData;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{Interrupted, NetworkingError};
use crate::resource::Resource;
use crate::transport::{RawOutcome, Transport};

/// Turn a raw transport outcome into the resource's typed result.
///
/// If the outcome carries both an error and a response, the error wins.
pub fn classify<T>(resource: &Resource<T>, outcome: RawOutcome) -> Result<T, NetworkingError> {
    if let Some(error) = outcome.error {
        warn!(resource = %resource, error = %error, "transport failure");
        return Err(NetworkingError::Generic(error));
    }
    let Some(response) = outcome.response else {
        debug!(resource = %resource, "no response metadata");
        return Err(NetworkingError::Response);
    };
    if !resource.accepts_status(response.status) {
        debug!(resource = %resource, status = response.status, "status rejected");
        return Err(NetworkingError::Http {
            status: response.status,
            response,
        });
    }
    resource.parse(outcome.body.as_deref(), Some(&response))
}

/// Loads resources through an HTTP client.
pub trait Load: Transport + Clone + 'static {
    /// Send the resource's request and classify the outcome.
    fn fetch<'a, T>(
        &'a self,
        resource: &'a Resource<T>,
    ) -> impl Future<Output = Result<T, NetworkingError>> + Send + 'a
    where
        T: 'a;

    /// Start loading on the current tokio runtime and return immediately.
    ///
    /// `on_complete` runs exactly once and may run concurrently with the
    /// caller. Normally that is on a runtime worker thread. A load that is
    /// cancelled, or dropped by a runtime shutting down, completes with a
    /// `Generic` error wrapping `Interrupted::Cancelled`. Called outside a
    /// runtime, `on_complete` runs immediately with `Interrupted::NoRuntime`.
    fn load<T, F>(&self, resource: Resource<T>, on_complete: F) -> LoadTask
    where
        T: Send + 'static,
        F: FnOnce(Result<T, NetworkingError>) + Send + 'static;
}

impl<C> Load for C
where
    C: Transport + Clone + 'static,
{
    fn fetch<'a, T>(
        &'a self,
        resource: &'a Resource<T>,
    ) -> impl Future<Output = Result<T, NetworkingError>> + Send + 'a
    where
        T: 'a,
    {
        async move {
            debug!(resource = %resource, "loading");
            let outcome = self.send(resource.request().clone()).await;
            classify(resource, outcome)
        }
    }

    fn load<T, F>(&self, resource: Resource<T>, on_complete: F) -> LoadTask
    where
        T: Send + 'static,
        F: FnOnce(Result<T, NetworkingError>) + Send + 'static,
    {
        let completion = Completion::new(on_complete);
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                warn!(resource = %resource, "load called outside a tokio runtime");
                completion.finish(Err(NetworkingError::Generic(Box::new(
                    Interrupted::NoRuntime,
                ))));
                return LoadTask { handle: None };
            }
        };

        let transport = self.clone();
        let handle = runtime.spawn(async move {
            let result = transport.fetch(&resource).await;
            completion.finish(result);
        });
        LoadTask {
            handle: Some(handle),
        }
    }
}

/// Owns a load's callback and calls it exactly once. If the load future is
/// dropped before finishing, the callback gets `Interrupted::Cancelled`.
struct Completion<T, F>
where
    F: FnOnce(Result<T, NetworkingError>),
{
    on_complete: Option<F>,
    _result: PhantomData<fn(T)>,
}

impl<T, F> Completion<T, F>
where
    F: FnOnce(Result<T, NetworkingError>),
{
    fn new(on_complete: F) -> Self {
        Self {
            on_complete: Some(on_complete),
            _result: PhantomData,
        }
    }

    fn finish(mut self, result: Result<T, NetworkingError>) {
        if let Some(on_complete) = self.on_complete.take() {
            on_complete(result);
        }
    }
}

impl<T, F> Drop for Completion<T, F>
where
    F: FnOnce(Result<T, NetworkingError>),
{
    fn drop(&mut self) {
        if let Some(on_complete) = self.on_complete.take() {
            debug!("load dropped before completing");
            on_complete(Err(NetworkingError::Generic(Box::new(
                Interrupted::Cancelled,
            ))));
        }
    }
}

/// Handle to a load started with `Load::load`.
///
/// Dropping the handle does not cancel the load.
#[derive(Debug)]
pub struct LoadTask {
    handle: Option<JoinHandle<()>>,
}

impl LoadTask {
    /// Cancel the load. If its callback has not run yet, it runs with
    /// `Interrupted::Cancelled`; otherwise this does nothing.
    pub fn cancel(&self) {
        if let Some(handle) = &self.handle {
            handle.abort();
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Wait for the load to settle. Returns `false` if it was cancelled
    /// before the response arrived.
    pub async fn join(self) -> bool {
        let Some(handle) = self.handle else {
            return true;
        };
        match handle.await {
            Ok(()) => true,
            Err(e) if e.is_cancelled() => false,
            Err(e) => std::panic::resume_unwind(e.into_panic()),
        }
    }
}
