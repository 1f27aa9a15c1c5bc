//! The `Request` handle: an engine plus an ordered option list.

use std::sync::Arc;

use tokio::sync::oneshot;
use uuid::Uuid;

use crate::driver::{Chain, Completion, Confirmation, Transfer};
use crate::engine::{ensure_global_init, TransferEngine};
use crate::error::TransferError;
use crate::headers::HeaderName;
use crate::option::{PostField, RequestOption};
use crate::promise::Promise;
use crate::response::Response;
use crate::scheduler::Scheduler;

/// A reusable transfer description bound to one engine.
///
/// Options accumulate in call order and are applied to the engine at the
/// start of every perform. Each perform produces a brand new `Response`.
pub struct Request<E: TransferEngine> {
    id: Uuid,
    engine: E,
    options: Vec<RequestOption>,
    post_fields: Vec<PostField>,
}

impl<E: TransferEngine> Request<E> {
    pub fn new(url: impl Into<String>, engine: E) -> Self {
        Self::with_options(url, Vec::new(), engine)
    }

    /// `url` first, then `options` in order.
    pub fn with_options(
        url: impl Into<String>,
        options: impl IntoIterator<Item = RequestOption>,
        engine: E,
    ) -> Self {
        let mut all = vec![RequestOption::Url(url.into())];
        all.extend(options);
        Self::from_options(all, engine)
    }

    pub fn from_options(options: impl IntoIterator<Item = RequestOption>, engine: E) -> Self {
        ensure_global_init::<E>();
        Self {
            id: Uuid::new_v4(),
            engine,
            options: options.into_iter().collect(),
            post_fields: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn options(&self) -> &[RequestOption] {
        &self.options
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Multipart fields gathered by the most recent perform.
    pub fn pending_post_fields(&self) -> &[PostField] {
        &self.post_fields
    }

    pub fn add_option(&mut self, option: RequestOption) -> &mut Self {
        self.options.push(option);
        self
    }

    pub fn add_header(&mut self, name: impl Into<HeaderName>, value: impl Into<String>) -> &mut Self {
        self.add_option(RequestOption::AddHeader(name.into(), value.into()))
    }

    pub fn replace_header(
        &mut self,
        name: impl Into<HeaderName>,
        value: impl Into<String>,
    ) -> &mut Self {
        self.add_option(RequestOption::ReplaceHeader(name.into(), value.into()))
    }

    pub fn remove_header(&mut self, name: impl Into<HeaderName>) -> &mut Self {
        self.add_option(RequestOption::RemoveHeader(name.into()))
    }

    /// Run the whole transfer on the calling thread.
    pub fn perform(&mut self) -> Result<Response, TransferError> {
        let transfer = self.begin_transfer();
        transfer.run(&mut self.engine)
    }

    /// Run the transfer one step at a time on `scheduler`.
    ///
    /// `completion` is called exactly once, from a scheduler thread, after
    /// the final step. The request travels with the transfer and comes back
    /// through the `Confirmation`.
    pub fn perform_async<S, F>(self, scheduler: S, completion: F)
    where
        S: Scheduler,
        F: FnOnce(Confirmation<E>) + Send + 'static,
    {
        Chain::start(
            self,
            Arc::new(scheduler),
            Completion::Callback(Box::new(completion)),
        );
    }

    /// Like `perform_async`, resolving a `Promise` instead of calling back.
    pub fn promise<S: Scheduler>(self, scheduler: S) -> Promise {
        let (sender, receiver) = oneshot::channel();
        Chain::start(self, Arc::new(scheduler), Completion::Promise(sender));
        Promise::new(receiver)
    }

    /// Reset the engine and replace every option.
    ///
    /// Responses already returned are unaffected; they hold their own copy
    /// of the transfer info.
    pub fn reset(&mut self, options: impl IntoIterator<Item = RequestOption>) {
        self.engine.reset();
        self.post_fields.clear();
        self.options = options.into_iter().collect();
        tracing::debug!(request = %self.id, options = self.options.len(), "request reset");
    }

    pub(crate) fn begin_transfer(&mut self) -> Transfer {
        Transfer::begin(self.id, &mut self.engine, &self.options, &mut self.post_fields)
    }

    pub(crate) fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }
}

impl<E: TransferEngine> std::fmt::Debug for Request<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("id", &self.id)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
