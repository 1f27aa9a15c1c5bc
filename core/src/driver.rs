//! Drives one transfer from option application to a finished `Response`.
//!
//! # Design
//! A `Transfer` is created once per perform. It owns the fresh `Response`
//! (which is also the engine's sink) and the result of applying options.
//!
//! The sync path hands the engine the whole transfer at once. The async path
//! moves the request, the transfer and the completion into a `Chain`; each
//! scheduled unit runs one engine step, then either submits the next unit or
//! delivers the outcome. Nothing is shared between units, so no locks are
//! involved, and options are never re-applied after the first unit.
//!
//! There is no cancel call. A chain whose promise has been dropped stops at
//! the next step boundary, dropping the request and with it the engine. A
//! unit the scheduler drops without running completes the transfer with
//! `TransferError::Interrupted`.

use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::{debug, debug_span, trace, warn, Span};
use uuid::Uuid;

use crate::engine::{code, EngineCode, StepStatus, TransferEngine};
use crate::error::TransferError;
use crate::info::{InfoKey, InfoValue, IntInfo};
use crate::option::{PostField, RequestOption};
use crate::parser::ReadState;
use crate::pipeline::{self, Applied};
use crate::request::Request;
use crate::response::Response;
use crate::scheduler::Scheduler;

/// Lifecycle of a single transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Stepping,
    Done,
    Failed,
}

pub(crate) struct Transfer {
    response: Response,
    applied: Applied,
    state: DriverState,
    steps: usize,
    span: Span,
}

pub(crate) enum Progress {
    Pending(Transfer),
    Finished(Result<Response, TransferError>),
}

impl Transfer {
    /// Start a transfer: new response, options applied to the engine.
    pub(crate) fn begin<E: TransferEngine>(
        request_id: Uuid,
        engine: &mut E,
        options: &[RequestOption],
        post_fields: &mut Vec<PostField>,
    ) -> Self {
        let response = Response::new();
        let span = debug_span!("transfer", request = %request_id, transfer = %response.id());
        let applied = {
            let _entered = span.enter();
            debug!(options = options.len(), "starting transfer");
            pipeline::apply(options, post_fields, engine)
        };
        Transfer {
            response,
            applied,
            state: DriverState::Idle,
            steps: 0,
            span,
        }
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> DriverState {
        self.state
    }

    /// Block in the engine until the transfer ends.
    pub(crate) fn run<E: TransferEngine>(mut self, engine: &mut E) -> Result<Response, TransferError> {
        let span = self.span.clone();
        let _entered = span.enter();
        self.state = DriverState::Stepping;
        let code = engine.run_to_completion(&mut self.response);
        self.finish(engine, code)
    }

    /// Run exactly one engine step.
    pub(crate) fn step<E: TransferEngine>(mut self, engine: &mut E) -> Progress {
        let span = self.span.clone();
        let _entered = span.enter();
        self.state = DriverState::Stepping;
        self.steps += 1;
        match engine.step(&mut self.response) {
            StepStatus::Pending => {
                trace!(step = self.steps, driver = ?self.state, read = ?self.response.read_state(), "transfer pending");
                if let Some(status) = self.http_error(engine) {
                    debug!(status, "failing on HTTP status");
                    return Progress::Finished(self.finish(engine, code::HTTP_RETURNED_ERROR));
                }
                Progress::Pending(self)
            }
            StepStatus::Done => Progress::Finished(self.finish(engine, code::OK)),
            StepStatus::Error(code) => Progress::Finished(self.finish(engine, code)),
        }
    }

    /// HTTP status to fail on, once headers are complete and `FailOnError` is set.
    fn http_error<E: TransferEngine>(&self, engine: &E) -> Option<i64> {
        if !self.applied.fail_on_error || self.response.read_state() != ReadState::Body {
            return None;
        }
        match engine.info(InfoKey::Int(IntInfo::ResponseCode)) {
            Some(InfoValue::Int(status)) if status >= 400 => Some(status),
            _ => None,
        }
    }

    fn finish<E: TransferEngine>(
        mut self,
        engine: &E,
        mut engine_code: EngineCode,
    ) -> Result<Response, TransferError> {
        if engine_code == code::OK && self.http_error(engine).is_some() {
            engine_code = code::HTTP_RETURNED_ERROR;
        }
        self.response.capture_info(engine);
        debug!(
            code = engine_code,
            status = self.response.response_code(),
            steps = self.steps,
            body_len = self.response.body_bytes().len(),
            "transfer finished"
        );

        if engine_code != code::OK {
            self.state = DriverState::Failed;
            return Err(TransferError::Engine {
                code: engine_code,
                description: engine.describe_error(engine_code),
                response: Box::new(self.response),
            });
        }
        if let Some(failure) = self.applied.failures.first() {
            self.state = DriverState::Failed;
            return Err(TransferError::Apply {
                option: failure.option,
                code: failure.code,
                description: engine.describe_error(failure.code),
                response: Box::new(self.response),
            });
        }
        self.state = DriverState::Done;
        Ok(self.response)
    }
}

/// The outcome of an async perform, together with the request that ran it.
pub struct Confirmation<E: TransferEngine> {
    outcome: Result<Response, TransferError>,
    request: Request<E>,
}

impl<E: TransferEngine> Confirmation<E> {
    /// The response, or the error the transfer failed with.
    pub fn confirm(self) -> Result<Response, TransferError> {
        self.outcome
    }

    /// Hands back the request too, for reuse.
    pub fn into_parts(self) -> (Result<Response, TransferError>, Request<E>) {
        (self.outcome, self.request)
    }

    pub fn request(&self) -> &Request<E> {
        &self.request
    }

    /// The state the transfer ended in: `Done` or `Failed`.
    pub fn state(&self) -> DriverState {
        match self.outcome {
            Ok(_) => DriverState::Done,
            Err(_) => DriverState::Failed,
        }
    }
}

pub(crate) type Callback<E> = Box<dyn FnOnce(Confirmation<E>) + Send + 'static>;

pub(crate) enum Completion<E: TransferEngine> {
    Callback(Callback<E>),
    Promise(oneshot::Sender<Result<Response, TransferError>>),
}

impl<E: TransferEngine> Completion<E> {
    fn is_abandoned(&self) -> bool {
        match self {
            Completion::Callback(_) => false,
            Completion::Promise(sender) => sender.is_closed(),
        }
    }

    fn deliver(self, outcome: Result<Response, TransferError>, request: Request<E>) {
        match self {
            Completion::Callback(callback) => callback(Confirmation { outcome, request }),
            Completion::Promise(sender) => {
                if sender.send(outcome).is_err() {
                    trace!("promise dropped before delivery");
                }
            }
        }
    }
}

/// Self-rescheduling async transfer.
///
/// `parts` is `None` once the outcome has been handed off. A chain dropped
/// while still holding its parts (its unit was discarded by the scheduler)
/// delivers `TransferError::Interrupted` instead.
pub(crate) struct Chain<E: TransferEngine> {
    parts: Option<ChainParts<E>>,
    scheduler: Arc<dyn Scheduler>,
}

struct ChainParts<E: TransferEngine> {
    request: Request<E>,
    transfer: Transfer,
    completion: Completion<E>,
}

impl<E: TransferEngine> Chain<E> {
    pub(crate) fn start(
        mut request: Request<E>,
        scheduler: Arc<dyn Scheduler>,
        completion: Completion<E>,
    ) {
        let transfer = request.begin_transfer();
        Chain {
            parts: Some(ChainParts {
                request,
                transfer,
                completion,
            }),
            scheduler,
        }
        .schedule_next();
    }

    fn schedule_next(self) {
        let scheduler = Arc::clone(&self.scheduler);
        scheduler.schedule(Box::new(move || self.run_step()));
    }

    fn run_step(mut self) {
        let Some(ChainParts {
            mut request,
            transfer,
            completion,
        }) = self.parts.take()
        else {
            return;
        };
        if completion.is_abandoned() {
            let _entered = transfer.span.enter();
            debug!(steps = transfer.steps, "transfer abandoned");
            return;
        }
        match transfer.step(request.engine_mut()) {
            Progress::Pending(transfer) => {
                self.parts = Some(ChainParts {
                    request,
                    transfer,
                    completion,
                });
                self.schedule_next();
            }
            Progress::Finished(outcome) => completion.deliver(outcome, request),
        }
    }
}

impl<E: TransferEngine> Drop for Chain<E> {
    fn drop(&mut self) {
        if let Some(ChainParts {
            request,
            transfer,
            completion,
        }) = self.parts.take()
        {
            let _entered = transfer.span.enter();
            warn!(steps = transfer.steps, "scheduled step dropped before running");
            completion.deliver(Err(TransferError::Interrupted), request);
        }
    }
}
