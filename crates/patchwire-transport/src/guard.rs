//! Lifecycle of a streaming callback.
//!
//! Redirects and dumps on an open event stream must not write raw output
//! and bail out: the client would receive a truncated stream. Instead the
//! callback gets a [`StreamContext`] whose `redirect` / `dump_and_terminate`
//! emit one terminal event and close the link. Errors and panics escaping
//! the callback are turned into the same kind of terminal event by
//! [`StreamGuard`].

use std::convert::Infallible;
use std::ops::{Deref, DerefMut};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use patchwire_codec::script;
use patchwire_core::{ExceptionRenderer, Fault, PatchwireError};
use serde::Serialize;

use crate::builder::PatchBuilder;
use crate::navigate::NavigationValidator;
use crate::stream::StreamLink;

pub type StreamTask =
    Box<dyn FnOnce(StreamContext) -> BoxFuture<'static, Result<(), PatchwireError>> + Send>;

/// The builder handed to a streaming callback, plus the capabilities that
/// end the stream early.
pub struct StreamContext {
    builder: PatchBuilder,
}

impl StreamContext {
    pub(crate) fn new(builder: PatchBuilder) -> Self {
        Self { builder }
    }

    /// Sends the client to `url` and ends the stream.
    ///
    /// Always returns `Err`: `Terminated` on success so that `?` leaves the
    /// callback, or the validation / transport error that prevented it.
    pub fn redirect(&mut self, url: &str) -> Result<Infallible, PatchwireError> {
        NavigationValidator::new(self.builder.request()).check_url(url)?;
        tracing::info!("StreamContext: redirect to {} ends the stream", url);
        let document = script::redirect_document(url)?;
        self.finish_with(&document)
    }

    /// Replaces the page with a dump of `value` and ends the stream.
    pub fn dump_and_terminate(&mut self, value: impl Serialize) -> Result<Infallible, PatchwireError> {
        let value = serde_json::to_value(value)?;
        tracing::info!("StreamContext: dump ends the stream");
        let document = script::dump_document(&value)?;
        self.finish_with(&document)
    }

    pub fn is_terminated(&self) -> bool {
        self.builder.is_terminated()
    }

    fn finish_with(&mut self, document: &str) -> Result<Infallible, PatchwireError> {
        let op = script::script_operation(&script::replace_document_script(document)?);
        self.builder.terminate(op)?;
        Err(PatchwireError::Terminated)
    }
}

impl std::fmt::Debug for StreamContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("StreamContext").field(&self.builder).finish()
    }
}

impl Deref for StreamContext {
    type Target = PatchBuilder;

    fn deref(&self) -> &PatchBuilder {
        &self.builder
    }
}

impl DerefMut for StreamContext {
    fn deref_mut(&mut self) -> &mut PatchBuilder {
        &mut self.builder
    }
}

/// Runs the callback and guarantees the stream ends on a well-formed block.
pub(crate) struct StreamGuard {
    link: StreamLink,
    exceptions: Option<Arc<dyn ExceptionRenderer>>,
}

impl StreamGuard {
    pub(crate) fn new(link: StreamLink, exceptions: Option<Arc<dyn ExceptionRenderer>>) -> Self {
        Self { link, exceptions }
    }

    pub(crate) async fn run(self, ctx: StreamContext, task: StreamTask) {
        // The task is invoked inside the async block so that a panic while
        // building its future is caught as well.
        let outcome = AssertUnwindSafe(async move { task(ctx).await })
            .catch_unwind()
            .await;

        let fault = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(err)) if err.is_termination() => None,
            Ok(Err(err)) if self.link.is_peer_gone() => {
                tracing::debug!("StreamGuard: client gone ({}), nothing to render", err);
                None
            }
            Ok(Err(err)) => {
                tracing::warn!("StreamGuard: stream callback failed: {}", err);
                Some(Fault::from_error(&err))
            }
            Err(payload) => {
                let fault = Fault::from_panic(payload.as_ref());
                tracing::error!("StreamGuard: stream callback panicked: {}", fault.message);
                Some(fault)
            }
        };

        match fault {
            Some(fault) if !self.link.is_closed() => self.write_fault(&fault),
            Some(_) => tracing::debug!("StreamGuard: fault after terminal event dropped"),
            None => {}
        }
        tracing::debug!("StreamGuard: stream closed");
    }

    fn write_fault(&self, fault: &Fault) {
        if let Err(err) = self.send_fault(fault) {
            tracing::debug!("StreamGuard: could not deliver error page: {}", err);
        }
    }

    /// Encodes with the envelope the callback last set.
    fn send_fault(&self, fault: &Fault) -> Result<(), PatchwireError> {
        let document = match &self.exceptions {
            Some(renderer) => renderer.render(fault),
            None => script::fault_document(fault),
        };
        let op = script::script_operation(&script::replace_document_script(&document)?);
        let block = op.encode(&self.link.envelope())?;
        self.link.send_terminal(block)
    }
}
