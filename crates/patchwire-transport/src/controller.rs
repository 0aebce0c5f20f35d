use std::future::Future;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use futures::FutureExt;
use patchwire_codec::{script, HeaderTemplate, KEEPALIVE};
use patchwire_core::{Body, EventStream, PatchwireError, Response, SessionStore};

use crate::buffer::ResponseBuffer;
use crate::builder::PatchBuilder;
use crate::guard::{StreamContext, StreamGuard, StreamTask};
use crate::navigate::NavigationValidator;
use crate::stream::StreamLink;

/// Alternate response for clients that do not speak the protocol.
pub enum Fallback {
    Ready(Response),
    Lazy(Box<dyn FnOnce() -> Response + Send>),
}

impl Fallback {
    fn resolve(self) -> Response {
        match self {
            Fallback::Ready(response) => response,
            Fallback::Lazy(build) => build(),
        }
    }
}

/// Per-request response under construction.
///
/// Dereferences to the [`PatchBuilder`] for emitting operations. Consumed by
/// [`ReactiveResponse::finalize`], the only way to obtain the HTTP response.
pub struct ReactiveResponse {
    builder: PatchBuilder,
    session: Option<Arc<dyn SessionStore>>,
    fallback: Option<Fallback>,
    redirect: Option<String>,
    task: Option<StreamTask>,
}

impl ReactiveResponse {
    pub(crate) fn new(builder: PatchBuilder) -> Self {
        Self {
            builder,
            session: None,
            fallback: None,
            redirect: None,
            task: None,
        }
    }

    /// Session store to release before a streaming callback starts.
    pub fn with_session(&mut self, session: Arc<dyn SessionStore>) -> &mut Self {
        self.session = Some(session);
        self
    }

    /// Response returned verbatim when the request lacks the protocol header.
    pub fn fallback(&mut self, response: Response) -> &mut Self {
        self.fallback = Some(Fallback::Ready(response));
        self
    }

    /// Like [`fallback`](Self::fallback), built only if it is actually needed.
    pub fn fallback_with<F>(&mut self, build: F) -> &mut Self
    where
        F: FnOnce() -> Response + Send + 'static,
    {
        self.fallback = Some(Fallback::Lazy(Box::new(build)));
        self
    }

    /// Marks the response as a redirect. Wins over both the fallback and any
    /// buffered output at finalization.
    pub fn redirect(&mut self, url: &str) -> Result<&mut Self, PatchwireError> {
        NavigationValidator::new(self.builder.request()).check_url(url)?;
        self.redirect = Some(url.to_string());
        Ok(self)
    }

    pub fn pending_redirect(&self) -> Option<&str> {
        self.redirect.as_deref()
    }

    /// Switches to streaming. `callback` runs at finalization with a
    /// [`StreamContext`] wrapping this response's builder; everything emitted
    /// before this call is flushed ahead of it.
    pub fn stream<F, Fut>(&mut self, callback: F) -> Result<&mut Self, PatchwireError>
    where
        F: FnOnce(StreamContext) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), PatchwireError>> + Send + 'static,
    {
        self.builder.enter_streaming()?;
        self.task = Some(Box::new(move |ctx| callback(ctx).boxed()));
        Ok(self)
    }

    pub fn is_streaming(&self) -> bool {
        self.task.is_some()
    }

    /// Resolves the response. Precedence: redirect, then non-protocol
    /// fallback / no-content, then streaming, then the batch payload.
    pub fn finalize(mut self) -> Result<Response, PatchwireError> {
        let protocol = self.builder.is_active();

        if let Some(url) = self.redirect.take() {
            tracing::debug!("ReactiveResponse: finalizing as redirect to {}", url);
            if !protocol {
                return Ok(Response::redirect(&url));
            }
            let op = script::script_operation(&script::replace_document_script(
                &script::redirect_document(&url)?,
            )?);
            let mut buffer = ResponseBuffer::new();
            buffer.push(self.builder.encode(&op)?)?;
            return Ok(self.batch_response(buffer));
        }

        if !protocol {
            return Ok(match self.fallback.take() {
                Some(fallback) => {
                    tracing::debug!("ReactiveResponse: non-protocol request, using fallback");
                    fallback.resolve()
                }
                None => Response::no_content(),
            });
        }

        if let Some(task) = self.task.take() {
            return self.start_stream(task);
        }

        let buffer = self.builder.take_buffer();
        tracing::debug!("ReactiveResponse: flushing {} buffered blocks", buffer.len());
        Ok(self.batch_response(buffer))
    }

    fn batch_response(&self, buffer: ResponseBuffer) -> Response {
        let payload = buffer.into_payload(self.builder.config().keepalive);
        let mut response = Response::new(200, Body::Full(payload));
        response.headers = HeaderTemplate::event_stream().render(self.builder.request().is_http11());
        response
    }

    fn start_stream(mut self, task: StreamTask) -> Result<Response, PatchwireError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| PatchwireError::Transport("streaming requires a tokio runtime".into()))?;

        if let Some(session) = self.session.take() {
            session.release();
        }

        let (tx, body) = EventStream::channel();
        let link = StreamLink::new(tx);
        if self.builder.config().keepalive {
            link.send(bytes::Bytes::from_static(KEEPALIVE.as_bytes()))?;
        }
        let pending = self.builder.attach_stream(link.clone());
        tracing::debug!("ReactiveResponse: streaming, {} blocks flushed first", pending.len());
        for block in pending {
            link.send(block)?;
        }

        let headers = HeaderTemplate::event_stream().render(self.builder.request().is_http11());
        let guard = StreamGuard::new(link, self.builder.collaborators().exceptions.clone());
        let ctx = StreamContext::new(self.builder);
        runtime.spawn(guard.run(ctx, task));

        let mut response = Response::new(200, Body::Stream(body));
        response.headers = headers;
        Ok(response)
    }
}

impl std::fmt::Debug for ReactiveResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactiveResponse")
            .field("builder", &self.builder)
            .field("redirect", &self.redirect)
            .field("has_fallback", &self.fallback.is_some())
            .field("streaming", &self.task.is_some())
            .finish()
    }
}

impl Deref for ReactiveResponse {
    type Target = PatchBuilder;

    fn deref(&self) -> &PatchBuilder {
        &self.builder
    }
}

impl DerefMut for ReactiveResponse {
    fn deref_mut(&mut self) -> &mut PatchBuilder {
        &mut self.builder
    }
}
