use std::sync::Arc;

use bytes::Bytes;
use patchwire_codec::script::{self, DispatchOptions};
use patchwire_codec::{ElementPatch, EventEnvelope, PatchMode, PatchOperation};
use patchwire_core::{EngineConfig, PatchwireError, RequestInfo};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::buffer::ResponseBuffer;
use crate::engine::Collaborators;
use crate::navigate::{NavigateIntent, NavigateOptions, NavigateTarget, NavigationValidator, UrlLock};
use crate::stream::StreamLink;

pub type BuildResult<'a> = Result<&'a mut PatchBuilder, PatchwireError>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateOptions {
    /// Forwarded to the client; the server cannot see live client state.
    pub only_if_missing: bool,
}

/// One fragment of a multi-fragment render, with its own data scope.
#[derive(Debug, Clone)]
pub struct FragmentRequest {
    pub template: String,
    pub fragment: String,
    pub data: Value,
    pub target: ElementPatch,
}

impl FragmentRequest {
    pub fn new(template: &str, fragment: &str, data: Value) -> Self {
        Self {
            template: template.to_string(),
            fragment: fragment.to_string(),
            data,
            target: ElementPatch::new(),
        }
    }

    pub fn target(mut self, target: ElementPatch) -> Self {
        self.target = target;
        self
    }
}

pub(crate) enum Sink {
    Buffer(ResponseBuffer),
    Stream(StreamLink),
}

/// Emission surface shared by batch and streaming responses.
///
/// In batch mode each call appends one block to the response buffer; inside a
/// stream callback the very same calls write straight to the connection.
/// For non-protocol requests every call validates its input and then does
/// nothing.
pub struct PatchBuilder {
    config: Arc<EngineConfig>,
    request: Arc<dyn RequestInfo>,
    collaborators: Collaborators,
    active: bool,
    envelope: EventEnvelope,
    url_lock: UrlLock,
    sink: Sink,
}

impl PatchBuilder {
    pub(crate) fn new(
        config: Arc<EngineConfig>,
        request: Arc<dyn RequestInfo>,
        collaborators: Collaborators,
    ) -> Self {
        let envelope = EventEnvelope {
            id: None,
            retry_ms: config.default_retry_ms,
        };
        Self {
            active: request.is_protocol_request(),
            config,
            request,
            collaborators,
            envelope,
            url_lock: UrlLock::default(),
            sink: Sink::Buffer(ResponseBuffer::new()),
        }
    }

    pub fn request(&self) -> &dyn RequestInfo {
        self.request.as_ref()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// False for non-protocol requests, whose operations are discarded.
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn envelope(&self) -> &EventEnvelope {
        &self.envelope
    }

    /// Line breaks are stripped: they would end the `id:` field early.
    pub fn with_event_id(&mut self, id: &str) -> &mut Self {
        self.envelope.id = Some(id.chars().filter(|c| !matches!(c, '\r' | '\n')).collect());
        self.sync_envelope();
        self
    }

    pub fn with_retry(&mut self, ms: u64) -> &mut Self {
        self.envelope.retry_ms = Some(ms);
        self.sync_envelope();
        self
    }

    fn sync_envelope(&self) {
        if let Sink::Stream(link) = &self.sink {
            link.set_envelope(&self.envelope);
        }
    }

    /// Emits a prepared operation as is.
    pub fn push_operation(&mut self, op: PatchOperation) -> BuildResult<'_> {
        if !self.active {
            return Ok(self);
        }
        let block = op.encode(&self.envelope)?;
        match &mut self.sink {
            Sink::Buffer(buffer) => buffer.push(block)?,
            Sink::Stream(link) => link.send(block)?,
        }
        Ok(self)
    }

    // ---- state --------------------------------------------------------------

    pub fn state(&mut self, key: &str, value: impl Serialize) -> BuildResult<'_> {
        let mut patch = Map::new();
        patch.insert(key.to_string(), serde_json::to_value(value)?);
        self.emit_state(patch, StateOptions::default())
    }

    pub fn state_if_missing(&mut self, key: &str, value: impl Serialize) -> BuildResult<'_> {
        let mut patch = Map::new();
        patch.insert(key.to_string(), serde_json::to_value(value)?);
        self.emit_state(patch, StateOptions { only_if_missing: true })
    }

    /// Merge patch against the client state. `null` values delete keys.
    pub fn patch_state(&mut self, patch: impl Serialize) -> BuildResult<'_> {
        self.patch_state_with(patch, StateOptions::default())
    }

    pub fn patch_state_with(&mut self, patch: impl Serialize, options: StateOptions) -> BuildResult<'_> {
        let patch = to_object(patch, "state patch")?;
        self.emit_state(patch, options)
    }

    /// Deletes keys client-side; always-array keys are reset to `[]` instead.
    pub fn forget<I, S>(&mut self, keys: I) -> BuildResult<'_>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut patch = Map::new();
        for key in keys {
            let key = key.as_ref();
            let reset = if self.config.is_always_array(key) {
                Value::Array(Vec::new())
            } else {
                Value::Null
            };
            patch.insert(key.to_string(), reset);
        }
        if patch.is_empty() {
            return Ok(self);
        }
        self.emit_state(patch, StateOptions::default())
    }

    /// Publishes validation feedback under the `errors` key.
    pub fn errors(&mut self, errors: impl Serialize) -> BuildResult<'_> {
        self.state("errors", errors)
    }

    pub fn clear_errors(&mut self) -> BuildResult<'_> {
        self.forget(["errors"])
    }

    fn emit_state(&mut self, patch: Map<String, Value>, options: StateOptions) -> BuildResult<'_> {
        self.push_operation(PatchOperation::State {
            patch,
            only_if_missing: options.only_if_missing,
        })
    }

    // ---- elements -----------------------------------------------------------

    pub fn patch_elements(&mut self, markup: &str, target: ElementPatch) -> BuildResult<'_> {
        if target.limit == Some(0) {
            return Err(PatchwireError::usage("element patch limit must be at least 1"));
        }
        if target.mode == PatchMode::Remove && target.selector.is_none() && markup.trim().is_empty() {
            return Err(PatchwireError::usage("remove needs a selector or markup with ids"));
        }
        if target.mode != PatchMode::Remove && markup.trim().is_empty() {
            return Err(PatchwireError::usage("element patch without markup"));
        }
        self.push_operation(PatchOperation::Elements {
            markup: markup.to_string(),
            target,
        })
    }

    /// Replaces elements matched by the ids in `markup`.
    pub fn html(&mut self, markup: &str) -> BuildResult<'_> {
        self.patch_elements(markup, ElementPatch::new())
    }

    pub fn outer(&mut self, selector: &str, markup: &str) -> BuildResult<'_> {
        self.patch_elements(markup, ElementPatch::at(selector, PatchMode::OuterReplace))
    }

    pub fn inner(&mut self, selector: &str, markup: &str) -> BuildResult<'_> {
        self.patch_elements(markup, ElementPatch::at(selector, PatchMode::InnerReplace))
    }

    pub fn morph(&mut self, selector: &str, markup: &str) -> BuildResult<'_> {
        self.patch_elements(markup, ElementPatch::at(selector, PatchMode::OuterMergePatch))
    }

    pub fn morph_inner(&mut self, selector: &str, markup: &str) -> BuildResult<'_> {
        self.patch_elements(markup, ElementPatch::at(selector, PatchMode::InnerMergePatch))
    }

    pub fn append(&mut self, selector: &str, markup: &str) -> BuildResult<'_> {
        self.patch_elements(markup, ElementPatch::at(selector, PatchMode::Append))
    }

    pub fn prepend(&mut self, selector: &str, markup: &str) -> BuildResult<'_> {
        self.patch_elements(markup, ElementPatch::at(selector, PatchMode::Prepend))
    }

    pub fn before(&mut self, selector: &str, markup: &str) -> BuildResult<'_> {
        self.patch_elements(markup, ElementPatch::at(selector, PatchMode::InsertBefore))
    }

    pub fn after(&mut self, selector: &str, markup: &str) -> BuildResult<'_> {
        self.patch_elements(markup, ElementPatch::at(selector, PatchMode::InsertAfter))
    }

    pub fn remove(&mut self, selector: &str) -> BuildResult<'_> {
        self.patch_elements("", ElementPatch::at(selector, PatchMode::Remove))
    }

    // ---- rendering ----------------------------------------------------------

    pub fn view(&mut self, template: &str, data: impl Serialize, target: ElementPatch) -> BuildResult<'_> {
        let data = serde_json::to_value(data)?;
        let renderer = self
            .collaborators
            .templates
            .clone()
            .ok_or_else(|| PatchwireError::render("no template renderer installed"))?;
        let markup = renderer.render(template, &data)?;
        self.patch_elements(&markup, target)
    }

    pub fn fragment(
        &mut self,
        template: &str,
        fragment: &str,
        data: impl Serialize,
        target: ElementPatch,
    ) -> BuildResult<'_> {
        let request = FragmentRequest::new(template, fragment, serde_json::to_value(data)?).target(target);
        self.fragments(&[request])
    }

    /// Renders every fragment first, then emits one block per fragment. A
    /// missing fragment fails the whole call before anything is emitted.
    pub fn fragments(&mut self, requests: &[FragmentRequest]) -> BuildResult<'_> {
        let resolver = self
            .collaborators
            .fragments
            .clone()
            .ok_or_else(|| PatchwireError::render("no fragment resolver installed"))?;
        let mut rendered = Vec::with_capacity(requests.len());
        for req in requests {
            let markup = resolver.render(&req.template, &req.fragment, &req.data)?;
            rendered.push((markup, req.target.clone()));
        }
        for (markup, target) in rendered {
            self.patch_elements(&markup, target)?;
        }
        Ok(self)
    }

    // ---- components ---------------------------------------------------------

    pub fn component_state(&mut self, component: &str, patch: impl Serialize) -> BuildResult<'_> {
        self.component_state_with(component, patch, StateOptions::default())
    }

    pub fn component_state_with(
        &mut self,
        component: &str,
        patch: impl Serialize,
        options: StateOptions,
    ) -> BuildResult<'_> {
        check_name(component, "component")?;
        let patch = to_object(patch, "component state")?;
        self.push_operation(PatchOperation::ComponentState {
            component: component.to_string(),
            patch,
            only_if_missing: options.only_if_missing,
        })
    }

    /// Calls `method` on the named component. Non-array args become a single argument.
    pub fn component_method(&mut self, component: &str, method: &str, args: impl Serialize) -> BuildResult<'_> {
        check_name(component, "component")?;
        check_name(method, "method")?;
        let args = match serde_json::to_value(args)? {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            other => vec![other],
        };
        self.push_operation(PatchOperation::MethodInvocation {
            component: component.to_string(),
            method: method.to_string(),
            args,
        })
    }

    // ---- scripts ------------------------------------------------------------

    pub fn script(&mut self, code: &str) -> BuildResult<'_> {
        self.push_operation(script::script_operation(code))
    }

    pub fn dispatch(&mut self, event: &str, detail: impl Serialize, options: DispatchOptions) -> BuildResult<'_> {
        let code = script::dispatch_script(event, &detail, &options)?;
        self.script(&code)
    }

    pub fn console_log(&mut self, value: impl Serialize) -> BuildResult<'_> {
        let code = script::console_log_script(&serde_json::to_value(value)?)?;
        self.script(&code)
    }

    // ---- navigation ---------------------------------------------------------

    /// Asks the client to navigate. Allowed once per response.
    pub fn navigate(
        &mut self,
        target: impl Into<NavigateTarget>,
        key: Option<&str>,
        options: NavigateOptions,
    ) -> BuildResult<'_> {
        self.url_lock.ensure_unlocked()?;
        let url = NavigationValidator::new(self.request.as_ref()).resolve(&target.into())?;
        self.url_lock.lock();
        let intent = NavigateIntent {
            url: &url,
            key: key.unwrap_or("true"),
            options: &options,
            nonce: uuid::Uuid::new_v4().simple().to_string(),
        };
        let code = script::dispatch_script(&self.config.navigate_event, &intent, &DispatchOptions::global())?;
        tracing::debug!("PatchBuilder: navigate to {}", url);
        self.script(&code)
    }

    pub fn navigate_merge(&mut self, target: impl Into<NavigateTarget>, key: Option<&str>) -> BuildResult<'_> {
        self.navigate(target, key, NavigateOptions::merge_with_current())
    }

    pub fn navigate_except<S: AsRef<str>>(&mut self, params: &[S], key: Option<&str>) -> BuildResult<'_> {
        let path = self.request.current_path().to_string();
        self.navigate(path, key, NavigateOptions::except_params(params))
    }

    pub fn navigate_only<S: AsRef<str>>(&mut self, params: &[S], key: Option<&str>) -> BuildResult<'_> {
        let path = self.request.current_path().to_string();
        self.navigate(path, key, NavigateOptions::only_params(params))
    }

    pub fn navigate_replace(&mut self, target: impl Into<NavigateTarget>, key: Option<&str>) -> BuildResult<'_> {
        self.navigate(target, key, NavigateOptions::replace_history_entry())
    }

    /// Stays on the current path, keeps the live query and drops `param`.
    pub fn reset_pagination(&mut self, param: &str, key: Option<&str>) -> BuildResult<'_> {
        let path = self.request.current_path().to_string();
        self.navigate(path, key, NavigateOptions::reset_pagination(param))
    }

    pub fn is_url_locked(&self) -> bool {
        self.url_lock.is_locked()
    }

    // ---- crate plumbing -------------------------------------------------------

    pub(crate) fn encode(&self, op: &PatchOperation) -> Result<Bytes, PatchwireError> {
        op.encode(&self.envelope)
    }

    pub(crate) fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    pub(crate) fn enter_streaming(&mut self) -> Result<(), PatchwireError> {
        match &mut self.sink {
            Sink::Buffer(buffer) => buffer.enter_streaming(),
            Sink::Stream(_) => Err(PatchwireError::usage("response is already streaming")),
        }
    }

    /// Swaps the buffer for a live link, returning what was buffered.
    pub(crate) fn attach_stream(&mut self, link: StreamLink) -> Vec<Bytes> {
        link.set_envelope(&self.envelope);
        match std::mem::replace(&mut self.sink, Sink::Stream(link)) {
            Sink::Buffer(mut buffer) => buffer.drain(),
            Sink::Stream(_) => Vec::new(),
        }
    }

    pub(crate) fn take_buffer(&mut self) -> ResponseBuffer {
        match std::mem::replace(&mut self.sink, Sink::Buffer(ResponseBuffer::new())) {
            Sink::Buffer(buffer) => buffer,
            Sink::Stream(_) => ResponseBuffer::new(),
        }
    }

    /// Writes a terminal block; every later emission fails with `Terminated`.
    pub(crate) fn terminate(&mut self, op: PatchOperation) -> Result<(), PatchwireError> {
        let block = self.encode(&op)?;
        match &mut self.sink {
            Sink::Stream(link) => link.send_terminal(block),
            Sink::Buffer(_) => Err(PatchwireError::usage("terminal events are only valid while streaming")),
        }
    }

    pub(crate) fn is_terminated(&self) -> bool {
        matches!(&self.sink, Sink::Stream(link) if link.is_closed())
    }
}

impl std::fmt::Debug for PatchBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatchBuilder")
            .field("path", &self.request.current_path())
            .field("active", &self.active)
            .field("envelope", &self.envelope)
            .field("url_lock", &self.url_lock)
            .field("streaming", &matches!(self.sink, Sink::Stream(_)))
            .finish_non_exhaustive()
    }
}

fn to_object(value: impl Serialize, what: &str) -> Result<Map<String, Value>, PatchwireError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(PatchwireError::usage(format!(
            "{what} must serialize to a JSON object, got {other}"
        ))),
    }
}

fn check_name(name: &str, what: &str) -> Result<(), PatchwireError> {
    if name.trim().is_empty() || name.contains(&['\n', '\r'][..]) {
        return Err(PatchwireError::usage(format!("{what} name must be a non-empty single line")));
    }
    Ok(())
}
