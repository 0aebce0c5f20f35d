use std::sync::Arc;

use patchwire_core::{EngineConfig, ExceptionRenderer, FragmentResolver, RequestInfo, TemplateRenderer};

use crate::builder::PatchBuilder;
use crate::controller::ReactiveResponse;

/// Host-provided rendering hooks, shared by every response.
#[derive(Clone, Default)]
pub struct Collaborators {
    pub templates: Option<Arc<dyn TemplateRenderer>>,
    pub fragments: Option<Arc<dyn FragmentResolver>>,
    pub exceptions: Option<Arc<dyn ExceptionRenderer>>,
}

/// Long-lived, per-worker entry point.
///
/// Holds only immutable configuration; all per-request state lives in the
/// [`ReactiveResponse`] returned by [`Engine::begin`], so one engine serves
/// any number of requests in sequence or in parallel.
#[derive(Clone)]
pub struct Engine {
    config: Arc<EngineConfig>,
    collaborators: Collaborators,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config: Arc::new(config),
            collaborators: Collaborators::default(),
        }
    }

    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Starts a fresh response for `request`.
    pub fn begin(&self, request: Arc<dyn RequestInfo>) -> ReactiveResponse {
        tracing::debug!(
            "Engine: begin response for {} (protocol: {})",
            request.current_path(),
            request.is_protocol_request()
        );
        ReactiveResponse::new(PatchBuilder::new(
            self.config.clone(),
            request,
            self.collaborators.clone(),
        ))
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

/// Fluent setup for an [`Engine`].
pub struct EngineBuilder {
    config: EngineConfig,
    collaborators: Collaborators,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            collaborators: Collaborators::default(),
        }
    }

    /// Overrides the default engine configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_templates(mut self, renderer: Arc<dyn TemplateRenderer>) -> Self {
        self.collaborators.templates = Some(renderer);
        self
    }

    pub fn with_fragments(mut self, resolver: Arc<dyn FragmentResolver>) -> Self {
        self.collaborators.fragments = Some(resolver);
        self
    }

    pub fn with_exception_renderer(mut self, renderer: Arc<dyn ExceptionRenderer>) -> Self {
        self.collaborators.exceptions = Some(renderer);
        self
    }

    pub fn build(self) -> Engine {
        Engine {
            config: Arc::new(self.config),
            collaborators: self.collaborators,
        }
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
