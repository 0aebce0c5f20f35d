//! # patchwire
//!
//! Server-side engine for pushing state and DOM patches to a reactive client
//! over one event-stream response.
//!
//! ```no_run
//! use std::sync::Arc;
//! use patchwire::{Engine, RequestContext};
//!
//! # fn main() -> Result<(), patchwire::PatchwireError> {
//! let engine = Engine::default();
//! let request = Arc::new(RequestContext::new("/todos", "app.test").with_protocol());
//!
//! let mut response = engine.begin(request);
//! response.state("count", 5)?.append("#list", "<li>x</li>")?;
//! let _http = response.finalize()?;
//! # Ok(())
//! # }
//! ```

pub use patchwire_codec as codec;
pub use patchwire_transport as transport;

pub use patchwire_codec::{DispatchOptions, ElementPatch, PatchMode, PatchOperation, ScrollEdge};
pub use patchwire_core::{
    Body, EngineConfig, ExceptionRenderer, Fault, FragmentResolver, MemorySession, PatchwireError,
    RequestContext, RequestInfo, Response, SessionStore, StaticTemplates, TemplateRenderer,
};
pub use patchwire_transport::{
    Engine, EngineBuilder, FragmentRequest, NavigateOptions, NavigateTarget, PatchBuilder,
    ReactiveResponse, StateOptions, StreamContext,
};
