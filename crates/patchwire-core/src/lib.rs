pub mod config;
pub mod error;
pub mod render;
pub mod request;
pub mod response;
pub mod session;

pub use config::EngineConfig;
pub use error::{PatchwireError, Result};
pub use render::{ExceptionRenderer, Fault, FragmentResolver, StaticTemplates, TemplateRenderer};
pub use request::{HttpVersion, RequestContext, RequestInfo};
pub use response::{Body, EventStream, Response};
pub use session::{MemorySession, SessionStore};
