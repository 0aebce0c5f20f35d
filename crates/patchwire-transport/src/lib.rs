pub mod buffer;
pub mod builder;
pub mod controller;
pub mod engine;
pub mod guard;
pub mod navigate;
mod stream;

pub use buffer::{ModeFlag, ResponseBuffer};
pub use builder::{BuildResult, FragmentRequest, PatchBuilder, StateOptions};
pub use controller::{Fallback, ReactiveResponse};
pub use engine::{Collaborators, Engine, EngineBuilder};
pub use guard::{StreamContext, StreamTask};
pub use navigate::{NavigateOptions, NavigateTarget, NavigationValidator, UrlLock};
