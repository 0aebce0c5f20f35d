//! Patch operations and their event-stream wire encoding.

pub mod element;
pub mod event;
pub mod headers;
pub mod merge;
pub mod script;
pub mod wire;

pub use element::{ElementPatch, PatchMode, ScrollEdge};
pub use event::{encode_block, EventEnvelope, PatchOperation};
pub use headers::{HeaderTemplate, KEEPALIVE};
pub use merge::apply_merge_patch;
pub use script::DispatchOptions;
pub use wire::{parse_events, WireEvent, WireStream};
