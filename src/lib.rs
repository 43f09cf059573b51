//! # Render Context Ground Truth
//!
//! Per-request synchronization state for a server that renders component
//! trees and avoids resending definitions the client already holds.
//!
//! ## Invariants
//!
//! 1. **One context per request**: a [`SyncContext`] is created when a request
//!    begins and dropped when it ends. It is never shared between requests and
//!    never looked up ambiently; every consumer receives it explicitly.
//!
//! 2. **Loaded set**: a descriptor appears at most once; adding it again
//!    replaces its UID. Snapshots taken for the response never observe later
//!    mutation.
//!
//! 3. **Frame discipline**: frames are entered through [`FrameScope`] handles.
//!    Dropping a handle restores the enclosing component, action, and
//!    namespace, whether the nested work returned normally, failed, or
//!    unwound.
//!
//! 4. **Mode is fixed**: the mode chosen at [`SyncContext::begin`] holds for the
//!    whole request. `pretty_print` alone decides whether combined output is
//!    minified.
//!
//! 5. **Stale checks**: a descriptor is marked checked only after its
//!    definition has actually been resolved. Re-checking is harmless;
//!    skipping a needed check is not.
//!
//! 6. **Errors propagate**: unresolved definitions, invalid client events,
//!    minifier failures, and sink failures are all returned to the caller.

mod combine;
mod config;
mod context;
mod descriptor;
mod error;
mod frame;
mod loaded;
mod mode;
mod registry;


pub use combine::{ClientLibrary, Combinable, CombiningFormatter, CssMinifier, Minifier};
pub use config::ContextConfig;
pub use context::{ClientContext, ClientEvent, ContextWire, FrameScope, Freshness, SyncContext};
pub use descriptor::{DefType, Descriptor};
pub use error::{Result, SyncError};
pub use frame::{Action, Component, Frame, FrameStack};
pub use loaded::{LoadedSet, LoadedSnapshot, Uid};
pub use mode::{Access, Format, GeneratorMode, Mode, ModePolicy};
pub use registry::{Definition, DefinitionRegistry, EventType, MemoryRegistry};
