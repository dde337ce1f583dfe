//! Session-scoped persistence shared by every validator invocation

mod context;
mod document;
mod session;

#[cfg(test)]
pub(crate) use context::testing;
pub(crate) use context::{SessionKey, StateContext, resolve_state_dir};
pub(crate) use document::{CacheDocument, EntryList, Singleton, Timestamped};
pub(crate) use session::{SessionScopedStore, StoreLimits};
