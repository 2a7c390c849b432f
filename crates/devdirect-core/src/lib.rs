//! # devdirect-core
//!
//! Shared vocabulary for the DevDirect session layer:
//!
//! - **Identity types**: [`Session`], [`User`], [`Role`], [`AuthMode`]
//! - **Provider events**: [`ProviderEvent`] / [`ProviderEventKind`] from the
//!   external identity provider's change stream
//! - **Transition events**: [`SessionEvent`] broadcast by the session store
//!   through an [`EventEmitter`]
//! - **Logging**: `tracing` subscriber setup and test capture utilities

#![deny(unsafe_code)]

pub mod events;
pub mod logging;
pub mod types;

pub use events::{EventEmitter, SessionEvent, TransitionReason};
pub use types::{AuthMode, ProviderEvent, ProviderEventKind, ROLE_METADATA_KEY, Role, Session, User};
