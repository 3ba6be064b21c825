//! # Error Taxonomy
//!
//! Shared error kinds used across the reconciliation engine. Each
//! component that the spec calls out with its own error surface
//! (artifact store, service-manager client, git syncer, generator) gets
//! its own `thiserror` enum living in that component's module; this file
//! holds only the cancellation error shared by all of them.

use thiserror::Error;

/// A long-running operation observed its cancellation token fire.
#[derive(Debug, Error)]
#[error("operation cancelled")]
pub struct Cancelled;
