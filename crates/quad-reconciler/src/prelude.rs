//! # Prelude
//!
//! Re-exports the types most callers construct a reconcile cycle with.

pub use crate::artifact::{Artifact, ArtifactStore, UnitKey, UnitType};
pub use crate::compose::{ComposeFile, ComposeProject, Service};
pub use crate::config::{Config, RepoDescriptor};
pub use crate::git::{GitSyncer, SyncResult};
pub use crate::hash::ContentHash;
pub use crate::manager::{ManagerError, Scope, ServiceManager, SystemdManager};
pub use crate::reconciler::{ReconcileOutcome, Reconciler};
pub use crate::state::{State, StateStore};
