//! # Service-Manager Client
//!
//! Trait for the operations the reconciler drives against the host's
//! service manager, plus the shared error taxonomy (spec §4.6). The
//! concrete systemd implementation lives in [`systemd`].

pub mod systemd;

pub use systemd::SystemdManager;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Which bus scope to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    User,
    System,
}

impl Scope {
    /// `auto` resolves to user-mode unless running as root (spec §4.6).
    #[must_use]
    pub fn auto() -> Self {
        if is_root() {
            Scope::System
        } else {
            Scope::User
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::User => "user",
            Scope::System => "system",
        }
    }
}

#[cfg(unix)]
fn is_root() -> bool {
    // SAFETY: geteuid(2) takes no arguments and cannot fail.
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(unix))]
fn is_root() -> bool {
    false
}

#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    #[error("failed to connect to the {scope} service-manager bus: {cause}")]
    ConnectError { scope: &'static str, cause: String },
    #[error("unit {0} not found")]
    NotFound(String),
    #[error("{op} failed for unit {unit} ({scope} scope): {cause}")]
    OpError {
        op: &'static str,
        unit: String,
        scope: &'static str,
        cause: String,
    },
    #[error("operation cancelled")]
    Cancelled,
}

impl ManagerError {
    #[must_use]
    pub fn is_connect_error(&self) -> bool {
        matches!(self, ManagerError::ConnectError { .. })
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, ManagerError::NotFound(_))
    }

    #[must_use]
    pub fn is_op_error(&self) -> bool {
        matches!(self, ManagerError::OpError { .. })
    }
}

/// Capabilities the reconciler needs from the host service manager. Every
/// per-unit operation dispatches concurrently and returns a joined error
/// accumulating every unit's failure (spec §4.6).
#[async_trait]
pub trait ServiceManager: Send + Sync {
    async fn start(&self, units: &[String], cancel: &CancellationToken) -> Result<(), ManagerError>;
    async fn stop(&self, units: &[String], cancel: &CancellationToken) -> Result<(), ManagerError>;
    async fn restart(&self, units: &[String], cancel: &CancellationToken) -> Result<(), ManagerError>;
    async fn reload(&self, units: &[String], cancel: &CancellationToken) -> Result<(), ManagerError>;
    async fn daemon_reload(&self, cancel: &CancellationToken) -> Result<(), ManagerError>;
    async fn enable(&self, units: &[String], cancel: &CancellationToken) -> Result<(), ManagerError>;
    async fn disable(&self, units: &[String], cancel: &CancellationToken) -> Result<(), ManagerError>;
}
