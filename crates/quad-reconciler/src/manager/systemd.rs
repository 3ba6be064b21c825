//! # systemd Service Manager
//!
//! [`ServiceManager`] implementation talking to `org.freedesktop.systemd1`
//! over D-Bus via `zbus`. Every per-unit operation is dispatched
//! concurrently and joined with `futures::future::join_all`, matching the
//! teacher's concurrent-fan-out style for per-item work; failures across
//! units are folded into one joined [`ManagerError::OpError`].

use super::{ManagerError, Scope, ServiceManager};
use async_trait::async_trait;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use zbus::zvariant::OwnedObjectPath;

const JOB_MODE: &str = "replace";

#[zbus::proxy(
    interface = "org.freedesktop.systemd1.Manager",
    default_service = "org.freedesktop.systemd1",
    default_path = "/org/freedesktop/systemd1"
)]
trait Manager {
    fn start_unit(&self, name: &str, mode: &str) -> zbus::Result<OwnedObjectPath>;
    fn stop_unit(&self, name: &str, mode: &str) -> zbus::Result<OwnedObjectPath>;
    fn restart_unit(&self, name: &str, mode: &str) -> zbus::Result<OwnedObjectPath>;
    fn reload_unit(&self, name: &str, mode: &str) -> zbus::Result<OwnedObjectPath>;
    fn reload(&self) -> zbus::Result<()>;
    fn enable_unit_files(
        &self,
        files: &[&str],
        runtime: bool,
        force: bool,
    ) -> zbus::Result<(bool, Vec<(String, String, String)>)>;
    fn disable_unit_files(&self, files: &[&str], runtime: bool) -> zbus::Result<Vec<(String, String, String)>>;

    #[zbus(signal)]
    fn job_removed(&self, id: u32, job: OwnedObjectPath, unit: String, result: String) -> zbus::Result<()>;
}

#[derive(Clone, Copy)]
enum UnitOp {
    Start,
    Stop,
    Restart,
    Reload,
}

impl UnitOp {
    fn name(self) -> &'static str {
        match self {
            UnitOp::Start => "start",
            UnitOp::Stop => "stop",
            UnitOp::Restart => "restart",
            UnitOp::Reload => "reload",
        }
    }

    async fn issue(self, proxy: &ManagerProxy<'_>, unit: &str) -> zbus::Result<OwnedObjectPath> {
        match self {
            UnitOp::Start => proxy.start_unit(unit, JOB_MODE).await,
            UnitOp::Stop => proxy.stop_unit(unit, JOB_MODE).await,
            UnitOp::Restart => proxy.restart_unit(unit, JOB_MODE).await,
            UnitOp::Reload => proxy.reload_unit(unit, JOB_MODE).await,
        }
    }
}

/// Live `ServiceManager` backed by a systemd D-Bus connection.
#[derive(Debug)]
pub struct SystemdManager {
    connection: zbus::Connection,
    scope: Scope,
}

impl SystemdManager {
    pub async fn connect(scope: Scope) -> Result<Self, ManagerError> {
        let connection = match scope {
            Scope::User => zbus::Connection::session().await,
            Scope::System => zbus::Connection::system().await,
        }
        .map_err(|e| ManagerError::ConnectError {
            scope: scope.as_str(),
            cause: e.to_string(),
        })?;
        Ok(Self { connection, scope })
    }

    async fn proxy(&self) -> Result<ManagerProxy<'_>, ManagerError> {
        ManagerProxy::new(&self.connection).await.map_err(|e| ManagerError::ConnectError {
            scope: self.scope.as_str(),
            cause: e.to_string(),
        })
    }

    async fn dispatch(&self, op: UnitOp, units: &[String], cancel: &CancellationToken) -> Result<(), ManagerError> {
        if cancel.is_cancelled() {
            return Err(ManagerError::Cancelled);
        }
        let proxy = self.proxy().await?;
        let futures = units.iter().map(|unit| run_one(op, unit, self.scope, &proxy, cancel));
        let results = futures::future::join_all(futures).await;
        join_errors(op.name(), results)
    }
}

async fn run_one(
    op: UnitOp,
    unit: &str,
    scope: Scope,
    proxy: &ManagerProxy<'_>,
    cancel: &CancellationToken,
) -> Result<(), ManagerError> {
    // Subscribe to JobRemoved before issuing the op: a job that completes
    // inside the window between issuing and subscribing would otherwise
    // emit its signal to no one, hanging this wait until cancellation.
    let stream = proxy.receive_job_removed().await.map_err(|e| ManagerError::OpError {
        op: op.name(),
        unit: unit.to_string(),
        scope: scope.as_str(),
        cause: e.to_string(),
    })?;
    let job = op.issue(proxy, unit).await.map_err(|e| to_manager_error(op.name(), unit, scope, &e))?;
    wait_for_job(stream, &job, unit, op.name(), scope, cancel).await
}

async fn wait_for_job(
    mut stream: JobRemovedStream,
    job: &OwnedObjectPath,
    unit: &str,
    op: &'static str,
    scope: Scope,
    cancel: &CancellationToken,
) -> Result<(), ManagerError> {
    loop {
        tokio::select! {
            () = cancel.cancelled() => return Err(ManagerError::Cancelled),
            signal = stream.next() => {
                let Some(signal) = signal else {
                    return Err(ManagerError::OpError {
                        op,
                        unit: unit.to_string(),
                        scope: scope.as_str(),
                        cause: "job signal stream closed".to_string(),
                    });
                };
                let args = signal.args().map_err(|e| ManagerError::OpError {
                    op,
                    unit: unit.to_string(),
                    scope: scope.as_str(),
                    cause: e.to_string(),
                })?;
                if args.job() != job {
                    continue;
                }
                if args.result() == "done" {
                    return Ok(());
                }
                return Err(ManagerError::OpError {
                    op,
                    unit: unit.to_string(),
                    scope: scope.as_str(),
                    cause: format!("job result {:?}", args.result()),
                });
            }
        }
    }
}

fn to_manager_error(op: &'static str, unit: &str, scope: Scope, err: &zbus::Error) -> ManagerError {
    if let zbus::Error::MethodError(name, _, _) = err {
        if name.as_str().ends_with("UnknownObject") || name.as_str().ends_with("UnknownUnit") {
            return ManagerError::NotFound(unit.to_string());
        }
    }
    ManagerError::OpError {
        op,
        unit: unit.to_string(),
        scope: scope.as_str(),
        cause: err.to_string(),
    }
}

fn join_errors(op: &'static str, results: Vec<Result<(), ManagerError>>) -> Result<(), ManagerError> {
    let failures: Vec<String> = results.into_iter().filter_map(std::result::Result::err).map(|e| e.to_string()).collect();
    if failures.is_empty() {
        return Ok(());
    }
    warn!(op, failures = failures.len(), "one or more unit operations failed");
    Err(ManagerError::OpError {
        op,
        unit: "<multiple>".to_string(),
        scope: "n/a",
        cause: failures.join("; "),
    })
}

#[async_trait]
impl ServiceManager for SystemdManager {
    async fn start(&self, units: &[String], cancel: &CancellationToken) -> Result<(), ManagerError> {
        info!(count = units.len(), "starting units");
        self.dispatch(UnitOp::Start, units, cancel).await
    }

    async fn stop(&self, units: &[String], cancel: &CancellationToken) -> Result<(), ManagerError> {
        info!(count = units.len(), "stopping units");
        self.dispatch(UnitOp::Stop, units, cancel).await
    }

    async fn restart(&self, units: &[String], cancel: &CancellationToken) -> Result<(), ManagerError> {
        info!(count = units.len(), "restarting units");
        self.dispatch(UnitOp::Restart, units, cancel).await
    }

    async fn reload(&self, units: &[String], cancel: &CancellationToken) -> Result<(), ManagerError> {
        info!(count = units.len(), "reloading units");
        self.dispatch(UnitOp::Reload, units, cancel).await
    }

    async fn daemon_reload(&self, cancel: &CancellationToken) -> Result<(), ManagerError> {
        if cancel.is_cancelled() {
            return Err(ManagerError::Cancelled);
        }
        info!("issuing daemon-reload");
        let proxy = self.proxy().await?;
        proxy.reload().await.map_err(|e| ManagerError::OpError {
            op: "daemon-reload",
            unit: String::new(),
            scope: self.scope.as_str(),
            cause: e.to_string(),
        })
    }

    async fn enable(&self, units: &[String], cancel: &CancellationToken) -> Result<(), ManagerError> {
        if cancel.is_cancelled() {
            return Err(ManagerError::Cancelled);
        }
        let refs: Vec<&str> = units.iter().map(String::as_str).collect();
        let proxy = self.proxy().await?;
        proxy.enable_unit_files(&refs, false, false).await.map(|_| ()).map_err(|e| ManagerError::OpError {
            op: "enable",
            unit: units.join(","),
            scope: self.scope.as_str(),
            cause: e.to_string(),
        })
    }

    async fn disable(&self, units: &[String], cancel: &CancellationToken) -> Result<(), ManagerError> {
        if cancel.is_cancelled() {
            return Err(ManagerError::Cancelled);
        }
        let refs: Vec<&str> = units.iter().map(String::as_str).collect();
        let proxy = self.proxy().await?;
        proxy.disable_unit_files(&refs, false).await.map(|_| ()).map_err(|e| ManagerError::OpError {
            op: "disable",
            unit: units.join(","),
            scope: self.scope.as_str(),
            cause: e.to_string(),
        })
    }
}
