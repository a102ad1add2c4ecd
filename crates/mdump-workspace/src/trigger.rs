//! Entry points that wait for the index and write a snapshot.
//!
//! The manual trigger reports its outcome to the user through a
//! [`Notifier`]; the startup trigger only logs.

use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;

use mdump_core::{IndexReadiness, SearchScope};
use serde::Serialize;

use crate::service::MethodDumpService;

pub const NOTIFICATION_GROUP: &str = "Method Dumper Notifications";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Information,
    Error,
}

pub trait Notifier: Send + Sync {
    fn notify(&self, kind: NotificationKind, message: &str);
}

/// Logs notifications instead of showing them.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, kind: NotificationKind, message: &str) {
        match kind {
            NotificationKind::Information => {
                tracing::info!(target: "mdump.workspace", group = NOTIFICATION_GROUP, "{message}")
            }
            NotificationKind::Error => {
                tracing::error!(target: "mdump.workspace", group = NOTIFICATION_GROUP, "{message}")
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DumpRequest {
    pub scope: SearchScope,
    /// Overrides the service's output path.
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DumpOutcome {
    Written { path: PathBuf, methods: usize },
    Failed { message: String },
}

impl DumpOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, DumpOutcome::Written { .. })
    }

    /// The user-facing message for this outcome.
    pub fn message(&self) -> String {
        match self {
            DumpOutcome::Written { path, methods } => format!(
                "Method dump written to {} ({methods} methods)",
                path.display()
            ),
            DumpOutcome::Failed { message } => format!("Failed to dump methods: {message}"),
        }
    }

    fn notification_kind(&self) -> NotificationKind {
        match self {
            DumpOutcome::Written { .. } => NotificationKind::Information,
            DumpOutcome::Failed { .. } => NotificationKind::Error,
        }
    }
}

/// Collects once and writes the snapshot, turning errors and panics into
/// [`DumpOutcome::Failed`].
fn dump_once(service: &MethodDumpService, request: &DumpRequest) -> DumpOutcome {
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        let methods = service.collect_methods(&request.scope);
        service
            .dump_methods_to_json(&methods, request.output.as_deref())
            .map(|path| (path, methods.len()))
    }));

    match result {
        Ok(Ok((path, methods))) => DumpOutcome::Written { path, methods },
        Ok(Err(err)) => DumpOutcome::Failed {
            message: err.to_string(),
        },
        Err(payload) => DumpOutcome::Failed {
            message: mdump_core::panic_payload_to_str(payload.as_ref()).to_string(),
        },
    }
}

/// User-initiated dump: waits for the index, writes the snapshot and notifies
/// the user of the result.
pub fn run_manual_dump(
    readiness: &dyn IndexReadiness,
    service: &MethodDumpService,
    request: &DumpRequest,
    notifier: &dyn Notifier,
) -> DumpOutcome {
    readiness.await_ready();
    let outcome = dump_once(service, request);
    notifier.notify(outcome.notification_kind(), &outcome.message());
    outcome
}

/// Runs [`run_manual_dump`] on a background thread.
pub fn spawn_manual_dump(
    readiness: Arc<dyn IndexReadiness>,
    service: Arc<MethodDumpService>,
    request: DumpRequest,
    notifier: Arc<dyn Notifier>,
) -> std::io::Result<JoinHandle<DumpOutcome>> {
    std::thread::Builder::new()
        .name("mdump-dump".to_string())
        .spawn(move || {
            run_manual_dump(readiness.as_ref(), &service, &request, notifier.as_ref())
        })
}

/// Startup dump: waits for project configuration and the index, then writes
/// the snapshot without notifying anyone.
pub fn run_startup_dump(
    readiness: &dyn IndexReadiness,
    service: &MethodDumpService,
    request: &DumpRequest,
) -> DumpOutcome {
    readiness.await_configured();
    readiness.await_ready();
    let outcome = dump_once(service, request);
    match &outcome {
        DumpOutcome::Written { path, methods } => tracing::debug!(
            target: "mdump.workspace",
            path = %path.display(),
            methods,
            "startup method dump written"
        ),
        DumpOutcome::Failed { message } => tracing::warn!(
            target: "mdump.workspace",
            error = %message,
            "startup method dump failed"
        ),
    }
    outcome
}
