/// Host capability reporting whether the underlying index is complete and safe
/// to query ("smart mode").
///
/// Waiting is unbounded: readiness depends on the host finishing its own
/// indexing work, and there is no engine-level timeout.
pub trait IndexReadiness: Send + Sync {
    fn is_ready(&self) -> bool;

    /// Blocks the current thread until [`IndexReadiness::is_ready`] is `true`.
    fn await_ready(&self);

    /// Blocks until the host finished configuring the project.
    ///
    /// Hosts without a separate configuration phase return immediately.
    fn await_configured(&self) {}
}

/// Readiness for hosts that index synchronously.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysReady;

impl IndexReadiness for AlwaysReady {
    fn is_ready(&self) -> bool {
        true
    }

    fn await_ready(&self) {}
}
