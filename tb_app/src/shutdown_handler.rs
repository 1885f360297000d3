use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Clears `running` on Ctrl+C so producers stop feeding new work
///
/// Work already queued is left to finish.
pub fn setup(running: Arc<AtomicBool>) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        tracing::info!("Shutdown signal received, draining queued rows");
        running.store(false, Ordering::Relaxed);
    })
}
