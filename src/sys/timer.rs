use std::thread;
use std::time::Duration;

use tracing::warn;

/// Runs `f` once after `delay` on a detached timer thread.
///
/// There is no way to cancel a scheduled callback; callers guard against
/// stale ones when they fire.
pub fn schedule_after(delay: Duration, f: impl FnOnce() + Send + 'static) {
    let spawned = thread::Builder::new().name("timer".to_string()).spawn(move || {
        thread::sleep(delay);
        f();
    });
    if let Err(e) = spawned {
        warn!(%e, "could not spawn timer thread");
    }
}
