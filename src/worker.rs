/*!
Advisory core-pinning for the long-lived scanner and line I/O worker threads.

Pinning is a throughput nicety, not a correctness requirement: a failure to
pin is logged and the thread runs unpinned rather than aborting startup.
*/

use std::thread::{self, JoinHandle};

/// Spawn `f` as a named thread, pinning it to `core_id` if possible. Pin
/// failures (core id out of range, platform without affinity support) are
/// logged at `warn` and otherwise ignored.
pub fn spawn_pinned<F>(name: &str, core_id: usize, f: F) -> std::io::Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    let name = name.to_string();
    thread::Builder::new().name(name.clone()).spawn(move || {
        pin_to_core(&name, core_id);
        f();
    })
}

fn pin_to_core(thread_name: &str, core_id: usize) {
    let Some(cores) = core_affinity::get_core_ids() else {
        log::warn!("{thread_name}: core affinity not available on this platform, running unpinned");
        return;
    };
    match cores.into_iter().find(|c| c.id == core_id) {
        Some(core) => {
            if !core_affinity::set_for_current(core) {
                log::warn!("{thread_name}: failed to pin to core {core_id}, running unpinned");
            }
        }
        None => {
            log::warn!("{thread_name}: core {core_id} not present, running unpinned");
        }
    }
}
