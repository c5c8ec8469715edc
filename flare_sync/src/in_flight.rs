use parking_lot::{Condvar, Mutex};
use std::time::Duration;

/// A counting barrier for operations that are currently in flight.
///
/// Every started operation [enters](InFlight::enter) the barrier and
/// [leaves](InFlight::leave) it once completed, whatever the outcome. Any
/// number of threads may block in [`wait`](InFlight::wait) until the count
/// drains to zero.
///
/// The count never goes below zero: an unmatched [`leave`](InFlight::leave)
/// is ignored.
///
/// ## Example
///
/// ```
/// use flare_sync::InFlight;
/// use std::sync::Arc;
/// use std::thread;
/// use std::time::Duration;
///
/// // Make a barrier
/// let in_flight = Arc::new(InFlight::new());
///
/// // Enter on behalf of a worker, then let the worker leave when done
/// in_flight.enter();
/// let worker = {
///     let in_flight = Arc::clone(&in_flight);
///     thread::spawn(move || {
///         thread::sleep(Duration::from_millis(10));
///         in_flight.leave();
///     })
/// };
///
/// // Block until the worker is done
/// in_flight.wait();
/// assert_eq!(in_flight.count(), 0);
///
/// # worker.join().unwrap();
/// ```
#[derive(Debug, Default)]
pub struct InFlight {
    count: Mutex<usize>,
    drained: Condvar,
}

impl InFlight {
    /// Returns a brand new [`InFlight`] barrier with nothing in flight.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one more operation as being in flight.
    pub fn enter(&self) {
        *self.count.lock() += 1;
    }

    /// Registers the completion of one in-flight operation. Wakes up all
    /// waiting threads if this was the last one.
    pub fn leave(&self) {
        let mut count = self.count.lock();

        if *count == 0 {
            return;
        }

        *count -= 1;

        if *count == 0 {
            self.drained.notify_all();
        }
    }

    /// Reports the number of operations currently in flight.
    pub fn count(&self) -> usize {
        *self.count.lock()
    }

    /// Blocks the current thread until nothing is in flight. Returns
    /// immediately if nothing is in flight already.
    pub fn wait(&self) {
        let mut count = self.count.lock();

        while *count > 0 {
            self.drained.wait(&mut count);
        }
    }

    /// Same as [`wait`](InFlight::wait), but gives up after the given timeout.
    /// Reports whether the barrier drained in time.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut count = self.count.lock();

        while *count > 0 {
            if self.drained.wait_for(&mut count, timeout).timed_out() {
                return *count == 0;
            }
        }

        true
    }
}
