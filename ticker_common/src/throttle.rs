//! Rate limiter that collapses bursts of calls into at most one sink call per
//! window.
//!
//! The throttle is clock driven rather than timer driven: the owner passes the
//! current `Instant` into [`Throttle::call`], asks [`Throttle::deadline`] when
//! it next needs to wake up, and calls [`Throttle::poll`] once that moment has
//! passed. This keeps it usable from any event loop and deterministic in tests.
//!
//! There is no buffering or merging: a call made while a window is open
//! replaces the value that window will deliver, so callers hand in a full
//! snapshot each time rather than a diff.
use std::time::{Duration, Instant};

struct Pending<T> {
    due: Instant,
    value: T,
}

/// Gate in front of a sink function.
pub struct Throttle<T, F>
where
    F: FnMut(T),
{
    sink: F,
    interval: Duration,
    /// Still allowed to fire synchronously on the next call.
    leading: bool,
    pending: Option<Pending<T>>,
}

impl<T, F> Throttle<T, F>
where
    T: Clone,
    F: FnMut(T),
{
    /// Wraps `sink`. With `leading_fire` the very first call reaches the sink
    /// immediately; every later call waits for the trailing edge.
    pub fn new(sink: F, interval: Duration, leading_fire: bool) -> Self {
        Self {
            sink,
            interval,
            leading: leading_fire,
            pending: None,
        }
    }

    /// Offers `value` to the sink.
    ///
    /// Opens a window ending `interval` after `now` if none is open. The
    /// window delivers the value of the last call made before it elapses.
    pub fn call(&mut self, now: Instant, value: T) {
        if self.leading {
            self.leading = false;
            (self.sink)(value.clone());
        }

        match self.pending.as_mut() {
            Some(pending) => pending.value = value,
            None => {
                self.pending = Some(Pending {
                    due: now + self.interval,
                    value,
                })
            }
        }
    }

    /// End of the open window, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|pending| pending.due)
    }

    /// Returns `true` while a window is open.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Fires the sink if the open window has elapsed at `now`. Returns `true`
    /// when the sink ran.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.pending.take() {
            Some(pending) if pending.due <= now => {
                (self.sink)(pending.value);
                true
            }
            other => {
                self.pending = other;
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    const WINDOW: Duration = Duration::from_millis(1000);

    fn recording(leading: bool) -> (Throttle<u32, impl FnMut(u32)>, Rc<RefCell<Vec<u32>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink_seen = Rc::clone(&seen);
        let throttle = Throttle::new(move |v| sink_seen.borrow_mut().push(v), WINDOW, leading);
        (throttle, seen)
    }

    #[test]
    fn burst_within_window_fires_once_with_last_value() {
        let (mut throttle, seen) = recording(false);
        let start = Instant::now();

        for (i, v) in [1, 2, 3, 4].into_iter().enumerate() {
            throttle.call(start + Duration::from_millis(100 * i as u64), v);
        }
        assert!(seen.borrow().is_empty());
        assert_eq!(throttle.deadline(), Some(start + WINDOW));

        assert!(!throttle.poll(start + Duration::from_millis(999)));
        assert!(throttle.poll(start + WINDOW));
        assert_eq!(*seen.borrow(), vec![4]);
        assert!(!throttle.is_pending());
    }

    #[test]
    fn next_window_opens_after_fire() {
        let (mut throttle, seen) = recording(false);
        let start = Instant::now();

        throttle.call(start, 1);
        throttle.poll(start + WINDOW);
        let later = start + Duration::from_millis(1500);
        throttle.call(later, 2);
        assert_eq!(throttle.deadline(), Some(later + WINDOW));
        throttle.poll(later + WINDOW);

        assert_eq!(*seen.borrow(), vec![1, 2]);
    }

    #[test]
    fn leading_fire_is_synchronous_and_only_once() {
        let (mut throttle, seen) = recording(true);
        let start = Instant::now();

        throttle.call(start, 1);
        assert_eq!(*seen.borrow(), vec![1]);
        throttle.call(start + Duration::from_millis(10), 2);
        assert_eq!(*seen.borrow(), vec![1]);

        throttle.poll(start + WINDOW);
        assert_eq!(*seen.borrow(), vec![1, 2]);

        throttle.call(start + Duration::from_millis(2000), 3);
        assert_eq!(*seen.borrow(), vec![1, 2]);
    }

    #[test]
    fn leading_fire_still_opens_trailing_window() {
        let (mut throttle, seen) = recording(true);
        let start = Instant::now();

        throttle.call(start, 9);
        assert!(throttle.is_pending());
        throttle.poll(start + WINDOW);
        assert_eq!(*seen.borrow(), vec![9, 9]);
    }

    #[test]
    fn poll_without_window_is_noop() {
        let (mut throttle, seen) = recording(false);
        assert!(!throttle.poll(Instant::now()));
        assert_eq!(throttle.deadline(), None);
        assert!(seen.borrow().is_empty());
    }
}
