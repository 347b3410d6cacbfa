//! Request coalescer that collapses concurrent fetches of the same key into
//! a single producer invocation.
//!
//! The original source guards each in-flight call with a `sync.WaitGroup`;
//! the direct idiom here is a `parking_lot::Condvar`-backed latch per call,
//! with the call map itself behind a `parking_lot::Mutex`, matching the
//! locking primitives used throughout the rest of this crate.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::error::CacheError;

struct Call {
    done: Mutex<bool>,
    cond: Condvar,
    result: Mutex<Option<Result<Vec<u8>, String>>>,
}

impl Call {
    fn new() -> Self {
        Call {
            done: Mutex::new(false),
            cond: Condvar::new(),
            result: Mutex::new(None),
        }
    }

    fn wait(&self) -> Result<Vec<u8>, String> {
        let mut done = self.done.lock();
        while !*done {
            self.cond.wait(&mut done);
        }
        self.result.lock().clone().expect("call completed without a result")
    }

    fn finish(&self, result: Result<Vec<u8>, String>) {
        *self.result.lock() = Some(result);
        *self.done.lock() = true;
        self.cond.notify_all();
    }
}

/// Coalesces concurrent `Do(key, producer)` calls so at most one producer
/// per key runs at a time.
#[derive(Default)]
pub struct Group {
    calls: Mutex<HashMap<String, Arc<Call>>>,
}

impl Group {
    /// Creates an empty coalescing group.
    pub fn new() -> Self {
        Group {
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// Runs `producer` for `key`, coalescing concurrent callers.
    ///
    /// Exactly one producer per de-duplicated cohort runs; late arrivals
    /// that enter after the cohort's call is removed from the map start a
    /// fresh cohort. The producer runs with no single-flight lock held, so a
    /// long-running loader never blocks coalesced peers from being
    /// registered — only from completing.
    pub fn do_once<F>(&self, key: &str, producer: F) -> Result<Vec<u8>, CacheError>
    where
        F: FnOnce() -> Result<Vec<u8>, CacheError>,
    {
        let call = {
            let mut calls = self.calls.lock();
            if let Some(existing) = calls.get(key).cloned() {
                drop(calls);
                return existing.wait().map_err(CacheError::loader_msg);
            }
            let call = Arc::new(Call::new());
            calls.insert(key.to_string(), call.clone());
            call
        };

        let outcome = producer();
        let stored = outcome.as_ref().map(Clone::clone).map_err(ToString::to_string);
        call.finish(stored);

        self.calls.lock().remove(key);

        outcome
    }
}

impl std::fmt::Debug for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let in_flight = self.calls.lock().len();
        f.debug_struct("singleflight::Group")
            .field("in_flight", &in_flight)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    /// Scenario 6: ten concurrent callers against a loader that sleeps and
    /// counts its own invocations; exactly one invocation, all ten see the
    /// same result.
    #[test]
    fn single_flight_coalesces_ten_concurrent_callers() {
        let group = Arc::new(Group::new());
        let invocations = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..10 {
            let group = group.clone();
            let invocations = invocations.clone();
            handles.push(thread::spawn(move || {
                group.do_once("Tom", || {
                    invocations.fetch_add(1, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(50));
                    Ok(b"630".to_vec())
                })
            }));
        }

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(invocations.load(Ordering::SeqCst), 1);
        for result in results {
            assert_eq!(result.unwrap(), b"630");
        }
    }

    #[test]
    fn late_arrival_after_cohort_completes_starts_a_new_producer_run() {
        let group = Group::new();
        let invocations = Arc::new(AtomicUsize::new(0));

        let first = {
            let invocations = invocations.clone();
            group.do_once("k", || {
                invocations.fetch_add(1, Ordering::SeqCst);
                Ok(b"v1".to_vec())
            })
        };
        let second = {
            let invocations = invocations.clone();
            group.do_once("k", || {
                invocations.fetch_add(1, Ordering::SeqCst);
                Ok(b"v2".to_vec())
            })
        };

        assert_eq!(first.unwrap(), b"v1");
        assert_eq!(second.unwrap(), b"v2");
        assert_eq!(invocations.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn producer_error_is_propagated_to_all_coalesced_callers() {
        let group = Arc::new(Group::new());
        let mut handles = Vec::new();
        for _ in 0..4 {
            let group = group.clone();
            handles.push(thread::spawn(move || {
                group.do_once("bad", || Err(CacheError::loader_msg("boom")))
            }));
        }
        for h in handles {
            assert!(h.join().unwrap().is_err());
        }
    }
}
