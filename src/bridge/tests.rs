//! Adapter tests: counting host runtime, C callbacks, observed link

use super::*;
use crate::diagnostics::EventLog;
use std::sync::atomic::{AtomicI64, Ordering};
use std::thread;

#[cfg(test)]
mod counting_tests {
    use super::*;

    #[test]
    fn test_register_acquire_release() {
        let bridge = CountingBridge::new();
        let h = Handle::from_raw(0x10);

        assert!(bridge.register(h));
        assert!(!bridge.register(h), "already live");
        assert_eq!(bridge.refcount(h), 1);

        bridge.acquire(h).unwrap();
        assert_eq!(bridge.refcount(h), 2);
        assert_eq!(bridge.outstanding(h), 1);
        assert!(!bridge.is_balanced());

        bridge.release(h).unwrap();
        assert_eq!(bridge.refcount(h), 1);
        assert!(bridge.is_balanced());
        assert_eq!(
            bridge.history(),
            vec![(BridgeOp::Acquire, h), (BridgeOp::Release, h)]
        );
    }

    #[test]
    fn test_empty_and_unknown_are_invalid() {
        let bridge = CountingBridge::new();
        assert!(!bridge.register(Handle::EMPTY));

        assert_eq!(
            bridge.acquire(Handle::EMPTY),
            Err(BridgeError::InvalidHandle { handle: Handle::EMPTY })
        );
        let unknown = Handle::from_raw(0x99);
        assert_eq!(
            bridge.acquire(unknown),
            Err(BridgeError::InvalidHandle { handle: unknown })
        );
        assert_eq!(bridge.total_acquires(), 0);
    }

    #[test]
    fn test_release_without_acquire_is_invalid() {
        let bridge = CountingBridge::new();
        let h = Handle::from_raw(0x20);
        bridge.register(h);

        // The host's own reference is not the caller's to release.
        assert_eq!(bridge.release(h), Err(BridgeError::InvalidHandle { handle: h }));
        assert_eq!(bridge.refcount(h), 1);
    }

    #[test]
    fn test_reclaim_at_zero() {
        let bridge = CountingBridge::new();
        let h = Handle::from_raw(0x30);
        bridge.register(h);
        bridge.acquire(h).unwrap();

        bridge.drop_host_ref(h).unwrap();
        assert!(bridge.is_live(h));
        assert!(bridge.drop_host_ref(h).is_err(), "only the bridge reference remains");

        bridge.release(h).unwrap();
        assert!(!bridge.is_live(h));
        assert!(bridge.acquire(h).is_err());

        // Address reuse revives the slot with cumulative counts.
        assert!(bridge.register(h));
        bridge.acquire(h).unwrap();
        assert_eq!(bridge.acquires(h), 2);
    }

    #[test]
    fn test_unavailable_and_reject() {
        let bridge = CountingBridge::new();
        let h = Handle::from_raw(0x40);
        bridge.register(h);

        bridge.set_available(false);
        assert_eq!(bridge.acquire(h), Err(BridgeError::Unavailable));
        bridge.set_available(true);

        bridge.reject(h);
        assert!(bridge.acquire(h).is_err());
        bridge.accept(h);
        bridge.acquire(h).unwrap();
        assert_eq!(bridge.leaked(), vec![h]);
    }

    #[test]
    fn test_history_recording_switch() {
        let bridge = CountingBridge::new();
        let h = Handle::from_raw(0x48);
        bridge.register(h);

        bridge.set_recording(false);
        bridge.acquire(h).unwrap();
        bridge.release(h).unwrap();
        assert!(bridge.history().is_empty());
        assert_eq!(bridge.total_acquires(), 1);

        bridge.set_recording(true);
        bridge.acquire(h).unwrap();
        assert_eq!(bridge.history(), vec![(BridgeOp::Acquire, h)]);
    }

    #[test]
    fn test_concurrent_acquire_release() {
        let bridge = Arc::new(CountingBridge::new());
        let h = Handle::from_raw(0x50);
        bridge.register(h);

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let bridge = Arc::clone(&bridge);
                thread::spawn(move || {
                    for _ in 0..500 {
                        bridge.acquire(h).unwrap();
                        bridge.release(h).unwrap();
                    }
                })
            })
            .collect();

        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(bridge.acquires(h), 4000);
        assert_eq!(bridge.total_releases(), 4000);
        assert_eq!(bridge.refcount(h), 1);
        assert!(bridge.is_balanced());
    }
}

#[cfg(test)]
mod callback_tests {
    use super::*;

    static HOST_COUNT: AtomicI64 = AtomicI64::new(0);
    const KNOWN: u64 = 0xF00D;

    unsafe extern "C" fn host_incref(address: u64) -> i32 {
        if address != KNOWN {
            return -1;
        }
        HOST_COUNT.fetch_add(1, Ordering::SeqCst);
        STATUS_OK
    }

    unsafe extern "C" fn host_decref(address: u64) -> i32 {
        if address != KNOWN {
            return -1;
        }
        HOST_COUNT.fetch_sub(1, Ordering::SeqCst);
        STATUS_OK
    }

    #[test]
    fn test_callbacks_drive_host_count() {
        let bridge = unsafe {
            CallbackBridge::new(HostCallbacks {
                incref: Some(host_incref),
                decref: Some(host_decref),
            })
        };
        assert!(bridge.is_connected());

        let known = Handle::from_raw(KNOWN);
        let before = HOST_COUNT.load(Ordering::SeqCst);
        bridge.acquire(known).unwrap();
        assert_eq!(HOST_COUNT.load(Ordering::SeqCst), before + 1);
        bridge.release(known).unwrap();
        assert_eq!(HOST_COUNT.load(Ordering::SeqCst), before);

        let stranger = Handle::from_raw(0xBAD);
        assert_eq!(
            bridge.acquire(stranger),
            Err(BridgeError::InvalidHandle { handle: stranger })
        );
        assert!(bridge.acquire(Handle::EMPTY).is_err());
    }

    #[test]
    fn test_missing_callbacks_are_unavailable() {
        let bridge = unsafe { CallbackBridge::new(HostCallbacks::default()) };
        assert!(!bridge.is_connected());
        assert_eq!(bridge.acquire(Handle::from_raw(KNOWN)), Err(BridgeError::Unavailable));
        assert_eq!(bridge.name(), "callback");
    }
}

#[cfg(test)]
mod link_tests {
    use super::*;

    #[test]
    fn test_link_reports_every_call() {
        let host = Arc::new(CountingBridge::new());
        let h = Handle::from_raw(0x60);
        host.register(h);

        let log = Arc::new(EventLog::new());
        let mut link = BridgeLink::new(host.clone(), true);
        link.set_observer(log.clone());

        link.acquire(h, EventPhase::Mutation).unwrap();
        link.release(h, EventPhase::Teardown).unwrap();
        assert!(link.release(h, EventPhase::Teardown).is_err());

        let events = log.events();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].kind, BridgeOp::Acquire);
        assert_eq!(events[1].phase, EventPhase::Teardown);
        assert_eq!(events[2].outcome, Err(BridgeError::InvalidHandle { handle: h }));
        assert_eq!(link.bridge().name(), "counting");
    }

    #[test]
    fn test_arc_bridge_delegates() {
        let host = Arc::new(CountingBridge::new());
        let h = Handle::from_raw(0x70);
        host.register(h);

        let shared: Arc<CountingBridge> = Arc::clone(&host);
        ReferenceBridge::acquire(&shared, h).unwrap();
        assert_eq!(host.outstanding(h), 1);
        assert_eq!(ReferenceBridge::name(&shared), "counting");
    }
}

#[cfg(all(test, feature = "python"))]
mod python_tests {
    use super::*;
    use crate::column::ObjectColumn;
    use pyo3::prelude::*;
    use pyo3::types::PyList;

    fn getrefcount(py: Python<'_>, obj: &PyAny) -> isize {
        py.import("sys")
            .and_then(|sys| sys.getattr("getrefcount"))
            .and_then(|f| f.call1((obj,)))
            .and_then(|count| count.extract())
            .unwrap()
    }

    #[test]
    fn test_column_moves_python_refcount() {
        pyo3::prepare_freethreaded_python();
        let bridge = Arc::new(unsafe { PythonBridge::new() });

        Python::with_gil(|py| {
            let obj: &PyAny = PyList::empty(py);
            let handle = PythonBridge::handle_of(obj);
            let before = getrefcount(py, obj);

            let mut column = ObjectColumn::with_len(2, bridge.clone());
            column.set(0, handle).unwrap();
            column.set(1, handle).unwrap();
            assert_eq!(getrefcount(py, obj), before + 2);

            column.set(1, handle).unwrap();
            assert_eq!(getrefcount(py, obj), before + 2);

            column.clear(0).unwrap();
            assert_eq!(getrefcount(py, obj), before + 1);

            column.destroy();
            assert_eq!(getrefcount(py, obj), before);
        });
    }

    #[test]
    fn test_python_rejects_empty_handle() {
        pyo3::prepare_freethreaded_python();
        let bridge = unsafe { PythonBridge::new() };

        assert_eq!(
            bridge.acquire(Handle::EMPTY),
            Err(BridgeError::InvalidHandle { handle: Handle::EMPTY })
        );
        assert_eq!(bridge.name(), "python");
    }
}
