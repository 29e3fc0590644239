//! Observer registry (§4.5), generalizing the teacher's `enrichment`
//! collaborator-callback idiom to a multi-observer broadcast.
//!
//! Add/remove take the registry's own lock and return immediately — they
//! never go through the serial executor, since they don't touch playback
//! state. Dispatch snapshots the observer list under the lock and drops
//! the lock before calling out, so a *different* thread can freely add or
//! remove observers while a notification is in flight. An observer that
//! tries to remove itself (or anything else) from inside its own callback
//! is the case §4.5/P6 calls out: `remove` rejects it outright — it
//! returns `false` and the registry is left untouched — rather than
//! letting it through or deadlocking.

use std::sync::{Arc, Mutex};
use std::thread::ThreadId;

use super::state::PlayerActivity;

/// Observes `playerActivity` transitions.
pub trait SpeechSynthesizerObserver: Send + Sync {
    fn on_state_changed(&self, activity: PlayerActivity);
}

#[derive(Default)]
pub struct ObserverRegistry {
    observers: Mutex<Vec<Arc<dyn SpeechSynthesizerObserver>>>,
    /// Set to the dispatching thread for the duration of `notify`, so
    /// `remove` can detect (and reject) a call arriving from inside one of
    /// the callbacks it is currently running.
    dispatching_thread: Mutex<Option<ThreadId>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, observer: Arc<dyn SpeechSynthesizerObserver>) {
        self.observers.lock().unwrap().push(observer);
    }

    /// Remove by pointer identity. Returns whether an observer was removed.
    ///
    /// Rejected (returns `false` without touching the registry) if called
    /// from the thread currently running [`Self::notify`]'s dispatch loop
    /// (§4.5, P6) — this is the only case that would otherwise let an
    /// observer mutate the very list being iterated out from under itself.
    pub fn remove(&self, observer: &Arc<dyn SpeechSynthesizerObserver>) -> bool {
        if *self.dispatching_thread.lock().unwrap() == Some(std::thread::current().id()) {
            return false;
        }
        let mut observers = self.observers.lock().unwrap();
        let before = observers.len();
        observers.retain(|o| !Arc::ptr_eq(o, observer));
        observers.len() != before
    }

    /// Notify every registered observer of a new `playerActivity`. Takes
    /// the lock only long enough to clone the current observer list, then
    /// marks this thread as the dispatcher for the duration of the loop so
    /// `remove` can reject any reentrant call.
    pub fn notify(&self, activity: PlayerActivity) {
        *self.dispatching_thread.lock().unwrap() = Some(std::thread::current().id());
        let snapshot: Vec<_> = self.observers.lock().unwrap().clone();
        for observer in snapshot {
            observer.on_state_changed(activity);
        }
        *self.dispatching_thread.lock().unwrap() = None;
    }

    pub fn len(&self) -> usize {
        self.observers.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct CountingObserver {
        count: AtomicUsize,
    }

    impl SpeechSynthesizerObserver for CountingObserver {
        fn on_state_changed(&self, _activity: PlayerActivity) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn notify_reaches_every_registered_observer() {
        let registry = ObserverRegistry::new();
        let a = Arc::new(CountingObserver {
            count: AtomicUsize::new(0),
        });
        let b = Arc::new(CountingObserver {
            count: AtomicUsize::new(0),
        });
        registry.add(a.clone() as Arc<dyn SpeechSynthesizerObserver>);
        registry.add(b.clone() as Arc<dyn SpeechSynthesizerObserver>);

        registry.notify(PlayerActivity::Playing);

        assert_eq!(a.count.load(Ordering::SeqCst), 1);
        assert_eq!(b.count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn remove_stops_future_notifications() {
        let registry = ObserverRegistry::new();
        let a = Arc::new(CountingObserver {
            count: AtomicUsize::new(0),
        }) as Arc<dyn SpeechSynthesizerObserver>;
        registry.add(a.clone());
        assert!(registry.remove(&a));
        assert!(registry.is_empty());

        registry.notify(PlayerActivity::Finished);
    }

    #[test]
    fn remove_of_unregistered_observer_is_noop() {
        let registry = ObserverRegistry::new();
        let a = Arc::new(CountingObserver {
            count: AtomicUsize::new(0),
        }) as Arc<dyn SpeechSynthesizerObserver>;
        assert!(!registry.remove(&a));
    }

    /// P6: an observer that tries to remove *itself* from within its own
    /// callback gets rejected, not a deadlock — `remove` returns `false`
    /// and the registry is unchanged, even though `notify` never holds the
    /// registry lock while dispatching.
    struct SelfRemovingObserver {
        registry: Arc<ObserverRegistry>,
        self_ref: Mutex<Option<Arc<dyn SpeechSynthesizerObserver>>>,
        notified: AtomicUsize,
        remove_accepted: AtomicBool,
    }

    impl SpeechSynthesizerObserver for SelfRemovingObserver {
        fn on_state_changed(&self, _activity: PlayerActivity) {
            self.notified.fetch_add(1, Ordering::SeqCst);
            if let Some(self_arc) = self.self_ref.lock().unwrap().clone() {
                let removed = self.registry.remove(&self_arc);
                self.remove_accepted.store(removed, Ordering::SeqCst);
            }
        }
    }

    #[test]
    fn removing_observer_from_within_its_own_callback_is_rejected() {
        let registry = Arc::new(ObserverRegistry::new());
        let observer = Arc::new(SelfRemovingObserver {
            registry: registry.clone(),
            self_ref: Mutex::new(None),
            notified: AtomicUsize::new(0),
            remove_accepted: AtomicBool::new(true),
        });
        *observer.self_ref.lock().unwrap() =
            Some(observer.clone() as Arc<dyn SpeechSynthesizerObserver>);
        registry.add(observer.clone() as Arc<dyn SpeechSynthesizerObserver>);

        registry.notify(PlayerActivity::Playing); // must return, not deadlock

        assert_eq!(observer.notified.load(Ordering::SeqCst), 1);
        assert!(!observer.remove_accepted.load(Ordering::SeqCst));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn removal_from_another_thread_during_dispatch_still_succeeds() {
        let registry = Arc::new(ObserverRegistry::new());
        let other = Arc::new(CountingObserver {
            count: AtomicUsize::new(0),
        }) as Arc<dyn SpeechSynthesizerObserver>;
        registry.add(other.clone());

        struct RemovesOtherFromAnotherThread {
            registry: Arc<ObserverRegistry>,
            target: Arc<dyn SpeechSynthesizerObserver>,
        }

        impl SpeechSynthesizerObserver for RemovesOtherFromAnotherThread {
            fn on_state_changed(&self, _activity: PlayerActivity) {
                let registry = self.registry.clone();
                let target = self.target.clone();
                std::thread::spawn(move || registry.remove(&target))
                    .join()
                    .unwrap();
            }
        }

        registry.add(Arc::new(RemovesOtherFromAnotherThread {
            registry: registry.clone(),
            target: other.clone(),
        }));

        registry.notify(PlayerActivity::Playing);

        assert!(!registry.remove(&other)); // already removed by the other thread
    }
}
