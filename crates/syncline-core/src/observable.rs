// ── Reactive values ──
//
// A current value with two ways to consume it: async subscriptions
// backed by `watch` channels, and synchronous listener callbacks that
// run right after every publish. Dropping a `ListenerGuard` unsubscribes.

use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use dashmap::DashMap;
use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// An immutable, cheaply cloneable collection snapshot.
pub type Snapshot<T> = Arc<Vec<Arc<T>>>;

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;
type ListenerMap<T> = DashMap<u64, Listener<T>>;

/// Current-value broadcaster.
///
/// Every publish replaces the value wholesale, wakes `watch` subscribers,
/// and invokes registered listeners in registration order. Listeners run
/// on the publishing task with no lock held, so they may read (or publish
/// to) other broadcasters freely.
pub struct Broadcaster<T: Clone + Send + Sync + 'static> {
    value: watch::Sender<T>,
    listeners: Arc<ListenerMap<T>>,
    next_id: AtomicU64,
}

impl<T: Clone + Send + Sync + 'static> Broadcaster<T> {
    pub fn new(initial: T) -> Self {
        let (value, _) = watch::channel(initial);
        Self {
            value,
            listeners: Arc::new(DashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Clone of the current value.
    pub fn current(&self) -> T {
        self.value.borrow().clone()
    }

    /// Replace the value and notify everyone.
    pub fn publish(&self, value: T) {
        self.value.send_replace(value);
        self.notify();
    }

    /// Modify the value in place; notify only if `modify` returns `true`.
    ///
    /// The closure runs under the channel's write lock, so the
    /// read-modify-write is atomic with respect to other publishers.
    /// Changes made by a closure that returns `false` are kept but
    /// not announced.
    pub fn publish_if(&self, modify: impl FnOnce(&mut T) -> bool) -> bool {
        let changed = self.value.send_if_modified(modify);
        if changed {
            self.notify();
        }
        changed
    }

    /// Replace the value without running listeners.
    ///
    /// `watch` subscribers are still woken; callers follow up with
    /// [`notify`](Self::notify) once their own locks are released.
    pub(crate) fn replace_quiet(&self, value: T) {
        self.value.send_replace(value);
    }

    /// [`publish_if`](Self::publish_if) without running listeners.
    pub(crate) fn modify_quiet(&self, modify: impl FnOnce(&mut T) -> bool) -> bool {
        self.value.send_if_modified(modify)
    }

    /// Run every listener against the current value.
    pub(crate) fn notify(&self) {
        let mut listeners: Vec<(u64, Listener<T>)> = self
            .listeners
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect();
        if listeners.is_empty() {
            return;
        }
        listeners.sort_unstable_by_key(|(id, _)| *id);

        let value = self.current();
        for (_, listener) in listeners {
            listener(&value);
        }
    }

    /// Subscribe to changes via a `watch::Receiver`.
    pub fn subscribe(&self) -> Subscription<T> {
        Subscription::new(self.value.subscribe())
    }

    /// Register a callback invoked after every announced change.
    pub fn listen(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> ListenerGuard {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.insert(id, Arc::new(listener));

        let map: Weak<ListenerMap<T>> = Arc::downgrade(&self.listeners);
        ListenerGuard {
            unsubscribe: Some(Box::new(move || {
                if let Some(map) = map.upgrade() {
                    map.remove(&id);
                }
            })),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

// ── ListenerGuard ────────────────────────────────────────────────────

/// Unsubscribe handle returned by [`Broadcaster::listen`].
///
/// The listener stays registered for as long as the guard lives.
#[must_use = "dropping the guard unsubscribes the listener immediately"]
pub struct ListenerGuard {
    unsubscribe: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl ListenerGuard {
    /// Unsubscribe now.
    pub fn unsubscribe(mut self) {
        if let Some(f) = self.unsubscribe.take() {
            f();
        }
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if let Some(f) = self.unsubscribe.take() {
            f();
        }
    }
}

impl std::fmt::Debug for ListenerGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerGuard")
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}

// ── Subscription ─────────────────────────────────────────────────────

/// A subscription to a reactive value.
///
/// Provides both point-in-time access and change notification via
/// [`changed()`](Self::changed) or by converting to a `Stream`.
pub struct Subscription<T: Clone + Send + Sync + 'static> {
    current: T,
    receiver: watch::Receiver<T>,
}

impl<T: Clone + Send + Sync + 'static> Subscription<T> {
    fn new(mut receiver: watch::Receiver<T>) -> Self {
        let current = receiver.borrow_and_update().clone();
        Self { current, receiver }
    }

    /// The value captured at creation time (or at the last `changed()`).
    pub fn current(&self) -> &T {
        &self.current
    }

    /// The latest value (may have changed since creation).
    pub fn latest(&self) -> T {
        self.receiver.borrow().clone()
    }

    /// Whether a change is waiting to be observed.
    pub fn has_changed(&self) -> bool {
        self.receiver.has_changed().unwrap_or(false)
    }

    /// Wait for the next change, returning the new value.
    /// Returns `None` if the broadcaster has been dropped.
    pub async fn changed(&mut self) -> Option<T> {
        self.receiver.changed().await.ok()?;
        let value = self.receiver.borrow_and_update().clone();
        self.current = value.clone();
        Some(value)
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    ///
    /// The stream yields the current value first, then every change.
    pub fn into_stream(self) -> SubscriptionStream<T> {
        SubscriptionStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
pub struct SubscriptionStream<T: Clone + Send + Sync + 'static> {
    inner: WatchStream<T>,
}

impl<T: Clone + Send + Sync + 'static> Stream for SubscriptionStream<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn publish_runs_listeners_with_new_value() {
        let b = Broadcaster::new(0u32);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _guard = b.listen(move |v| sink.lock().expect("lock").push(*v));

        b.publish(1);
        b.publish(2);

        assert_eq!(*seen.lock().expect("lock"), vec![1, 2]);
    }

    #[test]
    fn publish_if_false_is_silent() {
        let b = Broadcaster::new(5u32);
        let calls = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&calls);
        let _guard = b.listen(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let sub = b.subscribe();

        assert!(!b.publish_if(|_| false));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!sub.has_changed());

        assert!(b.publish_if(|v| {
            *v = 6;
            true
        }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(sub.has_changed());
    }

    #[test]
    fn dropping_guard_unsubscribes() {
        let b = Broadcaster::new(());
        let guard = b.listen(|()| {});
        assert_eq!(b.listener_count(), 1);
        drop(guard);
        assert_eq!(b.listener_count(), 0);

        let guard = b.listen(|()| {});
        guard.unsubscribe();
        assert_eq!(b.listener_count(), 0);
    }

    #[test]
    fn guard_outliving_broadcaster_is_harmless() {
        let b = Broadcaster::new(1u8);
        let guard = b.listen(|_| {});
        drop(b);
        drop(guard);
    }

    #[test]
    fn listener_may_publish_to_another_broadcaster() {
        let source = Broadcaster::new(1u32);
        let derived = Arc::new(Broadcaster::new(0u32));
        let target = Arc::clone(&derived);
        let _guard = source.listen(move |v| target.publish(v * 10));

        source.publish(4);
        assert_eq!(derived.current(), 40);
    }

    #[tokio::test]
    async fn subscription_sees_latest_value() {
        let b = Broadcaster::new(String::from("a"));
        let mut sub = b.subscribe();
        assert_eq!(sub.current(), "a");

        b.publish("b".into());
        assert_eq!(sub.changed().await.as_deref(), Some("b"));
        assert_eq!(sub.current(), "b");
        assert_eq!(sub.latest(), "b");
    }

    #[tokio::test]
    async fn subscription_stream_yields_current_then_changes() {
        use futures_util::StreamExt;

        let b = Broadcaster::new(1u32);
        let mut stream = b.subscribe().into_stream();
        assert_eq!(stream.next().await, Some(1));

        b.publish(2);
        assert_eq!(stream.next().await, Some(2));
    }
}
