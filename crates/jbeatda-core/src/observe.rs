//! Toolkit-independent observation handle.
//!
//! Every reactive surface in the crate (settings, session, cached
//! resources) hands out a `Subscription<T>`. A UI layer adapts it to its own
//! lifecycle: poll `next()` while the view is alive, call `cancel()` (or just
//! drop it) when the view goes away.

use std::future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::{Stream, StreamExt};
use tracing::trace;

/// A live, cancellable sequence of values.
///
/// Emissions stop for good once the subscription is cancelled or dropped;
/// cancellation never produces an error.
pub struct Subscription<T> {
    inner: Pin<Box<dyn Stream<Item = T> + Send>>,
}

impl<T> Subscription<T> {
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = T> + Send + 'static,
    {
        Self {
            inner: Box::pin(stream),
        }
    }

    /// Wait for the next emission. Returns `None` only if the source closed.
    pub async fn next(&mut self) -> Option<T> {
        self.inner.next().await
    }

    /// Tear down the subscription. Equivalent to dropping it.
    pub fn cancel(self) {
        trace!("Subscription cancelled");
        drop(self);
    }

    pub fn map<U, F>(self, f: F) -> Subscription<U>
    where
        T: 'static,
        U: 'static,
        F: FnMut(T) -> U + Send + 'static,
    {
        Subscription::new(self.inner.map(f))
    }

    /// Suppress consecutive duplicate emissions.
    pub fn distinct(self) -> Self
    where
        T: Clone + PartialEq + Send + 'static,
    {
        let stream = self
            .inner
            .scan(None::<T>, |last, item| {
                let changed = last.as_ref() != Some(&item);
                if changed {
                    *last = Some(item.clone());
                }
                future::ready(Some(changed.then_some(item)))
            })
            .filter_map(future::ready);
        Subscription::new(stream)
    }
}

impl<T> Stream for Subscription<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.inner.as_mut().poll_next(cx)
    }
}
