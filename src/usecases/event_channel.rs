//! Event Channel - Bounded, Backpressured Delivery to the Consumer
//!
//! FIFO queue between the producers (supervisor, status poller) and the
//! single consumer. When the queue is full:
//! - `DropOldest` evicts the oldest non-gap event and admits the new one
//! - `BlockWithTimeout` waits for space up to the configured bound, then
//!   drops the new event
//!
//! Discarded events are counted and reported to the consumer as one
//! `Dropped { count }` marker that trails the events buffered at the time
//! of the drop. Once the consumer has pulled, further drops no longer
//! push the marker back, so it arrives within `capacity` pulls even while
//! producers keep the queue full.
//! Closing the channel discards whatever is buffered; the consumer sees
//! end-of-stream on its next pull.

use std::collections::VecDeque;
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use futures_util::Stream;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::config::BackpressurePolicy;
use crate::domain::ConnectorEvent;

/// Result of a single push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
  /// Queued without loss.
  Queued,
  /// Queued after evicting an older event.
  Evicted,
  /// The pushed event itself was discarded (timeout).
  Dropped,
  /// The channel is closed; nothing was queued.
  Closed,
}

struct Inner {
  queue: VecDeque<ConnectorEvent>,
  dropped_pending: u64,
  /// Pulls left before the drop marker is delivered.
  marker_after: Option<usize>,
  /// Set by the first pull after a drop; later drops stop postponing the marker.
  marker_fixed: bool,
  closed: bool,
}

impl Inner {
  /// Count one discarded event, after the queue reflects it. `removed_at`
  /// is the index an evicted event had, `None` when the incoming event
  /// itself was dropped.
  fn record_drop(&mut self, removed_at: Option<usize>) {
    self.dropped_pending += 1;
    if !self.marker_fixed || self.marker_after.is_none() {
      self.marker_after = Some(self.queue.len());
    } else if let (Some(left), Some(index)) = (self.marker_after.as_mut(), removed_at) {
      if index < *left {
        *left -= 1;
      }
    }
  }

  /// Account for one event handed to the consumer.
  fn record_pull(&mut self) {
    if let Some(left) = self.marker_after.as_mut() {
      *left = left.saturating_sub(1);
      self.marker_fixed = true;
    }
  }

  fn take_marker(&mut self) -> Option<ConnectorEvent> {
    if self.dropped_pending == 0 {
      return None;
    }
    self.marker_after = None;
    self.marker_fixed = false;
    let count = std::mem::take(&mut self.dropped_pending);
    Some(ConnectorEvent::Dropped { count })
  }
}

struct Shared {
  inner: Mutex<Inner>,
  capacity: usize,
  policy: BackpressurePolicy,
  block_timeout: Duration,
  /// Signalled when an event (or a drop count) becomes available, or on close.
  readable: Notify,
  /// Signalled when space frees up, or on close.
  writable: Notify,
}

/// Create a bounded event channel.
pub fn event_channel(
  capacity: usize,
  policy: BackpressurePolicy,
  block_timeout: Duration,
) -> (EventSender, EventStream) {
  let shared = Arc::new(Shared {
    inner: Mutex::new(Inner {
      queue: VecDeque::with_capacity(capacity),
      dropped_pending: 0,
      marker_after: None,
      marker_fixed: false,
      closed: false,
    }),
    capacity: capacity.max(1),
    policy,
    block_timeout,
    readable: Notify::new(),
    writable: Notify::new(),
  });
  (
    EventSender {
      shared: Arc::clone(&shared),
    },
    EventStream { shared },
  )
}

/// Producer half. Cloned for the supervisor and the status poller.
#[derive(Clone)]
pub struct EventSender {
  shared: Arc<Shared>,
}

impl EventSender {
  /// Push an event, applying the backpressure policy when full.
  ///
  /// Only waits under `BlockWithTimeout`, and never longer than the
  /// configured timeout. Closing the channel wakes a waiting push.
  pub async fn push(&self, event: ConnectorEvent) -> PushOutcome {
    match self.shared.policy {
      BackpressurePolicy::DropOldest => self.push_drop_oldest(event),
      BackpressurePolicy::BlockWithTimeout => self.push_blocking(event).await,
    }
  }

  fn push_drop_oldest(&self, event: ConnectorEvent) -> PushOutcome {
    let mut inner = self.shared.inner.lock();
    if inner.closed {
      return PushOutcome::Closed;
    }

    let mut victim = None;
    if inner.queue.len() >= self.shared.capacity {
      let index = inner.queue.iter().position(|e| !e.is_gap()).unwrap_or(0);
      inner.queue.remove(index);
      victim = Some(index);
    }
    inner.queue.push_back(event);
    let outcome = match victim {
      Some(index) => {
        inner.record_drop(Some(index));
        PushOutcome::Evicted
      }
      None => PushOutcome::Queued,
    };
    drop(inner);

    self.shared.readable.notify_one();
    outcome
  }

  async fn push_blocking(&self, event: ConnectorEvent) -> PushOutcome {
    let deadline = Instant::now() + self.shared.block_timeout;

    loop {
      let mut notified = pin!(self.shared.writable.notified());
      notified.as_mut().enable();

      {
        let mut inner = self.shared.inner.lock();
        if inner.closed {
          return PushOutcome::Closed;
        }
        if inner.queue.len() < self.shared.capacity {
          inner.queue.push_back(event);
          drop(inner);
          self.shared.readable.notify_one();
          return PushOutcome::Queued;
        }
      }

      if tokio::time::timeout_at(deadline, notified).await.is_err() {
        let mut inner = self.shared.inner.lock();
        if inner.closed {
          return PushOutcome::Closed;
        }
        inner.record_drop(None);
        drop(inner);
        self.shared.readable.notify_one();
        return PushOutcome::Dropped;
      }
    }
  }

  /// Close the channel, discard buffered events and wake everyone.
  pub fn close(&self) {
    self.shared.close();
  }

  pub fn is_closed(&self) -> bool {
    self.shared.inner.lock().closed
  }
}

/// Consumer half: a single-pass sequence of [`ConnectorEvent`]s.
pub struct EventStream {
  shared: Arc<Shared>,
}

impl EventStream {
  /// Wait for the next event. `None` once the channel is closed.
  pub async fn recv(&mut self) -> Option<ConnectorEvent> {
    loop {
      let mut notified = pin!(self.shared.readable.notified());
      notified.as_mut().enable();

      if let Some(event) = self.try_recv_inner() {
        return event;
      }
      notified.await;
    }
  }

  /// Non-blocking pull. `Ok(None)` when nothing is ready yet.
  pub fn try_recv(&mut self) -> Result<Option<ConnectorEvent>, Closed> {
    match self.try_recv_inner() {
      Some(Some(event)) => Ok(Some(event)),
      Some(None) => Err(Closed),
      None => Ok(None),
    }
  }

  /// Number of buffered events (excluding a pending drop marker).
  pub fn len(&self) -> usize {
    self.shared.inner.lock().queue.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Adapt into a `futures` stream for combinator-style consumers.
  pub fn into_stream(self) -> impl Stream<Item = ConnectorEvent> + Send {
    futures_util::stream::unfold(self, |mut rx| async move {
      rx.recv().await.map(|event| (event, rx))
    })
  }

  /// `Some(Some(e))` event ready, `Some(None)` closed, `None` nothing yet.
  fn try_recv_inner(&self) -> Option<Option<ConnectorEvent>> {
    let mut inner = self.shared.inner.lock();
    if inner.closed {
      return Some(None);
    }
    if inner.marker_after == Some(0) {
      if let Some(marker) = inner.take_marker() {
        return Some(Some(marker));
      }
    }
    if let Some(event) = inner.queue.pop_front() {
      inner.record_pull();
      drop(inner);
      self.shared.writable.notify_one();
      return Some(Some(event));
    }
    inner.take_marker().map(Some)
  }
}

impl Drop for EventStream {
  fn drop(&mut self) {
    self.shared.close();
  }
}

impl Shared {
  fn close(&self) {
    {
      let mut inner = self.inner.lock();
      inner.closed = true;
      inner.queue.clear();
      inner.dropped_pending = 0;
      inner.marker_after = None;
      inner.marker_fixed = false;
    }
    self.readable.notify_waiters();
    self.writable.notify_waiters();
  }
}

/// Returned by [`EventStream::try_recv`] after the channel closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Closed;

impl std::fmt::Display for Closed {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str("event channel closed")
  }
}

impl std::error::Error for Closed {}
