use std::{
  sync::atomic::{AtomicU64, Ordering},
  time::Duration,
};

/// Lets only the latest of a burst of calls through.
///
/// Every call to [`settle`](Debouncer::settle) waits for the delay and then
/// reports whether another call started in the meantime. Typing "one piece"
/// one key at a time therefore runs a single search.
#[derive(Debug)]
pub struct Debouncer {
  delay:      Duration,
  /// Incremented by every call; the call holding the latest value wins
  generation: AtomicU64,
}

impl Debouncer {
  /// Creates a debouncer settling for `delay`.
  pub fn new(delay: Duration) -> Self { Self { delay, generation: AtomicU64::new(0) } }

  /// Waits out the delay; `true` when no newer call arrived meanwhile.
  pub async fn settle(&self) -> bool {
    let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
    if !self.delay.is_zero() {
      tokio::time::sleep(self.delay).await;
    }
    self.generation.load(Ordering::SeqCst) == ticket
  }
}
