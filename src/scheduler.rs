//! The UI-update scheduling context.
//!
//! Worker tasks never touch UI state directly. They post jobs here, and the
//! event loop runs them one at a time, strictly in the order they were posted.

use tokio::sync::mpsc;

pub type UiJob<S> = Box<dyn FnOnce(&mut S) + Send>;

pub struct UiScheduler<S> {
  tx: mpsc::UnboundedSender<UiJob<S>>,
  rx: mpsc::UnboundedReceiver<UiJob<S>>,
}

/// Cloneable posting end of a [`UiScheduler`].
pub struct UiHandle<S> {
  tx: mpsc::UnboundedSender<UiJob<S>>,
}

impl<S> Clone for UiHandle<S> {
  fn clone(&self) -> Self {
    Self { tx: self.tx.clone() }
  }
}

impl<S> UiHandle<S> {
  /// Queue a job for the UI context. Returns false once the scheduler is gone.
  pub fn post(&self, job: impl FnOnce(&mut S) + Send + 'static) -> bool {
    self.tx.send(Box::new(job)).is_ok()
  }
}

impl<S> Default for UiScheduler<S> {
  fn default() -> Self {
    Self::new()
  }
}

impl<S> UiScheduler<S> {
  pub fn new() -> Self {
    let (tx, rx) = mpsc::unbounded_channel();
    Self { tx, rx }
  }

  pub fn handle(&self) -> UiHandle<S> {
    UiHandle { tx: self.tx.clone() }
  }

  /// Run every job queued so far without waiting. Returns how many ran.
  pub fn run_pending(&mut self, state: &mut S) -> usize {
    let mut ran = 0;
    while let Ok(job) = self.rx.try_recv() {
      job(state);
      ran += 1;
    }
    ran
  }

  /// Wait for the next job and run it.
  #[cfg(test)]
  pub async fn run_next(&mut self, state: &mut S) {
    // The scheduler keeps its own sender, so the channel never closes under us.
    if let Some(job) = self.rx.recv().await {
      job(state);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn jobs_run_in_post_order() {
    let mut scheduler: UiScheduler<Vec<u32>> = UiScheduler::new();
    let handle = scheduler.handle();
    for i in 0..5 {
      assert!(handle.post(move |log: &mut Vec<u32>| log.push(i)));
    }
    let mut log = Vec::new();
    assert_eq!(scheduler.run_pending(&mut log), 5);
    assert_eq!(log, vec![0, 1, 2, 3, 4]);
    assert_eq!(scheduler.run_pending(&mut log), 0);
  }

  #[test]
  fn post_after_drop_reports_failure() {
    let scheduler: UiScheduler<()> = UiScheduler::new();
    let handle = scheduler.handle();
    drop(scheduler);
    assert!(!handle.post(|_| {}));
  }

  #[tokio::test]
  async fn run_next_waits_for_worker_post() {
    let mut scheduler: UiScheduler<Vec<&'static str>> = UiScheduler::new();
    let handle = scheduler.handle();
    tokio::spawn(async move {
      handle.post(|log: &mut Vec<&'static str>| log.push("from worker"));
    });
    let mut log = Vec::new();
    scheduler.run_next(&mut log).await;
    assert_eq!(log, vec!["from worker"]);
  }
}
