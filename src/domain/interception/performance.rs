use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

use super::invocation::MethodTarget;

/// Accumulating stopwatch
///
/// Like a lap timer: starting again after `stop` keeps adding to the
/// elapsed total until `reset` is called. Not meant to be shared by
/// concurrent calls.
#[derive(Debug, Default)]
pub struct Stopwatch {
  accumulated: Duration,
  started_at: Option<Instant>,
}

impl Stopwatch {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn start_new() -> Self {
    let mut stopwatch = Self::new();
    stopwatch.start();
    stopwatch
  }

  pub fn start(&mut self) {
    if self.started_at.is_none() {
      self.started_at = Some(Instant::now());
    }
  }

  pub fn stop(&mut self) {
    if let Some(started_at) = self.started_at.take() {
      self.accumulated += started_at.elapsed();
    }
  }

  pub fn reset(&mut self) {
    self.accumulated = Duration::ZERO;
    self.started_at = None;
  }

  pub fn is_running(&self) -> bool {
    self.started_at.is_some()
  }

  pub fn elapsed(&self) -> Duration {
    match self.started_at {
      Some(started_at) => self.accumulated + started_at.elapsed(),
      None => self.accumulated,
    }
  }
}

/// Elapsed time of a call that exceeded its threshold
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceSample {
  pub target: MethodTarget,
  pub elapsed: Duration,
  pub threshold: Duration,
}

impl PerformanceSample {
  /// Returns a sample only when `elapsed` is strictly above `threshold`
  pub fn over_threshold(
    target: &MethodTarget,
    elapsed: Duration,
    threshold: Duration,
  ) -> Option<Self> {
    (elapsed > threshold).then(|| Self {
      target: target.clone(),
      elapsed,
      threshold,
    })
  }
}
