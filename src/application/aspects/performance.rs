use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::interception::{
  DiagnosticSink, Failure, Interceptor, InterceptorKind, InvocationContext, Next, Outcome,
  PerformanceSample, Stopwatch,
};

/// Reports calls that take longer than a threshold
///
/// Each call gets its own stopwatch, so concurrent calls never share
/// timing state.
pub struct PerformanceInterceptor {
  threshold: Duration,
  sink: Arc<dyn DiagnosticSink>,
}

impl PerformanceInterceptor {
  pub fn new(threshold: Duration, sink: Arc<dyn DiagnosticSink>) -> Self {
    Self { threshold, sink }
  }
}

#[async_trait]
impl Interceptor for PerformanceInterceptor {
  fn name(&self) -> &str {
    "performance"
  }

  fn kind(&self) -> InterceptorKind {
    InterceptorKind::Performance
  }

  async fn intercept(&self, ctx: &InvocationContext, next: Next<'_>) -> Result<Outcome, Failure> {
    let mut stopwatch = Stopwatch::start_new();
    let result = next.run(ctx).await;

    if result.is_ok() {
      stopwatch.stop();
      if let Some(sample) =
        PerformanceSample::over_threshold(ctx.target(), stopwatch.elapsed(), self.threshold)
      {
        self.sink.report(&sample);
      }
    }
    stopwatch.reset();

    result
  }
}
