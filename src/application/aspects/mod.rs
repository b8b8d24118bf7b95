//! Interceptors applied around application use cases

mod logging;
mod performance;
mod transaction;
mod validation;

pub use logging::{LoggingInterceptor, LoggingMode};
pub use performance::PerformanceInterceptor;
pub use transaction::{TransactionInterceptor, TransactionStrategy};
pub use validation::{RuleSetRegistry, ValidationInterceptor};
