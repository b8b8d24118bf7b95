use futures_util::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::future::Future;

use super::failure::Failure;

/// Type-erased result flowing through an interceptor chain
pub type Outcome = Box<dyn Any + Send>;

/// Identity of the intercepted operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodTarget {
  pub declaring_type: String,
  pub method: String,
}

impl MethodTarget {
  pub fn new(declaring_type: impl Into<String>, method: impl Into<String>) -> Self {
    Self {
      declaring_type: declaring_type.into(),
      method: method.into(),
    }
  }
}

impl fmt::Display for MethodTarget {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}.{}", self.declaring_type, self.method)
  }
}

/// One captured call argument
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Argument {
  pub name: String,
  pub value: Value,
  pub type_name: String,
}

impl Argument {
  /// Captures an argument by serializing its current value
  ///
  /// Values that cannot be serialized are recorded as a marker string
  /// instead of failing the call.
  pub fn capture<T>(name: impl Into<String>, value: &T) -> Self
  where
    T: Serialize + ?Sized,
  {
    let value = serde_json::to_value(value)
      .unwrap_or_else(|e| Value::String(format!("<unserializable: {}>", e)));

    Self {
      name: name.into(),
      value,
      type_name: short_type_name(std::any::type_name::<T>()),
    }
  }
}

/// Strips module paths from a type name, keeping generics readable
///
/// `alloc::vec::Vec<alloc::string::String>` becomes `Vec<String>`.
fn short_type_name(full: &str) -> String {
  fn flush(segment: &mut String, short: &mut String) {
    let name = segment.rsplit("::").next().unwrap_or_default();
    short.push_str(name);
    segment.clear();
  }

  let mut short = String::with_capacity(full.len());
  let mut segment = String::new();

  for ch in full.chars() {
    if ch.is_alphanumeric() || ch == '_' || ch == ':' {
      segment.push(ch);
    } else {
      flush(&mut segment, &mut short);
      short.push(ch);
    }
  }
  flush(&mut segment, &mut short);

  short
}

/// Read-only view of a pending call, shared with every interceptor
#[derive(Debug, Clone)]
pub struct InvocationContext {
  target: MethodTarget,
  arguments: Vec<Argument>,
}

impl InvocationContext {
  pub fn new(target: MethodTarget, arguments: Vec<Argument>) -> Self {
    Self { target, arguments }
  }

  pub fn target(&self) -> &MethodTarget {
    &self.target
  }

  pub fn method_name(&self) -> &str {
    &self.target.method
  }

  pub fn declaring_type(&self) -> &str {
    &self.target.declaring_type
  }

  pub fn arguments(&self) -> &[Argument] {
    &self.arguments
  }

  pub fn argument(&self, name: &str) -> Option<&Argument> {
    self.arguments.iter().find(|argument| argument.name == name)
  }
}

/// Deferred continuation running the real operation
///
/// Consumed by `run`, so the operation executes at most once per call.
pub struct Proceed<'a> {
  operation: BoxFuture<'a, Result<Outcome, Failure>>,
}

impl<'a> Proceed<'a> {
  pub fn new<T, F>(operation: F) -> Self
  where
    T: Send + 'static,
    F: Future<Output = Result<T, Failure>> + Send + 'a,
  {
    Self {
      operation: Box::pin(async move { operation.await.map(|value| Box::new(value) as Outcome) }),
    }
  }

  pub fn run(self) -> BoxFuture<'a, Result<Outcome, Failure>> {
    self.operation
  }
}
