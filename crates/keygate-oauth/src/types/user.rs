//! Resource owner.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A resource owner as the model represents it.
///
/// The core never looks inside; it only carries the value from the model to
/// the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct User(pub Value);

impl User {
    /// Wraps a JSON value.
    #[must_use]
    pub fn new(value: impl Into<Value>) -> Self {
        Self(value.into())
    }

    /// Returns the wrapped value.
    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Consumes the user and returns the wrapped value.
    #[must_use]
    pub fn into_inner(self) -> Value {
        self.0
    }
}

impl From<Value> for User {
    fn from(value: Value) -> Self {
        Self(value)
    }
}
