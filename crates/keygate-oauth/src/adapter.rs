//! Uniform awaiting of collaborator results.
//!
//! A model method may answer in one of three ways:
//!
//! - immediately, with a value it already has ([`Outcome::Ready`]);
//! - with a future ([`Outcome::Deferred`]);
//! - by invoking a completion callback, possibly later and from another
//!   thread ([`Outcome::Callback`]).
//!
//! The core never cares which one was used. It calls [`Outcome::resolve`]
//! and gets a `Result` back.
//!
//! # Example
//!
//! ```ignore
//! fn get_user<'a>(&'a self, username: &'a str, _password: &'a str) -> Outcome<'a, Option<User>> {
//!     Outcome::callback(move |done| {
//!         let users = self.users.clone();
//!         let username = username.to_string();
//!         std::thread::spawn(move || done.ok(users.get(&username).cloned()));
//!     })
//! }
//! ```

use std::future::Future;

use futures_util::future::BoxFuture;
use tokio::sync::oneshot;

use crate::error::ModelError;
use crate::model::ModelMethod;

/// The result of a collaborator call, in whichever convention it chose.
pub enum Outcome<'a, T> {
    /// The value is already available.
    Ready(Result<T, ModelError>),

    /// The value will be produced by a future.
    Deferred(BoxFuture<'a, Result<T, ModelError>>),

    /// The value will be delivered through a [`Completion`].
    Callback(Box<dyn FnOnce(Completion<T>) + Send + 'a>),
}

impl<'a, T: Send + 'a> Outcome<'a, T> {
    /// A successful, immediately available value.
    #[must_use]
    pub fn ready(value: T) -> Self {
        Self::Ready(Ok(value))
    }

    /// An immediate failure.
    #[must_use]
    pub fn failed(err: impl Into<ModelError>) -> Self {
        Self::Ready(Err(err.into()))
    }

    /// A value produced by a future.
    #[must_use]
    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, ModelError>> + Send + 'a,
    {
        Self::Deferred(Box::pin(future))
    }

    /// A value delivered through a completion callback.
    ///
    /// `register` receives a [`Completion`] and must eventually call one of
    /// its methods. Dropping it unanswered resolves to
    /// [`ModelError::Abandoned`].
    #[must_use]
    pub fn callback<F>(register: F) -> Self
    where
        F: FnOnce(Completion<T>) + Send + 'a,
    {
        Self::Callback(Box::new(register))
    }

    /// The answer of a model method that is not implemented.
    #[must_use]
    pub fn unimplemented(method: ModelMethod) -> Self {
        Self::Ready(Err(ModelError::Unimplemented(method)))
    }

    /// Waits for the value, whatever convention produced it.
    ///
    /// # Errors
    ///
    /// Returns the collaborator's failure, or [`ModelError::Abandoned`] if a
    /// callback was dropped without reporting.
    pub async fn resolve(self) -> Result<T, ModelError> {
        match self {
            Self::Ready(result) => result,
            Self::Deferred(future) => future.await,
            Self::Callback(register) => {
                let (tx, rx) = oneshot::channel();
                register(Completion { tx });
                rx.await.unwrap_or(Err(ModelError::Abandoned))
            }
        }
    }
}

impl<'a, T: Send + 'a> From<Result<T, ModelError>> for Outcome<'a, T> {
    fn from(result: Result<T, ModelError>) -> Self {
        Self::Ready(result)
    }
}

/// One-shot completion handle passed to callback-style collaborators.
pub struct Completion<T> {
    tx: oneshot::Sender<Result<T, ModelError>>,
}

impl<T> Completion<T> {
    /// Reports the result.
    pub fn done(self, result: Result<T, ModelError>) {
        // The receiver is gone only if the request was cancelled.
        let _ = self.tx.send(result);
    }

    /// Reports a value.
    pub fn ok(self, value: T) {
        self.done(Ok(value));
    }

    /// Reports a failure.
    pub fn fail(self, err: impl Into<ModelError>) {
        self.done(Err(err.into()));
    }
}

impl<T> std::fmt::Debug for Completion<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion").finish_non_exhaustive()
    }
}
