//! The CBS client adapter: a thin synchronous-call/async-callback wrapper
//! over an externally supplied CBS handle.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::AuthError;

/// Token type submitted for every `put-token` / `delete-token` request.
///
/// Bit-exact external contract: ASCII, no trailing NUL in length accounting.
pub const CBS_TOKEN_TYPE: &str = "servicebus.windows.net:sastoken";

/// Outcome reported by a CBS completion callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CbsCompletion {
    Ok,
    Error {
        status_code: u32,
        status_description: String,
    },
}

/// Invoked once, when a `put_token` request completes.
pub type PutTokenCallback = Box<dyn FnOnce(CbsCompletion) + Send>;
/// Invoked once, when a `delete_token` request completes.
pub type DeleteTokenCallback = Box<dyn FnOnce(CbsCompletion) + Send>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Adapter over an external CBS handle.
///
/// Both operations are non-blocking at the call site: they return as soon
/// as the request has been submitted, and report completion later via the
/// supplied callback. The contract for *when* and on *which thread* that
/// callback runs is owned by the implementation (see the crate's
/// concurrency notes); the core only requires that it eventually runs
/// exactly once per submitted request, and that it never runs synchronously
/// from within the `put_token`/`delete_token` call itself.
pub trait CbsClient: std::fmt::Debug + Send + Sync {
    /// Submit `token` under [`CBS_TOKEN_TYPE`] for `audience`.
    fn put_token(
        &self,
        audience: &str,
        token: &str,
        on_complete: PutTokenCallback,
    ) -> Result<(), AuthError>;

    /// Delete the token previously submitted for `audience`.
    fn delete_token(&self, audience: &str, on_complete: DeleteTokenCallback) -> Result<(), AuthError>;
}

#[derive(Debug, Clone)]
pub struct CallRecord {
    pub audience: String,
    pub token: Option<String>,
    pub token_type: &'static str,
}

enum PendingOp {
    Put(PutTokenCallback),
    Delete(DeleteTokenCallback),
}

/// An in-process, queue-and-drain [`CbsClient`] used by tests and the
/// bundled demo binary.
///
/// It does not speak AMQP; it only exercises the adapter's contract.
/// Submissions are queued in call order; the driving test pops them off
/// with [`LoopbackCbsClient::complete_next`] to simulate CBS's out-of-band
/// completion.
#[derive(Debug, Default)]
pub struct LoopbackCbsClient {
    pending: Mutex<VecDeque<PendingOp>>,
    calls: Mutex<Vec<CallRecord>>,
    fail_submission: Mutex<bool>,
}

impl LoopbackCbsClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Force the next `put_token`/`delete_token` call to fail synchronously,
    /// as if the underlying CBS link were down.
    pub fn fail_next_submission(&self) {
        *lock(&self.fail_submission) = true;
    }

    /// Number of completions not yet delivered.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        lock(&self.pending).len()
    }

    /// All calls submitted so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<CallRecord> {
        lock(&self.calls).clone()
    }

    /// Deliver a completion for the oldest unacknowledged request.
    ///
    /// Returns `false` if there was nothing pending.
    pub fn complete_next(&self, result: CbsCompletion) -> bool {
        let Some(op) = lock(&self.pending).pop_front() else {
            return false;
        };
        match op {
            PendingOp::Put(cb) => cb(result),
            PendingOp::Delete(cb) => cb(result),
        }
        true
    }

    fn take_fail_flag(&self) -> bool {
        let mut guard = lock(&self.fail_submission);
        std::mem::replace(&mut *guard, false)
    }
}

impl CbsClient for LoopbackCbsClient {
    fn put_token(
        &self,
        audience: &str,
        token: &str,
        on_complete: PutTokenCallback,
    ) -> Result<(), AuthError> {
        if self.take_fail_flag() {
            return Err(AuthError::SubmitFailed(
                "loopback CBS client was told to fail this submission".to_owned(),
            ));
        }
        lock(&self.calls).push(CallRecord {
            audience: audience.to_owned(),
            token: Some(token.to_owned()),
            token_type: CBS_TOKEN_TYPE,
        });
        lock(&self.pending).push_back(PendingOp::Put(on_complete));
        Ok(())
    }

    fn delete_token(&self, audience: &str, on_complete: DeleteTokenCallback) -> Result<(), AuthError> {
        if self.take_fail_flag() {
            return Err(AuthError::SubmitFailed(
                "loopback CBS client was told to fail this submission".to_owned(),
            ));
        }
        lock(&self.calls).push(CallRecord {
            audience: audience.to_owned(),
            token: None,
            token_type: CBS_TOKEN_TYPE,
        });
        lock(&self.pending).push_back(PendingOp::Delete(on_complete));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_put_token_calls() -> Result<(), AuthError> {
        let client = LoopbackCbsClient::new();
        client.put_token("hub.example.net/devices/dev1", "tok", Box::new(|_| {}))?;
        let calls = client.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls.first().map(|c| c.audience.as_str()), Some("hub.example.net/devices/dev1"));
        assert_eq!(calls.first().and_then(|c| c.token.as_deref()), Some("tok"));
        assert_eq!(calls.first().map(|c| c.token_type), Some(CBS_TOKEN_TYPE));
        Ok(())
    }

    #[test]
    fn delivers_completion_in_submission_order() -> Result<(), AuthError> {
        let client = LoopbackCbsClient::new();
        let observed = std::sync::Arc::new(Mutex::new(Vec::new()));
        for i in 0..3 {
            let observed = observed.clone();
            client.put_token(
                "aud",
                "tok",
                Box::new(move |r| lock(&observed).push((i, r))),
            )?;
        }
        assert!(client.complete_next(CbsCompletion::Ok));
        assert!(client.complete_next(CbsCompletion::Ok));
        assert!(client.complete_next(CbsCompletion::Ok));
        let observed = lock(&observed);
        assert_eq!(observed.first().map(|(i, _)| *i), Some(0));
        assert_eq!(observed.last().map(|(i, _)| *i), Some(2));
        Ok(())
    }

    #[test]
    fn fail_next_submission_returns_err_once() {
        let client = LoopbackCbsClient::new();
        client.fail_next_submission();
        assert!(client.put_token("aud", "tok", Box::new(|_| {})).is_err());
        assert!(client.put_token("aud", "tok", Box::new(|_| {})).is_ok());
    }

    #[test]
    fn complete_next_on_empty_queue_returns_false() {
        let client = LoopbackCbsClient::new();
        assert!(!client.complete_next(CbsCompletion::Ok));
    }
}
