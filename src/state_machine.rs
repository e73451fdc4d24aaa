//! The authentication state machine: the top-level component that
//! coordinates the credential store, token minter, and CBS client adapter
//! against wall-clock time and external stimulus.

use std::sync::{Arc, Mutex};

use crate::cbs::{CbsClient, CbsCompletion, DeleteTokenCallback, PutTokenCallback};
use crate::clock::Clock;
use crate::config::{AuthConfig, CbsConfig};
use crate::credential::{Credential, CredentialType};
use crate::error::{AuthError, Result};
use crate::identity::Identity;
use crate::signer::SasSigner;
use crate::status::{AuthenticationStatus, StopResult};

type StatusChangedCallback = Box<dyn FnMut(AuthenticationStatus, AuthenticationStatus) + Send>;
type StopCompletedCallback = Box<dyn FnOnce(StopResult) + Send>;

struct Inner {
    identity: Identity,
    credential: Credential,
    cbs_config: CbsConfig,
    sas_token_key_name: String,
    status: AuthenticationStatus,
    cbs_handle: Option<Arc<dyn CbsClient>>,
    signer: Arc<dyn SasSigner>,
    clock: Arc<dyn Clock>,
    current_sas_token_create_time: u64,
    current_sas_token_put_time: u64,
    /// Bumped every time a `put_token`/`delete_token` is submitted.
    /// Completions stamped with a stale generation are discarded, so a
    /// `put-token` that has already timed out cannot resurrect itself if
    /// CBS's answer arrives late.
    generation: u64,
    on_status_changed: Option<StatusChangedCallback>,
    on_stop_completed: Option<StopCompletedCallback>,
}

/// Coordinates SAS-token minting/submission against a CBS peer on behalf of
/// one device identity.
///
/// Must be driven by exactly one caller thread: see the crate's
/// concurrency notes. Internally this wraps its mutable state behind a
/// `Mutex` purely so that CBS completion callbacks (delivered through a
/// cloned handle, not through `&mut self`) can re-enter and mutate status;
/// it is not a promise that the type is safe to drive concurrently from
/// multiple threads at once.
pub struct AuthenticationStateMachine {
    inner: Arc<Mutex<Inner>>,
}

impl AuthenticationStateMachine {
    /// Construct a new state machine for `config`, with the given timing
    /// parameters, SAS signer, and time source.
    ///
    /// Fails with [`AuthError::InvalidConfig`] if `config` does not name
    /// exactly one credential variant.
    pub fn new(
        config: AuthConfig,
        cbs_config: CbsConfig,
        signer: Arc<dyn SasSigner>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let (identity, credential) = config.build()?;
        Ok(Self {
            inner: Arc::new(Mutex::new(Inner {
                identity,
                credential,
                cbs_config,
                sas_token_key_name: String::new(),
                status: AuthenticationStatus::None,
                cbs_handle: None,
                signer,
                clock,
                current_sas_token_create_time: 0,
                current_sas_token_put_time: 0,
                generation: 0,
                on_status_changed: None,
                on_stop_completed: None,
            })),
        })
    }

    /// Convenience constructor using [`crate::signer::HmacSha256Signer`] and
    /// [`crate::clock::SystemClock`], the defaults suitable for most
    /// deployments.
    pub fn with_defaults(config: AuthConfig, cbs_config: CbsConfig) -> Result<Self> {
        Self::new(
            config,
            cbs_config,
            Arc::new(crate::signer::HmacSha256Signer),
            Arc::new(crate::clock::SystemClock),
        )
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> AuthenticationStatus {
        self.lock().status
    }

    /// Read-only accessor for the configured credential variant.
    #[must_use]
    pub fn credential_type(&self) -> CredentialType {
        self.lock().credential.credential_type()
    }

    /// The configured credential itself, cloned out of the store.
    ///
    /// This is the only way to retrieve an `X509` credential's
    /// certificate/private-key pair: the state machine recognizes the
    /// variant but never acts on it, so a caller building the TLS layer
    /// elsewhere needs this accessor to reach the material at all.
    #[must_use]
    pub fn credential(&self) -> Credential {
        self.lock().credential.clone()
    }

    /// Epoch seconds the current SAS token was minted, or 0 if none.
    #[must_use]
    pub fn current_sas_token_create_time(&self) -> u64 {
        self.lock().current_sas_token_create_time
    }

    /// Epoch seconds the current SAS token was submitted to CBS, or 0 if
    /// none is in flight.
    #[must_use]
    pub fn current_sas_token_put_time(&self) -> u64 {
        self.lock().current_sas_token_put_time
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Begin authenticating. Requires status `None` or `Idle`.
    ///
    /// `cbs_handle` must be supplied when the configured credential
    /// requires CBS (`DeviceKey`, `DeviceSasToken`); it is ignored (and may
    /// be omitted) for `X509`.
    pub fn start<F>(&self, cbs_handle: Option<Arc<dyn CbsClient>>, on_status_changed: F) -> Result<()>
    where
        F: FnMut(AuthenticationStatus, AuthenticationStatus) + Send + 'static,
    {
        let mut inner = self.lock();

        if !matches!(inner.status, AuthenticationStatus::None | AuthenticationStatus::Idle) {
            return Err(AuthError::InvalidState(format!(
                "start requires status None or Idle, found {:?}",
                inner.status
            )));
        }

        if inner.credential.requires_cbs() {
            let handle = cbs_handle.ok_or_else(|| {
                AuthError::InvalidArgument(
                    "cbs_handle is required for this credential type".to_owned(),
                )
            })?;
            inner.cbs_handle = Some(handle);
        }

        inner.on_status_changed = Some(Box::new(on_status_changed));
        Self::transition(&mut inner, AuthenticationStatus::Started);
        Ok(())
    }

    /// The periodic driver tick. See the module-level transition table.
    pub fn do_work(&self) -> Result<()> {
        let mut inner = self.lock();

        if matches!(inner.status, AuthenticationStatus::None | AuthenticationStatus::Idle) {
            return Err(AuthError::InvalidState(
                "do_work called before start".to_owned(),
            ));
        }

        if inner.status == AuthenticationStatus::Authenticated
            && inner.credential.credential_type() == CredentialType::DeviceKey
            && Self::refresh_due(&inner)
        {
            Self::transition(&mut inner, AuthenticationStatus::Refreshing);
        }

        match inner.status {
            AuthenticationStatus::Started | AuthenticationStatus::Refreshing => {
                Self::authenticate_device(&self.inner, &mut *inner)
            }
            AuthenticationStatus::Authenticating => {
                if Self::timeout_reached(&inner) {
                    tracing::warn!("CBS put-token request timed out");
                    inner.generation = inner.generation.wrapping_add(1);
                    Self::transition(&mut inner, AuthenticationStatus::FailedTimeout);
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Initiate teardown. See the module-level transition table.
    pub fn stop<F>(&self, on_stop_completed: F) -> Result<()>
    where
        F: FnOnce(StopResult) + Send + 'static,
    {
        let mut inner = self.lock();

        match inner.status {
            AuthenticationStatus::Failed | AuthenticationStatus::FailedTimeout => {
                Self::transition(&mut inner, AuthenticationStatus::Idle);
                inner.on_status_changed = None;
                on_stop_completed(StopResult::Success);
                Ok(())
            }
            AuthenticationStatus::Authenticated | AuthenticationStatus::Authenticating => {
                let audience = inner.identity.audience();
                let Some(cbs) = inner.cbs_handle.clone() else {
                    return Err(AuthError::InvalidState(
                        "no cbs_handle available to delete the current token".to_owned(),
                    ));
                };

                inner.generation = inner.generation.wrapping_add(1);
                let generation = inner.generation;
                let shared = self.inner.clone();
                inner.on_stop_completed = Some(Box::new(on_stop_completed));
                Self::transition(&mut inner, AuthenticationStatus::Deauthenticating);

                let callback: DeleteTokenCallback = Box::new(move |result| {
                    Self::on_delete_token_complete(&shared, generation, result);
                });

                match cbs.delete_token(&audience, callback) {
                    Ok(()) => Ok(()),
                    Err(err) => {
                        // A synchronous submit failure drops the armed callback rather than
                        // invoking it: `on_stop_completed` is documented to fire from the
                        // delete-token completion, not from this call-site failure.
                        inner.on_stop_completed = None;
                        Self::transition(&mut inner, AuthenticationStatus::Failed);
                        Err(err)
                    }
                }
            }
            other => Err(AuthError::InvalidState(format!(
                "cannot stop from status {other:?}"
            ))),
        }
    }

    /// Apply a recognized timing option. Unknown names are rejected rather
    /// than silently ignored.
    pub fn set_option(&self, name: &str, value_ms: u64) -> Result<()> {
        let mut inner = self.lock();
        match name {
            "sas_token_lifetime" => inner.cbs_config.sas_token_lifetime_ms = value_ms,
            "sas_token_refresh_time" => inner.cbs_config.sas_token_refresh_ms = value_ms,
            "cbs_request_timeout" => inner.cbs_config.cbs_request_timeout_ms = value_ms,
            other => {
                return Err(AuthError::InvalidArgument(format!(
                    "unrecognized option name: {other}"
                )));
            }
        }
        Ok(())
    }

    /// Release the resources this state machine holds (the CBS handle and
    /// both callback slots), provided it is in a terminal status.
    ///
    /// This is not strictly necessary in Rust, since `Drop` reclaims
    /// storage regardless; it exists to mirror the source's explicit
    /// `destroy()` and to give callers an eager, checked release point.
    pub fn shutdown(&self) -> Result<()> {
        let mut inner = self.lock();
        if !inner.status.is_terminal() {
            return Err(AuthError::InvalidState(format!(
                "destroy is only safe from a terminal status, found {:?}",
                inner.status
            )));
        }
        inner.cbs_handle = None;
        inner.on_status_changed = None;
        inner.on_stop_completed = None;
        Ok(())
    }

    fn refresh_due(inner: &Inner) -> bool {
        match inner.clock.now() {
            None => true,
            Some(now) => {
                now.saturating_sub(inner.current_sas_token_create_time)
                    >= inner.cbs_config.sas_token_refresh_ms / 1000
            }
        }
    }

    fn timeout_reached(inner: &Inner) -> bool {
        match inner.clock.now() {
            None => true,
            Some(now) => {
                now.saturating_sub(inner.current_sas_token_put_time).saturating_mul(1000)
                    >= inner.cbs_config.cbs_request_timeout_ms
            }
        }
    }

    fn authenticate_device(shared: &Arc<Mutex<Inner>>, inner: &mut Inner) -> Result<()> {
        match inner.credential.clone() {
            Credential::DeviceKey(key) => {
                let now = inner.clock.now().ok_or(AuthError::ClockUnavailable)?;
                let expiry = now + inner.cbs_config.sas_token_lifetime_ms / 1000;
                let audience = inner.identity.audience();
                let token = inner
                    .signer
                    .sign(key.as_bytes(), &audience, &inner.sas_token_key_name, expiry)
                    .map_err(|e| AuthError::SignerFailure(Box::new(e)))?;

                inner.current_sas_token_create_time = now;
                Self::transition(inner, AuthenticationStatus::Authenticating);

                Self::submit_put_token(shared, inner, &audience, &token, now)
            }
            Credential::DeviceSasToken(token) => {
                let now = inner.clock.now().ok_or(AuthError::ClockUnavailable)?;
                Self::transition(inner, AuthenticationStatus::Authenticating);
                let audience = inner.identity.audience();
                Self::submit_put_token(shared, inner, &audience, &token, now)
            }
            Credential::X509(_) | Credential::None => Err(AuthError::UnexpectedCredentialType),
        }
    }

    fn submit_put_token(
        shared: &Arc<Mutex<Inner>>,
        inner: &mut Inner,
        audience: &str,
        token: &str,
        now: u64,
    ) -> Result<()> {
        let Some(cbs) = inner.cbs_handle.clone() else {
            return Err(AuthError::InvalidArgument(
                "cbs_handle is required before a token can be submitted".to_owned(),
            ));
        };

        inner.generation = inner.generation.wrapping_add(1);
        let generation = inner.generation;
        let callback_target = shared.clone();

        let callback: PutTokenCallback = Box::new(move |result| {
            Self::on_put_token_complete(&callback_target, generation, result);
        });

        match cbs.put_token(audience, token, callback) {
            Ok(()) => {
                inner.current_sas_token_put_time = now;
                Ok(())
            }
            Err(err) => {
                Self::transition(inner, AuthenticationStatus::Failed);
                Err(err)
            }
        }
    }

    fn on_put_token_complete(shared: &Arc<Mutex<Inner>>, generation: u64, result: CbsCompletion) {
        let mut inner = shared.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

        if inner.generation != generation || inner.status != AuthenticationStatus::Authenticating {
            tracing::debug!("ignoring stale put_token completion");
            return;
        }

        match result {
            CbsCompletion::Ok => {
                Self::transition(&mut inner, AuthenticationStatus::Authenticated);
            }
            CbsCompletion::Error {
                status_code,
                status_description,
            } => {
                tracing::warn!(status_code, %status_description, "CBS rejected put-token");
                Self::transition(&mut inner, AuthenticationStatus::Failed);
            }
        }
    }

    fn on_delete_token_complete(shared: &Arc<Mutex<Inner>>, generation: u64, result: CbsCompletion) {
        let mut inner = shared.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

        if inner.generation != generation || inner.status != AuthenticationStatus::Deauthenticating {
            tracing::debug!("ignoring stale delete_token completion");
            return;
        }

        match result {
            CbsCompletion::Ok => {
                inner.current_sas_token_create_time = 0;
                if let Some(cb) = inner.on_stop_completed.take() {
                    cb(StopResult::Success);
                }
                Self::transition(&mut inner, AuthenticationStatus::Idle);
            }
            CbsCompletion::Error {
                status_code,
                status_description,
            } => {
                tracing::warn!(status_code, %status_description, "CBS rejected delete-token");
                if let Some(cb) = inner.on_stop_completed.take() {
                    cb(StopResult::Error);
                }
                Self::transition(&mut inner, AuthenticationStatus::Failed);
            }
        }
    }

    fn transition(inner: &mut Inner, new_status: AuthenticationStatus) {
        if inner.status == new_status {
            return;
        }
        let old_status = inner.status;
        inner.status = new_status;
        tracing::debug!(?old_status, ?new_status, "authentication status changed");
        if let Some(cb) = inner.on_status_changed.as_mut() {
            cb(old_status, new_status);
        }
    }
}

impl Drop for AuthenticationStateMachine {
    fn drop(&mut self) {
        if let Ok(inner) = self.inner.lock() {
            if !inner.status.is_terminal() {
                tracing::warn!(
                    status = ?inner.status,
                    "authentication state machine dropped from a non-terminal status"
                );
            }
        }
    }
}
