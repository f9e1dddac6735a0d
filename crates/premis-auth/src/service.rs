//! Login orchestration — password and two-factor verification ending in
//! token issuance.
//!
//! Every expected outcome is a [`LoginOutcome`] variant; the login path
//! never propagates errors. Internal faults (data source down, corrupt
//! crypto material) are logged and surfaced as `UnknownError`.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::error;

use premis_core::error::{PremisError, PremisResult};
use premis_core::models::role::SystemRole;
use premis_core::repository::{RefreshTokenStore, UserDirectory};

use crate::config::AuthConfig;
use crate::password;
use crate::token::{self, SessionTokens, TokenSubject};
use crate::totp::{TotpOutcome, TotpVerifier};

/// Input for the login flow.
#[derive(Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// Submitted two-factor code, when the client has one.
    pub totp_code: Option<String>,
}

/// Exhaustive login outcome. Callers match on every case; no variant is
/// an error.
///
/// `UserDidNotExist` and `PasswordInvalid` map to the same user-facing
/// message so responses do not reveal which accounts exist.
#[derive(Debug)]
pub enum LoginOutcome {
    Success(SessionTokens),
    UserDidNotExist,
    PasswordInvalid,
    NoAccess,
    PasswordNotSet,
    PasswordLoginLockedOut,
    TotpCodeRequired,
    TotpLockedOut,
    TotpCodeInvalid,
    TotpCodeAlreadyUsed,
    UnknownError,
}

impl LoginOutcome {
    /// User-facing message; deliberately identical for "no such user"
    /// and "wrong password".
    pub fn user_message(&self) -> &'static str {
        match self {
            LoginOutcome::Success(_) => "Signed in.",
            LoginOutcome::UserDidNotExist | LoginOutcome::PasswordInvalid => {
                "Invalid email or password."
            }
            LoginOutcome::NoAccess => "This account has no access.",
            LoginOutcome::PasswordNotSet => "No password is set for this account.",
            LoginOutcome::PasswordLoginLockedOut => {
                "Too many failed attempts. Try again later."
            }
            LoginOutcome::TotpCodeRequired => "A verification code is required.",
            LoginOutcome::TotpLockedOut => {
                "Too many failed verification codes. Try again later."
            }
            LoginOutcome::TotpCodeInvalid => "Invalid verification code.",
            LoginOutcome::TotpCodeAlreadyUsed => {
                "This verification code was already used."
            }
            LoginOutcome::UnknownError => "Something went wrong. Try again.",
        }
    }
}

enum TokenKind {
    Session,
    Tablet,
}

/// Login service over a user directory and refresh token store.
///
/// Generic over the repositories so the auth layer has no dependency on
/// the data-access crate.
pub struct LoginService<D: UserDirectory, R: RefreshTokenStore> {
    directory: D,
    token_store: R,
    totp: Arc<TotpVerifier>,
    config: AuthConfig,
}

impl<D: UserDirectory, R: RefreshTokenStore> LoginService<D, R> {
    pub fn new(directory: D, token_store: R, totp: Arc<TotpVerifier>, config: AuthConfig) -> Self {
        Self {
            directory,
            token_store,
            totp,
            config,
        }
    }

    /// Authenticate and issue a session token pair.
    pub async fn login(&self, request: LoginRequest) -> LoginOutcome {
        self.run(request, TokenKind::Session).await
    }

    /// Authenticate a tablet device and issue a long-lived access token
    /// (no refresh token).
    pub async fn login_tablet(&self, request: LoginRequest) -> LoginOutcome {
        self.run(request, TokenKind::Tablet).await
    }

    fn lockout_window(&self) -> Duration {
        Duration::seconds(self.config.lockout_duration_secs as i64)
    }

    async fn run(&self, request: LoginRequest, kind: TokenKind) -> LoginOutcome {
        match self.try_login(&request, kind).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(error = %err, "login aborted by internal error");
                LoginOutcome::UnknownError
            }
        }
    }

    async fn try_login(
        &self,
        request: &LoginRequest,
        kind: TokenKind,
    ) -> PremisResult<LoginOutcome> {
        let Some(user) = self.directory.get_by_email(&request.email).await? else {
            return Ok(LoginOutcome::UserDidNotExist);
        };

        if user.system_role == SystemRole::NoAccess {
            return Ok(LoginOutcome::NoAccess);
        }

        if let Some(until) = user.password_locked_until {
            if until > Utc::now() {
                return Ok(LoginOutcome::PasswordLoginLockedOut);
            }
        }

        let Some(stored_hash) = user.password_hash.as_deref() else {
            return Ok(LoginOutcome::PasswordNotSet);
        };

        if !password::verify_password(&request.password, stored_hash, &self.config.pepper)? {
            self.directory
                .record_failed_password_attempt(
                    user.id,
                    self.config.max_failed_attempts,
                    self.lockout_window(),
                )
                .await?;
            return Ok(LoginOutcome::PasswordInvalid);
        }

        if user.totp_enabled {
            let Some(code) = request.totp_code.as_deref() else {
                return Ok(LoginOutcome::TotpCodeRequired);
            };
            if let Some(until) = user.totp_locked_until {
                if until > Utc::now() {
                    return Ok(LoginOutcome::TotpLockedOut);
                }
            }
            let Some(encrypted_secret) = user.totp_secret.as_deref() else {
                return Err(PremisError::Internal(
                    "two-factor enabled without an enrolled secret".into(),
                ));
            };
            match self.totp.verify_code(user.id, code, encrypted_secret)? {
                TotpOutcome::Ok => {}
                TotpOutcome::CodeInvalid => {
                    self.directory
                        .record_failed_totp_attempt(
                            user.id,
                            self.config.max_failed_attempts,
                            self.lockout_window(),
                        )
                        .await?;
                    return Ok(LoginOutcome::TotpCodeInvalid);
                }
                TotpOutcome::CodeAlreadyUsed => {
                    return Ok(LoginOutcome::TotpCodeAlreadyUsed);
                }
            }
        }

        self.directory.clear_failed_attempts(user.id).await?;

        let subject = TokenSubject {
            user_id: user.id,
            display_name: user.display_name.clone(),
            email: user.email.clone(),
            system_role: user.system_role,
        };

        let tokens = match kind {
            TokenKind::Session => {
                token::issue_session(&self.token_store, &subject, &self.config).await?
            }
            TokenKind::Tablet => SessionTokens {
                access_token: token::issue_tablet_token(&subject, &self.config)?,
                refresh_token: None,
                expires_in: self.config.tablet_token_lifetime_secs,
            },
        };

        Ok(LoginOutcome::Success(tokens))
    }

    /// Rotate a refresh token for an already-authenticated principal.
    pub async fn refresh(
        &self,
        subject: &TokenSubject,
        presented_refresh_token: &str,
    ) -> PremisResult<SessionTokens> {
        token::refresh_session(
            &self.token_store,
            subject,
            presented_refresh_token,
            &self.config,
        )
        .await
    }

    /// Revoke every refresh token for a user (e.g. on password change).
    pub async fn revoke_all_sessions(&self, user_id: uuid::Uuid) -> PremisResult<()> {
        self.token_store.revoke_all(user_id).await
    }
}
