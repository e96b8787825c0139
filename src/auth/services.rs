use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::auth::directory::{Directory, Principal, User};
use crate::auth::password::{self, MAX_PASSWORD_CHARS};
use crate::auth::redirect::is_safe_redirect;
use crate::auth::session::{SessionStore, SessionToken};

/// Default post-login destination.
pub const HOME: &str = "/";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Pre-credential input failures; each carries its own re-prompt message.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("please enter your email address")]
    MissingEmail,
    #[error("this field requires a valid email address")]
    MalformedEmail,
    #[error("please enter the password for this account")]
    MissingPassword,
    #[error("password must be at most 255 characters")]
    PasswordTooLong,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LoginError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Unknown email and wrong password deliberately collapse into this one
    /// variant so callers cannot enumerate accounts.
    #[error("invalid credentials")]
    InvalidCredentials,
    /// Credentials were valid but the requested destination was refused.
    #[error("unsafe redirect target")]
    UnsafeRedirect,
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub token: SessionToken,
    pub redirect_to: String,
    pub user_id: u32,
    pub email: String,
}

/// Drives one login attempt: local validation, directory lookup, credential
/// verification, redirect validation, then session establishment. The
/// directory and session store are passed in explicitly; there is no ambient
/// current-user state.
pub fn login(
    directory: &Directory,
    sessions: &SessionStore,
    origin: &Url,
    email: &str,
    password: &str,
    next: Option<&str>,
) -> Result<LoginOutcome, LoginError> {
    // Local validation happens before the directory is consulted.
    if email.is_empty() {
        return Err(ValidationError::MissingEmail.into());
    }
    if !is_valid_email(email) {
        return Err(ValidationError::MalformedEmail.into());
    }
    if password.is_empty() {
        return Err(ValidationError::MissingPassword.into());
    }
    if password.chars().count() > MAX_PASSWORD_CHARS {
        return Err(ValidationError::PasswordTooLong.into());
    }

    let Some(user) = directory.find_by_email(email) else {
        warn!(email = %email, "login with unknown email");
        return Err(LoginError::InvalidCredentials);
    };

    let verification = password::verify_password(password, user.password_hash());
    if !verification.valid || !user.is_active() {
        warn!(email = %email, user_id = user.id(), "login rejected");
        return Err(LoginError::InvalidCredentials);
    }
    if verification.needs_rehash {
        // Persisting upgraded hashes is out of scope; surface the signal.
        info!(user_id = user.id(), "stored hash uses deprecated parameters");
    }

    // A valid password must never complete an unsafe redirect, so the
    // destination is settled before any session state exists.
    let redirect_to = match next {
        Some(target) if !is_safe_redirect(origin, target) => {
            warn!(user_id = user.id(), "unsafe redirect target refused");
            return Err(LoginError::UnsafeRedirect);
        }
        Some(target) => target.to_string(),
        None => HOME.to_string(),
    };

    user.set_authenticated(true);
    let token = sessions.establish(user.id());
    info!(user_id = user.id(), email = %user.email(), "user logged in");

    Ok(LoginOutcome {
        token,
        redirect_to,
        user_id: user.id(),
        email: user.email().to_string(),
    })
}

/// Ends the session, if any. Logging out an already-anonymous caller is fine.
pub fn logout(directory: &Directory, sessions: &SessionStore, token: &SessionToken) {
    if let Some(session) = sessions.revoke(token) {
        if let Some(user) = directory.find_by_id(session.user_id) {
            user.set_authenticated(false);
        }
        info!(
            user_id = session.user_id,
            established_at = %session.established_at,
            "user logged out"
        );
    }
}

/// Pure lookup, no side effects.
pub fn current_user<'a>(
    directory: &'a Directory,
    sessions: &SessionStore,
    token: &SessionToken,
) -> Option<&'a User> {
    let session = sessions.get(token)?;
    directory.find_by_id(session.user_id)
}
