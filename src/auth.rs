//! Session auth
//!
//! Table-backed replacement for the hosted auth provider the original
//! system leaned on: `sign_in` upserts a user by email and mints a token
//! session with a TTL, `current_user` gates the admin surface. No roles;
//! a valid session is an administrator.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use uuid::Uuid;

use crate::entity::{Session, User};
use crate::executor::{SqlError, SqlExecutor};

#[derive(Debug)]
pub enum AuthError {
    /// No session, an unknown token, or an expired one: the caller should
    /// route to sign-in.
    SignInRequired,
    /// The email failed the form check before any backend call.
    InvalidEmail(String),
    /// Failure from the auth backend.
    Database(SqlError),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::SignInRequired => write!(f, "sign-in required"),
            AuthError::InvalidEmail(email) => write!(f, "invalid email address: {email:?}"),
            AuthError::Database(e) => write!(f, "auth backend error: {e}"),
        }
    }
}

impl std::error::Error for AuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AuthError::Database(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SqlError> for AuthError {
    fn from(err: SqlError) -> Self {
        AuthError::Database(err)
    }
}

/// Storage operations behind the authenticator.
pub trait AuthBackend {
    /// Find or create the user for an already-normalized email.
    fn upsert_user(&self, email: &str) -> Result<User, AuthError>;

    fn insert_session(&self, session: Session) -> Result<(), AuthError>;

    /// The session and its user, if the token is known.
    fn session_with_user(&self, token: Uuid) -> Result<Option<(Session, User)>, AuthError>;

    /// Forget a session; unknown tokens are a no-op.
    fn delete_session(&self, token: Uuid) -> Result<(), AuthError>;
}

/// Sign-in and session checks over an [`AuthBackend`].
pub struct Authenticator<B: AuthBackend> {
    backend: B,
    session_ttl: Duration,
}

impl<B: AuthBackend> Authenticator<B> {
    pub fn new(backend: B, session_ttl: Duration) -> Self {
        Self {
            backend,
            session_ttl,
        }
    }

    /// Mint a session for an email, creating the user on first sight.
    ///
    /// # Errors
    ///
    /// `AuthError::InvalidEmail` for anything that does not look like an
    /// address; backend failures pass through.
    pub fn sign_in(&self, email: &str) -> Result<Session, AuthError> {
        let email = email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(AuthError::InvalidEmail(email));
        }

        let user = self.backend.upsert_user(&email)?;
        let now = Utc::now();
        let session = Session {
            token: Uuid::new_v4(),
            user_id: user.id,
            created_at: now,
            expires_at: now + self.session_ttl,
        };
        self.backend.insert_session(session.clone())?;
        info!("signed in {} (user id={})", email, user.id);
        Ok(session)
    }

    /// The user behind a token.
    ///
    /// Expired sessions are cleaned up on sight and report the same as an
    /// unknown token.
    ///
    /// # Errors
    ///
    /// `AuthError::SignInRequired` when the token is unknown or expired.
    pub fn current_user(&self, token: Uuid) -> Result<User, AuthError> {
        let Some((session, user)) = self.backend.session_with_user(token)? else {
            return Err(AuthError::SignInRequired);
        };
        if session.is_expired(Utc::now()) {
            debug!("session {token} expired; deleting");
            self.backend.delete_session(token)?;
            return Err(AuthError::SignInRequired);
        }
        Ok(user)
    }

    /// Revoke a session. Signing out an unknown token succeeds silently.
    pub fn sign_out(&self, token: Uuid) -> Result<(), AuthError> {
        self.backend.delete_session(token)
    }
}

/// The page-level gate: a missing token short-circuits to
/// [`AuthError::SignInRequired`] without touching the backend.
pub fn require_user<B: AuthBackend>(
    auth: &Authenticator<B>,
    token: Option<Uuid>,
) -> Result<User, AuthError> {
    match token {
        Some(token) => auth.current_user(token),
        None => Err(AuthError::SignInRequired),
    }
}

/// In-memory [`AuthBackend`] for tests and demos.
#[derive(Clone, Default)]
pub struct MemoryAuth {
    inner: Arc<Mutex<MemoryAuthInner>>,
}

#[derive(Default)]
struct MemoryAuthInner {
    users: Vec<User>,
    sessions: HashMap<Uuid, Session>,
}

impl MemoryAuth {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryAuthInner>, AuthError> {
        self.inner
            .lock()
            .map_err(|_| AuthError::Database(SqlError::Other("auth lock poisoned".to_string())))
    }
}

impl AuthBackend for MemoryAuth {
    fn upsert_user(&self, email: &str) -> Result<User, AuthError> {
        let mut inner = self.lock()?;
        if let Some(user) = inner.users.iter().find(|u| u.email == email) {
            return Ok(user.clone());
        }
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            created_at: Utc::now(),
        };
        inner.users.push(user.clone());
        Ok(user)
    }

    fn insert_session(&self, session: Session) -> Result<(), AuthError> {
        let mut inner = self.lock()?;
        inner.sessions.insert(session.token, session);
        Ok(())
    }

    fn session_with_user(&self, token: Uuid) -> Result<Option<(Session, User)>, AuthError> {
        let inner = self.lock()?;
        let Some(session) = inner.sessions.get(&token) else {
            return Ok(None);
        };
        let user = inner
            .users
            .iter()
            .find(|u| u.id == session.user_id)
            .cloned();
        Ok(user.map(|u| (session.clone(), u)))
    }

    fn delete_session(&self, token: Uuid) -> Result<(), AuthError> {
        let mut inner = self.lock()?;
        inner.sessions.remove(&token);
        Ok(())
    }
}

/// [`AuthBackend`] over the `users` and `sessions` tables.
#[derive(Clone)]
pub struct PostgresAuth<E: SqlExecutor> {
    executor: Arc<E>,
}

impl<E: SqlExecutor> PostgresAuth<E> {
    pub fn new(executor: Arc<E>) -> Self {
        Self { executor }
    }
}

impl<E: SqlExecutor> AuthBackend for PostgresAuth<E> {
    fn upsert_user(&self, email: &str) -> Result<User, AuthError> {
        let row = self.executor.query_one(
            "INSERT INTO users (id, email, created_at) VALUES ($1, $2, $3) \
             ON CONFLICT (email) DO UPDATE SET email = EXCLUDED.email \
             RETURNING id, email, created_at",
            &[&Uuid::new_v4(), &email, &Utc::now()],
        )?;
        let id: Uuid = row
            .try_get(0)
            .map_err(|e| SqlError::Parse(format!("users.id: {e}")))?;
        let email: String = row
            .try_get(1)
            .map_err(|e| SqlError::Parse(format!("users.email: {e}")))?;
        let created_at: DateTime<Utc> = row
            .try_get(2)
            .map_err(|e| SqlError::Parse(format!("users.created_at: {e}")))?;
        Ok(User {
            id,
            email,
            created_at,
        })
    }

    fn insert_session(&self, session: Session) -> Result<(), AuthError> {
        self.executor.execute(
            "INSERT INTO sessions (token, user_id, created_at, expires_at) \
             VALUES ($1, $2, $3, $4)",
            &[
                &session.token,
                &session.user_id,
                &session.created_at,
                &session.expires_at,
            ],
        )?;
        Ok(())
    }

    fn session_with_user(&self, token: Uuid) -> Result<Option<(Session, User)>, AuthError> {
        let rows = self.executor.query_all(
            "SELECT s.token, s.user_id, s.created_at, s.expires_at, \
                    u.id, u.email, u.created_at \
             FROM sessions s \
             JOIN users u ON u.id = s.user_id \
             WHERE s.token = $1",
            &[&token],
        )?;
        let Some(row) = rows.first() else {
            return Ok(None);
        };

        let parse = |idx: usize, what: &str, e: may_postgres::Error| {
            SqlError::Parse(format!("sessions join column {idx} ({what}): {e}"))
        };
        let session = Session {
            token: row.try_get(0).map_err(|e| parse(0, "token", e))?,
            user_id: row.try_get(1).map_err(|e| parse(1, "user_id", e))?,
            created_at: row.try_get(2).map_err(|e| parse(2, "created_at", e))?,
            expires_at: row.try_get(3).map_err(|e| parse(3, "expires_at", e))?,
        };
        let user = User {
            id: row.try_get(4).map_err(|e| parse(4, "id", e))?,
            email: row.try_get(5).map_err(|e| parse(5, "email", e))?,
            created_at: row.try_get(6).map_err(|e| parse(6, "created_at", e))?,
        };
        Ok(Some((session, user)))
    }

    fn delete_session(&self, token: Uuid) -> Result<(), AuthError> {
        self.executor
            .execute("DELETE FROM sessions WHERE token = $1", &[&token])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authenticator() -> Authenticator<MemoryAuth> {
        Authenticator::new(MemoryAuth::new(), Duration::minutes(30))
    }

    #[test]
    fn test_sign_in_then_current_user() {
        let auth = authenticator();
        let session = auth.sign_in("admin@smk.example").expect("sign in");
        let user = auth.current_user(session.token).expect("gate passes");
        assert_eq!(user.email, "admin@smk.example");
    }

    #[test]
    fn test_email_is_normalized_to_one_user() {
        let auth = authenticator();
        let first = auth.sign_in("Admin@SMK.example").expect("sign in");
        let second = auth.sign_in("  admin@smk.example ").expect("sign in");

        let a = auth.current_user(first.token).expect("gate");
        let b = auth.current_user(second.token).expect("gate");
        assert_eq!(a.id, b.id, "same account behind both sessions");
    }

    #[test]
    fn test_invalid_email_is_rejected() {
        let auth = authenticator();
        assert!(matches!(
            auth.sign_in("   "),
            Err(AuthError::InvalidEmail(_))
        ));
        assert!(matches!(
            auth.sign_in("not-an-address"),
            Err(AuthError::InvalidEmail(_))
        ));
    }

    #[test]
    fn test_unknown_token_requires_sign_in() {
        let auth = authenticator();
        assert!(matches!(
            auth.current_user(Uuid::new_v4()),
            Err(AuthError::SignInRequired)
        ));
    }

    #[test]
    fn test_expired_session_requires_sign_in_again() {
        // TTL in the past: the session is born expired.
        let auth = Authenticator::new(MemoryAuth::new(), Duration::minutes(-1));
        let session = auth.sign_in("admin@smk.example").expect("sign in");
        assert!(matches!(
            auth.current_user(session.token),
            Err(AuthError::SignInRequired)
        ));
    }

    #[test]
    fn test_sign_out_revokes_the_session() {
        let auth = authenticator();
        let session = auth.sign_in("admin@smk.example").expect("sign in");
        auth.sign_out(session.token).expect("sign out");
        assert!(matches!(
            auth.current_user(session.token),
            Err(AuthError::SignInRequired)
        ));
    }

    #[test]
    fn test_require_user_without_a_token() {
        let auth = authenticator();
        assert!(matches!(
            require_user(&auth, None),
            Err(AuthError::SignInRequired)
        ));

        let session = auth.sign_in("admin@smk.example").expect("sign in");
        let user = require_user(&auth, Some(session.token)).expect("gate");
        assert_eq!(user.email, "admin@smk.example");
    }
}
