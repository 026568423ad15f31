//! Decides whether a surface may open or must send the user to sign in.

use crate::auth::{AuthProvider, AuthSession};

/// Where a surface goes after checking for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Proceed(AuthSession),
    RedirectToAuth,
}

/// Check for a current session before showing any note UI.
///
/// Not having a session is a normal outcome, so provider errors are logged
/// and treated the same way.
pub async fn check_session(auth: &impl AuthProvider) -> GateDecision {
    match auth.current_session().await {
        Ok(Some(session)) => GateDecision::Proceed(session),
        Ok(None) => {
            tracing::info!("No active session; redirecting to sign-in");
            GateDecision::RedirectToAuth
        }
        Err(error) => {
            tracing::warn!("Failed to load session: {}", error);
            GateDecision::RedirectToAuth
        }
    }
}

/// Sign out and leave the note surface.
pub async fn sign_out(auth: &impl AuthProvider) -> GateDecision {
    if let Err(error) = auth.sign_out().await {
        tracing::warn!("Failed to clear session: {}", error);
    }
    GateDecision::RedirectToAuth
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthError, AuthResult};
    use crate::services::auth_flow::tests::{session_for, FakeAuth};
    use pretty_assertions::assert_eq;

    struct BrokenAuth;

    impl AuthProvider for BrokenAuth {
        async fn sign_in(&self, _email: &str, _password: &str) -> AuthResult<AuthSession> {
            Err(AuthError::MissingCredentials)
        }

        async fn sign_up(&self, _email: &str, _password: &str) -> AuthResult<AuthSession> {
            Err(AuthError::MissingCredentials)
        }

        async fn current_session(&self) -> AuthResult<Option<AuthSession>> {
            Err(AuthError::SecureStorage("keychain locked".to_string()))
        }

        async fn sign_out(&self) -> AuthResult<()> {
            Err(AuthError::SecureStorage("keychain locked".to_string()))
        }
    }

    #[tokio::test]
    async fn missing_session_redirects() {
        let auth = FakeAuth::default();
        assert_eq!(check_session(&auth).await, GateDecision::RedirectToAuth);
    }

    #[tokio::test]
    async fn existing_session_proceeds() {
        let auth = FakeAuth::default();
        *auth.session.lock().unwrap() = Some(session_for("a@b.c"));
        assert_eq!(
            check_session(&auth).await,
            GateDecision::Proceed(session_for("a@b.c"))
        );
    }

    #[tokio::test]
    async fn provider_error_redirects() {
        assert_eq!(check_session(&BrokenAuth).await, GateDecision::RedirectToAuth);
        assert_eq!(sign_out(&BrokenAuth).await, GateDecision::RedirectToAuth);
    }

    #[tokio::test]
    async fn sign_out_clears_session() {
        let auth = FakeAuth::default();
        *auth.session.lock().unwrap() = Some(session_for("a@b.c"));

        assert_eq!(sign_out(&auth).await, GateDecision::RedirectToAuth);
        assert_eq!(check_session(&auth).await, GateDecision::RedirectToAuth);
    }
}
