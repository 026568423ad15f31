//! Sign-in and sign-up submission for the auth screen.

use crate::auth::{AuthProvider, AuthSession};

use super::Feedback;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    SignIn,
    SignUp,
}

impl AuthMode {
    const fn success(self) -> Feedback {
        match self {
            Self::SignIn => Feedback::LoginSuccessful,
            Self::SignUp => Feedback::SignupSuccessful,
        }
    }

    const fn failure(self) -> Feedback {
        match self {
            Self::SignIn => Feedback::LoginFailed,
            Self::SignUp => Feedback::SignupFailed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Credentials accepted; the caller moves on to the note surface.
    Authenticated {
        session: AuthSession,
        feedback: Feedback,
    },
    /// Nothing changed; the caller stays on the auth surface.
    Rejected { feedback: Feedback },
}

impl AuthOutcome {
    pub const fn feedback(&self) -> Feedback {
        match self {
            Self::Authenticated { feedback, .. } | Self::Rejected { feedback } => *feedback,
        }
    }

    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }
}

/// Email/password sign-in and sign-up with input validation.
pub struct AuthFlow<'a, A: AuthProvider> {
    auth: &'a A,
}

impl<'a, A: AuthProvider> AuthFlow<'a, A> {
    pub const fn new(auth: &'a A) -> Self {
        Self { auth }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AuthOutcome {
        self.submit(AuthMode::SignIn, email, password).await
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> AuthOutcome {
        self.submit(AuthMode::SignUp, email, password).await
    }

    pub async fn submit(&self, mode: AuthMode, email: &str, password: &str) -> AuthOutcome {
        let email = email.trim();
        if email.is_empty() || password.trim().is_empty() {
            return AuthOutcome::Rejected {
                feedback: Feedback::EnterCredentials,
            };
        }

        let result = match mode {
            AuthMode::SignIn => self.auth.sign_in(email, password).await,
            AuthMode::SignUp => self.auth.sign_up(email, password).await,
        };

        match result {
            Ok(session) => {
                tracing::info!("{:?} succeeded for {}", mode, email);
                AuthOutcome::Authenticated {
                    session,
                    feedback: mode.success(),
                }
            }
            Err(error) => {
                // The provider's reason stays in the log; the user gets the
                // generic message.
                tracing::warn!("{:?} failed for {}: {}", mode, email, error);
                AuthOutcome::Rejected {
                    feedback: mode.failure(),
                }
            }
        }
    }
}
