//! Bearer credentials.
//!
//! Interactive sign-in and secret storage live outside this crate: a
//! [`TokenProvider`] hands over an already-acquired token. The default
//! provider reads it from the environment variable each environment names.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use webpub_core::Environment;

use crate::error::RemoteError;

/// An opaque bearer token. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Source of bearer tokens for an environment.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn token(&self, environment: &Environment) -> Result<AccessToken, RemoteError>;
}

/// Reads the token from the variable named by [`Environment::token_env`].
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvTokenProvider;

#[async_trait]
impl TokenProvider for EnvTokenProvider {
    async fn token(&self, environment: &Environment) -> Result<AccessToken, RemoteError> {
        let variable = environment.token_env();
        match std::env::var(variable) {
            Ok(value) if !value.trim().is_empty() => Ok(AccessToken::new(value.trim())),
            _ => Err(RemoteError::MissingCredentials {
                environment: environment.name.0.clone(),
                variable: variable.to_string(),
            }),
        }
    }
}

/// Always hands out the same token.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider(pub AccessToken);

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn token(&self, _environment: &Environment) -> Result<AccessToken, RemoteError> {
        Ok(self.0.clone())
    }
}

/// How a publish obtains its credentials: ask a provider, or reuse a token a
/// batch already resolved.
#[derive(Clone)]
pub enum AuthContext {
    Provider(Arc<dyn TokenProvider>),
    Token(AccessToken),
}

impl AuthContext {
    pub fn from_env() -> Self {
        AuthContext::Provider(Arc::new(EnvTokenProvider))
    }

    pub async fn resolve(&self, environment: &Environment) -> Result<AccessToken, RemoteError> {
        let token = match self {
            AuthContext::Provider(provider) => provider.token(environment).await?,
            AuthContext::Token(token) => token.clone(),
        };
        if token.secret().trim().is_empty() {
            return Err(RemoteError::MissingCredentials {
                environment: environment.name.0.clone(),
                variable: environment.token_env().to_string(),
            });
        }
        Ok(token)
    }
}

impl fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthContext::Provider(_) => f.write_str("AuthContext::Provider"),
            AuthContext::Token(token) => write!(f, "AuthContext::Token({token:?})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use webpub_core::EnvironmentName;

    fn env(token_env: &str) -> Environment {
        Environment {
            name: EnvironmentName::from("dev"),
            url: "https://dev.example.com".to_string(),
            create_missing_resources: true,
            token_env: Some(token_env.to_string()),
            api_version: None,
        }
    }

    #[test]
    fn debug_redacts_secret() {
        let token = AccessToken::new("super-secret");
        assert_eq!(format!("{token:?}"), "AccessToken(***)");
    }

    #[tokio::test]
    async fn env_provider_reports_missing_variable() {
        let environment = env("WEBPUB_TEST_TOKEN_THAT_IS_NEVER_SET");
        let err = EnvTokenProvider.token(&environment).await.unwrap_err();
        assert!(
            err.to_string().contains("$WEBPUB_TEST_TOKEN_THAT_IS_NEVER_SET"),
            "got: {err}"
        );
    }

    #[tokio::test]
    async fn empty_pre_resolved_token_is_missing_credentials() {
        let environment = env("UNUSED");
        let err = AuthContext::Token(AccessToken::new("  "))
            .resolve(&environment)
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::MissingCredentials { .. }));
    }
}
