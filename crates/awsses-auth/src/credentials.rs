pub const ACCESS_KEY_ENV: &str = "AWS_ACCESS_KEY_ID";
pub const SECRET_KEY_ENV: &str = "AWS_SECRET_ACCESS_KEY";
pub const SESSION_TOKEN_ENV: &str = "AWS_SESSION_TOKEN";

#[derive(Clone)]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: String,
    pub session_token: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

pub trait CredentialProvider: Send + Sync {
    fn credentials(&self) -> Option<Credentials>;
}

#[derive(Clone, Debug, Default)]
pub struct StaticCredentialProvider {
    root: Option<Credentials>,
}

impl StaticCredentialProvider {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self::with_session_token(access_key, secret_key, None)
    }

    pub fn with_session_token(
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        let access_key = access_key.into();
        let secret_key = secret_key.into();
        let root = if access_key.is_empty() || secret_key.is_empty() {
            None
        } else {
            Some(Credentials {
                access_key,
                secret_key,
                session_token: session_token.filter(|token| !token.is_empty()),
            })
        };
        Self { root }
    }

    /// Reads the standard `AWS_*` environment variables once.
    pub fn from_env() -> Self {
        let read = |name: &str| std::env::var(name).unwrap_or_default();
        Self::with_session_token(
            read(ACCESS_KEY_ENV),
            read(SECRET_KEY_ENV),
            std::env::var(SESSION_TOKEN_ENV).ok(),
        )
    }

    pub fn disabled() -> Self {
        Self { root: None }
    }

    pub fn is_configured(&self) -> bool {
        self.root.is_some()
    }
}

impl CredentialProvider for StaticCredentialProvider {
    fn credentials(&self) -> Option<Credentials> {
        self.root.clone()
    }
}
