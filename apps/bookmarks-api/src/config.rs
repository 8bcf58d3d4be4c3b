/// Bookmarks API configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection string.
    pub database_url: String,
    /// Maximum number of pooled PostgreSQL connections.
    pub db_pool_size: usize,
    /// Redis connection string. When unset, sessions live in process memory.
    pub redis_url: Option<String>,
    /// Origin of the web application; the login callback always redirects here.
    pub app_origin: String,
    /// Public origin of this API, used to build the OIDC callback URL.
    pub public_url: String,
    /// OpenID Connect provider settings.
    pub oidc: OidcConfig,
    /// Port the HTTP server binds to.
    pub port: u16,
}

/// Endpoints and credentials for the external identity provider.
#[derive(Debug, Clone)]
pub struct OidcConfig {
    pub issuer_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub authorize_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Panics with a descriptive message if a required variable is missing.
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(4003);
        let issuer_url = required_var("OIDC_ISSUER_URL")
            .trim_end_matches('/')
            .to_string();

        Self {
            database_url: required_var("DATABASE_URL"),
            db_pool_size: std::env::var("DATABASE_POOL_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            redis_url: std::env::var("REDIS_URL").ok().filter(|s| !s.is_empty()),
            app_origin: required_var("APP_ORIGIN").trim_end_matches('/').to_string(),
            public_url: std::env::var("PUBLIC_URL")
                .ok()
                .filter(|s| !s.is_empty())
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or_else(|| format!("http://localhost:{port}")),
            oidc: OidcConfig {
                client_id: required_var("OIDC_CLIENT_ID"),
                client_secret: required_var("OIDC_CLIENT_SECRET"),
                authorize_url: optional_endpoint("OIDC_AUTHORIZE_URL", &issuer_url, "authorize"),
                token_url: optional_endpoint("OIDC_TOKEN_URL", &issuer_url, "token"),
                userinfo_url: optional_endpoint("OIDC_USERINFO_URL", &issuer_url, "userinfo"),
                issuer_url,
            },
            port,
        }
    }

    /// The redirect URI registered with the identity provider.
    pub fn callback_url(&self) -> String {
        format!("{}/auth/callback", self.public_url)
    }

    /// WebSocket URL for the change stream.
    pub fn gateway_url(&self) -> String {
        let base = self
            .public_url
            .replacen("https://", "wss://", 1)
            .replacen("http://", "ws://", 1);
        format!("{base}/gateway")
    }
}

fn required_var(name: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| panic!("{name} env var is required"))
}

fn optional_endpoint(name: &str, issuer_url: &str, path: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| format!("{issuer_url}/{path}"))
}
