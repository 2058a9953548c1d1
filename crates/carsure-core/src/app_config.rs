use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Which vision model backend the analysis pipeline talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiProvider {
    Gemini,
    /// Canned responses; no network access.
    Mock,
}

impl std::fmt::Display for AiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AiProvider::Gemini => write!(f, "gemini"),
            AiProvider::Mock => write!(f, "mock"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    /// Enables the `X-Dev-Auth-Bypass` header. Never set this in production.
    pub dev_mode: bool,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub firebase_database_url: String,
    pub firebase_project_id: Option<String>,
    pub firebase_api_key: Option<String>,
    pub firebase_list_timeout_secs: u64,
    /// Primary key first, then `GEMINI_BACKUP_KEYS` in order.
    pub gemini_api_keys: Vec<String>,
    pub gemini_model: String,
    pub gemini_timeout_secs: u64,
    pub ai_provider: AiProvider,
    pub detector_url: Option<String>,
    pub detector_enabled: bool,
    pub admin_uids: Vec<String>,
    pub store_raw_image: bool,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    /// Whether `X-Dev-Auth-Bypass` is honoured. Only an explicit `DEV_MODE`
    /// turns it on; the development environment alone does not.
    #[must_use]
    pub fn dev_auth_bypass(&self) -> bool {
        self.dev_mode
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("dev_mode", &self.dev_mode)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("firebase_database_url", &self.firebase_database_url)
            .field("firebase_project_id", &self.firebase_project_id)
            .field(
                "firebase_api_key",
                &self.firebase_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field(
                "firebase_list_timeout_secs",
                &self.firebase_list_timeout_secs,
            )
            .field(
                "gemini_api_keys",
                &format!("[{} redacted]", self.gemini_api_keys.len()),
            )
            .field("gemini_model", &self.gemini_model)
            .field("gemini_timeout_secs", &self.gemini_timeout_secs)
            .field("ai_provider", &self.ai_provider)
            .field("detector_url", &self.detector_url)
            .field("detector_enabled", &self.detector_enabled)
            .field("admin_uids", &self.admin_uids)
            .field("store_raw_image", &self.store_raw_image)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish()
    }
}
