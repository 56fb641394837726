//! Environment configuration for the knowledge graph server.
//!
//! Every env var this process reads is read exactly once, here — no other
//! module calls `std::env::var` directly.

#[derive(Debug, Clone)]
pub struct KgConfig {
    pub graph_uri: String,
    pub graph_user: String,
    pub graph_password: String,
    pub bind_addr: String,
    pub pool_size: u32,
    pub jwt_secret: String,

    pub embedding_endpoint: String,
    pub embedding_api_key: String,

    pub similarity_duplicate: f32,
    pub similarity_high: f32,
    pub similarity_medium: f32,

    pub default_list_limit: u32,

    pub poll_interval_ms: u64,
    pub longpoll_max_timeout_secs: u64,

    pub dlq_dispatch_interval_ms: u64,
    pub dlq_max_retries: u32,

    pub admin_allowlist: Vec<String>,

    pub session_start_budget_ms: u64,

    pub token_estimate_base: u32,
    pub token_estimate_per_task: u32,
    pub token_estimate_per_event: u32,
    pub token_estimate_charter: u32,
    pub token_estimate_per_team_event: u32,
}

/// Knowledge graph service's list-endpoint page-size ceiling. Not
/// configurable — `KG_DEFAULT_LIST_LIMIT` only raises or lowers the
/// default, never this cap.
pub const LIST_LIMIT_CEILING: u32 = 100;

impl KgConfig {
    pub fn from_env() -> Self {
        Self {
            graph_uri: std::env::var("KG_GRAPH_URI").expect("KG_GRAPH_URI must be set"),
            graph_user: std::env::var("KG_GRAPH_USER").expect("KG_GRAPH_USER must be set"),
            graph_password: std::env::var("KG_GRAPH_PASSWORD")
                .expect("KG_GRAPH_PASSWORD must be set"),
            bind_addr: std::env::var("KG_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:4100".into()),
            pool_size: env_parse("KG_POOL_SIZE", 10),
            jwt_secret: std::env::var("KG_JWT_SECRET").expect("KG_JWT_SECRET must be set"),

            embedding_endpoint: std::env::var("KG_EMBEDDING_ENDPOINT")
                .expect("KG_EMBEDDING_ENDPOINT must be set"),
            embedding_api_key: std::env::var("KG_EMBEDDING_API_KEY")
                .expect("KG_EMBEDDING_API_KEY must be set"),

            similarity_duplicate: env_parse("KG_SIMILARITY_DUPLICATE", 0.95),
            similarity_high: env_parse("KG_SIMILARITY_HIGH", 0.85),
            similarity_medium: env_parse("KG_SIMILARITY_MEDIUM", 0.75),

            default_list_limit: env_parse("KG_DEFAULT_LIST_LIMIT", 20),

            poll_interval_ms: env_parse("KG_POLL_INTERVAL_MS", 500),
            longpoll_max_timeout_secs: env_parse("KG_LONGPOLL_MAX_TIMEOUT_SECS", 60),

            dlq_dispatch_interval_ms: env_parse("KG_DLQ_DISPATCH_INTERVAL_MS", 500),
            dlq_max_retries: env_parse("KG_DLQ_MAX_RETRIES", 3),

            admin_allowlist: std::env::var("KG_ADMIN_ALLOWLIST")
                .ok()
                .map(|v| v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
                .unwrap_or_default(),

            session_start_budget_ms: env_parse("KG_SESSION_START_BUDGET_MS", 2000),

            token_estimate_base: env_parse("KG_TOKEN_ESTIMATE_BASE", 500),
            token_estimate_per_task: env_parse("KG_TOKEN_ESTIMATE_PER_TASK", 50),
            token_estimate_per_event: env_parse("KG_TOKEN_ESTIMATE_PER_EVENT", 30),
            token_estimate_charter: env_parse("KG_TOKEN_ESTIMATE_CHARTER", 200),
            token_estimate_per_team_event: env_parse("KG_TOKEN_ESTIMATE_PER_TEAM_EVENT", 40),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
