use std::env;
use std::time::Duration;

pub struct Config {
    pub database_url: String,
    pub frontend_origin: String,
    /// Base URL of the AI service used for prompt classification and
    /// reply drafting.
    pub ai_base_url: String,
    pub ai_api_key: String,
    pub ai_timeout: Duration,
    /// Base URL of the internal gateway that talks to the social
    /// platforms (publish, delete, block).
    pub platform_gateway_url: String,
    pub platform_timeout: Duration,
    /// Shared secret for ingest webhook signatures.
    pub ingest_secret: String,
    /// Accepted clock skew for signed ingest requests, in seconds.
    pub ingest_replay_window_sec: i64,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let frontend_origin = env::var("FRONTEND_ORIGIN").expect("FRONTEND_ORIGIN must be set");
        let ai_base_url = env::var("AI_BASE_URL").expect("AI_BASE_URL must be set");
        let ai_api_key = env::var("AI_API_KEY").expect("AI_API_KEY must be set");
        let platform_gateway_url =
            env::var("PLATFORM_GATEWAY_URL").expect("PLATFORM_GATEWAY_URL must be set");
        let ingest_secret = env::var("INGEST_SECRET").expect("INGEST_SECRET must be set");

        let ai_timeout = env::var("AI_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_secs(10));
        let platform_timeout = env::var("PLATFORM_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_secs(15));
        let ingest_replay_window_sec = env::var("INGEST_REPLAY_WINDOW_SEC")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(300);

        Config {
            database_url,
            frontend_origin,
            ai_base_url,
            ai_api_key,
            ai_timeout,
            platform_gateway_url,
            platform_timeout,
            ingest_secret,
            ingest_replay_window_sec,
        }
    }

    #[cfg(test)]
    pub fn test_stub() -> Self {
        Config {
            database_url: String::new(),
            frontend_origin: "http://localhost".into(),
            ai_base_url: "http://localhost:9090".into(),
            ai_api_key: "stub".into(),
            ai_timeout: Duration::from_millis(50),
            platform_gateway_url: "http://localhost:9091".into(),
            platform_timeout: Duration::from_millis(50),
            ingest_secret: "0123456789abcdef0123456789ABCDEF".into(),
            ingest_replay_window_sec: 300,
        }
    }
}
