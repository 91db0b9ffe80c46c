use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// Upper bound on orders updated at once by a bulk status change.
    pub bulk_status_concurrency: usize,
    pub cash_out_code_ttl_hours: i64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let bulk_status_concurrency = env::var("BULK_STATUS_CONCURRENCY")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(8);
        let cash_out_code_ttl_hours = env::var("CASH_OUT_CODE_TTL_HOURS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(72);
        Ok(Self {
            port,
            database_url,
            host,
            bulk_status_concurrency,
            cash_out_code_ttl_hours,
        })
    }
}
