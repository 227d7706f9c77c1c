pub struct Config {
    pub port: u16,
    pub database_url: String,
    /// Seconds between unbind finalizer sweeps. The cooling-off period is
    /// measured in days, so a minute-scale tick is plenty.
    pub sweep_interval_secs: u64,
    pub test_mode: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(38080),
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:pairspace.db?mode=rwc".to_string()),
            sweep_interval_secs: std::env::var("PAIRSPACE_SWEEP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
            test_mode: std::env::var("PAIRSPACE_TEST_MODE")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        }
    }
}
