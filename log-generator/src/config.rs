use std::time::Duration;

use envconfig::Envconfig;

#[derive(Envconfig, Clone, Debug)]
pub struct Config {
    #[envconfig(from = "TARGET_URL", default = "http://localhost:3000/logs")]
    pub target_url: String,

    // Stamped as `source` on every generated record
    #[envconfig(from = "SERVICE_NAME", default = "generator")]
    pub service_name: String,

    #[envconfig(from = "INTERVAL_MS", default = "1000")]
    pub interval_ms: u64,

    #[envconfig(from = "BATCH_SIZE", default = "1")]
    pub batch_size: usize,

    pub max_records: Option<u64>, // stop after this many records, runs forever when unset

    #[envconfig(from = "PRINT_SINK", default = "false")]
    pub print_sink: bool,

    #[envconfig(from = "REQUEST_TIMEOUT_MS", default = "5000")]
    pub request_timeout_ms: u64,
}

impl Config {
    /// Tick period, never zero.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults() {
        let config = Config::init_from_hashmap(&HashMap::new()).unwrap();
        assert_eq!(config.target_url, "http://localhost:3000/logs");
        assert_eq!(config.service_name, "generator");
        assert_eq!(config.interval(), Duration::from_secs(1));
        assert_eq!(config.batch_size, 1);
        assert_eq!(config.max_records, None);
        assert!(!config.print_sink);
    }

    #[test]
    fn zero_interval_is_clamped() {
        let env = HashMap::from([
            ("INTERVAL_MS".to_string(), "0".to_string()),
            ("MAX_RECORDS".to_string(), "10".to_string()),
        ]);
        let config = Config::init_from_hashmap(&env).unwrap();
        assert_eq!(config.interval(), Duration::from_millis(1));
        assert_eq!(config.max_records, Some(10));
    }
}
