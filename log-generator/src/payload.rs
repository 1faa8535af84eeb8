use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

/// Relative frequency of each level in generated traffic.
pub const LEVEL_WEIGHTS: [(&str, u32); 4] =
    [("debug", 20), ("info", 55), ("warn", 15), ("error", 10)];

const ENDPOINTS: &[&str] = &[
    "/api/users",
    "/api/orders",
    "/api/payments",
    "/api/cart",
    "/api/search",
    "/api/auth/login",
];
const METHODS: &[&str] = &["GET", "POST", "PUT", "DELETE"];

const DEBUG_MESSAGES: &[&str] = &[
    "Cache lookup for key user:{user}",
    "Query executed in {ms}ms",
    "Feature flag evaluated for user {user}",
    "Connection pool has {pool} idle connections",
];
const INFO_MESSAGES: &[&str] = &[
    "User {user} logged in",
    "Payment of ${amount} completed",
    "Order {order} created",
    "Request to {endpoint} served in {ms}ms",
];
const WARN_MESSAGES: &[&str] = &[
    "Slow query detected: {ms}ms",
    "Retrying request to {endpoint} (attempt {attempt})",
    "Rate limit approaching for user {user}",
    "Cache miss ratio above threshold",
];
const ERROR_MESSAGES: &[&str] = &[
    "Payment of ${amount} declined for user {user}",
    "Database connection timeout after {ms}ms",
    "Failed to process order {order}",
    "Unhandled exception in {endpoint}",
];
const ERROR_CODES: &[&str] = &["E_TIMEOUT", "E_DECLINED", "E_UPSTREAM", "E_INTERNAL"];

/// One synthetic log document, shaped the way an application service would
/// post it to the ingestion endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyntheticLog {
    pub level: &'static str,
    pub message: String,
    pub source: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub request_id: Uuid,
    pub user_id: u32,
    pub endpoint: &'static str,
    pub method: &'static str,
    pub status_code: u16,
    pub duration_ms: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,
}

pub struct LogGenerator<R = StdRng> {
    rng: R,
    service: String,
}

impl LogGenerator<StdRng> {
    pub fn new(service: impl Into<String>) -> Self {
        Self::with_rng(service, StdRng::from_entropy())
    }
}

impl<R: Rng> LogGenerator<R> {
    pub fn with_rng(service: impl Into<String>, rng: R) -> Self {
        Self {
            rng,
            service: service.into(),
        }
    }

    pub fn next_record(&mut self, now: OffsetDateTime) -> SyntheticLog {
        let level = self.pick_level();
        let endpoint = pick(&mut self.rng, ENDPOINTS);
        let user_id = self.rng.gen_range(1000..10_000);

        let (status_code, duration_ms) = match level {
            "error" => (
                *[500, 502, 503, 504].choose(&mut self.rng).unwrap_or(&500),
                self.rng.gen_range(1000..30_000),
            ),
            "warn" => (
                *[200, 408, 429].choose(&mut self.rng).unwrap_or(&200),
                self.rng.gen_range(500..5000),
            ),
            _ => (
                *[200, 201, 204].choose(&mut self.rng).unwrap_or(&200),
                self.rng.gen_range(5..500),
            ),
        };

        let templates = match level {
            "debug" => DEBUG_MESSAGES,
            "warn" => WARN_MESSAGES,
            "error" => ERROR_MESSAGES,
            _ => INFO_MESSAGES,
        };
        let message = pick(&mut self.rng, templates)
            .replace("{user}", &user_id.to_string())
            .replace("{ms}", &duration_ms.to_string())
            .replace("{endpoint}", endpoint)
            .replace("{pool}", &self.rng.gen_range(0..32).to_string())
            .replace("{attempt}", &self.rng.gen_range(2..5).to_string())
            .replace(
                "{amount}",
                &format!("{:.2}", self.rng.gen_range(1.0..500.0_f64)),
            )
            .replace("{order}", &format!("ORD-{:06}", self.rng.gen_range(0..1_000_000)));

        let error_code = (level == "error").then(|| pick(&mut self.rng, ERROR_CODES));

        SyntheticLog {
            level,
            message,
            source: self.service.clone(),
            timestamp: now,
            request_id: Uuid::now_v7(),
            user_id,
            endpoint,
            method: pick(&mut self.rng, METHODS),
            status_code,
            duration_ms,
            error_code,
        }
    }

    fn pick_level(&mut self) -> &'static str {
        let total: u32 = LEVEL_WEIGHTS.iter().map(|(_, weight)| weight).sum();
        let mut roll = self.rng.gen_range(0..total);
        for (level, weight) in LEVEL_WEIGHTS {
            if roll < weight {
                return level;
            }
            roll -= weight;
        }
        "info"
    }
}

fn pick<R: Rng>(rng: &mut R, choices: &[&'static str]) -> &'static str {
    choices.choose(rng).copied().unwrap_or_default()
}
