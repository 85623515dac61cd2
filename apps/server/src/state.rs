use actix_web::HttpRequest;
use actix_web::http::header::AUTHORIZATION;
use tokio::sync::Mutex;
use uptime_engine::Engine;

/// Shared by every worker
pub struct AppState {
    pub engine: Engine,
    cron_secret: Option<String>,
    /// Held for the duration of a batch so a second trigger is refused
    pub batch_lock: Mutex<()>,
}

impl AppState {
    pub fn new(engine: Engine, cron_secret: Option<String>) -> Self {
        Self { engine, cron_secret, batch_lock: Mutex::new(()) }
    }

    /// Without a configured secret every caller is allowed
    pub fn authorized(&self, req: &HttpRequest) -> bool {
        let Some(secret) = &self.cron_secret else {
            return true;
        };

        req.headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .is_some_and(|token| token == secret)
    }
}
