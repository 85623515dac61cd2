use actix_web::web;

mod checks;
mod health;

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health::health_route)
        .service(checks::run_checks_route)
        .service(checks::check_monitor_route)
        .service(checks::monitor_stats_route);
}
