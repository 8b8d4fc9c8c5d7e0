pub mod config;
pub mod error;
pub mod events;
pub mod ids;
pub mod janitor;
pub mod lifecycle;
pub mod models;
pub mod push;
pub mod rate_limit;
pub mod registry;
pub mod room;
pub mod routes;

use std::sync::Arc;
use std::time::Instant;

use config::RelayConfig;
use rate_limit::RateLimiter;
use registry::RoomRegistry;
use rocket::fairing::AdHoc;
use rocket_cors::{AllowedOrigins, CorsOptions};

pub fn rocket() -> rocket::Rocket<rocket::Build> {
    build_rocket(RelayConfig::from_env())
}

pub fn rocket_with_config(config: RelayConfig) -> rocket::Rocket<rocket::Build> {
    build_rocket(config)
}

fn build_rocket(config: RelayConfig) -> rocket::Rocket<rocket::Build> {
    eprintln!("🔐 starting zero-knowledge relay on port {}", config.port);

    let config = Arc::new(config);
    let registry = Arc::new(RoomRegistry::from_config(&config));
    let rate_limiter = Arc::new(RateLimiter::from_config(&config));
    let started_at = Instant::now();

    let cors = if config.cors_origin == "*" {
        CorsOptions::default()
    } else {
        CorsOptions::default().allowed_origins(AllowedOrigins::some_exact(&[
            config.cors_origin.clone(),
        ]))
    }
    .to_cors()
    .expect("failed to build CORS policy");

    // Bound HTTP request bodies to the same 64 KiB frame budget the push
    // transport enforces, so an oversized envelope is rejected the same
    // way on either transport.
    let figment = rocket::Config::figment()
        .merge(("port", config.port))
        .merge(("limits.json", 64 * 1024));

    let janitor_registry = registry.clone();
    let janitor_rate_limiter = rate_limiter.clone();
    let janitor_config = config.clone();

    rocket::custom(figment)
        .manage(config)
        .manage(registry)
        .manage(rate_limiter)
        .manage(started_at)
        .attach(cors)
        .attach(routes::security_headers_fairing())
        .attach(lifecycle::fairing())
        .attach(AdHoc::on_liftoff("janitor", move |_rocket| {
            Box::pin(async move {
                janitor::spawn(janitor_registry, janitor_rate_limiter, janitor_config);
            })
        }))
        .register(
            "/",
            rocket::catchers![routes::too_many_requests, routes::not_found],
        )
        .mount(
            "/",
            rocket::routes![
                routes::health,
                routes::create_room,
                routes::join_room,
                routes::delete_room,
                routes::send_message,
                routes::poll_room,
                routes::leave_room,
                push::ws_upgrade,
            ],
        )
}
