//! Checkout and program-lifecycle backend for a wellness-retreat booking site.
//!
//! The pricing and subscription rules live in [`services`] as plain
//! functions over in-memory records; [`handlers`] exposes them over HTTP.

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;

use actix_web::web;

/// Mounts every API route under `/api/v1`.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(handlers::checkout::quote_cart)
            .service(handlers::checkout::submit_checkout)
            .service(handlers::programs::record_purchase)
            .service(handlers::programs::list_expired_programs)
            .service(handlers::programs::list_programs)
            .route("/health", web::get().to(handlers::health::health_check)),
    );
}
