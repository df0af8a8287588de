// Route exports
pub mod matches;

use actix_web::web;

pub const API_PREFIX: &str = "/api/v1";

/// Mount the matching API under [`API_PREFIX`]
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope(API_PREFIX).configure(matches::configure));
}
