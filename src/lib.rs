#[macro_use]
extern crate rocket;

pub mod api;
pub mod cache;
pub mod config;
pub mod images;
pub mod storage;
pub mod validation;

use rocket::figment::Figment;
use rocket::{Build, Rocket};

use config::AppConfig;
use images::PreviewService;

/// Assembles the HTTP server around an already warmed service.
pub fn server(figment: Figment, config: AppConfig, service: PreviewService) -> Rocket<Build> {
    rocket::custom(figment)
        .manage(service)
        .manage(config)
        .mount("/", routes![api::preview::fill])
}
