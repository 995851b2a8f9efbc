//! # themetune server
//!
//! HTTP control surface over the theme song core: trigger a download pass,
//! read and update the resolution settings, and look up or stream the
//! resolved theme song of a series.

pub mod handlers;
pub mod infra;
pub mod routes;

pub use infra::app_state::AppState;
pub use routes::create_api_router;
