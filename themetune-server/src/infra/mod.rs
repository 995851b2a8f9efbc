pub mod app_state;
pub mod catalog;
pub mod download_jobs;
pub mod errors;
