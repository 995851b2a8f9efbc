//! HTTP request handlers

pub mod health;
pub mod theme_songs;

pub use health::health_check;
pub use theme_songs::{
    download_tv_shows, get_configuration, get_theme_song, stream_theme_song,
    update_configuration,
};
