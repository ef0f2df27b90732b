//! Vidlearn - a video learning platform
//!
//! Teachers publish YouTube videos under topics and group them into
//! playlists; readers browse them and star the ones they like. The crate
//! serves a server-rendered site and a JSON API from the same process.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod views;
pub mod web;
