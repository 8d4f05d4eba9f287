mod app;

pub mod api;
pub mod core;
pub mod domain;
pub mod utils;
