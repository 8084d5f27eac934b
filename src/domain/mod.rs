pub mod advertisement;
pub mod controller;
pub mod display;
pub mod models;
pub mod pixel;
pub mod profile;
pub mod settings;
