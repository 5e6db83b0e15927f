#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod analysis;
pub mod app;
pub mod classification;
pub mod clients;
pub mod clustering;
pub mod config;
pub mod dataset;
pub mod language_detection;
pub mod model;
pub mod observability;
pub mod pipeline;
pub(crate) mod schema;
pub mod util;
