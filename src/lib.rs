//! SynthMed synthetic dataset generator
//!
//! Turns structured chest X-ray parameters into a text-to-image prompt,
//! relays it to a remote generation worker and returns the worker's zipped
//! dataset. A separate background task path runs the model directly through
//! a worker pool.

pub mod app_state;
pub mod config;
pub mod models;
pub mod routes;
pub mod services;
pub mod telemetry;
pub mod worker;
