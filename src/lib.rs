//! Backend for the crop climate predictor: pre-trained regression models
//! plus fitted label encoders, served behind a small JSON API.

pub mod config;
pub mod dataset;
pub mod encoder;
pub mod model;
pub mod service;
pub mod types;
