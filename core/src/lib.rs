//! clv-core: synthetic customer generation, churn/CLV scoring,
//! segmentation, retention strategy selection and executive reporting.

pub mod config;
pub mod customer;
pub mod error;
pub mod event;
pub mod pipeline;
pub mod preflight;
pub mod retention;
pub mod rng;
pub mod scorer;
pub mod segmentation;
pub mod service;
pub mod summary;
pub mod types;
