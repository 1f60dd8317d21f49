//! Shared building blocks used across the type modules

pub mod errors;
