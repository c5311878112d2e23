// src/config/mod.rs
pub mod intel;

pub use intel::IntelConfig;
