//! Synthetic texture sheets with known unique tiles

pub mod generator;

pub use generator::{generate, Placement, SampleConfig, SampleImage};
