//! Assignment of students to projects under capacity, preference and skill
//! constraints, optimized over a prioritized list of objectives in a
//! separate, interruptible worker process.

pub mod builder;
pub mod checks;
pub mod config;
pub mod display;
pub mod engine;
pub mod generator;
pub mod harness;
pub mod loaders;
pub mod model;
pub mod remap;
pub mod stats;
