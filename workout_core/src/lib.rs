#![forbid(unsafe_code)]

//! Core domain model and business logic for workout generation.
//!
//! This crate provides:
//! - Domain types (blueprints, slots, exercises, sessions, fragments)
//! - Shadow matrix level resolution
//! - Exercise and blueprint catalogs
//! - Slot filling and fragmentation
//! - The generation pipeline
//! - Profile persistence

pub mod types;
pub mod error;
pub mod matrix;
pub mod catalog;
pub mod blueprint;
pub mod config;
pub mod logging;
pub mod filler;
pub mod fragmenter;
pub mod profile;
pub mod engine;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use matrix::{LevelOverride, LevelTarget, ShadowMatrix, SharedMatrix};
pub use catalog::{get_default_catalog, ExerciseCatalog, ExerciseFilter, InMemoryCatalog};
pub use blueprint::{get_default_library, BlueprintCatalog, BlueprintLibrary};
pub use config::Config;
pub use fragmenter::{analyze, FragmentationReason, FragmentationResult};
pub use profile::{ProfileStore, UserProfile};
pub use engine::{generate, generate_session, Generation, GenerationTracker, RequestToken};
