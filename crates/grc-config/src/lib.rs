// crates/grc-config/src/lib.rs
// ============================================================================
// Module: GRC Config Library
// Description: Configuration model and validation for the GRC back office.
// Purpose: Single source of truth for grc.toml semantics.
// Dependencies: grc-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `grc-config` defines the configuration model for the GRC server and CLI.
//! Loading is strict: oversized, non-UTF-8, or invalid files fail closed, and
//! secrets may be supplied through environment overrides instead of the file.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
