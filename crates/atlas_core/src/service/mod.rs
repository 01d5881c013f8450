//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep outer layers (HTTP, CLI) decoupled from storage details.

pub mod catalog_service;
