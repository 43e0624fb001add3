//! camptrack - camp management backend
//!
//! Campers, volunteers and diabetes-care data served over GraphQL, with a
//! snapshot cache (Redis or in-process) kept in step with the database by
//! MD5 checksum reconciliation.
//!
//! # Features
//! - **server**: HTTP server mode (default)
//! - **cli**: Maintenance commands (cache sync, import/export, obfuscation)
//!
//! # Architecture
//! - `storage`: SeaORM persistence, comma-joined assignment lists, bulk plans
//! - `services`: business logic, bulk reconciliation, cache sync
//! - `cache`: snapshot cache backends and checksums
//! - `api`: GraphQL schema, HTTP handlers and middleware
//! - `interfaces`: CLI commands
//! - `config`: Configuration management
//! - `runtime`: Application lifecycle and execution modes
//! - `system`: Logging

pub mod api;
pub mod cache;
pub mod cli;
pub mod config;
pub mod errors;
pub mod interfaces;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
