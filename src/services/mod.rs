//! Service layer for business logic
//!
//! Shared by the GraphQL resolvers and the CLI commands.

mod bulk_sync;
mod camp_service;
pub mod cache_sync;
pub mod obfuscate;
pub mod reconcile;
pub mod transfer;
pub mod validation;

pub use bulk_sync::{SyncTarget, run_bulk_sync};
pub use cache_sync::{CacheSyncService, CacheSyncStatus, CollectionSyncReport, SyncTrigger};
pub use camp_service::CampService;
pub use obfuscate::{ObfuscationReport, obfuscate_address, obfuscate_campers, obfuscate_phone};
pub use reconcile::{Keyed, Reconcilable, SyncPlan, SyncReport, plan_sync};
pub use transfer::{CampSnapshot, ImportMode, ImportReport};
