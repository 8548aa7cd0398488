//! Core client engine for the parts-client system.
//!
//! This module provides the main orchestration logic for the order
//! lifecycle client: the in-memory order cache with optimistic mutation,
//! the handlers that drive quote submission, status transitions, and
//! wallet operations against the backend, and the reconciliation path that
//! turns real-time notifications into coalesced, server-authoritative
//! refetches. Views consume all of it through read snapshots and the
//! event bus; nothing here renders anything.

/// In-memory order cache with per-projection snapshots.
pub mod cache;
/// Engine struct, builder, and run loop.
pub mod engine;
/// Event bus for view-layer consumers.
pub mod event_bus;
/// Handlers for orders, quotes, status transitions, and wallet.
pub mod handlers;
/// Notification classification and debounced refetch dispatch.
pub mod reconcile;
/// View-session tokens guarding against stale fetch application.
pub mod session;

pub use cache::OrderCache;
pub use engine::{ClientBuilder, ClientEngine, EngineError};
pub use event_bus::EventBus;
pub use handlers::HandlerError;
pub use session::{SessionToken, ViewSession};
