//! HTTP surface for carol reservations.
//!
//! Thin axum handlers in front of [`ReservationService`]. Handlers parse the
//! request, call the service, and map domain errors to HTTP through
//! [`AppError`]; every business rule lives in the core crate.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │         Imperative Shell (axum)         │  ← HTTP, JSON, query strings
//! │  - Request parsing                      │  ← Tracing, request ids
//! │  - Response serialization               │
//! ├─────────────────────────────────────────┤
//! │         ReservationService              │
//! │  - Validation, claims, submissions      │  ← Testable in memory
//! │  - TieredStorage                        │  ← PostgreSQL / JSON files
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use carol_reservations_core::AppConfig;
//! use carol_reservations_web::{bootstrap, build_router, AppState};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = AppConfig::from_env();
//! let service = bootstrap::reservation_service(&config.storage).await?;
//! let app = build_router(AppState::new(service));
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! [`ReservationService`]: carol_reservations_core::ReservationService

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod bootstrap;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

// Re-export key types for convenience
pub use error::AppError;
pub use router::build_router;
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
