//! Application state for axum handlers.

use carol_reservations_core::ReservationService;

/// Application state shared across all HTTP handlers.
///
/// Cloned per request; the service holds its storage behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Reservation service over the selected storage tiers
    pub service: ReservationService,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub const fn new(service: ReservationService) -> Self {
        Self { service }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_is_clone() {
        // Ensure AppState implements Clone (required for axum)
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }
}
