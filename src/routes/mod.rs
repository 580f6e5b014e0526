//! Router Module Index
//!
//! Splits the portal's routes by the session they need. The split mirrors
//! the route guard's classification: everything under `protected` sits on a
//! protected path.

/// Pages and actions reachable without a session.
pub mod public;

/// Pages and actions that require a live session.
pub mod protected;
