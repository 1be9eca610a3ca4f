//! API endpoint handlers.
//!
//! One module per resource family, matching the route prefixes:
//! `/users`, `/patients` (registry + history + symptoms), `/analytics`.

pub mod analytics;
pub mod history;
pub mod patients;
pub mod users;
