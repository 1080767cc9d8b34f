//! GIoT query front end library.
//!
//! Loads a coverage description and a sensor fixture, and answers JSON data
//! requests with the query engine.

pub mod state;

pub use state::AppState;
