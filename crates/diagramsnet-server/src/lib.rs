//! diagramsnet service library
//!
//! Exposes the render worker over HTTP and wires its configuration from the
//! command line and the environment.

pub mod config;
pub mod http;
pub mod state;

pub use config::WorkerArgs;
pub use http::create_router;
pub use state::AppState;
