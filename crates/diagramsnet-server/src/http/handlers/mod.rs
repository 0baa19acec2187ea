//! HTTP request handlers.

mod convert;
mod health;

pub use convert::{convert_png, convert_svg, unknown_endpoint};
pub use health::health_check;
