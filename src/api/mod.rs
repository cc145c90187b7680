//! API route handlers

pub mod clips;
pub mod health;
pub mod operations;

pub use clips::clip_routes;
pub use health::health_routes;
pub use operations::operation_routes;
