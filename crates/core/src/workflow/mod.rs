pub mod authorize;
pub mod engine;
pub mod lifecycle;
pub mod payload;
pub mod stages;
pub mod validate;
