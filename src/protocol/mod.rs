//! Account service wire layer.

pub mod models;
pub mod token;
