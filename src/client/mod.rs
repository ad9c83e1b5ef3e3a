//! HTTP client for the account service.

pub mod http;
