//! The flow-controller contract: actions, outcomes, and the bridge.

pub mod action;
pub mod bridge;
pub mod callback;
