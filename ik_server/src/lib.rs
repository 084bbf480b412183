//! Arm IK service: request planning, response assembly and process framing.

pub mod assembler;
pub mod planner;
pub mod server;

pub use planner::{Capabilities, Planner};
