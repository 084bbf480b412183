//! Shared request and response types for the arm IK service.
//!
//! These are the wire shapes exchanged with clients: a single JSON request
//! naming a target (and optionally an origin and sampling) and either a
//! trajectory response or an `{error, details}` record.
//!
//! # Usage
//!
//! ```rust
//! use ik_common::{IkRequest, ErrorResponse};
//!
//! let request = IkRequest::from_json(r#"{"target": [5, 8, 0]}"#).unwrap();
//! assert!(request.origin.is_none());
//!
//! let err = IkRequest::from_json(r#"{"target": "bad"}"#).unwrap_err();
//! assert_eq!(ErrorResponse::from(&err).error, "Invalid target");
//! ```

mod requests;
mod responses;

pub use requests::*;
pub use responses::*;
