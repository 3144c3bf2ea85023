//! Core types, rules, and services for the placement portal.
//!
//! This crate is free of HTTP and database dependencies. Storage backends
//! implement [`store::PortalStore`]; transports drive [`service::Portal`].

pub mod application;
pub mod credentials;
pub mod eligibility;
pub mod error;
pub mod job;
pub mod page;
pub mod profile;
pub mod service;
pub mod stats;
pub mod store;
pub mod user;
pub mod validate;

pub use error::{Error, ErrorKind, Result};
pub use service::Portal;
pub use user::{Actor, Role};
