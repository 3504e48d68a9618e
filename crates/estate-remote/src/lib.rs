//! # estate-remote: REST Backend for Estate CRM
//!
//! Lets the CRM keep its dataset on a server instead of the local store.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Remote Persistence                               │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                 RemoteStore (remote_store.rs)                    │  │
//! │  │                                                                  │  │
//! │  │  load ─► migrate ─► CrmData ─► estate-core import ─► save        │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │                               ▼                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                   RestClient (client.rs)                         │  │
//! │  │                                                                  │  │
//! │  │  reqwest, one request per call, fixed timeout, no retries        │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │ HTTP / JSON                             │
//! │                               ▼                                         │
//! │                      CRM server  /api/*  /health                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Failure Reporting
//!
//! Failures come back as [`RemoteError`]. A timeout is its own variant so
//! callers can tell "the server is slow" from "the server is unreachable"
//! and decide on retrying with [`RemoteError::is_retryable`].
//!
//! ## Module Organization
//! - [`client`] - Typed REST client
//! - [`remote_store`] - Load / save / import over the client
//! - [`error`] - Remote error types

pub mod client;
pub mod error;
pub mod remote_store;

pub use client::{RemoteConfig, RestClient, DEFAULT_TIMEOUT_SECS};
pub use error::{RemoteError, RemoteResult};
pub use remote_store::RemoteStore;
