//! Client for the factory job-tracking backend.
//!
//! | Module     | Role                                                        |
//! |------------|-------------------------------------------------------------|
//! | `session`  | Bearer token storage and expiry                              |
//! | `client`   | HTTP wrapper: auth header, status mapping, sign-out on 401  |
//! | `services` | Typed endpoint functions for jobs, stations, customers, ... |
//! | `view`     | Persisted factory view, timeline and theme preferences      |
//! | `poll`     | Watch-mode refresh loop                                     |
//! | `logging`  | Tracing setup and remote log shipping                       |
//!
//! Pure domain logic (models, routing, CSV, filters, QR payloads) lives in
//! `floortrack-common` and is re-exported as [`common`].

pub mod app;
pub mod client;
pub mod config;
pub mod errors;
pub mod logging;
pub mod poll;
pub mod prefs;
pub mod services;
pub mod session;
pub mod ui;
pub mod view;

pub use floortrack_common as common;
