//! Typed operations against the tracking backend.
//!
//! | Module      | Endpoints                                          |
//! |-------------|----------------------------------------------------|
//! | `jobs`      | `/jobs/`, move, status, location history           |
//! | `stations`  | `/assets/`, current jobs, canvas position          |
//! | `customers` | `/customers/`                                      |
//! | `users`     | `/users/`, `/users/register`, `/users/me`          |
//! | `logs`      | `/logs/frontend`, `/logs/scanner`                  |
//!
//! All functions take the [`ApiClient`](crate::client::ApiClient) explicitly
//! and return [`ApiError`](crate::errors::ApiError) unchanged; deciding
//! what to show on failure is the caller's job.

pub mod customers;
pub mod jobs;
pub mod logs;
pub mod stations;
pub mod users;
