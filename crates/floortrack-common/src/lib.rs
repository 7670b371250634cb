//! Domain types and pure view logic shared by the floortrack client.
//!
//! Nothing in this crate performs I/O. The root `floortrack` crate owns the
//! HTTP client, the session and the persisted preferences; this crate holds
//! what can be computed from already-fetched data:
//!
//! | Module      | Contents                                              |
//! |-------------|-------------------------------------------------------|
//! | `models`    | Wire types for jobs, stations, customers and users    |
//! | `timestamp` | Lenient backend timestamp parsing and display         |
//! | `export`    | CSV export of jobs with their location history        |
//! | `routing`   | Factory floor path routing and default grid layout    |
//! | `filter`    | Search and status filters used by the list views      |
//! | `qr`        | Scanner QR payload contract                           |

pub mod export;
pub mod filter;
pub mod models;
pub mod qr;
pub mod routing;
pub mod timestamp;

pub use models::{
    Credentials, Customer, CustomerDraft, Job, JobLocation, JobStatus, NewJob, NewStation,
    Position, Station, User, UserDraft, current_location,
};
