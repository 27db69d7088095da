//! Google Calendar integration
//!
//! Implements the `CalendarApi` capability over the Google Calendar REST
//! API. Credential acquisition lives behind the `CalendarApiFactory` seam;
//! this module only consumes a ready access token.

pub mod client;
pub mod types;

pub use client::GcalClient;
