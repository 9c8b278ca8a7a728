// SPDX-License-Identifier: PMPL-1.0-or-later

//! SmartFactory: application services for request-driven back ends.
//!
//! The crate bundles the cross-cutting services a web application needs on
//! every request, each usable on its own or wired together through
//! [`factory::SmartFactory`].
//!
//! SERVICES:
//! 1. **Events**: named events with handler registration, suspension and
//!    synchronous dispatch.
//! 2. **Error handler**: formats error reports with call stacks into a
//!    trace file and publishes them as events.
//! 3. **Profiler**: debug log entries and wall-clock profile points.
//! 4. **Messages**: per-request user messages (errors, warnings, infos,
//!    bubbles) plus focus and tab hints, drained into the response.
//! 5. **Languages**: JSON dictionaries, language detection and
//!    language/country lookups with fallback.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod error_handler;
pub mod events;
pub mod factory;
pub mod i18n;
mod logfile;
pub mod messages;
pub mod profiler;
pub mod request;
pub mod trace;

pub use error::{Error, Result};
