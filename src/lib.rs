//! # primesum — Client for the Prime-Sum Search Service
//!
//! Drives three read-only searches against a remote collaborator and keeps
//! each one single-flight: a new submission on a surface cancels the call
//! still in flight there, and a completion that is no longer current is
//! dropped without a trace.
//!
//! ```text
//!   form ──> validate ──> request ──> transport ──> normalize ──> projection
//!            (typed)      (query)     (deadline,    (result       (terminal,
//!                                      cancel)       items)        tests)
//!                    \________________ orchestrator ________________/
//! ```
//!
//! ## Module Structure
//!
//! - [`validate`]: raw form fields to typed parameters
//! - [`request`]: operations and canonical query strings
//! - [`transport`]: HTTP backend, deadline and cancellation, reply classification
//! - [`normalize`]: success payloads to [`SearchResults`]
//! - [`outcome`]: settled outcomes and result items
//! - [`orchestrator`]: per-surface state machines, tabs, commands
//! - [`projection`]: what the UI is told, and user-facing error phrasing
//! - [`render`]: terminal projection and CSV export
//! - [`config`]: endpoint and deadline resolution

pub mod config;
pub mod normalize;
pub mod orchestrator;
pub mod outcome;
pub mod projection;
pub mod render;
pub mod request;
pub mod transport;
pub mod validate;

pub use config::{ClientConfig, Environment};
pub use orchestrator::{Command, Orchestrator, RequestId, Submission, SurfaceStatus};
pub use outcome::{PrefixOption, ResultItem, SearchOutcome, SearchResults};
pub use projection::{ErrorNotice, NoticeKind, Projection, SurfaceKind, Tab};
pub use request::{Operation, Query, SearchRequest};
pub use transport::{Backend, HttpBackend, Reply, Transport, TransportError, TransportErrorKind};
pub use validate::{PhoneForm, SearchForm, SequenceForm, ValidationError};
