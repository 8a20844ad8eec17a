//! # Tessera - Geospatial API Client
//!
//! Synchronous client library for the Tessera geospatial API: layers of
//! geometric features, filtered queries, asynchronous server-side tasks and
//! bulk data import.
//!
//! ## Features
//!
//! - **Signed requests**: per-request HMAC-SHA256 signatures, or a session
//!   token obtained from a login call
//! - **Bounded retries**: transparent retry with timeout doubling after a
//!   timed-out attempt
//! - **Cursor pagination**: listing calls follow `next_page_uri` to the end
//! - **Task polling**: submit asynchronous tasks and collect per-task
//!   outcomes, tolerating partial failure
//!
//! ## Quick Start
//!
//! ```ignore
//! use tessera::{Client, Config, FilterOp, LayerQuery};
//!
//! let client = Client::new(Config::load()?)?;
//!
//! let query = LayerQuery::new().name(FilterOp::Exact, "waterways");
//! for layer in client.get_layers(&query)? {
//!     println!("{}: {} features", layer.name, layer.num_features);
//! }
//! ```
//!
//! ## Authentication
//!
//! Every request carries `Authorization: GEO <key_id>:<signature>`, where
//! the signature is the base64 HMAC-SHA256 of the verb, body checksum,
//! content type, date and path-plus-query of the request. After
//! [`Client::login`] the signature is replaced by an `X-Session-ID` header
//! holding the session token.

pub mod client;
pub mod config;
pub mod error;
pub mod feature;
pub mod layer;
pub mod query;
pub mod request;
pub mod sign;
pub mod task;

// Re-export main types at crate root for convenience
pub use client::{Client, DeleteStats, ImportOptions};
pub use config::Config;
pub use error::{Result, TesseraError};
pub use feature::Feature;
pub use layer::{FieldDef, Layer, LayerSpec};
pub use query::{FeatureQuery, FilterOp, LayerQuery, Sort, SpatialQuery};
pub use request::{Pages, Transport};
pub use task::{PollPolicy, Task, TaskFilter, TaskOutcome, TaskRecord, TaskResult, TaskState};
