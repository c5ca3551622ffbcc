//! HTTP middleware and extractors.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. CORS
//! 3. `TraceLayer` (request tracing)
//! 4. Request ID (add unique ID to each request)
//! 5. Body limit (image uploads)

pub mod caller;
pub mod request_id;

pub use caller::{CALLER_HEADER, Caller};
pub use request_id::{REQUEST_ID_HEADER, RequestId, request_id_middleware};
