//! HTTP middleware stack.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors, binary only)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Session layer (tower-sessions; `PostgreSQL` store in production)
//!
//! Auth is enforced per handler through the [`RequireAuth`] extractor
//! rather than as a layer.

pub mod auth;
pub mod flash;
pub mod request_id;
pub mod session;

pub use auth::{RequireAuth, clear_current_user, set_current_user};
pub use flash::{push_flash, take_flashes};
pub use request_id::{RequestId, request_id_middleware};
pub use session::{create_session_layer, session_layer};
