//! HTTP middleware stack.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Security headers (CSP, frame options, etc.)
//! 5. CSP nonce (generate per-request nonce for inline scripts)
//! 6. Session layer (tower-sessions with `PostgreSQL` store)
//! 7. Rate limiting on auth, OTP, and API routes (governor)

pub mod auth;
pub mod csp;
pub mod flash;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{
    AuthRejection, ImpersonationError, OptionalAuth, RequireAdmin, RequireAuth, RequireSeller,
    clear_current_user, impersonate, impersonator_of, set_current_user, start_impersonation,
};
pub use csp::{CspNonce, csp_nonce_middleware};
pub use flash::{Flash, FlashKind, TakeFlash, flash_error, flash_success};
pub use rate_limit::{api_rate_limiter, auth_rate_limiter};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::{create_session_layer, session_store};
