//! Session middleware and request extractors.
//!
//! - [`session::session_layer`] -- Resumes or creates the session and sets the cookie.
//! - [`session::CurrentSession`] -- The session id the layer attached to the request.
//! - [`auth::AuthUser`] -- Requires a verified access token on the session.

pub mod auth;
pub mod session;
