//! Wrappers around the external generative-content service.
//!
//! Every call is a single attempt bounded by a deadline and reported as a
//! [`CallOutcome`]. Substituting a fallback is the caller's decision.

pub mod error;
pub mod gemini;
pub mod model;
pub mod outcome;
pub mod scout;
pub mod synthesis;

pub use error::GenAiError;
pub use gemini::GeminiClient;
pub use model::ContentModel;
pub use outcome::CallOutcome;
