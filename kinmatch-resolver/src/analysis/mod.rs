//! Generative-assisted match analysis
//!
//! - **orchestrator**: search planning and match analysis with fallback
//! - **generative**: provider trait and chat-completions client
//! - **response_contract**: structural validation of model output
//! - **prompts**: prompt construction
//! - **placeholder_guard**: test/placeholder data detection

pub mod generative;
pub mod orchestrator;
pub mod placeholder_guard;
pub mod prompts;
pub mod response_contract;

pub use generative::{
    ChatCompletionsProvider, GenerationRequest, GenerativeError, GenerativeProvider, ModelEndpoint,
};
pub use orchestrator::MatchAnalysisOrchestrator;
pub use placeholder_guard::PlaceholderGuard;
