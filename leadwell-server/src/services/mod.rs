//! Business services layered over storage and the reasoning client

pub mod call_summary;
pub mod insights;
pub mod intake;
pub mod lead_scorer;
pub mod reasoning_client;

pub use call_summary::{summarize_call, SUMMARY_FALLBACK};
pub use insights::generate_insights;
pub use intake::{process_submission, IntakeOutcome, Qualification};
pub use lead_scorer::score_lead;
pub use reasoning_client::{OpenAiClient, ReasoningClient, ReasoningError};
