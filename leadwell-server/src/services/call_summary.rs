//! AI-written call summaries

use leadwell_common::models::{Call, CallPatch, Lead};
use leadwell_common::{Error, Result};

use super::reasoning_client::ReasoningClient;
use crate::storage::Storage;

/// Stored when the model cannot produce a summary
pub const SUMMARY_FALLBACK: &str =
    "Call summary generation failed. Please create a manual summary.";

/// Summarize a call and store the text in `aiSummary`
///
/// Returns `Ok(None)` for an unknown call. Model failures store
/// [`SUMMARY_FALLBACK`] instead of failing.
pub async fn summarize_call(
    storage: &dyn Storage,
    client: &dyn ReasoningClient,
    call_id: i64,
) -> Result<Option<Call>> {
    let Some(call) = storage.get_call(call_id).await? else {
        return Ok(None);
    };
    let lead = storage
        .get_lead(call.lead_id)
        .await?
        .ok_or_else(|| Error::Internal(format!("Call {} references missing lead {}", call.id, call.lead_id)))?;

    let summary = match client.complete_text(&summary_prompt(&call, &lead)).await {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(call_id, error = %e, "Call summary generation failed");
            SUMMARY_FALLBACK.to_string()
        }
    };

    let patch = CallPatch {
        ai_summary: Some(summary),
        ..Default::default()
    };
    storage.update_call(call_id, patch).await
}

fn summary_prompt(call: &Call, lead: &Lead) -> String {
    format!(
        "You are an AI assistant for a construction company. Create a summary of this call:\n\n\
         Call Details:\n\
         - Title: {}\n\
         - Notes: {}\n\
         - Duration: {} minutes\n\
         - Lead: {} from {}\n\
         - Project Type: {}\n\n\
         Create a professional, concise summary of this call that:\n\
         1. Highlights the key points discussed\n\
         2. Notes any action items or follow-ups\n\
         3. Provides a brief assessment of the lead's potential\n\n\
         Write this in a professional, constructive tone.\n\
         Limit the summary to 3-4 sentences.",
        call.title,
        call.notes.as_deref().unwrap_or("No notes available"),
        call.duration,
        lead.name,
        lead.company.as_deref().unwrap_or("Unknown company"),
        lead.project_type,
    )
}
