//! Search-augmented lookup for leads outside the protocol.

use std::time::Duration;

use serde::Serialize;

use crate::GenAiError;
use crate::model::{ContentModel, GroundingChunk};
use crate::outcome::{CallOutcome, with_deadline};

const DEFAULT_LINK_TITLE: &str = "External Signal";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoutLink {
    pub uri: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoutReport {
    pub text: String,
    pub links: Vec<ScoutLink>,
}

impl ScoutReport {
    pub fn fallback() -> Self {
        Self {
            text: "Unable to reach global search layer at this moment.".to_string(),
            links: Vec::new(),
        }
    }
}

fn prompt(query: &str) -> String {
    format!(
        "Search for professional signals, industry leads, or active networking nodes related to \
         this query: \"{query}\".\n\
         Identify specific entities, companies, or professional groups that align with the intent \
         of Number Tag (networking/advertising).\n\
         Provide a concise summary of your findings."
    )
}

/// Web chunks only, one entry per URI. A URI keeps the position it was first
/// seen at and the title it was last seen with.
pub fn dedupe_links(chunks: Vec<GroundingChunk>) -> Vec<ScoutLink> {
    let mut links: Vec<ScoutLink> = Vec::new();
    for chunk in chunks {
        let Some(uri) = chunk.uri.filter(|u| !u.is_empty()) else {
            continue;
        };
        let title = chunk
            .title
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_LINK_TITLE.to_string());

        match links.iter_mut().find(|l| l.uri == uri) {
            Some(existing) => existing.title = title,
            None => links.push(ScoutLink { uri, title }),
        }
    }
    links
}

pub async fn scout(
    model: &dyn ContentModel,
    query: &str,
    deadline: Duration,
) -> CallOutcome<ScoutReport> {
    if query.trim().is_empty() {
        return CallOutcome::Failed(
            GenAiError::InvalidInput("a search query is required".to_string()).to_string(),
        );
    }

    let prompt = prompt(query.trim());
    with_deadline("scout", deadline, async {
        let answer = model.grounded_search(&prompt).await?;
        let text = answer
            .text
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| GenAiError::InvalidOutput("search returned no summary".to_string()))?;
        Ok(ScoutReport {
            text,
            links: dedupe_links(answer.chunks),
        })
    })
    .await
}
