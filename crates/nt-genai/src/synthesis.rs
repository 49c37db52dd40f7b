//! Turns a free-form bio and goal into a structured Number Tag suggestion.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::model::ContentModel;
use crate::outcome::{CallOutcome, with_deadline};
use crate::GenAiError;

pub const CATEGORIES: [&str; 6] = [
    "Hiring",
    "Collaboration",
    "Investment",
    "Mentorship",
    "Sales",
    "Social",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesizedTag {
    pub title: String,
    pub intent: String,
    pub public_title_mask: String,
    pub public_intent_mask: String,
    pub category: String,
    pub suggested_color: String,
    pub tags: Vec<String>,
}

impl SynthesizedTag {
    pub fn fallback() -> Self {
        Self {
            title: "New Connect".to_string(),
            intent: "Open to new professional opportunities and networking.".to_string(),
            public_title_mask: "General Networking".to_string(),
            public_intent_mask: "Open to professional dialogue and connection.".to_string(),
            category: "Collaboration".to_string(),
            suggested_color: "indigo-600".to_string(),
            tags: vec!["Networking".to_string(), "Innovation".to_string()],
        }
    }
}

fn prompt(bio: &str, goal: &str) -> String {
    format!(
        "Generate a 'Number Tag' profile based on this user description: \"{bio}\" and goal: \"{goal}\".\n\n\
         A Number Tag is a concise representation of intent.\n\n\
         If the goal or description contains sensitive, discreet, or private personal intents \
         (e.g. dating, job hunting while employed, or highly specific niche interests), generate a \
         \"Public Mask\": a neutral, professional-sounding alternative that lets the user remain \
         discreet in a public directory (e.g. 'Social Connection', 'Strategic Networking', \
         'Consulting Discovery').\n\n\
         Return the result as structured JSON."
    )
}

pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "title": {
                "type": "STRING",
                "description": "The true title, e.g. 'SaaS Growth'"
            },
            "intent": {
                "type": "STRING",
                "description": "The true intent: what they actually want."
            },
            "publicTitleMask": {
                "type": "STRING",
                "description": "A neutral, professional-sounding mask for the title."
            },
            "publicIntentMask": {
                "type": "STRING",
                "description": "A neutral, professional-sounding mask for the intent statement."
            },
            "category": {
                "type": "STRING",
                "description": format!("One of: {}", CATEGORIES.join(", "))
            },
            "suggestedColor": {
                "type": "STRING",
                "description":
                    "A Tailwind color class (e.g. 'indigo-600', 'emerald-500', 'rose-500')"
            },
            "tags": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "3-4 keywords including true intent keywords for matching"
            }
        },
        "required": [
            "title",
            "intent",
            "publicTitleMask",
            "publicIntentMask",
            "category",
            "suggestedColor",
            "tags"
        ]
    })
}

/// Decode the model's JSON reply. Every string field must be non-empty and
/// the category is snapped to the closed set (case-insensitive).
pub fn parse(raw: &str) -> Result<SynthesizedTag, GenAiError> {
    let mut tag: SynthesizedTag = serde_json::from_str(raw)?;

    let fields = [
        ("title", &tag.title),
        ("intent", &tag.intent),
        ("publicTitleMask", &tag.public_title_mask),
        ("publicIntentMask", &tag.public_intent_mask),
        ("suggestedColor", &tag.suggested_color),
    ];
    if let Some((name, _)) = fields.iter().find(|(_, v)| v.trim().is_empty()) {
        return Err(GenAiError::InvalidOutput(format!("empty field `{name}`")));
    }

    tag.category = CATEGORIES
        .iter()
        .find(|c| c.eq_ignore_ascii_case(tag.category.trim()))
        .map(|c| c.to_string())
        .ok_or_else(|| GenAiError::InvalidOutput(format!("unknown category `{}`", tag.category)))?;
    tag.tags.retain(|t| !t.trim().is_empty());

    Ok(tag)
}

/// One bounded attempt at a tag suggestion. Blank input fails before any call.
pub async fn synthesize_tag(
    model: &dyn ContentModel,
    bio: &str,
    goal: &str,
    deadline: Duration,
) -> CallOutcome<SynthesizedTag> {
    if bio.trim().is_empty() && goal.trim().is_empty() {
        return CallOutcome::Failed(
            GenAiError::InvalidInput("a bio or goal is required".to_string()).to_string(),
        );
    }

    let prompt = prompt(bio.trim(), goal.trim());
    let schema = response_schema();
    with_deadline("tag synthesis", deadline, async {
        let raw = model.structured(&prompt, &schema).await?;
        parse(&raw)
    })
    .await
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::GroundedAnswer;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays a fixed reply after an optional delay and counts calls.
    pub(crate) struct Scripted {
        pub reply: Result<String, String>,
        pub grounded: GroundedAnswer,
        pub delay: Duration,
        pub calls: AtomicUsize,
    }

    impl Scripted {
        pub fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                grounded: GroundedAnswer::default(),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ContentModel for Scripted {
        async fn structured(&self, _prompt: &str, _schema: &Value) -> Result<String, GenAiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.reply.clone().map_err(GenAiError::InvalidOutput)
        }

        async fn grounded_search(&self, _prompt: &str) -> Result<GroundedAnswer, GenAiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            match &self.reply {
                Ok(_) => Ok(self.grounded.clone()),
                Err(e) => Err(GenAiError::InvalidOutput(e.clone())),
            }
        }
    }

    const REPLY: &str = r#"{
        "title": "Discreet Job Search",
        "intent": "Looking for a senior backend role while employed.",
        "publicTitleMask": "Strategic Networking",
        "publicIntentMask": "Open to conversations with engineering leaders.",
        "category": "hiring",
        "suggestedColor": "emerald-500",
        "tags": ["Rust", "Backend", " "]
    }"#;

    #[test]
    fn fallback_is_fully_populated() {
        let tag = SynthesizedTag::fallback();
        assert_eq!(tag.title, "New Connect");
        assert_eq!(tag.category, "Collaboration");
        assert_eq!(tag.suggested_color, "indigo-600");
        for field in [
            &tag.title,
            &tag.intent,
            &tag.public_title_mask,
            &tag.public_intent_mask,
            &tag.category,
            &tag.suggested_color,
        ] {
            assert!(!field.is_empty());
        }
        assert_eq!(tag.tags, vec!["Networking", "Innovation"]);

        let json = serde_json::to_value(&tag).unwrap();
        assert_eq!(json["publicTitleMask"], "General Networking");
    }

    #[test]
    fn parse_normalizes_category() {
        let tag = parse(REPLY).unwrap();
        assert_eq!(tag.category, "Hiring");
        assert_eq!(tag.tags, vec!["Rust", "Backend"]);
    }

    #[test]
    fn parse_rejects_incomplete_replies() {
        assert!(matches!(parse(r#"{"title": "x"}"#), Err(GenAiError::Decode(_))));

        let blank = REPLY.replace("Strategic Networking", " ");
        assert!(matches!(parse(&blank), Err(GenAiError::InvalidOutput(_))));

        let odd = REPLY.replace("\"hiring\"", "\"Dating\"");
        assert!(matches!(parse(&odd), Err(GenAiError::InvalidOutput(_))));
    }

    #[tokio::test]
    async fn live_reply_is_ok() {
        let model = Scripted::replying(REPLY);
        let outcome =
            synthesize_tag(&model, "Backend engineer", "new role", Duration::from_secs(5)).await;
        assert_eq!(outcome.ok().map(|t| t.title), Some("Discreet Job Search".to_string()));
    }

    #[tokio::test]
    async fn blank_input_never_calls_the_model() {
        let model = Scripted::replying(REPLY);
        let outcome = synthesize_tag(&model, "  ", "", Duration::from_secs(5)).await;
        assert!(matches!(outcome, CallOutcome::Failed(_)));
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_model_times_out_once() {
        let mut model = Scripted::replying(REPLY);
        model.delay = Duration::from_secs(30);
        let outcome = synthesize_tag(&model, "bio", "goal", Duration::from_secs(20)).await;
        assert_eq!(outcome, CallOutcome::TimedOut);
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn garbage_reply_is_failed() {
        let model = Scripted::replying("not json");
        let outcome = synthesize_tag(&model, "bio", "goal", Duration::from_secs(5)).await;
        assert!(matches!(outcome, CallOutcome::Failed(_)));
    }
}
