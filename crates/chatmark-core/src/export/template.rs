//! Placeholder substitution for metadata fields and page templates

use crate::config::TimestampSettings;
use crate::conversation::Conversation;
use crate::error::{ChatmarkError, Result};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static FIELD_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{(\w+)\}").expect("field placeholder pattern is valid"));
static PAGE_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{(\w+)\}\}").expect("page placeholder pattern is valid"));

/// Display name for a model slug, falling back to the slug
pub fn model_name(slug: &str) -> &str {
    match slug {
        "text-davinci-002-render-sha" | "text-davinci-002-render-paid"
        | "text-davinci-002-browse" => "GPT-3.5",
        "gpt-4" => "GPT-4",
        "gpt-4-browsing" => "GPT-4 (Browser)",
        "gpt-4-plugins" => "GPT-4 (Plugins)",
        "gpt-4-code-interpreter" => "GPT-4 (Code Interpreter)",
        "gpt-4o" => "GPT-4o",
        "gpt-4o-mini" => "GPT-4o mini",
        "o1" => "o1",
        "o1-mini" => "o1-mini",
        "o1-preview" => "o1-preview",
        other => other,
    }
}

/// Values available to `{key}` placeholders of one conversation
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateValues {
    pairs: Vec<(&'static str, String)>,
}

impl TemplateValues {
    pub fn for_conversation(
        conversation: &Conversation,
        timestamps: &TimestampSettings,
        exported_at: DateTime<Utc>,
    ) -> Self {
        let pattern = timestamps.pattern();
        let stamp = |time: Option<DateTime<Utc>>| {
            time.map(|t| t.format(pattern).to_string())
                .unwrap_or_default()
        };
        let slug = conversation.model_slug.clone().unwrap_or_default();

        Self {
            pairs: vec![
                ("title", conversation.title.clone()),
                ("date", exported_at.format("%Y-%m-%d").to_string()),
                ("timestamp", exported_at.format(pattern).to_string()),
                ("source", conversation.source_url()),
                ("model_name", model_name(&slug).to_string()),
                ("model", slug),
                ("create_time", stamp(conversation.created_at())),
                ("update_time", stamp(conversation.updated_at())),
            ],
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, value)| value.as_str())
    }

    /// Replace known `{key}` placeholders; unknown ones stay verbatim
    pub fn apply(&self, template: &str) -> String {
        FIELD_PLACEHOLDER
            .replace_all(template, |caps: &Captures| {
                self.get(&caps[1])
                    .map(str::to_string)
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}

/// Fill `{{key}}` slots of a page template in a single pass
pub fn fill_page(template: &str, slots: &[(&str, &str)]) -> Result<String> {
    let mut missing = None;
    let page = PAGE_PLACEHOLDER.replace_all(template, |caps: &Captures| {
        match slots.iter().find(|(name, _)| *name == &caps[1]) {
            Some((_, value)) => value.to_string(),
            None => {
                missing.get_or_insert_with(|| caps[1].to_string());
                String::new()
            }
        }
    });
    match missing {
        Some(name) => Err(ChatmarkError::Template(format!(
            "No value for page slot '{}'",
            name
        ))),
        None => Ok(page.into_owned()),
    }
}
