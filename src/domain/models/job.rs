use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::domain::errors::DispatchError;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmbedFooter {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmbedAuthor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmbedImage {
    pub url: String,
}

/// Rich-content block, shaped like the provider's embed object.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Embed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<EmbedImage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<EmbedImage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<EmbedAuthor>,
    /// Keys not modelled above (video, provider, ...), kept so a copied
    /// embed goes out as it came in.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Embed {
    /// Every text fragment an emoji could hide in.
    pub fn texts(&self) -> Vec<&str> {
        let mut texts = Vec::new();
        texts.extend(self.title.as_deref());
        texts.extend(self.description.as_deref());
        texts.extend(self.author.as_ref().map(|a| a.name.as_str()));
        texts.extend(self.footer.as_ref().map(|f| f.text.as_str()));
        for field in &self.fields {
            texts.push(field.name.as_str());
            texts.push(field.value.as_str());
        }
        texts
    }
}

/// Parses a hex color such as `ff8800` or `#FF8800`; anything else falls
/// back to the default (0).
pub fn parse_color(raw: &str) -> u32 {
    let trimmed = raw.trim().trim_start_matches('#').trim_start_matches("0x");
    u32::from_str_radix(trimmed, 16)
        .ok()
        .filter(|value| *value <= 0xFF_FF_FF)
        .unwrap_or(0)
}

/// The payload of one run. Immutable once authorized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchJob {
    pub run_id: Uuid,
    pub content: Option<String>,
    pub embed: Option<Embed>,
}

impl DispatchJob {
    pub fn new(content: Option<String>, embed: Option<Embed>) -> Result<Self, DispatchError> {
        let content = content.filter(|c| !c.trim().is_empty());
        if content.is_none() && embed.is_none() {
            return Err(DispatchError::InvocationMalformed(
                "Message has no content or embed to send.".to_string(),
            ));
        }
        Ok(Self {
            run_id: Uuid::new_v4(),
            content,
            embed,
        })
    }

    /// Independent send calls this job issues per recipient, in order.
    pub fn parts(&self) -> Vec<JobPart<'_>> {
        let mut parts = Vec::with_capacity(2);
        if let Some(content) = &self.content {
            parts.push(JobPart::Content(content));
        }
        if let Some(embed) = &self.embed {
            parts.push(JobPart::Embed(embed));
        }
        parts
    }
}

#[derive(Debug, Clone, Copy)]
pub enum JobPart<'a> {
    Content(&'a str),
    Embed(&'a Embed),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_job_is_rejected() {
        let err = DispatchJob::new(Some("   ".to_string()), None).unwrap_err();
        assert!(matches!(err, DispatchError::InvocationMalformed(_)));
    }

    #[test]
    fn parts_keep_content_before_embed() {
        let job = DispatchJob::new(Some("hi".to_string()), Some(Embed::default())).unwrap();
        let parts = job.parts();
        assert_eq!(parts.len(), 2);
        assert!(matches!(parts[0], JobPart::Content("hi")));
        assert!(matches!(parts[1], JobPart::Embed(_)));
    }

    #[test]
    fn color_parsing_falls_back_to_default() {
        assert_eq!(parse_color("ff8800"), 0xff8800);
        assert_eq!(parse_color("#00FF00"), 0x00ff00);
        assert_eq!(parse_color("orange"), 0);
        assert_eq!(parse_color("1ffffff"), 0);
    }

    #[test]
    fn embed_serializes_like_provider() {
        let embed = Embed {
            title: Some("t".to_string()),
            footer: Some(EmbedFooter {
                text: "f".to_string(),
                icon_url: None,
            }),
            ..Default::default()
        };
        let json = serde_json::to_value(&embed).unwrap();
        assert_eq!(json, serde_json::json!({"title": "t", "footer": {"text": "f"}}));
    }

    #[test]
    fn copied_embed_keeps_every_key() {
        let source = serde_json::json!({
            "type": "rich",
            "title": "Patch 2.1",
            "url": "https://example.com/notes",
            "timestamp": "2026-10-19T18:00:00+00:00",
            "author": {"name": "Dev team", "icon_url": "https://example.com/a.png"},
            "thumbnail": {"url": "https://example.com/t.png"},
            "footer": {"text": "See you", "icon_url": "https://example.com/f.png"},
            "video": {"url": "https://example.com/v.mp4"}
        });

        let embed: Embed = serde_json::from_value(source.clone()).unwrap();

        assert_eq!(embed.author.as_ref().map(|a| a.name.as_str()), Some("Dev team"));
        assert!(embed.texts().contains(&"Dev team"));
        assert_eq!(serde_json::to_value(&embed).unwrap(), source);
    }
}
