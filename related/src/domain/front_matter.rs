/// Front matter metadata attached to every post
use super::value_objects::{PublishDate, RelatedLink};
use serde::{Deserialize, Deserializer, Serialize};

/// YAML front matter of a post.
///
/// Known keys are typed; any other key is kept in `extra` so a save writes
/// it back untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FrontMatter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    date: Option<PublishDate>,

    #[serde(default, deserialize_with = "null_as_false")]
    draft: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    author: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,

    #[serde(default)]
    similar_posts: Vec<String>,

    #[serde(flatten)]
    extra: serde_yaml::Mapping,
}

/// An empty `draft:` key reads as not a draft
fn null_as_false<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

impl FrontMatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_date(mut self, date: PublishDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_draft(mut self, draft: bool) -> Self {
        self.draft = draft;
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn date(&self) -> Option<&PublishDate> {
        self.date.as_ref()
    }

    pub fn is_draft(&self) -> bool {
        self.draft
    }

    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn similar_posts(&self) -> &[String] {
        &self.similar_posts
    }

    /// Replace the related posts list, returning whether it changed
    pub fn set_similar_posts(&mut self, links: &[RelatedLink]) -> bool {
        let updated: Vec<String> = links.iter().map(|l| l.as_str().to_string()).collect();
        if updated == self.similar_posts {
            return false;
        }
        self.similar_posts = updated;
        true
    }

    /// Keys not covered by the typed fields
    pub fn extra(&self) -> &serde_yaml::Mapping {
        &self.extra
    }
}
