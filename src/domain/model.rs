use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;

/// One job listing as published by the source page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobPosting {
    pub id: String,
    pub title: String,
    pub link: String,
    pub skills: Vec<String>,
}

/// Skill tags of interest. Matching is exact and case-sensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchList {
    tags: BTreeSet<String>,
}

impl WatchList {
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// True when at least one of `skills` is on the list.
    pub fn matches(&self, skills: &[String]) -> bool {
        skills.iter().any(|skill| self.contains(skill))
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }
}

/// Durable marker that a posting has been accepted once and must not be re-notified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeenRecord {
    pub id: String,
    pub title: String,
    pub link: String,
    pub skills: Vec<String>,
    pub first_seen_at: DateTime<Utc>,
}

impl SeenRecord {
    pub fn from_posting(posting: &JobPosting, first_seen_at: DateTime<Utc>) -> Self {
        Self {
            id: posting.id.clone(),
            title: posting.title.clone(),
            link: posting.link.clone(),
            skills: posting.skills.clone(),
            first_seen_at,
        }
    }
}

/// Per-stage counts for one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    pub scraped: usize,
    pub matched: usize,
    pub new_jobs: usize,
    /// `true` only when a digest was handed to the mail relay successfully.
    pub notified: bool,
}
