use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::segment::normalize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContent {
    pub index: usize,
    pub raw_text: String,
    pub normalized_text: String,
}

impl PageContent {
    pub fn new(index: usize, raw_text: String) -> Self {
        let normalized_text = normalize(&raw_text);
        Self {
            index,
            raw_text,
            normalized_text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleSpec {
    pub title: String,
    pub author: Option<String>,
    pub order: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub article: ArticleSpec,
    pub start_page: usize,
}

/// Inclusive, 1-based page range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRange {
    pub start_page: usize,
    pub end_page: usize,
}

impl PageRange {
    pub fn new(start_page: usize, end_page: usize) -> Self {
        Self {
            start_page,
            end_page,
        }
    }

    pub fn page_count(&self) -> usize {
        self.end_page + 1 - self.start_page
    }

    pub fn overlaps(&self, other: &PageRange) -> bool {
        self.start_page <= other.end_page && other.start_page <= self.end_page
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start_page, self.end_page)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupSnapshot {
    pub source_file_name: String,
    pub timestamp: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub total_capacity: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self { total_capacity: 20 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleEntry {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticlesConfig {
    #[serde(default)]
    pub articles: Vec<ArticleEntry>,
}

impl ArticlesConfig {
    pub fn into_specs(self) -> Vec<ArticleSpec> {
        self.articles
            .into_iter()
            .enumerate()
            .map(|(order, entry)| ArticleSpec {
                title: entry.title,
                author: entry.author.filter(|author| !author.trim().is_empty()),
                order,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractedArticle {
    pub title: String,
    pub author: Option<String>,
    pub start_page: usize,
    pub end_page: usize,
    pub output_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedArticle {
    pub title: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub generated_at: String,
    pub source_path: String,
    pub source_sha256: String,
    pub total_pages: usize,
    pub detected_prefix: String,
    pub threshold: f64,
    pub match_policy: String,
    pub boundary_mode: String,
    pub ends_with: Option<String>,
    pub articles: Vec<ExtractedArticle>,
    pub skipped: Vec<SkippedArticle>,
    pub warnings: Vec<String>,
}
