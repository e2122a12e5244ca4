use tracing::{debug, warn};

use crate::model::{ArticleSpec, MatchResult};

use super::normalize;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum MatchPolicy {
    /// Page text must begin with the title.
    #[default]
    Prefix,
    /// Title may occur anywhere on the page.
    Substring,
}

impl MatchPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Prefix => "prefix",
            Self::Substring => "substring",
        }
    }
}

/// Both arguments are expected in normalized form. An empty title never
/// matches.
pub fn matches(page_text: &str, title: &str, policy: MatchPolicy) -> bool {
    if title.is_empty() || page_text.len() < title.len() {
        return false;
    }

    match policy {
        MatchPolicy::Prefix => page_text.starts_with(title),
        MatchPolicy::Substring => page_text.contains(title),
    }
}

/// First page (1-based) each article title appears on. Pages are not consumed
/// by a match, so two articles may report the same start page.
pub fn find_start_pages(
    pages: &[String],
    articles: &[ArticleSpec],
    policy: MatchPolicy,
) -> Vec<MatchResult> {
    let mut results = Vec::with_capacity(articles.len());

    for article in articles {
        let title = normalize(&article.title);
        if title.is_empty() {
            warn!(title = %article.title, "article title is empty after normalization");
            continue;
        }

        let found = pages
            .iter()
            .position(|page| matches(page, &title, policy))
            .map(|index| index + 1);

        match found {
            Some(start_page) => {
                debug!(title = %article.title, page = start_page, "found article start");
                results.push(MatchResult {
                    article: article.clone(),
                    start_page,
                });
            }
            None => {
                debug!(title = %article.title, "article start not found");
            }
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(title: &str, order: usize) -> ArticleSpec {
        ArticleSpec {
            title: title.to_string(),
            author: None,
            order,
        }
    }

    #[test]
    fn prefix_policy_requires_title_at_page_start() {
        assert!(matches("introduction to the field", "introduction", MatchPolicy::Prefix));
        assert!(!matches("an introduction to the field", "introduction", MatchPolicy::Prefix));
        assert!(!matches("intro", "introduction", MatchPolicy::Prefix));
    }

    #[test]
    fn substring_policy_accepts_title_anywhere() {
        assert!(matches("an introduction to the field", "introduction", MatchPolicy::Substring));
        assert!(!matches("an overview", "introduction", MatchPolicy::Substring));
    }

    #[test]
    fn empty_title_never_matches() {
        assert!(!matches("anything", "", MatchPolicy::Prefix));
        assert!(!matches("anything", "", MatchPolicy::Substring));
    }

    #[test]
    fn find_start_pages_reports_first_matching_page() {
        let pages = vec![
            "cover page".to_string(),
            "methods used in the study".to_string(),
            "methods revisited".to_string(),
        ];
        let articles = vec![article("Methods", 0), article("Discussion", 1)];

        let results = find_start_pages(&pages, &articles, MatchPolicy::Prefix);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].article.title, "Methods");
        assert_eq!(results[0].start_page, 2);
    }

    #[test]
    fn find_start_pages_normalizes_titles() {
        let pages = vec!["the selfdriving car a review of progress".to_string()];
        let articles = vec![article("The Self-Driving Car: A Review", 0)];

        let results = find_start_pages(&pages, &articles, MatchPolicy::Prefix);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].start_page, 1);
    }
}
