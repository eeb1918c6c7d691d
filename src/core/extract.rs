use crate::config::AppConfig;
use crate::domain::model::JobPosting;
use crate::utils::error::{Result, WatchError};
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Turns a search results page into job postings.
///
/// Each container matched by the container selector is parsed on its own; one
/// missing a title, a link, or a `~token` in that link is skipped rather than
/// failing the page. A page with no matching containers yields an empty list.
#[derive(Debug, Clone)]
pub struct ListingExtractor {
    origin: Url,
    container: Selector,
    title: Selector,
    link: Selector,
    skill: Selector,
}

impl ListingExtractor {
    pub fn new(origin: &str, container: &str, title: &str, link: &str, skill: &str) -> Result<Self> {
        let origin = Url::parse(origin).map_err(|e| WatchError::InvalidConfigValue {
            field: "source.origin".to_string(),
            value: origin.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            origin,
            container: parse_selector("extract.container", container)?,
            title: parse_selector("extract.title", title)?,
            link: parse_selector("extract.link", link)?,
            skill: parse_selector("extract.skill", skill)?,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(
            config.origin(),
            config.container_selector(),
            config.title_selector(),
            config.link_selector(),
            config.skill_selector(),
        )
    }

    pub fn extract(&self, html: &str) -> Vec<JobPosting> {
        let document = Html::parse_document(html);
        let mut postings = Vec::new();
        let mut skipped = 0usize;

        for element in document.select(&self.container) {
            match self.parse_container(element) {
                Some(posting) => postings.push(posting),
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            tracing::debug!("Skipped {} container(s) without a usable title or link", skipped);
        }
        postings
    }

    fn parse_container(&self, element: ElementRef<'_>) -> Option<JobPosting> {
        let title = element
            .select(&self.title)
            .next()
            .map(element_text)
            .filter(|t| !t.is_empty())?;

        let href = element.select(&self.link).next()?.value().attr("href")?;
        let link = self.origin.join(href.trim()).ok()?.to_string();
        let id = job_id_from_link(&link)?.to_string();

        let skills = element
            .select(&self.skill)
            .map(element_text)
            .filter(|s| !s.is_empty())
            .collect();

        Some(JobPosting {
            id,
            title,
            link,
            skills,
        })
    }
}

/// The site's job token: the text after the first `~` in the link, up to the
/// next path, query or fragment delimiter.
pub fn job_id_from_link(link: &str) -> Option<&str> {
    let (_, rest) = link.split_once('~')?;
    let end = rest
        .find(|c| matches!(c, '/' | '?' | '#' | '~'))
        .unwrap_or(rest.len());
    let id = &rest[..end];
    (!id.is_empty()).then_some(id)
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_selector(field: &str, css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| WatchError::InvalidConfigValue {
        field: field.to_string(),
        value: css.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH_PAGE: &str = r#"
<html><body>
  <section class="up-card-section">
    <h3 data-test="job-title"><a href="/jobs/Java-backend_~01aaa/?referrer_url_path=find">Java backend</a></h3>
    <span data-test="attr-item">Java</span>
  </section>
  <section class="up-card-section promo">
    <div class="ad">Upgrade your plan</div>
  </section>
  <section class="up-card-section">
    <h3 data-test="job-title">
      <a href="/jobs/React-app_~01bbb/">  Build a
        React app </a>
    </h3>
    <span data-test="attr-item"> React developer </span>
  </section>
  <section class="up-card-section">
    <h3 data-test="job-title"><a>No link here</a></h3>
  </section>
  <section class="up-card-section">
    <h3 data-test="job-title"><a href="/jobs/Next-site_~01ccc">Next site</a></h3>
    <span data-test="attr-item">Nextjs developer</span>
    <span data-test="attr-item">Java</span>
  </section>
</body></html>
"#;

    fn extractor() -> ListingExtractor {
        ListingExtractor::from_config(&AppConfig::default()).unwrap()
    }

    #[test]
    fn test_extracts_postings_in_document_order() {
        let postings = extractor().extract(SEARCH_PAGE);

        assert_eq!(postings.len(), 3);
        assert_eq!(postings[0].id, "01aaa");
        assert_eq!(postings[0].title, "Java backend");
        assert_eq!(
            postings[0].link,
            "https://www.upwork.com/jobs/Java-backend_~01aaa/?referrer_url_path=find"
        );
        assert_eq!(postings[0].skills, vec!["Java"]);

        assert_eq!(postings[1].id, "01bbb");
        assert_eq!(postings[1].title, "Build a React app");
        assert_eq!(postings[1].skills, vec!["React developer"]);

        assert_eq!(postings[2].id, "01ccc");
        assert_eq!(postings[2].skills, vec!["Nextjs developer", "Java"]);
    }

    #[test]
    fn test_ids_are_stable_across_runs() {
        let first = extractor().extract(SEARCH_PAGE);
        let second = extractor().extract(SEARCH_PAGE);
        let ids = |p: &[JobPosting]| p.iter().map(|j| j.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&first), ids(&second));
    }

    #[test]
    fn test_unrecognised_page_yields_nothing() {
        assert!(extractor().extract("<html><body><p>Captcha</p></body></html>").is_empty());
        assert!(extractor().extract("").is_empty());
    }

    #[test]
    fn test_absolute_links_are_kept() {
        let html = r#"<div class="up-card-section">
            <h3 data-test="job-title"><a href="https://other.example.com/jobs/~0xyz">X</a></h3>
        </div>"#;
        let postings = extractor().extract(html);
        assert_eq!(postings.len(), 1);
        assert_eq!(postings[0].link, "https://other.example.com/jobs/~0xyz");
        assert_eq!(postings[0].id, "0xyz");
        assert!(postings[0].skills.is_empty());
    }

    #[test]
    fn test_link_without_token_is_skipped() {
        let html = r#"<div class="up-card-section">
            <h3 data-test="job-title"><a href="/jobs/plain">Plain</a></h3>
        </div>"#;
        assert!(extractor().extract(html).is_empty());
    }

    #[test]
    fn test_job_id_from_link() {
        assert_eq!(job_id_from_link("https://x.com/jobs/a_~01ab/"), Some("01ab"));
        assert_eq!(job_id_from_link("https://x.com/jobs/~01ab?x=1"), Some("01ab"));
        assert_eq!(job_id_from_link("https://x.com/jobs/~01ab"), Some("01ab"));
        assert_eq!(job_id_from_link("https://x.com/jobs/~/"), None);
        assert_eq!(job_id_from_link("https://x.com/jobs/plain"), None);
    }

    #[test]
    fn test_invalid_selector_is_a_config_error() {
        let err = ListingExtractor::new("https://x.com", "div[[", "h3", "a", "span").unwrap_err();
        assert!(matches!(err, WatchError::InvalidConfigValue { field, .. } if field == "extract.container"));
    }
}
