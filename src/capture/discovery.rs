//! Find attachment links in a rendered thread page.

use scraper::{Html, Selector};
use tracing::{debug, warn};
use url::Url;

use super::ImageReference;
use crate::config::SiteProfile;

/// Collect `href`s of the site's lightbox anchors in document order.
///
/// Relative links are resolved against the site origin. Duplicates are kept;
/// each occurrence becomes its own page.
pub fn discover_references(html: &str, site: &SiteProfile) -> Vec<ImageReference> {
    let selector = match Selector::parse(&site.image_link_selector) {
        Ok(s) => s,
        Err(e) => {
            warn!(
                "Invalid image link selector '{}': {:?}",
                site.image_link_selector, e
            );
            return Vec::new();
        }
    };
    let base = Url::parse(&format!("{}/", site.origin())).ok();

    let document = Html::parse_document(html);
    let references: Vec<ImageReference> = document
        .select(&selector)
        .filter_map(|el| el.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .filter_map(|href| resolve_href(href, site.origin(), base.as_ref()))
        .enumerate()
        .map(|(i, source_url)| ImageReference {
            index: i + 1,
            source_url,
        })
        .collect();

    debug!("Discovered {} image references", references.len());
    references
}

fn resolve_href(href: &str, origin: &str, base: Option<&Url>) -> Option<String> {
    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href.to_string());
    }
    if href.starts_with('/') && !href.starts_with("//") {
        return Some(format!("{}{}", origin, href));
    }
    base.and_then(|b| b.join(href).ok()).map(|u| u.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <ul class="attachmentList">
            <li><a class="file-preview js-lbImage" href="/attachments/q1-png.101/">1</a></li>
            <li><a class="file-preview" href="/attachments/ignored.1/">no lightbox</a></li>
            <li><a class="file-preview js-lbImage" href="https://cdn.fuoverflow.com/q2.png">2</a></li>
            <li><a class="file-preview js-lbImage" href="/attachments/q1-png.101/">dup</a></li>
            <li><a class="file-preview js-lbImage">no href</a></li>
          </ul>
        </body></html>
    "#;

    #[test]
    fn test_document_order_and_absolute_urls() {
        let refs = discover_references(PAGE, &SiteProfile::default());
        let urls: Vec<_> = refs.iter().map(|r| r.source_url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://fuoverflow.com/attachments/q1-png.101/",
                "https://cdn.fuoverflow.com/q2.png",
                "https://fuoverflow.com/attachments/q1-png.101/",
            ]
        );
        let indexes: Vec<_> = refs.iter().map(|r| r.index).collect();
        assert_eq!(indexes, vec![1, 2, 3]);
    }

    #[test]
    fn test_no_attachments() {
        let refs = discover_references("<html><body><p>login</p></body></html>", &SiteProfile::default());
        assert!(refs.is_empty());
    }

    #[test]
    fn test_relative_without_leading_slash() {
        let html = r#"<a class="file-preview js-lbImage" href="attachments/x.5/">x</a>"#;
        let refs = discover_references(html, &SiteProfile::default());
        assert_eq!(refs[0].source_url, "https://fuoverflow.com/attachments/x.5/");
    }

    #[test]
    fn test_custom_selector() {
        let site = SiteProfile {
            image_link_selector: "a.gallery".to_string(),
            origin: "https://forum.example/".to_string(),
            ..Default::default()
        };
        let html = r#"<a class="gallery" href="/img/1">1</a>"#;
        let refs = discover_references(html, &site);
        assert_eq!(refs[0].source_url, "https://forum.example/img/1");
    }
}
