//! Landing page extraction
//!
//! The HTML document is parsed once and reduced to the handful of values the
//! resolver needs, so the (non-`Send`) DOM never outlives the parse call.

use scraper::{Html, Selector};

use crate::constants::{iono, selectors};

/// Values scraped from an episode landing page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LandingPage {
    /// `<meta property="og:title">`
    pub og_title: Option<String>,
    /// `<title>` text
    pub title: Option<String>,
    /// `<meta name="description">`
    pub description: Option<String>,
    /// `<meta name="author">`
    pub author: Option<String>,
    /// Every `<meta property="og:audio">` value
    pub og_audio: Vec<String>,
    /// `<audio src>` values followed by nested `<source src>` values
    pub audio_sources: Vec<String>,
    /// Inline scripts that may carry serialized page state
    pub state_scripts: Vec<String>,
    /// The raw document
    pub body: String,
}

impl LandingPage {
    /// Parse a landing page document
    pub fn parse(html: &str) -> Self {
        let document = Html::parse_document(html);

        let state_scripts: Vec<String> = select_all(&document, selectors::SCRIPT)
            .map(|script| script.text().collect::<String>())
            .filter(|text| text.contains(iono::PAGE_STATE_MARKER) || text.contains(iono::AUDIO_HOST))
            .collect();

        let mut audio_sources: Vec<String> = select_all(&document, selectors::AUDIO)
            .filter_map(|el| attr(el, "src"))
            .collect();
        audio_sources.extend(
            select_all(&document, selectors::AUDIO_SOURCE).filter_map(|el| attr(el, "src")),
        );

        let title = select_all(&document, selectors::TITLE)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty());
        let og_audio: Vec<String> = select_all(&document, selectors::OG_AUDIO)
            .filter_map(|el| attr(el, "content"))
            .collect();
        let og_title = meta_content(&document, selectors::OG_TITLE);
        let description = meta_content(&document, selectors::DESCRIPTION);
        let author = meta_content(&document, selectors::AUTHOR);

        Self {
            og_title,
            title,
            description,
            author,
            og_audio,
            audio_sources,
            state_scripts,
            body: html.to_string(),
        }
    }

    /// Page title: `og:title`, else `<title>`
    pub fn page_title(&self) -> Option<&str> {
        self.og_title.as_deref().or(self.title.as_deref())
    }
}

fn select_all<'a>(
    document: &'a Html,
    selector: &str,
) -> impl Iterator<Item = scraper::ElementRef<'a>> + 'a {
    // Selectors are compile-time constants; a parse failure just matches nothing
    let selector = Selector::parse(selector).ok();
    selector
        .into_iter()
        .flat_map(move |s| document.select(&s).collect::<Vec<_>>())
}

fn attr(element: scraper::ElementRef<'_>, name: &str) -> Option<String> {
    element
        .value()
        .attr(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn meta_content(document: &Html, selector: &str) -> Option<String> {
    select_all(document, selector).find_map(|el| attr(el, "content"))
}
