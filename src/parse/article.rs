use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

use crate::constants::DOI_URL_PREFIX;

static PUBLISHED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r",\s*(January|February|March|April|May|June|July|August|September|October|November|December)\s+(\d{4})",
    )
    .expect("static regex")
});

/// DOI link and publication date found on an article landing page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticlePage {
    pub doi: Option<String>,
    pub pub_year: Option<i32>,
    pub pub_month: Option<u8>,
}

/// Takes the first `https://doi.org/` link and the first `<span>` containing
/// `", <Month> <YYYY>"`.
pub fn extract_article_page(html: &str) -> ArticlePage {
    let document = Html::parse_document(html);
    let (Ok(doi_link), Ok(span)) = (
        Selector::parse(&format!(r#"a[href^="{DOI_URL_PREFIX}"]"#)),
        Selector::parse("span"),
    ) else {
        return ArticlePage::default();
    };

    let doi = document
        .select(&doi_link)
        .filter_map(|a| a.value().attr("href"))
        .map(|href| href.trim().to_string())
        .next();

    let date = document.select(&span).find_map(|span| {
        let text: String = span.text().collect();
        let caps = PUBLISHED.captures(&text)?;
        let month = caps[1].parse::<chrono::Month>().ok()?;
        let year = caps[2].parse::<i32>().ok()?;
        Some((year, month.number_from_month() as u8))
    });

    ArticlePage {
        doi,
        pub_year: date.map(|(year, _)| year),
        pub_month: date.map(|(_, month)| month),
    }
}
