//! Test fixtures for integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use citeflow::config::PipelineConfig;
use citeflow::fetch::{HttpResponse, MockFetcher};
use citeflow::phases::crossref_url;
use citeflow::pipeline::PipelineContext;
use citeflow::{InputArticle, MockClassifier};
use tempfile::TempDir;

pub const MAILTO: &str = "lab@example.org";

/// Abstract long enough to pass the unified-table filter.
pub fn citing_abstract(n: usize) -> String {
    format!("Citing work {n} revisits the cited argument with new survey evidence.")
}

/// A temporary project directory with a config pointing into it.
pub struct Workspace {
    pub temp: TempDir,
    pub config: PipelineConfig,
}

impl Workspace {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("temp dir");
        let config = PipelineConfig {
            input_csv: temp.path().join("input").join("articles.csv"),
            output_dir: temp.path().join("output"),
            cache_dir: temp.path().join("cache"),
            credentials_path: temp.path().join("credentials.txt"),
            crossref_mailto: Some(MAILTO.to_string()),
            fetch_workers: 3,
            base_wait: Duration::from_millis(1),
            cap_wait: Duration::from_millis(5),
            checkpoint_every: 2,
            ..PipelineConfig::default()
        };
        Self { temp, config }
    }

    pub fn output(&self, name: &str) -> PathBuf {
        self.config.output_dir.join(name)
    }

    pub fn context(
        &self,
        fetcher: Arc<MockFetcher>,
        classifier: Arc<MockClassifier>,
    ) -> PipelineContext {
        PipelineContext::new(self.config.clone(), fetcher).with_classifier(classifier)
    }
}

/// A small journal: `articles` articles, each cited by `citing_per_article` works.
pub struct Journal {
    pub articles: usize,
    pub citing_per_article: usize,
}

impl Journal {
    pub fn title(&self, a: usize) -> String {
        format!("Article {a:02}")
    }

    pub fn page_url(&self, a: usize) -> String {
        format!("https://journal.example/article/{a}")
    }

    pub fn cites_url(&self, a: usize) -> String {
        format!("https://journal.example/article/{a}/cited-by.csv")
    }

    pub fn citing_doi(&self, a: usize, c: usize) -> String {
        format!("10.5555/a{a}c{c}")
    }

    pub fn input(&self) -> Vec<InputArticle> {
        (0..self.articles)
            .map(|a| InputArticle {
                title: self.title(a),
                article_link: self.page_url(a),
                all_citing_papers_link: self.cites_url(a),
                cited_by_count: Some(self.citing_per_article as u64),
                abstract_text: format!("Article {a} argues that turnout follows mobilization."),
            })
            .collect()
    }

    pub fn write_input_csv(&self, path: &std::path::Path) {
        std::fs::create_dir_all(path.parent().expect("parent")).expect("input dir");
        let mut writer = csv::Writer::from_path(path).expect("input csv");
        writer
            .write_record([
                "title",
                "article_link",
                "all_citing_papers_link",
                "cited_by_count",
                "abstract",
            ])
            .expect("header");
        for article in self.input() {
            writer
                .write_record([
                    article.title,
                    article.article_link,
                    article.all_citing_papers_link,
                    article.cited_by_count.unwrap_or_default().to_string(),
                    article.abstract_text,
                ])
                .expect("row");
        }
        writer.flush().expect("flush");
    }

    /// Scripts every page, export and Crossref record of the journal.
    pub fn fetcher(&self) -> Arc<MockFetcher> {
        let fetcher = Arc::new(MockFetcher::new());
        for a in 0..self.articles {
            let mut export = String::from("Title,DOI\n");
            for c in 0..self.citing_per_article {
                export.push_str(&format!(
                    "Citing {c},https://doi.org/{}\n",
                    self.citing_doi(a, c)
                ));
            }
            fetcher.always(&self.cites_url(a), Ok(HttpResponse::ok(export)));

            fetcher.always(
                &self.page_url(a),
                Ok(HttpResponse::ok(format!(
                    r#"<html><a href="https://doi.org/10.1017/art{a}">DOI</a>
                       <span>Volume 1, Issue 1, June 2021</span></html>"#
                ))),
            );

            for c in 0..self.citing_per_article {
                let body = serde_json::json!({
                    "message": {
                        "title": [format!("Citing work {a}-{c}")],
                        "abstract": format!("<jats:p>{}</jats:p>", citing_abstract(c)),
                        "published-online": {"date-parts": [[2022, 1 + c % 12]]}
                    }
                });
                fetcher.always(
                    &crossref_url(&self.citing_doi(a, c), Some(MAILTO)).expect("crossref url"),
                    Ok(HttpResponse::ok(body.to_string())),
                );
            }
        }
        fetcher
    }
}
