use tracing::warn;

use crate::constants::DOI_URL_PREFIX;

/// DOIs listed in a "cited by" CSV export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CitationList {
    /// In export order; entries too short to be a DOI link are kept as `""`.
    pub dois: Vec<String>,
    pub rejected: usize,
}

/// Reads a two-column CSV export with the DOI link in the second column.
///
/// The `DOI` header row is skipped, rows with another column count are dropped.
pub fn extract_citation_dois(body: &str) -> CitationList {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(body.as_bytes());

    let mut list = CitationList::default();
    for row in reader.records() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                warn!(error = %e, "Unreadable citation row, skipping");
                continue;
            }
        };
        if row.len() != 2 {
            warn!(columns = row.len(), "Citation row does not have two columns, skipping");
            continue;
        }

        let doi = row[1].trim();
        if doi == "DOI" {
            continue;
        }
        if doi.len() > DOI_URL_PREFIX.len() {
            list.dois.push(doi.to_string());
        } else {
            warn!(doi, "Invalid DOI in citation export");
            list.dois.push(String::new());
            list.rejected += 1;
        }
    }
    list
}
