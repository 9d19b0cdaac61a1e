//! Reference extraction and domain validation.
//!
//! Walks each retrieved result's structured fields in priority order,
//! collects candidate URLs with provenance, validates them against the
//! institution's domain and assigns human-readable titles.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::retrieval::types::{Location, RetrievalResult};

/// A validated, titled URL attached to a generated answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reference {
    pub title: String,
    pub url: String,
}

/// Where a candidate URL was found within a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    WebLocation,
    DocumentMetadata,
    Metadata,
    BodyText,
}

/// Transient extraction product; recomputed per query, never stored.
#[derive(Debug, Clone)]
struct ReferenceCandidate {
    url: String,
    title: Option<String>,
    #[allow(dead_code)]
    provenance: Provenance,
    #[allow(dead_code)]
    result_index: usize,
}

fn url_pattern() -> &'static Regex {
    static URL_RE: OnceLock<Regex> = OnceLock::new();
    URL_RE.get_or_init(|| Regex::new(r#"https?://[^\s)\]"'<>]+"#).expect("static pattern"))
}

/// Extracts the ordered, URL-deduplicated reference list for a result set.
/// Results with no extractable URL contribute nothing here; their content
/// still reaches the answer through the prompt.
pub fn extract_references(results: &[RetrievalResult], allowed_domain: &str) -> Vec<Reference> {
    let mut references = Vec::new();
    let mut seen_urls = HashSet::new();

    for (index, result) in results.iter().enumerate() {
        for candidate in candidates_for(result, index) {
            if !is_valid_domain(&candidate.url, allowed_domain) {
                continue;
            }
            if !seen_urls.insert(candidate.url.clone()) {
                continue;
            }
            let title = candidate
                .title
                .or_else(|| derive_title(&candidate.url))
                .unwrap_or_else(|| format!("Reference {}", references.len() + 1));
            references.push(Reference {
                title,
                url: candidate.url,
            });
        }
    }

    references
}

/// Candidate URLs for one result, in priority order. Tiers are exclusive:
/// the first tier that produces anything wins and later tiers are skipped.
/// S3 locations are not reference-eligible.
fn candidates_for(result: &RetrievalResult, index: usize) -> Vec<ReferenceCandidate> {
    let explicit_title = string_field(&result.document_metadata, "title")
        .or_else(|| string_field(&result.metadata, "title"));

    if let Location::Web { url } = &result.location {
        return vec![ReferenceCandidate {
            url: url.clone(),
            title: explicit_title,
            provenance: Provenance::WebLocation,
            result_index: index,
        }];
    }

    let doc_urls = url_values(&result.document_metadata);
    if !doc_urls.is_empty() {
        return doc_urls
            .into_iter()
            .map(|url| ReferenceCandidate {
                url,
                title: explicit_title.clone(),
                provenance: Provenance::DocumentMetadata,
                result_index: index,
            })
            .collect();
    }

    let meta_urls = url_values(&result.metadata);
    if !meta_urls.is_empty() {
        return meta_urls
            .into_iter()
            .map(|url| ReferenceCandidate {
                url,
                title: explicit_title.clone(),
                provenance: Provenance::Metadata,
                result_index: index,
            })
            .collect();
    }

    url_pattern()
        .find_iter(&result.content)
        .map(|m| ReferenceCandidate {
            url: m.as_str().trim_end_matches(['.', ',']).to_string(),
            title: None,
            provenance: Provenance::BodyText,
            result_index: index,
        })
        .collect()
}

fn string_field(map: &std::collections::BTreeMap<String, Value>, key: &str) -> Option<String> {
    map.get(key)
        .and_then(|value| value.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

fn url_values(map: &std::collections::BTreeMap<String, Value>) -> Vec<String> {
    map.values()
        .filter_map(|value| value.as_str())
        .filter(|s| s.starts_with("http://") || s.starts_with("https://"))
        .map(|s| s.to_string())
        .collect()
}

/// True when the URL's host is the allowed domain or a subdomain of it,
/// with a leading `www.` stripped from both sides before comparison.
pub fn is_valid_domain(url: &str, allowed_domain: &str) -> bool {
    let Some(host) = host_of(url) else {
        return false;
    };
    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();
    let domain = allowed_domain
        .strip_prefix("www.")
        .unwrap_or(allowed_domain)
        .to_lowercase();
    if domain.is_empty() {
        return false;
    }
    host == domain || host.ends_with(&format!(".{}", domain))
}

fn host_of(url: &str) -> Option<String> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))?;
    let authority = rest.split(['/', '?', '#']).next()?;
    // Discard userinfo and port.
    let host = authority.rsplit('@').next()?;
    let host = host.split(':').next()?;
    if host.is_empty() {
        return None;
    }
    Some(host.to_lowercase())
}

/// Derives a display title from the last URL path segment: hyphens and
/// underscores become spaces, words are title-cased.
fn derive_title(url: &str) -> Option<String> {
    let without_scheme = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let path = without_scheme.split(['?', '#']).next()?;
    let segment = path
        .split('/')
        .skip(1)
        .filter(|s| !s.is_empty())
        .last()?;
    let stem = segment.rsplit_once('.').map(|(s, _)| s).unwrap_or(segment);
    let words: Vec<String> = stem
        .split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(title_case)
        .collect();
    if words.is_empty() {
        return None;
    }
    Some(words.join(" "))
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Renders the references block appended after a generated answer, or `None`
/// when no references survived validation — callers must render nothing then.
pub fn format_references_block(references: &[Reference]) -> Option<String> {
    if references.is_empty() {
        return None;
    }
    let mut block = String::from("\n\n---\n**References:**\n");
    for reference in references {
        block.push_str(&format!("- [{}]({})\n", reference.title, reference.url));
    }
    Some(block.trim_end().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn web_result(url: &str) -> RetrievalResult {
        RetrievalResult {
            content: "passage".to_string(),
            score: 0.9,
            location: Location::Web {
                url: url.to_string(),
            },
            metadata: BTreeMap::new(),
            document_metadata: BTreeMap::new(),
        }
    }

    fn bare_result(content: &str) -> RetrievalResult {
        RetrievalResult {
            content: content.to_string(),
            score: 0.9,
            location: Location::Unknown,
            metadata: BTreeMap::new(),
            document_metadata: BTreeMap::new(),
        }
    }

    #[test]
    fn domain_validation_accepts_exact_and_subdomains() {
        assert!(is_valid_domain("https://www.lpu.in/x", "lpu.in"));
        assert!(is_valid_domain("https://sub.lpu.in", "lpu.in"));
        assert!(is_valid_domain("https://lpu.in/admission/", "www.lpu.in"));
        assert!(!is_valid_domain("https://fake-lpu.in/x", "lpu.in"));
        assert!(!is_valid_domain("https://lpu.in.evil.com/x", "lpu.in"));
        assert!(!is_valid_domain("not a url", "lpu.in"));
    }

    #[test]
    fn web_location_takes_priority_over_body_text() {
        let mut result = web_result("https://www.lpu.in/admission/");
        result.content = "see https://www.lpu.in/other-page".to_string();

        let references = extract_references(&[result], "lpu.in");
        assert_eq!(references.len(), 1);
        assert_eq!(references[0].url, "https://www.lpu.in/admission/");
    }

    #[test]
    fn document_metadata_beats_generic_metadata() {
        let mut result = bare_result("text");
        result
            .document_metadata
            .insert("source".into(), json!("https://www.lpu.in/doc-page"));
        result
            .metadata
            .insert("origin".into(), json!("https://www.lpu.in/meta-page"));

        let references = extract_references(&[result], "lpu.in");
        assert_eq!(references.len(), 1);
        assert_eq!(references[0].url, "https://www.lpu.in/doc-page");
    }

    #[test]
    fn body_text_is_last_resort() {
        let result = bare_result("apply at https://www.lpu.in/admission/engineering.php today");
        let references = extract_references(&[result], "lpu.in");
        assert_eq!(references.len(), 1);
        assert_eq!(references[0].url, "https://www.lpu.in/admission/engineering.php");
    }

    #[test]
    fn disallowed_domains_are_dropped_silently() {
        let result = bare_result("details at https://random-site.com/lpu-fees");
        let references = extract_references(&[result], "lpu.in");
        assert!(references.is_empty());
        assert!(format_references_block(&references).is_none());
    }

    #[test]
    fn s3_locations_never_produce_references() {
        let result = RetrievalResult {
            content: "archived".to_string(),
            score: 0.5,
            location: Location::S3 {
                uri: "s3://bucket/key.pdf".to_string(),
            },
            metadata: BTreeMap::new(),
            document_metadata: BTreeMap::new(),
        };
        assert!(extract_references(&[result], "lpu.in").is_empty());
    }

    #[test]
    fn duplicate_urls_keep_first_seen_order() {
        let results = vec![
            web_result("https://www.lpu.in/a"),
            web_result("https://www.lpu.in/b"),
            web_result("https://www.lpu.in/a"),
        ];
        let references = extract_references(&results, "lpu.in");
        let urls: Vec<&str> = references.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["https://www.lpu.in/a", "https://www.lpu.in/b"]);
    }

    #[test]
    fn titles_prefer_metadata_then_path_segment_then_positional() {
        let mut titled = web_result("https://www.lpu.in/admission/");
        titled
            .metadata
            .insert("title".into(), json!("Admissions Overview"));
        let pathed = web_result("https://www.lpu.in/programs/computer-science_engineering.php");
        let bare = web_result("https://www.lpu.in/");

        let references = extract_references(&[titled, pathed, bare], "lpu.in");
        assert_eq!(references[0].title, "Admissions Overview");
        assert_eq!(references[1].title, "Computer Science Engineering");
        assert_eq!(references[2].title, "Reference 3");
    }

    #[test]
    fn references_block_formatting() {
        let references = vec![Reference {
            title: "Admissions".to_string(),
            url: "https://www.lpu.in/admission/".to_string(),
        }];
        let block = format_references_block(&references).unwrap();
        assert!(block.starts_with("\n\n---\n**References:**\n"));
        assert!(block.contains("- [Admissions](https://www.lpu.in/admission/)"));
    }
}
