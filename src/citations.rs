use std::collections::HashSet;

use crate::models::Citation;

pub const FILEPATH_TRUNCATION_LIMIT: usize = 50;

/// Deduplicate citations by URL, keeping the first occurrence of each URL in
/// its original relative order.
pub fn dedupe_citations(citations: &[Citation]) -> Vec<Citation> {
    let mut seen: HashSet<Option<String>> = HashSet::new();
    let mut out = Vec::new();

    for citation in citations {
        if seen.insert(citation.url.clone()) {
            out.push(citation.clone());
        }
    }

    out
}

/// Human-readable label for a citation in the reference list. `index` is the
/// 1-based position shown next to the entry.
pub fn display_label(citation: &Citation, index: usize, truncate: bool) -> String {
    let Some(filepath) = citation.filepath.as_deref().filter(|p| !p.is_empty()) else {
        return format!("Citation {index}");
    };

    let part = citation
        .part_index
        .map(|i| i.to_string())
        .or_else(|| {
            citation
                .chunk_id
                .as_deref()
                .and_then(|chunk| chunk.parse::<i64>().ok())
                .map(|chunk| (chunk + 1).to_string())
        })
        .or_else(|| citation.reindex_id.clone())
        .unwrap_or_default();

    let chars: Vec<char> = filepath.chars().collect();
    let name = if truncate && chars.len() > FILEPATH_TRUNCATION_LIMIT {
        let head: String = chars[..20].iter().collect();
        let tail: String = chars[chars.len() - 20..].iter().collect();
        format!("{head}...{tail}")
    } else {
        filepath.to_string()
    };

    format!("{name} - Part {part}")
}

/// Filename offered when the user downloads a cited source: the final path
/// segment of the URL, or a placeholder when there is none.
pub fn download_filename(citation: &Citation) -> String {
    citation
        .url
        .as_deref()
        .and_then(|url| url.rsplit('/').next())
        .filter(|segment| !segment.is_empty())
        .map(|segment| segment.to_string())
        .unwrap_or_else(|| "download".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn citation(url: &str) -> Citation {
        Citation {
            url: Some(url.to_string()),
            filepath: None,
            chunk_id: None,
            part_index: None,
            reindex_id: None,
        }
    }

    #[test]
    fn dedupe_keeps_first_occurrence_in_order() {
        let citations = vec![citation("a"), citation("b"), citation("a")];
        let deduped = dedupe_citations(&citations);

        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].url.as_deref(), Some("a"));
        assert_eq!(deduped[1].url.as_deref(), Some("b"));
    }

    #[test]
    fn dedupe_is_idempotent() {
        let citations = vec![citation("a"), citation("b"), citation("a"), citation("c")];
        let once = dedupe_citations(&citations);
        let twice = dedupe_citations(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn dedupe_of_empty_input_is_empty() {
        assert!(dedupe_citations(&[]).is_empty());
    }

    #[test]
    fn label_prefers_part_index_over_chunk_id() {
        let cite = Citation {
            url: Some("u".to_string()),
            filepath: Some("notes/report.pdf".to_string()),
            chunk_id: Some("4".to_string()),
            part_index: Some(2),
            reindex_id: None,
        };
        assert_eq!(display_label(&cite, 1, false), "notes/report.pdf - Part 2");
    }

    #[test]
    fn label_derives_part_from_chunk_id() {
        let cite = Citation {
            url: Some("u".to_string()),
            filepath: Some("notes/report.pdf".to_string()),
            chunk_id: Some("4".to_string()),
            part_index: None,
            reindex_id: None,
        };
        assert_eq!(display_label(&cite, 1, false), "notes/report.pdf - Part 5");
    }

    #[test]
    fn label_falls_back_to_citation_number() {
        let cite = citation("u");
        assert_eq!(display_label(&cite, 3, true), "Citation 3");
    }

    #[test]
    fn long_filepaths_are_truncated_in_the_middle() {
        let filepath = "a".repeat(30) + &"b".repeat(30);
        let cite = Citation {
            url: Some("u".to_string()),
            filepath: Some(filepath.clone()),
            chunk_id: None,
            part_index: Some(1),
            reindex_id: None,
        };

        let truncated = display_label(&cite, 1, true);
        assert_eq!(
            truncated,
            format!("{}...{} - Part 1", "a".repeat(20), "b".repeat(20))
        );
        assert_eq!(display_label(&cite, 1, false), format!("{filepath} - Part 1"));
    }

    #[test]
    fn download_name_is_last_path_segment() {
        let cite = citation("https://files.example.com/docs/report.pdf");
        assert_eq!(download_filename(&cite), "report.pdf");
    }

    #[test]
    fn download_name_defaults_when_url_is_missing_or_bare() {
        let mut cite = citation("https://files.example.com/docs/");
        assert_eq!(download_filename(&cite), "download");
        cite.url = None;
        assert_eq!(download_filename(&cite), "download");
    }
}
