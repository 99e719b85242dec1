use std::collections::HashSet;

use regex::Regex;

use crate::citations::dedupe_citations;
use crate::models::{ChartPayload, Citation, ParsedAnswer};

/// Transform raw answer text into display text. Placeholder tokens of the
/// form `[docN]` reference the N-th entry of the original citation list;
/// each is replaced by a ` ^k^ ` marker where k is the 1-based position of
/// that citation in the deduplicated list. Tokens whose index does not
/// resolve are left as literal text.
pub fn parse_answer(
    raw_text: &str,
    citations: &[Citation],
    generated_chart: Option<&str>,
) -> ParsedAnswer {
    let mut ordered = dedupe_citations(citations);
    for (index, citation) in ordered.iter_mut().enumerate() {
        citation.reindex_id = Some((index + 1).to_string());
    }

    let token_re = Regex::new(r"\[doc(\d{1,3})\]").unwrap_or_else(|_| Regex::new("^$").unwrap());

    let mut seen_tokens: HashSet<String> = HashSet::new();
    let mut tokens: Vec<(String, usize)> = Vec::new();
    for caps in token_re.captures_iter(raw_text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let token = whole.as_str().to_string();
        if !seen_tokens.insert(token.clone()) {
            continue;
        }
        let Some(number) = caps.get(1).and_then(|m| m.as_str().parse::<usize>().ok()) else {
            continue;
        };
        tokens.push((token, number));
    }

    let mut display_text = raw_text.to_string();
    for (token, number) in tokens {
        let position = number
            .checked_sub(1)
            .and_then(|i| citations.get(i))
            .and_then(|source| ordered.iter().position(|c| c.url == source.url));

        match position {
            Some(position) => {
                let marker = format!(" ^{}^ ", position + 1);
                display_text = display_text.replace(token.as_str(), &marker);
            }
            None => {
                tracing::warn!(
                    "citation token {token} references index {number} outside the \
                     {}-entry citation list; leaving literal text",
                    citations.len()
                );
            }
        }
    }

    let (display_text, inline_chart) = extract_inline_chart(&display_text);
    let chart = generated_chart
        .map(|payload| ChartPayload {
            base64: payload.trim().to_string(),
        })
        .or(inline_chart);

    ParsedAnswer {
        display_text,
        ordered_citations: ordered,
        chart,
    }
}

/// Pull an inline generated chart (a markdown image with a base64 data URI)
/// out of the text, removing its marker from the display copy.
fn extract_inline_chart(text: &str) -> (String, Option<ChartPayload>) {
    let chart_re = Regex::new(
        r"!\[[^\]\n]*\]\(data:image/[a-zA-Z+.-]+;base64,([A-Za-z0-9+/=\r\n]+)\)",
    )
    .unwrap_or_else(|_| Regex::new("^$").unwrap());

    let Some(caps) = chart_re.captures(text) else {
        return (text.to_string(), None);
    };
    let (Some(whole), Some(payload)) = (caps.get(0), caps.get(1)) else {
        return (text.to_string(), None);
    };

    let cleaned = text.replacen(whole.as_str(), "", 1);
    let chart = ChartPayload {
        base64: payload.as_str().trim().to_string(),
    };
    (cleaned, Some(chart))
}
