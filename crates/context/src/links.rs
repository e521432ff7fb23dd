//! Link Processor - Turns picture file names in answers into links
//!
//! Candidates come only from `File:` markers in the assembled context and
//! must appear verbatim in the model output. Rewriting leaves existing
//! markup alone, so running it twice changes nothing.

use picforge_common::models::LinkCandidate;

const FILE_MARKER: &str = "File:";

/// Extracts and rewrites picture links
#[derive(Debug, Clone)]
pub struct LinkProcessor {
    image_route: String,
}

impl LinkProcessor {
    /// `image_route` is the link prefix, e.g. `/images/`
    pub fn new(image_route: impl Into<String>) -> Self {
        Self {
            image_route: image_route.into(),
        }
    }

    /// Candidates named by `File:` markers in `context` that `completion` mentions,
    /// in discovery order and without duplicates
    pub fn extract(&self, context: &str, completion: &str) -> Vec<LinkCandidate> {
        let mut candidates: Vec<LinkCandidate> = Vec::new();

        for line in context.lines() {
            let Some(start) = line.find(FILE_MARKER) else {
                continue;
            };
            let name = line[start + FILE_MARKER.len()..].trim();
            if name.is_empty() || !completion.contains(name) {
                continue;
            }
            if candidates.iter().any(|c| c.raw_token == name) {
                continue;
            }
            candidates.push(LinkCandidate {
                raw_token: name.to_string(),
                target_path: format!("{}{}", self.image_route, name),
            });
        }

        candidates
    }

    /// Wrap every unlinked occurrence of each candidate in an anchor.
    ///
    /// Longer names are processed first so a name that is a substring of
    /// another cannot split an earlier rewrite. Returns the new text and the
    /// number of occurrences rewritten.
    pub fn rewrite(&self, text: &str, candidates: &[LinkCandidate]) -> (String, usize) {
        let mut ordered: Vec<&LinkCandidate> = candidates.iter().collect();
        ordered.sort_by(|a, b| b.raw_token.len().cmp(&a.raw_token.len()));

        let mut output = text.to_string();
        let mut rewritten = 0;
        for candidate in ordered {
            let (next, count) = rewrite_one(&output, candidate);
            output = next;
            rewritten += count;
        }

        (output, rewritten)
    }

    /// Extract from `context` and rewrite `completion` in one step
    pub fn process(&self, context: &str, completion: &str) -> (String, Vec<LinkCandidate>, usize) {
        let candidates = self.extract(context, completion);
        let (text, rewritten) = self.rewrite(completion, &candidates);
        (text, candidates, rewritten)
    }
}

fn anchor(candidate: &LinkCandidate) -> String {
    format!(
        "<a target=\"_blank\" href=\"{}\">{}</a>",
        candidate.target_path, candidate.raw_token
    )
}

fn rewrite_one(text: &str, candidate: &LinkCandidate) -> (String, usize) {
    let name = candidate.raw_token.as_str();
    if name.is_empty() {
        return (text.to_string(), 0);
    }

    // ASCII lowercasing keeps byte offsets aligned with `text`
    let lower = text.to_ascii_lowercase();
    let mut output = String::with_capacity(text.len());
    let mut copied = 0;
    let mut count = 0;

    for (start, _) in text.match_indices(name) {
        let end = start + name.len();
        if !is_unlinked(text, &lower, start, end) {
            continue;
        }
        output.push_str(&text[copied..start]);
        output.push_str(&anchor(candidate));
        copied = end;
        count += 1;
    }
    output.push_str(&text[copied..]);

    (output, count)
}

/// Whether the occurrence at `start..end` is plain text that may be linked
fn is_unlinked(text: &str, lower: &str, start: usize, end: usize) -> bool {
    let before = &text[..start];

    // Attribute value
    if before.ends_with("=\"") || before.ends_with("='") {
        return false;
    }

    // Inside a tag
    if last_tag_open(before) > before.rfind('>') {
        return false;
    }

    // Inside an anchor that has not been closed yet
    let lower_before = &lower[..start];
    if last_anchor_open(lower_before) > lower_before.rfind("</a>") {
        return false;
    }

    // Part of a longer name or path
    let glued_before = before
        .chars()
        .next_back()
        .is_some_and(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '/'));
    let glued_after = text[end..]
        .chars()
        .next()
        .is_some_and(|c| c.is_alphanumeric() || c == '_');

    !(glued_before || glued_after)
}

/// Byte offset of the last `<` that starts a tag rather than plain prose
fn last_tag_open(text: &str) -> Option<usize> {
    text.rmatch_indices('<').map(|(i, _)| i).find(|&i| {
        text[i + 1..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || matches!(c, '/' | '!'))
    })
}

/// Byte offset of the last `<a` that opens an anchor element
fn last_anchor_open(lower: &str) -> Option<usize> {
    lower.rmatch_indices("<a").map(|(i, _)| i).find(|&i| {
        lower[i + 2..]
            .chars()
            .next()
            .is_some_and(|c| c == '>' || c.is_whitespace())
    })
}
