
use fancy_regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, warn};

/// Code point ranges that survive cleaning: the Arabic blocks, ASCII space
/// through `/`, ASCII digits and both sets of Arabic-Indic digits.
const KEPT_RANGES: [(char, char); 9] = [
    ('\u{0600}', '\u{06FF}'),
    ('\u{0750}', '\u{077F}'),
    ('\u{08A0}', '\u{08FF}'),
    ('\u{FB50}', '\u{FDFF}'),
    ('\u{FE70}', '\u{FEFF}'),
    ('\u{0020}', '\u{002F}'),
    ('\u{0030}', '\u{0039}'),
    ('\u{0660}', '\u{0669}'),
    ('\u{06F0}', '\u{06F9}'),
];

static QA_PAIR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)س\d+:(.+?)(?=جواب:)جواب:(.+?)(?=س\d+:|$)").expect("valid regex")
});

/// A question and its answer as found in the FAQ document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QaPair {
    pub question: String,
    pub answer: String,
}

impl QaPair {
    /// Render the pair as a single retrieval chunk
    #[inline]
    pub fn to_chunk(&self) -> String {
        format!("سؤال: {}\nجواب: {}", self.question, self.answer)
    }
}

#[inline]
fn is_kept(c: char) -> bool {
    KEPT_RANGES
        .iter()
        .any(|&(start, end)| (start..=end).contains(&c))
}

/// Normalize extracted PDF text.
///
/// Every character outside the kept ranges becomes a space, then whitespace
/// runs collapse to a single space and the result is trimmed. Line structure
/// does not survive cleaning.
#[inline]
pub fn clean_text(text: &str) -> String {
    let filtered: String = text
        .chars()
        .map(|c| if is_kept(c) { c } else { ' ' })
        .collect();

    filtered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Find `س<n>: question جواب: answer` pairs in FAQ text.
///
/// An answer runs until the next numbered question or the end of the text.
/// Both sides are cleaned with [`clean_text`].
#[inline]
pub fn extract_qa_pairs(text: &str) -> Vec<QaPair> {
    let mut pairs = Vec::new();

    for captures in QA_PAIR_REGEX.captures_iter(text) {
        let captures = match captures {
            Ok(captures) => captures,
            Err(e) => {
                warn!("Stopped question/answer matching early: {}", e);
                break;
            }
        };

        let question = captures.get(1).map_or("", |m| m.as_str());
        let answer = captures.get(2).map_or("", |m| m.as_str());
        pairs.push(QaPair {
            question: clean_text(question),
            answer: clean_text(answer),
        });
    }

    debug!("Extracted {} question-answer pairs", pairs.len());
    pairs
}
