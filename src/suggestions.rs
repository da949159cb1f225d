//! Writing suggestions: the analysis prompt, parsing of the model's reply,
//! and the accept/reject lifecycle.
//!
//! Suggestions are resolved against an immutable snapshot of the analyzed
//! text. Each suggestion is anchored to the first occurrence of its
//! `original` text not already claimed by an earlier suggestion, falling back
//! to the first occurrence. Accepting two suggestions whose anchors overlap is
//! refused, so the accepted set can always be applied in one pass.

use crate::adapters::ChatMessage;
use crate::dispatch::AnalyzeRequest;
use crate::keys::ClientKeys;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExplanationLanguage {
    #[default]
    English,
    Japanese,
}

impl ExplanationLanguage {
    /// `ja*` locales get Japanese explanations, everything else English.
    #[must_use]
    pub fn from_locale(locale: &str) -> Self {
        if locale.starts_with("ja") {
            Self::Japanese
        } else {
            Self::English
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::English => "English",
            Self::Japanese => "Japanese",
        }
    }
}

#[must_use]
pub fn analysis_prompt(text: &str, language: ExplanationLanguage) -> String {
    format!(
        r#"You are a professional writing assistant. Analyze the following text and provide suggestions for improvement.

For each suggestion, provide a JSON array where each item has:
- "type": one of "grammar", "spelling", "punctuation", "style", "clarity"
- "original": the exact text that should be changed
- "suggestion": the improved text
- "explanation": brief explanation of the change (in {})

Respond ONLY with a valid JSON array. No other text.

Text to analyze:
{}"#,
        language.name(),
        text
    )
}

impl AnalyzeRequest {
    /// A single-message analysis request for `text`.
    pub fn for_text(
        model: impl Into<String>,
        text: &str,
        language: ExplanationLanguage,
        client_keys: Option<ClientKeys>,
    ) -> Self {
        Self {
            model: model.into(),
            messages: vec![ChatMessage::user(analysis_prompt(text, language))],
            client_keys,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionKind {
    Grammar,
    Spelling,
    Punctuation,
    Style,
    Clarity,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

impl fmt::Display for SuggestionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    #[serde(default)]
    pub id: usize,
    #[serde(rename = "type")]
    pub kind: SuggestionKind,
    pub original: String,
    pub suggestion: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub status: SuggestionStatus,
}

#[derive(Error, Debug)]
pub enum SuggestionError {
    #[error("No JSON array found in model output")]
    NoArray,

    #[error("Invalid suggestion JSON: {0}")]
    Invalid(#[from] serde_json::Error),

    #[error("No suggestion with id {0}")]
    NotFound(usize),

    #[error("Suggestion {id} is already {status}")]
    AlreadyResolved { id: usize, status: SuggestionStatus },

    #[error("Suggestion {id}: {original:?} does not appear in the text")]
    NotInSource { id: usize, original: String },

    #[error("Suggestion {id} overlaps accepted suggestion {other}")]
    Conflict { id: usize, other: usize },
}

/// Extract the suggestion array from model output. Models sometimes wrap the
/// array in prose or code fences, so everything from the first `[` to the
/// last `]` is taken.
pub fn parse_suggestions(content: &str) -> Result<Vec<Suggestion>, SuggestionError> {
    let (Some(start), Some(end)) = (content.find('['), content.rfind(']')) else {
        return Err(SuggestionError::NoArray);
    };
    if end < start {
        return Err(SuggestionError::NoArray);
    }

    let items: Vec<serde_json::Value> = serde_json::from_str(&content[start..=end])?;
    let mut suggestions: Vec<Suggestion> = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(s) => Some(s),
            Err(e) => {
                tracing::debug!(error = %e, "Skipping malformed suggestion");
                None
            }
        })
        .collect();
    for (i, s) in suggestions.iter_mut().enumerate() {
        s.id = i;
        s.status = SuggestionStatus::Pending;
    }
    Ok(suggestions)
}

#[derive(Debug, Clone)]
pub struct SuggestionSet {
    source: String,
    suggestions: Vec<Suggestion>,
    spans: Vec<Option<Range<usize>>>,
}

impl SuggestionSet {
    /// Anchor `suggestions` in `source`. Ids are reassigned to positions.
    pub fn new(source: impl Into<String>, mut suggestions: Vec<Suggestion>) -> Self {
        let source = source.into();
        let mut spans = Vec::with_capacity(suggestions.len());
        for (i, s) in suggestions.iter_mut().enumerate() {
            s.id = i;
            let span = anchor(&source, &s.original, &spans);
            spans.push(span);
        }

        Self {
            source,
            suggestions,
            spans,
        }
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn suggestions(&self) -> &[Suggestion] {
        &self.suggestions
    }

    #[must_use]
    pub fn get(&self, id: usize) -> Option<&Suggestion> {
        self.suggestions.get(id)
    }

    /// Byte range of the suggestion's anchor in the source, if it was found.
    #[must_use]
    pub fn span_of(&self, id: usize) -> Option<Range<usize>> {
        self.spans.get(id).cloned().flatten()
    }

    pub fn pending(&self) -> impl Iterator<Item = &Suggestion> {
        self.suggestions
            .iter()
            .filter(|s| s.status == SuggestionStatus::Pending)
    }

    pub fn by_kind(&self, kind: SuggestionKind) -> impl Iterator<Item = &Suggestion> {
        self.suggestions.iter().filter(move |s| s.kind == kind)
    }

    fn pending_mut(&mut self, id: usize) -> Result<&mut Suggestion, SuggestionError> {
        let s = self
            .suggestions
            .get_mut(id)
            .ok_or(SuggestionError::NotFound(id))?;
        if s.status != SuggestionStatus::Pending {
            return Err(SuggestionError::AlreadyResolved {
                id,
                status: s.status,
            });
        }
        Ok(s)
    }

    pub fn accept(&mut self, id: usize) -> Result<(), SuggestionError> {
        self.pending_mut(id)?;

        let Some(span) = self.span_of(id) else {
            return Err(SuggestionError::NotInSource {
                id,
                original: self.suggestions[id].original.clone(),
            });
        };

        let conflict = self
            .suggestions
            .iter()
            .filter(|s| s.status == SuggestionStatus::Accepted)
            .find(|s| {
                self.span_of(s.id)
                    .is_some_and(|other| overlaps(&other, &span))
            });
        if let Some(other) = conflict {
            return Err(SuggestionError::Conflict {
                id,
                other: other.id,
            });
        }

        self.suggestions[id].status = SuggestionStatus::Accepted;
        Ok(())
    }

    pub fn reject(&mut self, id: usize) -> Result<(), SuggestionError> {
        self.pending_mut(id)?.status = SuggestionStatus::Rejected;
        Ok(())
    }

    /// Accept every pending suggestion (optionally of one kind) in id order.
    /// Suggestions that cannot be accepted stay pending and are returned
    /// with the reason.
    pub fn accept_all_pending(
        &mut self,
        kind: Option<SuggestionKind>,
    ) -> Vec<SuggestionError> {
        let ids: Vec<usize> = self
            .pending()
            .filter(|s| kind.map_or(true, |k| s.kind == k))
            .map(|s| s.id)
            .collect();

        ids.into_iter()
            .filter_map(|id| self.accept(id).err())
            .collect()
    }

    /// The source text with every accepted suggestion applied.
    #[must_use]
    pub fn apply(&self) -> String {
        let mut edits: Vec<(Range<usize>, &str)> = self
            .suggestions
            .iter()
            .filter(|s| s.status == SuggestionStatus::Accepted)
            .filter_map(|s| self.span_of(s.id).map(|span| (span, s.suggestion.as_str())))
            .collect();
        edits.sort_by_key(|(span, _)| span.start);

        let mut out = String::with_capacity(self.source.len());
        let mut cursor = 0;
        for (span, replacement) in edits {
            out.push_str(&self.source[cursor..span.start]);
            out.push_str(replacement);
            cursor = span.end;
        }
        out.push_str(&self.source[cursor..]);
        out
    }
}

fn overlaps(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start < b.end && b.start < a.end
}

/// First occurrence of `original` clear of every span in `taken`, or the first
/// occurrence at all when each one is claimed.
fn anchor(source: &str, original: &str, taken: &[Option<Range<usize>>]) -> Option<Range<usize>> {
    if original.is_empty() {
        return None;
    }

    let mut first = None;
    for (start, _) in source.match_indices(original) {
        let span = start..start + original.len();
        if !taken.iter().flatten().any(|t| overlaps(t, &span)) {
            return Some(span);
        }
        first.get_or_insert(span);
    }
    first
}
