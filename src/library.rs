//! Affix sub-matching boundary.
//!
//! The engine does not interpret affix patterns itself. It hands the tokens of
//! a candidate affix region to a [`PatternLibrary`] together with the
//! [`Anchor`] the match has to touch, and gets back the matched sub-range of
//! that region (or nothing). Inclusive/complete/optional flags are mapped onto
//! the region and the anchor by the caller; libraries never see them.
//!
//! [`RegexLibrary`] is the library used when none is configured: an affix
//! pattern is a regular expression over the tokens' text joined by single
//! spaces, and matches are always aligned to token boundaries.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use regex::Regex;

use crate::error::PatternError;
use crate::{Affix, Aspect, Token};

/// Which boundary of the candidate list a match must touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Anchor {
    /// The match starts at the first candidate token.
    Start,
    /// The match ends at the last candidate token.
    End,
    /// The match covers every candidate token.
    Both,
    /// The match may sit anywhere in the list.
    Anywhere,
}

impl Anchor {
    pub fn admits(self, span: Span, len: usize) -> bool {
        match self {
            Anchor::Start => span.start == 0,
            Anchor::End => span.end == len,
            Anchor::Both => span.start == 0 && span.end == len,
            Anchor::Anywhere => true,
        }
    }
}

/// Half-open range of positions within a candidate token list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// External sub-pattern matcher used to validate affixes.
pub trait PatternLibrary: Send + Sync + fmt::Debug {
    /// Find `affix.pattern` in `tokens`, touching `anchor`. Returns the
    /// matched range relative to `tokens`.
    fn find(&self, tokens: &[&Token], affix: &Affix, anchor: Anchor) -> Result<Option<Span>, PatternError>;

    /// Vet an affix pattern when a script is compiled.
    fn check(&self, _affix: &Affix) -> Result<(), PatternError> {
        Ok(())
    }
}

/// Regular-expression affix patterns over one token aspect (lowercased
/// `cain` forms unless configured otherwise).
///
/// Among the token ranges allowed by the anchor, the longest range whose text
/// matches the whole pattern wins; ties go to the leftmost.
#[derive(Debug)]
pub struct RegexLibrary {
    aspect: Aspect,
    cache: Mutex<HashMap<String, Arc<Regex>>>,
}

impl Default for RegexLibrary {
    fn default() -> Self {
        RegexLibrary::over(Aspect::Cain)
    }
}

impl RegexLibrary {
    /// Match patterns against `aspect` of each token. Tokens missing the
    /// attribute contribute an empty word.
    pub fn over(aspect: Aspect) -> Self {
        RegexLibrary { aspect, cache: Mutex::new(HashMap::new()) }
    }

    fn compiled(&self, pattern: &str) -> Result<Arc<Regex>, PatternError> {
        let mut cache = self.cache.lock().map_err(|_| PatternError::Library("regex cache poisoned".into()))?;
        if let Some(regex) = cache.get(pattern) {
            return Ok(regex.clone());
        }
        let regex = Regex::new(&format!("^(?:{pattern})$"))
            .map_err(|e| PatternError::Invalid { pattern: pattern.to_string(), message: e.to_string() })?;
        let regex = Arc::new(regex);
        cache.insert(pattern.to_string(), regex.clone());
        Ok(regex)
    }

    fn text<'t>(&self, token: &'t Token) -> &'t str {
        token.attribute(self.aspect).unwrap_or("")
    }
}

/// Token ranges of a list of `len` tokens allowed by `anchor`, longest first
/// and leftmost first within one length.
fn candidate_spans(len: usize, anchor: Anchor) -> Vec<Span> {
    match anchor {
        Anchor::Both => vec![Span::new(0, len)],
        Anchor::Start => (1..=len).rev().map(|end| Span::new(0, end)).collect(),
        Anchor::End => (0..len).map(|start| Span::new(start, len)).collect(),
        Anchor::Anywhere => (1..=len)
            .rev()
            .flat_map(|width| (0..=len - width).map(move |start| Span::new(start, start + width)))
            .collect(),
    }
}

impl PatternLibrary for RegexLibrary {
    fn find(&self, tokens: &[&Token], affix: &Affix, anchor: Anchor) -> Result<Option<Span>, PatternError> {
        if tokens.is_empty() {
            return Ok(None);
        }
        let regex = self.compiled(&affix.pattern)?;

        // One joined text per call; candidate ranges are byte slices of it.
        let mut text = String::new();
        let mut bounds = Vec::with_capacity(tokens.len());
        for token in tokens {
            if !bounds.is_empty() {
                text.push(' ');
            }
            let start = text.len();
            text.push_str(self.text(token));
            bounds.push((start, text.len()));
        }

        Ok(candidate_spans(tokens.len(), anchor)
            .into_iter()
            .find(|span| regex.is_match(&text[bounds[span.start].0..bounds[span.end - 1].1])))
    }

    fn check(&self, affix: &Affix) -> Result<(), PatternError> {
        self.compiled(&affix.pattern).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AffixPosition;

    fn tokens(text: &str) -> Vec<Token> {
        text.split_whitespace().enumerate().map(|(i, w)| Token::new(w, i)).collect()
    }

    fn find(text: &str, pattern: &str, anchor: Anchor) -> Option<Span> {
        let owned = tokens(text);
        let refs: Vec<&Token> = owned.iter().collect();
        RegexLibrary::default().find(&refs, &Affix::new(AffixPosition::Prefix, pattern), anchor).unwrap()
    }

    #[test]
    fn spans_honour_the_anchor() {
        assert_eq!(find("really very", "very", Anchor::End), Some(Span::new(1, 2)));
        assert_eq!(find("very really", "very", Anchor::End), None);
        assert_eq!(find("very really", "very", Anchor::Start), Some(Span::new(0, 1)));
        assert_eq!(find("not very good", "very", Anchor::Anywhere), Some(Span::new(1, 2)));
        assert_eq!(find("not very", "very", Anchor::Both), None);
        assert_eq!(find("not very", "not very", Anchor::Both), Some(Span::new(0, 2)));
    }

    #[test]
    fn prefers_the_longest_token_aligned_match() {
        assert_eq!(find("so very very", "(very ?)+", Anchor::End), Some(Span::new(1, 3)));
        // never matches part of a word
        assert_eq!(find("avery", "very", Anchor::End), None);
        // matching is done on lowercased forms
        assert_eq!(find("VERY", "very", Anchor::Both), Some(Span::new(0, 1)));
    }

    #[test]
    fn long_regions_are_matched_on_token_boundaries() {
        let mut text = vec!["filler"; 100].join(" ");
        text.push_str(" very very");
        assert_eq!(find(&text, "(very ?)+", Anchor::End), Some(Span::new(100, 102)));
        assert_eq!(find(&text, "filler very", Anchor::Anywhere), Some(Span::new(99, 101)));
        assert_eq!(find(&text, "ller very", Anchor::Anywhere), None);
    }

    #[test]
    fn empty_candidate_lists_never_match() {
        assert_eq!(find("", ".*", Anchor::Anywhere), None);
    }

    #[test]
    fn invalid_patterns_are_reported() {
        let library = RegexLibrary::default();
        let err = library.check(&Affix::new(AffixPosition::Suffix, "(unclosed")).unwrap_err();
        assert!(matches!(err, PatternError::Invalid { ref pattern, .. } if pattern == "(unclosed"));
    }

    #[test]
    fn other_aspects_can_be_matched() {
        let owned = vec![Token::new("The", 0).with_pos("AT0"), Token::new("cat", 1).with_pos("NN1")];
        let refs: Vec<&Token> = owned.iter().collect();
        let library = RegexLibrary::over(Aspect::Pos);
        let affix = Affix::new(AffixPosition::Prefix, "AT0 NN.");
        assert_eq!(library.find(&refs, &affix, Anchor::Both).unwrap(), Some(Span::new(0, 2)));
    }
}
