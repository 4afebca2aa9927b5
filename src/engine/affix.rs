//! Affix validation.
//!
//! An element may carry a prefix, an infix and a suffix. Each is validated
//! around the *anchor*, the sentence position the element itself matched:
//!
//! ```text
//!            prefix region        anchor       suffix region
//! tokens: [ t0  t1  ...  t(a-1) ] [ t(a) ] [ t(a+1) ... t(n-1) ]
//!                          infix region = trailing quodlibet captures
//!                                         of the state being advanced
//! ```
//!
//! Flags map onto the region handed to the pattern library:
//!
//! - *inclusive*: the anchor token joins the region (last for prefix and
//!   infix, first for suffix);
//! - *complete*: the match must cover the whole region (`Anchor::Both`);
//!   otherwise a prefix must end at the anchor side, a suffix must start
//!   there and an infix may sit anywhere;
//! - *optional*: an empty region or a failed match passes with no tokens.

use crate::error::PatternError;
use crate::library::{Anchor, PatternLibrary};
use crate::{Affix, AffixPosition, ConditionElement, Token};

#[derive(Debug, Clone, Copy)]
pub(crate) struct AffixResolver<'l> {
    library: &'l dyn PatternLibrary,
}

impl<'l> AffixResolver<'l> {
    pub(crate) fn new(library: &'l dyn PatternLibrary) -> Self {
        AffixResolver { library }
    }

    /// Validate every affix of `element` anchored at `anchor`. On success
    /// returns the affix tokens to fold into the state's match history.
    pub(crate) fn validate<'s>(
        &self,
        element: &ConditionElement,
        sentence: &'s [Token],
        anchor: usize,
        infix_region: &[&'s Token],
    ) -> Result<Option<Vec<&'s Token>>, PatternError> {
        let mut folded = Vec::new();
        let affixes = [&element.prefix, &element.infix, &element.suffix];
        for affix in affixes.into_iter().flatten() {
            match self.resolve(affix, sentence, anchor, infix_region)? {
                Some(tokens) => folded.extend(tokens),
                None => return Ok(None),
            }
        }
        Ok(Some(folded))
    }

    /// Validate one affix. `None` means the affix failed.
    pub(crate) fn resolve<'s>(
        &self,
        affix: &Affix,
        sentence: &'s [Token],
        anchor: usize,
        infix_region: &[&'s Token],
    ) -> Result<Option<Vec<&'s Token>>, PatternError> {
        let anchor_token = &sentence[anchor];
        let (region, boundary): (Vec<&'s Token>, Anchor) = match affix.position {
            AffixPosition::Prefix => {
                let end = if affix.is_inclusive() { anchor + 1 } else { anchor };
                (sentence[..end].iter().collect(), Anchor::End)
            }
            AffixPosition::Suffix => {
                let start = if affix.is_inclusive() { anchor } else { anchor + 1 };
                (sentence[start.min(sentence.len())..].iter().collect(), Anchor::Start)
            }
            AffixPosition::Infix => {
                let mut region = infix_region.to_vec();
                if affix.is_inclusive() {
                    region.push(anchor_token);
                }
                (region, Anchor::Anywhere)
            }
        };
        let boundary = if affix.is_complete() { Anchor::Both } else { boundary };

        let found = if region.is_empty() { None } else { self.library.find(&region, affix, boundary)? };
        match found {
            Some(span) if span.is_empty() || span.end > region.len() || !boundary.admits(span, region.len()) => {
                Err(PatternError::Library(format!(
                    "span {}..{} does not fit {:?} in a region of {} tokens",
                    span.start,
                    span.end,
                    boundary,
                    region.len()
                )))
            }
            Some(span) => Ok(Some(region[span.start..span.end].to_vec())),
            None if affix.is_optional() => Ok(Some(Vec::new())),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::{RegexLibrary, Span};
    use crate::{AffixFlags, Aspect, MatchingSpec};

    fn sentence(text: &str) -> Vec<Token> {
        text.split_whitespace().enumerate().map(|(i, w)| Token::new(w, i)).collect()
    }

    fn indices(tokens: Option<Vec<&Token>>) -> Option<Vec<usize>> {
        tokens.map(|ts| ts.iter().map(|t| t.index).collect())
    }

    fn resolve(text: &str, affix: Affix, anchor: usize, infix: &[usize]) -> Option<Vec<usize>> {
        let library = RegexLibrary::default();
        let resolver = AffixResolver::new(&library);
        let tokens = sentence(text);
        let region: Vec<&Token> = infix.iter().map(|&i| &tokens[i]).collect();
        indices(resolver.resolve(&affix, &tokens, anchor, &region).unwrap())
    }

    #[test]
    fn prefix_must_touch_the_anchor() {
        let very = Affix::new(AffixPosition::Prefix, "very");
        assert_eq!(resolve("a very big cat", very.clone(), 2, &[]), Some(vec![1]));
        assert_eq!(resolve("very a big cat", very.clone(), 2, &[]), None);
        assert_eq!(resolve("very big", very, 0, &[]), None);
    }

    #[test]
    fn inclusive_prefix_covers_the_anchor() {
        let affix = Affix::new(AffixPosition::Prefix, "very big").with_flags(AffixFlags::INCLUSIVE);
        assert_eq!(resolve("a very big cat", affix, 2, &[]), Some(vec![1, 2]));
    }

    #[test]
    fn complete_affix_covers_the_region() {
        let affix = Affix::new(AffixPosition::Suffix, "at all").with_flags(AffixFlags::COMPLETE);
        assert_eq!(resolve("not at all", affix.clone(), 0, &[]), Some(vec![1, 2]));
        assert_eq!(resolve("not at all really", affix, 0, &[]), None);
    }

    #[test]
    fn optional_affix_passes_without_tokens() {
        let affix = Affix::new(AffixPosition::Suffix, "now").with_flags(AffixFlags::OPTIONAL);
        assert_eq!(resolve("buy it", affix.clone(), 1, &[]), Some(vec![]));
        assert_eq!(resolve("buy now", affix, 0, &[]), Some(vec![1]));
    }

    #[test]
    fn infix_only_sees_the_given_region() {
        let affix = Affix::new(AffixPosition::Infix, "very");
        assert_eq!(resolve("not very good", affix.clone(), 2, &[1]), Some(vec![1]));
        assert_eq!(resolve("very not good", affix.clone(), 2, &[1]), None);
        assert_eq!(resolve("not very good", affix, 2, &[]), None);
    }

    #[test]
    fn element_validation_folds_every_affix() {
        let library = RegexLibrary::default();
        let resolver = AffixResolver::new(&library);
        let tokens = sentence("irritation at all");
        let mut element = ConditionElement::new(MatchingSpec::new(Aspect::Cain, "at"));
        element.prefix = Some(Affix::new(AffixPosition::Prefix, "irritation"));
        element.suffix = Some(Affix::new(AffixPosition::Suffix, "all"));
        assert_eq!(indices(resolver.validate(&element, &tokens, 1, &[]).unwrap()), Some(vec![0, 2]));

        element.suffix = Some(Affix::new(AffixPosition::Suffix, "none"));
        assert_eq!(indices(resolver.validate(&element, &tokens, 1, &[]).unwrap()), None);
    }

    #[derive(Debug)]
    struct Misplaced;

    impl PatternLibrary for Misplaced {
        fn find(&self, _: &[&Token], _: &Affix, _: Anchor) -> Result<Option<Span>, PatternError> {
            Ok(Some(Span::new(0, 1)))
        }
    }

    #[test]
    fn spans_off_the_anchor_are_library_errors() {
        let resolver = AffixResolver::new(&Misplaced);
        let tokens = sentence("a b c");
        let affix = Affix::new(AffixPosition::Prefix, "x");
        let err = resolver.resolve(&affix, &tokens, 2, &[]).unwrap_err();
        assert!(matches!(err, PatternError::Library(_)));
    }
}
