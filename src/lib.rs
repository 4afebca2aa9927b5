//! Rockwell: a rule-based annotation engine for tokenized sentences.
//!
//! Rules are written in *Rockwell script*, one rule per line:
//!
//! ```text
//! @lemma :buy ; @pos :NN1 | purchase_noun
//! ```
//!
//! A line is compiled into an accepting condition (plus optional rejecting
//! conditions after `/`), every condition of a script is numbered into one
//! shared automaton, and a per-sentence NFA interpreter walks the tokens
//! against it. Completed accepting states that are not vetoed by a rejecting
//! state become [`Tag`]s.
//!
//! # Example
//! ```
//! use rockwell::{Sentence, Tagger, Token};
//!
//! let tagger = Tagger::from_script("@pos :NN0 | noun_tag").unwrap();
//! let sentence = Sentence::new(0, vec![Token::new("cat", 0).with_pos("NN0")]);
//! let tags = tagger.tag(&sentence).unwrap();
//! assert_eq!(tags.len(), 1);
//! assert_eq!((tags[0].start, tags[0].end), (0, 0));
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

#[macro_use]
mod macros;
mod api;
mod engine;
pub mod error;
pub mod library;
pub mod script;


pub use api::{Options, Tagger, TaggerBuilder};
pub use engine::{ConditionGraph, TagMetrics, TagRun, TriggerInfo};
pub use error::{ParseError, ParseErrorKind, PatternError, Result, TaggerError};
pub use library::{Anchor, PatternLibrary, RegexLibrary, Span};
pub use script::{Rule, ScriptParser};

/// Automaton state number. `0` is the global initial state, `-1` the final
/// sentinel; every other value is allocated by the graph compiler.
pub type StateCode = i32;

pub const INITIAL_STATE: StateCode = 0;
pub const FINAL_STATE_CODE: StateCode = -1;

/// Cap on consecutive tokens a single state may capture through quodlibet
/// (Kleene) elements.
pub const MAX_OPTIONAL: usize = 10;

/// Separator between aspect and value in a matching key.
pub const KEY_DELIMITER: char = ':';

/// Value of the Kleene element (`@quodlibet :*`).
pub const QUODLIBET_VALUE: &str = "*";

// --- Tokens -------------------------------------------------------------------

/// An indivisible unit of input.
///
/// A token with `alternatives` is ambiguous: each alternative is one competing
/// reading (lemma/part-of-speech) of the same surface form, and together they
/// are the complete set of readings. A token with `roles` or `constituents`
/// is a *semtoken*, standing for an already recognised span.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Token {
    pub word: String,
    pub cain: String,
    pub lemma: Option<String>,
    pub pos: Option<String>,
    pub pos_type: Option<String>,
    pub index: usize,
    pub alternatives: Vec<Token>,
    pub roles: BTreeSet<String>,
    pub constituents: Vec<Token>,
}

impl Token {
    pub fn new(word: impl Into<String>, index: usize) -> Self {
        let word = word.into();
        let cain = word.to_lowercase();
        Token { word, cain, index, ..Token::default() }
    }

    /// Build a semtoken replacing `constituents`. The surface form is the
    /// constituents' words joined by spaces.
    pub fn semantic<I, S>(index: usize, constituents: Vec<Token>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let word = constituents.iter().map(|t| t.word.as_str()).collect::<Vec<_>>().join(" ");
        let mut token = Token::new(word, index);
        token.roles = roles.into_iter().map(|r| r.as_ref().to_lowercase()).collect();
        token.constituents = constituents;
        token
    }

    pub fn with_lemma(mut self, lemma: impl Into<String>) -> Self {
        self.lemma = Some(lemma.into());
        self
    }

    pub fn with_pos(mut self, pos: impl Into<String>) -> Self {
        self.pos = Some(pos.into());
        self
    }

    pub fn with_type(mut self, pos_type: impl Into<String>) -> Self {
        self.pos_type = Some(pos_type.into());
        self
    }

    pub fn with_role(mut self, role: impl AsRef<str>) -> Self {
        self.roles.insert(role.as_ref().to_lowercase());
        self
    }

    /// Append a competing reading. The first reading added also fills in the
    /// token's own lemma/pos when those are unset.
    pub fn with_reading(mut self, lemma: impl Into<String>, pos: impl Into<String>) -> Self {
        let lemma = lemma.into();
        let pos = pos.into();
        if self.lemma.is_none() && self.pos.is_none() {
            self.lemma = Some(lemma.clone());
            self.pos = Some(pos.clone());
        }
        let reading = Token {
            word: self.word.clone(),
            cain: self.cain.clone(),
            lemma: Some(lemma),
            pos: Some(pos),
            pos_type: self.pos_type.clone(),
            index: self.index,
            alternatives: Vec::new(),
            roles: self.roles.clone(),
            constituents: Vec::new(),
        };
        self.alternatives.push(reading);
        self
    }

    pub fn is_semantic(&self) -> bool {
        !self.roles.is_empty() || !self.constituents.is_empty()
    }

    /// Readings the matcher runs over: the alternatives when there are any,
    /// otherwise the token itself.
    pub fn readings(&self) -> &[Token] {
        if self.alternatives.is_empty() { std::slice::from_ref(self) } else { &self.alternatives }
    }

    /// Value of a single-valued aspect on this token.
    pub fn attribute(&self, aspect: Aspect) -> Option<&str> {
        match aspect {
            Aspect::Verbatim => Some(&self.word),
            Aspect::Cain => Some(&self.cain),
            Aspect::Lemma => self.lemma.as_deref(),
            Aspect::Pos => self.pos.as_deref(),
            Aspect::Type => self.pos_type.as_deref(),
            Aspect::Quodlibet => Some(QUODLIBET_VALUE),
            Aspect::Role | Aspect::Prefix | Aspect::Infix | Aspect::Suffix => None,
        }
    }
}

/// A tokenized sentence handed to the tagger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sentence {
    pub id: usize,
    pub tokens: Vec<Token>,
}

impl Sentence {
    pub fn new(id: usize, tokens: Vec<Token>) -> Self {
        Sentence { id, tokens }
    }

    /// Whitespace-split `text` into bare tokens (no lemma or pos).
    pub fn from_words(id: usize, text: &str) -> Self {
        let tokens = text.split_whitespace().enumerate().map(|(i, w)| Token::new(w, i)).collect();
        Sentence { id, tokens }
    }
}

// --- Matching specs -------------------------------------------------------------

/// Which property of a token a spec checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Aspect {
    Verbatim,
    Cain,
    Lemma,
    Pos,
    Type,
    Quodlibet,
    Prefix,
    Infix,
    Suffix,
    Role,
}

impl Aspect {
    pub const ALL: [Aspect; 10] = [
        Aspect::Verbatim,
        Aspect::Cain,
        Aspect::Lemma,
        Aspect::Pos,
        Aspect::Type,
        Aspect::Quodlibet,
        Aspect::Prefix,
        Aspect::Infix,
        Aspect::Suffix,
        Aspect::Role,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Aspect::Verbatim => "VERBATIM",
            Aspect::Cain => "CAIN",
            Aspect::Lemma => "LEMMA",
            Aspect::Pos => "POS",
            Aspect::Type => "TYPE",
            Aspect::Quodlibet => "QUODLIBET",
            Aspect::Prefix => "PREFIX",
            Aspect::Infix => "INFIX",
            Aspect::Suffix => "SUFFIX",
            Aspect::Role => "ROLE",
        }
    }

    /// Case-insensitive lookup by name.
    pub fn from_name(name: &str) -> Option<Aspect> {
        Aspect::ALL.into_iter().find(|a| a.name().eq_ignore_ascii_case(name))
    }

    pub const fn is_affix(self) -> bool {
        matches!(self, Aspect::Prefix | Aspect::Infix | Aspect::Suffix)
    }
}

impl fmt::Display for Aspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An `(aspect, value)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatchingSpec {
    pub aspect: Aspect,
    pub value: String,
}

impl MatchingSpec {
    pub fn new(aspect: Aspect, value: impl Into<String>) -> Self {
        MatchingSpec { aspect, value: value.into() }
    }

    /// Automaton lookup key, e.g. `LEMMA:buy`.
    pub fn key(&self) -> String {
        format!("{}{}{}", self.aspect, KEY_DELIMITER, self.value)
    }

    /// Whether `token` satisfies this spec. Missing attributes never match.
    pub fn holds(&self, token: &Token) -> bool {
        match self.aspect {
            Aspect::Role => token.roles.contains(&self.value),
            Aspect::Quodlibet => true,
            aspect => token.attribute(aspect) == Some(self.value.as_str()),
        }
    }
}

bitflags::bitflags! {
    /// Modifiers of an affix, written `{x}`, `{t}` and `{*}` after the
    /// affix aspect.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct AffixFlags: u8 {
        /// The anchor token is part of the affix region.
        const INCLUSIVE = 1 << 0;
        /// The pattern must cover the whole affix region.
        const COMPLETE  = 1 << 1;
        /// A missing or non-matching affix still passes.
        const OPTIONAL  = 1 << 2;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AffixPosition {
    Prefix,
    Infix,
    Suffix,
}

impl AffixPosition {
    pub fn from_aspect(aspect: Aspect) -> Option<AffixPosition> {
        match aspect {
            Aspect::Prefix => Some(AffixPosition::Prefix),
            Aspect::Infix => Some(AffixPosition::Infix),
            Aspect::Suffix => Some(AffixPosition::Suffix),
            _ => None,
        }
    }
}

/// A secondary sub-pattern anchored before, between or after a match. The
/// pattern text is interpreted by the [`PatternLibrary`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Affix {
    pub position: AffixPosition,
    pub pattern: String,
    pub flags: AffixFlags,
}

impl Affix {
    pub fn new(position: AffixPosition, pattern: impl Into<String>) -> Self {
        Affix { position, pattern: pattern.into(), flags: AffixFlags::empty() }
    }

    pub fn with_flags(mut self, flags: AffixFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn is_inclusive(&self) -> bool {
        self.flags.contains(AffixFlags::INCLUSIVE)
    }

    pub fn is_complete(&self) -> bool {
        self.flags.contains(AffixFlags::COMPLETE)
    }

    pub fn is_optional(&self) -> bool {
        self.flags.contains(AffixFlags::OPTIONAL)
    }
}

// --- Conditions -----------------------------------------------------------------

/// One token-matching step of a condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionElement {
    pub spec: MatchingSpec,
    pub prefix: Option<Affix>,
    pub infix: Option<Affix>,
    pub suffix: Option<Affix>,
    /// Specs that must all hold besides `spec`.
    pub additional: Vec<MatchingSpec>,
    /// Specs of which none may hold.
    pub rejects: Vec<MatchingSpec>,
    pub quodlibet: bool,
    pub state_in: StateCode,
    pub state_out: StateCode,
}

impl ConditionElement {
    pub fn new(spec: MatchingSpec) -> Self {
        ConditionElement {
            spec,
            prefix: None,
            infix: None,
            suffix: None,
            additional: Vec::new(),
            rejects: Vec::new(),
            quodlibet: false,
            state_in: INITIAL_STATE,
            state_out: FINAL_STATE_CODE,
        }
    }

    /// The Kleene element `@quodlibet :*`.
    pub fn kleene() -> Self {
        let mut element = ConditionElement::new(MatchingSpec::new(Aspect::Quodlibet, QUODLIBET_VALUE));
        element.quodlibet = true;
        element
    }

    pub fn has_affix(&self) -> bool {
        self.prefix.is_some() || self.infix.is_some() || self.suffix.is_some()
    }

    /// Additional and rejecting specs against one token reading. The primary
    /// spec is not re-checked: it already selected this element by key.
    pub fn admits(&self, token: &Token) -> bool {
        self.additional.iter().all(|s| s.holds(token)) && !self.rejects.iter().any(|s| s.holds(token))
    }
}

/// Arena index of a compiled condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConditionId(pub(crate) u32);

impl ConditionId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ConditionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionKind {
    /// Emits `tag` unless vetoed by one of `rejected_by`.
    Accepting { tag: String, rejected_by: Vec<ConditionId> },
    /// Vetoes matches of `rejects`.
    Rejecting { rejects: ConditionId },
}

/// A compiled condition: its elements carry assigned automaton states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub id: ConditionId,
    pub elements: Vec<ConditionElement>,
    pub script: Arc<str>,
    pub kind: ConditionKind,
}

impl Condition {
    pub fn is_accepting(&self) -> bool {
        matches!(self.kind, ConditionKind::Accepting { .. })
    }

    /// The accepting condition this one vetoes, if it is a rejecting one.
    pub fn rejects(&self) -> Option<ConditionId> {
        match self.kind {
            ConditionKind::Rejecting { rejects } => Some(rejects),
            ConditionKind::Accepting { .. } => None,
        }
    }
}

// --- Output ---------------------------------------------------------------------

/// A labeled span emitted by the tagger. `start` and `end` are inclusive
/// token indices.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag {
    pub tag: String,
    pub script: String,
    pub start: usize,
    pub end: usize,
    pub sentence_id: usize,
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}..{}]", self.tag, self.start, self.end)
    }
}
