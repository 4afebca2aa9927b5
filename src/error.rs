use thiserror::Error;

/// What is wrong with a script line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    #[error("expected exactly one '|' between condition and tag, found {0} components")]
    ComponentCount(usize),
    #[error("condition text is empty")]
    EmptyCondition,
    #[error("tag label is empty")]
    EmptyTag,
    #[error("empty condition element")]
    EmptyElement,
    #[error("spec '{0}' does not start with '@'")]
    MissingAspects(String),
    #[error("spec '{0}' has no ':' value list")]
    MissingValues(String),
    #[error("unknown aspect '{0}'")]
    UnknownAspect(String),
    #[error("invalid affix flags '{0}' (expected any of {{x}}, {{t}}, {{*}})")]
    AffixFlags(String),
    #[error("affix flags on non-affix aspect '{0}'")]
    FlagsOnPlainAspect(String),
    #[error("{0} aspects but {1} values")]
    Arity(usize, usize),
    #[error("the first element may not be optional")]
    OptionalFirst,
    #[error("the last element may not be optional")]
    OptionalLast,
    #[error("affix aspect {0} may not be the leading aspect of a spec")]
    LeadingAffix(&'static str),
    #[error("affix aspect {0} is not allowed in a reject spec")]
    AffixInReject(&'static str),
    #[error("element already carries a {0} affix")]
    DuplicateAffix(&'static str),
    #[error("unbalanced optional brackets in '{0}'")]
    Brackets(String),
    #[error("escape character at end of line")]
    DanglingEscape,
}

/// A script line that failed to compile.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}{} in script \"{script}\"", .line.map(|l| format!(" (line {l})")).unwrap_or_default())]
pub struct ParseError {
    pub kind: ParseErrorKind,
    /// 1-based line number when the line came from a multi-line script.
    pub line: Option<usize>,
    pub script: String,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, script: impl Into<String>) -> Self {
        ParseError { kind, line: None, script: script.into() }
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }
}

/// Failures reported by a [`crate::PatternLibrary`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("invalid affix pattern '{pattern}': {message}")]
    Invalid { pattern: String, message: String },
    #[error("pattern library failure: {0}")]
    Library(String),
}

#[derive(Error, Debug)]
pub enum TaggerError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Pattern(#[from] PatternError),
    #[error("Misconfigured tagger: {0}")]
    Misconfigured(String),
    #[error("token at position {position} carries index {index}")]
    TokenIndex { position: usize, index: usize },
}

pub type Result<T> = std::result::Result<T, TaggerError>;
