use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, debug_span};

use crate::engine::{self, ConditionGraph, Processor, State, TagMetrics, TagRun, TriggerInfo};
use crate::error::{Result, TaggerError};
use crate::library::{PatternLibrary, RegexLibrary};
use crate::script::{Rule, ScriptParser};
use crate::{MAX_OPTIONAL, Sentence, Tag};

/// Options that affect matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Cap on consecutive quodlibet captures per state.
    pub max_optional: usize,
    /// Jump the cursor past completed accepting matches.
    pub cursor_skip: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options { max_optional: MAX_OPTIONAL, cursor_skip: true }
    }
}

/// Compiled script plus everything needed to tag sentences with it.
///
/// A `Tagger` is immutable once built and can be shared across threads; each
/// call to [`Tagger::tag`] runs a fresh per-sentence processor.
pub struct Tagger {
    graph: ConditionGraph,
    library: Arc<dyn PatternLibrary>,
    options: Options,
}

impl fmt::Debug for Tagger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tagger")
            .field("conditions", &self.graph.len())
            .field("states", &self.graph.state_count())
            .field("library", &self.library)
            .field("options", &self.options)
            .finish()
    }
}

impl Tagger {
    pub fn builder() -> TaggerBuilder {
        TaggerBuilder::default()
    }

    /// Compile `script` with default options and the default pattern library.
    pub fn from_script(script: &str) -> Result<Self> {
        Tagger::builder().script(script).build()
    }

    pub fn graph(&self) -> &ConditionGraph {
        &self.graph
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Tag one sentence.
    pub fn tag(&self, sentence: &Sentence) -> Result<Vec<Tag>> {
        self.tag_with_metrics(sentence).map(|run| run.tags)
    }

    /// Tag one sentence and report what the automaton did.
    ///
    /// ```text
    /// scan triggers ─▶ consume(position) ─▶ cursor skip? ─▶ ... ─▶ emit
    /// ```
    pub fn tag_with_metrics(&self, sentence: &Sentence) -> Result<TagRun> {
        let _span = debug_span!("tag", sentence = sentence.id).entered();
        let started = Instant::now();
        check_indices(sentence)?;

        let tokens = &sentence.tokens;
        let trigger = TriggerInfo::scan(&self.graph, tokens);
        let Some(first) = trigger.first() else {
            debug!(tokens = tokens.len(), "no trigger hits");
            let metrics = TagMetrics { total: started.elapsed(), tokens: tokens.len(), skipped: tokens.len(), ..TagMetrics::default() };
            return Ok(TagRun { tags: Vec::new(), metrics });
        };

        let mut processor = Processor::new(&self.graph, self.library.as_ref(), tokens, self.options.max_optional);
        let mut consumed = 0;
        let mut skipped = first;
        let mut position = first;
        while position < tokens.len() {
            processor.consume(position)?;
            consumed += 1;
            if self.options.cursor_skip {
                if let Some(target) = skip_target(processor.live(), processor.completed()).filter(|&t| t > position) {
                    debug!(from = position, to = target, live = processor.live().len(), "cursor skip");
                    for jumped in position + 1..=target {
                        if processor.live().is_empty() {
                            break;
                        }
                        processor.pass(jumped)?;
                    }
                    skipped += target - position;
                    position = target;
                }
            }
            position += 1;
        }

        let (completed, mut metrics) = processor.into_parts();
        let (tags, rejected) = engine::emit(&self.graph, sentence.id, &completed);
        metrics.tokens = tokens.len();
        metrics.consumed = consumed;
        metrics.skipped = skipped;
        metrics.rejected = rejected;
        metrics.total = started.elapsed();
        debug!(tags = tags.len(), rejected, completed = completed.len(), "sentence tagged");
        Ok(TagRun { tags, metrics })
    }
}

/// Furthest last-token index among completed accepting matches, or `None`
/// when a live rejecting state still targets one of them: that state may need
/// the tokens a skip would jump over.
fn skip_target(live: &[State<'_>], completed: &[State<'_>]) -> Option<usize> {
    let mut target = None;
    for accepted in completed.iter().filter(|s| s.rejects.is_none()) {
        if live.iter().any(|s| s.rejects == Some(accepted.condition)) {
            return None;
        }
        target = target.max(Some(accepted.end()));
    }
    target
}

fn check_indices(sentence: &Sentence) -> Result<()> {
    for (position, token) in sentence.tokens.iter().enumerate() {
        if let Some(bad) = std::iter::once(token).chain(&token.alternatives).find(|t| t.index != position) {
            return Err(TaggerError::TokenIndex { position, index: bad.index });
        }
    }
    Ok(())
}

/// Assembles a [`Tagger`] from script text, options and a pattern library.
#[derive(Default)]
pub struct TaggerBuilder {
    scripts: Vec<String>,
    rules: Vec<Rule>,
    options: Options,
    library: Option<Arc<dyn PatternLibrary>>,
}

impl TaggerBuilder {
    /// Add script text (one rule per line). May be called repeatedly.
    pub fn script(mut self, script: impl Into<String>) -> Self {
        self.scripts.push(script.into());
        self
    }

    /// Add an already parsed rule.
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    pub fn max_optional(mut self, max_optional: usize) -> Self {
        self.options.max_optional = max_optional;
        self
    }

    pub fn cursor_skip(mut self, cursor_skip: bool) -> Self {
        self.options.cursor_skip = cursor_skip;
        self
    }

    /// Use `library` for affix patterns instead of [`RegexLibrary`].
    pub fn library(mut self, library: Arc<dyn PatternLibrary>) -> Self {
        self.library = Some(library);
        self
    }

    /// Parse, compile and vet the script. Fails on the first malformed line,
    /// on an affix pattern the library rejects, or when there is nothing to
    /// tag with.
    pub fn build(self) -> Result<Tagger> {
        let mut rules = Vec::new();
        for script in &self.scripts {
            rules.extend(ScriptParser::parse_script(script)?);
        }
        rules.extend(self.rules);
        if rules.is_empty() {
            return Err(TaggerError::Misconfigured("no rules were given to compile".into()));
        }

        let graph = ConditionGraph::compile(&rules);
        let library = self.library.unwrap_or_else(|| Arc::new(RegexLibrary::default()));
        graph.check_affixes(library.as_ref())?;

        Ok(Tagger { graph, library, options: self.options })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Token;

    #[test]
    fn builder_without_rules_is_misconfigured() {
        let err = Tagger::builder().script("# nothing here\n\n").build().unwrap_err();
        assert!(matches!(err, TaggerError::Misconfigured(_)));
    }

    #[test]
    fn builder_reports_script_errors() {
        let err = Tagger::builder().script("@pos :NN0 | a").script("@pos :NN0").build().unwrap_err();
        match err {
            TaggerError::Parse(parse) => assert_eq!(parse.line, Some(1)),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn builder_vets_affix_patterns() {
        let err = Tagger::from_script("@cain+suffix :a+(oops | t").unwrap_err();
        assert!(matches!(err, TaggerError::Pattern(_)));
    }

    #[test]
    fn builder_accepts_parsed_rules_and_options() {
        let rule = ScriptParser::parse_line("@pos :NN0 | n").unwrap();
        let tagger = Tagger::builder().rule(rule).max_optional(3).cursor_skip(false).build().unwrap();
        assert_eq!(tagger.options(), &Options { max_optional: 3, cursor_skip: false });
        assert_eq!(tagger.graph().len(), 1);
    }

    #[test]
    fn misnumbered_tokens_are_rejected() {
        let tagger = Tagger::from_script("@pos :NN0 | n").unwrap();
        let sentence = Sentence::new(0, vec![Token::new("a", 0), Token::new("b", 5)]);
        let err = tagger.tag(&sentence).unwrap_err();
        assert!(matches!(err, TaggerError::TokenIndex { position: 1, index: 5 }));
    }

    #[test]
    fn sentences_without_triggers_are_not_run() {
        let tagger = Tagger::from_script("@pos :NN0 | n").unwrap();
        let run = tagger.tag_with_metrics(&Sentence::from_words(3, "nothing to see")).unwrap();
        assert!(run.tags.is_empty());
        assert_eq!(run.metrics.consumed, 0);
        assert_eq!(run.metrics.skipped, 3);
    }

    #[test]
    fn tagger_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Tagger>();
    }
}
