//! Rockwell script parsing.
//!
//! A script line holds one accepting expression, any number of rejecting
//! expressions and a tag label:
//!
//! ```text
//! <accepting-expr> ["/" <rejecting-expr>]* "|" <tag-label>
//! <expr>     ::= <element> (";" <element>)*
//! <element>  ::= ["["] <spec> ("\" <spec>)* ["]"]
//! <spec>     ::= "@" <aspect>("+"<aspect>)* " :" <value>("+"<value>)*
//! ```
//!
//! The first aspect of the primary spec is what the element is looked up by;
//! further aspects are either affixes (`prefix`, `infix`, `suffix`, each
//! optionally followed by `{x}`, `{t}`, `{*}`) or additional required specs.
//! Specs after `\` reject the element when any of them holds.
//!
//! `^X` protects a delimiter `X` inside a value. The line is encoded once
//! before splitting (every escaped character becomes a private-use
//! placeholder) and values are decoded when they are read back.
//!
//! The parser only builds element lists; automaton states are assigned later
//! by the graph compiler.

use std::sync::Arc;

use crate::error::{ParseError, ParseErrorKind};
use crate::{Affix, AffixFlags, AffixPosition, Aspect, ConditionElement, MatchingSpec, QUODLIBET_VALUE};

const ESCAPE: char = '^';
const COMPONENT_DELIMITER: char = '|';
const CONDITION_DELIMITER: char = '/';
const ELEMENT_DELIMITER: char = ';';
const REJECT_DELIMITER: char = '\\';
const LIST_DELIMITER: char = '+';
const ASPECT_MARKER: char = '@';
const VALUE_MARKER: char = ':';
const COMMENT_MARKER: char = '#';

/// First code point of the placeholder range used for escaped characters.
const PLACEHOLDER_BASE: u32 = 0xE000;

type ParseResult<T> = std::result::Result<T, ParseErrorKind>;

/// One parsed script line: an accepting expression, the rejecting
/// expressions that may veto it, and the label it emits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub script: Arc<str>,
    pub tag: String,
    pub accepting: Vec<ConditionElement>,
    pub rejecting: Vec<Vec<ConditionElement>>,
}

/// Escaped characters of a single line, indexed by placeholder offset.
#[derive(Debug, Default)]
struct EscapeTable {
    escaped: Vec<char>,
}

impl EscapeTable {
    fn encode(line: &str) -> ParseResult<(String, EscapeTable)> {
        let mut table = EscapeTable::default();
        let mut encoded = String::with_capacity(line.len());
        let mut chars = line.chars();
        while let Some(c) = chars.next() {
            if c != ESCAPE {
                encoded.push(c);
                continue;
            }
            let protected = chars.next().ok_or(ParseErrorKind::DanglingEscape)?;
            let slot = match table.escaped.iter().position(|&e| e == protected) {
                Some(slot) => slot,
                None => {
                    table.escaped.push(protected);
                    table.escaped.len() - 1
                }
            };
            encoded.push(table.placeholder(slot));
        }
        Ok((encoded, table))
    }

    fn placeholder(&self, slot: usize) -> char {
        char::from_u32(PLACEHOLDER_BASE + slot as u32).unwrap_or(char::REPLACEMENT_CHARACTER)
    }

    fn decode(&self, text: &str) -> String {
        text.chars()
            .map(|c| {
                let code = c as u32;
                if code >= PLACEHOLDER_BASE && ((code - PLACEHOLDER_BASE) as usize) < self.escaped.len() {
                    self.escaped[(code - PLACEHOLDER_BASE) as usize]
                } else {
                    c
                }
            })
            .collect()
    }
}

/// One `@aspect :value` pair of a spec, with affix flags when present.
#[derive(Debug)]
struct SpecPart {
    aspect: Aspect,
    flags: AffixFlags,
    value: String,
}

/// Parser for Rockwell script. Stateless: all per-line state lives in the
/// escape table threaded through the helpers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptParser;

impl ScriptParser {
    /// Parse a whole script, skipping blank lines and `#` comments. The first
    /// malformed line aborts with its 1-based line number.
    pub fn parse_script(text: &str) -> Result<Vec<Rule>, ParseError> {
        let mut rules = Vec::new();
        for (number, line) in text.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with(COMMENT_MARKER) {
                continue;
            }
            rules.push(Self::parse_line(trimmed).map_err(|e| e.at_line(number + 1))?);
        }
        Ok(rules)
    }

    /// Parse one non-empty, non-comment line.
    pub fn parse_line(line: &str) -> Result<Rule, ParseError> {
        let line = line.trim();
        Self::parse_encoded(line).map_err(|kind| ParseError::new(kind, line))
    }

    fn parse_encoded(line: &str) -> ParseResult<Rule> {
        let (encoded, table) = EscapeTable::encode(line)?;

        let components: Vec<&str> = encoded.split(COMPONENT_DELIMITER).collect();
        if components.len() != 2 {
            return Err(ParseErrorKind::ComponentCount(components.len()));
        }
        let condition_text = components[0].trim();
        if condition_text.is_empty() {
            return Err(ParseErrorKind::EmptyCondition);
        }
        let tag = table.decode(components[1].trim());
        if tag.is_empty() {
            return Err(ParseErrorKind::EmptyTag);
        }

        let mut expressions = condition_text.split(CONDITION_DELIMITER);
        let accepting = parse_expression(expressions.next().unwrap_or_default(), &table)?;
        let rejecting = expressions.map(|e| parse_expression(e, &table)).collect::<ParseResult<Vec<_>>>()?;

        Ok(Rule { script: Arc::from(line), tag, accepting, rejecting })
    }
}

fn parse_expression(text: &str, table: &EscapeTable) -> ParseResult<Vec<ConditionElement>> {
    if text.trim().is_empty() {
        return Err(ParseErrorKind::EmptyCondition);
    }

    let mut elements = Vec::new();
    for raw in text.split(ELEMENT_DELIMITER) {
        let element = parse_element(raw, table)?;
        // An infix may span zero or more tokens, which the preceding Kleene
        // element captures for the affix resolver.
        if element.infix.is_some() {
            elements.push(ConditionElement::kleene());
        }
        elements.push(element);
    }

    if elements.first().is_some_and(|e| e.quodlibet) {
        return Err(ParseErrorKind::OptionalFirst);
    }
    if elements.last().is_some_and(|e| e.quodlibet) {
        return Err(ParseErrorKind::OptionalLast);
    }
    Ok(elements)
}

fn parse_element(raw: &str, table: &EscapeTable) -> ParseResult<ConditionElement> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(ParseErrorKind::EmptyElement);
    }

    let (optional, inner) = match (text.strip_prefix('['), text.ends_with(']')) {
        (Some(rest), true) => (true, rest[..rest.len() - 1].trim()),
        (None, false) => (false, text),
        _ => return Err(ParseErrorKind::Brackets(table.decode(text))),
    };
    if inner.is_empty() {
        return Err(ParseErrorKind::EmptyElement);
    }

    let mut specs = inner.split(REJECT_DELIMITER);
    let mut parts = parse_spec(specs.next().unwrap_or_default(), table)?.into_iter();

    let Some(head) = parts.next() else {
        return Err(ParseErrorKind::EmptyElement);
    };
    if head.aspect.is_affix() {
        return Err(ParseErrorKind::LeadingAffix(head.aspect.name()));
    }

    let mut element = ConditionElement::new(MatchingSpec::new(head.aspect, head.value));
    element.quodlibet = optional || head.aspect == Aspect::Quodlibet;

    for part in parts {
        match AffixPosition::from_aspect(part.aspect) {
            Some(position) => {
                let slot = match position {
                    AffixPosition::Prefix => &mut element.prefix,
                    AffixPosition::Infix => &mut element.infix,
                    AffixPosition::Suffix => &mut element.suffix,
                };
                if slot.is_some() {
                    return Err(ParseErrorKind::DuplicateAffix(part.aspect.name()));
                }
                *slot = Some(Affix::new(position, part.value).with_flags(part.flags));
            }
            None => element.additional.push(MatchingSpec::new(part.aspect, part.value)),
        }
    }

    for spec in specs {
        for part in parse_spec(spec, table)? {
            if part.aspect.is_affix() {
                return Err(ParseErrorKind::AffixInReject(part.aspect.name()));
            }
            element.rejects.push(MatchingSpec::new(part.aspect, part.value));
        }
    }

    Ok(element)
}

fn parse_spec(raw: &str, table: &EscapeTable) -> ParseResult<Vec<SpecPart>> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(ParseErrorKind::EmptyElement);
    }
    let Some(body) = text.strip_prefix(ASPECT_MARKER) else {
        return Err(ParseErrorKind::MissingAspects(table.decode(text)));
    };
    let Some((aspect_list, value_list)) = body.split_once(VALUE_MARKER) else {
        return Err(ParseErrorKind::MissingValues(table.decode(text)));
    };
    if aspect_list.trim().is_empty() {
        return Err(ParseErrorKind::MissingAspects(table.decode(text)));
    }
    if value_list.trim().is_empty() {
        return Err(ParseErrorKind::MissingValues(table.decode(text)));
    }

    let aspects = aspect_list.split(LIST_DELIMITER).map(parse_aspect).collect::<ParseResult<Vec<_>>>()?;
    let values: Vec<String> = value_list.split(LIST_DELIMITER).map(|v| table.decode(v.trim())).collect();
    if aspects.len() != values.len() {
        return Err(ParseErrorKind::Arity(aspects.len(), values.len()));
    }
    if values.iter().any(String::is_empty) {
        return Err(ParseErrorKind::MissingValues(table.decode(text)));
    }

    Ok(aspects
        .into_iter()
        .zip(values)
        .map(|((aspect, flags), value)| SpecPart { aspect, flags, value: normalize_value(aspect, value) })
        .collect())
}

fn parse_aspect(raw: &str) -> ParseResult<(Aspect, AffixFlags)> {
    let raw = raw.trim();
    let Some(caps) = regex!(r"^([A-Za-z]+)((?:\{[^}]*\})*)$").captures(raw) else {
        return Err(ParseErrorKind::UnknownAspect(raw.to_string()));
    };
    let name = &caps[1];
    let aspect = Aspect::from_name(name).ok_or_else(|| ParseErrorKind::UnknownAspect(name.to_string()))?;

    let mut flags = AffixFlags::empty();
    for flag in regex!(r"\{([^}]*)\}").captures_iter(&caps[2]) {
        flags |= match &flag[1] {
            "x" | "X" => AffixFlags::INCLUSIVE,
            "t" | "T" => AffixFlags::COMPLETE,
            "*" => AffixFlags::OPTIONAL,
            _ => return Err(ParseErrorKind::AffixFlags(caps[2].to_string())),
        };
    }
    if !flags.is_empty() && !aspect.is_affix() {
        return Err(ParseErrorKind::FlagsOnPlainAspect(raw.to_string()));
    }
    Ok((aspect, flags))
}

/// Keys are compared against token attributes as derived by the matcher:
/// cain forms and roles are lowercase, the Kleene value is fixed.
fn normalize_value(aspect: Aspect, value: String) -> String {
    match aspect {
        Aspect::Cain | Aspect::Role => value.to_lowercase(),
        Aspect::Quodlibet => QUODLIBET_VALUE.to_string(),
        _ => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(line: &str) -> ParseErrorKind {
        ScriptParser::parse_line(line).expect_err("line should not parse").kind
    }

    #[test]
    fn parses_single_element_rule() {
        let rule = ScriptParser::parse_line("@pos :NN0 | noun_tag").unwrap();
        assert_eq!(rule.tag, "noun_tag");
        assert_eq!(&*rule.script, "@pos :NN0 | noun_tag");
        assert_eq!(rule.accepting.len(), 1);
        assert!(rule.rejecting.is_empty());
        assert_eq!(rule.accepting[0].spec, MatchingSpec::new(Aspect::Pos, "NN0"));
        assert!(!rule.accepting[0].quodlibet);
    }

    #[test]
    fn splits_additional_specs_and_affixes() {
        let rule = ScriptParser::parse_line("@lemma+pos+prefix{x}{*}+suffix{t} :buy+VVB+very+now | x").unwrap();
        let element = &rule.accepting[0];
        assert_eq!(element.spec, MatchingSpec::new(Aspect::Lemma, "buy"));
        assert_eq!(element.additional, vec![MatchingSpec::new(Aspect::Pos, "VVB")]);

        let prefix = element.prefix.as_ref().unwrap();
        assert_eq!(prefix.pattern, "very");
        assert!(prefix.is_inclusive() && prefix.is_optional() && !prefix.is_complete());

        let suffix = element.suffix.as_ref().unwrap();
        assert_eq!(suffix.pattern, "now");
        assert_eq!(suffix.flags, AffixFlags::COMPLETE);
        assert!(element.infix.is_none());
    }

    #[test]
    fn reject_specs_attach_to_the_element() {
        let rule = ScriptParser::parse_line(r"@lemma :buy \ @pos :VVD \ @cain+type :Bought+VERB ; @pos :NN1 | p").unwrap();
        let first = &rule.accepting[0];
        assert_eq!(
            first.rejects,
            vec![
                MatchingSpec::new(Aspect::Pos, "VVD"),
                MatchingSpec::new(Aspect::Cain, "bought"),
                MatchingSpec::new(Aspect::Type, "VERB"),
            ]
        );
        assert_eq!(rule.accepting.len(), 2);
    }

    #[test]
    fn optional_and_kleene_elements_loop() {
        let rule = ScriptParser::parse_line("@cain :a ; [@pos :AJ0] ; @quodlibet :* ; @cain :b | t").unwrap();
        let flags: Vec<bool> = rule.accepting.iter().map(|e| e.quodlibet).collect();
        assert_eq!(flags, vec![false, true, true, false]);
        assert_eq!(rule.accepting[2].spec.value, QUODLIBET_VALUE);
    }

    #[test]
    fn infix_injects_a_kleene_element() {
        let rule = ScriptParser::parse_line("@cain :not ; @cain+infix{*} :good+very | t").unwrap();
        assert_eq!(rule.accepting.len(), 3);
        assert_eq!(rule.accepting[1].spec.aspect, Aspect::Quodlibet);
        assert!(rule.accepting[1].quodlibet);
        assert_eq!(rule.accepting[2].infix.as_ref().unwrap().pattern, "very");
    }

    #[test]
    fn rejecting_expressions_follow_slashes() {
        let rule = ScriptParser::parse_line("@cain :at / @cain :look ; @cain :at / @cain :at ; @cain :all | t").unwrap();
        assert_eq!(rule.accepting.len(), 1);
        assert_eq!(rule.rejecting.len(), 2);
        assert_eq!(rule.rejecting[1][1].spec, MatchingSpec::new(Aspect::Cain, "all"));
    }

    #[test]
    fn escapes_protect_delimiters() {
        let rule = ScriptParser::parse_line(r"@verbatim :a^|b^;c^+d^^ | tag^/x").unwrap();
        assert_eq!(rule.accepting[0].spec.value, "a|b;c+d^");
        assert_eq!(rule.tag, "tag/x");
    }

    #[test]
    fn aspect_names_are_case_insensitive_and_cain_is_lowered() {
        let rule = ScriptParser::parse_line("@CAIN :Hello ; @Role :Person | t").unwrap();
        assert_eq!(rule.accepting[0].spec, MatchingSpec::new(Aspect::Cain, "hello"));
        assert_eq!(rule.accepting[1].spec, MatchingSpec::new(Aspect::Role, "person"));
    }

    #[test]
    fn script_skips_comments_and_reports_line_numbers() {
        let script = "# nouns\n\n@pos :NN0 | a\n  # verbs\n@pos :VVB | b\n";
        let rules = ScriptParser::parse_script(script).unwrap();
        assert_eq!(rules.len(), 2);

        let err = ScriptParser::parse_script("@pos :NN0 | a\n@pos :NN0\n").unwrap_err();
        assert_eq!(err.line, Some(2));
        assert_eq!(err.kind, ParseErrorKind::ComponentCount(1));
        assert_eq!(err.script, "@pos :NN0");
    }

    #[test]
    fn malformed_lines_have_distinct_kinds() {
        let cases: Vec<(&str, ParseErrorKind)> = vec![
            ("@pos :NN0", ParseErrorKind::ComponentCount(1)),
            ("@pos :NN0 | a | b", ParseErrorKind::ComponentCount(3)),
            ("  | tag", ParseErrorKind::EmptyCondition),
            ("@pos :NN0 |  ", ParseErrorKind::EmptyTag),
            ("@pos :NN0 ; ; @pos :NN1 | t", ParseErrorKind::EmptyElement),
            ("pos :NN0 | t", ParseErrorKind::MissingAspects("pos :NN0".into())),
            ("@pos NN0 | t", ParseErrorKind::MissingValues("@pos NN0".into())),
            ("@colour :red | t", ParseErrorKind::UnknownAspect("colour".into())),
            ("@pos+prefix{q} :NN0+a | t", ParseErrorKind::AffixFlags("{q}".into())),
            ("@pos{x} :NN0 | t", ParseErrorKind::FlagsOnPlainAspect("pos{x}".into())),
            ("@pos+lemma :NN0 | t", ParseErrorKind::Arity(2, 1)),
            ("[@pos :NN0] ; @pos :NN1 | t", ParseErrorKind::OptionalFirst),
            ("@pos :NN0 ; [@pos :NN1] | t", ParseErrorKind::OptionalLast),
            ("@pos :NN0 ; @quodlibet :* | t", ParseErrorKind::OptionalLast),
            ("@prefix+pos :a+NN0 | t", ParseErrorKind::LeadingAffix("PREFIX")),
            (r"@pos :NN0 \ @pos+suffix :NN1+a | t", ParseErrorKind::AffixInReject("SUFFIX")),
            ("@pos+prefix+prefix :NN0+a+b | t", ParseErrorKind::DuplicateAffix("PREFIX")),
            ("[@pos :NN0 ; @pos :NN1 | t", ParseErrorKind::Brackets("[@pos :NN0".into())),
            ("@pos :NN0 | t^", ParseErrorKind::DanglingEscape),
            ("@pos :NN0 / | t", ParseErrorKind::EmptyCondition),
            ("@cain+infix :a+b | t", ParseErrorKind::OptionalFirst),
        ];
        for (line, expected) in cases {
            assert_eq!(kind(line), expected, "line: {line}");
        }
    }
}
