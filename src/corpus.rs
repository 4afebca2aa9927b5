//! Token file reader for the CLI.
//!
//! One token per line, `word<TAB>lemma<TAB>pos[<TAB>type]`; blank lines end
//! a sentence. Ambiguous tokens list their readings in `pos` separated by
//! `|`, with either one lemma for all readings or one lemma per reading.

use rockwell::{Sentence, Token};

const FIELD_DELIMITER: char = '\t';
const READING_DELIMITER: char = '|';

pub fn parse_sentences(text: &str) -> Result<Vec<Sentence>, String> {
    let mut sentences = Vec::new();
    let mut tokens: Vec<Token> = Vec::new();

    for (number, line) in text.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            if !tokens.is_empty() {
                sentences.push(Sentence::new(sentences.len(), std::mem::take(&mut tokens)));
            }
            continue;
        }
        let token = parse_token(line, tokens.len()).map_err(|err| format!("error: line {}: {err}", number + 1))?;
        tokens.push(token);
    }
    if !tokens.is_empty() {
        sentences.push(Sentence::new(sentences.len(), tokens));
    }
    Ok(sentences)
}

fn parse_token(line: &str, index: usize) -> Result<Token, String> {
    let fields: Vec<&str> = line.split(FIELD_DELIMITER).map(str::trim).collect();
    if fields.len() > 4 {
        return Err(format!("expected at most 4 tab-separated fields, found {}", fields.len()));
    }
    let field = |n: usize| fields.get(n).copied().filter(|f| !f.is_empty());

    let word = field(0).ok_or_else(|| "missing word".to_string())?;
    let mut token = Token::new(word, index);
    if let Some(pos_type) = field(3) {
        token = token.with_type(pos_type);
    }

    let lemmas: Vec<&str> = field(1).map(|l| l.split(READING_DELIMITER).collect()).unwrap_or_default();
    let tags: Vec<&str> = field(2).map(|p| p.split(READING_DELIMITER).collect()).unwrap_or_default();

    match (lemmas.as_slice(), tags.as_slice()) {
        ([], []) => Ok(token),
        ([lemma], []) => Ok(token.with_lemma(*lemma)),
        (_, []) => Err("several lemmas but no pos".to_string()),
        ([], [pos]) => Ok(token.with_pos(*pos)),
        ([lemma], [pos]) => Ok(token.with_lemma(*lemma).with_pos(*pos)),
        // readings without a lemma of their own fall back to the word
        (lemmas, tags) if lemmas.len() <= 1 || lemmas.len() == tags.len() => {
            for (n, pos) in tags.iter().enumerate() {
                let lemma = lemmas.get(n).or(lemmas.first()).copied().unwrap_or(word);
                token = token.with_reading(lemma, *pos);
            }
            Ok(token)
        }
        (lemmas, tags) => Err(format!("{} lemmas for {} readings", lemmas.len(), tags.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_lines_split_sentences() {
        let sentences = parse_sentences("The\tthe\tAT0\ncat\tcat\tNN1\n\n\nRun\trun\tVVB\n").unwrap();
        assert_eq!(sentences.len(), 2);
        assert_eq!(sentences[0].tokens.len(), 2);
        assert_eq!(sentences[1].id, 1);
        assert_eq!(sentences[1].tokens[0].cain, "run");
        assert_eq!(sentences[1].tokens[0].index, 0);
    }

    #[test]
    fn readings_pair_lemmas_with_pos() {
        let sentences = parse_sentences("saw\tsee|saw\tVVD|NN1\tVERB").unwrap();
        let token = &sentences[0].tokens[0];
        let readings: Vec<(Option<&str>, Option<&str>)> =
            token.alternatives.iter().map(|r| (r.lemma.as_deref(), r.pos.as_deref())).collect();
        assert_eq!(readings, vec![(Some("see"), Some("VVD")), (Some("saw"), Some("NN1"))]);
        assert_eq!(token.alternatives[1].pos_type.as_deref(), Some("VERB"));
    }

    #[test]
    fn one_lemma_serves_every_reading() {
        let sentences = parse_sentences("run\trun\tVVB|NN1").unwrap();
        assert!(sentences[0].tokens[0].alternatives.iter().all(|r| r.lemma.as_deref() == Some("run")));
    }

    #[test]
    fn bare_words_are_tokens() {
        let sentences = parse_sentences("hello\nworld").unwrap();
        assert_eq!(sentences[0].tokens[1].word, "world");
        assert_eq!(sentences[0].tokens[1].pos, None);
    }

    #[test]
    fn malformed_lines_report_their_number() {
        let err = parse_sentences("ok\tok\tNN1\nsaw\ta|b|c\tVVD|NN1").unwrap_err();
        assert!(err.contains("line 2"), "{err}");
        assert!(parse_sentences("a\tb\tc\td\te").is_err());
    }
}
