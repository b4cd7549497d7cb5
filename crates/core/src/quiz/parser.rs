//! Line-oriented recovery of multiple-choice questions from generated text.
//!
//! The generator is asked to number each question, prefix options with
//! `a)`, `(a)` or `a.`, tag the right option with `[CORRECT]` and put `---`
//! between questions. None of that is guaranteed, so the scanner below is
//! forgiving: anything it cannot place is skipped, and a block
//! that never collects four options produces nothing.
//!
//! Scanner states:
//!
//! - `SeekingQuestion`: nothing accumulated yet. A question line moves to
//!   `AccumulatingOptions`; every other line is ignored.
//! - `AccumulatingOptions`: a question is open. Option lines are appended
//!   while fewer than four are held. A new question line finalizes the open
//!   question (if it has four options) and opens the next one.
//!
//! End of input finalizes the open question under the same four-option rule.
//! An option with no text (blank, or a bare `[CORRECT]`) spoils its question:
//! later lines must not slide into its letter's slot.

use std::sync::LazyLock;

use regex::Regex;

use super::question::{OPTION_COUNT, ParsedQuestion};

/// Separator the generator writes between questions.
pub const BLOCK_SEPARATOR: &str = "---";

/// Tag marking the correct option.
pub const CORRECT_TAG: &str = "[CORRECT]";

/// Answer assumed when no option carried the correct tag.
pub const FALLBACK_ANSWER: char = 'B';

const CHECKMARK: char = '✓';

static QUESTION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d+\.\s*\*{0,2}(.*?)\*{0,2}\s*$").expect("valid question pattern")
});

static OPTION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*\(?([a-d])[\s).]+").expect("valid option pattern")
});

/// Parser output for a whole generation response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParseOutcome {
    /// One entry per block that yielded a question, in block order.
    pub questions: Vec<ParsedQuestion>,
    /// Number of non-empty blocks the response was split into.
    pub total_blocks: usize,
}

/// Splits a generation response on `---`, dropping empty fragments.
#[must_use]
pub fn split_blocks(text: &str) -> Vec<&str> {
    text.split(BLOCK_SEPARATOR)
        .filter(|block| !block.is_empty())
        .collect()
}

/// Parses every block of a response and keeps the first question of each.
#[must_use]
pub fn parse_response(text: &str) -> ParseOutcome {
    let blocks = split_blocks(text);
    let total_blocks = blocks.len();
    let questions = blocks.into_iter().filter_map(parse_block).collect();
    ParseOutcome {
        questions,
        total_blocks,
    }
}

/// Parses one block into at most one question.
///
/// When a block holds several complete questions the first one is returned.
#[must_use]
pub fn parse_block(block: &str) -> Option<ParsedQuestion> {
    let mut scanner = BlockScanner::default();
    for line in block.lines() {
        scanner.feed(line);
    }
    scanner.finish().into_iter().next()
}

//
// ─── LINE CLASSIFICATION ───────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line<'a> {
    QuestionStart(&'a str),
    Option { letter: char, text: &'a str },
    Other,
}

fn classify(line: &str) -> Line<'_> {
    if let Some(caps) = QUESTION_LINE.captures(line) {
        let text = caps.get(1).map_or("", |m| m.as_str());
        return Line::QuestionStart(text.trim());
    }

    if let Some(caps) = OPTION_LINE.captures(line) {
        let (Some(prefix), Some(letter)) = (caps.get(0), caps.get(1)) else {
            return Line::Other;
        };
        let letter = letter
            .as_str()
            .chars()
            .next()
            .map(|c| c.to_ascii_uppercase());
        if let Some(letter) = letter {
            return Line::Option {
                letter,
                text: &line[prefix.end()..],
            };
        }
    }

    Line::Other
}

fn clean_option(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed
        .strip_suffix(CHECKMARK)
        .map_or(trimmed, str::trim_end)
}

//
// ─── STATE MACHINE ─────────────────────────────────────────────────────────────
//

#[derive(Debug)]
struct OpenQuestion {
    question: String,
    options: Vec<String>,
    answer: Option<char>,
    spoiled: bool,
}

impl OpenQuestion {
    fn new(question: &str) -> Self {
        Self {
            question: question.to_owned(),
            options: Vec::with_capacity(OPTION_COUNT),
            answer: None,
            spoiled: false,
        }
    }

    fn push_option(&mut self, letter: char, raw: &str) {
        if self.spoiled || self.options.len() >= OPTION_COUNT {
            return;
        }
        let text = clean_option(raw);
        let (text, tagged) = match text.strip_prefix(CORRECT_TAG) {
            Some(rest) => (rest.trim(), true),
            None => (text, false),
        };
        if text.is_empty() {
            self.spoiled = true;
            return;
        }

        self.options.push(text.to_owned());
        if tagged {
            self.answer = Some(letter);
        }
    }

    fn finalize(self) -> Option<ParsedQuestion> {
        if self.spoiled || self.options.len() != OPTION_COUNT {
            return None;
        }
        Some(ParsedQuestion {
            question: self.question,
            options: self.options,
            answer: Some(self.answer.unwrap_or(FALLBACK_ANSWER)),
        })
    }
}

#[derive(Debug, Default)]
enum ScanState {
    #[default]
    SeekingQuestion,
    AccumulatingOptions(OpenQuestion),
}

#[derive(Debug, Default)]
struct BlockScanner {
    state: ScanState,
    finished: Vec<ParsedQuestion>,
}

impl BlockScanner {
    fn feed(&mut self, line: &str) {
        match classify(line) {
            Line::QuestionStart(text) => {
                let previous = std::mem::replace(
                    &mut self.state,
                    ScanState::AccumulatingOptions(OpenQuestion::new(text)),
                );
                if let ScanState::AccumulatingOptions(open) = previous {
                    self.finished.extend(open.finalize());
                }
            }
            Line::Option { letter, text } => {
                if let ScanState::AccumulatingOptions(open) = &mut self.state {
                    open.push_option(letter, text);
                }
            }
            Line::Other => {}
        }
    }

    fn finish(mut self) -> Vec<ParsedQuestion> {
        if let ScanState::AccumulatingOptions(open) = self.state {
            self.finished.extend(open.finalize());
        }
        self.finished
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn opts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn parses_emphasized_question_with_tagged_option() {
        let block = "1. **What is 2+2?**\na) 3\nb) [CORRECT]4\nc) 5\nd) 6";
        let parsed = parse_block(block).unwrap();

        assert_eq!(parsed.question, "What is 2+2?");
        assert_eq!(parsed.options, opts(&["3", "4", "5", "6"]));
        assert_eq!(parsed.answer, Some('B'));
    }

    #[test]
    fn two_options_yield_nothing() {
        let block = "1. What is 2+2?\na) 3\nb) [CORRECT]4";
        assert_eq!(parse_block(block), None);
    }

    #[test]
    fn missing_tag_falls_back_to_b() {
        let block = "3. Capital of France?\na) Paris\nb) Rome\nc) Oslo\nd) Bern";
        let parsed = parse_block(block).unwrap();
        assert_eq!(parsed.answer, Some(FALLBACK_ANSWER));
    }

    #[test]
    fn accepts_parenthesized_and_dotted_prefixes() {
        let block = "\
2. Which gas do plants absorb?
(a) Oxygen
(B) Nitrogen
c. [CORRECT] Carbon dioxide
D) Helium";
        let parsed = parse_block(block).unwrap();

        assert_eq!(
            parsed.options,
            opts(&["Oxygen", "Nitrogen", "Carbon dioxide", "Helium"])
        );
        assert_eq!(parsed.answer, Some('C'));
    }

    #[test]
    fn strips_trailing_checkmark() {
        let block = "1. Pick one\na) one\nb) two\nc) three\nd) [CORRECT] four ✓";
        let parsed = parse_block(block).unwrap();
        assert_eq!(parsed.options[3], "four");
        assert_eq!(parsed.answer, Some('D'));
    }

    #[test]
    fn ignores_options_beyond_four() {
        let block = "1. Q\na) w\nb) x\nc) y\nd) z\na) [CORRECT] extra";
        let parsed = parse_block(block).unwrap();
        assert_eq!(parsed.options, opts(&["w", "x", "y", "z"]));
        assert_eq!(parsed.answer, Some('B'));
    }

    #[test]
    fn options_before_any_question_are_ignored() {
        let block = "a) stray\n1. Q\na) w\nb) x\nc) y\nd) [CORRECT] z";
        let parsed = parse_block(block).unwrap();
        assert_eq!(parsed.options, opts(&["w", "x", "y", "z"]));
        assert_eq!(parsed.answer, Some('D'));
    }

    #[test]
    fn first_complete_question_in_block_wins() {
        let block = "1. First\na) 1\nb) 2\nc) 3\nd) 4\n2. Second\na) 5\nb) 6\nc) 7\nd) 8";
        let parsed = parse_block(block).unwrap();
        assert_eq!(parsed.question, "First");
    }

    #[test]
    fn incomplete_question_is_superseded_by_next_start() {
        let block = "1. First\na) 1\nb) 2\n2. Second\na) 5\nb) 6\nc) 7\nd) [CORRECT] 8";
        let parsed = parse_block(block).unwrap();
        assert_eq!(parsed.question, "Second");
        assert_eq!(parsed.answer, Some('D'));
    }

    #[test]
    fn blank_options_are_skipped() {
        let block = "1. Q\na)   \nb) x\nc) y\nd) z";
        assert_eq!(parse_block(block), None);
    }

    #[test]
    fn bare_correct_tag_drops_the_question() {
        let block = "1. Q\na) w\nb) [CORRECT]\nc) y\nd) z\na) extra";
        assert_eq!(parse_block(block), None);

        let blank_then_more = "1. Q\na) w\nb) \nc) y\nd) z\na) extra";
        assert_eq!(parse_block(blank_then_more), None);
    }

    #[test]
    fn spoiled_question_does_not_affect_the_next_one() {
        let text = "1. Q\na) w\nb) [CORRECT]\nc) y\nd) z\n2. R\na) 1\nb) 2\nc) [CORRECT] 3\nd) 4";
        let parsed = parse_block(text).unwrap();
        assert_eq!(parsed.question, "R");
        assert_eq!(parsed.answer, Some('C'));
    }

    #[test]
    fn handles_crlf_line_endings() {
        let block = "1. Q\r\na) w\r\nb) x\r\nc) [CORRECT] y\r\nd) z\r\n";
        let parsed = parse_block(block).unwrap();
        assert_eq!(parsed.question, "Q");
        assert_eq!(parsed.options[3], "z");
        assert_eq!(parsed.answer, Some('C'));
    }

    #[test]
    fn malformed_text_yields_nothing() {
        assert_eq!(parse_block(""), None);
        assert_eq!(parse_block("Here is your quiz!"), None);
        assert_eq!(parse_block("a) b) c) d)"), None);
    }

    #[test]
    fn response_is_split_on_separator() {
        let text = "\
Here is a quiz.
1. **What is 2+2?**
a) 3
b) [CORRECT]4
c) 5
d) 6
---
2. Broken
a) only
---
3. Largest planet?
a) [CORRECT] Jupiter
b) Mars
c) Venus
d) Earth
---
";
        let outcome = parse_response(text);
        assert_eq!(outcome.total_blocks, 4);
        assert_eq!(outcome.questions.len(), 2);
        assert_eq!(outcome.questions[0].question, "What is 2+2?");
        assert_eq!(outcome.questions[1].question, "Largest planet?");
        assert_eq!(outcome.questions[1].answer, Some('A'));
    }

    #[test]
    fn split_drops_empty_fragments_only() {
        assert_eq!(split_blocks("------"), Vec::<&str>::new());
        assert_eq!(split_blocks("a---\n---b"), vec!["a", "\n", "b"]);
    }

    fn letter_strategy() -> impl Strategy<Value = usize> {
        0usize..4
    }

    fn text_strategy() -> impl Strategy<Value = String> {
        "[A-Za-z][A-Za-z0-9 ,'?-]{0,30}[A-Za-z0-9?]"
    }

    proptest! {
        #[test]
        fn well_formed_blocks_parse_completely(
            number in 1u32..500,
            question in text_strategy(),
            options in proptest::collection::vec(text_strategy(), 4),
            correct in letter_strategy(),
            style in 0usize..3,
        ) {
            let mut block = format!("{number}. {question}\n");
            for (i, option) in options.iter().enumerate() {
                let letter = ['a', 'b', 'c', 'd'][i];
                let prefix = match style {
                    0 => format!("{letter})"),
                    1 => format!("({letter})"),
                    _ => format!("{letter}."),
                };
                let tag = if i == correct { CORRECT_TAG } else { "" };
                block.push_str(&format!("{prefix} {tag}{option}\n"));
            }

            let parsed = parse_block(&block).expect("question parsed");
            let expected: Vec<String> = options.iter().map(|o| o.trim().to_owned()).collect();
            prop_assert_eq!(parsed.question, question.trim().to_owned());
            prop_assert_eq!(parsed.options, expected);
            prop_assert_eq!(parsed.answer, Some(['A', 'B', 'C', 'D'][correct]));
        }

        #[test]
        fn short_blocks_never_yield_partial_questions(
            question in text_strategy(),
            options in proptest::collection::vec(text_strategy(), 0..4),
        ) {
            let mut block = format!("1. {question}\n");
            for (i, option) in options.iter().enumerate() {
                block.push_str(&format!("{}) {option}\n", ['a', 'b', 'c', 'd'][i]));
            }
            prop_assert_eq!(parse_block(&block), None);
        }

        #[test]
        fn untagged_blocks_default_to_b(
            question in text_strategy(),
            options in proptest::collection::vec(text_strategy(), 4),
        ) {
            let mut block = format!("7. {question}\n");
            for (i, option) in options.iter().enumerate() {
                block.push_str(&format!("{}) {option}\n", ['a', 'b', 'c', 'd'][i]));
            }
            let parsed = parse_block(&block).expect("question parsed");
            prop_assert_eq!(parsed.answer, Some('B'));
        }
    }
}
