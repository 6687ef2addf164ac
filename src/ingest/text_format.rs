//! Parser for pre-authored text quizzes
//!
//! ```text
//! [Question: "What is the powerhouse of the cell?"]
//! [A: "Nucleus"]
//! [B: "Mitochondrion"]
//! [C: "Ribosome"]
//! [D: "Golgi apparatus"]
//! [Solution: "B"]
//! ---
//! [Question: "..."]
//! ...
//! ```

use regex::Regex;

use super::IngestError;
use crate::storage::OPTION_COUNT;

const BLOCK_SEPARATOR: &str = "---";
const OPTION_LETTERS: [&str; OPTION_COUNT] = ["A", "B", "C", "D"];

/// One question read from a text quiz, not yet attached to a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
}

#[derive(Default)]
struct BlockFields {
    question: Option<String>,
    options: [Option<String>; OPTION_COUNT],
    solution: Option<String>,
}

impl BlockFields {
    fn is_empty(&self) -> bool {
        self.question.is_none()
            && self.solution.is_none()
            && self.options.iter().all(Option::is_none)
    }

    fn set(&mut self, key: &str, value: String, block: usize) -> Result<(), IngestError> {
        let key = key.to_ascii_uppercase();
        let slot = match key.as_str() {
            "QUESTION" => &mut self.question,
            "SOLUTION" => &mut self.solution,
            letter => {
                let index = OPTION_LETTERS
                    .iter()
                    .position(|l| *l == letter)
                    .ok_or_else(|| malformed(block, format!("unknown field '{}'", key)))?;
                &mut self.options[index]
            }
        };
        if slot.is_some() {
            return Err(malformed(block, format!("duplicate field '{}'", key)));
        }
        *slot = Some(value);
        Ok(())
    }

    fn finish(self, block: usize) -> Result<ParsedQuestion, IngestError> {
        let question = match self.question {
            Some(q) if !q.trim().is_empty() => q,
            Some(_) => return Err(malformed(block, "empty question text")),
            None => return Err(malformed(block, "missing Question")),
        };

        let mut options = Vec::with_capacity(OPTION_COUNT);
        for (letter, option) in OPTION_LETTERS.iter().zip(self.options) {
            let option =
                option.ok_or_else(|| malformed(block, format!("missing option {}", letter)))?;
            options.push(option);
        }

        let solution = self
            .solution
            .ok_or_else(|| malformed(block, "missing Solution"))?;
        let correct_answer = OPTION_LETTERS
            .iter()
            .position(|l| l.eq_ignore_ascii_case(solution.trim()))
            .ok_or_else(|| {
                malformed(block, format!("solution '{}' is not one of A, B, C, D", solution))
            })?;

        Ok(ParsedQuestion {
            question,
            options,
            correct_answer,
        })
    }
}

fn malformed(block: usize, reason: impl Into<String>) -> IngestError {
    IngestError::MalformedBlock {
        block,
        reason: reason.into(),
    }
}

/// Parse a whole text quiz. Any bad block rejects the file.
///
/// Blocks are numbered from 1 in error messages.
pub fn parse_text_quiz(content: &str) -> Result<Vec<ParsedQuestion>, IngestError> {
    if content.trim().is_empty() {
        return Err(IngestError::EmptyFile);
    }

    let field_re = Regex::new(r#"^\[\s*([A-Za-z]+)\s*:\s*"(.*)"\s*\]$"#)?;

    let mut questions = Vec::new();
    let mut block = 1;
    let mut fields = BlockFields::default();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == BLOCK_SEPARATOR {
            if !fields.is_empty() {
                questions.push(std::mem::take(&mut fields).finish(block)?);
            }
            block += 1;
            continue;
        }

        let caps = field_re
            .captures(line)
            .ok_or_else(|| malformed(block, format!("unrecognized line '{}'", line)))?;
        fields.set(&caps[1], caps[2].to_string(), block)?;
    }

    if !fields.is_empty() {
        questions.push(fields.finish(block)?);
    }

    if questions.is_empty() {
        return Err(IngestError::EmptyFile);
    }
    Ok(questions)
}
