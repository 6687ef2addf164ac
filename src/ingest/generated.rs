//! Validation of question payloads returned by a language model

use regex::Regex;
use serde_json::Value;

use super::text_format::ParsedQuestion;
use super::IngestError;
use crate::storage::OPTION_COUNT;

/// Pull the question array out of free-form model output.
///
/// Tries the outermost `[...]` span first, then a fenced code block.
pub fn extract_json_array(text: &str) -> Result<Vec<Value>, IngestError> {
    let array_re = Regex::new(r"(?s)\[.*\]")?;
    if let Some(found) = array_re.find(text) {
        if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(found.as_str()) {
            return Ok(items);
        }
    }

    let fence_re = Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```")?;
    let fenced = fence_re
        .captures(text)
        .and_then(|caps| caps.get(1))
        .ok_or_else(|| {
            IngestError::InvalidGeneratedPayload("no JSON array found in response".to_string())
        })?;

    match serde_json::from_str::<Value>(fenced.as_str()) {
        Ok(Value::Array(items)) => Ok(items),
        Ok(_) => Err(IngestError::InvalidGeneratedPayload(
            "generated content is not an array of questions".to_string(),
        )),
        Err(e) => Err(IngestError::InvalidGeneratedPayload(e.to_string())),
    }
}

fn validate_entry(entry: &Value) -> Result<ParsedQuestion, String> {
    let question = entry
        .get("question")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or("missing question text")?;

    let options = entry
        .get("options")
        .and_then(Value::as_array)
        .ok_or("missing options")?;
    if options.len() != OPTION_COUNT {
        return Err(format!("{} options instead of {}", options.len(), OPTION_COUNT));
    }
    let options = options
        .iter()
        .map(|o| o.as_str().map(str::to_string))
        .collect::<Option<Vec<String>>>()
        .ok_or("non-string option")?;

    let correct_answer = entry
        .get("correct_answer")
        .and_then(Value::as_u64)
        .ok_or("missing or non-integer correct_answer")?;
    if correct_answer >= OPTION_COUNT as u64 {
        return Err(format!("invalid correct_answer {}", correct_answer));
    }

    Ok(ParsedQuestion {
        question: question.to_string(),
        options,
        correct_answer: correct_answer as usize,
    })
}

/// Keep the well-formed generated questions, up to `limit`.
///
/// Malformed entries are logged and dropped; a payload with none left is an error.
pub fn parse_generated_questions(
    text: &str,
    limit: usize,
) -> Result<Vec<ParsedQuestion>, IngestError> {
    let entries = extract_json_array(text)?;
    let total = entries.len();

    let mut valid: Vec<ParsedQuestion> = entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| match validate_entry(entry) {
            Ok(question) => Some(question),
            Err(reason) => {
                log::warn!("Skipping generated question {}: {}", index, reason);
                None
            }
        })
        .collect();

    log::info!("Validated {} of {} generated questions", valid.len(), total);
    valid.truncate(limit);
    if valid.is_empty() {
        return Err(IngestError::NoValidQuestions);
    }
    Ok(valid)
}
