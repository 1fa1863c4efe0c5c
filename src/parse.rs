//! Model Output Parsing
//!
//! LLMs return JSON wrapped in prose, code fences or trailing commentary.
//! Parsing is an ordered chain of pure strategies; the first one that yields
//! a JSON object wins. Callers validate the schema afterwards.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("not valid JSON: {0}")]
    Invalid(#[from] serde_json::Error),

    #[error("no JSON object found in model output")]
    NoObject,

    #[error("parsed JSON is not an object")]
    NotAnObject,

    #[error("all parse strategies failed")]
    Exhausted,
}

type Strategy = fn(&str) -> Result<Value, ParseError>;

/// Strategy 1: the whole response is the JSON document
fn parse_direct(text: &str) -> Result<Value, ParseError> {
    let value: Value = serde_json::from_str(text.trim())?;
    ensure_object(value)
}

/// Strategy 2: JSON inside a fenced code block (```json ... ``` or ``` ... ```)
fn parse_fenced_block(text: &str) -> Result<Value, ParseError> {
    let start = text.find("```").ok_or(ParseError::NoObject)?;
    let after_fence = &text[start + 3..];
    // skip an optional language tag on the fence line
    let body_start = after_fence.find('\n').ok_or(ParseError::NoObject)? + 1;
    let body = &after_fence[body_start..];
    let end = body.find("```").ok_or(ParseError::NoObject)?;
    let value: Value = serde_json::from_str(body[..end].trim())?;
    ensure_object(value)
}

/// Strategy 3: first brace-balanced substring
fn parse_balanced_braces(text: &str) -> Result<Value, ParseError> {
    let start = text.find('{').ok_or(ParseError::NoObject)?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text[start..].char_indices() {
        if in_string {
            match c {
                '\\' if !escaped => escaped = true,
                '"' if !escaped => in_string = false,
                _ => escaped = false,
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let candidate = &text[start..start + i + 1];
                    let value: Value = serde_json::from_str(candidate)?;
                    return ensure_object(value);
                }
            }
            _ => {}
        }
    }
    Err(ParseError::NoObject)
}

/// Strategy 4: strip common junk (smart quotes, trailing commas) then retry
/// the balanced-brace extraction
fn parse_cleaned(text: &str) -> Result<Value, ParseError> {
    let cleaned = text
        .replace(['\u{201c}', '\u{201d}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'")
        .replace(",}", "}")
        .replace(",]", "]")
        .replace(", }", "}")
        .replace(", ]", "]");
    parse_balanced_braces(&cleaned)
}

fn ensure_object(value: Value) -> Result<Value, ParseError> {
    if value.is_object() {
        Ok(value)
    } else {
        Err(ParseError::NotAnObject)
    }
}

const STRATEGIES: &[Strategy] = &[
    parse_direct,
    parse_fenced_block,
    parse_balanced_braces,
    parse_cleaned,
];

/// Run the strategy chain and commit to the first success
pub fn parse_llm_json(text: &str) -> Result<Value, ParseError> {
    for strategy in STRATEGIES {
        if let Ok(value) = strategy(text) {
            return Ok(value);
        }
    }
    Err(ParseError::Exhausted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_json() {
        let v = parse_llm_json(r#"{"needs_search": true}"#).unwrap();
        assert_eq!(v["needs_search"], true);
    }

    #[test]
    fn test_fenced_block() {
        let text = "Here is the verdict:\n```json\n{\"intent\": \"question\"}\n```\nDone.";
        let v = parse_llm_json(text).unwrap();
        assert_eq!(v["intent"], "question");
    }

    #[test]
    fn test_fence_without_language_tag() {
        let text = "```\n{\"confidence\": 80}\n```";
        let v = parse_llm_json(text).unwrap();
        assert_eq!(v["confidence"], 80);
    }

    #[test]
    fn test_prose_wrapped_object() {
        let text = "Sure! The answer is {\"search_type\": \"local\", \"note\": \"{nested} ok\"} hope that helps";
        let v = parse_llm_json(text).unwrap();
        assert_eq!(v["search_type"], "local");
    }

    #[test]
    fn test_nested_braces_balanced() {
        let text = "{\"outer\": {\"inner\": 1}} trailing";
        let v = parse_llm_json(text).unwrap();
        assert_eq!(v["outer"]["inner"], 1);
    }

    #[test]
    fn test_smart_quotes_and_trailing_comma() {
        let text = "{\u{201c}intent\u{201d}: \u{201c}request\u{201d},}";
        let v = parse_llm_json(text).unwrap();
        assert_eq!(v["intent"], "request");
    }

    #[test]
    fn test_garbage_exhausts_chain() {
        assert!(matches!(
            parse_llm_json("no json here at all"),
            Err(ParseError::Exhausted)
        ));
    }

    #[test]
    fn test_bare_array_rejected() {
        assert!(parse_llm_json("[1, 2, 3]").is_err());
    }
}
