//! Decision extraction from free-form model output.
//!
//! Small models wrap their JSON in prose, markdown fences or both. The
//! extractor runs an ordered chain of strategies and stops at the first one
//! that yields a usable decision.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use spider_select_types::{MatchQuality, ParsedDecision};
use std::sync::LazyLock;

/// Response parser options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserOptions {
    /// Recover a bare id from `"id": 42`, `'id': 42` or a leading `[42]`
    /// when no JSON object can be parsed.
    pub loose_id_fallback: bool,
}

impl ParserOptions {
    /// Enable or disable the loose id fallback.
    pub fn with_loose_id_fallback(mut self, enabled: bool) -> Self {
        self.loose_id_fallback = enabled;
        self
    }
}

type Strategy = fn(&str) -> Option<ParsedDecision>;

/// Ordered chain of extraction strategies.
#[derive(Debug, Clone)]
pub struct DecisionExtractor {
    strategies: Vec<(&'static str, Strategy)>,
}

impl Default for DecisionExtractor {
    fn default() -> Self {
        Self::new(ParserOptions::default())
    }
}

impl DecisionExtractor {
    /// Build the chain: whole response, first fenced block, first balanced
    /// object, then the loose id fallback when enabled.
    pub fn new(options: ParserOptions) -> Self {
        let mut strategies: Vec<(&'static str, Strategy)> = vec![
            ("whole", parse_whole as Strategy),
            ("fenced", parse_fenced as Strategy),
            ("balanced", parse_balanced as Strategy),
        ];
        if options.loose_id_fallback {
            strategies.push(("loose", parse_loose as Strategy));
        }
        Self { strategies }
    }

    /// Names of the active strategies in order.
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|(name, _)| *name).collect()
    }

    /// Extract a decision, or `None` when every strategy fails.
    pub fn extract(&self, response: &str) -> Option<ParsedDecision> {
        self.strategies.iter().find_map(|(name, strategy)| {
            let decision = strategy(response)?;
            log::debug!("decision id={} recovered by {} strategy", decision.id, name);
            Some(decision)
        })
    }
}

fn parse_whole(response: &str) -> Option<ParsedDecision> {
    decision_from_str(response.trim())
}

fn parse_fenced(response: &str) -> Option<ParsedDecision> {
    decision_from_str(extract_first_code_block(response)?)
}

fn parse_balanced(response: &str) -> Option<ParsedDecision> {
    let mut from = 0;
    while let Some((start, end)) = extract_first_json_boundaries(response, from) {
        if let Some(decision) = decision_from_str(&response[start..end]) {
            return Some(decision);
        }
        from = start + 1;
    }
    None
}

static LOOSE_ID: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"(?i)["']id["']\s*:\s*["']?(\d+)"#).ok());

static LEADING_BRACKET_ID: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*\[(\d+)\]").ok());

fn parse_loose(response: &str) -> Option<ParsedDecision> {
    let id = [&*LOOSE_ID, &*LEADING_BRACKET_ID]
        .into_iter()
        .flatten()
        .find_map(|re| re.captures(response)?.get(1)?.as_str().parse::<u64>().ok())?;
    Some(ParsedDecision::new(id, ""))
}

fn decision_from_str(s: &str) -> Option<ParsedDecision> {
    if s.is_empty() {
        return None;
    }
    serde_json::from_str::<Value>(s)
        .ok()
        .and_then(decision_from_value)
}

/// Build a decision from a JSON object.
///
/// The object must carry an `id`. A string id is accepted when it is plain
/// digits. Unknown fields are kept in `extra`.
pub fn decision_from_value(value: Value) -> Option<ParsedDecision> {
    let Value::Object(mut map) = value else {
        return None;
    };

    let id = coerce_id(map.remove("id")?)?;

    let reasoning = match map.remove("reasoning") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
    };

    let match_quality = take_typed::<MatchQuality>(&mut map, "match_quality");
    let confidence = match map.remove("confidence") {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => match s.trim().parse::<f64>() {
            Ok(v) => Some(v),
            Err(_) => {
                map.insert("confidence".into(), Value::String(s));
                None
            }
        },
        Some(other) => {
            map.insert("confidence".into(), other);
            None
        }
        None => None,
    };

    Some(ParsedDecision {
        id,
        reasoning,
        match_quality,
        confidence,
        extra: map,
    })
}

fn take_typed<T: serde::de::DeserializeOwned>(map: &mut Map<String, Value>, key: &str) -> Option<T> {
    let value = map.remove(key)?;
    match serde_json::from_value::<T>(value.clone()) {
        Ok(v) => Some(v),
        Err(_) => {
            map.insert(key.to_string(), value);
            None
        }
    }
}

/// Coerce an id to a non-negative integer.
pub fn coerce_id(value: Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64)
                .map(|f| f as u64)
        }),
        Value::String(s) => {
            let s = s.trim();
            if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
                s.parse::<u64>().ok()
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Extract the FIRST fenced code block from text.
///
/// A language tag after the opening fence is skipped. An unterminated fence
/// yields the rest of the text.
pub fn extract_first_code_block(s: &str) -> Option<&str> {
    let mut search_start = 0;

    while let Some(rel_start) = s[search_start..].find("```") {
        let after_fence = search_start + rel_start + 3;
        if after_fence >= s.len() {
            return None;
        }

        let rest = &s[after_fence..];
        let content_start = match rest.find('\n') {
            Some(i) if !rest[..i].trim_start().starts_with('{') => after_fence + i + 1,
            _ => after_fence,
        };

        let (block, next) = match s[content_start..].find("```") {
            Some(rel_end) => (
                s[content_start..content_start + rel_end].trim(),
                content_start + rel_end + 3,
            ),
            None => (s[content_start..].trim(), s.len()),
        };

        if !block.is_empty() {
            return Some(block);
        }
        if next >= s.len() {
            return None;
        }
        search_start = next;
    }

    None
}

/// Byte range of the first balanced `{...}` object at or after `from`.
///
/// Braces inside JSON strings are ignored.
pub fn extract_first_json_boundaries(s: &str, from: usize) -> Option<(usize, usize)> {
    let bytes = s.as_bytes();
    let start = from + s.get(from..)?.find('{')?;

    let mut depth = 0i32;
    let mut in_string = false;

    for (pos, &ch) in bytes.iter().enumerate().skip(start) {
        if ch == b'"' && !is_escaped(bytes, pos) {
            in_string = !in_string;
            continue;
        }

        if in_string {
            continue;
        }

        if ch == b'{' {
            depth += 1;
        } else if ch == b'}' {
            depth -= 1;
            if depth == 0 {
                return Some((start, pos + 1));
            }
        }
    }

    None
}

/// Check if a quote at position is escaped by counting preceding backslashes.
fn is_escaped(bytes: &[u8], pos: usize) -> bool {
    let backslashes = bytes[..pos]
        .iter()
        .rev()
        .take_while(|&&b| b == b'\\')
        .count();
    backslashes % 2 == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(s: &str) -> Option<ParsedDecision> {
        DecisionExtractor::default().extract(s)
    }

    #[test]
    fn test_direct_json() {
        let d = extract(r#"  {"id": 42, "reasoning": "search box"}  "#).unwrap();
        assert_eq!(d.id, 42);
        assert_eq!(d.reasoning, "search box");
    }

    #[test]
    fn test_fenced_json() {
        let d = extract("Sure!\n```json\n{\"id\": 7, \"reasoning\": \"ok\"}\n```\nDone").unwrap();
        assert_eq!(d.id, 7);

        let d = extract("```\n{\"id\": 8}\n```").unwrap();
        assert_eq!(d.id, 8);
    }

    #[test]
    fn test_prose_wrapped_json() {
        let d = extract(r#"I think the answer is {"id": 3, "reasoning": "has {braces} in text"} ok?"#)
            .unwrap();
        assert_eq!(d.id, 3);
        assert_eq!(d.reasoning, "has {braces} in text");
    }

    #[test]
    fn test_first_balanced_object_wins() {
        let d = extract(r#"first {"id": 1} then {"id": 2}"#).unwrap();
        assert_eq!(d.id, 1);
    }

    #[test]
    fn test_skips_objects_without_id() {
        let d = extract(r#"{"note": "x"} and {"id": 9}"#);
        assert_eq!(d.map(|d| d.id), Some(9));
    }

    #[test]
    fn test_string_id_coerced() {
        let d = extract(r#"{"id": "42", "reasoning": "ok"}"#).unwrap();
        assert_eq!(d.id, 42);
    }

    #[test]
    fn test_bad_ids_rejected() {
        assert!(extract(r#"{"id": -3}"#).is_none());
        assert!(extract(r#"{"id": "-3"}"#).is_none());
        assert!(extract(r#"{"id": "4a"}"#).is_none());
        assert!(extract(r#"{"id": 1.5}"#).is_none());
        assert!(extract(r#"{"id": null}"#).is_none());
        assert_eq!(coerce_id(serde_json::json!(12.0)), Some(12));
    }

    #[test]
    fn test_auxiliary_fields() {
        let d = extract(
            r#"{"id": 5, "match_quality": "partial", "confidence": "0.8", "rank": 2, "reasoning": null}"#,
        )
        .unwrap();
        assert_eq!(d.match_quality, Some(MatchQuality::Partial));
        assert_eq!(d.confidence, Some(0.8));
        assert_eq!(d.extra.get("rank"), Some(&serde_json::json!(2)));
        assert_eq!(d.reasoning, "");

        let d = extract(r#"{"id": 5, "match_quality": "fuzzy"}"#).unwrap();
        assert_eq!(d.match_quality, None);
        assert_eq!(d.extra.get("match_quality"), Some(&serde_json::json!("fuzzy")));
    }

    #[test]
    fn test_garbage_fails() {
        assert!(extract("").is_none());
        assert!(extract("I cannot find it.").is_none());
        assert!(extract("[1, 2, 3]").is_none());
        assert!(extract("{\"id\": 4").is_none());
    }

    #[test]
    fn test_loose_fallback_is_opt_in() {
        let text = "The answer: 'id': 17 because it is the search box";
        assert!(extract(text).is_none());

        let loose = DecisionExtractor::new(ParserOptions::default().with_loose_id_fallback(true));
        assert_eq!(loose.extract(text).map(|d| d.id), Some(17));
        assert_eq!(loose.extract("[23] link 'Docs'").map(|d| d.id), Some(23));
        assert_eq!(
            loose.strategy_names(),
            vec!["whole", "fenced", "balanced", "loose"]
        );
    }

    #[test]
    fn test_escaped_quotes_in_strings() {
        let d = extract(r#"x {"id": 6, "reasoning": "the \"}\" char"} y"#).unwrap();
        assert_eq!(d.id, 6);
        assert_eq!(d.reasoning, "the \"}\" char");
    }

    #[test]
    fn test_bracket_id_on_any_line() {
        let loose = DecisionExtractor::new(ParserOptions::default().with_loose_id_fallback(true));
        let text = "Looking at the list, the best match is:\n  [42] link 'Official guide'\n";
        assert_eq!(loose.extract(text).map(|d| d.id), Some(42));
        assert!(loose.extract("see item [42] above").is_none());
    }
}
