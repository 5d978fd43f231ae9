//! Tolerant extraction of news records from generated text.
//!
//! Model output is untrusted: the JSON array may be wrapped in prose or code
//! fences, truncated mid-element, or carry trailing commas. Parsing recovers
//! what it can and never fails; the worst case is an empty record list.

use serde_json::Value;

pub const DEFAULT_PUBLISHER: &str = "Global Wire";
pub const DEFAULT_ABSTRACT: &str = "Full details available at the source.";
pub const DEFAULT_CATEGORY: &str = "World";

/// One story as described by the content source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub title: String,
    pub publisher: String,
    pub abstract_text: String,
    pub category: String,
}

/// Records recovered from a response, plus whether repair was needed.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ParseOutcome {
    pub records: Vec<RawRecord>,
    pub repaired: bool,
}

/// Parse a JSON array of `{title, publisher, abstract, category}` objects out
/// of free text.
pub fn parse_records(text: &str) -> ParseOutcome {
    let Some(span) = array_tail(text) else {
        tracing::debug!("No JSON array found in content response");
        return ParseOutcome::default();
    };

    // Stream-parse so prose or a closing code fence after the array is ignored.
    let mut stream = serde_json::Deserializer::from_str(span).into_iter::<Vec<Value>>();
    if let Some(Ok(values)) = stream.next() {
        return ParseOutcome {
            records: to_records(values),
            repaired: false,
        };
    }

    let Some(repaired) = repair_truncated(span) else {
        tracing::warn!(len = span.len(), "Malformed JSON array could not be repaired");
        return ParseOutcome::default();
    };

    match serde_json::from_str::<Vec<Value>>(&repaired) {
        Ok(values) => {
            tracing::warn!(
                original_len = span.len(),
                repaired_len = repaired.len(),
                "Recovered records from malformed JSON array"
            );
            ParseOutcome {
                records: to_records(values),
                repaired: true,
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Malformed JSON array could not be repaired");
            ParseOutcome::default()
        }
    }
}

/// Text from the first `[` that opens an array of objects (or the first `[`
/// at all) to the end.
fn array_tail(text: &str) -> Option<&str> {
    let start = text
        .match_indices('[')
        .map(|(i, _)| i)
        .find(|&i| {
            matches!(
                text[i + 1..].trim_start().chars().next(),
                Some('{') | Some(']')
            )
        })
        .or_else(|| text.find('['))?;

    Some(&text[start..])
}

/// Cut `span` after the last complete top-level element and close the array.
///
/// Returns `None` if no element was ever completed.
fn repair_truncated(span: &str) -> Option<String> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut last_complete: Option<usize> = None;

    for (i, c) in span.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '[' | '{' => depth += 1,
            ']' | '}' => {
                depth = depth.saturating_sub(1);
                // Back at array level: an element just closed.
                if depth == 1 {
                    last_complete = Some(i + c.len_utf8());
                }
                if depth == 0 {
                    break;
                }
            }
            _ => {}
        }
    }

    last_complete.map(|end| format!("{}]", &span[..end]))
}

fn to_records(values: Vec<Value>) -> Vec<RawRecord> {
    values.into_iter().filter_map(to_record).collect()
}

fn to_record(value: Value) -> Option<RawRecord> {
    let obj = value.as_object()?;
    let field = |name: &str| {
        obj.get(name)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    Some(RawRecord {
        title: field("title")?,
        publisher: field("publisher").unwrap_or_else(|| DEFAULT_PUBLISHER.to_string()),
        abstract_text: field("abstract")
            .or_else(|| field("summary"))
            .unwrap_or_else(|| DEFAULT_ABSTRACT.to_string()),
        category: field("category").unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn titles(outcome: &ParseOutcome) -> Vec<&str> {
        outcome.records.iter().map(|r| r.title.as_str()).collect()
    }

    #[test]
    fn test_plain_array() {
        let text = r#"[{"title":"A","publisher":"P","abstract":"S","category":"Tech"}]"#;
        let outcome = parse_records(text);
        assert!(!outcome.repaired);
        assert_eq!(
            outcome.records,
            vec![RawRecord {
                title: "A".into(),
                publisher: "P".into(),
                abstract_text: "S".into(),
                category: "Tech".into(),
            }]
        );
    }

    #[test]
    fn test_array_inside_code_fence_and_prose() {
        let text = "Here are the stories:\n```json\n[{\"title\":\"A\"},{\"title\":\"B\"}]\n```\nEnjoy!";
        assert_eq!(titles(&parse_records(text)), vec!["A", "B"]);
    }

    #[test]
    fn test_skips_bracketed_prose_before_array() {
        let text = "Sources [1] and [2] say:\n[{\"title\":\"A\"}]";
        assert_eq!(titles(&parse_records(text)), vec!["A"]);
    }

    #[test]
    fn test_truncated_array_is_repaired() {
        let text = r#"[{"title":"A","publisher":"P"},{"title":"B","abstract":"Half a sen"#;
        let outcome = parse_records(text);
        assert!(outcome.repaired);
        assert_eq!(titles(&outcome), vec!["A"]);
    }

    #[test]
    fn test_trailing_comma_is_repaired() {
        let text = r#"[{"title":"A"},{"title":"B"},]"#;
        let outcome = parse_records(text);
        assert!(outcome.repaired);
        assert_eq!(titles(&outcome), vec!["A", "B"]);
    }

    #[test]
    fn test_brackets_inside_strings_do_not_confuse_repair() {
        let text = r#"[{"title":"Fed [update] \"live\" }"},{"title":"cut"#;
        let outcome = parse_records(text);
        assert_eq!(titles(&outcome), vec![r#"Fed [update] "live" }"#]);
    }

    #[test]
    fn test_unrepairable_returns_empty() {
        assert_eq!(parse_records(r#"[{"title":"A""#), ParseOutcome::default());
        assert_eq!(parse_records("no json here"), ParseOutcome::default());
        assert_eq!(parse_records(""), ParseOutcome::default());
    }

    #[test]
    fn test_defaults_and_skipped_records() {
        let text = r#"[
            {"title":"  Kept  "},
            {"publisher":"No title"},
            {"title":""},
            "just a string",
            42,
            {"title":"Summary alias","summary":"From summary","category":"Science"}
        ]"#;
        let outcome = parse_records(text);
        assert_eq!(titles(&outcome), vec!["Kept", "Summary alias"]);
        assert_eq!(outcome.records[0].publisher, DEFAULT_PUBLISHER);
        assert_eq!(outcome.records[0].abstract_text, DEFAULT_ABSTRACT);
        assert_eq!(outcome.records[0].category, DEFAULT_CATEGORY);
        assert_eq!(outcome.records[1].abstract_text, "From summary");
    }

    #[test]
    fn test_non_string_fields_fall_back() {
        let text = r#"[{"title":"A","publisher":7,"category":null}]"#;
        let outcome = parse_records(text);
        assert_eq!(outcome.records[0].publisher, DEFAULT_PUBLISHER);
        assert_eq!(outcome.records[0].category, DEFAULT_CATEGORY);
    }

    #[test]
    fn test_empty_array() {
        let outcome = parse_records("[]");
        assert!(outcome.records.is_empty());
        assert!(!outcome.repaired);
    }
}
