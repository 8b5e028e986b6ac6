use jmenovka_core::{JmenovkaError, Record, Span, parse_line, resolve_overlaps};
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;

// ===================
// Strategies
// ===================

fn span_strategy() -> impl Strategy<Value = Span> {
    (0usize..60, 1usize..15, prop::sample::select(vec!["P", "GU", "IO", "T"]))
        .prop_map(|(start, len, label)| Span::new(start, start + len, label))
}

fn spans_strategy() -> impl Strategy<Value = Vec<Span>> {
    prop::collection::vec(span_strategy(), 0..12)
}

fn word_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Záčďéěíňóřšťúůýž]{1,8}"
}

/// A corpus line built from plain words and `<ne>` mentions, together with
/// the mention texts it contains.
fn line_strategy() -> impl Strategy<Value = (String, Vec<String>)> {
    prop::collection::vec((word_strategy(), any::<bool>()), 1..10).prop_map(|parts| {
        let mut line = Vec::new();
        let mut mentions = Vec::new();
        for (word, is_entity) in parts {
            if is_entity {
                line.push(format!(r#"<ne type="p">{word}</ne>"#));
                mentions.push(word);
            } else {
                line.push(word);
            }
        }
        (line.join(" "), mentions)
    })
}

// ===================
// Checks
// ===================

fn check_resolved_spans_are_sorted_and_disjoint(spans: Vec<Span>) -> Result<(), TestCaseError> {
    let resolved = resolve_overlaps(&spans);
    for pair in resolved.windows(2) {
        prop_assert!(pair[0].start <= pair[1].start);
        prop_assert!(pair[1].start >= pair[0].end);
    }
    Ok(())
}

fn check_resolution_is_idempotent(spans: Vec<Span>) -> Result<(), TestCaseError> {
    let once = resolve_overlaps(&spans);
    let twice = resolve_overlaps(&once);
    prop_assert_eq!(once, twice);
    Ok(())
}

fn check_resolution_keeps_a_subset(spans: Vec<Span>) -> Result<(), TestCaseError> {
    let resolved = resolve_overlaps(&spans);
    prop_assert!(resolved.len() <= spans.len());
    for span in &resolved {
        prop_assert!(spans.contains(span));
    }
    Ok(())
}

fn check_earliest_span_always_survives(spans: Vec<Span>) -> Result<(), TestCaseError> {
    let resolved = resolve_overlaps(&spans);
    if let Some(min_start) = spans.iter().map(|s| s.start).min() {
        let first = spans.iter().find(|s| s.start == min_start);
        prop_assert_eq!(resolved.first(), first);
    }
    Ok(())
}

fn check_span_text_matches_mention(
    line: String,
    mentions: Vec<String>,
) -> Result<(), TestCaseError> {
    let record = parse_line(&line).map_err(|e| TestCaseError::fail(e.to_string()))?.resolved();

    for span in record.entities() {
        let text = record.span_text(span);
        prop_assert!(text.is_some());
        prop_assert!(mentions.iter().any(|m| Some(m.as_str()) == text));
        prop_assert!(span.end <= record.char_len());
    }
    for pair in record.entities().windows(2) {
        prop_assert!(pair[1].start >= pair[0].end);
    }
    Ok(())
}

// ===================
// Proptest Wrappers
// ===================

proptest! {
    #[test]
    fn resolved_spans_are_sorted_and_disjoint(spans in spans_strategy()) {
        check_resolved_spans_are_sorted_and_disjoint(spans)?;
    }

    #[test]
    fn resolution_is_idempotent(spans in spans_strategy()) {
        check_resolution_is_idempotent(spans)?;
    }

    #[test]
    fn resolution_keeps_a_subset(spans in spans_strategy()) {
        check_resolution_keeps_a_subset(spans)?;
    }

    #[test]
    fn earliest_span_always_survives(spans in spans_strategy()) {
        check_earliest_span_always_survives(spans)?;
    }

    #[test]
    fn span_text_matches_mention((line, mentions) in line_strategy()) {
        check_span_text_matches_mention(line, mentions)?;
    }
}

// ===================
// Worked examples
// ===================

#[test]
fn shaka_khan_example() {
    let record = parse_line(r#"Who is <ne type="person">Shaka Khan</ne>? He called."#).unwrap();

    assert_eq!(record.text(), "Who is Shaka Khan? He called.");
    assert_eq!(record.entities(), &[Span::new(7, 17, "PERSON")]);
}

#[test]
fn nested_mention_is_dropped_by_resolver() {
    let record = Record::new(
        "Flights to New York City leave daily.",
        vec![Span::new(11, 24, "LOC"), Span::new(15, 19, "LOC")],
    )
    .unwrap();

    assert_eq!(record.resolved().entities(), &[Span::new(11, 24, "LOC")]);
}

#[test]
fn mention_text_spans_inline_markup() {
    let record = parse_line(
        r#"<ne type="p">Jan</ne> a <ne type="p">Marie<b/>  Nová</ne> do <ne type="gu">Brna</ne>."#,
    )
    .unwrap();

    assert_eq!(record.text(), "Jan a Marie  Nová do Brna.");
    let labels: Vec<_> = record
        .entities()
        .iter()
        .map(|s| record.span_text(s).unwrap())
        .collect();
    assert_eq!(labels, vec!["Jan", "Marie  Nová", "Brna"]);
}

#[test]
fn malformed_line_yields_no_record() {
    let result = parse_line(r#"<ne type="p">Jan</ne> & <ne type="p">Marie"#);
    assert!(matches!(result, Err(JmenovkaError::Malformed { .. })));
}
