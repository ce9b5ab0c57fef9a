//! Property-based tests for the stream decoder
//!
//! Framing must not depend on how the transport happens to chunk the body.

use super::*;
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

/// Text content including multi-byte characters and JSON-escaped quotes
fn arb_content() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ?.!éüß€😀\"]{1,40}"
}

fn arb_record() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => arb_content().prop_map(|content| {
            format!("data: {}\n\n", serde_json::json!({ "type": "text", "content": content }))
        }),
        1 => "[a-z ]{0,20}".prop_map(|detail| {
            format!("data: {}\n\n", serde_json::json!({ "type": "error", "detail": detail }))
        }),
        1 => Just("data: {broken\n\n".to_string()),
        1 => Just("event: ping\n\n".to_string()),
        1 => Just("data: {\"type\":\"progress\",\"pct\":40}\n\n".to_string()),
    ]
}

fn arb_terminal() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("data: {\"type\":\"end\"}\n\n".to_string()),
        Just(
            "data: {\"type\":\"neuro_metrics_finalized\",\"result\":{\"ef_capacity\":\"low\",\"processing_style\":\"literal\",\"coach_tone\":\"objective\",\"metacognition_style\":\"adjuster\"}}\n\n"
                .to_string()
        ),
        Just(String::new()),
    ]
}

fn arb_body() -> impl Strategy<Value = Vec<u8>> {
    (
        proptest::collection::vec(arb_record(), 0..12),
        arb_terminal(),
        arb_record(),
    )
        .prop_map(|(records, terminal, trailing)| {
            let mut body = records.concat();
            body.push_str(&terminal);
            body.push_str(&trailing);
            body.into_bytes()
        })
}

// ============================================================================
// Helpers
// ============================================================================

fn decode_whole(body: &[u8]) -> Vec<Event> {
    let mut decoder = StreamDecoder::new();
    let mut events = decoder.push(body);
    events.extend(decoder.finish());
    events
}

fn decode_chunked(body: &[u8], cuts: &[usize]) -> Vec<Event> {
    let mut points: Vec<usize> = cuts.iter().map(|c| c % (body.len() + 1)).collect();
    points.sort_unstable();
    points.dedup();

    let mut decoder = StreamDecoder::new();
    let mut events = Vec::new();
    let mut start = 0;
    for point in points {
        events.extend(decoder.push(&body[start..point]));
        start = point;
    }
    events.extend(decoder.push(&body[start..]));
    events.extend(decoder.finish());
    events
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn prop_chunk_boundaries_do_not_change_events(
        body in arb_body(),
        cuts in proptest::collection::vec(any::<usize>(), 0..16),
    ) {
        prop_assert_eq!(decode_chunked(&body, &cuts), decode_whole(&body));
    }

    #[test]
    fn prop_byte_at_a_time_matches_whole(body in arb_body()) {
        let cuts: Vec<usize> = (1..body.len()).collect();
        prop_assert_eq!(decode_chunked(&body, &cuts), decode_whole(&body));
    }

    #[test]
    fn prop_nothing_follows_a_terminal_event(body in arb_body()) {
        let events = decode_whole(&body);
        if let Some(pos) = events.iter().position(Event::is_terminal) {
            prop_assert_eq!(pos, events.len() - 1);
        }
    }

    #[test]
    fn prop_text_content_survives_decoding(content in arb_content()) {
        let body = format!(
            "data: {}\n\n",
            serde_json::json!({ "type": "text", "content": content })
        );
        prop_assert_eq!(decode_whole(body.as_bytes()), vec![Event::Text { content }]);
    }

    #[test]
    fn prop_arbitrary_bytes_never_panic(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        let _ = decode_whole(&bytes);
    }
}
