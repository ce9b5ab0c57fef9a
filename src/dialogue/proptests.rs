//! Property-based tests for the dialogue transitions

use super::*;
use crate::stream::{
    CoachTone, EfCapacity, Event as StreamEvent, MetacognitionStyle, Metrics, ProcessingStyle,
};
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_metrics() -> impl Strategy<Value = Metrics> {
    (
        prop_oneof![Just(EfCapacity::High), Just(EfCapacity::Moderate), Just(EfCapacity::Low)],
        prop_oneof![
            Just(ProcessingStyle::Standard),
            Just(ProcessingStyle::HighFriction),
            Just(ProcessingStyle::Literal),
        ],
        prop_oneof![
            Just(CoachTone::Challenger),
            Just(CoachTone::Reassuring),
            Just(CoachTone::Objective),
        ],
        prop_oneof![
            Just(MetacognitionStyle::Planner),
            Just(MetacognitionStyle::Adjuster),
            Just(MetacognitionStyle::AntiPlanner),
        ],
    )
        .prop_map(|(ef_capacity, processing_style, coach_tone, metacognition_style)| Metrics {
            ef_capacity,
            processing_style,
            coach_tone,
            metacognition_style,
        })
}

fn arb_text() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z ?]{1,30}",
        Just("A. Yes B. No".to_string()),
        Just("Pick one: A) Early B) Late C) Never".to_string()),
    ]
}

fn arb_event() -> impl Strategy<Value = DialogueEvent> {
    prop_oneof![
        Just(DialogueEvent::Start),
        "[a-z ]{0,12}".prop_map(DialogueEvent::submit),
        arb_text().prop_map(DialogueEvent::text),
        arb_metrics()
            .prop_map(|metrics| DialogueEvent::Stream(StreamEvent::MetricsFinalized { metrics })),
        Just(DialogueEvent::Stream(StreamEvent::End)),
        "[a-z]{1,10}".prop_map(|detail| DialogueEvent::Stream(StreamEvent::Error { detail })),
        any::<bool>().prop_map(|finalized| DialogueEvent::StreamClosed { finalized }),
        "[a-z]{1,10}".prop_map(|message| DialogueEvent::TransportFailed { message }),
    ]
}

fn arb_events() -> impl Strategy<Value = Vec<DialogueEvent>> {
    proptest::collection::vec(arb_event(), 0..40)
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Turn index moves up one per accepted submit, and back down only when
    // that submit's stream never opened
    #[test]
    fn prop_turn_index_counts_opened_submits(events in arb_events()) {
        let mut session = Session::new();
        let mut expected = 0u32;

        for event in events {
            let is_submit = matches!(event, DialogueEvent::Submit { .. });
            let is_failure = matches!(event, DialogueEvent::TransportFailed { .. });
            let had_saved_turn = session.state.saved_turn.is_some();
            if let Ok(result) = transition(&session, event) {
                if is_submit {
                    expected += 1;
                } else if is_failure && had_saved_turn {
                    expected -= 1;
                }
                prop_assert_eq!(result.new_session.state.turn_index, expected);
                session = result.new_session;
            }
        }
    }

    // Context only grows, one entry at most per accepted submit, and keeps
    // its prefix even across failed requests
    #[test]
    fn prop_context_is_append_only(events in arb_events()) {
        let mut session = Session::new();
        let mut accepted_submits = 0usize;

        for event in events {
            let is_submit = matches!(event, DialogueEvent::Submit { .. });
            if let Ok(result) = transition(&session, event) {
                let next = result.new_session;
                if is_submit {
                    accepted_submits += 1;
                }
                prop_assert!(next.context.len() >= session.context.len());
                prop_assert!(next.context.len() <= session.context.len() + 1);
                prop_assert_eq!(&next.context[..session.context.len()], &session.context[..]);
                prop_assert!(next.context.len() <= accepted_submits);
                session = next;
            }
        }
    }

    // A failed request leaves the turn exactly as it was before the submit
    #[test]
    fn prop_transport_failure_restores_turn(
        prefix in arb_events(),
        answer in "[a-z]{1,10}",
    ) {
        let mut session = Session::new();
        for event in prefix {
            if let Ok(result) = transition(&session, event) {
                session = result.new_session;
            }
        }
        prop_assume!(!session.state.is_streaming() && !session.state.is_finalized());

        let submitted = transition(&session, DialogueEvent::submit(answer)).unwrap().new_session;
        let failed = transition(
            &submitted,
            DialogueEvent::TransportFailed { message: "down".to_string() },
        )
        .unwrap()
        .new_session;

        prop_assert_eq!(&failed.state, &session.state);
        prop_assert_eq!(&failed.context, &submitted.context);
    }

    // Nothing moves a finalized session
    #[test]
    fn prop_finalized_is_terminal(metrics in arb_metrics(), events in arb_events()) {
        let streaming = transition(&Session::new(), DialogueEvent::Start).unwrap().new_session;
        let finalized = transition(
            &streaming,
            DialogueEvent::Stream(StreamEvent::MetricsFinalized { metrics }),
        )
        .unwrap()
        .new_session;
        prop_assert!(finalized.state.is_finalized());

        for event in events {
            match transition(&finalized, event) {
                Ok(result) => {
                    prop_assert_eq!(&result.new_session, &finalized);
                    prop_assert!(result.effects.is_empty());
                }
                Err(e) => prop_assert_eq!(e, TransitionError::Finalized),
            }
        }
    }

    // While streaming, caller input is rejected as busy and changes nothing
    #[test]
    fn prop_streaming_rejects_caller_input(
        prefix in arb_events(),
        answer in "[a-z]{1,10}",
    ) {
        let mut session = Session::new();
        for event in prefix {
            if matches!(event, DialogueEvent::Stream(StreamEvent::MetricsFinalized { .. })) {
                continue;
            }
            if let Ok(result) = transition(&session, event) {
                session = result.new_session;
            }
        }
        if !session.state.is_streaming() {
            session = transition(&session, DialogueEvent::submit("next")).unwrap().new_session;
        }
        prop_assert!(session.state.is_streaming());

        prop_assert_eq!(
            transition(&session, DialogueEvent::submit(answer)).unwrap_err(),
            TransitionError::Busy
        );
        prop_assert_eq!(
            transition(&session, DialogueEvent::Start).unwrap_err(),
            TransitionError::Busy
        );
    }

    // Every accepted submit requests exactly one stream carrying the full context
    #[test]
    fn prop_submit_requests_one_stream(events in arb_events()) {
        let mut session = Session::new();
        for event in events {
            let is_caller = event.is_caller_event();
            if let Ok(result) = transition(&session, event) {
                let requests: Vec<_> = result
                    .effects
                    .iter()
                    .filter_map(|e| match e {
                        Effect::RequestStream { request } => Some(request),
                        _ => None,
                    })
                    .collect();
                if is_caller {
                    prop_assert_eq!(requests.len(), 1);
                    prop_assert_eq!(&requests[0].context, &result.new_session.context);
                    prop_assert!(result.new_session.state.is_streaming());
                } else {
                    prop_assert!(requests.is_empty());
                }
                session = result.new_session;
            }
        }
    }
}
