mod common;

use common::{at, key, request, TestGate};
use hint_gate::{config::GateConfig, RejectionReason};

const FIRST_QUESTION: &str = "Hãy nhớ lại câu chuyện trăm trứng";

/// Accept times that satisfy the progressive throttle exactly:
/// attempt n comes 10·n seconds after attempt n-1.
fn accepted_schedule(n: u32) -> Vec<i64> {
    (1..=n as i64).map(|i| 10 * (i * (i + 1) / 2 - 1)).collect()
}

async fn fill_hour(gate: &TestGate, n: u32) -> i64 {
    let mut last = 0;
    for (i, secs) in accepted_schedule(n).into_iter().enumerate() {
        let decision = gate
            .ask(secs, &format!("tell me about chapter {}", i + 1))
            .await;
        assert!(decision.allowed, "attempt {} at t={} rejected: {:?}", i + 1, secs, decision);
        assert_eq!(decision.hint_level, i as u32 + 1);
        last = secs;
    }
    last
}

#[tokio::test]
async fn test_escalation_walkthrough() {
    let gate = TestGate::new();

    let first = gate.ask(0, FIRST_QUESTION).await;
    assert!(first.allowed);
    assert_eq!(first.hint_level, 1);

    let too_soon = gate.ask(5, "what was the next step again").await;
    assert!(!too_soon.allowed);
    assert_eq!(too_soon.reason, Some(RejectionReason::TimeThrottle));
    assert_eq!(too_soon.retry_after_seconds, Some(15));
    assert_eq!(too_soon.hint_level, 1);

    let repeated = gate.ask(25, FIRST_QUESTION).await;
    assert!(!repeated.allowed);
    assert_eq!(repeated.reason, Some(RejectionReason::Duplicate));

    let second = gate.ask(30, "which animal hatched from the eggs").await;
    assert!(second.allowed);
    assert_eq!(second.hint_level, 2);
}

#[tokio::test]
async fn test_content_rejections() {
    let gate = TestGate::new();

    for (message, reason) in [
        ("ab", RejectionReason::TooShort),
        ("   ab   ", RejectionReason::TooShort),
        ("111111", RejectionReason::SpamPattern),
        ("aaaa", RejectionReason::SpamPattern),
        ("?!?!", RejectionReason::SpamPattern),
        ("hi ok", RejectionReason::NoMeaningfulWords),
    ] {
        let decision = gate.ask(0, message).await;
        assert!(!decision.allowed, "{:?} should be rejected", message);
        assert_eq!(decision.reason, Some(reason), "wrong reason for {:?}", message);
        assert_eq!(decision.hint_level, 0);
    }

    assert!(gate.record().await.is_none());
}

#[tokio::test]
async fn test_rate_limit_after_full_hour() {
    let gate = TestGate::new();
    let last = fill_hour(&gate, 20).await;
    assert_eq!(last, 2090);

    let decision = gate.ask(2300, "tell me about chapter 21").await;
    assert!(!decision.allowed);
    assert_eq!(decision.reason, Some(RejectionReason::RateLimit));
    assert_eq!(decision.hint_level, 20);
    // The attempt at t=0 leaves the window at t=3600.
    assert_eq!(decision.retry_after_seconds, Some(1300));
}

#[tokio::test]
async fn test_rate_budget_frees_as_window_slides() {
    let gate = TestGate::new();
    fill_hour(&gate, 20).await;

    let decision = gate.ask(3601, "tell me about chapter 21").await;
    assert!(decision.allowed);
    assert_eq!(decision.hint_level, 21);

    // The t=0 entry fell out of the window and was pruned on write.
    let record = gate.record().await.unwrap();
    assert_eq!(record.count, 21);
    assert_eq!(record.attempts.len(), 20);
    assert!(record.attempts.iter().all(|entry| entry.timestamp > at(1)));
}

#[tokio::test]
async fn test_history_kept_when_pruning_disabled() {
    let gate = TestGate::with_config(GateConfig {
        prune_history: false,
        ..GateConfig::default()
    });
    fill_hour(&gate, 20).await;

    gate.ask(3601, "tell me about chapter 21").await;

    let record = gate.record().await.unwrap();
    assert_eq!(record.count, 21);
    assert_eq!(record.attempts.len(), 21);
}

#[tokio::test]
async fn test_reset_starts_over() {
    let gate = TestGate::new();
    gate.ask(0, FIRST_QUESTION).await;
    gate.ask(30, "which animal hatched from the eggs").await;

    tokio_test::assert_ok!(gate.service.reset(&key()).await);
    assert!(gate.record().await.is_none());

    // Immediately after reset there is nothing to throttle against.
    let decision = gate.ask(31, FIRST_QUESTION).await;
    assert!(decision.allowed);
    assert_eq!(decision.hint_level, 1);
}

#[tokio::test]
async fn test_hint_level_rises_by_one_per_acceptance() {
    let gate = TestGate::new();
    let messages = [
        (0, "where does the story begin"),
        (3, "where does the story begin"),
        (20, "where does the story begin"),
        (21, "who is the dragon king here"),
        (40, "xyz"),
        (60, "what happened to the hundred children"),
        (100, "why did they split between mountains and sea"),
    ];

    let mut level = 0;
    for (secs, message) in messages {
        let decision = gate.ask(secs, message).await;
        if decision.allowed {
            assert_eq!(decision.hint_level, level + 1, "skipped a level at t={}", secs);
            level = decision.hint_level;
        } else {
            assert_eq!(decision.hint_level, level);
        }
    }
    assert_eq!(level, 4);
}

#[tokio::test]
async fn test_rejection_leaves_record_untouched() {
    let gate = TestGate::new();
    gate.ask(0, FIRST_QUESTION).await;
    let before = gate.record().await.unwrap();

    for (secs, message) in [(1, "why the eggs"), (25, FIRST_QUESTION), (26, "!!!")] {
        let decision = gate.ask(secs, message).await;
        assert!(!decision.allowed);
        assert_eq!(gate.record().await.unwrap(), before);
    }
}

#[tokio::test]
async fn test_record_expires_after_a_day() {
    let gate = TestGate::new();
    gate.ask(0, FIRST_QUESTION).await;
    assert!(gate.record().await.is_some());

    let decision = gate.ask(86_400, FIRST_QUESTION).await;
    assert!(decision.allowed);
    assert_eq!(decision.hint_level, 1);
}

#[tokio::test]
async fn test_engagement_needs_time_per_hint() {
    let gate = TestGate::with_config(GateConfig {
        time_throttle_enabled: false,
        ..GateConfig::default()
    });
    gate.ask(0, FIRST_QUESTION).await;

    let decision = gate.ask(2, "which animal hatched from the eggs").await;
    assert_eq!(decision.reason, Some(RejectionReason::InsufficientThinking));
    assert_eq!(decision.retry_after_seconds, Some(3));

    assert!(gate.ask(5, "which animal hatched from the eggs").await.allowed);
}

#[tokio::test]
async fn test_disabled_gates_let_requests_through() {
    let gate = TestGate::with_config(GateConfig {
        time_throttle_enabled: false,
        content_validation_enabled: false,
        duplicate_detection_enabled: false,
        engagement_enabled: false,
        ..GateConfig::default()
    });

    assert!(gate.ask(0, "ab").await.allowed);
    assert!(gate.ask(0, "ab").await.allowed);
    let third = gate.ask(1, "111111").await;
    assert!(third.allowed);
    assert_eq!(third.hint_level, 3);
}

#[tokio::test]
async fn test_stats_report_timing() {
    let gate = TestGate::new();

    let empty = gate.service.stats(&key()).await.unwrap();
    assert_eq!(empty.count, 0);
    assert_eq!(empty.total_time_seconds, 0.0);
    assert_eq!(empty.average_interval_seconds, 0.0);

    gate.ask(0, FIRST_QUESTION).await;
    gate.ask(30, "which animal hatched from the eggs").await;

    let stats = gate.service.stats(&key()).await.unwrap();
    assert_eq!(stats.count, 2);
    assert_eq!(stats.attempts.len(), 2);
    assert_eq!(stats.attempts[1].hint_level_at_time, 2);
    assert_eq!(stats.total_time_seconds, 30.0);
    assert_eq!(stats.average_interval_seconds, 30.0);
}

#[tokio::test]
async fn test_keys_are_independent() {
    let gate = TestGate::new();
    gate.ask(0, FIRST_QUESTION).await;

    let other = hint_gate::EvaluateRequest::new("user-1", "level-1", "question-2", FIRST_QUESTION);
    let decision = gate.service.evaluate(&other, at(1)).await.unwrap();
    assert!(decision.allowed);
    assert_eq!(decision.hint_level, 1);

    // The first key is still throttled.
    let same_key = gate.service.evaluate(&request("a different question"), at(1)).await.unwrap();
    assert_eq!(same_key.reason, Some(RejectionReason::TimeThrottle));
}

#[tokio::test]
async fn test_oversized_window_keeps_fresh_attempts() {
    // Unvalidated config: the window must saturate, not wrap around.
    let gate = TestGate::with_config(GateConfig {
        rate_window_seconds: u64::MAX,
        max_per_hour: 1,
        ..GateConfig::default()
    });

    assert!(gate.ask(0, FIRST_QUESTION).await.allowed);
    let record = gate.record().await.unwrap();
    assert_eq!(record.attempts.len(), 1);

    let second = gate.ask(30, "which animal hatched from the eggs").await;
    assert_eq!(second.reason, Some(RejectionReason::RateLimit));
}

#[tokio::test]
async fn test_stats_average_survives_pruning() {
    let gate = TestGate::new();
    gate.ask(0, FIRST_QUESTION).await;
    gate.ask(30, "which animal hatched from the eggs").await;
    gate.ask(7230, "why did they split between mountains and sea").await;

    let stats = gate.service.stats(&key()).await.unwrap();
    assert_eq!(stats.count, 3);
    assert_eq!(stats.attempts.len(), 1);
    assert_eq!(stats.total_time_seconds, 7230.0);
    assert_eq!(stats.average_interval_seconds, 3615.0);
}
