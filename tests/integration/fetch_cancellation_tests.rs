/*!
 * Tests for cooperative fetch cancellation via the generation token and
 * for the retry schedule around transient failures
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::time::{Duration, sleep};

use captrace::app_config::Config;
use captrace::boundaries::{CaptionDom, PageState, PlayerHandle, TrackPayloadSource};
use captrace::errors::FetchError;
use captrace::provider::{CaptionProvider, SourceState};
use captrace::track::TrackFetcher;

use crate::common::{MockPayloadSource, MockStack, ScriptedPageState, json3_body};

fn sample_payload() -> String {
    json3_body(&[("Hello there.", 0, 1200), ("How are you?", 1500, 1400)])
}

#[test]
fn test_load_full_track_cues_withImmediateSuccess_shouldReturnTrackAndEvents() {
    let page = Arc::new(ScriptedPageState::with_english_track(
        "https://captions.test/api/timedtext?v=abc",
    ));
    let source = Arc::new(MockPayloadSource::respond_with(&sample_payload()));

    let generation = AtomicU64::new(1);
    let fetcher = TrackFetcher::new(
        page as Arc<dyn PageState>,
        source as Arc<dyn TrackPayloadSource>,
        "en",
        vec![0],
    );

    let outcome = tokio_test::block_on(fetcher.load_full_track_cues(1, &generation)).unwrap();
    assert_eq!(outcome.events.len(), 2);
    assert_eq!(outcome.track.language_code.as_deref(), Some("en"));
}

#[tokio::test(start_paused = true)]
async fn test_load_full_track_cues_withGenerationBumpMidFlight_shouldAbandonResult() {
    let page = Arc::new(ScriptedPageState::with_english_track(
        "https://captions.test/api/timedtext?v=abc",
    ));
    let source = Arc::new(MockPayloadSource::respond_with(&sample_payload()));
    source.delay_ms.store(500, Ordering::SeqCst);

    let generation = Arc::new(AtomicU64::new(7));
    let fetcher = TrackFetcher::new(
        page as Arc<dyn PageState>,
        Arc::clone(&source) as Arc<dyn TrackPayloadSource>,
        "en",
        vec![0, 250],
    );

    let task_generation = Arc::clone(&generation);
    let handle = tokio::spawn(async move {
        fetcher.load_full_track_cues(7, &task_generation).await
    });

    // Session restarts while the request is in flight
    sleep(Duration::from_millis(100)).await;
    generation.store(8, Ordering::SeqCst);
    sleep(Duration::from_millis(600)).await;

    let result = handle.await.unwrap();
    assert!(matches!(result, Err(FetchError::StaleGeneration)));
    // The request itself went out exactly once
    assert_eq!(source.requests.lock().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_load_full_track_cues_withTransientFailures_shouldRetryUntilSuccess() {
    let page = Arc::new(ScriptedPageState::with_english_track(
        "https://captions.test/api/timedtext?v=abc",
    ));
    let source = Arc::new(MockPayloadSource::with_responses(vec![
        Err(FetchError::BadStatus { status: 503 }),
        Err(FetchError::RequestFailed("connection reset".to_string())),
        Ok(sample_payload()),
    ]));

    let generation = AtomicU64::new(1);
    let fetcher = TrackFetcher::new(
        page as Arc<dyn PageState>,
        Arc::clone(&source) as Arc<dyn TrackPayloadSource>,
        "en",
        vec![0, 250, 700, 1400],
    );

    let outcome = fetcher.load_full_track_cues(1, &generation).await.unwrap();
    assert_eq!(outcome.events.len(), 2);
    assert_eq!(source.requests.lock().len(), 3);
    // Every attempt requests the machine-parseable format
    assert!(source.requests.lock().iter().all(|u| u.contains("fmt=json3")));
}

#[tokio::test(start_paused = true)]
async fn test_load_full_track_cues_withEmptyPayloads_shouldExhaustSchedule() {
    let page = Arc::new(ScriptedPageState::with_english_track(
        "https://captions.test/api/timedtext?v=abc",
    ));
    let source = Arc::new(MockPayloadSource::with_responses(vec![
        Ok(r#"{"events":[]}"#.to_string()),
        Ok(r#"{"events":[]}"#.to_string()),
    ]));

    let generation = AtomicU64::new(1);
    let fetcher = TrackFetcher::new(
        page as Arc<dyn PageState>,
        source as Arc<dyn TrackPayloadSource>,
        "en",
        vec![0, 250],
    );

    let result = fetcher.load_full_track_cues(1, &generation).await;
    assert!(matches!(result, Err(FetchError::Exhausted { attempts: 2 })));
}

#[tokio::test(start_paused = true)]
async fn test_stop_beforePayloadResolves_shouldLeaveNoSource() {
    let payload = sample_payload();
    let stack = MockStack::new(None, Some(&payload));
    stack.source.delay_ms.store(500, Ordering::SeqCst);

    let mut config = Config::default();
    config.timeline.enabled = false;
    let provider = CaptionProvider::new(
        config,
        Arc::clone(&stack.dom) as Arc<dyn CaptionDom>,
        Arc::clone(&stack.player) as Arc<dyn PlayerHandle>,
        Arc::clone(&stack.page) as Arc<dyn PageState>,
        Arc::clone(&stack.source) as Arc<dyn TrackPayloadSource>,
    );

    provider.start();
    sleep(Duration::from_millis(100)).await;
    provider.stop();
    sleep(Duration::from_millis(1000)).await;

    // The in-flight result never reached the session
    assert_eq!(provider.state(), SourceState::NoSource);
    assert!(provider.get_full_cues().is_none());

    // A fresh session acquires the track normally: the first request was
    // torn down before it could consume the scripted response
    provider.start();
    sleep(Duration::from_millis(600)).await;
    assert_eq!(provider.state(), SourceState::FullAcquired);
    assert_eq!(provider.get_full_cues().expect("full cues").len(), 2);
}
