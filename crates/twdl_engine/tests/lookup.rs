mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{error_page, image, loading_page, tweet_page, ScriptedHost};
use twdl_core::{
    EmptyManifestPolicy, LookupOutcome, LookupSession, Manifest, MediaItem, MediaKind,
    ProbeOutcome, Resolution, SessionToken,
};
use twdl_engine::{
    connect, lookup, open_bridge, Clock, PageProbe, TokioClock, ViewRequest, ViewResponse,
};

const URL: &str = "https://twitter.com/alice/status/123";
const INITIAL: Duration = Duration::from_millis(100);
const PERIOD: Duration = Duration::from_millis(125);
const TIMEOUT: Duration = Duration::from_millis(5000);

fn session(clock: &TokioClock) -> LookupSession {
    LookupSession::new(SessionToken(1), clock.now(), PERIOD, TIMEOUT)
}

#[tokio::test(start_paused = true)]
async fn retries_until_the_page_renders() {
    let host = ScriptedHost::new().page(
        URL,
        &[loading_page(), loading_page(), tweet_page(&image("A1", "jpg"))],
    );
    let log = host.log();
    let bridge = connect(host, PageProbe::new());
    let clock = TokioClock;

    let start = tokio::time::Instant::now();
    bridge.load(URL).await.unwrap();
    let outcome = lookup(&bridge, &clock, session(&clock), INITIAL, EmptyManifestPolicy::Retry)
        .await
        .unwrap();

    let LookupOutcome::Resolved(Resolution::Found(manifest)) = outcome else {
        panic!("expected media, got {outcome:?}");
    };
    assert_eq!(manifest.len(), 1);

    let probes = log.lock().unwrap().probes.clone();
    assert_eq!(probes.len(), 3);
    let offsets: Vec<Duration> = probes.iter().map(|p| *p - start).collect();
    assert!(offsets[0] >= INITIAL && offsets[0] < INITIAL + PERIOD);
    assert!(offsets[1] - offsets[0] >= PERIOD);
    assert!(offsets[2] - offsets[1] >= PERIOD);
}

#[tokio::test(start_paused = true)]
async fn never_probes_after_the_deadline() {
    let host = ScriptedHost::new().page(URL, &[loading_page()]);
    let log = host.log();
    let bridge = connect(host, PageProbe::new());
    let clock = TokioClock;

    let start = tokio::time::Instant::now();
    let session = session(&clock);
    bridge.load(URL).await.unwrap();
    let outcome = lookup(&bridge, &clock, session, INITIAL, EmptyManifestPolicy::Retry)
        .await
        .unwrap();

    match outcome {
        LookupOutcome::TimedOut { elapsed } => assert!(elapsed >= TIMEOUT),
        other => panic!("expected timeout, got {other:?}"),
    }
    let probes = log.lock().unwrap().probes.clone();
    assert!(probes.len() > 30, "only {} probes", probes.len());
    assert!(probes.iter().all(|p| *p - start < TIMEOUT));
}

#[tokio::test(start_paused = true)]
async fn rejection_aborts_on_first_probe() {
    let host = ScriptedHost::new()
        .page(URL, &[tweet_page(&image("A1", "jpg"))])
        .rejecting(URL, "net::ERR_CONNECTION_RESET");
    let log = host.log();
    let bridge = connect(host, PageProbe::new());
    let clock = TokioClock;

    bridge.load(URL).await.unwrap();
    let outcome = lookup(&bridge, &clock, session(&clock), INITIAL, EmptyManifestPolicy::Retry)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        LookupOutcome::Aborted {
            reason: "net::ERR_CONNECTION_RESET".to_string()
        }
    );
    assert_eq!(log.lock().unwrap().probes.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn page_error_is_skipped_without_retry() {
    let host = ScriptedHost::new().page(URL, &[error_page("Hmm...this page doesn't exist.")]);
    let bridge = connect(host, PageProbe::new());
    let clock = TokioClock;

    bridge.load(URL).await.unwrap();
    let outcome = lookup(&bridge, &clock, session(&clock), INITIAL, EmptyManifestPolicy::Retry)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        LookupOutcome::Resolved(Resolution::Skipped {
            message: "Hmm...this page doesn't exist.".to_string()
        })
    );
}

#[tokio::test(start_paused = true)]
async fn empty_manifest_policy_decides_between_retry_and_accept() {
    let text_only = tweet_page("<p>no media here</p>");

    let host = ScriptedHost::new().page(URL, &[text_only.clone()]);
    let bridge = connect(host, PageProbe::new());
    let clock = TokioClock;
    bridge.load(URL).await.unwrap();
    let accepted = lookup(&bridge, &clock, session(&clock), INITIAL, EmptyManifestPolicy::Accept)
        .await
        .unwrap();
    assert!(matches!(
        accepted,
        LookupOutcome::Resolved(Resolution::Found(ref m)) if m.is_empty()
    ));

    let host = ScriptedHost::new().page(URL, &[text_only]);
    let bridge = connect(host, PageProbe::new());
    bridge.load(URL).await.unwrap();
    let retried = lookup(&bridge, &clock, session(&clock), INITIAL, EmptyManifestPolicy::Retry)
        .await
        .unwrap();
    assert!(matches!(retried, LookupOutcome::TimedOut { .. }));
}

#[tokio::test]
async fn session_epoch_before_load_counts_towards_the_timeout() {
    let host = ScriptedHost::new().page(URL, &[loading_page()]);
    let bridge = connect(host, PageProbe::new());
    let clock = TokioClock;

    let expired = LookupSession::new(
        SessionToken(7),
        Instant::now() - Duration::from_secs(10),
        PERIOD,
        TIMEOUT,
    );
    bridge.load(URL).await.unwrap();
    let outcome = lookup(&bridge, &clock, expired, Duration::ZERO, EmptyManifestPolicy::Retry)
        .await
        .unwrap();
    assert!(matches!(outcome, LookupOutcome::TimedOut { .. }));
}

#[tokio::test(start_paused = true)]
async fn rejection_survives_a_failed_document_read() {
    let host = ScriptedHost::new()
        .page(URL, &[tweet_page(&image("A1", "jpg"))])
        .rejecting(URL, "net::ERR_INTERNET_DISCONNECTED")
        .failing_documents(1);
    let log = host.log();
    let bridge = connect(host, PageProbe::new());
    let clock = TokioClock;

    bridge.load(URL).await.unwrap();
    let outcome = lookup(&bridge, &clock, session(&clock), INITIAL, EmptyManifestPolicy::Retry)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        LookupOutcome::Aborted {
            reason: "net::ERR_INTERNET_DISCONNECTED".to_string()
        }
    );
    assert_eq!(log.lock().unwrap().probes.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_document_read_without_rejections_is_retried() {
    let host = ScriptedHost::new()
        .page(URL, &[tweet_page(&image("A1", "jpg"))])
        .failing_documents(2);
    let log = host.log();
    let bridge = connect(host, PageProbe::new());
    let clock = TokioClock;

    bridge.load(URL).await.unwrap();
    let outcome = lookup(&bridge, &clock, session(&clock), INITIAL, EmptyManifestPolicy::Retry)
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        LookupOutcome::Resolved(Resolution::Found(ref m)) if m.len() == 1
    ));
    assert_eq!(log.lock().unwrap().probes.len(), 3);
}

fn single(name: &str) -> Manifest {
    let url = format!("https://pbs.twimg.com/media/{name}:large");
    [(
        name.to_string(),
        MediaItem {
            source_url: url.clone(),
            download_url: url,
            kind: MediaKind::Image,
            label: None,
        },
    )]
    .into_iter()
    .collect()
}

#[tokio::test(start_paused = true)]
async fn answer_for_another_session_is_ignored() {
    let (bridge, mut view) = open_bridge();
    let answered = Arc::new(AtomicUsize::new(0));
    let counter = answered.clone();
    tokio::spawn(async move {
        while let Some((id, request)) = view.requests.recv().await {
            let response = match request {
                ViewRequest::LookupImages { session } => {
                    let (name, token) = match counter.fetch_add(1, Ordering::SeqCst) {
                        0 => ("stale.jpg", SessionToken(session.0 + 100)),
                        _ => ("fresh.jpg", session),
                    };
                    ViewResponse::ImagesFound {
                        outcome: ProbeOutcome::Found(single(name)),
                        session: token,
                    }
                }
                ViewRequest::Load { .. } => ViewResponse::Loaded,
                ViewRequest::Download { url } => ViewResponse::Failed { message: url },
            };
            if view.responses.send((id, response)).await.is_err() {
                break;
            }
        }
    });
    let clock = TokioClock;

    let outcome = lookup(&bridge, &clock, session(&clock), INITIAL, EmptyManifestPolicy::Retry)
        .await
        .unwrap();

    let LookupOutcome::Resolved(Resolution::Found(manifest)) = outcome else {
        panic!("expected media, got {outcome:?}");
    };
    assert!(manifest.contains("fresh.jpg"));
    assert!(!manifest.contains("stale.jpg"));
    assert_eq!(answered.load(Ordering::SeqCst), 2);
}
