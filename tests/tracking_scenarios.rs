use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, TimeZone, Utc};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use iss_track::catalog::{CatalogError, TleLoader, TleSource};
use iss_track::tracker::{
    DisplayUpdate, Frame, LocalFrame, TrackerSettings, TrackingController, TrackingPhase,
};

const VISUAL_TXT: &str = "ISS (ZARYA)
1 25544U 98067A   25278.49802050  .00011384  00000+0  20935-3 0  9990
2 25544  51.6327 120.3420 0000884 206.2421 153.8523 15.49697304532279
";

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 5, 12, 30, 10).unwrap()
}

fn temp_tle_file(tag: &str, content: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "iss-track-{}-{}.txt",
        tag,
        std::process::id()
    ));
    std::fs::write(&path, content).unwrap();
    path
}

/// Serve one HTTP response on a local port and return its URL.
async fn serve_once(status: &'static str, body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = [0u8; 2048];
        let _ = socket.read(&mut request).await;
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
    });
    format!("http://{}/visual.txt", addr)
}

/// Accept a connection and never answer.
async fn serve_nothing() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (_socket, _) = listener.accept().await.unwrap();
        tokio::time::sleep(StdDuration::from_secs(3600)).await;
    });
    format!("http://{}/visual.txt", addr)
}

/// Loader that talks to the local stubs directly, whatever the proxy env says.
fn local_loader() -> TleLoader {
    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    TleLoader::with_client(client)
}

/// Tick at a fixed instant until the pending load resolves.
async fn tick_until_loaded(controller: &mut TrackingController, now: DateTime<Utc>) {
    for _ in 0..500 {
        controller.tick(now, None);
        if !controller.is_loading() {
            return;
        }
        tokio::time::sleep(StdDuration::from_millis(10)).await;
    }
    panic!("TLE load did not complete");
}

#[tokio::test]
async fn http_load_reports_progress_and_parses() {
    let url = serve_once("200 OK", VISUAL_TXT).await;
    let progress = Arc::new(Mutex::new(Vec::new()));
    let seen = progress.clone();

    let mut loader = local_loader();
    let handle = loader.load(
        TleSource::Http(url),
        Some(Box::new(move |loaded: u64, total: Option<u64>| {
            seen.lock().unwrap().push((loaded, total));
        })),
    );
    let catalog = handle.wait().await.unwrap();

    assert_eq!(catalog.names(), vec!["ISS (ZARYA)"]);
    let progress = progress.lock().unwrap();
    let len = VISUAL_TXT.len() as u64;
    assert_eq!(progress.last(), Some(&(len, Some(len))));
}

#[tokio::test]
async fn http_error_status_is_fetch_error() {
    let url = serve_once("404 Not Found", "gone").await;
    let mut loader = local_loader();

    let err = loader.load(TleSource::Http(url), None).wait().await.unwrap_err();
    assert!(matches!(err, CatalogError::HttpStatus { status: 404, .. }));
    assert!(err.is_fetch_error());
}

#[tokio::test]
async fn refused_connection_is_fetch_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut loader = local_loader();
    let err = loader
        .load(TleSource::Http(format!("http://{}/visual.txt", addr)), None)
        .wait()
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Fetch(_)));
}

#[tokio::test]
async fn second_load_supersedes_first() {
    let stalled = serve_nothing().await;
    let path = temp_tle_file("supersede", VISUAL_TXT);

    let mut loader = local_loader();
    let first = loader.load(TleSource::Http(stalled), None);
    // Let the first request connect before replacing it.
    tokio::time::sleep(StdDuration::from_millis(50)).await;
    assert!(loader.in_flight());

    let second = loader.load(TleSource::File(path.clone()), None);

    assert!(matches!(first.wait().await, Err(CatalogError::Cancelled)));
    assert_eq!(second.wait().await.unwrap().len(), 1);
    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn loaded_catalog_seeds_controller() {
    let path = temp_tle_file("seed", VISUAL_TXT);
    let mut loader = local_loader();
    let mut controller =
        TrackingController::new(TrackerSettings::default(), LocalFrame::default());

    controller.await_catalog(loader.load(TleSource::File(path.clone()), None));
    tick_until_loaded(&mut controller, t0()).await;

    assert_eq!(controller.phase(), TrackingPhase::Seeded);
    let history = controller.history();
    assert_eq!(history.len(), 2);
    assert_eq!(
        history.latest().unwrap().time - history.earliest().unwrap().time,
        Duration::seconds(1)
    );
    assert_eq!(controller.trail().len(), 30);
    assert_eq!(controller.trail().span(), Some(Duration::minutes(29)));

    let report = controller.tick(t0() + Duration::seconds(2), None);
    assert!(report.display.fix().is_some());
    let _ = std::fs::remove_file(path);
}

#[test]
fn ticks_within_one_minute_refresh_once() {
    let mut controller =
        TrackingController::new(TrackerSettings::default(), LocalFrame::default());
    controller.set_catalog(iss_track::catalog::parse_catalog(VISUAL_TXT).catalog);
    controller.tick(t0(), None);

    let rollover = Utc.with_ymd_and_hms(2025, 10, 5, 12, 31, 0).unwrap();
    let first = controller.tick(rollover, None);
    let revision = controller.trail().revision();
    let second = controller.tick(rollover + Duration::seconds(30), None);

    assert!(first.trail_changed);
    assert!(!second.trail_changed);
    assert_eq!(controller.history().len(), 3);
    assert_eq!(controller.trail().revision(), revision);
}

#[tokio::test]
async fn failed_load_keeps_waiting_for_data() {
    let mut loader = local_loader();
    let mut controller =
        TrackingController::new(TrackerSettings::default(), LocalFrame::default());

    controller.await_catalog(loader.load(
        TleSource::File(PathBuf::from("/nonexistent/iss-track/visual.txt")),
        None,
    ));
    tick_until_loaded(&mut controller, t0()).await;

    for minute in 0..5 {
        let report = controller.tick(t0() + Duration::minutes(minute), None);
        assert_eq!(report.display, DisplayUpdate::AwaitingData);
        assert_eq!(report.phase, TrackingPhase::Uninitialized);
    }
    assert!(controller.history().is_empty());
    assert!(!controller.trail().is_initialized());
}

#[test]
fn extrapolates_past_last_refresh() {
    let mut controller =
        TrackingController::new(TrackerSettings::default(), LocalFrame::default());
    controller.set_catalog(iss_track::catalog::parse_catalog(VISUAL_TXT).catalog);
    controller.tick(t0(), None);

    let last = *controller.history().latest().unwrap();
    let later = last.time + Duration::minutes(20);
    let position = controller
        .history()
        .query(&later, Frame::EarthFixed)
        .unwrap();

    let expected = last.position + last.velocity * 1200.0;
    assert!((position - expected).magnitude() < 1e-6);
}
