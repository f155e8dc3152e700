//! Tests for `DeliveryManager`'s by-reference path and upload fallback.

mod common;

use std::sync::atomic::Ordering;

use assert_matches::assert_matches;
use genrelay_core::{MediaKind, OutputRef};
use genrelay_pipeline::{DeliveryError, DeliveryManager};

use common::{RecordingChannel, ScriptedFetcher, CHAT};

fn url() -> OutputRef {
    OutputRef::Url("https://cdn.example/out.mp4".into())
}

// ---------------------------------------------------------------------------
// Test: primary path sends by URL and never downloads
// ---------------------------------------------------------------------------

#[tokio::test]
async fn url_is_sent_by_reference() {
    let channel = RecordingChannel::new();
    let fetcher = ScriptedFetcher::serving(b"video");
    let manager = DeliveryManager::new(channel.clone(), fetcher.clone());

    manager.deliver(CHAT, &url(), MediaKind::Video).await.unwrap();

    assert_eq!(channel.url_count(), 1);
    assert_eq!(channel.upload_count(), 0);
    assert_eq!(fetcher.calls(), 0);
}

// ---------------------------------------------------------------------------
// Test: rejected URL falls back to exactly one upload
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rejected_url_falls_back_to_single_upload() {
    let channel = RecordingChannel::rejecting_urls();
    let fetcher = ScriptedFetcher::serving(b"0123456789");
    let manager = DeliveryManager::new(channel.clone(), fetcher.clone());

    manager.deliver(CHAT, &url(), MediaKind::Video).await.unwrap();

    assert_eq!(fetcher.calls(), 1);
    assert_eq!(channel.url_count(), 0);
    let uploads = channel.uploads.lock().unwrap();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0], (CHAT, "result.mp4".to_string(), 10));
}

// ---------------------------------------------------------------------------
// Test: image fallback uses the image filename
// ---------------------------------------------------------------------------

#[tokio::test]
async fn image_fallback_is_named_png() {
    let channel = RecordingChannel::rejecting_urls();
    let manager = DeliveryManager::new(channel.clone(), ScriptedFetcher::serving(b"png"));

    manager
        .deliver(
            CHAT,
            &OutputRef::Url("https://cdn.example/out.png".into()),
            MediaKind::Image,
        )
        .await
        .unwrap();

    assert_eq!(channel.uploads.lock().unwrap()[0].1, "result.png");
}

// ---------------------------------------------------------------------------
// Test: fallback keeps the extension of the source URL
// ---------------------------------------------------------------------------

#[tokio::test]
async fn jpeg_fallback_keeps_jpg_name() {
    let channel = RecordingChannel::rejecting_urls();
    let manager = DeliveryManager::new(channel.clone(), ScriptedFetcher::serving(b"jpeg"));

    manager
        .deliver(
            CHAT,
            &OutputRef::Url("https://cdn.example/out.jpg?token=abc".into()),
            MediaKind::Image,
        )
        .await
        .unwrap();

    assert_eq!(channel.uploads.lock().unwrap()[0].1, "result.jpg");
}

// ---------------------------------------------------------------------------
// Test: failed download is Unrecoverable
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failed_download_is_unrecoverable() {
    let channel = RecordingChannel::rejecting_urls();
    let manager = DeliveryManager::new(channel.clone(), ScriptedFetcher::failing(404));

    let err = manager
        .deliver(CHAT, &url(), MediaKind::Video)
        .await
        .unwrap_err();

    assert_matches!(
        err,
        DeliveryError::Unrecoverable { primary, fallback }
            if primary.contains("too big") && fallback.contains("404")
    );
    assert_eq!(channel.upload_count(), 0);
}

// ---------------------------------------------------------------------------
// Test: failed upload after a good download is Unrecoverable
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failed_upload_is_unrecoverable() {
    let channel = RecordingChannel::rejecting_urls();
    channel.fail_bytes.store(true, Ordering::SeqCst);
    let manager = DeliveryManager::new(channel.clone(), ScriptedFetcher::serving(b"v"));

    let err = manager
        .deliver(CHAT, &url(), MediaKind::Video)
        .await
        .unwrap_err();

    assert_matches!(err, DeliveryError::Unrecoverable { fallback, .. } if fallback.contains("upload"));
}

// ---------------------------------------------------------------------------
// Test: in-memory output goes straight to upload
// ---------------------------------------------------------------------------

#[tokio::test]
async fn bytes_output_is_uploaded_directly() {
    let channel = RecordingChannel::new();
    let fetcher = ScriptedFetcher::serving(b"unused");
    let manager = DeliveryManager::new(channel.clone(), fetcher.clone());
    let output = OutputRef::Bytes {
        data: vec![1, 2, 3],
        filename: "result.png".into(),
    };

    manager.deliver(CHAT, &output, MediaKind::Image).await.unwrap();

    assert_eq!(channel.url_count(), 0);
    assert_eq!(fetcher.calls(), 0);
    assert_eq!(
        channel.uploads.lock().unwrap()[0],
        (CHAT, "result.png".to_string(), 3)
    );
}

#[tokio::test]
async fn bytes_output_upload_failure_is_unrecoverable() {
    let channel = RecordingChannel::new();
    channel.fail_bytes.store(true, Ordering::SeqCst);
    let manager = DeliveryManager::new(channel.clone(), ScriptedFetcher::serving(b"unused"));
    let output = OutputRef::Bytes {
        data: vec![1],
        filename: "result.mp4".into(),
    };

    let err = manager
        .deliver(CHAT, &output, MediaKind::Video)
        .await
        .unwrap_err();

    assert_matches!(err, DeliveryError::Unrecoverable { .. });
}
