//! Item pipeline integration tests.
//!
//! These tests run single items through the pipeline with the mock source
//! and encoder:
//! - Whole-item and chapter-split conversion
//! - Degradation to a single artifact when markers are unusable
//! - Failure classification
//! - Temporary directory cleanup on every outcome

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use audiodrop_core::{
    encoder::TimeRange,
    pipeline::{ConversionOptions, ItemPipeline, PipelineConfig},
    progress::ProgressSink,
    segment::Marker,
    testing::{fixtures, MockEncoder, MockSource},
    ErrorKind, MediaItem,
};

/// Test helper wiring a pipeline to mocks and scratch directories.
struct TestHarness {
    pipeline: ItemPipeline<MockSource, MockEncoder>,
    source: MockSource,
    encoder: MockEncoder,
    temp_root: TempDir,
    output: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        let temp_root = TempDir::new().expect("Failed to create temp root");
        let output = TempDir::new().expect("Failed to create output dir");
        let source = MockSource::new();
        let encoder = MockEncoder::new();

        let config = PipelineConfig::default().with_temp_dir(temp_root.path());
        let pipeline = ItemPipeline::new(
            config,
            Arc::new(source.clone()),
            Arc::new(encoder.clone()),
        )
        .with_fade_out(Some(Duration::from_secs(1)));

        Self {
            pipeline,
            source,
            encoder,
            temp_root,
            output,
        }
    }

    async fn run(
        &self,
        item: &MediaItem,
        options: ConversionOptions,
        sink: Option<&ProgressSink>,
        cancel: &CancellationToken,
    ) -> Result<audiodrop_core::ItemArtifacts, audiodrop_core::PipelineError> {
        self.pipeline
            .run(item, &options, self.output.path(), sink, cancel)
            .await
    }

    fn assert_no_temporaries(&self) {
        assert_no_entries(self.temp_root.path());
    }
}

fn assert_no_entries(dir: &Path) {
    let leftovers: Vec<_> = std::fs::read_dir(dir)
        .map(|entries| entries.flatten().map(|e| e.path()).collect())
        .unwrap_or_default();
    assert!(leftovers.is_empty(), "temporary files left behind: {:?}", leftovers);
}

fn album() -> MediaItem {
    MediaItem::Single(fixtures::item("alb", "Live Set", 180))
}

fn chapters() -> Vec<Marker> {
    vec![
        Marker::new("Intro", 0),
        Marker::new("Middle", 60_000),
        Marker::new("Outro", 125_000),
    ]
}

#[tokio::test]
async fn test_whole_item_produces_one_artifact() {
    let harness = TestHarness::new();
    let sink = ProgressSink::new();
    let cancel = CancellationToken::new();

    let artifacts = harness
        .run(&album(), ConversionOptions::default(), Some(&sink), &cancel)
        .await
        .unwrap();

    assert_eq!(artifacts.item_id, "alb");
    assert_eq!(
        artifacts.artifacts,
        vec![harness.output.path().join("Live Set.mp3")]
    );
    assert!(artifacts.artifacts[0].exists());
    assert!(sink.snapshot().is_complete());

    let jobs = harness.encoder.convert_jobs().await;
    assert_eq!(jobs.len(), 1);
    assert!(jobs[0].range.is_none());
    assert!(jobs[0].fade_out.is_none());

    harness.assert_no_temporaries();
}

#[tokio::test]
async fn test_split_follows_chapter_boundaries() {
    let harness = TestHarness::new();
    harness.source.set_markers("alb", chapters()).await;
    let cancel = CancellationToken::new();

    let artifacts = harness
        .run(&album(), ConversionOptions::split(), None, &cancel)
        .await
        .unwrap();

    let out = harness.output.path().join("Live Set");
    assert_eq!(
        artifacts.artifacts,
        vec![
            out.join("01 - Intro.mp3"),
            out.join("02 - Middle.mp3"),
            out.join("03 - Outro.mp3"),
        ]
    );

    let jobs = harness.encoder.convert_jobs().await;
    let ranges: Vec<_> = jobs.iter().map(|j| j.range).collect();
    assert_eq!(
        ranges,
        vec![
            Some(TimeRange::new(0, Some(60_000))),
            Some(TimeRange::new(60_000, Some(125_000))),
            Some(TimeRange::new(125_000, None)),
        ]
    );

    let tracks: Vec<_> = jobs
        .iter()
        .map(|j| {
            let meta = j.metadata.as_ref().unwrap();
            (meta.track_number, meta.track_total, meta.album.clone())
        })
        .collect();
    assert_eq!(tracks[0], (Some(1), Some(3), Some("Live Set".to_string())));
    assert_eq!(tracks[2].0, Some(3));
    assert!(jobs.iter().all(|j| j.fade_out == Some(Duration::from_secs(1))));

    harness.assert_no_temporaries();
}

#[tokio::test]
async fn test_split_without_markers_keeps_item_whole() {
    let harness = TestHarness::new();
    let cancel = CancellationToken::new();

    let artifacts = harness
        .run(&album(), ConversionOptions::split(), None, &cancel)
        .await
        .unwrap();

    assert_eq!(artifacts.artifacts.len(), 1);
    assert!(harness.encoder.convert_jobs().await[0].range.is_none());
}

#[tokio::test]
async fn test_marker_failure_degrades_to_whole_item() {
    let harness = TestHarness::new();
    harness.source.fail_markers("alb").await;
    let cancel = CancellationToken::new();

    let artifacts = harness
        .run(&album(), ConversionOptions::split(), None, &cancel)
        .await
        .unwrap();

    assert_eq!(
        artifacts.artifacts,
        vec![harness.output.path().join("Live Set.mp3")]
    );
}

#[tokio::test]
async fn test_markers_past_end_degrade_to_whole_item() {
    let harness = TestHarness::new();
    harness
        .source
        .set_markers(
            "alb",
            vec![Marker::new("Intro", 0), Marker::new("Ghost", 500_000)],
        )
        .await;
    let cancel = CancellationToken::new();

    let artifacts = harness
        .run(&album(), ConversionOptions::split(), None, &cancel)
        .await
        .unwrap();

    assert_eq!(artifacts.artifacts.len(), 1);
}

#[tokio::test]
async fn test_split_ignored_when_not_requested() {
    let harness = TestHarness::new();
    harness.source.set_markers("alb", chapters()).await;
    let cancel = CancellationToken::new();

    let artifacts = harness
        .run(&album(), ConversionOptions::default(), None, &cancel)
        .await
        .unwrap();

    assert_eq!(artifacts.artifacts.len(), 1);
}

#[tokio::test]
async fn test_encoder_failure_cleans_up() {
    let harness = TestHarness::new();
    harness.encoder.fail_convert("alb").await;
    let sink = ProgressSink::new();
    let cancel = CancellationToken::new();

    let err = harness
        .run(&album(), ConversionOptions::default(), Some(&sink), &cancel)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::EncoderFailure);
    assert_eq!(sink.snapshot().download, 1.0);
    assert!(!sink.snapshot().is_complete());
    harness.assert_no_temporaries();
}

#[tokio::test]
async fn test_download_failure_cleans_up() {
    let harness = TestHarness::new();
    harness.source.fail_download("alb", "video removed").await;
    let cancel = CancellationToken::new();

    let err = harness
        .run(&album(), ConversionOptions::default(), None, &cancel)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::SourceUnavailable);
    assert!(harness.encoder.recorded_jobs().await.is_empty());
    harness.assert_no_temporaries();
}

#[tokio::test]
async fn test_missing_audio_stream_is_classified() {
    let harness = TestHarness::new();
    harness.encoder.set_no_audio("alb").await;
    let cancel = CancellationToken::new();

    let err = harness
        .run(&album(), ConversionOptions::default(), None, &cancel)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NoAudioStream);
    assert!(harness.encoder.convert_jobs().await.is_empty());
    harness.assert_no_temporaries();
}

#[tokio::test]
async fn test_source_without_audio_is_classified() {
    let harness = TestHarness::new();
    harness.source.fail_no_audio("alb").await;
    let cancel = CancellationToken::new();

    let err = harness
        .run(&album(), ConversionOptions::default(), None, &cancel)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NoAudioStream);
}

#[tokio::test]
async fn test_cancel_during_download_cleans_up() {
    let harness = TestHarness::new();
    harness
        .source
        .set_download_delay(Duration::from_secs(30))
        .await;
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = harness
        .run(&album(), ConversionOptions::default(), None, &cancel)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert!(harness.source.downloaded_ids().await.is_empty());
    harness.assert_no_temporaries();
}

#[tokio::test]
async fn test_cancel_during_conversion_cleans_up() {
    let harness = TestHarness::new();
    harness
        .encoder
        .set_convert_delay(Duration::from_secs(30))
        .await;
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = harness
        .run(&album(), ConversionOptions::default(), None, &cancel)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    harness.assert_no_temporaries();
}

#[tokio::test]
async fn test_already_cancelled_does_nothing() {
    let harness = TestHarness::new();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = harness
        .run(&album(), ConversionOptions::default(), None, &cancel)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert!(harness.source.downloaded_ids().await.is_empty());
}

#[tokio::test]
async fn test_progress_observer_sees_completion() {
    let harness = TestHarness::new();
    harness.source.set_markers("alb", chapters()).await;
    let sink = ProgressSink::new();
    let mut rx = sink.subscribe();
    let cancel = CancellationToken::new();

    harness
        .run(&album(), ConversionOptions::split(), Some(&sink), &cancel)
        .await
        .unwrap();

    assert!(rx.has_changed().unwrap());
    let latest = *rx.borrow_and_update();
    assert_eq!(latest.download, 1.0);
    assert_eq!(latest.conversion, 1.0);
}
