use buah::{
    config::ClassifierConfig,
    error::ClassifierError,
    labels::ClassLabels,
    pipeline::{ClassificationPipeline, ClassifierService, Outcome, ProgressCallback, RequestTracker},
    render::render_ranking,
};
use std::sync::{Arc, Mutex};

mod common;
use common::{belimbing_probs, setup, MockEngine, RED_IMAGE};

#[test]
fn test_classify_image() {
    setup();
    let pipeline = ClassificationPipeline::default();
    let mut engine = MockEngine::new(belimbing_probs());
    let image = image::open(RED_IMAGE).unwrap();

    let ranking = pipeline
        .classify_image(&image, Some(&mut engine), None)
        .unwrap();

    assert_eq!(ranking.predictions.len(), 10);
    assert_eq!(ranking.top.label, "belimbing");
    let (_, shape, _) = engine.last_call.clone().unwrap();
    assert_eq!(shape, vec![1, 3, 177, 177]);
}

#[test]
fn test_progress_is_reported_in_order() {
    setup();
    let pipeline = ClassificationPipeline::default();
    let mut engine = MockEngine::new(belimbing_probs());
    let image = image::open(RED_IMAGE).unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = Arc::clone(&seen);
    let callback: ProgressCallback = Box::new(move |progress, _message| {
        seen_clone.lock().unwrap().push(progress);
    });

    pipeline
        .classify_image(&image, Some(&mut engine), Some(callback))
        .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.first(), Some(&0.0));
    assert_eq!(seen.last(), Some(&1.0));
    assert!(seen.windows(2).all(|w| w[0] < w[1]));
}

#[tokio::test]
async fn test_classify_file_end_to_end() {
    setup();
    let pipeline = ClassificationPipeline::default();
    let mut engine = MockEngine::new(belimbing_probs());

    let ranking = pipeline
        .classify_file(RED_IMAGE, Some(&mut engine), None)
        .await
        .unwrap();

    assert_eq!(ranking.top.index, 2);
    let text = render_ranking(&ranking);
    assert!(text.ends_with("Most likely class: BELIMBING with 60.00%"));
    assert_eq!(text.lines().filter(|l| l.ends_with('%')).count(), 11);
}

#[tokio::test]
async fn test_classify_file_without_session() {
    let pipeline = ClassificationPipeline::default();
    let result = pipeline
        .classify_file::<MockEngine, _>("does/not/matter.png", None, None)
        .await;
    assert!(matches!(result, Err(ClassifierError::ModelNotLoaded)));
}

#[tokio::test]
async fn test_classify_missing_file() {
    let pipeline = ClassificationPipeline::default();
    let mut engine = MockEngine::new(belimbing_probs());
    let result = pipeline
        .classify_file("tests/assets/missing.png", Some(&mut engine), None)
        .await;

    assert!(matches!(result, Err(ClassifierError::Io(_))));
    assert_eq!(engine.call_count(), 0);
}

#[tokio::test]
async fn test_classify_undecodable_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.png");
    std::fs::write(&path, b"not an image").unwrap();

    let pipeline = ClassificationPipeline::default();
    let mut engine = MockEngine::new(belimbing_probs());
    let result = pipeline
        .classify_file(&path, Some(&mut engine), None)
        .await;

    assert!(matches!(result, Err(ClassifierError::Image(_))));
    assert_eq!(engine.call_count(), 0);
}

#[test]
fn test_mismatched_output_yields_no_result() {
    setup();
    let pipeline = ClassificationPipeline::default();
    let mut engine = MockEngine::new(vec![0.5, 0.5]);
    let image = image::open(RED_IMAGE).unwrap();

    let result = pipeline.classify_image(&image, Some(&mut engine), None);
    assert!(matches!(
        result,
        Err(ClassifierError::LabelMismatch {
            probabilities: 2,
            labels: 10
        })
    ));
}

#[test]
fn test_validate_at_startup() {
    let pipeline = ClassificationPipeline::default();

    let mut good = MockEngine::new(belimbing_probs());
    assert!(pipeline.validate(&mut good).is_ok());

    let mut bad = MockEngine::new(vec![1.0; 9]);
    assert!(matches!(
        pipeline.validate(&mut bad),
        Err(ClassifierError::LabelMismatch { .. })
    ));
}

#[test]
fn test_pipeline_from_config() {
    let config = ClassifierConfig::from_json(
        r#"{"input_size": [3, 64, 32], "input_name": "img", "labels": ["x", "y"]}"#,
    )
    .unwrap();
    let pipeline = ClassificationPipeline::from_config(&config).unwrap();
    let mut engine = MockEngine::new(vec![0.3, 0.7]);

    pipeline.validate(&mut engine).unwrap();
    let (input, shape, output) = engine.last_call.clone().unwrap();
    assert_eq!(input, "img");
    assert_eq!(shape, vec![1, 3, 64, 32]);
    assert_eq!(output, "output");
}

#[test]
fn test_column_major_pipeline_shape() {
    let config = ClassifierConfig::from_json(
        r#"{"input_size": [3, 64, 32], "layout": "column_major", "labels": ["x", "y"]}"#,
    )
    .unwrap();
    let pipeline = ClassificationPipeline::from_config(&config).unwrap();
    let mut engine = MockEngine::new(vec![0.3, 0.7]);

    pipeline.validate(&mut engine).unwrap();
    assert_eq!(engine.last_call.clone().unwrap().1, vec![1, 3, 32, 64]);

    let image = image::DynamicImage::new_rgb8(10, 10);
    pipeline.classify_image(&image, Some(&mut engine), None).unwrap();
    assert_eq!(engine.last_call.clone().unwrap().1, vec![1, 3, 32, 64]);
}

#[test]
fn test_with_labels() {
    let labels = ClassLabels::new(vec!["x", "y"]).unwrap();
    let pipeline = ClassificationPipeline::default().with_labels(labels.clone());
    assert_eq!(pipeline.labels, labels);
}

#[test]
fn test_request_tracker() {
    let tracker = RequestTracker::new();
    let first = tracker.begin();
    assert!(tracker.is_current(first));

    let second = tracker.begin();
    assert!(!tracker.is_current(first));
    assert!(tracker.is_current(second));
}

#[tokio::test]
async fn test_service_completes() {
    setup();
    let service =
        ClassifierService::start(ClassificationPipeline::default(), MockEngine::new(belimbing_probs()))
            .unwrap();

    match service.submit(RED_IMAGE).await.unwrap() {
        Outcome::Completed(ranking) => assert_eq!(ranking.top.label, "belimbing"),
        Outcome::Superseded => panic!("request should not be superseded"),
    }
}

#[tokio::test]
async fn test_service_start_rejects_mismatch() {
    let result = ClassifierService::start(ClassificationPipeline::default(), MockEngine::new(vec![1.0]));
    assert!(matches!(result, Err(ClassifierError::LabelMismatch { .. })));
}

#[tokio::test]
async fn test_service_without_model() {
    let service = ClassifierService::<MockEngine>::new(ClassificationPipeline::default(), None);
    let image = image::DynamicImage::new_rgb8(8, 8);
    let result = service.submit_image(image).await;
    assert!(matches!(result, Err(ClassifierError::ModelNotLoaded)));
}

#[tokio::test]
async fn test_service_discards_superseded_result() {
    let tracker = Arc::new(Mutex::new(None::<RequestTracker>));
    let tracker_in_engine = Arc::clone(&tracker);

    let mut engine = MockEngine::new(belimbing_probs());
    // A newer upload arrives while the model is running.
    engine.on_run = Some(Box::new(move || {
        if let Some(tracker) = tracker_in_engine.lock().unwrap().as_ref() {
            tracker.begin();
        }
    }));
    let calls = Arc::clone(&engine.calls);

    let service = ClassifierService::new(ClassificationPipeline::default(), Some(engine));
    *tracker.lock().unwrap() = Some(service.tracker().clone());

    let image = image::DynamicImage::new_rgb8(8, 8);
    let outcome = service.submit_image(image.clone()).await.unwrap();
    assert_eq!(outcome, Outcome::Superseded);
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);

    *tracker.lock().unwrap() = None;
    let outcome = service.submit_image(image).await.unwrap();
    assert!(matches!(outcome, Outcome::Completed(_)));
}

#[tokio::test]
async fn test_service_discards_superseded_error() {
    let tracker = Arc::new(Mutex::new(None::<RequestTracker>));
    let tracker_in_engine = Arc::clone(&tracker);

    // The model fails, but a newer upload arrived while it was running.
    let mut engine = MockEngine::failing("engine blew up");
    engine.on_run = Some(Box::new(move || {
        if let Some(tracker) = tracker_in_engine.lock().unwrap().as_ref() {
            tracker.begin();
        }
    }));
    let calls = Arc::clone(&engine.calls);

    let service = ClassifierService::new(ClassificationPipeline::default(), Some(engine));
    *tracker.lock().unwrap() = Some(service.tracker().clone());

    let image = image::DynamicImage::new_rgb8(8, 8);
    let outcome = service.submit_image(image.clone()).await.unwrap();
    assert_eq!(outcome, Outcome::Superseded);
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);

    // Once nothing newer arrives, the failure is reported.
    *tracker.lock().unwrap() = None;
    let result = service.submit_image(image).await;
    assert!(matches!(result, Err(ClassifierError::Inference(_))));
}
