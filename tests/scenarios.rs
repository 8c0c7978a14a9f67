use roigen::lowlevel::GreedyNmsScalar;
use roigen::{
    Anchor, BBox, ImageMeta, PredictionBatch, ProposalConfig, ProposalGenerator, RoiGenError,
    RoiGenResult, SelectionBudget, Stage, Suppressor,
};
use std::sync::{Arc, Mutex};

/// Per-image `(offsets, foreground)` pairs flattened into `loc`/`score` buffers.
fn flatten(images: &[Vec<([f32; 4], f32)>]) -> (Vec<f32>, Vec<f32>) {
    let mut loc = Vec::new();
    let mut score = Vec::new();
    for image in images {
        for (offsets, fg) in image {
            loc.extend_from_slice(offsets);
            score.extend_from_slice(&[1.0 - fg, *fg]);
        }
    }
    (loc, score)
}

fn generator(min_size: f32, nms_threshold: f32) -> ProposalGenerator {
    ProposalGenerator::new().with_config(ProposalConfig {
        min_size,
        nms_threshold,
        ..ProposalConfig::default()
    })
}

#[test]
fn boxes_collapsed_by_clamping_are_filtered() {
    let anchors = vec![Anchor::new(50.0, 50.0, 20.0, 20.0); 4];
    // Each offset pushes the box fully outside one border.
    let image = vec![
        ([-10.0, 0.0, 0.0, 0.0], 0.9),
        ([10.0, 0.0, 0.0, 0.0], 0.8),
        ([0.0, -10.0, 0.0, 0.0], 0.7),
        ([0.0, 10.0, 0.0, 0.0], 0.6),
    ];
    let (loc, score) = flatten(&[image]);
    let batch = PredictionBatch::new(&loc, &score, 1, 4).unwrap();
    let metas = [ImageMeta::new(100.0, 100.0, 2.0)];

    let proposer = generator(1.0, 0.7);
    let result = proposer
        .propose(&anchors, batch, &metas, SelectionBudget::unbounded())
        .unwrap();
    assert_eq!(result.counts(), &[0]);
    assert!(result.is_empty());

    let outcome = proposer
        .run_image(
            0,
            &anchors,
            batch.image(0).unwrap(),
            &metas[0],
            SelectionBudget::unbounded(),
        )
        .unwrap();
    assert_eq!(outcome.stage(), Stage::Filtered);
}

#[test]
fn near_duplicate_box_is_suppressed() {
    let anchors = vec![
        Anchor::new(50.0, 50.0, 40.0, 40.0),
        Anchor::new(51.0, 50.0, 40.0, 40.0),
    ];
    let image = vec![([0.0; 4], 0.9), ([0.0; 4], 0.8)];
    let (loc, score) = flatten(&[image]);
    let batch = PredictionBatch::new(&loc, &score, 1, 2).unwrap();
    let metas = [ImageMeta::new(200.0, 200.0, 1.0)];

    let result = generator(1.0, 0.7)
        .propose(&anchors, batch, &metas, SelectionBudget::unbounded())
        .unwrap();
    assert_eq!(result.counts(), &[1]);
    let kept = result.proposals()[0];
    assert_eq!(kept.anchor, 0);
    assert_eq!(kept.score, 0.9);
    assert_eq!(kept.bbox, BBox::new(30.0, 30.0, 70.0, 70.0));
}

#[test]
fn empty_image_contributes_zero_count_and_no_rows() {
    let anchors = vec![
        Anchor::new(20.0, 20.0, 16.0, 16.0),
        Anchor::new(60.0, 60.0, 16.0, 16.0),
        Anchor::new(100.0, 100.0, 16.0, 16.0),
    ];
    let gone = vec![([-10.0, 0.0, 0.0, 0.0], 0.9); 3];
    let valid = vec![([0.0; 4], 0.3), ([0.0; 4], 0.9), ([0.0; 4], 0.6)];
    let (loc, score) = flatten(&[gone, valid]);
    let batch = PredictionBatch::new(&loc, &score, 2, 3).unwrap();
    let metas = [
        ImageMeta::new(128.0, 128.0, 1.0),
        ImageMeta::new(128.0, 128.0, 1.0),
    ];

    let result = generator(4.0, 0.7)
        .propose(&anchors, batch, &metas, SelectionBudget::new(-1, -1))
        .unwrap();
    assert_eq!(result.counts(), &[0, 3]);
    assert_eq!(result.len(), 3);
    for row in result.to_rows() {
        assert_eq!(row[0], 1.0);
    }
    let anchors_kept: Vec<_> = result.proposals().iter().map(|p| p.anchor).collect();
    assert_eq!(anchors_kept, vec![1, 2, 0]);
    assert_eq!(result.image(0).unwrap().len(), 0);
    assert_eq!(result.image(1).unwrap().len(), 3);
}

#[derive(Clone, Default)]
struct Recording {
    calls: Arc<Mutex<Vec<Vec<f32>>>>,
}

impl Suppressor for Recording {
    fn suppress(&self, boxes: &[BBox], scores: &[f32], threshold: f32) -> RoiGenResult<Vec<usize>> {
        self.calls.lock().unwrap().push(scores.to_vec());
        GreedyNmsScalar.suppress(boxes, scores, threshold)
    }
}

#[test]
fn pre_nms_budget_limits_what_reaches_suppression() {
    let anchors: Vec<_> = (0..5)
        .map(|i| Anchor::new(20.0 + 40.0 * i as f32, 50.0, 20.0, 20.0))
        .collect();
    let image = vec![
        ([0.0; 4], 0.2),
        ([0.0; 4], 0.7),
        ([0.0; 4], 0.4),
        ([0.0; 4], 0.95),
        ([0.0; 4], 0.1),
    ];
    let (loc, score) = flatten(&[image]);
    let batch = PredictionBatch::new(&loc, &score, 1, 5).unwrap();
    let metas = [ImageMeta::new(300.0, 100.0, 1.0)];

    let recording = Recording::default();
    let proposer = generator(1.0, 0.7).with_suppressor(recording.clone());
    let result = proposer
        .propose(&anchors, batch, &metas, SelectionBudget::new(1, -1))
        .unwrap();

    let calls = recording.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0], vec![0.95]);
    assert_eq!(result.counts(), &[1]);
    assert_eq!(result.proposals()[0].anchor, 3);
}

#[test]
fn all_empty_batch_keeps_full_count_vector() {
    let anchors = vec![Anchor::new(10.0, 10.0, 8.0, 8.0); 2];
    let gone = vec![([50.0, 50.0, 0.0, 0.0], 0.5); 2];
    let (loc, score) = flatten(&[gone.clone(), gone.clone(), gone]);
    let batch = PredictionBatch::new(&loc, &score, 3, 2).unwrap();
    let metas = [ImageMeta::new(64.0, 64.0, 1.0); 3];

    let result = generator(4.0, 0.7)
        .propose(&anchors, batch, &metas, SelectionBudget::unbounded())
        .unwrap();
    assert_eq!(result.counts(), &[0, 0, 0]);
    assert!(result.is_empty());
    assert!(result.to_rows().is_empty());
}

#[test]
fn batch_without_images_yields_empty_result() {
    let anchors = vec![Anchor::new(10.0, 10.0, 8.0, 8.0)];
    let batch = PredictionBatch::new(&[], &[], 0, 1).unwrap();
    let result = generator(1.0, 0.7)
        .propose(&anchors, batch, &[], SelectionBudget::unbounded())
        .unwrap();
    assert_eq!(result.batch_size(), 0);
    assert!(result.is_empty());
}

#[test]
fn anchor_count_mismatch_fails_fast() {
    let anchors = vec![Anchor::new(10.0, 10.0, 8.0, 8.0); 2];
    let (loc, score) = flatten(&[vec![([0.0; 4], 0.5); 3]]);
    let batch = PredictionBatch::new(&loc, &score, 1, 3).unwrap();
    let err = generator(1.0, 0.7)
        .propose(
            &anchors,
            batch,
            &[ImageMeta::new(64.0, 64.0, 1.0)],
            SelectionBudget::unbounded(),
        )
        .unwrap_err();
    assert_eq!(
        err,
        RoiGenError::InputShapeMismatch {
            what: "anchors",
            expected: 3,
            got: 2,
        }
    );
}

#[test]
fn metadata_count_mismatch_fails_fast() {
    let anchors = vec![Anchor::new(10.0, 10.0, 8.0, 8.0)];
    let (loc, score) = flatten(&[vec![([0.0; 4], 0.5)], vec![([0.0; 4], 0.5)]]);
    let batch = PredictionBatch::new(&loc, &score, 2, 1).unwrap();
    let err = generator(1.0, 0.7)
        .propose(
            &anchors,
            batch,
            &[ImageMeta::new(64.0, 64.0, 1.0)],
            SelectionBudget::unbounded(),
        )
        .unwrap_err();
    assert_eq!(
        err,
        RoiGenError::InputShapeMismatch {
            what: "image metadata",
            expected: 2,
            got: 1,
        }
    );
}

#[test]
fn invalid_threshold_from_suppressor_is_surfaced() {
    let anchors = vec![Anchor::new(32.0, 32.0, 16.0, 16.0)];
    let (loc, score) = flatten(&[vec![([0.0; 4], 0.5)]]);
    let batch = PredictionBatch::new(&loc, &score, 1, 1).unwrap();
    let err = generator(1.0, 1.5)
        .propose(
            &anchors,
            batch,
            &[ImageMeta::new(64.0, 64.0, 1.0)],
            SelectionBudget::unbounded(),
        )
        .unwrap_err();
    assert_eq!(err, RoiGenError::InvalidThreshold { threshold: 1.5 });
}

#[test]
fn overflowing_scale_offsets_clamp_to_the_border() {
    let anchors = vec![Anchor::new(32.0, 32.0, 16.0, 16.0)];
    let (loc, score) = flatten(&[vec![([0.0, 0.0, 1000.0, 1000.0], 0.5)]]);
    let batch = PredictionBatch::new(&loc, &score, 1, 1).unwrap();
    let result = generator(1.0, 0.7)
        .propose(
            &anchors,
            batch,
            &[ImageMeta::new(64.0, 48.0, 1.0)],
            SelectionBudget::unbounded(),
        )
        .unwrap();
    assert_eq!(result.counts(), &[1]);
    assert_eq!(result.proposals()[0].bbox, BBox::new(0.0, 0.0, 63.0, 47.0));
}

#[test]
fn nan_offsets_are_dropped_without_error() {
    let anchors = vec![
        Anchor::new(32.0, 32.0, 16.0, 16.0),
        Anchor::new(16.0, 16.0, 8.0, 8.0),
    ];
    let (loc, score) = flatten(&[vec![
        ([f32::NAN, 0.0, 0.0, 0.0], 0.9),
        ([0.0; 4], 0.1),
    ]]);
    let batch = PredictionBatch::new(&loc, &score, 1, 2).unwrap();
    let result = generator(1.0, 0.7)
        .propose(
            &anchors,
            batch,
            &[ImageMeta::new(64.0, 64.0, 1.0)],
            SelectionBudget::unbounded(),
        )
        .unwrap();
    assert_eq!(result.counts(), &[1]);
    assert_eq!(result.proposals()[0].anchor, 1);
}

#[test]
fn invalid_image_meta_is_rejected() {
    let anchors = vec![Anchor::new(32.0, 32.0, 16.0, 16.0)];
    let (loc, score) = flatten(&[vec![([0.0; 4], 0.5)]]);
    let batch = PredictionBatch::new(&loc, &score, 1, 1).unwrap();
    let err = generator(1.0, 0.7)
        .propose(
            &anchors,
            batch,
            &[ImageMeta::new(0.0, 64.0, 1.0)],
            SelectionBudget::unbounded(),
        )
        .unwrap_err();
    assert!(matches!(err, RoiGenError::InvalidImageMeta { index: 0, .. }));
}
