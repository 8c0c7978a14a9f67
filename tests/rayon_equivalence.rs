#![cfg(feature = "rayon")]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use roigen::{
    Anchor, ImageMeta, Phase, PredictionBatch, ProposalConfig, ProposalGenerator, SelectionBudget,
};

fn make_anchors(grid: usize, stride: f32) -> Vec<Anchor> {
    let mut anchors = Vec::with_capacity(grid * grid * 3);
    for y in 0..grid {
        for x in 0..grid {
            let cx = (x as f32 + 0.5) * stride;
            let cy = (y as f32 + 0.5) * stride;
            for (w, h) in [(32.0, 32.0), (45.0, 22.5), (22.5, 45.0)] {
                anchors.push(Anchor::new(cx, cy, w, h));
            }
        }
    }
    anchors
}

fn make_predictions(seed: u64, batch: usize, num_anchors: usize) -> (Vec<f32>, Vec<f32>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut loc = Vec::with_capacity(batch * num_anchors * 4);
    let mut score = Vec::with_capacity(batch * num_anchors * 2);
    for _ in 0..batch * num_anchors {
        for _ in 0..4 {
            loc.push(rng.random_range(-0.3f32..0.3));
        }
        let fg = rng.random_range(0.0f32..1.0);
        score.push(1.0 - fg);
        score.push(fg);
    }
    (loc, score)
}

#[test]
fn parallel_matches_sequential() {
    let anchors = make_anchors(24, 16.0);
    let images = 6;
    let (loc, score) = make_predictions(17, images, anchors.len());
    let batch = PredictionBatch::new(&loc, &score, images, anchors.len()).unwrap();
    let metas: Vec<_> = (0..images)
        .map(|i| ImageMeta::new(384.0 - 16.0 * i as f32, 384.0, 1.0 + 0.1 * i as f32))
        .collect();

    let base = ProposalConfig {
        train: SelectionBudget::new(800, 120),
        ..ProposalConfig::default()
    };
    let sequential = ProposalGenerator::new().with_config(ProposalConfig {
        parallel: false,
        ..base.clone()
    });
    let parallel = ProposalGenerator::new().with_config(ProposalConfig {
        parallel: true,
        ..base
    });

    let seq = sequential
        .propose_phase(&anchors, batch, &metas, Phase::Train)
        .unwrap();
    let par = parallel
        .propose_phase(&anchors, batch, &metas, Phase::Train)
        .unwrap();

    assert_eq!(seq.counts(), par.counts());
    assert_eq!(seq, par);
    assert!(!seq.is_empty());
}

#[test]
fn parallel_surfaces_the_same_error() {
    let anchors = make_anchors(4, 16.0);
    let (loc, score) = make_predictions(3, 2, anchors.len());
    let batch = PredictionBatch::new(&loc, &score, 2, anchors.len()).unwrap();
    let metas = [ImageMeta::new(64.0, 64.0, 1.0); 2];
    let cfg = ProposalConfig {
        nms_threshold: 2.0,
        min_size: 1.0,
        parallel: true,
        ..ProposalConfig::default()
    };
    let err = ProposalGenerator::new()
        .with_config(cfg)
        .propose(&anchors, batch, &metas, SelectionBudget::unbounded())
        .unwrap_err();
    assert_eq!(err, roigen::RoiGenError::InvalidThreshold { threshold: 2.0 });
}
