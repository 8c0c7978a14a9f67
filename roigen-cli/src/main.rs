use clap::Parser;
use roigen::{
    Anchor, BatchResult, ImageMeta, Phase, PredictionBatch, Proposal, ProposalConfig,
    ProposalGenerator, SelectionBudget,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "Region proposal generation (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output for performance profiling.
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Deserialize, Clone, Copy, Default)]
#[serde(rename_all = "snake_case")]
enum PhaseConfig {
    Train,
    #[default]
    Test,
}

impl From<PhaseConfig> for Phase {
    fn from(value: PhaseConfig) -> Self {
        match value {
            PhaseConfig::Train => Phase::Train,
            PhaseConfig::Test => Phase::Test,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
struct BudgetJson {
    pre_nms: i64,
    post_nms: i64,
}

impl From<BudgetJson> for SelectionBudget {
    fn from(value: BudgetJson) -> Self {
        SelectionBudget::new(value.pre_nms, value.post_nms)
    }
}

impl From<SelectionBudget> for BudgetJson {
    fn from(value: SelectionBudget) -> Self {
        Self {
            pre_nms: value.pre_nms.to_signed(),
            post_nms: value.post_nms.to_signed(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ProposalConfigJson {
    nms_threshold: f32,
    min_size: f32,
    parallel: bool,
    train: BudgetJson,
    test: BudgetJson,
}

impl Default for ProposalConfigJson {
    fn default() -> Self {
        let cfg = ProposalConfig::default();
        Self {
            nms_threshold: cfg.nms_threshold,
            min_size: cfg.min_size,
            parallel: cfg.parallel,
            train: cfg.train.into(),
            test: cfg.test.into(),
        }
    }
}

impl From<&ProposalConfigJson> for ProposalConfig {
    fn from(value: &ProposalConfigJson) -> Self {
        ProposalConfig {
            nms_threshold: value.nms_threshold,
            min_size: value.min_size,
            train: value.train.into(),
            test: value.test.into(),
            parallel: value.parallel,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct Config {
    input_path: String,
    output_path: Option<String>,
    phase: PhaseConfig,
    proposal: ProposalConfigJson,
}

#[derive(Debug, Deserialize)]
struct ImageInput {
    border_size: [f32; 2],
    image_scale: f32,
    loc: Vec<[f32; 4]>,
    score: Vec<[f32; 2]>,
}

#[derive(Debug, Deserialize)]
struct Input {
    anchors: Vec<[f32; 4]>,
    images: Vec<ImageInput>,
}

#[derive(Debug, Serialize)]
struct ProposalRecord {
    image_index: usize,
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    score: f32,
    anchor: usize,
}

impl From<&Proposal> for ProposalRecord {
    fn from(value: &Proposal) -> Self {
        Self {
            image_index: value.image_index,
            x1: value.bbox.x1,
            y1: value.bbox.y1,
            x2: value.bbox.x2,
            y2: value.bbox.y2,
            score: value.score,
            anchor: value.anchor,
        }
    }
}

#[derive(Debug, Serialize)]
struct Output {
    counts: Vec<usize>,
    proposals: Vec<ProposalRecord>,
}

impl From<&BatchResult> for Output {
    fn from(value: &BatchResult) -> Self {
        Self {
            counts: value.counts().to_vec(),
            proposals: value.proposals().iter().map(ProposalRecord::from).collect(),
        }
    }
}

/// Flattens per-image predictions into the `[B x R x 4]` / `[B x R x 2]` buffers.
fn flatten(input: &Input) -> Result<(Vec<f32>, Vec<f32>, Vec<ImageMeta>), String> {
    let num_anchors = input.anchors.len();
    let mut loc = Vec::with_capacity(input.images.len() * num_anchors * 4);
    let mut score = Vec::with_capacity(input.images.len() * num_anchors * 2);
    let mut metas = Vec::with_capacity(input.images.len());
    for (index, image) in input.images.iter().enumerate() {
        if image.loc.len() != num_anchors || image.score.len() != num_anchors {
            return Err(format!(
                "image {index}: expected {num_anchors} loc and score entries, got {} and {}",
                image.loc.len(),
                image.score.len()
            ));
        }
        loc.extend(image.loc.iter().flatten());
        score.extend(image.score.iter().flatten());
        let [w, h] = image.border_size;
        metas.push(ImageMeta::new(w, h, image.image_scale));
    }
    Ok((loc, score, metas))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("roigen=info".parse()?))
            .with_target(false)
            .init();
    }

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.input_path.is_empty() {
        return Err("input_path must be set in the config".into());
    }
    let proposal_cfg = ProposalConfig::from(&config.proposal);
    proposal_cfg.validate()?;

    let input_text = fs::read_to_string(&config.input_path)?;
    let input: Input = serde_json::from_str(&input_text)?;
    let anchors: Vec<Anchor> = input
        .anchors
        .iter()
        .map(|&[cx, cy, w, h]| Anchor::new(cx, cy, w, h))
        .collect();
    let (loc, score, metas) = flatten(&input)?;
    let batch = PredictionBatch::new(&loc, &score, metas.len(), anchors.len())?;

    let generator = ProposalGenerator::new().with_config(proposal_cfg);
    let result = generator.propose_phase(&anchors, batch, &metas, config.phase.into())?;
    tracing::info!(
        images = result.batch_size(),
        proposals = result.len(),
        "proposal generation finished"
    );

    let output = Output::from(&result);
    let json = serde_json::to_string_pretty(&output)?;

    match config.output_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}
