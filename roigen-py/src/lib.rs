//! Python bindings for roigen region proposal generation.
//!
//! This module exposes batch proposal generation over numpy arrays via PyO3.

use numpy::ndarray::Array2;
use numpy::{
    IntoPyArray, PyArray1, PyArray2, PyReadonlyArray1, PyReadonlyArray2, PyReadonlyArray3,
    PyUntypedArrayMethods,
};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use roigen::{
    Anchor, ImageMeta, Phase, PredictionBatch, ProposalConfig as RustProposalConfig,
    ProposalGenerator, RoiGenError, SelectionBudget,
};

/// Convert a RoiGenError to a Python exception.
fn to_py_err(err: RoiGenError) -> PyErr {
    match err {
        RoiGenError::InputShapeMismatch { .. }
        | RoiGenError::InvalidImageMeta { .. }
        | RoiGenError::InvalidThreshold { .. }
        | RoiGenError::InvalidConfig(_) => PyValueError::new_err(err.to_string()),
        _ => PyRuntimeError::new_err(err.to_string()),
    }
}

fn parse_phase(phase: &str) -> PyResult<Phase> {
    match phase.to_lowercase().as_str() {
        "train" => Ok(Phase::Train),
        "test" => Ok(Phase::Test),
        _ => Err(PyValueError::new_err("phase must be 'train' or 'test'")),
    }
}

fn check_shape(name: &str, shape: &[usize], expected: &[usize]) -> PyResult<()> {
    if shape != expected {
        return Err(PyValueError::new_err(format!(
            "{name} must have shape {expected:?}, got {shape:?}"
        )));
    }
    Ok(())
}

/// Configuration for proposal generation.
#[pyclass]
#[derive(Clone)]
pub struct ProposalConfig {
    inner: RustProposalConfig,
}

#[pymethods]
impl ProposalConfig {
    /// Create a new ProposalConfig.
    ///
    /// Args:
    ///     nms_threshold: IoU above which lower-scoring boxes are suppressed (default: 0.7)
    ///     min_size: Minimum box side in original-image pixels (default: 16.0)
    ///     train_pre_nms: Candidates kept before NMS while training; <= 0 keeps all (default: 12000)
    ///     train_post_nms: Candidates kept after NMS while training (default: 2000)
    ///     test_pre_nms: Candidates kept before NMS at inference (default: 6000)
    ///     test_post_nms: Candidates kept after NMS at inference (default: 300)
    ///     parallel: Process images of a batch in parallel (default: False)
    #[new]
    #[pyo3(signature = (
        nms_threshold = 0.7,
        min_size = 16.0,
        train_pre_nms = 12000,
        train_post_nms = 2000,
        test_pre_nms = 6000,
        test_post_nms = 300,
        parallel = false
    ))]
    fn new(
        nms_threshold: f32,
        min_size: f32,
        train_pre_nms: i64,
        train_post_nms: i64,
        test_pre_nms: i64,
        test_post_nms: i64,
        parallel: bool,
    ) -> PyResult<Self> {
        let inner = RustProposalConfig {
            nms_threshold,
            min_size,
            train: SelectionBudget::new(train_pre_nms, train_post_nms),
            test: SelectionBudget::new(test_pre_nms, test_post_nms),
            parallel,
        };
        inner.validate().map_err(to_py_err)?;
        Ok(Self { inner })
    }

    /// Validate the configuration.
    fn validate(&self) -> PyResult<()> {
        self.inner.validate().map_err(to_py_err)
    }

    #[getter]
    fn nms_threshold(&self) -> f32 {
        self.inner.nms_threshold
    }

    #[getter]
    fn min_size(&self) -> f32 {
        self.inner.min_size
    }

    fn __repr__(&self) -> String {
        format!(
            "ProposalConfig(nms_threshold={}, min_size={}, train=({}, {}), test=({}, {}), parallel={})",
            self.inner.nms_threshold,
            self.inner.min_size,
            self.inner.train.pre_nms.to_signed(),
            self.inner.train.post_nms.to_signed(),
            self.inner.test.pre_nms.to_signed(),
            self.inner.test.post_nms.to_signed(),
            self.inner.parallel
        )
    }
}

/// Generate region proposals for a batch.
///
/// Args:
///     loc: float32 array (B x R x 4) of (dx, dy, dw, dh) offsets
///     score: float32 array (B x R x 2) of (background, foreground) scores
///     anchors: float32 array (R x 4) of (cx, cy, w, h) anchors
///     border_sizes: float32 array (B x 2) of (width, height) clamp borders
///     image_scales: float32 array (B,) of resize factors
///     config: ProposalConfig (default: ProposalConfig())
///     phase: "train" or "test" (default: "test")
///
/// Returns:
///     Tuple (rois, counts): rois is float32 (N x 5) rows of
///     (image_index, x1, y1, x2, y2) and counts is int64 (B,)
#[pyfunction]
#[pyo3(signature = (loc, score, anchors, border_sizes, image_scales, config = None, phase = "test"))]
#[allow(clippy::too_many_arguments, clippy::type_complexity)]
fn propose<'py>(
    py: Python<'py>,
    loc: PyReadonlyArray3<'py, f32>,
    score: PyReadonlyArray3<'py, f32>,
    anchors: PyReadonlyArray2<'py, f32>,
    border_sizes: PyReadonlyArray2<'py, f32>,
    image_scales: PyReadonlyArray1<'py, f32>,
    config: Option<ProposalConfig>,
    phase: &str,
) -> PyResult<(Bound<'py, PyArray2<f32>>, Bound<'py, PyArray1<i64>>)> {
    let phase = parse_phase(phase)?;
    let loc_shape = loc.shape();
    let (batch_size, num_anchors) = (loc_shape[0], loc_shape[1]);
    if loc_shape[2] != 4 {
        return Err(PyValueError::new_err("loc must have 4 values per anchor"));
    }
    check_shape("score", score.shape(), &[batch_size, num_anchors, 2])?;
    check_shape("anchors", anchors.shape(), &[num_anchors, 4])?;
    check_shape("border_sizes", border_sizes.shape(), &[batch_size, 2])?;
    check_shape("image_scales", image_scales.shape(), &[batch_size])?;

    let anchors: Vec<Anchor> = anchors
        .as_slice()?
        .chunks_exact(4)
        .map(|a| Anchor::new(a[0], a[1], a[2], a[3]))
        .collect();
    let metas: Vec<ImageMeta> = border_sizes
        .as_slice()?
        .chunks_exact(2)
        .zip(image_scales.as_slice()?)
        .map(|(border, &scale)| ImageMeta::new(border[0], border[1], scale))
        .collect();

    let batch = PredictionBatch::new(loc.as_slice()?, score.as_slice()?, batch_size, num_anchors)
        .map_err(to_py_err)?;
    let cfg = config.map(|c| c.inner).unwrap_or_default();
    let generator = ProposalGenerator::new().with_config(cfg);
    let result = generator
        .propose_phase(&anchors, batch, &metas, phase)
        .map_err(to_py_err)?;

    let counts: Vec<i64> = result.counts().iter().map(|&c| c as i64).collect();
    let rows: Vec<f32> = result.to_rows().into_iter().flatten().collect();
    let rois = Array2::from_shape_vec((result.len(), 5), rows)
        .map_err(|e| PyRuntimeError::new_err(e.to_string()))?;

    Ok((rois.into_pyarray(py), counts.into_pyarray(py)))
}

/// Python module for roigen region proposal generation.
#[pymodule]
fn _roigen(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<ProposalConfig>()?;
    m.add_function(wrap_pyfunction!(propose, m)?)?;

    // Add version
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}
