//! Conditional tracing macros for the proposal pipeline.
//!
//! With the `tracing` feature the macros forward to the `tracing` crate; without
//! it they expand to nothing beyond evaluating their field expressions.

/// Opens an info-level span around a batch call.
#[cfg(feature = "tracing")]
macro_rules! trace_span {
    ($name:expr $(, $($field:tt)*)?) => {
        tracing::info_span!($name $(, $($field)*)?)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_span {
    ($name:expr $(, $($field:tt)*)?) => {
        $crate::trace::NoopSpan
    };
}

/// Emits an info-level event with batch-wide measurements.
#[cfg(feature = "tracing")]
macro_rules! trace_event {
    ($name:expr, $($key:ident = $value:expr),+ $(,)?) => {
        tracing::info!(name: $name, $($key = $value),+)
    };
    ($name:expr) => {
        tracing::info!(name: $name)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_event {
    ($name:expr, $($key:ident = $value:expr),+ $(,)?) => {
        let _ = ($($value,)+);
    };
    ($name:expr) => {};
}

/// Emits a debug-level event for a single image run.
#[cfg(feature = "tracing")]
macro_rules! trace_image {
    ($name:expr, $($key:ident = $value:expr),+ $(,)?) => {
        tracing::debug!(name: $name, $($key = $value),+)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_image {
    ($name:expr, $($key:ident = $value:expr),+ $(,)?) => {
        let _ = ($($value,)+);
    };
}

pub(crate) use trace_event;
pub(crate) use trace_image;
pub(crate) use trace_span;

/// Stand-in span guard so `trace_span!(..).entered()` compiles without `tracing`.
#[cfg(not(feature = "tracing"))]
pub struct NoopSpan;

#[cfg(not(feature = "tracing"))]
impl NoopSpan {
    /// Returns self, mirroring `Span::entered()`.
    #[inline]
    pub fn entered(self) -> Self {
        self
    }
}
