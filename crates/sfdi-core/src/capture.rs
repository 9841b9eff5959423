//! Synchronized pattern display and image capture.
//!
//! Hardware sits behind two small traits so the acquisition loop (and its
//! tests) never touch a projector or camera directly. The loop shows each
//! pattern, waits for the display to acknowledge it, then pulls one frame,
//! insisting that every frame matches the shape of the first.

use nalgebra::DMatrix;

// ── Error type ─────────────────────────────────────────────────────────────

/// Errors from a display/capture round.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureError {
    /// A captured frame differs in shape from the first.
    ShapeMismatch {
        expected: (usize, usize),
        got: (usize, usize),
    },
    /// The display refused the pattern at this sequence index.
    DisplayRejected { index: usize },
    /// The source produced no frame at this sequence index.
    SourceExhausted { index: usize },
    /// Device-level failure reported by the backend.
    Device(String),
}

impl std::fmt::Display for CaptureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ShapeMismatch { expected, got } => write!(
                f,
                "captured frame shape mismatch: expected {}x{}, got {}x{}",
                expected.0, expected.1, got.0, got.1
            ),
            Self::DisplayRejected { index } => {
                write!(f, "display rejected pattern {}", index)
            }
            Self::SourceExhausted { index } => {
                write!(f, "image source exhausted at pattern {}", index)
            }
            Self::Device(msg) => write!(f, "device failure: {}", msg),
        }
    }
}

impl std::error::Error for CaptureError {}

// ── Hardware seams ─────────────────────────────────────────────────────────

/// Produces one frame per capture call; `None` when no frame is available.
pub trait ImageSource {
    fn capture(&mut self) -> Result<Option<DMatrix<f64>>, CaptureError>;
}

/// Shows a pattern; returns whether the display accepted it.
pub trait PatternDisplay {
    fn display(&mut self, pattern: &DMatrix<f64>) -> Result<bool, CaptureError>;
}

/// Display every pattern in order and capture one frame per pattern.
///
/// Returns the frames in pattern order; all must share one shape.
pub fn acquire_sequence<D, S>(
    display: &mut D,
    source: &mut S,
    patterns: &[DMatrix<f64>],
) -> Result<Vec<DMatrix<f64>>, CaptureError>
where
    D: PatternDisplay,
    S: ImageSource,
{
    let mut frames = Vec::with_capacity(patterns.len());
    let mut expected = None;
    for (index, pattern) in patterns.iter().enumerate() {
        if !display.display(pattern)? {
            return Err(CaptureError::DisplayRejected { index });
        }
        let frame = source
            .capture()?
            .ok_or(CaptureError::SourceExhausted { index })?;
        let shape = *expected.get_or_insert(frame.shape());
        if frame.shape() != shape {
            return Err(CaptureError::ShapeMismatch {
                expected: shape,
                got: frame.shape(),
            });
        }
        frames.push(frame);
    }
    Ok(frames)
}
