//! Loop Segmenter Module
//! Splits one field sweep into descending (max→min) and ascending (min→max) branches.

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SegmentError {
    #[error("no samples to segment")]
    Empty,
    #[error("field and moment lengths differ ({field} vs {moment})")]
    LengthMismatch { field: usize, moment: usize },
    #[error("incomplete loop: no return sweep after the field minimum at index {min_index}")]
    IncompleteLoop { min_index: usize },
}

/// One half of a sweep, in acquisition order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoopBranch {
    pub field: Vec<f64>,
    pub moment: Vec<f64>,
}

impl LoopBranch {
    pub fn len(&self) -> usize {
        self.field.len()
    }

    pub fn is_empty(&self) -> bool {
        self.field.is_empty()
    }

    /// Same samples in reverse order (increasing field for a descending branch).
    pub fn reversed(&self) -> LoopBranch {
        LoopBranch {
            field: self.field.iter().rev().copied().collect(),
            moment: self.moment.iter().rev().copied().collect(),
        }
    }
}

/// Index bounds of one complete loop inside a sample sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSegments {
    /// Global field minimum; shared by both branches.
    pub min_index: usize,
    /// Field maximum of the return sweep, inclusive end of the loop.
    pub end_index: usize,
}

impl LoopSegments {
    /// Number of samples kept in the loop.
    pub fn point_count(&self) -> usize {
        self.end_index + 1
    }

    /// Drop any trailing partial repeat sweep.
    pub fn truncate<'a>(&self, values: &'a [f64]) -> &'a [f64] {
        &values[..=self.end_index]
    }

    /// Indices `[0, min_index]`.
    pub fn descending(&self, field: &[f64], moment: &[f64]) -> LoopBranch {
        LoopBranch {
            field: field[..=self.min_index].to_vec(),
            moment: moment[..=self.min_index].to_vec(),
        }
    }

    /// Indices `[min_index, end_index]`.
    pub fn ascending(&self, field: &[f64], moment: &[f64]) -> LoopBranch {
        LoopBranch {
            field: field[self.min_index..=self.end_index].to_vec(),
            moment: moment[self.min_index..=self.end_index].to_vec(),
        }
    }
}

/// Locates branch boundaries of a hysteresis sweep.
pub struct LoopSegmenter;

impl LoopSegmenter {
    /// Find the global field minimum and the return-sweep maximum after it.
    ///
    /// A sweep whose field never rises again after its minimum has no
    /// ascending branch and is rejected as incomplete.
    pub fn segment(field: &[f64]) -> Result<LoopSegments, SegmentError> {
        let min_index = first_extreme(field, |candidate, best| candidate < best)
            .ok_or(SegmentError::Empty)?;
        let tail = &field[min_index..];
        let end_index = first_extreme(tail, |candidate, best| candidate > best)
            .map(|offset| min_index + offset)
            .ok_or(SegmentError::IncompleteLoop { min_index })?;
        if end_index == min_index {
            return Err(SegmentError::IncompleteLoop { min_index });
        }
        Ok(LoopSegments {
            min_index,
            end_index,
        })
    }

    /// Segment and return both branches of the truncated loop.
    pub fn split(
        field: &[f64],
        moment: &[f64],
    ) -> Result<(LoopSegments, LoopBranch, LoopBranch), SegmentError> {
        if field.len() != moment.len() {
            return Err(SegmentError::LengthMismatch {
                field: field.len(),
                moment: moment.len(),
            });
        }
        let segments = Self::segment(field)?;
        let descending = segments.descending(field, moment);
        let ascending = segments.ascending(field, moment);
        Ok((segments, descending, ascending))
    }
}

/// Index of the first value that no later value beats.
fn first_extreme(values: &[f64], better: impl Fn(f64, f64) -> bool) -> Option<usize> {
    let mut iter = values.iter().enumerate();
    let (mut best_index, mut best) = iter.next().map(|(i, v)| (i, *v))?;
    for (i, &v) in iter {
        if better(v, best) {
            best_index = i;
            best = v;
        }
    }
    Some(best_index)
}
