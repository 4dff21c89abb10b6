// framestack-core/src/layout.rs

//! Batch layouts and address ranges.
//!
//! A buffer addressed under a [`BatchLayout`] holds `S` parallel sequences of
//! `T` time steps each. Columns are time-major with the sequences interleaved,
//! so the frame of sequence `s` at time `t` is column `t * S + s`.

use crate::error::FrameStackError;
use std::ops::Range;

/// Marks the time steps `[begin, end)` of a sequence as one complete sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SentenceSpan {
    pub begin: usize,
    pub end: usize,
}

/// `S` parallel sequences of `T` time steps, with optional sentence spans.
///
/// Equality compares the spans as well, so two layouts with the same `S x T`
/// but different boundaries are different values.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchLayout {
    num_parallel_sequences: usize,
    num_time_steps: usize,
    sentences: Vec<Option<SentenceSpan>>,
}

impl BatchLayout {
    pub fn new(num_parallel_sequences: usize, num_time_steps: usize) -> Self {
        let mut layout = BatchLayout::default();
        layout.init(num_parallel_sequences, num_time_steps);
        layout
    }

    /// Resets the layout to `S x T` with no sentence boundaries.
    pub fn init(&mut self, num_parallel_sequences: usize, num_time_steps: usize) {
        self.num_parallel_sequences = num_parallel_sequences;
        self.num_time_steps = num_time_steps;
        self.sentences.clear();
        self.sentences.resize(num_parallel_sequences, None);
    }

    pub fn num_parallel_sequences(&self) -> usize {
        self.num_parallel_sequences
    }

    pub fn num_time_steps(&self) -> usize {
        self.num_time_steps
    }

    /// Number of columns a buffer under this layout must have.
    pub fn num_cols(&self) -> usize {
        self.num_parallel_sequences * self.num_time_steps
    }

    pub fn column_index(&self, sequence: usize, time_step: usize) -> usize {
        time_step * self.num_parallel_sequences + sequence
    }

    pub fn set_as_sentence(&mut self, sequence: usize, begin: usize, end: usize) -> Result<(), FrameStackError> {
        if sequence >= self.num_parallel_sequences || begin >= end || end > self.num_time_steps {
            return Err(FrameStackError::InvalidOperation {
                operation: "BatchLayout::set_as_sentence".to_string(),
                message: format!(
                    "sentence [{}, {}) of sequence {} does not fit a {} x {} layout",
                    begin, end, sequence, self.num_parallel_sequences, self.num_time_steps
                ),
            });
        }
        self.sentences[sequence] = Some(SentenceSpan { begin, end });
        Ok(())
    }

    pub fn sentence(&self, sequence: usize) -> Option<SentenceSpan> {
        self.sentences.get(sequence).copied().flatten()
    }

    /// True when no sequence carries boundary information.
    pub fn is_all_none(&self) -> bool {
        self.sentences.iter().all(Option::is_none)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frames {
    All,
    TimeStep(usize),
    Frame { time_step: usize, sequence: usize },
}

/// A contiguous span of columns of a buffer, relative to a batch layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressRange<'a> {
    frames: Frames,
    layout: Option<&'a BatchLayout>,
}

impl<'a> AddressRange<'a> {
    /// Every column of the buffer.
    pub fn all() -> Self {
        AddressRange { frames: Frames::All, layout: None }
    }

    /// All parallel sequences at one time step.
    pub fn time_step(time_step: usize) -> Self {
        AddressRange { frames: Frames::TimeStep(time_step), layout: None }
    }

    /// A single frame.
    pub fn frame(time_step: usize, sequence: usize) -> Self {
        AddressRange { frames: Frames::Frame { time_step, sequence }, layout: None }
    }

    /// The same selection, interpreted against `layout`.
    pub fn with_layout<'b>(&self, layout: &'b BatchLayout) -> AddressRange<'b> {
        AddressRange { frames: self.frames, layout: Some(layout) }
    }

    /// Same as [`with_layout`](Self::with_layout) but also accepts a missing layout.
    pub fn with_optional_layout<'b>(&self, layout: Option<&'b BatchLayout>) -> AddressRange<'b> {
        AddressRange { frames: self.frames, layout }
    }

    pub fn layout(&self) -> Option<&'a BatchLayout> {
        self.layout
    }

    pub fn is_all_frames(&self) -> bool {
        self.frames == Frames::All
    }

    /// Resolves the selection to a column span of a buffer with `cols` columns.
    pub fn columns(&self, cols: usize) -> Result<Range<usize>, FrameStackError> {
        let layout = match self.layout {
            Some(layout) => layout,
            None if self.is_all_frames() => return Ok(0..cols),
            None => {
                return Err(FrameStackError::misuse(
                    "AddressRange::columns",
                    "a frame selection needs a batch layout",
                ))
            }
        };
        if layout.num_cols() != cols {
            return Err(FrameStackError::ShapeMismatch {
                expected: vec![layout.num_parallel_sequences(), layout.num_time_steps()],
                actual: vec![cols],
                operation: "AddressRange::columns (S * T must equal column count)".to_string(),
            });
        }
        let s = layout.num_parallel_sequences();
        let range = match self.frames {
            Frames::All => 0..cols,
            Frames::TimeStep(t) => t * s..(t + 1) * s,
            Frames::Frame { time_step, sequence } => {
                if sequence >= s {
                    return Err(FrameStackError::misuse(
                        "AddressRange::columns",
                        format!("sequence {} out of range for {} parallel sequences", sequence, s),
                    ));
                }
                let c = layout.column_index(sequence, time_step);
                c..c + 1
            }
        };
        if range.end > cols {
            return Err(FrameStackError::misuse(
                "AddressRange::columns",
                format!("time step out of range for {} time steps", layout.num_time_steps()),
            ));
        }
        Ok(range)
    }
}
