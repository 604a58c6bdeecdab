//! Progress reporting
//!
//! A load batch folds the progress of all of its handles into one value and
//! forwards it to an optional [`ProgressSink`]. Values reaching the sink never
//! go backwards within a batch and the last value is always exactly `1.0`.

/// Observer for aggregate loading progress
pub trait ProgressSink {
    /// Receive a progress value in `[0, 1]`
    fn report(&mut self, value: f32);
}

impl<F: FnMut(f32)> ProgressSink for F {
    fn report(&mut self, value: f32) {
        self(value);
    }
}

/// Mean of `values`, or `None` when there are none
///
/// Accumulates in `f64`, so `n` handles all parked at the same value average
/// to exactly that value.
pub fn average_progress<I>(values: I) -> Option<f32>
where
    I: IntoIterator<Item = f32>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0.0_f64, 0_u32), |(sum, count), value| (sum + f64::from(value), count + 1));
    if count == 0 {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)]
    let mean = (sum / f64::from(count)) as f32;
    Some(mean)
}

/// Per-batch wrapper around an optional sink
///
/// Clamps to `[0, 1]`, keeps reports monotonic and delivers the final `1.0`
/// exactly once. Reports after [`ProgressTracker::finish`] are dropped.
pub(crate) struct ProgressTracker {
    sink: Option<Box<dyn ProgressSink>>,
    last: f32,
    finished: bool,
}

impl ProgressTracker {
    pub(crate) fn new(sink: Option<Box<dyn ProgressSink>>) -> Self {
        Self {
            sink,
            last: 0.0,
            finished: false,
        }
    }

    pub(crate) fn report(&mut self, value: f32) {
        if self.finished {
            return;
        }
        let value = if value.is_nan() { self.last } else { value.clamp(0.0, 1.0) };
        self.last = self.last.max(value);
        if let Some(sink) = self.sink.as_mut() {
            sink.report(self.last);
        }
    }

    pub(crate) fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.last = 1.0;
        self.finished = true;
        if let Some(sink) = self.sink.as_mut() {
            sink.report(1.0);
        }
    }

    pub(crate) const fn is_finished(&self) -> bool {
        self.finished
    }

    pub(crate) const fn last(&self) -> f32 {
        self.last
    }
}
