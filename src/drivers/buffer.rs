use ndarray::{s, Array2, Axis};
use crate::drivers::frame::{SampleSet, CHANNEL_COUNT};
/// Default number of samples kept per channel.
pub const DEFAULT_HISTORY: usize = 200;
/// Fixed-depth history for every channel, shaped `(CHANNEL_COUNT, history)`.
///
/// Starts zero-filled and never changes shape; each push evicts the oldest
/// column and appends the new sample set as the last one.
#[derive(Clone, Debug)]
pub struct RollingBuffer {
    data: Array2<f32>, // channels x samples
}
impl RollingBuffer {
    pub fn new(history: usize) -> Self {
        Self {
            data: Array2::zeros((CHANNEL_COUNT, history.max(1))),
        }
    }
    pub fn history_len(&self) -> usize {
        self.data.len_of(Axis(1))
    }
    pub fn push(&mut self, set: &SampleSet) {
        let history = self.history_len();
        for (mut row, value) in self.data.axis_iter_mut(Axis(0)).zip(set.iter()) {
            for i in 1..history {
                row[i - 1] = row[i];
            }
            row[history - 1] = *value;
        }
    }
    /// Oldest-to-newest values for `channel`, always `history_len()` long.
    pub fn snapshot(&self, channel: usize) -> Vec<f32> {
        if channel >= CHANNEL_COUNT {
            return vec![0.0; self.history_len()];
        }
        self.data.slice(s![channel, ..]).to_vec()
    }
    #[cfg(test)]
    pub fn latest(&self) -> SampleSet {
        let mut set = [0.0; CHANNEL_COUNT];
        let last = self.history_len() - 1;
        for (channel, value) in set.iter_mut().enumerate() {
            *value = self.data[[channel, last]];
        }
        set
    }
}
