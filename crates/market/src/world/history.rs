/// Fixed-length circular buffer of past observations
#[derive(Debug, Clone)]
pub(crate) struct History {
    values: Vec<f64>,
    top: usize,
}

impl History {
    /// Buffer of `len` slots, all holding `value`
    pub(crate) fn filled(len: usize, value: f64) -> Self {
        Self {
            values: vec![value; len.max(1)],
            top: 0,
        }
    }

    pub(crate) fn push(&mut self, value: f64) {
        self.top = (self.top + 1) % self.values.len();
        self.values[self.top] = value;
    }

    /// Value stored `k` pushes before the newest (`ago(0)` is the newest).
    /// `k` wraps at the buffer length.
    pub(crate) fn ago(&self, k: usize) -> f64 {
        let len = self.values.len();
        self.values[(self.top + len - k % len) % len]
    }

    /// Values newest first
    pub(crate) fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.values.len()).map(move |k| self.ago(k))
    }
}
