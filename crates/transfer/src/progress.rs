//! Session-wide progress accounting across sequential chunk transfers.

/// A progress point ready to be published.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSnapshot {
    pub fraction: f64,
    pub bytes_done: u64,
    pub bytes_expected: u64,
}

/// Converts per-chunk transfer counters into a session-wide fraction.
///
/// Snapshots are only produced when `bytes_done` strictly increases, and
/// the fraction reaches 1.0 only once the last pending chunk is confirmed.
#[derive(Debug)]
pub struct ProgressTracker {
    total: u64,
    confirmed: u64,
    pending_chunks: usize,
    chunk_expected: u64,
    chunk_base: u64,
    last_done: Option<u64>,
}

impl ProgressTracker {
    /// Creates a tracker for a session of `total` bytes with `pending`
    /// chunk sizes still to upload. Bytes not covered by `pending` were
    /// confirmed in an earlier attempt.
    pub fn new(total: u64, pending: impl IntoIterator<Item = u64>) -> Self {
        let (count, pending_bytes) = pending
            .into_iter()
            .fold((0usize, 0u64), |(n, sum), size| (n + 1, sum + size));
        Self {
            total,
            confirmed: total.saturating_sub(pending_bytes),
            pending_chunks: count,
            chunk_expected: 0,
            chunk_base: 0,
            last_done: None,
        }
    }

    /// Starts accounting for the next chunk.
    ///
    /// The baseline is `expected - residual`, where `residual` is the size
    /// of the chunk artifact still on disk. It only shifts the reported
    /// figures; the chunk is always sent in full.
    pub fn begin_chunk(&mut self, expected: u64, residual: u64) -> u64 {
        self.chunk_expected = expected;
        self.chunk_base = expected.saturating_sub(residual);
        self.chunk_base
    }

    /// Records `transferred` bytes of the current chunk.
    pub fn advance(&mut self, transferred: u64) -> Option<ProgressSnapshot> {
        let in_chunk = self
            .chunk_base
            .saturating_add(transferred)
            .min(self.chunk_expected);
        let done = (self.confirmed + in_chunk).min(self.total);
        if done >= self.total {
            return None;
        }
        self.publish(done)
    }

    /// Marks the current chunk as confirmed by the server.
    pub fn confirm_chunk(&mut self) -> Option<ProgressSnapshot> {
        self.pending_chunks = self.pending_chunks.saturating_sub(1);
        self.confirmed = if self.pending_chunks == 0 {
            self.total
        } else {
            (self.confirmed + self.chunk_expected).min(self.total.saturating_sub(1))
        };
        self.chunk_expected = 0;
        self.chunk_base = 0;
        self.publish(self.confirmed)
    }

    /// Bytes confirmed so far, including earlier attempts.
    pub fn confirmed_bytes(&self) -> u64 {
        self.confirmed
    }

    fn publish(&mut self, done: u64) -> Option<ProgressSnapshot> {
        if self.last_done.is_some_and(|last| done <= last) {
            return None;
        }
        self.last_done = Some(done);
        let fraction = if self.total == 0 {
            1.0
        } else {
            done as f64 / self.total as f64
        };
        Some(ProgressSnapshot {
            fraction,
            bytes_done: done,
            bytes_expected: self.total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_session_accumulates_across_chunks() {
        let mut t = ProgressTracker::new(30, [10, 10, 10]);
        assert_eq!(t.confirmed_bytes(), 0);

        t.begin_chunk(10, 10);
        let p = t.advance(5).unwrap();
        assert_eq!(p.bytes_done, 5);
        assert!((p.fraction - 5.0 / 30.0).abs() < f64::EPSILON);
        let p = t.confirm_chunk().unwrap();
        assert_eq!(p.bytes_done, 10);

        t.begin_chunk(10, 10);
        let p = t.advance(4).unwrap();
        assert_eq!(p.bytes_done, 14);
    }

    #[test]
    fn resumed_session_starts_from_confirmed_bytes() {
        // Two of three chunks confirmed in a previous attempt.
        let mut t = ProgressTracker::new(30, [10]);
        assert_eq!(t.confirmed_bytes(), 20);
        t.begin_chunk(10, 10);
        assert_eq!(t.advance(1).unwrap().bytes_done, 21);
    }

    #[test]
    fn never_reports_complete_before_final_confirmation() {
        let mut t = ProgressTracker::new(20, [10, 10]);
        t.begin_chunk(10, 10);
        t.advance(10);
        t.confirm_chunk();
        t.begin_chunk(10, 10);
        assert!(t.advance(10).is_none());
        let p = t.confirm_chunk().unwrap();
        assert_eq!(p.fraction, 1.0);
        assert_eq!(p.bytes_done, 20);
    }

    #[test]
    fn snapshots_are_strictly_increasing() {
        let mut t = ProgressTracker::new(100, [50, 50]);
        t.begin_chunk(50, 50);
        assert!(t.advance(10).is_some());
        assert!(t.advance(10).is_none());
        assert!(t.advance(5).is_none());
        assert!(t.advance(11).is_some());
    }

    #[test]
    fn residual_shifts_baseline_only_within_chunk() {
        // Progress accounting only: a missing artifact counts the chunk's
        // bytes as already sent but never beyond the chunk's own size.
        let mut t = ProgressTracker::new(30, [10, 10, 10]);
        assert_eq!(t.begin_chunk(10, 4), 6);
        assert_eq!(t.advance(0).unwrap().bytes_done, 6);
        assert_eq!(t.advance(100).unwrap().bytes_done, 10);
    }

    #[test]
    fn chunk_sizes_larger_than_total_are_clamped() {
        let mut t = ProgressTracker::new(10, [8, 8]);
        t.begin_chunk(8, 8);
        let p = t.confirm_chunk().unwrap();
        assert_eq!(p.bytes_done, 8);
        assert!(p.fraction < 1.0);
        t.begin_chunk(8, 8);
        assert_eq!(t.confirm_chunk().unwrap().fraction, 1.0);
    }
}
