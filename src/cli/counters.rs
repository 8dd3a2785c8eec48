/// Per-worker tallies of one counting or profiling scan.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanCounters {
    pub records: u64,
    /// Window start positions seen
    pub windows: u64,
    /// Windows with a non-ACGTU character
    pub skipped: u64,
    pub counted: u64,
}

impl std::ops::AddAssign for ScanCounters {
    fn add_assign(&mut self, other: Self) {
        self.records += other.records;
        self.windows += other.windows;
        self.skipped += other.skipped;
        self.counted += other.counted;
    }
}

/// Per-worker tallies of one uncount run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UncountCounters {
    pub records: u64,
    /// Motif occurrences found after masking
    pub occurrences: u64,
    /// Windows decremented in the table
    pub decremented: u64,
    /// Windows overlapping an occurrence that could not be encoded
    pub skipped: u64,
    /// Decrements clamped at zero
    pub underflows: u64,
}

impl std::ops::AddAssign for UncountCounters {
    fn add_assign(&mut self, other: Self) {
        self.records += other.records;
        self.occurrences += other.occurrences;
        self.decremented += other.decremented;
        self.skipped += other.skipped;
        self.underflows += other.underflows;
    }
}
