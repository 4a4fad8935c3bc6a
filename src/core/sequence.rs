// Issue-order sequencing for overlapping requests

/// Numbers requests as they are issued and admits a completion only when it
/// is newer than the last one applied.
#[derive(Debug, Clone, Default)]
pub struct SequenceGate {
    next: u64,
    last_applied: Option<u64>,
}

impl SequenceGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self) -> u64 {
        self.next += 1;
        self.next
    }

    pub fn is_fresh(&self, seq: u64) -> bool {
        self.last_applied.map_or(true, |last| seq > last)
    }

    pub fn mark_applied(&mut self, seq: u64) {
        self.last_applied = Some(self.last_applied.map_or(seq, |last| last.max(seq)));
    }

    pub fn last_applied(&self) -> Option<u64> {
        self.last_applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_late_completion_is_not_fresh() {
        let mut gate = SequenceGate::new();
        let first = gate.issue();
        let second = gate.issue();
        assert!(second > first);

        assert!(gate.is_fresh(second));
        gate.mark_applied(second);
        assert!(!gate.is_fresh(first));
        assert!(!gate.is_fresh(second));
        assert_eq!(gate.last_applied(), Some(second));
    }
}
