use std::ops::RangeInclusive;

/// Inclusive, 0-based index interval a virtualized list must materialize.
/// Empty when `start_index > end_index`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VirtualRange {
    pub start_index: usize,
    pub end_index: usize,
}

impl VirtualRange {
    pub const EMPTY: VirtualRange = VirtualRange {
        start_index: 1,
        end_index: 0,
    };

    pub fn is_empty(&self) -> bool {
        self.start_index > self.end_index
    }

    pub fn len(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.end_index - self.start_index + 1
        }
    }

    pub fn contains(&self, index: usize) -> bool {
        index >= self.start_index && index <= self.end_index
    }

    pub fn indices(&self) -> RangeInclusive<usize> {
        self.start_index..=self.end_index
    }
}
