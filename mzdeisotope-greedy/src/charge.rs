//! Charge state hypotheses

/// An inclusive `(minimum, maximum)` pair of charge states
pub type ChargeRange = (i32, i32);

/// Iterate over the charge states of a [`ChargeRange`] in ascending order.
///
/// The range is inclusive of both ends. When the minimum is greater than the maximum
/// the iterator is empty.
#[derive(Debug, Clone)]
pub struct ChargeRangeIter {
    pub min: i32,
    pub max: i32,
    index: usize,
    size: usize,
}

impl ChargeRangeIter {
    pub fn new(min: i32, max: i32) -> ChargeRangeIter {
        let size = if min > max {
            0
        } else {
            (max as i64 - min as i64) as usize + 1
        };
        ChargeRangeIter {
            min,
            max,
            index: 0,
            size,
        }
    }

    pub fn next_charge(&mut self) -> Option<i32> {
        if self.index >= self.size {
            None
        } else {
            let z = (self.min as i64 + self.index as i64) as i32;
            self.index += 1;
            Some(z)
        }
    }

    /// The number of charge states the range spans
    pub fn size(&self) -> usize {
        self.size
    }
}

impl Iterator for ChargeRangeIter {
    type Item = i32;

    fn next(&mut self) -> Option<i32> {
        self.next_charge()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.size - self.index;
        (n, Some(n))
    }
}

impl ExactSizeIterator for ChargeRangeIter {}

impl From<ChargeRange> for ChargeRangeIter {
    fn from(pair: ChargeRange) -> ChargeRangeIter {
        ChargeRangeIter::new(pair.0, pair.1)
    }
}
