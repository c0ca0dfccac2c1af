//! 多数投票
//!
//! 得票最多者胜出；票数相同时，最早获得第一票的数字胜出。

use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Entry {
    count: usize,
    first_seen: usize,
}

/// 投票计数器
#[derive(Debug, Clone, Default)]
pub struct VoteTally {
    entries: BTreeMap<u8, Entry>,
    total: usize,
}

impl VoteTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, digit: u8) {
        let index = self.total;
        self.entries
            .entry(digit)
            .or_insert(Entry {
                count: 0,
                first_seen: index,
            })
            .count += 1;
        self.total += 1;
    }

    pub fn count(&self, digit: u8) -> usize {
        self.entries.get(&digit).map_or(0, |e| e.count)
    }

    /// 总票数
    pub fn total(&self) -> usize {
        self.total
    }

    /// 胜出的数字，无票时返回 `None`
    pub fn winner(&self) -> Option<u8> {
        self.entries
            .iter()
            .max_by(|(_, a), (_, b)| {
                a.count
                    .cmp(&b.count)
                    .then_with(|| b.first_seen.cmp(&a.first_seen))
            })
            .map(|(digit, _)| *digit)
    }
}

impl Extend<u8> for VoteTally {
    fn extend<I: IntoIterator<Item = u8>>(&mut self, iter: I) {
        for digit in iter {
            self.push(digit);
        }
    }
}

impl FromIterator<u8> for VoteTally {
    fn from_iter<I: IntoIterator<Item = u8>>(iter: I) -> Self {
        let mut tally = Self::new();
        tally.extend(iter);
        tally
    }
}
