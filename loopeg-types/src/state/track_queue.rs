use serde::{Deserialize, Serialize};

use super::block::ArpBlock;
use crate::event::Arpeggio;

/// Ordered blocks of one row plus the playback cursor.
///
/// Edits keep the cursor on the same logical block so playback continues
/// where it was. Removing the block under the cursor makes the following
/// block play next: the cursor moves onto it and the next [`advance`]
/// is swallowed.
///
/// [`advance`]: TrackQueue::advance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackQueue {
    blocks: Vec<ArpBlock>,
    cursor: usize,
    #[serde(skip)]
    hold_cursor: bool,
}

impl TrackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn blocks(&self) -> &[ArpBlock] {
        &self.blocks
    }

    pub fn get(&self, index: usize) -> Option<&ArpBlock> {
        self.blocks.get(index)
    }

    /// Mutable access for pattern edits. Ids and order are queue-managed.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut ArpBlock> {
        self.blocks.get_mut(index)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// The block that plays next.
    pub fn current(&self) -> Option<&ArpBlock> {
        self.blocks.get(self.cursor)
    }

    /// Expand the cursor block without moving the cursor.
    pub fn peek_next(&self, song_bpm: f64, rng: &mut fastrand::Rng) -> Option<Arpeggio> {
        self.current().map(|b| b.expand(song_bpm, rng))
    }

    /// Move to the next block, wrapping around at the end.
    pub fn advance(&mut self) {
        if self.blocks.is_empty() {
            return;
        }
        if self.hold_cursor {
            self.hold_cursor = false;
            return;
        }
        self.cursor = (self.cursor + 1) % self.blocks.len();
    }

    /// Drop a pending swallowed advance. Call when the cursor block is
    /// fetched afresh, so the advance after it moves on.
    pub fn release_hold(&mut self) {
        self.hold_cursor = false;
    }

    pub fn rewind(&mut self) {
        self.cursor = 0;
        self.hold_cursor = false;
    }

    pub fn push(&mut self, block: ArpBlock) -> usize {
        self.insert(self.blocks.len(), block)
    }

    /// Insert at `index` (clamped to the end). Returns the final position.
    pub fn insert(&mut self, index: usize, block: ArpBlock) -> usize {
        let index = index.min(self.blocks.len());
        let was_empty = self.blocks.is_empty();
        self.blocks.insert(index, block);
        if !was_empty && index <= self.cursor {
            self.cursor += 1;
        }
        self.renumber();
        index
    }

    pub fn remove(&mut self, index: usize) -> Option<ArpBlock> {
        if index >= self.blocks.len() {
            return None;
        }
        let removed = self.blocks.remove(index);
        if self.blocks.is_empty() {
            self.cursor = 0;
            self.hold_cursor = false;
        } else if index < self.cursor {
            self.cursor -= 1;
        } else if index == self.cursor {
            if self.cursor >= self.blocks.len() {
                self.cursor = 0;
            }
            self.hold_cursor = true;
        }
        self.renumber();
        Some(removed)
    }

    /// Clone the block at `index` and insert the copy right after it.
    pub fn duplicate(&mut self, index: usize) -> Option<usize> {
        let copy = self.blocks.get(index)?.clone();
        Some(self.insert(index + 1, copy))
    }

    /// Swap the block at `index` with its left neighbour.
    pub fn move_left(&mut self, index: usize) -> bool {
        if index == 0 || index >= self.blocks.len() {
            return false;
        }
        self.swap(index - 1, index);
        true
    }

    /// Swap the block at `index` with its right neighbour.
    pub fn move_right(&mut self, index: usize) -> bool {
        if index + 1 >= self.blocks.len() {
            return false;
        }
        self.swap(index, index + 1);
        true
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.blocks.swap(a, b);
        if self.cursor == a {
            self.cursor = b;
        } else if self.cursor == b {
            self.cursor = a;
        }
        self.renumber();
    }

    fn renumber(&mut self) {
        for (i, block) in self.blocks.iter_mut().enumerate() {
            block.id = i;
        }
    }

    /// Sum of the blocks' nominal durations at `song_bpm`.
    pub fn nominal_duration(&self, song_bpm: f64) -> f64 {
        self.blocks.iter().map(|b| b.nominal_duration(song_bpm)).sum()
    }

    pub fn max_rate(&self) -> Option<f64> {
        self.blocks
            .iter()
            .map(ArpBlock::nominal_rate)
            .fold(None, |acc, r| Some(acc.map_or(r, |m: f64| m.max(r))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::pattern::NotePattern;

    fn block(ground: u8) -> ArpBlock {
        ArpBlock::new(NotePattern {
            ground_note: ground,
            ..NotePattern::default()
        })
    }

    fn queue(grounds: &[u8]) -> TrackQueue {
        let mut q = TrackQueue::new();
        for &g in grounds {
            q.push(block(g));
        }
        q
    }

    fn current_ground(q: &TrackQueue) -> Option<u8> {
        q.current().map(|b| b.pattern.ground_note)
    }

    #[test]
    fn advance_wraps() {
        let mut q = queue(&[60, 62, 64]);
        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(current_ground(&q).unwrap());
            q.advance();
        }
        assert_eq!(seen, vec![60, 62, 64, 60]);
    }

    #[test]
    fn empty_queue_peeks_nothing() {
        let mut q = TrackQueue::new();
        q.advance();
        assert_eq!(q.cursor(), 0);
        assert!(q.peek_next(120.0, &mut fastrand::Rng::with_seed(0)).is_none());
    }

    #[test]
    fn peek_does_not_advance() {
        let q = queue(&[60, 62]);
        let mut rng = fastrand::Rng::with_seed(0);
        assert!(q.peek_next(120.0, &mut rng).is_some());
        assert_eq!(q.cursor(), 0);
    }

    #[test]
    fn insert_before_cursor_keeps_logical_block() {
        let mut q = queue(&[60, 62, 64]);
        q.advance();
        q.insert(0, block(70));
        assert_eq!(current_ground(&q), Some(62));
        q.insert(q.cursor(), block(72));
        assert_eq!(current_ground(&q), Some(62));
        q.push(block(74));
        assert_eq!(current_ground(&q), Some(62));
    }

    #[test]
    fn insert_into_empty_queue_starts_at_zero() {
        let mut q = TrackQueue::new();
        q.insert(5, block(60));
        assert_eq!(q.cursor(), 0);
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn remove_before_cursor_shifts_back() {
        let mut q = queue(&[60, 62, 64]);
        q.advance();
        q.advance();
        q.remove(0);
        assert_eq!(current_ground(&q), Some(64));
    }

    #[test]
    fn remove_current_plays_following_block_next() {
        let mut q = queue(&[60, 62, 64]);
        q.advance();
        q.remove(1);
        assert_eq!(current_ground(&q), Some(64));
        // The swallowed advance keeps 64 as the next block to play.
        q.advance();
        assert_eq!(current_ground(&q), Some(64));
        q.advance();
        assert_eq!(current_ground(&q), Some(60));
    }

    #[test]
    fn fresh_fetch_releases_the_hold() {
        let mut q = queue(&[60, 62, 64]);
        q.remove(0);
        q.release_hold();
        assert_eq!(current_ground(&q), Some(62));
        q.advance();
        assert_eq!(current_ground(&q), Some(64));
    }

    #[test]
    fn remove_current_last_wraps() {
        let mut q = queue(&[60, 62, 64]);
        q.advance();
        q.advance();
        q.remove(2);
        assert_eq!(q.cursor(), 0);
        assert_eq!(current_ground(&q), Some(60));
    }

    #[test]
    fn remove_renumbers_ids() {
        let mut q = queue(&[60, 62, 64]);
        q.remove(0);
        let ids: Vec<usize> = q.blocks().iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![0, 1]);
        assert!(q.remove(9).is_none());
    }

    #[test]
    fn duplicate_inserts_after_source() {
        let mut q = queue(&[60, 62]);
        assert_eq!(q.duplicate(0), Some(1));
        let grounds: Vec<u8> = q.blocks().iter().map(|b| b.pattern.ground_note).collect();
        assert_eq!(grounds, vec![60, 60, 62]);
        assert_eq!(q.blocks()[1].id, 1);
        assert_eq!(q.duplicate(7), None);
    }

    #[test]
    fn moves_carry_the_cursor() {
        let mut q = queue(&[60, 62, 64]);
        q.advance();
        assert!(q.move_left(1));
        assert_eq!(q.cursor(), 0);
        assert_eq!(current_ground(&q), Some(62));
        assert!(q.move_right(1));
        assert_eq!(current_ground(&q), Some(62));
        assert!(!q.move_left(0));
        assert!(!q.move_right(2));
        let grounds: Vec<u8> = q.blocks().iter().map(|b| b.pattern.ground_note).collect();
        assert_eq!(grounds, vec![62, 64, 60]);
    }

    #[test]
    fn durations_and_rates() {
        let mut q = queue(&[60, 62]);
        q.get_mut(1).unwrap().pattern.rate = 2.0;
        assert!((q.nominal_duration(120.0) - 0.75).abs() < 1e-9);
        assert_eq!(q.max_rate(), Some(2.0));
        assert_eq!(TrackQueue::new().max_rate(), None);
    }

    #[test]
    fn cursor_stays_in_range_under_random_edits() {
        let mut rng = fastrand::Rng::with_seed(0x5eed);
        let mut q = TrackQueue::new();
        for _ in 0..5000 {
            match rng.u8(0..6) {
                0 | 1 => {
                    let at = rng.usize(0..=q.len());
                    q.insert(at, block(rng.u8(40..80)));
                }
                2 => {
                    let at = rng.usize(0..=q.len());
                    q.remove(at);
                }
                3 => q.advance(),
                4 => {
                    let at = rng.usize(0..=q.len());
                    q.duplicate(at);
                }
                _ => {
                    let at = rng.usize(0..=q.len());
                    if rng.bool() {
                        q.move_left(at);
                    } else {
                        q.move_right(at);
                    }
                }
            }
            if q.is_empty() {
                assert_eq!(q.cursor(), 0);
            } else {
                assert!(q.cursor() < q.len());
            }
            assert!(q.blocks().iter().enumerate().all(|(i, b)| b.id == i));
        }
    }
}
