//! # Position mapping
//!
//! Every step reports how it moved positions as a [`StepMap`]: a list of
//! `(start, old_size, new_size)` ranges, in old-document coordinates,
//! that were replaced. A [`Mapping`] chains the maps of a transaction so a
//! position from any earlier document can be carried forward.

/// Which side a position sticks to when content is inserted exactly at it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assoc {
    Before,
    After,
}

/// Mapped position plus whether the content around it was deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapResult {
    pub pos: usize,
    pub deleted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepMap {
    ranges: Vec<(usize, usize, usize)>,
}

impl StepMap {
    pub fn new(ranges: Vec<(usize, usize, usize)>) -> Self {
        Self { ranges }
    }

    /// Map that leaves every position in place
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn ranges(&self) -> &[(usize, usize, usize)] {
        &self.ranges
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn map(&self, pos: usize, assoc: Assoc) -> usize {
        self.map_result(pos, assoc).pos
    }

    pub fn map_result(&self, pos: usize, assoc: Assoc) -> MapResult {
        let mut diff: isize = 0;
        for &(start, old_size, new_size) in &self.ranges {
            if start > pos {
                break;
            }
            let end = start + old_size;
            if pos <= end {
                let before = if old_size == 0 {
                    assoc == Assoc::Before
                } else if pos == start {
                    true
                } else if pos == end {
                    false
                } else {
                    assoc == Assoc::Before
                };
                let base = (start as isize + diff) as usize;
                let mapped = if before { base } else { base + new_size };
                let edge = if assoc == Assoc::Before { start } else { end };
                return MapResult {
                    pos: mapped,
                    deleted: pos != edge,
                };
            }
            diff += new_size as isize - old_size as isize;
        }
        MapResult {
            pos: (pos as isize + diff) as usize,
            deleted: false,
        }
    }

    /// Call `f(old_start, old_end, new_start, new_end)` for every range
    pub fn for_each(&self, mut f: impl FnMut(usize, usize, usize, usize)) {
        let mut diff: isize = 0;
        for &(start, old_size, new_size) in &self.ranges {
            let new_start = (start as isize + diff) as usize;
            f(start, start + old_size, new_start, new_start + new_size);
            diff += new_size as isize - old_size as isize;
        }
    }
}

/// Ordered composition of step maps
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapping {
    maps: Vec<StepMap>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn maps(&self) -> &[StepMap] {
        &self.maps
    }

    pub fn append_map(&mut self, map: StepMap) {
        self.maps.push(map);
    }

    /// Mapping over the maps from index `from` onward
    pub fn slice(&self, from: usize) -> Mapping {
        Mapping {
            maps: self.maps[from.min(self.maps.len())..].to_vec(),
        }
    }

    pub fn map(&self, pos: usize, assoc: Assoc) -> usize {
        self.map_result(pos, assoc).pos
    }

    pub fn map_result(&self, pos: usize, assoc: Assoc) -> MapResult {
        let mut pos = pos;
        let mut deleted = false;
        for map in &self.maps {
            let result = map.map_result(pos, assoc);
            pos = result.pos;
            deleted |= result.deleted;
        }
        MapResult { pos, deleted }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_shifts_following_positions() {
        // two characters inserted at 5
        let map = StepMap::new(vec![(5, 0, 2)]);
        assert_eq!(map.map(3, Assoc::After), 3);
        assert_eq!(map.map(5, Assoc::After), 7);
        assert_eq!(map.map(5, Assoc::Before), 5);
        assert_eq!(map.map(9, Assoc::After), 11);
    }

    #[test]
    fn test_deletion_collapses_range() {
        // 4..8 deleted
        let map = StepMap::new(vec![(4, 4, 0)]);
        let inside = map.map_result(6, Assoc::After);
        assert_eq!(inside, MapResult { pos: 4, deleted: true });
        assert_eq!(map.map(10, Assoc::After), 6);
        assert!(!map.map_result(4, Assoc::Before).deleted);
    }

    #[test]
    fn test_wrap_map_has_two_ranges() {
        // wrapping 2..10: one position opened at 2, one closed at 10
        let map = StepMap::new(vec![(2, 0, 1), (10, 0, 1)]);
        assert_eq!(map.map(5, Assoc::After), 6);
        assert_eq!(map.map(12, Assoc::After), 14);
    }

    #[test]
    fn test_mapping_composes() {
        let mut mapping = Mapping::new();
        mapping.append_map(StepMap::new(vec![(1, 0, 3)]));
        mapping.append_map(StepMap::new(vec![(0, 2, 0)]));
        // 5 -> 8 -> 6
        assert_eq!(mapping.map(5, Assoc::After), 6);
        assert_eq!(mapping.slice(1).map(5, Assoc::After), 3);
    }

    #[test]
    fn test_for_each_reports_new_coordinates() {
        let map = StepMap::new(vec![(2, 1, 3), (6, 2, 0)]);
        let mut seen = Vec::new();
        map.for_each(|a, b, c, d| seen.push((a, b, c, d)));
        assert_eq!(seen, vec![(2, 3, 2, 5), (6, 8, 8, 8)]);
    }
}
