use crate::{HeightSource, Keyed, VerticalSegment};

/// What a traversal consumer wants to happen next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Continue,
    Stop,
}

/// Positions of list items computed outwards from one anchor ("pivot") item.
///
/// Nothing is precomputed: each traversal step looks up one height and derives one segment, so
/// the cost of a traversal is bounded by how far the consumer lets it go, not by the list length.
#[derive(Debug)]
pub struct Layout<'a, T, H> {
    list: &'a [T],
    pivot_index: usize,
    pivot_offset: i64,
    heights: &'a H,
}

impl<'a, T, H> Layout<'a, T, H>
where
    T: Keyed,
    H: HeightSource<T::Key>,
{
    /// Returns `None` when `pivot_index` is outside the list.
    pub fn from_pivot(
        list: &'a [T],
        pivot_index: usize,
        pivot_offset: i64,
        heights: &'a H,
    ) -> Option<Self> {
        if pivot_index >= list.len() {
            return None;
        }
        Some(Self {
            list,
            pivot_index,
            pivot_offset,
            heights,
        })
    }

    pub fn pivot_index(&self) -> usize {
        self.pivot_index
    }

    pub fn pivot_offset(&self) -> i64 {
        self.pivot_offset
    }

    /// Walks towards the start of the list: `pivot`, `pivot - 1`, ... (the pivot only when
    /// `include_pivot` is set). Each item ends where the previously visited one starts.
    pub fn traverse_upwards(
        &self,
        include_pivot: bool,
        mut consumer: impl FnMut(&'a T, VerticalSegment) -> Decision,
    ) {
        let (mut previous_top, mut next) = if include_pivot {
            (self.pivot_bottom(), Some(self.pivot_index))
        } else {
            (self.pivot_top(), self.pivot_index.checked_sub(1))
        };

        while let Some(index) = next {
            let item = &self.list[index];
            let height = self.heights.height(item.key());
            let segment = VerticalSegment::new(previous_top - i64::from(height), height);
            if consumer(item, segment) == Decision::Stop {
                return;
            }
            previous_top = segment.top();
            next = index.checked_sub(1);
        }
    }

    /// Walks towards the end of the list: `pivot`, `pivot + 1`, ... (the pivot only when
    /// `include_pivot` is set). Each item starts where the previously visited one ends.
    pub fn traverse_downwards(
        &self,
        include_pivot: bool,
        mut consumer: impl FnMut(&'a T, VerticalSegment) -> Decision,
    ) {
        let (mut previous_bottom, mut index) = if include_pivot {
            (self.pivot_top(), self.pivot_index)
        } else {
            (self.pivot_bottom(), self.pivot_index + 1)
        };

        while let Some(item) = self.list.get(index) {
            let height = self.heights.height(item.key());
            let segment = VerticalSegment::new(previous_bottom, height);
            if consumer(item, segment) == Decision::Stop {
                return;
            }
            previous_bottom = segment.bottom();
            index += 1;
        }
    }

    fn pivot_top(&self) -> i64 {
        self.pivot_offset
    }

    fn pivot_bottom(&self) -> i64 {
        let pivot = &self.list[self.pivot_index];
        self.pivot_offset + i64::from(self.heights.height(pivot.key()))
    }
}
