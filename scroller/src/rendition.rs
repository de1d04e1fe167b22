use alloc::vec::Vec;

use crate::{Decision, HeightSource, Keyed, Layout, RenderedItem, VerticalSegment};

/// Picks the previously rendered item whose offset is closest to `viewport.top()`.
///
/// Ties go to the first one in rendition order.
pub fn find_pivot<'r, T>(
    rendition: &'r [RenderedItem<T>],
    viewport: VerticalSegment,
) -> Option<&'r RenderedItem<T>> {
    let mut best: Option<(&RenderedItem<T>, u64)> = None;
    for rendered in rendition {
        let distance = rendered.offset.abs_diff(viewport.top());
        match best {
            Some((_, d)) if d <= distance => {}
            _ => best = Some((rendered, distance)),
        }
    }
    best.map(|(rendered, _)| rendered)
}

/// Computes the window of `list` that overlaps `viewport` (runway coordinates).
///
/// The layout grows outwards from the pivot picked out of `current`, so only the items near the
/// viewport are ever visited. When the pivot no longer exists in `list`, `current` is returned
/// unchanged.
pub fn recalculate_rendition<T, H>(
    current: &[RenderedItem<T>],
    list: &[T],
    viewport: VerticalSegment,
    heights: &H,
) -> Vec<RenderedItem<T>>
where
    T: Keyed + Clone,
    H: HeightSource<T::Key>,
{
    let Some(first) = list.first() else {
        return Vec::new();
    };

    let (pivot_key, pivot_offset) = match find_pivot(current, viewport) {
        Some(pivot) => (pivot.key(), pivot.offset),
        None => (first.key(), 0),
    };

    let pivot_index = list
        .iter()
        .position(|item| item.key() == pivot_key)
        .unwrap_or(list.len());

    let Some(layout) = Layout::from_pivot(list, pivot_index, pivot_offset, heights) else {
        sdebug!(pivot_offset, "recalculate_rendition: pivot is gone, keeping rendition");
        return current.to_vec();
    };

    let mut above = Vec::new();
    layout.traverse_upwards(false, |item, segment| {
        collect_overlapping(&mut above, viewport, item, segment)
    });

    let mut below = Vec::new();
    layout.traverse_downwards(true, |item, segment| {
        collect_overlapping(&mut below, viewport, item, segment)
    });

    strace!(
        pivot_index,
        pivot_offset,
        above = above.len(),
        below = below.len(),
        "recalculate_rendition"
    );

    above.reverse();
    above.append(&mut below);
    above
}

/// Finds an item overlapping `viewport` by walking from the pivot towards it.
///
/// [`recalculate_rendition`] comes back empty when the viewport moved further than a window
/// away from every previously rendered item. This walk costs one height lookup per item between
/// the old pivot and the viewport, and the result seeds the next recalculation. Returns `None`
/// when the viewport lies outside the list.
pub fn seek_pivot<T, H>(
    current: &[RenderedItem<T>],
    list: &[T],
    viewport: VerticalSegment,
    heights: &H,
) -> Option<RenderedItem<T>>
where
    T: Keyed + Clone,
    H: HeightSource<T::Key>,
{
    let (pivot_key, pivot_offset) = match find_pivot(current, viewport) {
        Some(pivot) => (pivot.key(), pivot.offset),
        None => (list.first()?.key(), 0),
    };
    let pivot_index = list.iter().position(|item| item.key() == pivot_key)?;
    let layout = Layout::from_pivot(list, pivot_index, pivot_offset, heights)?;

    let mut found = None;
    let mut seek = |item: &T, segment: VerticalSegment| {
        if !segment.overlaps_with(&viewport) {
            return Decision::Continue;
        }
        found = Some(RenderedItem {
            item: item.clone(),
            offset: segment.top(),
        });
        Decision::Stop
    };
    if viewport.top() < pivot_offset {
        layout.traverse_upwards(true, &mut seek);
    } else {
        layout.traverse_downwards(true, &mut seek);
    }

    sdebug!(pivot_index, pivot_offset, found = found.is_some(), "seek_pivot");
    found
}

fn collect_overlapping<T: Clone>(
    out: &mut Vec<RenderedItem<T>>,
    viewport: VerticalSegment,
    item: &T,
    segment: VerticalSegment,
) -> Decision {
    if !segment.overlaps_with(&viewport) {
        return Decision::Stop;
    }
    out.push(RenderedItem {
        item: item.clone(),
        offset: segment.top(),
    });
    Decision::Continue
}
