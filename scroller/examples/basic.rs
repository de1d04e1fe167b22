// Example: computing windows over a long list, then correcting them with measured heights.
use scroller::{HeightCache, Item, VerticalSegment, recalculate_rendition, seek_pivot};

fn main() {
    let list: Vec<Item<u32, String>> = (0..100_000)
        .map(|k| Item::new(k, format!("row {k}")))
        .collect();
    let mut heights = HeightCache::new(24);

    let viewport = VerticalSegment::new(0, 240);
    let first = recalculate_rendition(&[], &list, viewport, &heights);
    println!(
        "first window: {:?}",
        first.iter().map(|r| r.item.key).collect::<Vec<_>>()
    );

    // The host measured what it rendered: every third row wraps onto two lines.
    for rendered in &first {
        let height = if rendered.item.key % 3 == 0 { 48 } else { 24 };
        heights.update(rendered.item.key, height);
    }
    let corrected = recalculate_rendition(&first, &list, viewport, &heights);
    for rendered in &corrected {
        println!("  {:>6} @ {:>4}  {}", rendered.item.key, rendered.offset, rendered.item.payload);
    }

    // A scrollbar drag lands far away from everything rendered so far.
    let far = VerticalSegment::new(1_200_000, 240);
    let window = match recalculate_rendition(&corrected, &list, far, &heights) {
        window if !window.is_empty() => window,
        _ => match seek_pivot(&corrected, &list, far, &heights) {
            Some(seed) => recalculate_rendition(&[seed], &list, far, &heights),
            None => Vec::new(),
        },
    };
    println!(
        "after jump: {:?}",
        window
            .iter()
            .map(|r| (r.item.key, r.offset))
            .collect::<Vec<_>>()
    );
}
