use crate::*;

use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};

use proptest::prelude::*;

type Row = Item<u32, ()>;

fn rows(n: u32) -> Vec<Row> {
    (0..n).map(|k| Item::new(k, ())).collect()
}

fn keys<T: Keyed>(rendition: &[RenderedItem<T>]) -> Vec<T::Key> {
    rendition.iter().map(|r| r.key().clone()).collect()
}

fn placed(key: u32, offset: i64) -> RenderedItem<Row> {
    RenderedItem {
        item: Item::new(key, ()),
        offset,
    }
}

/// Counts every height lookup made through it.
struct CountingHeights<'a> {
    inner: &'a HeightCache<u32>,
    queries: Cell<usize>,
}

impl HeightSource<u32> for CountingHeights<'_> {
    fn height(&self, key: &u32) -> u32 {
        self.queries.set(self.queries.get() + 1);
        self.inner.get(key)
    }
}

#[derive(Clone, Copy, Debug)]
struct Lcg(u64);

impl Lcg {
    fn next_u64(&mut self) -> u64 {
        // Deterministic, dependency-free PRNG for tests.
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0
    }

    fn gen_range_u32(&mut self, start: u32, end_exclusive: u32) -> u32 {
        start + (self.next_u64() % u64::from(end_exclusive - start)) as u32
    }
}

#[test]
fn touching_segments_do_not_overlap() {
    let a = VerticalSegment::new(0, 10);
    let b = VerticalSegment::new(10, 5);
    assert!(!a.overlaps_with(&b));

    let c = VerticalSegment::new(9, 5);
    assert!(a.overlaps_with(&c));
}

#[test]
fn overlap_check_is_half_open() {
    let viewport = VerticalSegment::new(100, 50);

    // Ends exactly at the viewport top: out.
    assert!(!VerticalSegment::new(90, 10).overlaps_with(&viewport));
    // Starts exactly at the viewport bottom: its own range contains the viewport's exclusive
    // end, which counts.
    assert!(VerticalSegment::new(150, 10).overlaps_with(&viewport));
    assert!(!VerticalSegment::new(151, 10).overlaps_with(&viewport));
    // Fully inside and fully covering.
    assert!(VerticalSegment::new(110, 5).overlaps_with(&viewport));
    assert!(VerticalSegment::new(0, 1000).overlaps_with(&viewport));
}

#[test]
fn zero_height_segments() {
    let empty = VerticalSegment::new(5, 0);
    assert!(!empty.contains(5));
    assert_eq!(empty.bottom(), 5);

    let around = VerticalSegment::new(0, 10);
    assert!(empty.overlaps_with(&around));
    assert!(!around.overlaps_with(&VerticalSegment::new(20, 0)));
}

#[test]
fn translate_keeps_height() {
    let s = VerticalSegment::new(40, 60).translate_by(-100);
    assert_eq!(s, VerticalSegment::new(-60, 60));
    assert_eq!(s.bottom(), 0);
    assert_ne!(s, VerticalSegment::new(-60, 61));
}

#[test]
fn height_cache_falls_back_to_default() {
    let mut cache = HeightCache::<String>::new(42);
    assert_eq!(cache.default_height(), 42);
    assert!(cache.is_empty());
    assert_eq!(cache.get(&"anything".to_string()), 42);

    cache.update("x".to_string(), 80);
    assert_eq!(cache.get(&"x".to_string()), 80);
    assert!(cache.has_record(&"x".to_string()));
    assert_eq!(cache.get(&"y".to_string()), 42);
    assert!(!cache.has_record(&"y".to_string()));

    cache.update("x".to_string(), 12);
    assert_eq!(cache.get(&"x".to_string()), 12);
    assert_eq!(cache.len(), 1);
}

#[test]
fn height_cache_export_import() {
    let mut cache = HeightCache::new(10);
    cache.update(1u32, 11);
    cache.update(2u32, 22);

    let mut exported = cache.export();
    exported.sort_unstable();
    assert_eq!(exported, vec![(1, 11), (2, 22)]);

    let mut restored = HeightCache::new(10);
    restored.update(2u32, 99);
    restored.import(exported);
    assert_eq!(restored.get(&1), 11);
    assert_eq!(restored.get(&2), 22);
    assert_eq!(restored.len(), 2);

    let mut sum = 0;
    restored.for_each(|_, h| sum += h);
    assert_eq!(sum, 33);
}

#[test]
fn layout_rejects_out_of_range_pivot() {
    let cache = HeightCache::new(10);
    let list = rows(3);
    assert!(Layout::from_pivot(&list, 3, 0, &cache).is_none());
    assert!(Layout::from_pivot(&list, 2, 0, &cache).is_some());

    let empty: Vec<Row> = Vec::new();
    assert!(Layout::from_pivot(&empty, 0, 0, &cache).is_none());
}

#[test]
fn layout_walks_outward_from_pivot() {
    let mut cache = HeightCache::new(10);
    cache.update(1u32, 30);
    cache.update(3u32, 5);
    let list = rows(5);
    let layout = Layout::from_pivot(&list, 2, 100, &cache).unwrap();
    assert_eq!(layout.pivot_index(), 2);
    assert_eq!(layout.pivot_offset(), 100);

    let mut up = Vec::new();
    layout.traverse_upwards(true, |item, segment| {
        up.push((item.key, segment));
        Decision::Continue
    });
    assert_eq!(
        up,
        vec![
            (2, VerticalSegment::new(100, 10)),
            (1, VerticalSegment::new(70, 30)),
            (0, VerticalSegment::new(60, 10)),
        ]
    );

    let mut down = Vec::new();
    layout.traverse_downwards(false, |item, segment| {
        down.push((item.key, segment));
        Decision::Continue
    });
    assert_eq!(
        down,
        vec![
            (3, VerticalSegment::new(110, 5)),
            (4, VerticalSegment::new(115, 10)),
        ]
    );

    let mut up_excluding = Vec::new();
    layout.traverse_upwards(false, |item, segment| {
        up_excluding.push((item.key, segment));
        Decision::Continue
    });
    assert_eq!(up_excluding[0], (1, VerticalSegment::new(70, 30)));
    assert_eq!(up_excluding.len(), 2);
}

#[test]
fn layout_stops_when_consumer_says_so() {
    let cache = HeightCache::new(10);
    let list = rows(100);
    let layout = Layout::from_pivot(&list, 50, 0, &cache).unwrap();

    let mut visited = 0;
    layout.traverse_downwards(true, |_, _| {
        visited += 1;
        if visited == 3 {
            Decision::Stop
        } else {
            Decision::Continue
        }
    });
    assert_eq!(visited, 3);

    let mut first_only = Vec::new();
    layout.traverse_upwards(true, |item, _| {
        first_only.push(item.key);
        Decision::Stop
    });
    assert_eq!(first_only, vec![50]);
}

#[test]
fn empty_list_has_empty_rendition() {
    let cache = HeightCache::<u32>::new(10);
    let previous = vec![placed(1, 0)];
    let out = recalculate_rendition(&previous, &[] as &[Row], VerticalSegment::new(0, 100), &cache);
    assert!(out.is_empty());
}

#[test]
fn first_rendition_starts_at_list_start() {
    let cache = HeightCache::new(100);
    let list = rows(50);
    let out = recalculate_rendition(&[], &list, VerticalSegment::new(0, 250), &cache);
    assert_eq!(keys(&out), vec![0, 1, 2]);
    assert_eq!(
        out.iter().map(|r| r.offset).collect::<Vec<_>>(),
        vec![0, 100, 200]
    );
}

#[test]
fn rendition_is_ordered_top_to_bottom() {
    let cache = HeightCache::new(10);
    let list = rows(100);
    // The pivot sits in the middle of the viewport, so items come from both directions.
    let previous = vec![placed(50, 500)];
    let out = recalculate_rendition(&previous, &list, VerticalSegment::new(470, 60), &cache);
    assert_eq!(keys(&out), (47..=53).collect::<Vec<_>>());
    assert!(out.windows(2).all(|w| w[0].offset < w[1].offset));
}

#[test]
fn pivot_is_closest_to_viewport_top() {
    let previous = vec![placed(1, 0), placed(2, 90), placed(3, 110), placed(4, 200)];
    let viewport = VerticalSegment::new(100, 50);
    assert_eq!(find_pivot(&previous, viewport).map(|r| r.item.key), Some(2));

    assert!(find_pivot::<Row>(&[], viewport).is_none());
}

#[test]
fn missing_pivot_keeps_previous_rendition() {
    let cache = HeightCache::new(10);
    let list = rows(10);
    let previous = vec![placed(999, 0), placed(1000, 10)];
    let out = recalculate_rendition(&previous, &list, VerticalSegment::new(0, 20), &cache);
    assert_eq!(out, previous);
}

#[test]
fn pivot_far_from_viewport_yields_empty_window() {
    let cache = HeightCache::new(10);
    let list = rows(1000);
    let out = recalculate_rendition(&[], &list, VerticalSegment::new(5000, 100), &cache);
    assert!(out.is_empty());
}

#[test]
fn pivot_follows_list_mutations_by_key() {
    let cache = HeightCache::new(10);
    let mut list = rows(100);
    let previous = vec![placed(40, 400), placed(41, 410)];

    // Insert two rows above the pivot: it keeps its offset, its index moves.
    list.insert(0, Item::new(1000, ()));
    list.insert(0, Item::new(1001, ()));
    let out = recalculate_rendition(&previous, &list, VerticalSegment::new(400, 20), &cache);
    assert_eq!(keys(&out), vec![40, 41, 42]);
    assert_eq!(out[0].offset, 400);
}

#[test]
fn seek_finds_the_viewport_after_a_long_jump() {
    let mut cache = HeightCache::new(10);
    cache.update(30, 50);
    let list = rows(100);
    let previous = vec![placed(2, 20), placed(3, 30)];

    // Rows 0..30 are 10px, row 30 is 50px, so row 40 starts at 440.
    let viewport = VerticalSegment::new(445, 30);
    assert!(recalculate_rendition(&previous, &list, viewport, &cache).is_empty());

    let seed = seek_pivot(&previous, &list, viewport, &cache).unwrap();
    assert_eq!(seed, placed(40, 440));
    let out = recalculate_rendition(&[seed], &list, viewport, &cache);
    assert_eq!(keys(&out), vec![40, 41, 42, 43]);

    // Upwards too.
    let back = seek_pivot(&out, &list, VerticalSegment::new(55, 10), &cache).unwrap();
    assert_eq!(back, placed(6, 60));
}

#[test]
fn seek_gives_up_outside_the_list() {
    let cache = HeightCache::new(10);
    let list = rows(10);
    assert!(seek_pivot(&[], &list, VerticalSegment::new(500, 50), &cache).is_none());
    assert!(seek_pivot(&[], &list, VerticalSegment::new(-100, 50), &cache).is_none());
    assert!(seek_pivot(&[], &[] as &[Row], VerticalSegment::new(0, 50), &cache).is_none());
}

#[test]
fn recalculation_is_idempotent() {
    let mut cache = HeightCache::new(30);
    let mut rng = Lcg(7);
    for k in 0..200u32 {
        if rng.next_u64() % 3 == 0 {
            cache.update(k, rng.gen_range_u32(5, 90));
        }
    }
    let list = rows(200);
    let viewport = VerticalSegment::new(1234, 400);
    let seed = vec![placed(40, 1234)];

    let a = recalculate_rendition(&seed, &list, viewport, &cache);
    let b = recalculate_rendition(&seed, &list, viewport, &cache);
    assert_eq!(a, b);
    assert!(!a.is_empty());
}

#[test]
fn measured_tall_item_shrinks_the_window() {
    // 1000 rows of 100px; row 500 is really 400px but unmeasured at first.
    let mut cache = HeightCache::new(100);
    let list = rows(1000);
    let viewport = VerticalSegment::new(50_000, 500);
    let seed = vec![placed(500, 50_000)];

    let before = recalculate_rendition(&seed, &list, viewport, &cache);
    assert_eq!(keys(&before), (500..=505).collect::<Vec<_>>());

    cache.update(500, 400);
    let after = recalculate_rendition(&before, &list, viewport, &cache);
    assert_eq!(after[0].key(), &500);
    // Row 501 fills the remaining 100px; row 502 touches the bottom edge.
    assert_eq!(after[1], placed(501, 50_400));
    assert_eq!(keys(&after), vec![500, 501, 502]);
}

#[test]
fn randomized_windows_cover_the_viewport() {
    let mut rng = Lcg(42);
    for _ in 0..200 {
        let n = rng.gen_range_u32(1, 300);
        let mut cache = HeightCache::new(rng.gen_range_u32(1, 60));
        let mut tops = Vec::with_capacity(n as usize);
        let mut y = 0i64;
        for k in 0..n {
            if rng.next_u64() % 2 == 0 {
                cache.update(k, rng.gen_range_u32(1, 120));
            }
            tops.push(y);
            y += i64::from(cache.get(&k));
        }
        let total = y;
        let list = rows(n);
        let pivot = rng.gen_range_u32(0, n);
        let viewport = VerticalSegment::new(
            tops[pivot as usize],
            rng.gen_range_u32(1, 500),
        );

        let out = recalculate_rendition(
            &[placed(pivot, tops[pivot as usize])],
            &list,
            viewport,
            &cache,
        );

        // Exactly the rows whose true segment overlaps the viewport.
        let expected: Vec<u32> = (0..n)
            .filter(|&k| {
                VerticalSegment::new(tops[k as usize], cache.get(&k)).overlaps_with(&viewport)
            })
            .collect();
        assert_eq!(keys(&out), expected, "n={n} total={total} viewport={viewport:?}");
        for r in &out {
            assert_eq!(r.offset, tops[r.item.key as usize]);
        }
    }
}

proptest! {
    #[test]
    fn layout_never_accepts_pivot_at_or_past_len(len in 0usize..64, extra in 0usize..64) {
        let cache = HeightCache::new(10);
        let list = rows(len as u32);
        prop_assert!(Layout::from_pivot(&list, len + extra, 0, &cache).is_none());
    }

    #[test]
    fn recalculation_cost_is_bounded_by_window(
        n in 1u32..5_000,
        h in 1u32..200,
        v in 1u32..2_000,
        top_fraction in 0.0f64..1.0,
    ) {
        let cache = HeightCache::new(h);
        let list = rows(n);
        let total = i64::from(n) * i64::from(h);
        let top = ((total as f64) * top_fraction) as i64;
        let pivot = ((top / i64::from(h)) as u32).min(n - 1);
        let seed = vec![placed(pivot, i64::from(pivot) * i64::from(h))];

        let heights = CountingHeights { inner: &cache, queries: Cell::new(0) };
        let out = recalculate_rendition(&seed, &list, VerticalSegment::new(top, v), &heights);

        let bound = v.div_ceil(h) as usize + 4;
        prop_assert!(heights.queries.get() <= bound, "queries={} bound={}", heights.queries.get(), bound);
        prop_assert!(out.len() <= bound);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Job {
    Measure,
    Recalculate,
}

/// A frame source that only runs callbacks when the test says so.
#[derive(Clone, Default)]
struct Frames {
    pending: Rc<RefCell<Vec<FrameCallback>>>,
    requested: Rc<Cell<u64>>,
}

impl Frames {
    fn scheduler(&self) -> impl FnMut(FrameCallback) -> RequestId + 'static {
        let frames = self.clone();
        move |callback| {
            frames.pending.borrow_mut().push(callback);
            let id = frames.requested.get() + 1;
            frames.requested.set(id);
            id
        }
    }

    fn pending(&self) -> usize {
        self.pending.borrow().len()
    }

    fn run(&self) {
        let callbacks = core::mem::take(&mut *self.pending.borrow_mut());
        for callback in callbacks {
            callback();
        }
    }
}

type Delivered = Rc<RefCell<Vec<Workload<Job, u32>>>>;

fn recording_queue() -> (WorkQueue<Job, u32>, Frames, Frames, Delivered) {
    let immediate = Frames::default();
    let lazy = Frames::default();
    let delivered: Delivered = Rc::default();
    let sink = Rc::clone(&delivered);
    let queue = WorkQueue::new(WorkQueueOptions::new(
        immediate.scheduler(),
        lazy.scheduler(),
        move |workload| {
            sink.borrow_mut().push(workload);
            Delivery::Done
        },
    ));
    (queue, immediate, lazy, delivered)
}

#[test]
fn repeated_enqueue_is_coalesced_and_upgraded() {
    let (queue, immediate, lazy, delivered) = recording_queue();

    queue.enqueue(Job::Measure, Priority::Lazy);
    queue.enqueue(Job::Measure, Priority::Immediate);
    queue.enqueue(Job::Measure, Priority::Immediate);
    queue.enqueue(Job::Measure, Priority::Lazy);

    assert_eq!(immediate.pending(), 1);
    assert_eq!(lazy.pending(), 1);
    assert_eq!(queue.priority_of(&Job::Measure), Some(Priority::Immediate));

    immediate.run();
    {
        let delivered = delivered.borrow();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].priority(), Priority::Immediate);
        assert_eq!(delivered[0].tasks(), &[Job::Measure]);
    }

    // The lazy frame still fires, but has nothing left to do.
    lazy.run();
    assert!(delivered.borrow()[1].is_empty());
    assert!(queue.is_empty());
}

#[test]
fn enqueue_after_drain_starts_a_new_cycle() {
    let (queue, immediate, _lazy, delivered) = recording_queue();

    queue.enqueue(Job::Recalculate, Priority::Immediate);
    assert!(queue.has_pending_request(Priority::Immediate));
    assert_eq!(queue.pending_request(Priority::Immediate), Some(1));
    immediate.run();
    assert!(!queue.has_pending_request(Priority::Immediate));

    queue.enqueue(Job::Recalculate, Priority::Immediate);
    assert_eq!(immediate.pending(), 1);
    assert_eq!(queue.pending_request(Priority::Immediate), Some(2));
    immediate.run();

    let delivered = delivered.borrow();
    assert_eq!(delivered.len(), 2);
    assert!(delivered.iter().all(|w| w.has(&Job::Recalculate)));
}

#[test]
fn dequeue_leaves_other_tiers_alone() {
    let (queue, _immediate, _lazy, _delivered) = recording_queue();
    queue.enqueue(Job::Measure, Priority::Lazy);
    queue.enqueue(Job::Recalculate, Priority::Immediate);
    queue.remeasure_item(7, Priority::Lazy);
    queue.remeasure_item(8, Priority::Immediate);
    queue.remeasure_item(8, Priority::Lazy);

    let now = queue.dequeue(Priority::Immediate);
    assert_eq!(now.tasks(), &[Job::Recalculate]);
    assert_eq!(now.remeasure_keys(), &[8]);

    let later = queue.dequeue(Priority::Lazy);
    assert_eq!(later.tasks(), &[Job::Measure]);
    assert_eq!(later.remeasure_keys(), &[7]);
    assert!(queue.is_empty());
}

#[test]
fn remeasure_requests_share_the_frame() {
    let (queue, immediate, _lazy, delivered) = recording_queue();
    for key in [3, 1, 2, 3, 1] {
        queue.remeasure_item(key, Priority::Immediate);
    }
    queue.enqueue(Job::Measure, Priority::Immediate);
    assert_eq!(immediate.pending(), 1);

    immediate.run();
    let delivered = delivered.borrow();
    let mut keys = delivered[0].remeasure_keys().to_vec();
    keys.sort_unstable();
    assert_eq!(keys, vec![1, 2, 3]);
    assert!(delivered[0].has(&Job::Measure));
}

#[test]
fn work_enqueued_during_update_gets_its_own_frame() {
    let immediate = Frames::default();
    let lazy = Frames::default();
    let handle: Rc<RefCell<Option<WorkQueueHandle<Job, u32>>>> = Rc::default();
    let delivered: Delivered = Rc::default();

    let queue = WorkQueue::new(WorkQueueOptions::new(immediate.scheduler(), lazy.scheduler(), {
        let handle = Rc::clone(&handle);
        let delivered = Rc::clone(&delivered);
        move |workload: Workload<Job, u32>| {
            if workload.has(&Job::Recalculate) {
                if let Some(handle) = handle.borrow().as_ref() {
                    handle.enqueue(Job::Measure, Priority::Immediate);
                }
            }
            delivered.borrow_mut().push(workload);
            Delivery::Done
        }
    }));
    *handle.borrow_mut() = Some(queue.handle());

    queue.enqueue(Job::Recalculate, Priority::Immediate);
    immediate.run();
    assert_eq!(delivered.borrow().len(), 1);
    assert_eq!(delivered.borrow()[0].tasks(), &[Job::Recalculate]);
    assert_eq!(immediate.pending(), 1);

    immediate.run();
    assert_eq!(delivered.borrow()[1].tasks(), &[Job::Measure]);
    assert_eq!(immediate.pending(), 0);
}

#[test]
fn deferred_workload_is_not_lost() {
    let immediate = Frames::default();
    let queue = WorkQueue::new(WorkQueueOptions::new(
        immediate.scheduler(),
        Frames::default().scheduler(),
        |workload: Workload<Job, u32>| Delivery::Deferred(workload),
    ));

    queue.enqueue(Job::Recalculate, Priority::Immediate);
    queue.remeasure_item(4, Priority::Immediate);
    immediate.run();

    assert_eq!(queue.priority_of(&Job::Recalculate), Some(Priority::Immediate));
    let restored = queue.dequeue(Priority::Immediate);
    assert_eq!(restored.remeasure_keys(), &[4]);
}

#[test]
fn synchronous_scheduler_does_not_wedge_the_queue() {
    let delivered: Delivered = Rc::default();
    let queue = WorkQueue::new(WorkQueueOptions::new(
        |callback: FrameCallback| {
            callback();
            0
        },
        Frames::default().scheduler(),
        {
            let delivered = Rc::clone(&delivered);
            move |workload| {
                delivered.borrow_mut().push(workload);
                Delivery::Done
            }
        },
    ));

    queue.enqueue(Job::Measure, Priority::Immediate);
    queue.enqueue(Job::Recalculate, Priority::Immediate);
    assert!(!queue.has_pending_request(Priority::Immediate));
    assert!(queue.is_empty());
    assert_eq!(delivered.borrow().len(), 2);
}

#[test]
fn work_enqueued_by_a_synchronous_frame_is_delivered() {
    let delivered: Delivered = Rc::default();
    let handle: Rc<RefCell<Option<WorkQueueHandle<Job, u32>>>> = Rc::default();
    let queue = WorkQueue::new(WorkQueueOptions::new(
        |callback: FrameCallback| {
            callback();
            0
        },
        Frames::default().scheduler(),
        {
            let delivered = Rc::clone(&delivered);
            let handle = Rc::clone(&handle);
            move |workload: Workload<Job, u32>| {
                let follow_up = workload.has(&Job::Recalculate);
                delivered.borrow_mut().push(workload);
                if follow_up {
                    if let Some(handle) = handle.borrow().as_ref() {
                        assert!(handle.enqueue(Job::Measure, Priority::Immediate));
                        assert!(handle.remeasure_item(9, Priority::Immediate));
                    }
                }
                Delivery::Done
            }
        },
    ));
    *handle.borrow_mut() = Some(queue.handle());

    queue.enqueue(Job::Recalculate, Priority::Immediate);

    let delivered = delivered.borrow();
    assert_eq!(delivered.len(), 2);
    assert_eq!(delivered[0].tasks(), &[Job::Recalculate]);
    assert_eq!(delivered[1].tasks(), &[Job::Measure]);
    assert_eq!(delivered[1].remeasure_keys(), &[9]);
    assert!(!queue.has_pending_request(Priority::Immediate));
    assert_eq!(queue.priority_of(&Job::Measure), None);
    assert!(queue.is_empty());
}

#[test]
fn frames_firing_after_drop_do_nothing() {
    let (queue, immediate, _lazy, delivered) = recording_queue();
    let handle = queue.handle();
    queue.enqueue(Job::Measure, Priority::Immediate);
    drop(queue);

    immediate.run();
    assert!(delivered.borrow().is_empty());
    assert!(!handle.is_alive());
    assert!(!handle.enqueue(Job::Measure, Priority::Immediate));
    assert!(!handle.remeasure_item(1, Priority::Lazy));
}

#[test]
fn priority_ordering() {
    assert_eq!(
        Priority::Lazy.most_critical(Priority::Immediate),
        Priority::Immediate
    );
    assert_eq!(Priority::Lazy.most_critical(Priority::Lazy), Priority::Lazy);
    assert!(Priority::Immediate < Priority::Lazy);
}
