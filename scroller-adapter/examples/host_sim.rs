// Example: a simulated host driving `Scroller` with fake frames, scroll events and cells.
use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::rc::Rc;

use scroller::{FrameCallback, Item, Priority, RenderedItem, VerticalSegment};
use scroller_adapter::{
    ScrollListener, Scroller, ScrollerOptions, Subscription, Viewport, ViewportId,
};

type Frames = Rc<RefCell<Vec<FrameCallback>>>;

#[derive(Clone)]
struct Window {
    top: Rc<Cell<i64>>,
    listener: Rc<RefCell<Option<ScrollListener>>>,
}

impl Window {
    fn scroll_to(&self, top: i64) {
        self.top.set(top);
        if let Some(listener) = self.listener.borrow_mut().as_mut() {
            listener();
        }
    }
}

impl Viewport for Window {
    fn id(&self) -> ViewportId {
        7
    }

    fn segment(&self) -> VerticalSegment {
        VerticalSegment::new(self.top.get(), 300)
    }

    fn listen_on_scroll(&mut self, listener: ScrollListener) -> Subscription {
        *self.listener.borrow_mut() = Some(listener);
        let slot = Rc::clone(&self.listener);
        Subscription::new(move || {
            slot.borrow_mut().take();
        })
    }
}

fn scheduler(frames: &Frames) -> impl FnMut(FrameCallback) -> u64 + 'static {
    let frames = Rc::clone(frames);
    let mut id = 0;
    move |callback| {
        frames.borrow_mut().push(callback);
        id += 1;
        id
    }
}

fn run(frames: &Frames) -> usize {
    let callbacks = std::mem::take(&mut *frames.borrow_mut());
    let n = callbacks.len();
    callbacks.into_iter().for_each(|callback| callback());
    n
}

/// "Real" heights: messages with a long body take three lines.
fn rendered_height(key: u32) -> u32 {
    if key % 7 == 0 { 90 } else { 30 }
}

fn main() {
    let immediate: Frames = Rc::default();
    let lazy: Frames = Rc::default();
    let window = Window {
        top: Rc::new(Cell::new(0)),
        listener: Rc::default(),
    };

    let scroller = Scroller::new(
        ScrollerOptions::new(40, scheduler(&immediate), scheduler(&lazy)),
        window.clone(),
        || VerticalSegment::new(0, 0),
    );
    scroller.set_on_rendition(|rendition: &[RenderedItem<Item<u32, ()>>]| {
        let keys: Vec<u32> = rendition.iter().map(|r| r.item.key).collect();
        println!("render {keys:?}");
    });
    scroller.set_list((0..10_000).map(|k| Item::new(k, ())).collect());

    let mut mounted = BTreeSet::new();
    let mut settle = |scroller: &Scroller<Item<u32, ()>>| {
        let mut cycles = 0;
        while run(&immediate) > 0 {
            cycles += 1;
            for rendered in scroller.rendition() {
                let key = rendered.item.key;
                if mounted.insert(key) {
                    scroller.mount_cell(key, move || rendered_height(key));
                }
            }
        }
        cycles
    };

    println!("settled in {} cycle(s)", settle(&scroller));

    for top in [120, 900, 40_000] {
        window.scroll_to(top);
        println!("scrolled to {top}: settled in {} cycle(s)", settle(&scroller));
    }

    // Something inside the top rendered item changed; re-measure it when the host is idle.
    if let Some(top) = scroller.rendition().first() {
        scroller.remeasure_item(top.item.key, Priority::Lazy);
        run(&lazy);
    }

    println!(
        "runway estimate: {} px, {} heights recorded",
        scroller.runway_height(),
        scroller.export_heights().len()
    );
    scroller.dispose();
}
