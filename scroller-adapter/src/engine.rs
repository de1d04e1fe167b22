use alloc::boxed::Box;
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;

use scroller::{
    Delivery, FrameCallback, Keyed, Priority, RenderedItem, RequestId, Scheduler, WorkQueue,
    WorkQueueHandle, WorkQueueOptions, Workload,
};

use crate::{
    Controller, GeometryState, MeasureHeight, Runway, Subscription, Task, Viewport,
    ViewportMismatch,
};

/// Receives every new rendition that differs from the previous one.
pub type RenditionCallback<T> = Box<dyn FnMut(&[RenderedItem<T>])>;

/// Configuration for [`Scroller`].
pub struct ScrollerOptions {
    /// Height assumed for items that were never measured.
    pub default_height: u32,
    /// Runs callbacks at the next frame (e.g. `requestAnimationFrame`).
    pub immediate_scheduler: Scheduler,
    /// Runs callbacks when the host is idle.
    pub lazy_scheduler: Scheduler,
}

impl ScrollerOptions {
    pub fn new(
        default_height: u32,
        immediate_scheduler: impl FnMut(FrameCallback) -> RequestId + 'static,
        lazy_scheduler: impl FnMut(FrameCallback) -> RequestId + 'static,
    ) -> Self {
        Self {
            default_height,
            immediate_scheduler: Box::new(immediate_scheduler),
            lazy_scheduler: Box::new(lazy_scheduler),
        }
    }

    pub fn with_default_height(mut self, default_height: u32) -> Self {
        self.default_height = default_height;
        self
    }
}

impl fmt::Debug for ScrollerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScrollerOptions")
            .field("default_height", &self.default_height)
            .finish_non_exhaustive()
    }
}

struct Inner<T: Keyed> {
    queue: WorkQueue<Task, T::Key>,
    controller: RefCell<Controller<T>>,
    on_rendition: RefCell<Option<RenditionCallback<T>>>,
    /// The rendition changed while the callback was running.
    renotify: Cell<bool>,
    subscription: RefCell<Subscription>,
    disposed: Cell<bool>,
}

impl<T> Inner<T>
where
    T: Keyed + Clone + 'static,
    T::Key: 'static,
{
    fn run(&self, workload: Workload<Task, T::Key>) -> Delivery<Task, T::Key> {
        if self.disposed.get() {
            strace!("Scroller: frame after dispose ignored");
            return Delivery::Done;
        }

        let Ok(mut controller) = self.controller.try_borrow_mut() else {
            return Delivery::Deferred(workload);
        };
        let report = controller.update(&workload);
        let rendition = report
            .rendition_changed
            .then(|| controller.rendition().to_vec());
        drop(controller);

        if report.needs_measurement {
            self.queue.enqueue(Task::MeasureNewItems, Priority::Immediate);
        }
        if let Some(rendition) = rendition {
            self.notify(&rendition);
        }
        Delivery::Done
    }

    fn notify(&self, rendition: &[RenderedItem<T>]) {
        let Ok(mut on_rendition) = self.on_rendition.try_borrow_mut() else {
            // The running callback gets the latest rendition once it returns.
            strace!("Scroller: rendition changed inside the callback");
            self.renotify.set(true);
            return;
        };
        let Some(callback) = on_rendition.as_mut() else {
            return;
        };
        callback(rendition);

        while self.renotify.replace(false) {
            let Ok(controller) = self.controller.try_borrow() else {
                swarn!("Scroller: update cycle busy, rendition notification postponed");
                self.renotify.set(true);
                break;
            };
            let latest = controller.rendition().to_vec();
            drop(controller);
            callback(&latest);
        }
    }
}

/// A virtualized list engine wired to its host.
///
/// The host provides the viewport, the runway, one measurement adapter per mounted item, and two
/// frame schedulers. It feeds the list and the "item changed size" notifications in, and gets
/// renditions back through [`Scroller::set_on_rendition`]. Scroll events are picked up from the
/// viewport subscription taken at construction.
///
/// None of the methods may be called from inside a [`MeasureHeight`], [`Runway`] or
/// [`Viewport`] implementation. Calling them from the rendition callback is fine.
pub struct Scroller<T: Keyed> {
    inner: Rc<Inner<T>>,
}

impl<T> Scroller<T>
where
    T: Keyed + Clone + 'static,
    T::Key: 'static,
{
    pub fn new(
        options: ScrollerOptions,
        viewport: impl Viewport + 'static,
        runway: impl Runway + 'static,
    ) -> Self {
        let ScrollerOptions {
            default_height,
            immediate_scheduler,
            lazy_scheduler,
        } = options;

        let inner = Rc::new_cyclic(|weak: &Weak<Inner<T>>| {
            let weak = weak.clone();
            let queue = WorkQueue::new(WorkQueueOptions {
                immediate_scheduler,
                lazy_scheduler,
                update: Box::new(move |workload: Workload<Task, T::Key>| match weak.upgrade() {
                    Some(inner) => inner.run(workload),
                    None => Delivery::Done,
                }),
            });
            Inner {
                queue,
                controller: RefCell::new(Controller::new(
                    default_height,
                    Box::new(viewport),
                    Box::new(runway),
                )),
                on_rendition: RefCell::new(None),
                renotify: Cell::new(false),
                subscription: RefCell::new(Subscription::detached()),
                disposed: Cell::new(false),
            }
        });

        let handle = inner.queue.handle();
        let subscription = inner
            .controller
            .borrow_mut()
            .viewport_mut()
            .listen_on_scroll(Box::new(move || {
                handle.enqueue(Task::SampleScrollOffset, Priority::Immediate);
            }));
        *inner.subscription.borrow_mut() = subscription;

        Self { inner }
    }

    /// Replaces the list for the next render pass.
    pub fn set_list(&self, list: Vec<T>) {
        self.inner.controller.borrow_mut().set_list(list);
        self.enqueue(Task::RecalculateRendition, Priority::Immediate);
    }

    pub fn set_on_rendition(&self, callback: impl FnMut(&[RenderedItem<T>]) + 'static) {
        *self.inner.on_rendition.borrow_mut() = Some(Box::new(callback));
    }

    /// Registers the measurement adapter of a freshly rendered item.
    ///
    /// Items without a height record get measured in the next immediate cycle.
    pub fn mount_cell(&self, key: T::Key, cell: impl MeasureHeight + 'static) {
        let unmeasured = {
            let mut controller = self.inner.controller.borrow_mut();
            let unmeasured = !controller.heights().has_record(&key);
            controller.mount_cell(key, Box::new(cell));
            unmeasured
        };
        if unmeasured {
            self.enqueue(Task::MeasureNewItems, Priority::Immediate);
        }
    }

    pub fn unmount_cell(&self, key: &T::Key) -> bool {
        self.inner.controller.borrow_mut().unmount_cell(key)
    }

    /// The host noticed that an item's layout changed.
    pub fn remeasure_item(&self, key: T::Key, priority: Priority) {
        if self.is_disposed() {
            return;
        }
        self.inner.queue.remeasure_item(key, priority);
    }

    /// The viewport changed size.
    pub fn notify_resize(&self) {
        self.enqueue(Task::SampleViewportSize, Priority::Immediate);
    }

    pub fn request_recalculation(&self, priority: Priority) {
        self.enqueue(Task::RecalculateRendition, priority);
    }

    pub fn request_normalize(&self, priority: Priority) {
        self.enqueue(Task::Normalize, priority);
    }

    /// A weak queue handle for host event sources (e.g. layout observers).
    pub fn handle(&self) -> WorkQueueHandle<Task, T::Key> {
        self.inner.queue.handle()
    }

    pub fn rendition(&self) -> Vec<RenderedItem<T>> {
        self.inner.controller.borrow().rendition().to_vec()
    }

    pub fn geometry(&self) -> GeometryState {
        self.inner.controller.borrow().geometry()
    }

    pub fn height_of(&self, key: &T::Key) -> u32 {
        self.inner.controller.borrow().heights().get(key)
    }

    pub fn has_height(&self, key: &T::Key) -> bool {
        self.inner.controller.borrow().heights().has_record(key)
    }

    /// Exports recorded heights (useful for persistence).
    pub fn export_heights(&self) -> Vec<(T::Key, u32)> {
        self.inner.controller.borrow().heights().export()
    }

    /// Restores previously exported heights and recalculates.
    pub fn import_heights(&self, entries: impl IntoIterator<Item = (T::Key, u32)>) {
        self.inner.controller.borrow_mut().import_heights(entries);
        self.enqueue(Task::RecalculateRendition, Priority::Immediate);
    }

    /// See [`Controller::runway_height`].
    pub fn runway_height(&self) -> u64 {
        self.inner.controller.borrow().runway_height()
    }

    /// Swapping the viewport after construction is not supported.
    ///
    /// Offering the same viewport (same id) is accepted and changes nothing. Any other viewport
    /// is rejected and the scroller keeps using the one it was created with.
    pub fn replace_viewport(&self, viewport: impl Viewport) -> Result<(), ViewportMismatch> {
        let bound = self.inner.controller.borrow().viewport_id();
        let offered = viewport.id();
        if offered == bound {
            return Ok(());
        }
        swarn!(bound, offered, "Scroller: viewport swap rejected");
        Err(ViewportMismatch { bound, offered })
    }

    /// Stops listening for scroll events. Frames already requested still fire, into a no-op.
    pub fn dispose(&self) {
        if self.inner.disposed.replace(true) {
            return;
        }
        sdebug!("Scroller::dispose");
        self.inner.subscription.borrow_mut().stop();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    fn enqueue(&self, task: Task, priority: Priority) {
        if self.is_disposed() {
            return;
        }
        self.inner.queue.enqueue(task, priority);
    }
}

impl<T: Keyed> Drop for Scroller<T> {
    fn drop(&mut self) {
        self.inner.disposed.set(true);
        if let Ok(mut subscription) = self.inner.subscription.try_borrow_mut() {
            subscription.stop();
        }
    }
}

impl<T: Keyed> fmt::Debug for Scroller<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scroller")
            .field("disposed", &self.inner.disposed.get())
            .finish_non_exhaustive()
    }
}
