use alloc::boxed::Box;
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

use crate::CacheKey;
use crate::key::KeyMap;

/// Scheduling tier. `Immediate` is more critical than `Lazy`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Priority {
    Immediate,
    Lazy,
}

impl Priority {
    pub const ALL: [Priority; 2] = [Priority::Immediate, Priority::Lazy];

    /// The more urgent of the two.
    pub fn most_critical(self, other: Priority) -> Priority {
        self.min(other)
    }

    const fn slot(self) -> usize {
        match self {
            Self::Immediate => 0,
            Self::Lazy => 1,
        }
    }
}

/// Whatever the host scheduler hands back for a frame request.
pub type RequestId = u64;

/// The callback a [`Scheduler`] must run once, at its next opportunity.
pub type FrameCallback = Box<dyn FnOnce()>;

/// A host primitive such as "next animation frame" or "when idle".
///
/// It may run the callback before returning. Work enqueued by such a synchronous frame is
/// requested again once the scheduler call returns.
pub type Scheduler = Box<dyn FnMut(FrameCallback) -> RequestId>;

/// Consumes one drained workload.
pub type UpdateFn<T, K> = Box<dyn Fn(Workload<T, K>) -> Delivery<T, K>>;

/// Outcome of handing a workload to the update function.
#[derive(Debug)]
pub enum Delivery<T, K> {
    Done,
    /// The consumer could not run (it is already running); the workload goes back in the queue.
    Deferred(Workload<T, K>),
}

/// One coalesced batch of work for a single priority tier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Workload<T, K> {
    priority: Priority,
    tasks: Vec<T>,
    remeasure: Vec<K>,
}

impl<T: PartialEq, K> Workload<T, K> {
    pub fn new(priority: Priority, tasks: Vec<T>, remeasure: Vec<K>) -> Self {
        Self {
            priority,
            tasks,
            remeasure,
        }
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn has(&self, task: &T) -> bool {
        self.tasks.contains(task)
    }

    pub fn tasks(&self) -> &[T] {
        &self.tasks
    }

    /// Keys flagged with [`WorkQueue::remeasure_item`] at this tier.
    pub fn remeasure_keys(&self) -> &[K] {
        &self.remeasure
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty() && self.remeasure.is_empty()
    }
}

/// Configuration for [`WorkQueue`].
pub struct WorkQueueOptions<T, K> {
    pub immediate_scheduler: Scheduler,
    pub lazy_scheduler: Scheduler,
    pub update: UpdateFn<T, K>,
}

impl<T, K> WorkQueueOptions<T, K> {
    pub fn new(
        immediate_scheduler: impl FnMut(FrameCallback) -> RequestId + 'static,
        lazy_scheduler: impl FnMut(FrameCallback) -> RequestId + 'static,
        update: impl Fn(Workload<T, K>) -> Delivery<T, K> + 'static,
    ) -> Self {
        Self {
            immediate_scheduler: Box::new(immediate_scheduler),
            lazy_scheduler: Box::new(lazy_scheduler),
            update: Box::new(update),
        }
    }
}

impl<T, K> fmt::Debug for WorkQueueOptions<T, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkQueueOptions").finish_non_exhaustive()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Request {
    Idle,
    /// The scheduler is being called right now.
    Requesting,
    Pending(RequestId),
}

struct Schedule<T, K> {
    tasks: Vec<(T, Priority)>,
    remeasure: KeyMap<K, Priority>,
    requests: [Request; 2],
    /// A request for the tier was refused because its scheduler was still running.
    refused: [bool; 2],
}

impl<T, K> Schedule<T, K>
where
    T: Copy + PartialEq,
    K: CacheKey + Clone,
{
    fn record(&mut self, task: T, priority: Priority) {
        match self.tasks.iter_mut().find(|(t, _)| *t == task) {
            Some((_, p)) => *p = p.most_critical(priority),
            None => self.tasks.push((task, priority)),
        }
    }

    fn record_remeasure(&mut self, key: K, priority: Priority) {
        self.remeasure
            .entry(key)
            .and_modify(|p| *p = p.most_critical(priority))
            .or_insert(priority);
    }

    fn has_work(&self, priority: Priority) -> bool {
        self.tasks.iter().any(|&(_, p)| p == priority)
            || self.remeasure.values().any(|&p| p == priority)
    }

    fn drain(&mut self, priority: Priority) -> Workload<T, K> {
        let mut tasks = Vec::new();
        self.tasks.retain(|&(task, p)| {
            if p == priority {
                tasks.push(task);
                false
            } else {
                true
            }
        });

        let mut remeasure = Vec::new();
        self.remeasure.retain(|key, p| {
            if *p == priority {
                remeasure.push(key.clone());
                false
            } else {
                true
            }
        });

        Workload {
            priority,
            tasks,
            remeasure,
        }
    }

    fn restore(&mut self, workload: Workload<T, K>) {
        let priority = workload.priority;
        for task in workload.tasks {
            self.record(task, priority);
        }
        for key in workload.remeasure {
            self.record_remeasure(key, priority);
        }
    }
}

struct Shared<T, K> {
    schedule: RefCell<Schedule<T, K>>,
    schedulers: [RefCell<Scheduler>; 2],
    update: UpdateFn<T, K>,
}

impl<T, K> Shared<T, K>
where
    T: Copy + PartialEq + 'static,
    K: CacheKey + Clone + 'static,
{
    fn enqueue(self: &Rc<Self>, task: T, priority: Priority) {
        self.schedule.borrow_mut().record(task, priority);
        self.request_frame(priority);
    }

    fn remeasure_item(self: &Rc<Self>, key: K, priority: Priority) {
        self.schedule.borrow_mut().record_remeasure(key, priority);
        self.request_frame(priority);
    }

    fn request_frame(self: &Rc<Self>, priority: Priority) {
        let slot = priority.slot();
        loop {
            {
                let mut schedule = self.schedule.borrow_mut();
                if schedule.requests[slot] != Request::Idle {
                    return;
                }
                schedule.requests[slot] = Request::Requesting;
            }

            let Ok(mut scheduler) = self.schedulers[slot].try_borrow_mut() else {
                // The scheduler ran our callback synchronously and the update cycle asked again.
                // The outer call requests once more when the scheduler returns.
                strace!(?priority, "WorkQueue: scheduler busy, request postponed");
                let mut schedule = self.schedule.borrow_mut();
                schedule.requests[slot] = Request::Idle;
                schedule.refused[slot] = true;
                return;
            };
            let callback = frame_callback(Rc::downgrade(self), priority);
            let id = scheduler(callback);
            drop(scheduler);

            let mut schedule = self.schedule.borrow_mut();
            let refused = core::mem::take(&mut schedule.refused[slot]);
            let state = schedule.requests[slot];
            match state {
                Request::Requesting => {
                    schedule.requests[slot] = Request::Pending(id);
                    strace!(?priority, id, "WorkQueue: frame requested");
                    return;
                }
                Request::Idle if refused && schedule.has_work(priority) => {
                    strace!(?priority, "WorkQueue: requesting again after a synchronous frame");
                }
                _ => return,
            }
        }
    }

    fn fire(self: &Rc<Self>, priority: Priority) {
        let workload = {
            let mut schedule = self.schedule.borrow_mut();
            // Cleared first: anything enqueued by the update below gets a frame of its own.
            schedule.requests[priority.slot()] = Request::Idle;
            schedule.drain(priority)
        };
        strace!(
            ?priority,
            tasks = workload.tasks.len(),
            remeasure = workload.remeasure.len(),
            "WorkQueue: frame fired"
        );

        match (self.update)(workload) {
            Delivery::Done => self.reschedule_orphans(),
            Delivery::Deferred(workload) => {
                sdebug!(?priority, "WorkQueue: update cycle busy, workload deferred");
                self.schedule.borrow_mut().restore(workload);
            }
        }
    }

    /// Requests frames for tiers that hold work but have no request in flight (left behind by a
    /// deferred delivery).
    fn reschedule_orphans(self: &Rc<Self>) {
        for priority in Priority::ALL {
            let orphaned = {
                let schedule = self.schedule.borrow();
                schedule.requests[priority.slot()] == Request::Idle && schedule.has_work(priority)
            };
            if orphaned {
                self.request_frame(priority);
            }
        }
    }
}

fn frame_callback<T, K>(shared: Weak<Shared<T, K>>, priority: Priority) -> FrameCallback
where
    T: Copy + PartialEq + 'static,
    K: CacheKey + Clone + 'static,
{
    Box::new(move || {
        if let Some(shared) = shared.upgrade() {
            shared.fire(priority);
        }
    })
}

/// A priority-coalescing work scheduler.
///
/// Any number of [`enqueue`](Self::enqueue)/[`remeasure_item`](Self::remeasure_item) calls
/// between two frames collapse into a single [`Workload`] per tier, and each tier has at most
/// one frame request in flight. A task enqueued at several tiers is kept once, at the most
/// critical one.
///
/// Single-threaded: the queue is shared through `Rc` and mutated through `&self`.
pub struct WorkQueue<T, K> {
    shared: Rc<Shared<T, K>>,
}

impl<T, K> WorkQueue<T, K>
where
    T: Copy + PartialEq + 'static,
    K: CacheKey + Clone + 'static,
{
    pub fn new(options: WorkQueueOptions<T, K>) -> Self {
        let WorkQueueOptions {
            immediate_scheduler,
            lazy_scheduler,
            update,
        } = options;
        Self {
            shared: Rc::new(Shared {
                schedule: RefCell::new(Schedule {
                    tasks: Vec::new(),
                    remeasure: KeyMap::new(),
                    requests: [Request::Idle; 2],
                    refused: [false; 2],
                }),
                schedulers: [RefCell::new(immediate_scheduler), RefCell::new(lazy_scheduler)],
                update,
            }),
        }
    }

    pub fn enqueue(&self, task: T, priority: Priority) {
        self.shared.enqueue(task, priority);
    }

    /// Flags one item for remeasurement. Keys coalesce the same way tasks do.
    pub fn remeasure_item(&self, key: K, priority: Priority) {
        self.shared.remeasure_item(key, priority);
    }

    /// Takes everything currently recorded at `priority`. Other tiers are left alone.
    pub fn dequeue(&self, priority: Priority) -> Workload<T, K> {
        self.shared.schedule.borrow_mut().drain(priority)
    }

    /// Whether a frame has been requested for `priority` and has not fired yet.
    pub fn has_pending_request(&self, priority: Priority) -> bool {
        self.shared.schedule.borrow().requests[priority.slot()] != Request::Idle
    }

    pub fn pending_request(&self, priority: Priority) -> Option<RequestId> {
        match self.shared.schedule.borrow().requests[priority.slot()] {
            Request::Pending(id) => Some(id),
            Request::Idle | Request::Requesting => None,
        }
    }

    /// The tier `task` is currently recorded at, if queued.
    pub fn priority_of(&self, task: &T) -> Option<Priority> {
        self.shared
            .schedule
            .borrow()
            .tasks
            .iter()
            .find(|(t, _)| t == task)
            .map(|&(_, p)| p)
    }

    pub fn is_empty(&self) -> bool {
        let schedule = self.shared.schedule.borrow();
        schedule.tasks.is_empty() && schedule.remeasure.is_empty()
    }

    /// A weak handle for event listeners. It never keeps the queue alive.
    pub fn handle(&self) -> WorkQueueHandle<T, K> {
        WorkQueueHandle {
            shared: Rc::downgrade(&self.shared),
        }
    }
}

impl<T: fmt::Debug, K: fmt::Debug> fmt::Debug for WorkQueue<T, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.shared.schedule.try_borrow() {
            Ok(schedule) => f
                .debug_struct("WorkQueue")
                .field("tasks", &schedule.tasks)
                .field("remeasure", &schedule.remeasure.len())
                .field("requests", &schedule.requests)
                .finish(),
            Err(_) => f.write_str("WorkQueue(<busy>)"),
        }
    }
}

/// A weak, cloneable handle to a [`WorkQueue`].
///
/// Calls made after the queue is dropped do nothing and return `false`.
pub struct WorkQueueHandle<T, K> {
    shared: Weak<Shared<T, K>>,
}

impl<T, K> WorkQueueHandle<T, K>
where
    T: Copy + PartialEq + 'static,
    K: CacheKey + Clone + 'static,
{
    pub fn enqueue(&self, task: T, priority: Priority) -> bool {
        let Some(shared) = self.shared.upgrade() else {
            return false;
        };
        shared.enqueue(task, priority);
        true
    }

    pub fn remeasure_item(&self, key: K, priority: Priority) -> bool {
        let Some(shared) = self.shared.upgrade() else {
            return false;
        };
        shared.remeasure_item(key, priority);
        true
    }

    pub fn is_alive(&self) -> bool {
        self.shared.strong_count() > 0
    }
}

impl<T, K> Clone for WorkQueueHandle<T, K> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T, K> fmt::Debug for WorkQueueHandle<T, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkQueueHandle")
            .field("alive", &(self.shared.strong_count() > 0))
            .finish()
    }
}
