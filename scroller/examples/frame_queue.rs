// Example: a coalescing work queue driven by a hand-rolled frame loop.
use std::cell::RefCell;
use std::rc::Rc;

use scroller::{Delivery, FrameCallback, Priority, WorkQueue, WorkQueueOptions, Workload};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Job {
    Layout,
    Paint,
}

fn main() {
    let frames: Rc<RefCell<Vec<FrameCallback>>> = Rc::default();
    let idle: Rc<RefCell<Vec<FrameCallback>>> = Rc::default();

    let next_frame = {
        let frames = Rc::clone(&frames);
        let mut id = 0;
        move |callback| {
            frames.borrow_mut().push(callback);
            id += 1;
            id
        }
    };
    let when_idle = {
        let idle = Rc::clone(&idle);
        let mut id = 0;
        move |callback| {
            idle.borrow_mut().push(callback);
            id += 1;
            id
        }
    };

    let queue = WorkQueue::new(WorkQueueOptions::new(
        next_frame,
        when_idle,
        |workload: Workload<Job, &'static str>| {
            println!(
                "{:?} cycle: tasks={:?} remeasure={:?}",
                workload.priority(),
                workload.tasks(),
                workload.remeasure_keys()
            );
            Delivery::Done
        },
    ));

    // A burst of events between two frames.
    queue.enqueue(Job::Paint, Priority::Lazy);
    queue.enqueue(Job::Layout, Priority::Immediate);
    queue.enqueue(Job::Layout, Priority::Immediate);
    queue.remeasure_item("header", Priority::Lazy);
    queue.remeasure_item("header", Priority::Immediate);
    println!("queue before frames: {queue:?}");

    for round in 0..2 {
        let callbacks = std::mem::take(&mut *frames.borrow_mut());
        let idle_callbacks = std::mem::take(&mut *idle.borrow_mut());
        println!("round {round}: {} frame(s), {} idle", callbacks.len(), idle_callbacks.len());
        callbacks.into_iter().for_each(|callback| callback());
        idle_callbacks.into_iter().for_each(|callback| callback());
    }
}
