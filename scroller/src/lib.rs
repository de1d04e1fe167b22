//! An incremental windowing engine for long, variable-height lists.
//!
//! For the update cycle, adapter traits and the ready-to-use engine, see the `scroller-adapter`
//! crate.
//!
//! This crate holds the parts that do not touch any UI:
//! - [`VerticalSegment`]: half-open vertical intervals
//! - [`HeightCache`]: last known item heights with a default for unmeasured items
//! - [`Layout`]: item positions computed outwards from an anchor item
//! - [`recalculate_rendition`]: the visible window, grown from the item closest to the viewport
//! - [`WorkQueue`]: a two-tier, coalescing scheduler for the work that keeps the window correct
//!
//! Heights are unknown until measured, so positions are never computed for the whole list. Each
//! recalculation starts from an item of the previous window and only visits items that overlap
//! the viewport, which keeps its cost proportional to the window, not to the list.
#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

#[cfg(test)]
extern crate std;

#[macro_use]
mod macros;

mod height_cache;
mod key;
mod layout;
mod rendition;
mod segment;
mod types;
mod work_queue;

#[cfg(test)]
mod tests;

pub use height_cache::{HeightCache, HeightSource};
pub use key::CacheKey;
pub use layout::{Decision, Layout};
pub use rendition::{find_pivot, recalculate_rendition, seek_pivot};
pub use segment::VerticalSegment;
pub use types::{Item, Keyed, RenderedItem, Rendition};
pub use work_queue::{
    Delivery, FrameCallback, Priority, RequestId, Scheduler, UpdateFn, WorkQueue,
    WorkQueueHandle, WorkQueueOptions, Workload,
};
