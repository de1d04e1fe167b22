//! Update cycle, adapter traits and engine facade for the `scroller` crate.
//!
//! The `scroller` crate holds the geometry, layout and scheduling primitives. This crate puts
//! them to work against a host:
//!
//! - [`Viewport`], [`Runway`] and [`MeasureHeight`]: the narrow interfaces the engine reads
//!   geometry through
//! - [`Controller`]: one update cycle per drained workload (sample, measure, recalculate)
//! - [`Scroller`]: queue + controller + adapters, driven by host frame schedulers
//!
//! This crate is intentionally framework-agnostic (no DOM/egui bindings).
#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

#[cfg(test)]
extern crate std;

#[macro_use]
mod macros;

mod adapter;
mod controller;
mod engine;
mod error;
mod key;
mod state;
mod task;


pub use adapter::{MeasureHeight, Runway, ScrollListener, Subscription, Viewport, ViewportId};
pub use controller::{Controller, CycleReport};
pub use error::ViewportMismatch;
pub use engine::{RenditionCallback, Scroller, ScrollerOptions};
pub use state::GeometryState;
pub use task::Task;
