use alloc::boxed::Box;
use core::fmt;

use scroller::VerticalSegment;

/// Measures one mounted item.
///
/// Called synchronously from the update cycle, so it should read layout, not trigger it.
pub trait MeasureHeight {
    fn measure_height(&mut self) -> u32;
}

impl<F: FnMut() -> u32> MeasureHeight for F {
    fn measure_height(&mut self) -> u32 {
        self()
    }
}

/// The scrollable container that hosts the positioned items.
pub trait Runway {
    /// Current position and size, in the same coordinate space as [`Viewport::segment`].
    fn measure_segment(&mut self) -> VerticalSegment;
}

impl<F: FnMut() -> VerticalSegment> Runway for F {
    fn measure_segment(&mut self) -> VerticalSegment {
        self()
    }
}

/// Identifies a viewport adapter across updates.
pub type ViewportId = u64;

/// Called on every scroll event.
pub type ScrollListener = Box<dyn FnMut()>;

/// The visible region and its scroll events.
pub trait Viewport {
    fn id(&self) -> ViewportId;

    fn segment(&self) -> VerticalSegment;

    fn listen_on_scroll(&mut self, listener: ScrollListener) -> Subscription;
}

/// A live event subscription. Stopping it twice is harmless.
pub struct Subscription {
    stop: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(stop: impl FnOnce() + 'static) -> Self {
        Self {
            stop: Some(Box::new(stop)),
        }
    }

    /// A subscription with nothing to stop.
    pub fn detached() -> Self {
        Self { stop: None }
    }

    pub fn is_active(&self) -> bool {
        self.stop.is_some()
    }

    pub fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            stop();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}
