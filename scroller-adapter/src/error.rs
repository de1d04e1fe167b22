use core::fmt;

use crate::ViewportId;

/// The host tried to swap the viewport a [`crate::Scroller`] was created with.
///
/// The scroller keeps working against the original viewport.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ViewportMismatch {
    pub bound: ViewportId,
    pub offered: ViewportId,
}

impl fmt::Display for ViewportMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scroller is bound to viewport {} and cannot switch to viewport {}",
            self.bound, self.offered
        )
    }
}

impl core::error::Error for ViewportMismatch {}
