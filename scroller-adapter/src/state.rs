use scroller::VerticalSegment;

/// The geometry sampled by the last update cycle.
///
/// With `feature = "serde"`, this type implements `Serialize`/`Deserialize`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeometryState {
    /// Viewport in host coordinates.
    pub viewport: Option<VerticalSegment>,
    /// Runway (scroll container content) in the same coordinates as `viewport`.
    pub runway: Option<VerticalSegment>,
    /// `viewport` expressed relative to the runway top, as of the last cycle.
    pub relative_viewport: Option<VerticalSegment>,
}

impl GeometryState {
    /// Computes the viewport relative to the runway from the current samples.
    pub fn relative(&self) -> Option<VerticalSegment> {
        let viewport = self.viewport?;
        let runway = self.runway?;
        Some(viewport.translate_by(-runway.top()))
    }
}
