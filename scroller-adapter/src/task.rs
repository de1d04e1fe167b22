/// The kinds of work the update cycle knows how to do.
///
/// New kinds are new variants; the queue itself is generic over the task type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Task {
    /// Measure mounted items that have no height record yet.
    MeasureNewItems,
    RecalculateRendition,
    /// Correction pass hook. Currently does nothing.
    Normalize,
    SampleScrollOffset,
    SampleViewportSize,
}
