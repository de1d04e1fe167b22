use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use scroller::{
    HeightCache, Keyed, RenderedItem, VerticalSegment, Workload, recalculate_rendition, seek_pivot,
};

use crate::key::KeyMap;
use crate::{GeometryState, MeasureHeight, Runway, Task, Viewport, ViewportId};

/// What one update cycle ended up doing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub sampled_viewport: bool,
    pub sampled_runway: bool,
    /// Measurements that created or changed a height record.
    pub measured: usize,
    pub recalculated: bool,
    /// The new rendition differs from the previous one (by key and offset).
    pub rendition_changed: bool,
    /// Some rendered item has a mounted cell but no height record.
    pub needs_measurement: bool,
    pub normalized: bool,
}

/// The update cycle: turns one drained [`Workload`] into sampling, measuring and layout work.
///
/// This type does not schedule anything itself. It owns the engine state (list, height cache,
/// rendition, sampled geometry, mounted cells) and the adapters; [`crate::Scroller`] feeds it
/// workloads from its queue.
pub struct Controller<T: Keyed> {
    list: Vec<T>,
    heights: HeightCache<T::Key>,
    rendition: Vec<RenderedItem<T>>,
    cells: KeyMap<T::Key, Box<dyn MeasureHeight>>,
    viewport: Box<dyn Viewport>,
    runway: Box<dyn Runway>,
    geometry: GeometryState,
}

impl<T: Keyed + Clone> Controller<T> {
    pub fn new(default_height: u32, viewport: Box<dyn Viewport>, runway: Box<dyn Runway>) -> Self {
        sdebug!(default_height, viewport = viewport.id(), "Controller::new");
        Self {
            list: Vec::new(),
            heights: HeightCache::new(default_height),
            rendition: Vec::new(),
            cells: KeyMap::new(),
            viewport,
            runway,
            geometry: GeometryState::default(),
        }
    }

    pub fn list(&self) -> &[T] {
        &self.list
    }

    pub fn set_list(&mut self, list: Vec<T>) {
        strace!(len = list.len(), "Controller::set_list");
        self.list = list;
    }

    pub fn rendition(&self) -> &[RenderedItem<T>] {
        &self.rendition
    }

    pub fn heights(&self) -> &HeightCache<T::Key> {
        &self.heights
    }

    pub fn import_heights(&mut self, entries: impl IntoIterator<Item = (T::Key, u32)>) {
        self.heights.import(entries);
    }

    pub fn geometry(&self) -> GeometryState {
        self.geometry
    }

    pub fn viewport_id(&self) -> ViewportId {
        self.viewport.id()
    }

    pub(crate) fn viewport_mut(&mut self) -> &mut dyn Viewport {
        self.viewport.as_mut()
    }

    /// Registers the measurement adapter of a rendered item, returning the one it replaces.
    pub fn mount_cell(
        &mut self,
        key: T::Key,
        cell: Box<dyn MeasureHeight>,
    ) -> Option<Box<dyn MeasureHeight>> {
        self.cells.insert(key, cell)
    }

    pub fn unmount_cell(&mut self, key: &T::Key) -> bool {
        self.cells.remove(key).is_some()
    }

    pub fn is_mounted(&self, key: &T::Key) -> bool {
        self.cells.contains_key(key)
    }

    /// Total height of the list using known heights, and the default for the rest.
    ///
    /// This walks the whole list.
    pub fn runway_height(&self) -> u64 {
        self.list
            .iter()
            .map(|item| u64::from(self.heights.get(item.key())))
            .sum()
    }

    /// Runs one cycle. Steps run in a fixed order and each one only when something it depends on
    /// changed or was asked for.
    pub fn update(&mut self, workload: &Workload<Task, T::Key>) -> CycleReport {
        let mut report = CycleReport::default();
        let wants_scroll = workload.has(&Task::SampleScrollOffset);
        let wants_size = workload.has(&Task::SampleViewportSize);

        let previous_viewport = self.geometry.viewport;
        if previous_viewport.is_none() || wants_scroll || wants_size {
            self.geometry.viewport = Some(self.viewport.segment());
            report.sampled_viewport = true;
        }
        let viewport_changed = self.geometry.viewport != previous_viewport;

        if viewport_changed || wants_scroll || self.geometry.runway.is_none() {
            self.geometry.runway = Some(self.runway.measure_segment());
            report.sampled_runway = true;
        }

        let previous_relative = self.geometry.relative_viewport;
        let relative = self.geometry.relative();
        self.geometry.relative_viewport = relative;

        let Some(relative) = relative else {
            return report;
        };

        if workload.has(&Task::MeasureNewItems) || !workload.remeasure_keys().is_empty() {
            report.measured = self.measure(workload);
        }

        let dirty = workload.has(&Task::RecalculateRendition)
            || report.measured > 0
            || previous_relative != Some(relative);
        if dirty {
            report.rendition_changed = self.recalculate(relative);
            report.recalculated = true;
            report.needs_measurement = self.rendition.iter().any(|rendered| {
                self.cells.contains_key(rendered.key()) && !self.heights.has_record(rendered.key())
            });
        }

        if workload.has(&Task::Normalize) {
            self.normalize();
            report.normalized = true;
        }

        strace!(
            sampled_viewport = report.sampled_viewport,
            sampled_runway = report.sampled_runway,
            measured = report.measured,
            recalculated = report.recalculated,
            rendition = self.rendition.len(),
            "Controller::update"
        );
        report
    }

    fn measure(&mut self, workload: &Workload<Task, T::Key>) -> usize {
        let mut changed = 0usize;

        if workload.has(&Task::MeasureNewItems) {
            for (key, cell) in self.cells.iter_mut() {
                if self.heights.has_record(key) {
                    continue;
                }
                self.heights.update(key.clone(), cell.measure_height());
                changed += 1;
            }
        }

        for key in workload.remeasure_keys() {
            let Some(cell) = self.cells.get_mut(key) else {
                // Not mounted any more; it gets measured again when it comes back into view.
                strace!("Controller::measure: no cell for flagged item");
                continue;
            };
            let height = cell.measure_height();
            if self.heights.has_record(key) && self.heights.get(key) == height {
                continue;
            }
            self.heights.update(key.clone(), height);
            changed += 1;
        }

        changed
    }

    fn recalculate(&mut self, viewport: VerticalSegment) -> bool {
        let mut next = recalculate_rendition(&self.rendition, &self.list, viewport, &self.heights);
        if next.is_empty() {
            // The viewport jumped past the old window; grow the new one from wherever it landed.
            if let Some(seed) = seek_pivot(&self.rendition, &self.list, viewport, &self.heights) {
                next = recalculate_rendition(&[seed], &self.list, viewport, &self.heights);
            }
        }
        let changed = next.len() != self.rendition.len()
            || next
                .iter()
                .zip(&self.rendition)
                .any(|(a, b)| !a.same_placement(b));
        self.rendition = next;
        changed
    }

    fn normalize(&mut self) {
        strace!("Controller::normalize: no correction pass");
    }
}

impl<T: Keyed> fmt::Debug for Controller<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("list", &self.list.len())
            .field("heights", &self.heights.len())
            .field("rendition", &self.rendition.len())
            .field("cells", &self.cells.len())
            .field("geometry", &self.geometry)
            .finish_non_exhaustive()
    }
}
