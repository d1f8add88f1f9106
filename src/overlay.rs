//! Face overlay coordination.
//!
//! This module sits between an external face detector and the rest of the pipeline. The
//! detector reports [`FaceRegion`]s (bounding box plus landmark points, both in source-image
//! pixel coordinates); this module turns them into overlay draw commands for a display layer
//! and into compositing requests against the [`generator`] and [`compositor`].
//!
//! [`OverlaySession`] carries the regions of one analysis pass together with the "which face
//! is currently selected" state, so selection is explicit per-session data instead of shared
//! mutable state.
//!
//! [`generator`]: crate::generator
//! [`compositor`]: crate::compositor

use crate::compositor;
use crate::generator::FaceGenerator;
use crate::image::{self, Color, Image, Rect};
use crate::Result;

/// A landmark point reported by the face detector, in source-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landmark {
    x: f32,
    y: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn x(&self) -> f32 {
        self.x
    }

    #[inline]
    pub fn y(&self) -> f32 {
        self.y
    }
}

/// A detected face: bounding box plus landmarks, in source-image pixel coordinates.
///
/// Read-only input to the pipeline; produced by an external detector and never mutated here.
#[derive(Debug, Clone)]
pub struct FaceRegion {
    rect: Rect,
    landmarks: Vec<Landmark>,
}

impl FaceRegion {
    pub fn new(rect: Rect, landmarks: Vec<Landmark>) -> Self {
        Self { rect, landmarks }
    }

    /// The face's bounding rectangle.
    #[inline]
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// The face's landmark points (eyes, nose, mouth, ...).
    #[inline]
    pub fn landmarks(&self) -> &[Landmark] {
        &self.landmarks
    }
}

/// A single overlay drawing instruction for a display layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawCommand {
    /// Outline the given rectangle.
    BoundingBox { rect: Rect, color: Color },
    /// Mark the given point.
    Marker { x: i32, y: i32, color: Color },
}

/// Overlay state for one analysis pass over one source image.
///
/// Holds the detected face regions and at most one selected face. Selecting a face replaces
/// any previous selection, mirroring a UI where only one face menu can be open at a time.
#[derive(Debug)]
pub struct OverlaySession {
    regions: Vec<FaceRegion>,
    selected: Option<usize>,
}

impl OverlaySession {
    /// Creates a session from the detector output for one source image.
    pub fn new(regions: Vec<FaceRegion>) -> Self {
        Self {
            regions,
            selected: None,
        }
    }

    /// The detected face regions, in detector order.
    pub fn regions(&self) -> &[FaceRegion] {
        &self.regions
    }

    /// Selects the face at `index`, replacing any previous selection.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not a valid region index.
    pub fn select(&mut self, index: usize) {
        assert!(
            index < self.regions.len(),
            "face index {} out of range ({} detected)",
            index,
            self.regions.len(),
        );
        self.selected = Some(index);
    }

    /// Clears the current selection.
    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Returns the currently selected face region, if any.
    pub fn selected(&self) -> Option<&FaceRegion> {
        self.selected.map(|i| &self.regions[i])
    }

    /// Yields the draw commands visualizing this session's detections.
    ///
    /// Every face gets a red bounding box (the selected one green) and green landmark markers.
    pub fn draw_commands(&self) -> impl Iterator<Item = DrawCommand> + '_ {
        self.regions.iter().enumerate().flat_map(move |(i, region)| {
            let color = if self.selected == Some(i) {
                Color::GREEN
            } else {
                Color::RED
            };
            let boxes = std::iter::once(DrawCommand::BoundingBox {
                rect: region.rect(),
                color,
            });
            let markers = region.landmarks().iter().map(|lm| DrawCommand::Marker {
                x: lm.x().round() as i32,
                y: lm.y().round() as i32,
                color: Color::GREEN,
            });
            boxes.chain(markers)
        })
    }

    /// Draws this session's overlay onto an image.
    ///
    /// The image is expected to have the same resolution as the image the detector ran on;
    /// commands partially outside the image are clipped.
    pub fn draw(&self, image: &mut Image) {
        for command in self.draw_commands() {
            match command {
                DrawCommand::BoundingBox { rect, color } => {
                    image::draw_rect(image, rect).color(color);
                }
                DrawCommand::Marker { x, y, color } => {
                    image::draw_marker(image, x, y).color(color);
                }
            }
        }
    }

    /// Replaces the currently selected face with a freshly generated one.
    ///
    /// Returns `None` when no face is selected. See [`swap_face`] for the failure modes of the
    /// replacement itself.
    pub fn swap_selected(
        &self,
        generator: &mut FaceGenerator,
        source: &Image,
    ) -> Option<Result<Image>> {
        let region = self.selected()?;
        Some(swap_face(generator, source, region))
    }
}

/// Generates a face and composites it into `region`'s bounding rectangle of `source`.
///
/// This is the core orchestration step: one generation call, one compositing call. `source` is
/// never mutated; on any error it is returned to the caller unchanged (the error simply
/// propagates).
pub fn swap_face(
    generator: &mut FaceGenerator,
    source: &Image,
    region: &FaceRegion,
) -> Result<Image> {
    let face = generator.generate_face()?;
    compositor::composite(source, region.rect(), &face)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(x: i32, y: i32, w: u32, h: u32) -> FaceRegion {
        FaceRegion::new(
            Rect::from_top_left(x, y, w, h),
            vec![Landmark::new(x as f32 + 1.0, y as f32 + 1.0)],
        )
    }

    #[test]
    fn selection_is_per_session() {
        let mut session = OverlaySession::new(vec![region(0, 0, 4, 4), region(10, 10, 4, 4)]);
        assert!(session.selected().is_none());

        session.select(0);
        assert_eq!(session.selected().unwrap().rect().x(), 0);

        // Selecting another face replaces the previous selection.
        session.select(1);
        assert_eq!(session.selected().unwrap().rect().x(), 10);

        session.clear_selection();
        assert!(session.selected().is_none());
    }

    #[test]
    #[should_panic]
    fn select_out_of_range_panics() {
        let mut session = OverlaySession::new(vec![region(0, 0, 4, 4)]);
        session.select(1);
    }

    #[test]
    fn draw_commands_cover_all_regions() {
        let mut session = OverlaySession::new(vec![region(0, 0, 4, 4), region(10, 10, 4, 4)]);
        session.select(1);

        let commands: Vec<_> = session.draw_commands().collect();
        // One box and one landmark marker per region.
        assert_eq!(commands.len(), 4);
        assert!(commands.contains(&DrawCommand::BoundingBox {
            rect: Rect::from_top_left(0, 0, 4, 4),
            color: Color::RED,
        }));
        assert!(commands.contains(&DrawCommand::BoundingBox {
            rect: Rect::from_top_left(10, 10, 4, 4),
            color: Color::GREEN,
        }));
    }

    #[test]
    fn draw_stamps_overlay_pixels() {
        let session = OverlaySession::new(vec![region(1, 1, 5, 5)]);
        let mut image = Image::new(8, 8);
        image.clear(Color::BLACK);
        session.draw(&mut image);

        // Box outline corner, away from the marker cross.
        assert_eq!(image.get(5, 5), Color::RED);
        // Landmark marker center at (2, 2) is drawn after (and over) the box.
        assert_eq!(image.get(2, 2), Color::GREEN);
        // Pixels outside the overlay are untouched.
        assert_eq!(image.get(7, 7), Color::BLACK);
    }

    #[test]
    fn swap_selected_without_selection() {
        let session = OverlaySession::new(vec![region(0, 0, 4, 4)]);
        let mut generator = FaceGenerator::new();
        let source = Image::new(8, 8);
        assert!(session.swap_selected(&mut generator, &source).is_none());
    }

    #[test]
    fn swap_face_propagates_generator_errors() {
        let mut generator = FaceGenerator::new(); // nothing loaded
        let source = Image::new(64, 64);
        match swap_face(&mut generator, &source, &region(0, 0, 16, 16)) {
            Err(crate::Error::NotLoaded) => {}
            other => panic!("expected `NotLoaded`, got {other:?}"),
        }
    }
}
