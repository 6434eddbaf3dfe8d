//! # Document Viewer State
//!
//! Pure state transitions for an interactive document view and the rendering
//! of that state onto an image. Gesture recognition and window event loops
//! live outside the crate; they feed [`ViewerCommand`]s in.

use image::imageops::FilterType;
use image::{DynamicImage, ImageBuffer, Pixel};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::preprocessing::deskewing::rotate_with_border;
use crate::preprocessing::{normalize_layout, BorderMode, Interpolation};

pub const ZOOM_STEP: f32 = 1.1;
pub const MIN_ZOOM: f32 = 0.5;
pub const MAX_ZOOM: f32 = 3.0;
/// Pixels of pan per unit of normalized pointer displacement
pub const PAN_SCALE: f32 = 100.0;

/// View state of a document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewerState {
    pub page: u32,
    pub total_pages: u32,
    pub zoom: f32,
    /// Counter-clockwise rotation in degrees, a multiple of 90 in `[0, 360)`
    pub rotation: u32,
    pub pan_x: f32,
    pub pan_y: f32,
    pub processed: bool,
}

impl Default for ViewerState {
    fn default() -> Self {
        Self {
            page: 0,
            total_pages: 1,
            zoom: 1.0,
            rotation: 0,
            pan_x: 0.0,
            pan_y: 0.0,
            processed: false,
        }
    }
}

/// A command applied to the view state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewerCommand {
    NextPage,
    PreviousPage,
    ZoomIn,
    ZoomOut,
    RotateRight,
    /// Normalized pointer displacement
    Pan { dx: f32, dy: f32 },
    MarkProcessed,
}

impl ViewerState {
    pub fn with_pages(total_pages: u32) -> Self {
        Self {
            total_pages: total_pages.max(1),
            ..Default::default()
        }
    }

    /// Returns the state after applying `command`.
    pub fn apply(self, command: ViewerCommand) -> ViewerState {
        let mut next = self;
        match command {
            ViewerCommand::NextPage => {
                next.page = (next.page + 1).min(next.total_pages.saturating_sub(1));
            }
            ViewerCommand::PreviousPage => next.page = next.page.saturating_sub(1),
            ViewerCommand::ZoomIn => next.zoom = (next.zoom * ZOOM_STEP).min(MAX_ZOOM),
            ViewerCommand::ZoomOut => next.zoom = (next.zoom / ZOOM_STEP).max(MIN_ZOOM),
            ViewerCommand::RotateRight => next.rotation = (next.rotation + 90) % 360,
            ViewerCommand::Pan { dx, dy } => {
                next.pan_x += dx * PAN_SCALE;
                next.pan_y += dy * PAN_SCALE;
            }
            ViewerCommand::MarkProcessed => next.processed = true,
        }
        debug!(command = ?command, state = ?next, "Executed viewer command");
        next
    }
}

/// Two-step pan gesture: the first position starts the pan, the second one
/// ends it and yields the displacement.
#[derive(Debug, Clone, Copy, Default)]
pub struct PanTracker {
    start: Option<(f32, f32)>,
}

impl PanTracker {
    pub fn is_panning(&self) -> bool {
        self.start.is_some()
    }

    /// Feeds a normalized pointer position. Returns a `Pan` command when a
    /// gesture completes.
    pub fn update(&mut self, position: (f32, f32)) -> Option<ViewerCommand> {
        match self.start.take() {
            None => {
                self.start = Some(position);
                None
            }
            Some((x0, y0)) => Some(ViewerCommand::Pan {
                dx: position.0 - x0,
                dy: position.1 - y0,
            }),
        }
    }
}

/// Renders the view: rotation about the center with a black border, then
/// zoom, then pan with a black fill.
pub fn render_view(image: &DynamicImage, state: &ViewerState) -> DynamicImage {
    let mut view = normalize_layout(image.clone());

    if state.rotation != 0 {
        // Counter-clockwise on screen
        view = rotate_with_border(
            &view,
            -(state.rotation as f32),
            Interpolation::Bilinear,
            BorderMode::Constant(0),
        );
    }

    if state.zoom != 1.0 {
        let width = ((view.width() as f32 * state.zoom) as u32).max(1);
        let height = ((view.height() as f32 * state.zoom) as u32).max(1);
        view = view.resize_exact(width, height, FilterType::Triangle);
    }

    if state.pan_x != 0.0 || state.pan_y != 0.0 {
        let dx = state.pan_x.round() as i64;
        let dy = state.pan_y.round() as i64;
        view = match view {
            DynamicImage::ImageLuma8(buf) => DynamicImage::ImageLuma8(translate(&buf, dx, dy)),
            DynamicImage::ImageRgb8(buf) => DynamicImage::ImageRgb8(translate(&buf, dx, dy)),
            other => other,
        };
    }

    view
}

/// Shifts an image by whole pixels; uncovered pixels are zero.
fn translate<P>(src: &ImageBuffer<P, Vec<u8>>, dx: i64, dy: i64) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8>,
{
    let (width, height) = src.dimensions();
    let mut out = ImageBuffer::<P, Vec<u8>>::new(width, height);
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let sx = x as i64 - dx;
        let sy = y as i64 - dy;
        if sx >= 0 && sy >= 0 && sx < width as i64 && sy < height as i64 {
            *pixel = *src.get_pixel(sx as u32, sy as u32);
        }
    }
    out
}
