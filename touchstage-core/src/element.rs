//! Stage elements
//!
//! An element is a box in screen coordinates (`layout_rect`) that the host
//! renders through `transform`, applied about the screen origin. Its on-screen
//! geometry is therefore `transform * layout_rect`.

use crate::error::{Error, Result};
use crate::transform;
use kurbo::{Affine, Point, Rect, Size};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tiny_skia::{IntSize, Pixmap, PremultipliedColorU8};
use uuid::Uuid;

/// Stable identity of an element on the stage
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementId(pub Uuid);

impl ElementId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How the engine treats an element
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ElementRole {
    /// Can be dragged, pinched and resized
    Draggable,
    /// Template; pressing it clones a new draggable element
    Spawner,
    /// Ignored by hit testing and gestures
    Static,
}

/// Raster content of an image element
///
/// Pixels are stored premultiplied, as the offscreen hit-test surface expects.
#[derive(Clone, Debug)]
pub struct ImageContent {
    pixmap: Arc<Pixmap>,
    /// Whether the host grants pixel access (false models cross-origin images)
    readable: bool,
}

impl ImageContent {
    /// Build from straight (non-premultiplied) RGBA8 pixels
    pub fn from_rgba8(width: u32, height: u32, mut data: Vec<u8>) -> Result<Self> {
        let size = IntSize::from_wh(width, height)
            .ok_or_else(|| Error::InvalidImage(format!("zero-sized image {}x{}", width, height)))?;
        if data.len() != width as usize * height as usize * 4 {
            return Err(Error::InvalidImage(format!(
                "expected {} bytes of RGBA data, got {}",
                width as usize * height as usize * 4,
                data.len()
            )));
        }

        for px in data.chunks_exact_mut(4) {
            let a = px[3] as u16;
            for c in &mut px[..3] {
                *c = ((*c as u16 * a + 127) / 255) as u8;
            }
        }

        let pixmap = Pixmap::from_vec(data, size)
            .ok_or_else(|| Error::InvalidImage("pixmap rejected image data".into()))?;
        Ok(Self::from_pixmap(pixmap))
    }

    /// A uniformly coloured image with the given alpha
    pub fn solid(width: u32, height: u32, alpha: u8) -> Result<Self> {
        let mut pixmap = Pixmap::new(width, height)
            .ok_or_else(|| Error::InvalidImage(format!("zero-sized image {}x{}", width, height)))?;
        if let Some(color) = PremultipliedColorU8::from_rgba(alpha, alpha, alpha, alpha) {
            pixmap.pixels_mut().fill(color);
        }
        Ok(Self::from_pixmap(pixmap))
    }

    pub fn from_pixmap(pixmap: Pixmap) -> Self {
        Self {
            pixmap: Arc::new(pixmap),
            readable: true,
        }
    }

    pub fn with_readable(mut self, readable: bool) -> Self {
        self.readable = readable;
        self
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub fn readable(&self) -> bool {
        self.readable
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }
}

/// What an element paints
#[derive(Clone, Debug)]
pub enum ElementContent {
    /// Opaque box content; any covered point is a hit
    Plain,
    /// Raster content; transparent pixels let hits fall through
    Image(ImageContent),
}

/// An element on the stage
#[derive(Clone, Debug)]
pub struct Element {
    pub id: ElementId,

    /// Name for diagnostics
    pub name: String,

    pub role: ElementRole,

    /// Untransformed box in screen coordinates
    pub layout_rect: Rect,

    /// Currently rendered transform
    pub transform: Affine,

    /// Stacking order; higher paints on top
    pub z_index: i32,

    /// Sequence number of the last z-index change; breaks z-index ties
    pub raise_seq: u64,

    pub content: ElementContent,
}

impl Element {
    /// Create a plain draggable element
    pub fn new(name: impl Into<String>, layout_rect: Rect) -> Self {
        Self {
            id: ElementId::new(),
            name: name.into(),
            role: ElementRole::Draggable,
            layout_rect,
            transform: Affine::IDENTITY,
            z_index: 0,
            raise_seq: 0,
            content: ElementContent::Plain,
        }
    }

    /// Create with a specific ID
    pub fn with_id(id: ElementId, name: impl Into<String>, layout_rect: Rect) -> Self {
        Self {
            id,
            ..Self::new(name, layout_rect)
        }
    }

    pub fn with_role(mut self, role: ElementRole) -> Self {
        self.role = role;
        self
    }

    pub fn with_transform(mut self, transform: Affine) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_z_index(mut self, z_index: i32) -> Self {
        self.z_index = z_index;
        self
    }

    pub fn with_image(mut self, image: ImageContent) -> Self {
        self.content = ElementContent::Image(image);
        self
    }

    pub fn is_manipulable(&self) -> bool {
        self.role == ElementRole::Draggable
    }

    /// Center of the element as rendered
    pub fn visual_center(&self) -> Point {
        self.transform * self.layout_rect.center()
    }

    /// Axis-aligned bounding box of the element as rendered
    pub fn screen_bounds(&self) -> Rect {
        self.transform.transform_rect_bbox(self.layout_rect)
    }

    /// Bottom-right corner of the element as rendered
    pub fn screen_corner(&self) -> Point {
        self.transform * Point::new(self.layout_rect.x1, self.layout_rect.y1)
    }

    pub fn layout_size(&self) -> Size {
        self.layout_rect.size()
    }

    /// Whether the rendered geometry covers `point`
    ///
    /// A collapsed (singular) transform covers nothing.
    pub fn covers(&self, point: Point) -> bool {
        match transform::invert(self.transform) {
            Ok(inverse) => self.layout_rect.contains(inverse * point),
            Err(_) => false,
        }
    }

    /// Transform from image pixel space to screen space
    ///
    /// The image is stretched over `layout_rect`, then rendered through
    /// `transform`.
    pub fn image_to_screen(&self, image: &ImageContent) -> Affine {
        let sx = self.layout_rect.width() / image.width() as f64;
        let sy = self.layout_rect.height() / image.height() as f64;
        self.transform
            * Affine::translate(self.layout_rect.origin().to_vec2())
            * Affine::scale_non_uniform(sx, sy)
    }
}
