//! Percentage-space geometry and constraint math.
//!
//! Every position in a composition is expressed in percent of the container
//! box, so stored positions survive container resizes and view switches.
//! All functions here are pure and O(1); they run once per pointer event.

use serde::{Deserialize, Serialize};

/// Allowed scale range for the logo.
pub const LOGO_SCALE_RANGE: (f32, f32) = (0.5, 2.0);

/// Allowed scale range for text entities, per axis.
pub const TEXT_SCALE_RANGE: (f32, f32) = (0.5, 8.0);

/// Pointer travel, in client pixels, that changes a text scale axis by 1.0.
pub const RESIZE_PIXELS_PER_UNIT: f32 = 100.0;

// ============================================================================
// Position / PrintArea
// ============================================================================

/// A point in percent (0-100) of the container's own box.
///
/// Positions anchor the center of the entity they belong to.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A bounding box in percent of the container.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct PrintArea {
    pub top: f32,
    pub left: f32,
    pub width: f32,
    pub height: f32,
}

impl PrintArea {
    pub const fn new(top: f32, left: f32, width: f32, height: f32) -> Self {
        Self {
            top,
            left,
            width,
            height,
        }
    }

    /// Returns the right edge (left + width).
    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    /// Returns the bottom edge (top + height).
    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    /// Returns true if the position lies inside the area, edges included.
    pub fn contains(&self, pos: Position) -> bool {
        pos.x >= self.left && pos.x <= self.right() && pos.y >= self.top && pos.y <= self.bottom()
    }

    /// Returns true if the area fits inside the 0-100 container box.
    pub fn is_within_container(&self) -> bool {
        self.width >= 0.0
            && self.height >= 0.0
            && self.left >= 0.0
            && self.top >= 0.0
            && self.right() <= 100.0
            && self.bottom() <= 100.0
    }
}

// ============================================================================
// Client space
// ============================================================================

/// The container's bounding rectangle in client (viewport) pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ContainerRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl ContainerRect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Creates a rectangle anchored at the viewport origin.
    pub fn from_size(width: f32, height: f32) -> Self {
        Self::new(0.0, 0.0, width, height)
    }
}

/// Converts viewport coordinates into percent-of-container coordinates.
///
/// The result is not clamped; pointers outside the container produce values
/// below 0 or above 100. A degenerate container maps everything to 0.
pub fn client_to_percent(client_x: f32, client_y: f32, rect: &ContainerRect) -> Position {
    let axis = |client: f32, origin: f32, extent: f32| {
        if extent > 0.0 {
            (client - origin) / extent * 100.0
        } else {
            0.0
        }
    };
    Position {
        x: axis(client_x, rect.left, rect.width),
        y: axis(client_y, rect.top, rect.height),
    }
}

/// Clamps each axis independently into the print area.
///
/// This is an axis-aligned clamp, not a projection onto the nearest point of
/// the rectangle: a diagonal approach to a corner lands on the per-axis edge.
pub fn constrain_to_area(x: f32, y: f32, area: &PrintArea) -> Position {
    Position {
        x: clamp_axis(x, area.left, area.right()),
        y: clamp_axis(y, area.top, area.bottom()),
    }
}

fn clamp_axis(value: f32, min: f32, max: f32) -> f32 {
    if value.is_nan() {
        return min;
    }
    value.max(min).min(max)
}

// ============================================================================
// Scale
// ============================================================================

/// Clamps a logo scale into [`LOGO_SCALE_RANGE`].
pub fn clamp_logo_scale(scale: f32) -> f32 {
    clamp_axis(scale, LOGO_SCALE_RANGE.0, LOGO_SCALE_RANGE.1)
}

/// Clamps a text scale axis into [`TEXT_SCALE_RANGE`].
pub fn clamp_text_scale(scale: f32) -> f32 {
    clamp_axis(scale, TEXT_SCALE_RANGE.0, TEXT_SCALE_RANGE.1)
}

/// One of the four resize handles on a text entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomLeft,
        Corner::BottomRight,
    ];

    /// Sign applied to the horizontal pointer delta for this handle.
    ///
    /// Right-side handles grow with rightward travel, left-side handles with
    /// leftward travel.
    pub fn x_sign(self) -> f32 {
        match self {
            Corner::TopRight | Corner::BottomRight => 1.0,
            Corner::TopLeft | Corner::BottomLeft => -1.0,
        }
    }

    pub fn y_sign(self) -> f32 {
        match self {
            Corner::BottomLeft | Corner::BottomRight => 1.0,
            Corner::TopLeft | Corner::TopRight => -1.0,
        }
    }
}

/// Independent per-axis scale of a text entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisScale {
    pub x: f32,
    pub y: f32,
}

impl AxisScale {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn uniform(scale: f32) -> Self {
        Self::new(scale, scale)
    }

    /// Mean of both axes, stored as the uniform `scale` for older consumers.
    pub fn mean(&self) -> f32 {
        (self.x + self.y) / 2.0
    }
}

/// Computes the new axis scales for a corner drag.
///
/// `dx`/`dy` are the pointer deltas in client pixels since the gesture
/// started; `start` is the scale at gesture start. Both axes are clamped to
/// [`TEXT_SCALE_RANGE`] whatever the delta magnitude.
pub fn resize_from_corner(start: AxisScale, corner: Corner, dx: f32, dy: f32) -> AxisScale {
    let grow_x = corner.x_sign() * dx / RESIZE_PIXELS_PER_UNIT;
    let grow_y = corner.y_sign() * dy / RESIZE_PIXELS_PER_UNIT;
    AxisScale {
        x: clamp_text_scale(start.x + grow_x),
        y: clamp_text_scale(start.y + grow_y),
    }
}

// ============================================================================
// Tests
// ============================================================================
