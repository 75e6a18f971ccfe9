use crate::error::{PsoError, Result};
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle given by its lower-left corner and extents.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rectangle {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

impl Rectangle {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Result<Self> {
        // NaN extents fail this check too
        if !(width >= 0.0 && height >= 0.0) {
            return Err(PsoError::InvalidGeometry { width, height });
        }
        Ok(Self {
            x,
            y,
            width,
            height,
        })
    }

    /// Rectangle of the given extents centered on `(center_x, center_y)`.
    pub fn centered(center_x: f64, center_y: f64, width: f64, height: f64) -> Result<Self> {
        Self::new(
            center_x - width * 0.5,
            center_y - height * 0.5,
            width,
            height,
        )
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn min_x(&self) -> f64 {
        self.x
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn min_y(&self) -> f64 {
        self.y
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    /// Strict interior test: points on the boundary are outside.
    #[inline]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x > self.min_x() && x < self.max_x() && y > self.min_y() && y < self.max_y()
    }
}
