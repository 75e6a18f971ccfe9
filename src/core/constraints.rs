use super::geometry::Rectangle;
use crate::error::{PsoError, Result};
use std::fmt;
use std::sync::Arc;

/// Feasibility predicate over 2D design-space points.
///
/// Implementations must be pure: the driver may call `contains` many times
/// for the same point while resampling infeasible candidates.
pub trait Constraint: Send + Sync {
    fn contains(&self, x: f64, y: f64) -> bool;
}

/// Accepts points strictly inside an axis-aligned rectangle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RectangularBound {
    rectangle: Rectangle,
}

impl RectangularBound {
    pub fn new(center_x: f64, center_y: f64, width: f64, height: f64) -> Result<Self> {
        Ok(Self {
            rectangle: Rectangle::centered(center_x, center_y, width, height)?,
        })
    }

    pub fn rectangle(&self) -> &Rectangle {
        &self.rectangle
    }
}

impl Constraint for RectangularBound {
    #[inline]
    fn contains(&self, x: f64, y: f64) -> bool {
        self.rectangle.contains(x, y)
    }
}

/// Accepts points strictly inside a circle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CircularBound {
    center_x: f64,
    center_y: f64,
    radius: f64,
}

impl CircularBound {
    pub fn new(center_x: f64, center_y: f64, radius: f64) -> Result<Self> {
        if !(radius >= 0.0) {
            return Err(PsoError::InvalidGeometry {
                width: radius * 2.0,
                height: radius * 2.0,
            });
        }
        Ok(Self {
            center_x,
            center_y,
            radius,
        })
    }
}

impl Constraint for CircularBound {
    #[inline]
    fn contains(&self, x: f64, y: f64) -> bool {
        let dx = x - self.center_x;
        let dy = y - self.center_y;
        dx * dx + dy * dy < self.radius * self.radius
    }
}

/// A 2D constraint attached to two dimensions of the design space.
///
/// The constraint sees design units, not normalized coordinates.
#[derive(Clone)]
pub struct ConstraintBinding {
    constraint: Arc<dyn Constraint>,
    x_index: usize,
    y_index: usize,
}

impl ConstraintBinding {
    pub fn new(constraint: Arc<dyn Constraint>, x_index: usize, y_index: usize) -> Self {
        Self {
            constraint,
            x_index,
            y_index,
        }
    }

    /// Check that both bound dimensions exist in a space of `dimension` variables.
    pub fn validate(&self, dimension: usize) -> Result<()> {
        for index in [self.x_index, self.y_index] {
            if index >= dimension {
                return Err(PsoError::config(
                    "constraint",
                    format!("dimension index {index} out of range for {dimension} variables"),
                ));
            }
        }
        Ok(())
    }

    /// Whether a point given in design units is feasible.
    pub fn accepts(&self, design: &[f64]) -> bool {
        match (design.get(self.x_index), design.get(self.y_index)) {
            (Some(&x), Some(&y)) => self.constraint.contains(x, y),
            _ => false,
        }
    }

    pub fn indices(&self) -> (usize, usize) {
        (self.x_index, self.y_index)
    }
}

impl fmt::Debug for ConstraintBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstraintBinding")
            .field("x_index", &self.x_index)
            .field("y_index", &self.y_index)
            .finish_non_exhaustive()
    }
}
