//! Endpoint constraints deciding whether a finished streamline is kept.

use super::masks::TrackingMasks;
use crate::error::{Result, TrackingError};
use crate::types::Streamline;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Policy on where the two ends of a streamline may lie.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointConstraint {
    /// Every structurally valid fibre is kept.
    #[default]
    None,
    /// Both ends inside the target mask.
    EpsInTarget,
    /// Both ends on non-zero target labels, and the labels differ.
    EpsInTargetLabelDiff,
    /// One end in the seed mask, the other in the target mask.
    EpsInSeedAndTarget,
    /// At least one end inside the target mask.
    MinOneEpInTarget,
    /// Exactly one end inside the target mask.
    OneEpInTarget,
    /// Neither end inside the target mask.
    NoEpInTarget,
}

impl EndpointConstraint {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointConstraint::None => "NONE",
            EndpointConstraint::EpsInTarget => "EPS_IN_TARGET",
            EndpointConstraint::EpsInTargetLabelDiff => "EPS_IN_TARGET_LABELDIFF",
            EndpointConstraint::EpsInSeedAndTarget => "EPS_IN_SEED_AND_TARGET",
            EndpointConstraint::MinOneEpInTarget => "MIN_ONE_EP_IN_TARGET",
            EndpointConstraint::OneEpInTarget => "ONE_EP_IN_TARGET",
            EndpointConstraint::NoEpInTarget => "NO_EP_IN_TARGET",
        }
    }

    /// Refine an unset constraint from the masks that were supplied.
    pub fn auto_select(self, seed_set: bool, target_set: bool) -> Self {
        match (self, seed_set, target_set) {
            (EndpointConstraint::None, true, true) => EndpointConstraint::EpsInSeedAndTarget,
            (EndpointConstraint::None, false, true) => EndpointConstraint::EpsInTarget,
            (other, _, _) => other,
        }
    }
}

impl fmt::Display for EndpointConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies completed streamlines by their end points.
pub struct FiberValidator<'m, 'a> {
    constraint: EndpointConstraint,
    masks: &'m TrackingMasks<'a>,
}

impl<'m, 'a> FiberValidator<'m, 'a> {
    pub fn new(constraint: EndpointConstraint, masks: &'m TrackingMasks<'a>) -> Self {
        Self { constraint, masks }
    }

    pub fn constraint(&self) -> EndpointConstraint {
        self.constraint
    }

    fn require_target(&self) -> Result<()> {
        if self.masks.target_set() {
            Ok(())
        } else {
            Err(TrackingError::MissingMask {
                constraint: self.constraint,
                mask: "target",
            })
        }
    }

    /// Whether `fiber` satisfies the constraint.
    ///
    /// Fails when the constraint refers to a target (or seed) mask the
    /// caller never supplied; the tracker runs this once on a dummy fibre
    /// before any worker starts.
    pub fn check(&self, fiber: &Streamline) -> Result<bool> {
        if self.constraint == EndpointConstraint::None {
            return Ok(true);
        }
        self.require_target()?;
        if self.constraint == EndpointConstraint::EpsInSeedAndTarget && !self.masks.seed_set() {
            return Err(TrackingError::MissingMask {
                constraint: self.constraint,
                mask: "seed",
            });
        }
        let (Some(front), Some(back)) = (fiber.front(), fiber.back()) else {
            return Ok(false);
        };
        Ok(self.ends_valid(front, back))
    }

    /// Convenience wrapper for the hot path, where configuration has
    /// already been validated.
    #[inline]
    pub fn is_valid(&self, fiber: &Streamline) -> bool {
        matches!(self.check(fiber), Ok(true))
    }

    fn ends_valid(&self, front: &Point3<f32>, back: &Point3<f32>) -> bool {
        let m = self.masks;
        match self.constraint {
            EndpointConstraint::None => true,
            EndpointConstraint::EpsInTarget => m.in_target(front) && m.in_target(back),
            EndpointConstraint::EpsInTargetLabelDiff => {
                let v1 = m.target_label(front);
                let v2 = m.target_label(back);
                v1 > 0.0 && v2 > 0.0 && v1 != v2
            }
            EndpointConstraint::EpsInSeedAndTarget => {
                (m.in_seed(front) && m.in_target(back)) || (m.in_seed(back) && m.in_target(front))
            }
            EndpointConstraint::MinOneEpInTarget => m.in_target(front) || m.in_target(back),
            EndpointConstraint::OneEpInTarget => m.in_target(front) != m.in_target(back),
            EndpointConstraint::NoEpInTarget => !m.in_target(front) && !m.in_target(back),
        }
    }
}
