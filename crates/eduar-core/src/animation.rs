//! Per-frame model animation
//!
//! Animations are declared per catalog record and advanced once per rendered
//! frame. Angles are kept in `[0, 2π)`.

use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

/// Rotation speed used when a record declares a rotation without a speed
pub const DEFAULT_ROTATION_SPEED: f32 = 0.01;

/// Pulse speed used when a record declares a pulse without a speed
pub const DEFAULT_PULSE_SPEED: f32 = 0.5;

/// Peak deviation of the pulse scale from 1.0
pub const PULSE_AMPLITUDE: f32 = 0.05;

/// Pulse phase advanced per frame for each unit of speed
pub const PULSE_PHASE_PER_SPEED: f32 = 0.1;

/// Principal axis of the model group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// Index into an `[x, y, z]` triple
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

fn default_rotation_speed() -> f32 {
    DEFAULT_ROTATION_SPEED
}

fn default_pulse_speed() -> f32 {
    DEFAULT_PULSE_SPEED
}

/// Animation declared by a catalog record
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Animation {
    #[default]
    None,
    /// Spin around `axis` by `speed` radians per frame. No axis means no spin.
    Rotation {
        #[serde(default)]
        axis: Option<Axis>,
        #[serde(default = "default_rotation_speed")]
        speed: f32,
    },
    /// Breathe the group scale around 1.0
    Pulse {
        #[serde(default = "default_pulse_speed")]
        speed: f32,
    },
}

impl Animation {
    pub fn is_none(&self) -> bool {
        matches!(self, Animation::None)
    }

    /// Declared speed, if the variant has one
    pub fn speed(&self) -> Option<f32> {
        match self {
            Animation::None => None,
            Animation::Rotation { speed, .. } | Animation::Pulse { speed } => Some(*speed),
        }
    }

    /// Advance `pose` by one frame
    pub fn advance(&self, pose: &mut GroupPose) {
        match *self {
            Animation::None => {}
            Animation::Rotation { axis: None, .. } => {}
            Animation::Rotation {
                axis: Some(axis),
                speed,
            } => {
                let i = axis.index();
                pose.rotation[i] = (pose.rotation[i] + speed).rem_euclid(TAU);
            }
            Animation::Pulse { speed } => {
                pose.pulse_phase = (pose.pulse_phase + speed * PULSE_PHASE_PER_SPEED).rem_euclid(TAU);
                pose.scale = 1.0 + PULSE_AMPLITUDE * pose.pulse_phase.sin();
            }
        }
    }
}

/// Transform state of the model group node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupPose {
    /// Euler angles (x, y, z) in radians, applied in XYZ order
    pub rotation: [f32; 3],
    /// Uniform scale
    pub scale: f32,
    pulse_phase: f32,
}

impl Default for GroupPose {
    fn default() -> Self {
        Self {
            rotation: [0.0; 3],
            scale: 1.0,
            pulse_phase: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_accumulates_on_declared_axis_only() {
        let speed = 0.013;
        let animation = Animation::Rotation {
            axis: Some(Axis::Y),
            speed,
        };
        let mut pose = GroupPose::default();
        let frames = 1000;
        for _ in 0..frames {
            animation.advance(&mut pose);
        }

        let expected = (frames as f32 * speed).rem_euclid(TAU);
        assert!((pose.rotation[1] - expected).abs() < 1e-3, "{} vs {}", pose.rotation[1], expected);
        assert_eq!(pose.rotation[0], 0.0);
        assert_eq!(pose.rotation[2], 0.0);
        assert_eq!(pose.scale, 1.0);
    }

    #[test]
    fn test_rotation_without_axis_is_noop() {
        let animation = Animation::Rotation {
            axis: None,
            speed: 0.5,
        };
        let mut pose = GroupPose::default();
        animation.advance(&mut pose);
        assert_eq!(pose, GroupPose::default());
    }

    #[test]
    fn test_pulse_stays_within_amplitude() {
        let animation = Animation::Pulse { speed: 0.5 };
        let mut pose = GroupPose::default();
        let mut saw_growth = false;
        for _ in 0..500 {
            animation.advance(&mut pose);
            assert!(pose.scale >= 1.0 - PULSE_AMPLITUDE - f32::EPSILON);
            assert!(pose.scale <= 1.0 + PULSE_AMPLITUDE + f32::EPSILON);
            saw_growth |= pose.scale > 1.0;
            assert_eq!(pose.rotation, [0.0; 3]);
        }
        assert!(saw_growth);
    }

    #[test]
    fn test_deserialize_defaults() {
        #[derive(Deserialize)]
        struct Wrapper {
            animation: Animation,
        }

        let w: Wrapper = toml::from_str(r#"animation = { type = "rotation", axis = "z" }"#).unwrap();
        assert_eq!(
            w.animation,
            Animation::Rotation {
                axis: Some(Axis::Z),
                speed: DEFAULT_ROTATION_SPEED
            }
        );

        let w: Wrapper = toml::from_str(r#"animation = { type = "pulse" }"#).unwrap();
        assert_eq!(w.animation, Animation::Pulse { speed: DEFAULT_PULSE_SPEED });

        let bad: Result<Wrapper, _> = toml::from_str(r#"animation = { type = "wobble" }"#);
        assert!(bad.is_err());
    }
}
