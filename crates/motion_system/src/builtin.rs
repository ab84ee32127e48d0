//! Builtin motion classes.
//!
//! Three laws ship with the system: `static` for groups that never move,
//! `translate` for constant-velocity drift, and `oscillate` for geometry
//! that shuttles back and forth across a partition seam. Application
//! crates register additional classes on the same registry.

use crate::error::{MotionError, RegistryError};
use crate::law::{MotionLaw, StepParams};
use serde::Deserialize;
use tessera_spatial::arena::Vertex;
use tessera_spatial::Vec3;

/// No-op law for immovable groups.
#[derive(Debug, Default)]
pub struct StaticLaw;

impl MotionLaw for StaticLaw {
    fn class_name(&self) -> &str {
        "static"
    }

    fn move_vertices(&self, _vertices: &mut [Vertex], _params: &StepParams)
        -> Result<(), MotionError> {
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct TranslateParams {
    velocity: [f64; 3],
}

/// Constant-velocity drift: every vertex advances by `velocity * delta_t`.
#[derive(Debug)]
pub struct TranslateLaw {
    velocity: Vec3,
}

impl TranslateLaw {
    /// Builds the law from its JSON parameter object `{ "velocity": [x, y, z] }`.
    pub fn from_params(params: &serde_json::Value) -> Result<Self, RegistryError> {
        let parsed: TranslateParams =
            serde_json::from_value(params.clone()).map_err(|e| RegistryError::InvalidParams {
                class: "translate".to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            velocity: parsed.velocity.into(),
        })
    }
}

impl MotionLaw for TranslateLaw {
    fn class_name(&self) -> &str {
        "translate"
    }

    fn move_vertices(&self, vertices: &mut [Vertex], params: &StepParams)
        -> Result<(), MotionError> {
        let displacement = self.velocity.scale(params.delta_t);
        for vertex in vertices {
            vertex.position = vertex.position.add(displacement);
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct OscillateParams {
    amplitude: [f64; 3],
}

/// Step-parity shuttle: odd steps displace by `+amplitude`, even steps by
/// `-amplitude`, so geometry returns to its starting placement every two
/// steps. Useful for exercising migration round trips.
#[derive(Debug)]
pub struct OscillateLaw {
    amplitude: Vec3,
}

impl OscillateLaw {
    /// Builds the law from its JSON parameter object `{ "amplitude": [x, y, z] }`.
    pub fn from_params(params: &serde_json::Value) -> Result<Self, RegistryError> {
        let parsed: OscillateParams =
            serde_json::from_value(params.clone()).map_err(|e| RegistryError::InvalidParams {
                class: "oscillate".to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            amplitude: parsed.amplitude.into(),
        })
    }
}

impl MotionLaw for OscillateLaw {
    fn class_name(&self) -> &str {
        "oscillate"
    }

    fn move_vertices(&self, vertices: &mut [Vertex], params: &StepParams)
        -> Result<(), MotionError> {
        let sign = if params.next_step % 2 == 1 { 1.0 } else { -1.0 };
        let displacement = self.amplitude.scale(sign);
        for vertex in vertices {
            vertex.position = vertex.position.add(displacement);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vertices() -> Vec<Vertex> {
        vec![
            Vertex::new(Vec3::zero()),
            Vertex::new(Vec3::new(1.0, 2.0, 3.0)),
        ]
    }

    fn step(current: u64, next: u64, delta_t: f64) -> StepParams {
        StepParams {
            current_step: current,
            next_step: next,
            delta_t,
        }
    }

    #[test]
    fn static_law_leaves_geometry_alone() {
        let mut vs = vertices();
        let before = vs.clone();
        StaticLaw
            .move_vertices(&mut vs, &step(0, 1, 0.5))
            .expect("static law");
        assert_eq!(vs, before);
    }

    #[test]
    fn translate_scales_by_delta_t() {
        let law = TranslateLaw::from_params(&json!({ "velocity": [2.0, 0.0, -4.0] }))
            .expect("valid params");
        let mut vs = vertices();
        law.move_vertices(&mut vs, &step(0, 1, 0.5)).expect("translate");
        assert_eq!(vs[0].position, Vec3::new(1.0, 0.0, -2.0));
        assert_eq!(vs[1].position, Vec3::new(2.0, 2.0, 1.0));
    }

    #[test]
    fn oscillate_returns_after_two_steps() {
        let law = OscillateLaw::from_params(&json!({ "amplitude": [3.0, 0.0, 0.0] }))
            .expect("valid params");
        let mut vs = vertices();
        let start = vs.clone();
        law.move_vertices(&mut vs, &step(0, 1, 1.0)).expect("step 1");
        assert_eq!(vs[0].position.x, 3.0);
        law.move_vertices(&mut vs, &step(1, 2, 1.0)).expect("step 2");
        for (moved, original) in vs.iter().zip(&start) {
            assert!((moved.position.x - original.position.x).abs() < 1e-12);
        }
    }

    #[test]
    fn translate_rejects_malformed_params() {
        let err = TranslateLaw::from_params(&json!({ "speed": 3 })).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidParams { .. }));
    }
}
