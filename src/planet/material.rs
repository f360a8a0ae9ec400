//! Surface materials for terrain and sea
//!
//! The set of styles is closed ([`MaterialStyle`]); each style implements
//! [`SurfaceMaterial`] so the façade can advance and upload any of them the
//! same way every frame.

use std::fmt;

pub use crate::config::MaterialStyle;

/// Values a renderer feeds to its shader for one material
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MaterialUniforms {
    /// Seconds since the material was created
    pub time: f32,
    pub caustic_strength: f32,
    pub caustic_scale: f32,
}

pub trait SurfaceMaterial: fmt::Debug + Send {
    fn style(&self) -> MaterialStyle;

    /// Advance by `dt` seconds
    fn update(&mut self, dt: f32);

    fn uniforms(&self) -> MaterialUniforms;

    /// Whether uniforms change between frames
    fn is_animated(&self) -> bool {
        false
    }
}

/// Plain vertex-colored surface
#[derive(Debug, Clone, Default)]
pub struct SimpleMaterial {
    time: f32,
}

impl SurfaceMaterial for SimpleMaterial {
    fn style(&self) -> MaterialStyle {
        MaterialStyle::Simple
    }

    fn update(&mut self, dt: f32) {
        self.time += dt;
    }

    fn uniforms(&self) -> MaterialUniforms {
        MaterialUniforms {
            time: self.time,
            ..Default::default()
        }
    }
}

/// Vertex-colored surface with scrolling light caustics
#[derive(Debug, Clone)]
pub struct CausticMaterial {
    time: f32,
    pub speed: f32,
    pub strength: f32,
    pub scale: f32,
}

impl Default for CausticMaterial {
    fn default() -> Self {
        Self {
            time: 0.0,
            speed: 0.6,
            strength: 0.35,
            scale: 8.0,
        }
    }
}

impl SurfaceMaterial for CausticMaterial {
    fn style(&self) -> MaterialStyle {
        MaterialStyle::AnimatedCaustic
    }

    fn update(&mut self, dt: f32) {
        self.time += dt * self.speed;
    }

    fn uniforms(&self) -> MaterialUniforms {
        MaterialUniforms {
            time: self.time,
            caustic_strength: self.strength,
            caustic_scale: self.scale,
        }
    }

    fn is_animated(&self) -> bool {
        true
    }
}

/// Fresh material of the given style
pub fn material_for(style: MaterialStyle) -> Box<dyn SurfaceMaterial> {
    match style {
        MaterialStyle::Simple => Box::new(SimpleMaterial::default()),
        MaterialStyle::AnimatedCaustic => Box::new(CausticMaterial::default()),
    }
}
