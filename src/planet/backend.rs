//! Collaborator traits the façade renders and loads assets through

use glam::{Quat, Vec3};

use super::material::SurfaceMaterial;
use crate::color::Color;
use crate::error::Result;
use crate::mesh::{GeometryBuffers, SeaGeometry};

/// Scene graph of the host renderer
///
/// Nodes are cheap handles; the backend owns the objects they refer to.
pub trait RenderBackend {
    type Node: Clone;
    /// A loaded model that can be instanced
    type Model;

    /// Empty parent node
    fn create_group(&mut self, name: &str) -> Self::Node;

    /// Renderable mesh from flat position/color/normal buffers
    fn create_mesh(&mut self, name: &str, geometry: &GeometryBuffers) -> Self::Node;

    /// Renderable mesh with the sea's two morph states
    fn create_morph_mesh(&mut self, name: &str, sea: &SeaGeometry) -> Self::Node;

    /// Blend between morph states; 0 is rest, 1 is wave
    fn set_morph_weight(&mut self, node: &Self::Node, weight: f32);

    fn apply_material(&mut self, node: &Self::Node, material: &dyn SurfaceMaterial);

    /// Transparent shell of the given radius
    fn create_atmosphere(&mut self, radius: f32, color: Color) -> Self::Node;

    /// New node showing `model`
    fn instantiate(&mut self, model: &Self::Model) -> Self::Node;

    fn attach(&mut self, parent: &Self::Node, child: &Self::Node);

    /// Remove a node and its children from the scene
    fn remove(&mut self, node: &Self::Node);

    fn set_transform(&mut self, node: &Self::Node, translation: Vec3, rotation: Quat, scale: f32);

    /// Override one named material of an instance
    ///
    /// # Arguments
    ///
    /// * `material` - Material name inside the instanced model
    /// * `texture` - Replacement texture, if the variant names one
    /// * `tint` - Color multiplied into the material, if the variant has tints
    fn set_instance_material(
        &mut self,
        node: &Self::Node,
        material: &str,
        texture: Option<&str>,
        tint: Option<Color>,
    );
}

/// Source of vegetation models
pub trait AssetLoader<M> {
    /// Interchangeable variants for `item`; an empty list places nothing
    ///
    /// # Errors
    ///
    /// Returns `AssetLoad` when the item's models cannot be loaded
    fn load_variants(&mut self, item: &str) -> Result<Vec<M>>;
}
