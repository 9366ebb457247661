/// Retained scene graph: nodes, lights, and the geometry/material arenas they reference
use nalgebra::{Matrix4, Point3, Vector3};
use slotmap::{new_key_type, SlotMap};

use crate::geometry::Geometry;
use crate::material::{Color, Material};
use crate::transform::Transform;

new_key_type! {
    pub struct NodeId;
    pub struct GeometryKey;
    pub struct MaterialKey;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Light {
    /// Sky/ground gradient keyed on the surface normal's Y component
    Hemisphere { sky: Color, ground: Color, intensity: f32 },
    /// Parallel rays shining from the node position towards the origin
    Directional { color: Color, intensity: f32, cast_shadow: bool },
    Ambient { color: Color, intensity: f32 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Group,
    Mesh {
        geometry: GeometryKey,
        material: MaterialKey,
        cast_shadow: bool,
        receive_shadow: bool,
    },
    Points {
        geometry: GeometryKey,
        material: MaterialKey,
    },
    Light(Light),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub transform: Transform,
    pub visible: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Linear distance fog
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fog {
    pub color: Color,
    pub near: f32,
    pub far: f32,
}

impl Fog {
    /// Blend factor for a fragment `distance` units from the eye
    pub fn factor(&self, distance: f32) -> f32 {
        if self.far <= self.near {
            return if distance >= self.far { 1.0 } else { 0.0 };
        }
        ((distance - self.near) / (self.far - self.near)).clamp(0.0, 1.0)
    }
}

/// What a renderer needs to issue one draw call
#[derive(Debug, Clone, Copy)]
pub struct Drawable {
    pub node: NodeId,
    pub geometry: GeometryKey,
    pub material: MaterialKey,
    pub model: Matrix4<f32>,
    pub points: bool,
}

/// Lights folded into the fixed rig the shaders understand
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightRig {
    /// Sum of every ambient light, premultiplied by intensity
    pub ambient: Color,
    pub hemisphere: Option<(Color, Color)>,
    /// Premultiplied color and the unit vector pointing towards the light
    pub directional: Option<(Color, Vector3<f32>)>,
}

impl LightRig {
    /// Diffuse irradiance for a world-space unit normal
    pub fn irradiance(&self, normal: &Vector3<f32>) -> Color {
        let mut total = self.ambient;
        if let Some((sky, ground)) = self.hemisphere {
            total = total.add(ground.lerp(sky, 0.5 * normal.y + 0.5));
        }
        if let Some((color, direction)) = self.directional {
            total = total.add(color.scale(normal.dot(&direction).max(0.0)));
        }
        total
    }
}

/// Scene graph owning every node, geometry and material of one scene.
///
/// Geometries and materials are stored once and shared by key, the way a
/// forest reuses a single trunk mesh for every tree. Releasing a key that is
/// already gone is a no-op.
pub struct SceneGraph {
    nodes: SlotMap<NodeId, Node>,
    root: NodeId,
    geometries: SlotMap<GeometryKey, Geometry>,
    materials: SlotMap<MaterialKey, Material>,
    pub background: Color,
    pub fog: Option<Fog>,
}

impl SceneGraph {
    pub fn new(background: Color) -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node {
            kind: NodeKind::Group,
            transform: Transform::identity(),
            visible: true,
            parent: None,
            children: Vec::new(),
        });
        Self {
            nodes,
            root,
            geometries: SlotMap::with_key(),
            materials: SlotMap::with_key(),
            background,
            fog: None,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn add_geometry(&mut self, geometry: Geometry) -> GeometryKey {
        self.geometries.insert(geometry)
    }

    pub fn add_material(&mut self, material: impl Into<Material>) -> MaterialKey {
        self.materials.insert(material.into())
    }

    pub fn geometry(&self, key: GeometryKey) -> Option<&Geometry> {
        self.geometries.get(key)
    }

    pub fn geometry_mut(&mut self, key: GeometryKey) -> Option<&mut Geometry> {
        self.geometries.get_mut(key)
    }

    pub fn material(&self, key: MaterialKey) -> Option<&Material> {
        self.materials.get(key)
    }

    /// Attach a node under `parent`; an unknown parent falls back to the root
    pub fn add(&mut self, parent: NodeId, kind: NodeKind, transform: Transform) -> NodeId {
        let parent = if self.nodes.contains_key(parent) {
            parent
        } else {
            self.root
        };
        let id = self.nodes.insert(Node {
            kind,
            transform,
            visible: true,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent].children.push(id);
        id
    }

    pub fn add_group(&mut self, parent: NodeId, transform: Transform) -> NodeId {
        self.add(parent, NodeKind::Group, transform)
    }

    pub fn add_mesh(
        &mut self,
        parent: NodeId,
        geometry: GeometryKey,
        material: MaterialKey,
        transform: Transform,
    ) -> NodeId {
        self.add(
            parent,
            NodeKind::Mesh {
                geometry,
                material,
                cast_shadow: false,
                receive_shadow: false,
            },
            transform,
        )
    }

    pub fn add_points(&mut self, parent: NodeId, geometry: GeometryKey, material: MaterialKey) -> NodeId {
        self.add(parent, NodeKind::Points { geometry, material }, Transform::identity())
    }

    pub fn add_light(&mut self, light: Light, transform: Transform) -> NodeId {
        let root = self.root;
        self.add(root, NodeKind::Light(light), transform)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// Toggle shadow flags on a mesh node; other kinds are left untouched
    pub fn set_shadows(&mut self, id: NodeId, cast: bool, receive: bool) {
        if let Some(Node {
            kind: NodeKind::Mesh { cast_shadow, receive_shadow, .. },
            ..
        }) = self.nodes.get_mut(id)
        {
            *cast_shadow = cast;
            *receive_shadow = receive;
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn geometry_count(&self) -> usize {
        self.geometries.len()
    }

    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    pub fn geometry_keys(&self) -> impl Iterator<Item = GeometryKey> + '_ {
        self.geometries.keys()
    }

    pub fn material_keys(&self) -> impl Iterator<Item = MaterialKey> + '_ {
        self.materials.keys()
    }

    /// Compose local transforms from the root down to `id`
    pub fn world_matrix(&self, id: NodeId) -> Matrix4<f32> {
        let mut matrix = Matrix4::identity();
        let mut current = Some(id);
        while let Some(node) = current.and_then(|id| self.nodes.get(id)) {
            matrix = node.transform.matrix() * matrix;
            current = node.parent;
        }
        matrix
    }

    /// Depth-first walk over visible nodes with their world matrices.
    /// Hidden nodes prune their whole subtree.
    pub fn traverse<F: FnMut(NodeId, &Node, &Matrix4<f32>)>(&self, mut visit: F) {
        let mut stack = vec![(self.root, Matrix4::identity())];
        while let Some((id, parent_matrix)) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            if !node.visible {
                continue;
            }
            let world = parent_matrix * node.transform.matrix();
            visit(id, node, &world);
            for &child in node.children.iter().rev() {
                stack.push((child, world));
            }
        }
    }

    /// Every visible mesh and point cloud whose resources are still alive
    pub fn drawables(&self) -> Vec<Drawable> {
        let mut drawables = Vec::new();
        self.traverse(|id, node, world| {
            let (geometry, material, points) = match node.kind {
                NodeKind::Mesh { geometry, material, .. } => (geometry, material, false),
                NodeKind::Points { geometry, material } => (geometry, material, true),
                _ => return,
            };
            if self.geometries.contains_key(geometry) && self.materials.contains_key(material) {
                drawables.push(Drawable {
                    node: id,
                    geometry,
                    material,
                    model: *world,
                    points,
                });
            }
        });
        drawables
    }

    /// Fold the scene's lights into a [`LightRig`]. The first hemisphere and
    /// directional light win; ambient lights accumulate.
    pub fn light_rig(&self) -> LightRig {
        let mut rig = LightRig {
            ambient: Color::BLACK,
            hemisphere: None,
            directional: None,
        };
        self.traverse(|_, node, world| {
            let NodeKind::Light(light) = node.kind else {
                return;
            };
            match light {
                Light::Ambient { color, intensity } => {
                    rig.ambient = rig.ambient.add(color.scale(intensity));
                }
                Light::Hemisphere { sky, ground, intensity } if rig.hemisphere.is_none() => {
                    rig.hemisphere = Some((sky.scale(intensity), ground.scale(intensity)));
                }
                Light::Directional { color, intensity, .. } if rig.directional.is_none() => {
                    let position = world.transform_point(&Point3::origin());
                    let direction = position.coords.try_normalize(1e-6).unwrap_or_else(Vector3::y);
                    rig.directional = Some((color.scale(intensity), direction));
                }
                _ => {}
            }
        });
        rig
    }

    pub fn release_geometry(&mut self, key: GeometryKey) -> bool {
        self.geometries.remove(key).is_some()
    }

    pub fn release_material(&mut self, key: MaterialKey) -> bool {
        self.materials.remove(key).is_some()
    }

    /// Drop every geometry and material, returning how many were released
    pub fn release_all(&mut self) -> usize {
        let released = self.geometries.len() + self.materials.len();
        self.geometries.clear();
        self.materials.clear();
        released
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::{PointsMaterial, StandardMaterial};
    use approx::assert_relative_eq;

    fn sample_graph() -> (SceneGraph, GeometryKey, MaterialKey) {
        let mut graph = SceneGraph::new(Color::BLACK);
        let geometry = graph.add_geometry(Geometry::cone(1.0, 2.0, 6));
        let material = graph.add_material(StandardMaterial::new(Color::WHITE, 0.8));
        (graph, geometry, material)
    }

    #[test]
    fn test_world_matrix_composes_parents() {
        let (mut graph, geometry, material) = sample_graph();
        let root = graph.root();
        let group = graph.add_group(root, Transform::from_position(10.0, 0.0, 0.0).with_uniform_scale(2.0));
        let leaf = graph.add_mesh(group, geometry, material, Transform::from_position(0.0, 1.0, 0.0));

        let origin = graph.world_matrix(leaf).transform_point(&Point3::origin());
        assert_relative_eq!(origin, Point3::new(10.0, 2.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_shared_geometry_draws_per_instance() {
        let (mut graph, geometry, material) = sample_graph();
        let root = graph.root();
        for i in 0..3 {
            graph.add_mesh(root, geometry, material, Transform::from_position(i as f32, 0.0, 0.0));
        }
        assert_eq!(graph.drawables().len(), 3);
        assert_eq!(graph.geometry_count(), 1);
        // root plus three meshes
        assert_eq!(graph.node_count(), 4);
    }

    #[test]
    fn test_hidden_subtree_is_skipped() {
        let (mut graph, geometry, material) = sample_graph();
        let root = graph.root();
        let group = graph.add_group(root, Transform::identity());
        graph.add_mesh(group, geometry, material, Transform::identity());
        graph.node_mut(group).unwrap().visible = false;
        assert!(graph.drawables().is_empty());
    }

    #[test]
    fn test_release_is_safe_when_absent() {
        let (mut graph, geometry, material) = sample_graph();
        assert!(graph.release_geometry(geometry));
        assert!(!graph.release_geometry(geometry));
        assert!(graph.release_material(material));
        assert!(!graph.release_material(material));
        assert_eq!(graph.release_all(), 0);
    }

    #[test]
    fn test_release_all_counts_once() {
        let (mut graph, _, _) = sample_graph();
        let cloud = graph.add_geometry(Geometry::points(vec![Point3::origin()]));
        let sprite = graph.add_material(PointsMaterial::new(Color::WHITE, 0.2));
        let root = graph.root();
        graph.add_points(root, cloud, sprite);

        assert_eq!(graph.release_all(), 4);
        assert_eq!(graph.release_all(), 0);
        // Nodes survive but have nothing left to draw
        assert!(graph.drawables().is_empty());
    }

    #[test]
    fn test_unknown_parent_falls_back_to_root() {
        let (mut graph, geometry, material) = sample_graph();
        let child = graph.add_mesh(NodeId::default(), geometry, material, Transform::identity());
        assert_eq!(graph.node(child).and_then(Node::parent), Some(graph.root()));
        assert!(graph.node(graph.root()).unwrap().children().contains(&child));
    }

    #[test]
    fn test_light_rig() {
        let mut graph = SceneGraph::new(Color::BLACK);
        graph.add_light(
            Light::Ambient { color: Color::WHITE, intensity: 0.25 },
            Transform::identity(),
        );
        graph.add_light(
            Light::Directional { color: Color::WHITE, intensity: 1.0, cast_shadow: false },
            Transform::from_position(0.0, 10.0, 0.0),
        );

        let rig = graph.light_rig();
        assert_relative_eq!(rig.ambient.r, 0.25);
        let (_, direction) = rig.directional.expect("directional light folded in");
        assert_relative_eq!(direction.y, 1.0, epsilon = 1e-6);

        let lit = rig.irradiance(&Vector3::y());
        let unlit = rig.irradiance(&-Vector3::y());
        assert_relative_eq!(lit.g, 1.25, epsilon = 1e-6);
        assert_relative_eq!(unlit.g, 0.25, epsilon = 1e-6);
    }

    #[test]
    fn test_fog_factor() {
        let fog = Fog { color: Color::BLACK, near: 10.0, far: 80.0 };
        assert_relative_eq!(fog.factor(5.0), 0.0);
        assert_relative_eq!(fog.factor(45.0), 0.5);
        assert_relative_eq!(fog.factor(100.0), 1.0);
    }
}
