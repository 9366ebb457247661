/// Forest: sine-hill terrain, swaying trees and drifting dust under fog
use std::f32::consts::{FRAC_PI_2, TAU};

use nalgebra::Point3;
use rand::Rng;

use super::{oscillate, spread, Scene, SceneRng};
use crate::environment::RendererOptions;
use crate::geometry::Geometry;
use crate::graph::{Fog, Light, NodeId, SceneGraph};
use crate::kind::SceneKind;
use crate::material::{Color, PointsMaterial, StandardMaterial};
use crate::projection::{Camera, Viewport};
use crate::transform::Transform;

const BACKGROUND: u32 = 0x0b1d16;
const TERRAIN_SIZE: f32 = 120.0;
const TERRAIN_SEGMENTS: u32 = 200;
const TREE_ATTEMPTS: usize = 120;
const TREE_AREA: f32 = 70.0;
/// Trees are kept out of this radius so the camera's foreground stays open
const CLEARING_RADIUS: f32 = 4.0;
const DUST_COUNT: usize = 800;
const SWAY_AMPLITUDE: f32 = 0.06;

/// Terrain height at plane coordinates `(x, y)`
pub fn terrain_height(x: f32, y: f32) -> f32 {
    (x * 0.15).sin() * 0.6 + (y * 0.1 + x * 0.05).sin() * 0.4 + ((x + y) * 0.08).cos() * 0.3
}

struct Tree {
    node: NodeId,
    wind_offset: f32,
}

pub struct Forest {
    graph: SceneGraph,
    camera: Camera,
    trees: Vec<Tree>,
}

pub fn build(rng: &mut SceneRng, viewport: Viewport) -> Box<dyn Scene> {
    Box::new(Forest::generate(rng, viewport))
}

impl Forest {
    pub fn generate(rng: &mut SceneRng, viewport: Viewport) -> Self {
        let background = Color::from_hex(BACKGROUND);
        let mut graph = SceneGraph::new(background);
        graph.fog = Some(Fog {
            color: background,
            near: 10.0,
            far: 80.0,
        });
        let root = graph.root();

        graph.add_light(
            Light::Hemisphere {
                sky: Color::from_hex(0xbcd9c4),
                ground: background,
                intensity: 0.6,
            },
            Transform::identity(),
        );
        graph.add_light(
            Light::Directional {
                color: Color::from_hex(0xdde8d5),
                intensity: 0.8,
                cast_shadow: true,
            },
            Transform::from_position(-8.0, 12.0, -6.0),
        );

        let mut terrain = Geometry::plane(TERRAIN_SIZE, TERRAIN_SEGMENTS);
        terrain.displace_z(terrain_height);
        terrain.compute_vertex_normals();
        let terrain = graph.add_geometry(terrain);
        let ground_material = graph.add_material(StandardMaterial::new(Color::from_hex(0x2c5f2d), 0.95));
        let ground = graph.add_mesh(
            root,
            terrain,
            ground_material,
            Transform::identity().with_rotation(-FRAC_PI_2, 0.0, 0.0),
        );
        graph.set_shadows(ground, false, true);

        // One trunk and one crown mesh shared by every tree
        let trunk_geometry = graph.add_geometry(Geometry::cylinder(0.12, 0.18, 1.2, 8));
        let trunk_material = graph.add_material(StandardMaterial::new(Color::from_hex(0x6b4f2a), 0.9));
        let leaf_geometry = graph.add_geometry(Geometry::cone(0.8, 1.6, 12));
        let leaf_material = graph.add_material(StandardMaterial::new(Color::from_hex(0x2e8b57), 0.8));

        let tree_group = graph.add_group(root, Transform::identity());
        let mut trees = Vec::with_capacity(TREE_ATTEMPTS);
        for _ in 0..TREE_ATTEMPTS {
            let x = spread(rng, TREE_AREA);
            let z = spread(rng, TREE_AREA);
            if x.hypot(z) < CLEARING_RADIUS {
                continue;
            }
            // The ground plane is rotated onto XZ, so world z is plane -y
            let y = terrain_height(x, -z);
            let scale = rng.gen_range(0.8..1.6);
            let wind_offset = rng.gen::<f32>() * TAU;
            let jitter_x = spread(rng, 1.0);
            let jitter_z = spread(rng, 1.0);

            let tree = graph.add_group(
                tree_group,
                Transform::from_position(x, y, z).with_uniform_scale(scale),
            );
            let trunk = graph.add_mesh(
                tree,
                trunk_geometry,
                trunk_material,
                Transform::from_position(jitter_x * 0.1, 0.6, jitter_z * 0.1),
            );
            let leaf = graph.add_mesh(tree, leaf_geometry, leaf_material, Transform::from_position(0.0, 1.4, 0.0));
            graph.set_shadows(trunk, true, false);
            graph.set_shadows(leaf, true, false);

            trees.push(Tree { node: tree, wind_offset });
        }

        let dust = (0..DUST_COUNT)
            .map(|_| Point3::new(spread(rng, 60.0), rng.gen::<f32>() * 6.0 + 1.0, spread(rng, 60.0)))
            .collect();
        let dust_geometry = graph.add_geometry(Geometry::points(dust));
        let dust_material =
            graph.add_material(PointsMaterial::new(Color::from_hex(0xdfeee3), 0.05).with_opacity(0.6));
        graph.add_points(root, dust_geometry, dust_material);

        Forest {
            graph,
            camera: Camera::new(viewport).with_position(0.0, 4.0, 10.0),
            trees,
        }
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }
}

impl Scene for Forest {
    fn kind(&self) -> SceneKind {
        SceneKind::Forest
    }

    fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    fn graph_mut(&mut self) -> &mut SceneGraph {
        &mut self.graph
    }

    fn camera(&self) -> &Camera {
        &self.camera
    }

    fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    fn options(&self) -> RendererOptions {
        RendererOptions::new(self.graph.background).with_shadows()
    }

    fn advance(&mut self, time_ms: f64) {
        for tree in &self.trees {
            if let Some(node) = self.graph.node_mut(tree.node) {
                node.transform.rotation.z =
                    (time_ms * 0.0015 + f64::from(tree.wind_offset)).sin() as f32 * SWAY_AMPLITUDE;
            }
        }

        self.camera.position.x = oscillate(time_ms, 0.00025, 2.0);
        self.camera.look_at(Point3::new(0.0, 1.5, 0.0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;

    fn forest() -> Forest {
        Forest::generate(&mut SceneRng::seed_from_u64(11), Viewport::new(1280, 720))
    }

    #[test]
    fn test_trees_avoid_clearing_and_sit_on_terrain() {
        let forest = forest();
        assert!(forest.tree_count() > 0 && forest.tree_count() <= TREE_ATTEMPTS);
        for tree in &forest.trees {
            let node = forest.graph().node(tree.node).unwrap();
            let p = node.transform.position;
            assert!(p.x.hypot(p.z) >= CLEARING_RADIUS);
            assert_relative_eq!(p.y, terrain_height(p.x, -p.z), epsilon = 1e-5);
            assert!(node.transform.scale.x >= 0.8 && node.transform.scale.x < 1.6);
            assert_eq!(node.children().len(), 2);
        }
    }

    #[test]
    fn test_trees_share_geometry() {
        let forest = forest();
        // terrain, trunk, crown, dust
        assert_eq!(forest.graph().geometry_count(), 4);
        assert_eq!(forest.graph().material_count(), 4);
    }

    #[test]
    fn test_sway_is_bounded() {
        let mut forest = forest();
        for t in [0.0, 850.0, 10_000.0, 123_456.0] {
            forest.advance(t);
            for tree in &forest.trees {
                let sway = forest.graph().node(tree.node).unwrap().transform.rotation.z;
                assert!(sway.abs() <= SWAY_AMPLITUDE + 1e-6);
            }
            assert!(forest.camera().position.x.abs() <= 2.0 + 1e-6);
            assert_eq!(forest.camera().target, Point3::new(0.0, 1.5, 0.0));
        }
    }

    #[test]
    fn test_fog_and_lights() {
        let forest = forest();
        let fog = forest.graph().fog.expect("forest is fogged");
        assert_relative_eq!(fog.near, 10.0);
        assert_relative_eq!(fog.far, 80.0);
        let rig = forest.graph().light_rig();
        assert!(rig.hemisphere.is_some());
        assert!(rig.directional.is_some());
        assert!(forest.options().shadows);
    }

    #[test]
    fn test_terrain_height_matches_formula() {
        assert_relative_eq!(terrain_height(0.0, 0.0), 0.3);
        let h = terrain_height(10.0, -4.0);
        let expected = (1.5f32).sin() * 0.6 + (-0.4f32 + 0.5).sin() * 0.4 + (0.48f32).cos() * 0.3;
        assert_relative_eq!(h, expected, epsilon = 1e-6);
    }
}
