/// Ocean: a moonlit swell of travelling sine waves with drifting sparkles
use std::f32::consts::FRAC_PI_2;

use nalgebra::Point3;
use rand::Rng;

use super::{oscillate, spread, Scene, SceneRng};
use crate::environment::RendererOptions;
use crate::geometry::Geometry;
use crate::graph::{Fog, GeometryKey, Light, NodeId, SceneGraph};
use crate::kind::SceneKind;
use crate::material::{Color, PointsMaterial, StandardMaterial};
use crate::projection::{Camera, Viewport};
use crate::transform::Transform;

const BACKGROUND: u32 = 0x06142e;
const WATER_SIZE: f32 = 120.0;
const WATER_SEGMENTS: u32 = 120;
const SPARKLE_COUNT: usize = 600;
const CAMERA_HEIGHT: f32 = 2.5;

/// Water height at plane coordinates `(x, y)` after `seconds`
pub fn wave_height(x: f32, y: f32, seconds: f32) -> f32 {
    (x * 0.2 + seconds * 0.8).sin() * 0.35
        + (y * 0.15 - seconds * 0.6).sin() * 0.25
        + ((x + y) * 0.1 + seconds * 1.1).cos() * 0.15
}

pub struct Ocean {
    graph: SceneGraph,
    camera: Camera,
    water: GeometryKey,
    sparkles: NodeId,
}

pub fn build(rng: &mut SceneRng, viewport: Viewport) -> Box<dyn Scene> {
    Box::new(Ocean::generate(rng, viewport))
}

impl Ocean {
    pub fn generate(rng: &mut SceneRng, viewport: Viewport) -> Self {
        let background = Color::from_hex(BACKGROUND);
        let mut graph = SceneGraph::new(background);
        graph.fog = Some(Fog {
            color: background,
            near: 15.0,
            far: 90.0,
        });
        let root = graph.root();

        graph.add_light(
            Light::Ambient {
                color: Color::from_hex(0x335577),
                intensity: 0.5,
            },
            Transform::identity(),
        );
        // Moonlight from behind the horizon
        graph.add_light(
            Light::Directional {
                color: Color::from_hex(0xcfe3ff),
                intensity: 0.7,
                cast_shadow: false,
            },
            Transform::from_position(5.0, 10.0, -10.0),
        );

        let mut water = Geometry::plane(WATER_SIZE, WATER_SEGMENTS);
        water.displace_z(|x, y| wave_height(x, y, 0.0));
        water.compute_vertex_normals();
        let water = graph.add_geometry(water);
        let water_material = graph.add_material(
            StandardMaterial::new(Color::from_hex(0x1e4d7a), 0.35).with_metalness(0.1),
        );
        let surface = graph.add_mesh(
            root,
            water,
            water_material,
            Transform::identity().with_rotation(-FRAC_PI_2, 0.0, 0.0),
        );
        graph.set_shadows(surface, false, true);

        let points = (0..SPARKLE_COUNT)
            .map(|_| Point3::new(spread(rng, 100.0), rng.gen::<f32>() * 2.8 + 0.2, spread(rng, 100.0)))
            .collect();
        let sparkle_geometry = graph.add_geometry(Geometry::points(points));
        let sparkle_material =
            graph.add_material(PointsMaterial::new(Color::from_hex(0xbfe6ff), 0.08).with_opacity(0.7));
        let sparkles = graph.add_group(root, Transform::identity());
        graph.add_points(sparkles, sparkle_geometry, sparkle_material);

        Ocean {
            graph,
            camera: Camera::new(viewport).with_position(0.0, CAMERA_HEIGHT, 12.0),
            water,
            sparkles,
        }
    }
}

impl Scene for Ocean {
    fn kind(&self) -> SceneKind {
        SceneKind::Ocean
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
        RendererOptions::new(self.graph.background)
    }

    fn advance(&mut self, time_ms: f64) {
        let seconds = (time_ms * 0.001) as f32;
        if let Some(water) = self.graph.geometry_mut(self.water) {
            water.displace_z(|x, y| wave_height(x, y, seconds));
            water.compute_vertex_normals();
        }
        if let Some(node) = self.graph.node_mut(self.sparkles) {
            node.transform.rotation.y = seconds * 0.01;
        }

        self.camera.position.x = oscillate(time_ms, 0.00015, 3.0);
        self.camera.position.y = CAMERA_HEIGHT + oscillate(time_ms, 0.0004, 0.3);
        self.camera.look_at(Point3::new(0.0, 0.5, 0.0));
    }
}
