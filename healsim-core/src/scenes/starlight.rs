/// Starlight: a slowly drifting camera inside a cube of stars
use nalgebra::Point3;

use super::{oscillate, spread, Scene, SceneRng};
use crate::environment::RendererOptions;
use crate::geometry::Geometry;
use crate::graph::SceneGraph;
use crate::kind::SceneKind;
use crate::material::{Color, PointsMaterial};
use crate::projection::{Camera, Viewport};

pub const STAR_COUNT: usize = 2000;
const FIELD_SIZE: f32 = 100.0;
const BACKGROUND: u32 = 0x0a0a2a;

pub struct Starlight {
    graph: SceneGraph,
    camera: Camera,
}

pub fn build(rng: &mut SceneRng, viewport: Viewport) -> Box<dyn Scene> {
    Box::new(Starlight::generate(rng, viewport))
}

impl Starlight {
    pub fn generate(rng: &mut SceneRng, viewport: Viewport) -> Self {
        let mut graph = SceneGraph::new(Color::from_hex(BACKGROUND));

        let stars = (0..STAR_COUNT)
            .map(|_| {
                Point3::new(
                    spread(rng, FIELD_SIZE),
                    spread(rng, FIELD_SIZE),
                    spread(rng, FIELD_SIZE),
                )
            })
            .collect();
        let geometry = graph.add_geometry(Geometry::points(stars));
        let material = graph.add_material(PointsMaterial::new(Color::WHITE, 0.2));
        let root = graph.root();
        graph.add_points(root, geometry, material);

        Starlight {
            graph,
            camera: Camera::new(viewport).with_position(0.0, 0.0, 5.0),
        }
    }
}

impl Scene for Starlight {
    fn kind(&self) -> SceneKind {
        SceneKind::Starlight
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
        RendererOptions::new(self.graph.background).with_high_performance()
    }

    fn advance(&mut self, time_ms: f64) {
        self.camera.position.x = oscillate(time_ms, 0.0001, 2.0);
        self.camera.look_at(Point3::origin());
    }
}
