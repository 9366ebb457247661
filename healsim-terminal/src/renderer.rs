/// ASCII rasterizer for terminal rendering
use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use crossterm::{
    cursor,
    style::{self, Print, ResetColor, SetForegroundColor},
    QueueableCommand,
};
use healsim_core::{
    Camera, Color, Drawable, Fog, Geometry, LightRig, Material, Renderer, RendererOptions, SceneGraph, Topology,
    Triangle, Viewport,
};
use nalgebra::{Matrix4, Point3};

/// Character luminosity ramp for depth/shading (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Below this brightness a cell is left blank
const BLANK_THRESHOLD: f32 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Glyph {
    pub ch: char,
    pub color: Color,
}

/// Character grid with a depth buffer; the terminal's drawing surface
#[derive(Debug, Clone)]
pub struct Framebuffer {
    width: usize,
    height: usize,
    background: Color,
    glyphs: Vec<Glyph>,
    depth: Vec<f32>,
}

impl Framebuffer {
    pub fn new(width: usize, height: usize) -> Self {
        let size = width * height;
        Self {
            width,
            height,
            background: Color::BLACK,
            glyphs: vec![blank(Color::BLACK); size],
            depth: vec![f32::INFINITY; size],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.glyphs = vec![blank(self.background); width * height];
        self.depth = vec![f32::INFINITY; width * height];
    }

    pub fn clear(&mut self, background: Color) {
        self.background = background;
        self.glyphs.fill(blank(background));
        self.depth.fill(f32::INFINITY);
    }

    pub fn glyph(&self, x: usize, y: usize) -> Option<Glyph> {
        (x < self.width && y < self.height).then(|| self.glyphs[y * self.width + x])
    }

    /// Write a glyph if it is nearer than what the cell already holds
    pub fn plot(&mut self, x: i32, y: i32, depth: f32, glyph: Glyph) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        let idx = y as usize * self.width + x as usize;
        if depth < self.depth[idx] {
            self.depth[idx] = depth;
            self.glyphs[idx] = glyph;
        }
    }

    /// Plain-text rows, mostly useful for tests and snapshots
    pub fn lines(&self) -> Vec<String> {
        self.glyphs
            .chunks(self.width.max(1))
            .take(self.height)
            .map(|row| row.iter().map(|g| g.ch).collect())
            .collect()
    }

    pub fn draw<W: Write>(&self, writer: &mut W, top: u16) -> std::io::Result<()> {
        for y in 0..self.height {
            writer.queue(cursor::MoveTo(0, top + y as u16))?;
            let mut current = None;
            for x in 0..self.width {
                let glyph = self.glyphs[y * self.width + x];
                let color = terminal_color(glyph.color);
                if current != Some(color) {
                    writer.queue(SetForegroundColor(color))?;
                    current = Some(color);
                }
                writer.queue(Print(glyph.ch))?;
            }
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}

fn blank(background: Color) -> Glyph {
    Glyph {
        ch: ' ',
        color: background,
    }
}

fn terminal_color(color: Color) -> style::Color {
    let channel = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    style::Color::Rgb {
        r: channel(color.r),
        g: channel(color.g),
        b: channel(color.b),
    }
}

fn ramp(brightness: f32) -> char {
    if brightness < BLANK_THRESHOLD {
        return ' ';
    }
    let index = (brightness.clamp(0.0, 1.0) * (LUMINOSITY_RAMP.len() - 1) as f32).round() as usize;
    // Anything visible gets at least a dot
    LUMINOSITY_RAMP[index.clamp(1, LUMINOSITY_RAMP.len() - 1)]
}

/// Per-frame constants shared by every draw
struct Frame<'a> {
    camera: &'a Camera,
    view_projection: Matrix4<f32>,
    rig: LightRig,
    fog: Option<Fog>,
    width: u32,
    height: u32,
}

impl Frame<'_> {
    fn fogged(&self, color: Color, world: &Point3<f32>) -> Color {
        match self.fog {
            Some(fog) => {
                let distance = (world - self.camera.position).norm();
                color.lerp(fog.color, fog.factor(distance))
            }
            None => color,
        }
    }
}

/// ASCII renderer that rasterizes a scene graph into a shared [`Framebuffer`].
///
/// Cells are roughly twice as tall as they are wide, so the renderer is sized
/// in half-cells: a viewport of `w x h` maps onto `w x h/2` characters.
pub struct AsciiRenderer {
    surface: Rc<RefCell<Framebuffer>>,
    options: RendererOptions,
    pixel_ratio: f64,
    disposed: bool,
}

impl AsciiRenderer {
    pub fn new(options: &RendererOptions) -> Self {
        Self {
            surface: Rc::new(RefCell::new(Framebuffer::new(0, 0))),
            options: *options,
            pixel_ratio: 1.0,
            disposed: false,
        }
    }

    /// The character grid this renderer draws into
    pub fn surface(&self) -> &Rc<RefCell<Framebuffer>> {
        &self.surface
    }

    pub fn options(&self) -> &RendererOptions {
        &self.options
    }

    pub fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn draw_points(&self, fb: &mut Framebuffer, frame: &Frame, geometry: &Geometry, material: &Material, model: &Matrix4<f32>) {
        let mvp = frame.view_projection * model;
        let brightness = material.color().luminance().max(0.25) * material.opacity();
        let ch = ramp(brightness);
        for position in &geometry.positions {
            let Some((x, y, depth)) = frame.camera.project_with(&mvp, position, frame.width, frame.height) else {
                continue;
            };
            let world = model.transform_point(position);
            let color = frame.fogged(material.color(), &world);
            fb.plot(x as i32, y as i32, depth, Glyph { ch, color });
        }
    }

    fn draw_mesh(&self, fb: &mut Framebuffer, frame: &Frame, geometry: &Geometry, material: &Material, model: &Matrix4<f32>) {
        let mvp = frame.view_projection * model;
        for triangle in geometry.triangles() {
            self.draw_triangle(fb, frame, &triangle, material, model, &mvp);
        }
    }

    fn draw_triangle(
        &self,
        fb: &mut Framebuffer,
        frame: &Frame,
        triangle: &Triangle,
        material: &Material,
        model: &Matrix4<f32>,
        mvp: &Matrix4<f32>,
    ) {
        // Project vertices to screen space
        let mut screen = [(0.0, 0.0, 0.0); 3];
        for (slot, vertex) in screen.iter_mut().zip(&triangle.vertices) {
            match frame.camera.project_with(mvp, &vertex.position, frame.width, frame.height) {
                Some(coords) => *slot = coords,
                None => return, // Triangle is clipped
            }
        }

        let centroid = Point3::from(
            (triangle.vertices[0].position.coords + triangle.vertices[1].position.coords + triangle.vertices[2].position.coords)
                / 3.0,
        );
        let world = model.transform_point(&centroid);
        let mut normal = model
            .transform_vector(&triangle.calculate_normal())
            .try_normalize(1e-6)
            .unwrap_or_else(nalgebra::Vector3::y);
        // Surfaces are lit from whichever side faces the camera
        if normal.dot(&(frame.camera.position - world)) < 0.0 {
            normal = -normal;
        }

        let lit = material.color().modulate(frame.rig.irradiance(&normal));
        let color = frame.fogged(lit, &world);
        let fog_factor = frame
            .fog
            .map(|fog| fog.factor((world - frame.camera.position).norm()))
            .unwrap_or(0.0);
        let ch = ramp(lit.luminance() * (1.0 - fog_factor) * 2.5);

        rasterize_triangle(fb, &screen, Glyph { ch, color });
    }
}

fn rasterize_triangle(fb: &mut Framebuffer, coords: &[(f32, f32, f32); 3], glyph: Glyph) {
    let (v0, v1, v2) = (coords[0], coords[1], coords[2]);

    // Bounding box, clipped to screen bounds
    let min_x = (v0.0.min(v1.0).min(v2.0).floor() as i32).max(0);
    let max_x = (v0.0.max(v1.0).max(v2.0).ceil() as i32).min(fb.width() as i32 - 1);
    let min_y = (v0.1.min(v1.1).min(v2.1).floor() as i32).max(0);
    let max_y = (v0.1.max(v1.1).max(v2.1).ceil() as i32).min(fb.height() as i32 - 1);

    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let p = (x as f32 + 0.5, y as f32 + 0.5);
            let Some((w0, w1, w2)) = barycentric((v0.0, v0.1), (v1.0, v1.1), (v2.0, v2.1), p) else {
                continue;
            };
            if w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0 {
                let depth = w0 * v0.2 + w1 * v1.2 + w2 * v2.2;
                fb.plot(x, y, depth, glyph);
            }
        }
    }
}

/// Calculate barycentric coordinates for a point in a triangle
fn barycentric(v0: (f32, f32), v1: (f32, f32), v2: (f32, f32), p: (f32, f32)) -> Option<(f32, f32, f32)> {
    let denom = (v1.1 - v2.1) * (v0.0 - v2.0) + (v2.0 - v1.0) * (v0.1 - v2.1);

    if denom.abs() < 1e-6 {
        return None;
    }

    let w0 = ((v1.1 - v2.1) * (p.0 - v2.0) + (v2.0 - v1.0) * (p.1 - v2.1)) / denom;
    let w1 = ((v2.1 - v0.1) * (p.0 - v2.0) + (v0.0 - v2.0) * (p.1 - v2.1)) / denom;
    let w2 = 1.0 - w0 - w1;

    Some((w0, w1, w2))
}

impl Renderer for AsciiRenderer {
    fn set_size(&mut self, viewport: Viewport) {
        let rows = (viewport.height / 2).max(1) as usize;
        self.surface.borrow_mut().resize(viewport.width as usize, rows);
    }

    fn set_pixel_ratio(&mut self, ratio: f64) {
        // A character cell is the smallest unit; the ratio is recorded only
        self.pixel_ratio = ratio;
    }

    fn render(&mut self, graph: &SceneGraph, camera: &Camera) {
        if self.disposed {
            return;
        }
        let mut fb = self.surface.borrow_mut();
        fb.clear(graph.background);

        let frame = Frame {
            camera,
            view_projection: camera.projection_matrix() * camera.view_matrix(),
            rig: graph.light_rig(),
            fog: graph.fog,
            width: fb.width() as u32,
            height: fb.height() as u32,
        };

        for Drawable { geometry, material, model, .. } in graph.drawables() {
            let (Some(geometry), Some(material)) = (graph.geometry(geometry), graph.material(material)) else {
                continue;
            };
            match geometry.topology() {
                Topology::Points => self.draw_points(&mut fb, &frame, geometry, material, &model),
                Topology::Triangles => self.draw_mesh(&mut fb, &frame, geometry, material, &model),
            }
        }
    }

    // The rasterizer keeps no per-resource state; nothing to free
    fn release_geometry(&mut self, _key: healsim_core::GeometryKey) {}

    fn release_material(&mut self, _key: healsim_core::MaterialKey) {}

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.surface.borrow_mut().resize(0, 0);
        log::debug!("ascii renderer disposed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use healsim_core::{PointsMaterial, StandardMaterial, Transform};

    #[test]
    fn test_barycentric_inside_and_degenerate() {
        let (w0, w1, w2) = barycentric((0.0, 0.0), (4.0, 0.0), (0.0, 4.0), (1.0, 1.0)).unwrap();
        assert!(w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0);
        assert!((w0 + w1 + w2 - 1.0).abs() < 1e-6);
        assert!(barycentric((0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (1.0, 0.0)).is_none());
    }

    #[test]
    fn test_plot_respects_depth() {
        let mut fb = Framebuffer::new(4, 2);
        let near = Glyph { ch: '#', color: Color::WHITE };
        let far = Glyph { ch: '.', color: Color::WHITE };
        fb.plot(1, 1, 0.2, near);
        fb.plot(1, 1, 0.5, far);
        fb.plot(9, 9, 0.0, far);
        assert_eq!(fb.glyph(1, 1), Some(near));
        assert_eq!(fb.lines(), vec!["    ".to_string(), " #  ".to_string()]);
    }

    #[test]
    fn test_ramp_ends() {
        assert_eq!(ramp(0.0), ' ');
        assert_eq!(ramp(0.05), '.');
        assert_eq!(ramp(1.0), '@');
        assert_eq!(ramp(7.0), '@');
    }

    #[test]
    fn test_set_size_halves_rows() {
        let mut renderer = AsciiRenderer::new(&RendererOptions::new(Color::BLACK));
        renderer.set_size(Viewport::new(80, 48));
        let fb = renderer.surface().borrow();
        assert_eq!((fb.width(), fb.height()), (80, 24));
    }

    #[test]
    fn test_renders_mesh_in_front_of_camera() {
        let mut graph = SceneGraph::new(Color::BLACK);
        let root = graph.root();
        graph.add_light(
            healsim_core::Light::Ambient {
                color: Color::WHITE,
                intensity: 1.0,
            },
            Transform::identity(),
        );
        let plane = graph.add_geometry(Geometry::plane(4.0, 1));
        let material = graph.add_material(StandardMaterial::new(Color::WHITE, 0.5));
        graph.add_mesh(root, plane, material, Transform::identity());

        let mut renderer = AsciiRenderer::new(&RendererOptions::new(Color::BLACK));
        renderer.set_size(Viewport::new(40, 40));
        renderer.render(&graph, &Camera::new(Viewport::new(40, 40)));

        let fb = renderer.surface().borrow();
        let center = fb.glyph(20, 10).unwrap();
        assert_ne!(center.ch, ' ');
        // Corners lie outside the 4x4 plane seen from z = 5
        assert_eq!(fb.glyph(0, 0).unwrap().ch, ' ');
    }

    #[test]
    fn test_renders_points() {
        let mut graph = SceneGraph::new(Color::BLACK);
        let root = graph.root();
        let cloud = graph.add_geometry(Geometry::points(vec![Point3::origin()]));
        let material = graph.add_material(PointsMaterial::new(Color::WHITE, 0.1));
        graph.add_points(root, cloud, material);

        let mut renderer = AsciiRenderer::new(&RendererOptions::new(Color::BLACK));
        renderer.set_size(Viewport::new(20, 20));
        renderer.render(&graph, &Camera::new(Viewport::new(20, 20)));

        let lines = renderer.surface().borrow().lines();
        let lit: usize = lines.iter().map(|row| row.chars().filter(|&c| c != ' ').count()).sum();
        assert_eq!(lit, 1);
    }

    #[test]
    fn test_dispose_is_idempotent_and_stops_rendering() {
        let mut renderer = AsciiRenderer::new(&RendererOptions::new(Color::BLACK));
        renderer.set_size(Viewport::new(10, 10));
        renderer.dispose();
        renderer.dispose();
        assert!(renderer.is_disposed());
        renderer.render(&SceneGraph::new(Color::WHITE), &Camera::default());
        assert_eq!(renderer.surface().borrow().width(), 0);
    }
}
