/// WebGL2 renderer drawing a scene graph into one canvas
use std::collections::HashMap;

use healsim_core::{
    Camera, Color, Drawable, Fog, Geometry, GeometryKey, LightRig, Material, MaterialKey, Renderer, RendererOptions,
    SceneError, SceneGraph, Topology, Viewport,
};
use nalgebra::Matrix4;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    HtmlCanvasElement, WebGl2RenderingContext as GL, WebGlBuffer, WebGlProgram, WebGlShader, WebGlUniformLocation,
    WebglLoseContext,
};

use crate::shaders;

pub(crate) fn js_error(context: &str, err: JsValue) -> String {
    match err.as_string() {
        Some(message) => format!("{context}: {message}"),
        None => format!("{context}: {err:?}"),
    }
}

fn compile_shader(gl: &GL, src: &str, shader_type: u32) -> Result<WebGlShader, SceneError> {
    let shader = gl
        .create_shader(shader_type)
        .ok_or_else(|| SceneError::Renderer("could not create shader".into()))?;
    gl.shader_source(&shader, src);
    gl.compile_shader(&shader);
    if !gl
        .get_shader_parameter(&shader, GL::COMPILE_STATUS)
        .as_bool()
        .unwrap_or(false)
    {
        let log = gl.get_shader_info_log(&shader).unwrap_or_default();
        gl.delete_shader(Some(&shader));
        return Err(SceneError::Renderer(format!("shader compilation failed: {log}")));
    }
    Ok(shader)
}

/// A linked program with its uniform and attribute locations looked up once
struct Program {
    program: WebGlProgram,
    uniforms: HashMap<&'static str, WebGlUniformLocation>,
    position: u32,
    normal: Option<u32>,
}

impl Program {
    fn link(gl: &GL, vert_src: &str, frag_src: &str, uniforms: &[&'static str]) -> Result<Self, SceneError> {
        let vert = compile_shader(gl, vert_src, GL::VERTEX_SHADER)?;
        let frag = compile_shader(gl, frag_src, GL::FRAGMENT_SHADER)?;
        let program = gl
            .create_program()
            .ok_or_else(|| SceneError::Renderer("could not create program".into()))?;
        gl.attach_shader(&program, &vert);
        gl.attach_shader(&program, &frag);
        gl.link_program(&program);
        gl.delete_shader(Some(&vert));
        gl.delete_shader(Some(&frag));
        if !gl
            .get_program_parameter(&program, GL::LINK_STATUS)
            .as_bool()
            .unwrap_or(false)
        {
            let log = gl.get_program_info_log(&program).unwrap_or_default();
            gl.delete_program(Some(&program));
            return Err(SceneError::Renderer(format!("program link failed: {log}")));
        }

        let uniforms = uniforms
            .iter()
            .filter_map(|&name| gl.get_uniform_location(&program, name).map(|loc| (name, loc)))
            .collect();
        let attribute = |name: &str| u32::try_from(gl.get_attrib_location(&program, name)).ok();
        let position =
            attribute("a_position").ok_or_else(|| SceneError::Renderer("program has no a_position".into()))?;
        let normal = attribute("a_normal");

        Ok(Self {
            program,
            uniforms,
            position,
            normal,
        })
    }

    fn uniform(&self, name: &str) -> Option<&WebGlUniformLocation> {
        self.uniforms.get(name)
    }

    fn set_mat4(&self, gl: &GL, name: &str, matrix: &Matrix4<f32>) {
        gl.uniform_matrix4fv_with_f32_array(self.uniform(name), false, matrix.as_slice());
    }

    fn set_color(&self, gl: &GL, name: &str, color: Color) {
        gl.uniform3fv_with_f32_array(self.uniform(name), &color.to_array());
    }

    fn set_f32(&self, gl: &GL, name: &str, value: f32) {
        gl.uniform1f(self.uniform(name), value);
    }

    fn set_fog(&self, gl: &GL, fog: Option<Fog>) {
        let (color, near, far) = fog.map_or((Color::BLACK, 0.0, 0.0), |fog| (fog.color, fog.near, fog.far));
        self.set_color(gl, "u_fog_color", color);
        gl.uniform2f(self.uniform("u_fog_range"), near, far);
    }
}

/// GPU copies of one geometry
struct GeometryBuffers {
    position: WebGlBuffer,
    normal: Option<WebGlBuffer>,
    index: Option<WebGlBuffer>,
    count: i32,
    revision: u32,
}

fn upload_f32(gl: &GL, buffer: &WebGlBuffer, data: &[f32], usage: u32) {
    gl.bind_buffer(GL::ARRAY_BUFFER, Some(buffer));
    let array = js_sys::Float32Array::from(data);
    gl.buffer_data_with_array_buffer_view(GL::ARRAY_BUFFER, &array, usage);
}

impl GeometryBuffers {
    fn create(gl: &GL, geometry: &Geometry) -> Result<Self, SceneError> {
        let create = || gl.create_buffer().ok_or_else(|| SceneError::Renderer("could not create buffer".into()));

        let position = create()?;
        upload_f32(gl, &position, &geometry.position_data(), GL::STATIC_DRAW);

        let (normal, index, count) = match geometry.topology() {
            Topology::Points => (None, None, geometry.vertex_count() as i32),
            Topology::Triangles => {
                let normal = create()?;
                upload_f32(gl, &normal, &geometry.normal_data(), GL::STATIC_DRAW);
                let index = create()?;
                gl.bind_buffer(GL::ELEMENT_ARRAY_BUFFER, Some(&index));
                let indices = js_sys::Uint32Array::from(geometry.indices.as_slice());
                gl.buffer_data_with_array_buffer_view(GL::ELEMENT_ARRAY_BUFFER, &indices, GL::STATIC_DRAW);
                (Some(normal), Some(index), geometry.indices.len() as i32)
            }
        };

        Ok(Self {
            position,
            normal,
            index,
            count,
            revision: geometry.revision(),
        })
    }

    /// Re-upload vertex data after the geometry was displaced
    fn refresh(&mut self, gl: &GL, geometry: &Geometry) {
        upload_f32(gl, &self.position, &geometry.position_data(), GL::DYNAMIC_DRAW);
        if let Some(normal) = &self.normal {
            upload_f32(gl, normal, &geometry.normal_data(), GL::DYNAMIC_DRAW);
        }
        self.revision = geometry.revision();
    }

    fn delete(&self, gl: &GL) {
        gl.delete_buffer(Some(&self.position));
        gl.delete_buffer(self.normal.as_ref());
        gl.delete_buffer(self.index.as_ref());
    }
}

fn bind_attribute(gl: &GL, location: u32, buffer: &WebGlBuffer) {
    gl.bind_buffer(GL::ARRAY_BUFFER, Some(buffer));
    gl.enable_vertex_attrib_array(location);
    gl.vertex_attrib_pointer_with_i32(location, 3, GL::FLOAT, false, 0, 0);
}

/// Per-frame state shared by every draw call
struct FrameUniforms {
    view: Matrix4<f32>,
    projection: Matrix4<f32>,
    rig: LightRig,
    fog: Option<Fog>,
    /// Half the drawing-buffer height, for point size attenuation
    point_scale: f32,
}

pub struct WebGlRenderer {
    canvas: HtmlCanvasElement,
    gl: GL,
    points: Program,
    lit: Program,
    buffers: HashMap<GeometryKey, GeometryBuffers>,
    options: RendererOptions,
    viewport: Viewport,
    pixel_ratio: f64,
    disposed: bool,
}

impl WebGlRenderer {
    pub fn new(canvas: HtmlCanvasElement, options: &RendererOptions) -> Result<Self, SceneError> {
        let attributes = js_sys::Object::new();
        let power = if options.high_performance { "high-performance" } else { "default" };
        for (key, value) in [
            ("antialias", JsValue::from_bool(options.antialias)),
            ("powerPreference", JsValue::from_str(power)),
        ] {
            js_sys::Reflect::set(&attributes, &JsValue::from_str(key), &value)
                .map_err(|e| SceneError::Renderer(js_error("context attributes", e)))?;
        }

        let gl: GL = canvas
            .get_context_with_context_options("webgl2", &attributes)
            .map_err(|e| SceneError::Renderer(js_error("getContext", e)))?
            .ok_or_else(|| SceneError::Renderer("WebGL2 not supported".into()))?
            .dyn_into()
            .map_err(|_| SceneError::Renderer("unexpected rendering context type".into()))?;

        let points = Program::link(&gl, shaders::POINTS_VERT, shaders::POINTS_FRAG, shaders::POINTS_UNIFORMS)?;
        let lit = Program::link(&gl, shaders::LIT_VERT, shaders::LIT_FRAG, shaders::LIT_UNIFORMS)?;

        gl.enable(GL::DEPTH_TEST);
        gl.blend_func(GL::SRC_ALPHA, GL::ONE_MINUS_SRC_ALPHA);

        let style = canvas.style();
        style
            .set_property("display", "block")
            .and_then(|()| style.set_property("width", "100%"))
            .and_then(|()| style.set_property("height", "100%"))
            .map_err(|e| SceneError::Renderer(js_error("canvas style", e)))?;

        if options.shadows {
            log::debug!("shadow flags are kept on the graph; the WebGL path draws unshadowed");
        }

        Ok(Self {
            canvas,
            gl,
            points,
            lit,
            buffers: HashMap::new(),
            options: *options,
            viewport: Viewport::default(),
            pixel_ratio: 1.0,
            disposed: false,
        })
    }

    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }

    /// Whether the browser has dropped the GL context, including after dispose
    pub fn is_context_lost(&self) -> bool {
        self.gl.is_context_lost()
    }

    fn resize_drawing_buffer(&self) {
        let scale = |v: u32| ((f64::from(v) * self.pixel_ratio).round() as u32).max(1);
        self.canvas.set_width(scale(self.viewport.width));
        self.canvas.set_height(scale(self.viewport.height));
    }

    fn sync_buffers(&mut self, key: GeometryKey, geometry: &Geometry) -> Result<(), SceneError> {
        match self.buffers.get_mut(&key) {
            Some(buffers) if buffers.revision == geometry.revision() => {}
            Some(buffers) => buffers.refresh(&self.gl, geometry),
            None => {
                let buffers = GeometryBuffers::create(&self.gl, geometry)?;
                self.buffers.insert(key, buffers);
            }
        }
        Ok(())
    }

    fn draw_mesh(&self, frame: &FrameUniforms, buffers: &GeometryBuffers, material: &Material, model: &Matrix4<f32>) {
        let (gl, program) = (&self.gl, &self.lit);
        let (Some(normal_location), Some(normal), Some(index)) = (program.normal, &buffers.normal, &buffers.index) else {
            return;
        };
        gl.use_program(Some(&program.program));

        program.set_mat4(gl, "u_model", model);
        program.set_mat4(gl, "u_view", &frame.view);
        program.set_mat4(gl, "u_projection", &frame.projection);

        let (roughness, metalness) = match material {
            Material::Standard(standard) => (standard.roughness, standard.metalness),
            Material::Points(_) => (1.0, 0.0),
        };
        program.set_color(gl, "u_color", material.color());
        program.set_f32(gl, "u_roughness", roughness);
        program.set_f32(gl, "u_metalness", metalness);

        let (sky, ground) = frame.rig.hemisphere.unwrap_or((Color::BLACK, Color::BLACK));
        let (light_color, light_dir) = frame.rig.directional.unwrap_or((Color::BLACK, nalgebra::Vector3::y()));
        program.set_color(gl, "u_ambient", frame.rig.ambient);
        program.set_color(gl, "u_sky", sky);
        program.set_color(gl, "u_ground", ground);
        program.set_color(gl, "u_light_color", light_color);
        gl.uniform3f(program.uniform("u_light_dir"), light_dir.x, light_dir.y, light_dir.z);
        program.set_fog(gl, frame.fog);

        bind_attribute(gl, program.position, &buffers.position);
        bind_attribute(gl, normal_location, normal);
        gl.bind_buffer(GL::ELEMENT_ARRAY_BUFFER, Some(index));
        gl.draw_elements_with_i32(GL::TRIANGLES, buffers.count, GL::UNSIGNED_INT, 0);
        gl.disable_vertex_attrib_array(normal_location);
    }

    fn draw_points(&self, frame: &FrameUniforms, buffers: &GeometryBuffers, material: &Material, model: &Matrix4<f32>) {
        let (gl, program) = (&self.gl, &self.points);
        let Material::Points(points) = material else {
            return;
        };
        gl.use_program(Some(&program.program));

        program.set_mat4(gl, "u_model_view", &(frame.view * model));
        program.set_mat4(gl, "u_projection", &frame.projection);
        program.set_f32(gl, "u_size", points.size);
        program.set_f32(gl, "u_scale", frame.point_scale);
        gl.uniform1i(program.uniform("u_attenuate"), i32::from(points.size_attenuation));
        program.set_color(gl, "u_color", points.color);
        program.set_f32(gl, "u_opacity", points.opacity);
        program.set_fog(gl, frame.fog);

        let transparent = material.is_transparent();
        if transparent {
            gl.enable(GL::BLEND);
            gl.depth_mask(false);
        }
        bind_attribute(gl, program.position, &buffers.position);
        gl.draw_arrays(GL::POINTS, 0, buffers.count);
        if transparent {
            gl.depth_mask(true);
            gl.disable(GL::BLEND);
        }
    }
}

impl Renderer for WebGlRenderer {
    fn set_size(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.resize_drawing_buffer();
    }

    fn set_pixel_ratio(&mut self, ratio: f64) {
        self.pixel_ratio = self.options.pixel_ratio(ratio);
        self.resize_drawing_buffer();
    }

    fn render(&mut self, graph: &SceneGraph, camera: &Camera) {
        if self.disposed || self.is_context_lost() {
            return;
        }

        let mut drawables = graph.drawables();
        // Opaque meshes first so blended points depth-test against them
        drawables.sort_by_key(|d| d.points);

        for Drawable { geometry, .. } in &drawables {
            if let Some(data) = graph.geometry(*geometry) {
                if let Err(e) = self.sync_buffers(*geometry, data) {
                    log::error!("geometry upload failed: {e}");
                    return;
                }
            }
        }

        let gl = &self.gl;
        let (width, height) = (self.canvas.width(), self.canvas.height());
        gl.viewport(0, 0, width as i32, height as i32);
        let [r, g, b] = self.options.clear_color.to_array();
        gl.clear_color(r, g, b, 1.0);
        gl.clear(GL::COLOR_BUFFER_BIT | GL::DEPTH_BUFFER_BIT);

        let frame = FrameUniforms {
            view: camera.view_matrix(),
            projection: camera.projection_matrix(),
            rig: graph.light_rig(),
            fog: graph.fog,
            point_scale: height as f32 * 0.5,
        };

        for drawable in &drawables {
            let (Some(buffers), Some(material)) = (self.buffers.get(&drawable.geometry), graph.material(drawable.material))
            else {
                continue;
            };
            if drawable.points {
                self.draw_points(&frame, buffers, material, &drawable.model);
            } else {
                self.draw_mesh(&frame, buffers, material, &drawable.model);
            }
        }
    }

    fn release_geometry(&mut self, key: GeometryKey) {
        if let Some(buffers) = self.buffers.remove(&key) {
            buffers.delete(&self.gl);
        }
    }

    // Materials live in uniforms; there is no GPU object to free
    fn release_material(&mut self, _key: MaterialKey) {}

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;

        for (_, buffers) in self.buffers.drain() {
            buffers.delete(&self.gl);
        }
        self.gl.delete_program(Some(&self.points.program));
        self.gl.delete_program(Some(&self.lit.program));

        match self.gl.get_extension("WEBGL_lose_context") {
            // Extension objects have no global constructor, so `instanceof`
            // checks always fail on them.
            Ok(Some(extension)) => extension.unchecked_into::<WebglLoseContext>().lose_context(),
            Ok(None) => log::debug!("WEBGL_lose_context unavailable"),
            Err(e) => log::warn!("{}", js_error("getExtension", e)),
        }
    }
}
