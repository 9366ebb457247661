/// Geometry primitives for scene meshes and point clouds
use nalgebra::{Point3, Vector3};
use std::f32::consts::TAU;

/// A 3D vertex with position and normal
#[derive(Debug, Clone, Copy)]
pub struct Vertex {
    pub position: Point3<f32>,
    pub normal: Vector3<f32>,
}

impl Vertex {
    pub fn new(position: Point3<f32>, normal: Vector3<f32>) -> Self {
        Self { position, normal }
    }
}

/// A triangle face defined by three vertices
#[derive(Debug, Clone)]
pub struct Triangle {
    pub vertices: [Vertex; 3],
}

impl Triangle {
    pub fn new(v0: Vertex, v1: Vertex, v2: Vertex) -> Self {
        Self {
            vertices: [v0, v1, v2],
        }
    }

    /// Calculate the face normal from the triangle's vertices
    pub fn calculate_normal(&self) -> Vector3<f32> {
        let v0 = self.vertices[0].position;
        let v1 = self.vertices[1].position;
        let v2 = self.vertices[2].position;

        let edge1 = v1 - v0;
        let edge2 = v2 - v0;

        edge1.cross(&edge2).try_normalize(1e-12).unwrap_or_else(Vector3::zeros)
    }
}

/// How the vertex stream is assembled into primitives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    Points,
    Triangles,
}

/// Vertex data for one drawable shape.
///
/// Triangle geometry is indexed; point geometry draws every position once.
/// `revision` increases whenever positions change so renderers holding a GPU
/// copy know to re-upload.
#[derive(Debug, Clone)]
pub struct Geometry {
    pub positions: Vec<Point3<f32>>,
    pub normals: Vec<Vector3<f32>>,
    pub indices: Vec<u32>,
    topology: Topology,
    revision: u32,
}

impl Geometry {
    /// A point cloud, one sprite per position
    pub fn points(positions: Vec<Point3<f32>>) -> Self {
        Self {
            positions,
            normals: Vec::new(),
            indices: Vec::new(),
            topology: Topology::Points,
            revision: 0,
        }
    }

    /// Square grid in the XY plane centred on the origin, facing +Z.
    ///
    /// Rows run from +Y to -Y, columns from -X to +X, giving
    /// `(segments + 1)^2` vertices and `2 * segments^2` triangles.
    pub fn plane(size: f32, segments: u32) -> Self {
        let segments = segments.max(1);
        let half = size / 2.0;
        let step = size / segments as f32;
        let row = segments + 1;

        let mut positions = Vec::with_capacity((row * row) as usize);
        for iy in 0..row {
            let y = half - iy as f32 * step;
            for ix in 0..row {
                positions.push(Point3::new(ix as f32 * step - half, y, 0.0));
            }
        }

        let mut indices = Vec::with_capacity((segments * segments * 6) as usize);
        for iy in 0..segments {
            for ix in 0..segments {
                let a = ix + row * iy;
                let b = ix + row * (iy + 1);
                let c = ix + 1 + row * (iy + 1);
                let d = ix + 1 + row * iy;
                indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }

        let normals = vec![Vector3::z(); positions.len()];
        Self {
            positions,
            normals,
            indices,
            topology: Topology::Triangles,
            revision: 0,
        }
    }

    /// Open-ended frustum along Y, centred on the origin, with caps on any
    /// end whose radius is non-zero.
    pub fn cylinder(radius_top: f32, radius_bottom: f32, height: f32, radial_segments: u32) -> Self {
        let radial = radial_segments.max(3);
        let half = height / 2.0;
        let slope = if height.abs() > f32::EPSILON {
            (radius_bottom - radius_top) / height
        } else {
            0.0
        };

        let mut positions = Vec::new();
        let mut normals = Vec::new();
        let mut indices = Vec::new();

        // Side wall: two rings with a duplicated seam column
        for (y, radius) in [(half, radius_top), (-half, radius_bottom)] {
            for i in 0..=radial {
                let theta = i as f32 / radial as f32 * TAU;
                let (sin, cos) = theta.sin_cos();
                positions.push(Point3::new(radius * sin, y, radius * cos));
                normals.push(Vector3::new(sin, slope, cos).normalize());
            }
        }
        let ring = radial + 1;
        for i in 0..radial {
            let a = i;
            let b = i + ring;
            let c = i + 1 + ring;
            let d = i + 1;
            indices.extend_from_slice(&[a, b, d, b, c, d]);
        }

        for (y, radius, up) in [(half, radius_top, 1.0), (-half, radius_bottom, -1.0)] {
            if radius <= 0.0 {
                continue;
            }
            let center = positions.len() as u32;
            positions.push(Point3::new(0.0, y, 0.0));
            normals.push(Vector3::new(0.0, up, 0.0));
            for i in 0..=radial {
                let theta = i as f32 / radial as f32 * TAU;
                positions.push(Point3::new(radius * theta.sin(), y, radius * theta.cos()));
                normals.push(Vector3::new(0.0, up, 0.0));
            }
            for i in 0..radial {
                let a = center + 1 + i;
                let b = center + 2 + i;
                if up > 0.0 {
                    indices.extend_from_slice(&[center, a, b]);
                } else {
                    indices.extend_from_slice(&[center, b, a]);
                }
            }
        }

        Self {
            positions,
            normals,
            indices,
            topology: Topology::Triangles,
            revision: 0,
        }
    }

    /// Cone along Y with its apex at `+height / 2`
    pub fn cone(radius: f32, height: f32, radial_segments: u32) -> Self {
        Self::cylinder(0.0, radius, height, radial_segments)
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    pub fn revision(&self) -> u32 {
        self.revision
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        match self.topology {
            Topology::Points => 0,
            Topology::Triangles => self.indices.len() / 3,
        }
    }

    /// Replace every vertex's Z with `height(x, y)`
    pub fn displace_z<F: Fn(f32, f32) -> f32>(&mut self, height: F) {
        for position in &mut self.positions {
            position.z = height(position.x, position.y);
        }
        self.revision = self.revision.wrapping_add(1);
    }

    /// Smooth normals: area-weighted average of adjacent face normals
    pub fn compute_vertex_normals(&mut self) {
        if self.topology != Topology::Triangles {
            return;
        }
        let mut normals = vec![Vector3::zeros(); self.positions.len()];
        for face in self.indices.chunks_exact(3) {
            let (a, b, c) = (face[0] as usize, face[1] as usize, face[2] as usize);
            let (Some(pa), Some(pb), Some(pc)) =
                (self.positions.get(a), self.positions.get(b), self.positions.get(c))
            else {
                continue;
            };
            let face_normal = (pb - pa).cross(&(pc - pa));
            normals[a] += face_normal;
            normals[b] += face_normal;
            normals[c] += face_normal;
        }
        for normal in &mut normals {
            *normal = normal.try_normalize(1e-12).unwrap_or_else(Vector3::z);
        }
        self.normals = normals;
        self.revision = self.revision.wrapping_add(1);
    }

    /// Positions flattened to `[x, y, z, x, y, z, ...]`
    pub fn position_data(&self) -> Vec<f32> {
        self.positions.iter().flat_map(|p| [p.x, p.y, p.z]).collect()
    }

    /// Normals flattened to `[x, y, z, ...]`
    pub fn normal_data(&self) -> Vec<f32> {
        self.normals.iter().flat_map(|n| [n.x, n.y, n.z]).collect()
    }

    /// Iterate the indexed faces as standalone triangles
    pub fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        let vertex = move |index: u32| {
            let i = index as usize;
            Vertex::new(
                self.positions[i],
                self.normals.get(i).copied().unwrap_or_else(Vector3::z),
            )
        };
        self.indices
            .chunks_exact(3)
            .filter(move |face| face.iter().all(|&i| (i as usize) < self.positions.len()))
            .map(move |face| Triangle::new(vertex(face[0]), vertex(face[1]), vertex(face[2])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_plane_counts() {
        let plane = Geometry::plane(120.0, 200);
        assert_eq!(plane.vertex_count(), 201 * 201);
        assert_eq!(plane.triangle_count(), 2 * 200 * 200);
        assert_eq!(plane.topology(), Topology::Triangles);
    }

    #[test]
    fn test_plane_extent_and_facing() {
        let plane = Geometry::plane(10.0, 4);
        let first = plane.positions[0];
        let last = plane.positions[plane.vertex_count() - 1];
        assert_relative_eq!(first.x, -5.0);
        assert_relative_eq!(first.y, 5.0);
        assert_relative_eq!(last.x, 5.0);
        assert_relative_eq!(last.y, -5.0);

        // Winding must agree with the +Z normal
        let triangle = plane.triangles().next().unwrap();
        assert_relative_eq!(triangle.calculate_normal().z, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_computed_normals_on_flat_plane() {
        let mut plane = Geometry::plane(4.0, 2);
        plane.compute_vertex_normals();
        for normal in &plane.normals {
            assert_relative_eq!(normal.z, 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_displace_bumps_revision() {
        let mut plane = Geometry::plane(4.0, 2);
        let before = plane.revision();
        plane.displace_z(|x, y| x + y);
        assert!(plane.revision() > before);
        for p in &plane.positions {
            assert_relative_eq!(p.z, p.x + p.y);
        }
    }

    #[test]
    fn test_cone_apex_and_base() {
        let cone = Geometry::cone(0.8, 1.6, 12);
        let max_y = cone.positions.iter().map(|p| p.y).fold(f32::MIN, f32::max);
        let min_y = cone.positions.iter().map(|p| p.y).fold(f32::MAX, f32::min);
        assert_relative_eq!(max_y, 0.8);
        assert_relative_eq!(min_y, -0.8);
        // Side wall plus the bottom cap only
        assert_eq!(cone.triangle_count(), 12 * 2 + 12);
    }

    #[test]
    fn test_cylinder_has_two_caps() {
        let cylinder = Geometry::cylinder(0.12, 0.18, 1.2, 8);
        assert_eq!(cylinder.triangle_count(), 8 * 2 + 8 * 2);
        assert_eq!(cylinder.normals.len(), cylinder.positions.len());
    }

    #[test]
    fn test_points_have_no_triangles() {
        let cloud = Geometry::points(vec![Point3::origin(); 5]);
        assert_eq!(cloud.vertex_count(), 5);
        assert_eq!(cloud.triangle_count(), 0);
        assert_eq!(cloud.triangles().count(), 0);
        assert_eq!(cloud.position_data().len(), 15);
    }
}
