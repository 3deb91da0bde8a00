//! Authored geometry.
//!
//! Surfaces are described the way the course author writes them (a box size,
//! a sphere radius, an extruded outline) and can be triangulated for mesh
//! volumes. Primitives are centered on the node origin; extrusions run from
//! `z = 0` to `z = depth`.

use std::f32::consts::{PI, TAU};

use glam::{Vec2, Vec3};
use marble_physics::Aabb;

use crate::SceneError;

/// Divisions around round primitives.
const SEGMENTS: u32 = 24;
/// Latitude divisions of spheres.
const RINGS: u32 = 12;

/// Indexed triangle data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    /// Vertex positions.
    pub positions: Vec<Vec3>,
    /// Triangles as index triples, counter-clockwise seen from outside.
    pub triangles: Vec<[u32; 3]>,
}

impl MeshData {
    /// Creates mesh data.
    pub fn new(positions: Vec<Vec3>, triangles: Vec<[u32; 3]>) -> Self {
        Self {
            positions,
            triangles,
        }
    }

    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    fn vertex(&mut self, p: Vec3) -> u32 {
        self.positions.push(p);
        (self.positions.len() - 1) as u32
    }

    fn triangle(&mut self, a: u32, b: u32, c: u32) {
        self.triangles.push([a, b, c]);
    }

    fn quad(&mut self, a: u32, b: u32, c: u32, d: u32) {
        self.triangle(a, b, c);
        self.triangle(a, c, d);
    }
}

/// Surface description of a visual node.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// Box with full edge lengths.
    Box {
        /// Edge lengths along each axis.
        size: Vec3,
    },
    /// Sphere.
    Sphere {
        /// Radius.
        radius: f32,
    },
    /// Cylinder or truncated cone along Y.
    Cylinder {
        /// Radius at `+height / 2`.
        radius_top: f32,
        /// Radius at `-height / 2`.
        radius_bottom: f32,
        /// Height.
        height: f32,
    },
    /// Flat outline in the XY plane pushed along +Z.
    Extrusion {
        /// Closed outline; the closing edge is implied.
        outline: Vec<Vec2>,
        /// Extrusion distance.
        depth: f32,
    },
    /// Arbitrary triangles.
    Mesh(MeshData),
}

impl Geometry {
    /// Checks dimensions and data.
    pub fn validate(&self) -> Result<(), SceneError> {
        let positive = |v: f32| v.is_finite() && v > 0.0;
        match self {
            Geometry::Box { size } => {
                if !size.is_finite() || size.cmple(Vec3::ZERO).any() {
                    return Err(SceneError::InvalidGeometry(format!("box size {size}")));
                }
            }
            Geometry::Sphere { radius } => {
                if !positive(*radius) {
                    return Err(SceneError::InvalidGeometry(format!("sphere radius {radius}")));
                }
            }
            Geometry::Cylinder {
                radius_top,
                radius_bottom,
                height,
            } => {
                let radii_ok = radius_top.is_finite()
                    && radius_bottom.is_finite()
                    && *radius_top >= 0.0
                    && *radius_bottom >= 0.0
                    && radius_top.max(*radius_bottom) > 0.0;
                if !radii_ok || !positive(*height) {
                    return Err(SceneError::InvalidGeometry(format!(
                        "cylinder radii {radius_top}/{radius_bottom}, height {height}"
                    )));
                }
            }
            Geometry::Extrusion { outline, depth } => {
                if !positive(*depth) {
                    return Err(SceneError::InvalidGeometry(format!("extrusion depth {depth}")));
                }
                if closed_outline(outline).len() < 3 || outline.iter().any(|p| !p.is_finite()) {
                    return Err(SceneError::InvalidGeometry(
                        "extrusion outline needs three finite points".into(),
                    ));
                }
            }
            Geometry::Mesh(mesh) => {
                if mesh.triangles.is_empty() {
                    return Err(SceneError::InvalidGeometry("mesh has no triangles".into()));
                }
                let count = mesh.positions.len();
                if mesh.triangles.iter().flatten().any(|&i| i as usize >= count) {
                    return Err(SceneError::InvalidGeometry(format!(
                        "mesh index out of range for {count} vertices"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Local bounds.
    pub fn bounds(&self) -> Aabb {
        match self {
            Geometry::Box { size } => Aabb::from_half_extents(*size * 0.5),
            Geometry::Sphere { radius } => Aabb::from_half_extents(Vec3::splat(*radius)),
            Geometry::Cylinder {
                radius_top,
                radius_bottom,
                height,
            } => {
                let r = radius_top.max(*radius_bottom);
                Aabb::from_half_extents(Vec3::new(r, height * 0.5, r))
            }
            Geometry::Extrusion { outline, depth } => {
                let points = outline
                    .iter()
                    .flat_map(|p| [p.extend(0.0), p.extend(*depth)]);
                Aabb::from_points(points).unwrap_or_else(|| Aabb::from_half_extents(Vec3::ZERO))
            }
            Geometry::Mesh(mesh) => Aabb::from_points(mesh.positions.iter().copied())
                .unwrap_or_else(|| Aabb::from_half_extents(Vec3::ZERO)),
        }
    }

    /// Radius of the smallest origin-centered sphere containing the surface.
    pub fn bounding_radius(&self) -> f32 {
        match self {
            Geometry::Box { size } => (*size * 0.5).length(),
            Geometry::Sphere { radius } => *radius,
            Geometry::Cylinder {
                radius_top,
                radius_bottom,
                height,
            } => {
                let h = height * 0.5;
                Vec2::new(*radius_top, h)
                    .length()
                    .max(Vec2::new(*radius_bottom, h).length())
            }
            Geometry::Extrusion { outline, depth } => outline
                .iter()
                .map(|p| p.extend(*depth).length().max(p.length()))
                .fold(0.0, f32::max),
            Geometry::Mesh(mesh) => mesh.positions.iter().map(|p| p.length()).fold(0.0, f32::max),
        }
    }

    /// The smallest convex geometry of the same kind enclosing this one.
    ///
    /// Extrusions use the convex hull of their outline. Primitives are already
    /// convex, and mesh data is taken as given.
    pub fn convex_hull(&self) -> Geometry {
        match self {
            Geometry::Extrusion { outline, depth } => Geometry::Extrusion {
                outline: convex_hull_2d(outline),
                depth: *depth,
            },
            other => other.clone(),
        }
    }

    /// Triangulates the surface.
    pub fn triangulate(&self) -> Result<MeshData, SceneError> {
        self.validate()?;
        Ok(match self {
            Geometry::Box { size } => box_mesh(*size * 0.5),
            Geometry::Sphere { radius } => uv_sphere(*radius, SEGMENTS, RINGS),
            Geometry::Cylinder {
                radius_top,
                radius_bottom,
                height,
            } => cylinder(*radius_top, *radius_bottom, *height, SEGMENTS),
            Geometry::Extrusion { outline, depth } => extrude(outline, *depth)?,
            Geometry::Mesh(mesh) => mesh.clone(),
        })
    }
}

// ============================================================================
// Primitive meshes
// ============================================================================

fn box_mesh(h: Vec3) -> MeshData {
    let mut mesh = MeshData::default();
    // Corner i has +x if bit 0, +y if bit 1, +z if bit 2.
    for i in 0..8 {
        let sx = if i & 1 != 0 { h.x } else { -h.x };
        let sy = if i & 2 != 0 { h.y } else { -h.y };
        let sz = if i & 4 != 0 { h.z } else { -h.z };
        mesh.vertex(Vec3::new(sx, sy, sz));
    }
    mesh.quad(0, 4, 6, 2); // -X
    mesh.quad(1, 3, 7, 5); // +X
    mesh.quad(0, 1, 5, 4); // -Y
    mesh.quad(2, 6, 7, 3); // +Y
    mesh.quad(0, 2, 3, 1); // -Z
    mesh.quad(4, 5, 7, 6); // +Z
    mesh
}

fn uv_sphere(radius: f32, segments: u32, rings: u32) -> MeshData {
    let mut mesh = MeshData::default();
    for ring in 0..=rings {
        let phi = PI * ring as f32 / rings as f32;
        for segment in 0..=segments {
            let theta = TAU * segment as f32 / segments as f32;
            let p = Vec3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin());
            mesh.vertex(p * radius);
        }
    }

    let stride = segments + 1;
    for ring in 0..rings {
        for segment in 0..segments {
            let i0 = ring * stride + segment;
            let i1 = i0 + 1;
            let i2 = i0 + stride;
            let i3 = i2 + 1;
            if ring == 0 {
                mesh.triangle(i0, i3, i2);
            } else if ring == rings - 1 {
                mesh.triangle(i0, i1, i2);
            } else {
                mesh.quad(i0, i1, i3, i2);
            }
        }
    }
    mesh
}

fn cylinder(radius_top: f32, radius_bottom: f32, height: f32, segments: u32) -> MeshData {
    let mut mesh = MeshData::default();
    let h = height * 0.5;
    let ring = |mesh: &mut MeshData, radius: f32, y: f32| -> Vec<u32> {
        (0..segments)
            .map(|i| {
                let angle = TAU * i as f32 / segments as f32;
                mesh.vertex(Vec3::new(angle.cos() * radius, y, angle.sin() * radius))
            })
            .collect()
    };
    let bottom = ring(&mut mesh, radius_bottom, -h);
    let top = ring(&mut mesh, radius_top, h);
    let bottom_center = mesh.vertex(Vec3::new(0.0, -h, 0.0));
    let top_center = mesh.vertex(Vec3::new(0.0, h, 0.0));

    for i in 0..segments as usize {
        let j = (i + 1) % segments as usize;
        mesh.quad(bottom[i], top[i], top[j], bottom[j]);
        if radius_top > 0.0 {
            mesh.triangle(top_center, top[j], top[i]);
        }
        if radius_bottom > 0.0 {
            mesh.triangle(bottom_center, bottom[i], bottom[j]);
        }
    }
    mesh
}

/// Drops a repeated closing point.
fn closed_outline(outline: &[Vec2]) -> &[Vec2] {
    match outline {
        [first, .., last] if outline.len() > 3 && first.abs_diff_eq(*last, 1e-6) => {
            &outline[..outline.len() - 1]
        }
        _ => outline,
    }
}

fn signed_area(points: &[Vec2]) -> f32 {
    let n = points.len();
    (0..n)
        .map(|i| points[i].perp_dot(points[(i + 1) % n]))
        .sum::<f32>()
        * 0.5
}

fn extrude(outline: &[Vec2], depth: f32) -> Result<MeshData, SceneError> {
    let mut points = closed_outline(outline).to_vec();
    let area = signed_area(&points);
    if area.abs() <= f32::EPSILON {
        return Err(SceneError::InvalidGeometry("extrusion outline has no area".into()));
    }
    if area < 0.0 {
        points.reverse();
    }
    let caps = ear_clip(&points)?;

    let mut mesh = MeshData::default();
    let n = points.len() as u32;
    for p in &points {
        mesh.vertex(p.extend(0.0));
    }
    for p in &points {
        mesh.vertex(p.extend(depth));
    }
    for [a, b, c] in caps {
        let (a, b, c) = (a as u32, b as u32, c as u32);
        mesh.triangle(n + a, n + b, n + c);
        mesh.triangle(c, b, a);
    }
    for i in 0..n {
        let j = (i + 1) % n;
        mesh.quad(i, j, n + j, n + i);
    }
    Ok(mesh)
}

/// Triangulates a counter-clockwise simple polygon by ear clipping.
fn ear_clip(points: &[Vec2]) -> Result<Vec<[usize; 3]>, SceneError> {
    let mut remaining: Vec<usize> = (0..points.len()).collect();
    let mut triangles = Vec::with_capacity(points.len().saturating_sub(2));

    while remaining.len() > 3 {
        let n = remaining.len();
        let ear = (0..n).find(|&i| {
            let (a, b, c) = (
                remaining[(i + n - 1) % n],
                remaining[i],
                remaining[(i + 1) % n],
            );
            let (pa, pb, pc) = (points[a], points[b], points[c]);
            if (pb - pa).perp_dot(pc - pb) <= 0.0 {
                return false;
            }
            !remaining
                .iter()
                .filter(|&&k| k != a && k != b && k != c)
                .any(|&k| point_in_triangle(points[k], pa, pb, pc))
        });
        let Some(i) = ear else {
            return Err(SceneError::InvalidGeometry(
                "extrusion outline is self-intersecting".into(),
            ));
        };
        triangles.push([remaining[(i + n - 1) % n], remaining[i], remaining[(i + 1) % n]]);
        remaining.remove(i);
    }
    triangles.push([remaining[0], remaining[1], remaining[2]]);
    Ok(triangles)
}

fn point_in_triangle(p: Vec2, a: Vec2, b: Vec2, c: Vec2) -> bool {
    let d1 = (b - a).perp_dot(p - a);
    let d2 = (c - b).perp_dot(p - b);
    let d3 = (a - c).perp_dot(p - c);
    let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    !(has_neg && has_pos)
}

/// Counter-clockwise convex hull (monotone chain).
fn convex_hull_2d(points: &[Vec2]) -> Vec<Vec2> {
    let mut sorted = points.to_vec();
    sorted.sort_by(|a, b| a.x.total_cmp(&b.x).then_with(|| a.y.total_cmp(&b.y)));
    sorted.dedup_by(|a, b| a.abs_diff_eq(*b, 1e-6));
    if sorted.len() < 3 {
        return sorted;
    }

    let turn = |o: Vec2, a: Vec2, b: Vec2| (a - o).perp_dot(b - o);
    let mut lower: Vec<Vec2> = Vec::new();
    for p in &sorted {
        while lower.len() >= 2 && turn(lower[lower.len() - 2], lower[lower.len() - 1], *p) <= 0.0 {
            lower.pop();
        }
        lower.push(*p);
    }
    let mut upper: Vec<Vec2> = Vec::new();
    for p in sorted.iter().rev() {
        while upper.len() >= 2 && turn(upper[upper.len() - 2], upper[upper.len() - 1], *p) <= 0.0 {
            upper.pop();
        }
        upper.push(*p);
    }
    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}
