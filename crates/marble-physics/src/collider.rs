//! Collision volumes.
//!
//! Primitive volumes (sphere, box, cylinder, plane), triangle data (exact
//! static meshes, convex meshes, height fields), and compound volumes made of
//! rigidly attached children.

use std::sync::Arc;

use glam::{Quat, Vec3};

use crate::{PhysicsError, Transform};

// ============================================================================
// Bounds
// ============================================================================

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl Aabb {
    /// Creates a box from its corners.
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Box centered at the origin with the given half extents.
    pub fn from_half_extents(half_extents: Vec3) -> Self {
        Self::new(-half_extents, half_extents)
    }

    /// Smallest box containing all points, or `None` for no points.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut aabb = Self::new(first, first);
        for p in iter {
            aabb.min = aabb.min.min(p);
            aabb.max = aabb.max.max(p);
        }
        Some(aabb)
    }

    /// Union of two boxes.
    pub fn merge(&self, other: &Aabb) -> Aabb {
        Aabb::new(self.min.min(other.min), self.max.max(other.max))
    }

    /// Grows the box by `margin` on every side.
    pub fn expand(&self, margin: f32) -> Aabb {
        Aabb::new(self.min - Vec3::splat(margin), self.max + Vec3::splat(margin))
    }

    /// True if the boxes overlap (touching counts).
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.cmple(other.max).all() && other.min.cmple(self.max).all()
    }

    /// Center point.
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Half extents.
    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Bounds of this box after applying `transform`.
    pub fn transformed(&self, transform: &Transform) -> Aabb {
        let center = transform.transform_point(self.center());
        let half = self.half_extents();
        let rot = glam::Mat3::from_quat(transform.orientation);
        let world_half = rot.col(0).abs() * half.x + rot.col(1).abs() * half.y + rot.col(2).abs() * half.z;
        Aabb::new(center - world_half, center + world_half)
    }
}

// ============================================================================
// Triangle data
// ============================================================================

/// Indexed triangle data used by mesh volumes.
#[derive(Debug, Clone, PartialEq)]
pub struct TriMesh {
    vertices: Vec<Vec3>,
    triangles: Vec<[u32; 3]>,
}

impl TriMesh {
    /// Creates a mesh, checking that it has triangles and every index is valid.
    pub fn new(vertices: Vec<Vec3>, triangles: Vec<[u32; 3]>) -> Result<Self, PhysicsError> {
        if triangles.is_empty() {
            return Err(PhysicsError::InvalidMesh("no triangles".into()));
        }
        if let Some(bad) = triangles
            .iter()
            .flatten()
            .find(|&&i| i as usize >= vertices.len())
        {
            return Err(PhysicsError::InvalidMesh(format!(
                "index {bad} out of range for {} vertices",
                vertices.len()
            )));
        }
        if vertices.iter().any(|v| !v.is_finite()) {
            return Err(PhysicsError::InvalidMesh("non-finite vertex".into()));
        }
        Ok(Self {
            vertices,
            triangles,
        })
    }

    /// Vertex positions.
    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    /// Triangle index triples.
    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    /// Corner positions of triangle `index`.
    pub fn triangle(&self, index: usize) -> [Vec3; 3] {
        let [a, b, c] = self.triangles[index];
        [
            self.vertices[a as usize],
            self.vertices[b as usize],
            self.vertices[c as usize],
        ]
    }

    /// Iterates over triangle corner positions.
    pub fn iter_triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        (0..self.triangles.len()).map(|i| self.triangle(i))
    }

    /// Bounds of the vertices.
    pub fn aabb(&self) -> Aabb {
        Aabb::from_points(self.vertices.iter().copied())
            .unwrap_or_else(|| Aabb::from_half_extents(Vec3::ZERO))
    }

    /// Returns a copy with every vertex scaled component-wise.
    pub fn scaled(&self, scale: Vec3) -> TriMesh {
        TriMesh {
            vertices: self.vertices.iter().map(|v| *v * scale).collect(),
            triangles: self.triangles.clone(),
        }
    }
}

/// Regular grid of heights, centered on the origin.
///
/// The field is shifted vertically so that the midpoint of its height range
/// sits at `y = 0`; [`HeightField::height_offset`] reports that shift so
/// visuals can match it.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightField {
    columns: usize,
    rows: usize,
    heights: Vec<f32>,
    /// Grid spacing along X and Z, and height scale along Y.
    pub cell_size: Vec3,
    min_height: f32,
    max_height: f32,
}

impl HeightField {
    /// Creates a height field with `columns * rows` samples in row-major order.
    pub fn new(
        columns: usize,
        rows: usize,
        heights: Vec<f32>,
        cell_size: Vec3,
    ) -> Result<Self, PhysicsError> {
        if columns < 2 || rows < 2 {
            return Err(PhysicsError::InvalidHeightField(format!(
                "needs at least 2x2 samples, got {columns}x{rows}"
            )));
        }
        if heights.len() != columns * rows {
            return Err(PhysicsError::InvalidHeightField(format!(
                "expected {} samples, got {}",
                columns * rows,
                heights.len()
            )));
        }
        if !cell_size.is_finite() || cell_size.cmple(Vec3::ZERO).any() {
            return Err(PhysicsError::InvalidHeightField(format!(
                "cell size must be positive, got {cell_size:?}"
            )));
        }
        let mut min_height = f32::INFINITY;
        let mut max_height = f32::NEG_INFINITY;
        for &h in &heights {
            if !h.is_finite() {
                return Err(PhysicsError::InvalidHeightField("non-finite sample".into()));
            }
            min_height = min_height.min(h);
            max_height = max_height.max(h);
        }
        Ok(Self {
            columns,
            rows,
            heights,
            cell_size,
            min_height,
            max_height,
        })
    }

    /// Number of samples along X.
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Number of samples along Z.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Lowest raw sample.
    pub fn min_height(&self) -> f32 {
        self.min_height
    }

    /// Highest raw sample.
    pub fn max_height(&self) -> f32 {
        self.max_height
    }

    /// Vertical shift applied to raw samples (in scaled units).
    pub fn height_offset(&self) -> f32 {
        (self.min_height + (self.max_height - self.min_height) * 0.5) * self.cell_size.y
    }

    fn half_size(&self) -> Vec3 {
        Vec3::new(
            (self.columns - 1) as f32 * self.cell_size.x * 0.5,
            (self.max_height - self.min_height) * self.cell_size.y * 0.5,
            (self.rows - 1) as f32 * self.cell_size.z * 0.5,
        )
    }

    /// Local-space position of sample (`column`, `row`).
    pub fn vertex(&self, column: usize, row: usize) -> Vec3 {
        let half = self.half_size();
        Vec3::new(
            column as f32 * self.cell_size.x - half.x,
            self.heights[row * self.columns + column] * self.cell_size.y - self.height_offset(),
            row as f32 * self.cell_size.z - half.z,
        )
    }

    /// Local bounds.
    pub fn aabb(&self) -> Aabb {
        Aabb::from_half_extents(self.half_size())
    }

    /// Triangles (two per cell) whose cells overlap `region` on the XZ plane.
    pub fn triangles_in(&self, region: &Aabb) -> Vec<[Vec3; 3]> {
        let half = self.half_size();
        let to_col = |x: f32| ((x + half.x) / self.cell_size.x).floor();
        let to_row = |z: f32| ((z + half.z) / self.cell_size.z).floor();
        let max_col = (self.columns - 2) as f32;
        let max_row = (self.rows - 2) as f32;

        let c0 = to_col(region.min.x).max(0.0);
        let c1 = to_col(region.max.x).min(max_col);
        let r0 = to_row(region.min.z).max(0.0);
        let r1 = to_row(region.max.z).min(max_row);
        if c0 > c1 || r0 > r1 {
            return Vec::new();
        }

        let mut out = Vec::new();
        for row in r0 as usize..=r1 as usize {
            for col in c0 as usize..=c1 as usize {
                let a = self.vertex(col, row);
                let b = self.vertex(col + 1, row);
                let c = self.vertex(col, row + 1);
                let d = self.vertex(col + 1, row + 1);
                // Counter-clockwise seen from +Y
                out.push([a, c, b]);
                out.push([b, c, d]);
            }
        }
        out
    }
}

// ============================================================================
// Compound
// ============================================================================

/// A child of a compound volume, placed relative to the compound origin.
#[derive(Debug, Clone)]
pub struct CompoundChild {
    /// Offset from the compound origin.
    pub local: Transform,
    /// Child volume.
    pub collider: Collider,
}

/// Several volumes rigidly attached to one body.
///
/// Children are fixed once the compound exists.
#[derive(Debug, Clone)]
pub struct CompoundShape {
    children: Vec<CompoundChild>,
}

impl CompoundShape {
    /// Creates a compound from at least one child.
    pub fn new(children: Vec<CompoundChild>) -> Result<Self, PhysicsError> {
        if children.is_empty() {
            return Err(PhysicsError::EmptyCompound);
        }
        Ok(Self { children })
    }

    /// The children in insertion order.
    pub fn children(&self) -> &[CompoundChild] {
        &self.children
    }
}

// ============================================================================
// Collider
// ============================================================================

/// Collision volume for rigid bodies.
#[derive(Clone, Debug)]
pub enum Collider {
    /// Sphere collider.
    Sphere {
        /// Radius of the sphere.
        radius: f32,
    },
    /// Oriented box collider.
    Box {
        /// Half-extents along each local axis.
        half_extents: Vec3,
    },
    /// Cylinder around the local Y axis.
    Cylinder {
        /// Radius in the XZ plane.
        radius: f32,
        /// Half of the height along Y.
        half_height: f32,
    },
    /// Infinite plane defined by normal and distance from origin.
    Plane {
        /// Unit normal pointing away from the solid side.
        normal: Vec3,
        /// Distance from origin along the normal.
        distance: f32,
    },
    /// Exact triangle mesh; only for immovable bodies.
    TriangleMesh(Arc<TriMesh>),
    /// Mesh treated as convex; usable by moving bodies.
    ConvexMesh(Arc<TriMesh>),
    /// Terrain grid; only for immovable bodies.
    HeightField(Arc<HeightField>),
    /// Rigid assembly of child volumes.
    Compound(Arc<CompoundShape>),
}

impl Collider {
    /// Create a sphere collider.
    pub fn sphere(radius: f32) -> Self {
        Collider::Sphere { radius }
    }

    /// Create a box collider.
    pub fn box_shape(half_extents: Vec3) -> Self {
        Collider::Box { half_extents }
    }

    /// Create a Y-axis cylinder collider.
    pub fn cylinder(radius: f32, half_height: f32) -> Self {
        Collider::Cylinder {
            radius,
            half_height,
        }
    }

    /// Create a plane collider (infinite ground plane).
    pub fn plane(normal: Vec3, distance: f32) -> Self {
        Collider::Plane {
            normal: normal.normalize(),
            distance,
        }
    }

    /// Create a ground plane at y=0.
    pub fn ground() -> Self {
        Collider::plane(Vec3::Y, 0.0)
    }

    /// Create an exact static triangle mesh collider.
    pub fn triangle_mesh(mesh: TriMesh) -> Self {
        Collider::TriangleMesh(Arc::new(mesh))
    }

    /// Create a convex mesh collider.
    pub fn convex_mesh(mesh: TriMesh) -> Self {
        Collider::ConvexMesh(Arc::new(mesh))
    }

    /// Create a height field collider.
    pub fn height_field(field: HeightField) -> Self {
        Collider::HeightField(Arc::new(field))
    }

    /// Create a compound collider.
    pub fn compound(shape: CompoundShape) -> Self {
        Collider::Compound(Arc::new(shape))
    }

    /// Short name of the variant, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Collider::Sphere { .. } => "sphere",
            Collider::Box { .. } => "box",
            Collider::Cylinder { .. } => "cylinder",
            Collider::Plane { .. } => "plane",
            Collider::TriangleMesh(_) => "triangle mesh",
            Collider::ConvexMesh(_) => "convex mesh",
            Collider::HeightField(_) => "height field",
            Collider::Compound(_) => "compound",
        }
    }

    /// True if this volume (or any compound child) may only back immovable bodies.
    pub fn is_static_only(&self) -> bool {
        match self {
            Collider::Plane { .. } | Collider::TriangleMesh(_) | Collider::HeightField(_) => true,
            Collider::Compound(c) => c.children().iter().any(|ch| ch.collider.is_static_only()),
            _ => false,
        }
    }

    /// The first static-only volume kind found, if any.
    pub(crate) fn static_only_kind(&self) -> Option<&'static str> {
        match self {
            Collider::Plane { .. } | Collider::TriangleMesh(_) | Collider::HeightField(_) => {
                Some(self.kind_name())
            }
            Collider::Compound(c) => c
                .children()
                .iter()
                .find_map(|ch| ch.collider.static_only_kind()),
            _ => None,
        }
    }

    /// Local bounds; `None` for unbounded volumes (planes, or compounds holding one).
    pub fn local_aabb(&self) -> Option<Aabb> {
        match self {
            Collider::Sphere { radius } => Some(Aabb::from_half_extents(Vec3::splat(*radius))),
            Collider::Box { half_extents } => Some(Aabb::from_half_extents(*half_extents)),
            Collider::Cylinder {
                radius,
                half_height,
            } => Some(Aabb::from_half_extents(Vec3::new(
                *radius,
                *half_height,
                *radius,
            ))),
            Collider::Plane { .. } => None,
            Collider::TriangleMesh(mesh) | Collider::ConvexMesh(mesh) => Some(mesh.aabb()),
            Collider::HeightField(field) => Some(field.aabb()),
            Collider::Compound(compound) => {
                let mut out: Option<Aabb> = None;
                for child in compound.children() {
                    let child_aabb = child.collider.local_aabb()?.transformed(&child.local);
                    out = Some(match out {
                        Some(acc) => acc.merge(&child_aabb),
                        None => child_aabb,
                    });
                }
                out
            }
        }
    }

    /// Returns a copy with local scaling baked in.
    ///
    /// Scaling has to happen before the volume is attached to a body because
    /// inertia and margins are derived from the scaled dimensions. Spheres take
    /// the largest scale component; rotated compound children are scaled along
    /// their own axes, which is exact only for axis-aligned children.
    pub fn scaled(&self, scale: Vec3) -> Result<Collider, PhysicsError> {
        if !scale.is_finite() || scale.cmple(Vec3::ZERO).any() {
            return Err(PhysicsError::InvalidScale(scale.to_array()));
        }
        if scale == Vec3::ONE {
            return Ok(self.clone());
        }
        Ok(match self {
            Collider::Sphere { radius } => Collider::Sphere {
                radius: radius * scale.max_element(),
            },
            Collider::Box { half_extents } => Collider::Box {
                half_extents: *half_extents * scale,
            },
            Collider::Cylinder {
                radius,
                half_height,
            } => Collider::Cylinder {
                radius: radius * scale.x.max(scale.z),
                half_height: half_height * scale.y,
            },
            Collider::Plane { normal, distance } => {
                let n = (*normal / scale).normalize();
                Collider::Plane {
                    normal: n,
                    distance: distance * (n * scale).length().max(f32::EPSILON),
                }
            }
            Collider::TriangleMesh(mesh) => Collider::TriangleMesh(Arc::new(mesh.scaled(scale))),
            Collider::ConvexMesh(mesh) => Collider::ConvexMesh(Arc::new(mesh.scaled(scale))),
            Collider::HeightField(field) => {
                let mut field = (**field).clone();
                field.cell_size *= scale;
                Collider::HeightField(Arc::new(field))
            }
            Collider::Compound(compound) => {
                let children = compound
                    .children()
                    .iter()
                    .map(|child| {
                        let child_scale = rotated_scale(child.local.orientation, scale);
                        Ok(CompoundChild {
                            local: Transform::new(
                                child.local.position * scale,
                                child.local.orientation,
                            ),
                            collider: child.collider.scaled(child_scale)?,
                        })
                    })
                    .collect::<Result<Vec<_>, PhysicsError>>()?;
                Collider::Compound(Arc::new(CompoundShape::new(children)?))
            }
        })
    }
}

/// Parent-space scale expressed along a rotated child's axes.
fn rotated_scale(orientation: Quat, scale: Vec3) -> Vec3 {
    let rot = glam::Mat3::from_quat(orientation);
    Vec3::new(
        (rot.col(0) * scale).length(),
        (rot.col(1) * scale).length(),
        (rot.col(2) * scale).length(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn unit_quad() -> TriMesh {
        TriMesh::new(
            vec![
                Vec3::new(-1.0, 0.0, -1.0),
                Vec3::new(1.0, 0.0, -1.0),
                Vec3::new(1.0, 0.0, 1.0),
                Vec3::new(-1.0, 0.0, 1.0),
            ],
            vec![[0, 2, 1], [0, 3, 2]],
        )
        .unwrap()
    }

    #[test]
    fn test_trimesh_rejects_bad_index() {
        let err = TriMesh::new(vec![Vec3::ZERO], vec![[0, 1, 2]]).unwrap_err();
        assert!(matches!(err, PhysicsError::InvalidMesh(_)));
    }

    #[test]
    fn test_trimesh_rejects_empty() {
        assert!(TriMesh::new(vec![Vec3::ZERO], vec![]).is_err());
    }

    #[test]
    fn test_compound_aabb() {
        let compound = CompoundShape::new(vec![
            CompoundChild {
                local: Transform::from_position(Vec3::X * 2.0),
                collider: Collider::sphere(1.0),
            },
            CompoundChild {
                local: Transform::from_position(Vec3::NEG_X * 2.0),
                collider: Collider::box_shape(Vec3::splat(0.5)),
            },
        ])
        .unwrap();
        let aabb = Collider::compound(compound).local_aabb().unwrap();
        assert_eq!(aabb.min, Vec3::new(-2.5, -1.0, -1.0));
        assert_eq!(aabb.max, Vec3::new(3.0, 1.0, 1.0));
    }

    #[test]
    fn test_empty_compound_rejected() {
        assert_eq!(
            CompoundShape::new(Vec::new()).unwrap_err(),
            PhysicsError::EmptyCompound
        );
    }

    #[test]
    fn test_compound_with_mesh_is_static_only() {
        let compound = CompoundShape::new(vec![CompoundChild {
            local: Transform::IDENTITY,
            collider: Collider::triangle_mesh(unit_quad()),
        }])
        .unwrap();
        assert!(Collider::compound(compound).is_static_only());
        assert!(!Collider::convex_mesh(unit_quad()).is_static_only());
    }

    #[test]
    fn test_scaled_box_and_compound_offsets() {
        let scaled = Collider::box_shape(Vec3::ONE)
            .scaled(Vec3::new(2.0, 3.0, 4.0))
            .unwrap();
        match scaled {
            Collider::Box { half_extents } => assert_eq!(half_extents, Vec3::new(2.0, 3.0, 4.0)),
            other => panic!("unexpected {other:?}"),
        }

        let compound = CompoundShape::new(vec![CompoundChild {
            local: Transform::new(Vec3::X, Quat::from_rotation_z(FRAC_PI_2)),
            collider: Collider::box_shape(Vec3::new(1.0, 0.5, 0.5)),
        }])
        .unwrap();
        let scaled = Collider::compound(compound)
            .scaled(Vec3::new(2.0, 1.0, 1.0))
            .unwrap();
        let Collider::Compound(c) = scaled else {
            panic!("expected compound");
        };
        let child = &c.children()[0];
        assert!((child.local.position - Vec3::X * 2.0).length() < 1e-6);
        // The child's local Y axis lies along parent X, so it picks up the 2x.
        let Collider::Box { half_extents } = child.collider else {
            panic!("expected box");
        };
        assert!((half_extents - Vec3::new(1.0, 1.0, 0.5)).length() < 1e-5);
    }

    #[test]
    fn test_invalid_scale() {
        assert!(Collider::sphere(1.0).scaled(Vec3::new(1.0, 0.0, 1.0)).is_err());
        assert!(Collider::sphere(1.0).scaled(Vec3::splat(f32::NAN)).is_err());
    }

    #[test]
    fn test_height_field_centering() {
        let field = HeightField::new(2, 2, vec![0.0, 2.0, 4.0, 2.0], Vec3::ONE).unwrap();
        assert_eq!(field.height_offset(), 2.0);
        let aabb = field.aabb();
        assert_eq!(aabb.min.y, -2.0);
        assert_eq!(aabb.max.y, 2.0);
        assert_eq!(field.vertex(0, 0), Vec3::new(-0.5, -2.0, -0.5));
        assert_eq!(field.vertex(0, 1), Vec3::new(-0.5, 2.0, 0.5));
    }

    #[test]
    fn test_height_field_triangles_in_region() {
        let field = HeightField::new(3, 3, vec![0.0; 9], Vec3::ONE).unwrap();
        let all = field.triangles_in(&Aabb::from_half_extents(Vec3::splat(5.0)));
        assert_eq!(all.len(), 8);
        let one_cell = field.triangles_in(&Aabb::new(
            Vec3::new(-0.9, -1.0, -0.9),
            Vec3::new(-0.1, 1.0, -0.1),
        ));
        assert_eq!(one_cell.len(), 2);
    }

    #[test]
    fn test_height_field_rejects_mismatch() {
        assert!(HeightField::new(2, 2, vec![0.0; 3], Vec3::ONE).is_err());
        assert!(HeightField::new(1, 2, vec![0.0; 2], Vec3::ONE).is_err());
    }

    #[test]
    fn test_aabb_transformed() {
        let aabb = Aabb::from_half_extents(Vec3::new(2.0, 1.0, 1.0));
        let t = Transform::new(Vec3::Y, Quat::from_rotation_z(FRAC_PI_2));
        let out = aabb.transformed(&t);
        assert!((out.half_extents() - Vec3::new(1.0, 2.0, 1.0)).length() < 1e-5);
        assert!((out.center() - Vec3::Y).length() < 1e-6);
    }
}
