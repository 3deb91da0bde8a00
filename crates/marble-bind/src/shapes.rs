//! Collision volumes from authored geometry.
//!
//! A volume is derived from a node's [`Geometry`] in one of five ways. The
//! primitive kinds fit a box, sphere or cylinder around the geometry; the mesh
//! kinds triangulate it, exactly for static scenery or as a convex hull for
//! bodies that move.

use std::fmt;
use std::str::FromStr;

use glam::Vec3;
use marble_physics::{Collider, CompoundChild, CompoundShape, Transform, TriMesh};
use marble_scene::Geometry;

use crate::ShapeError;

/// How a collision volume is derived from geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    /// Box fitted to the geometry bounds.
    Box,
    /// Sphere: the authored radius, or a sphere around the bounds.
    Sphere,
    /// Y-axis cylinder: the authored radii, or one fitted to the bounds.
    Cylinder,
    /// Exact triangles; only for bodies that never move.
    TriangleMesh,
    /// Convex hull of the triangles; usable by moving bodies.
    ConvexMesh,
}

impl ShapeKind {
    /// Canonical name, as accepted by [`FromStr`].
    pub fn as_str(self) -> &'static str {
        match self {
            ShapeKind::Box => "box",
            ShapeKind::Sphere => "sphere",
            ShapeKind::Cylinder => "cylinder",
            ShapeKind::TriangleMesh => "triangle_mesh",
            ShapeKind::ConvexMesh => "convex_mesh",
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShapeKind {
    type Err = ShapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "box" => Ok(ShapeKind::Box),
            "sphere" => Ok(ShapeKind::Sphere),
            "cylinder" => Ok(ShapeKind::Cylinder),
            "triangle_mesh" | "triangleShape" | "trimesh" => Ok(ShapeKind::TriangleMesh),
            "convex_mesh" | "convex" => Ok(ShapeKind::ConvexMesh),
            other => Err(ShapeError::UnknownKind(other.to_string())),
        }
    }
}

/// A volume and the offset of its origin from the geometry origin.
fn fitted(geometry: &Geometry, kind: ShapeKind) -> Result<(Vec3, Collider), ShapeError> {
    geometry.validate()?;
    let bounds = geometry.bounds();
    let (center, half) = (bounds.center(), bounds.half_extents());

    Ok(match (kind, geometry) {
        (ShapeKind::Box, Geometry::Box { size }) => (Vec3::ZERO, Collider::box_shape(*size * 0.5)),
        (ShapeKind::Box, _) => (center, Collider::box_shape(half)),
        (ShapeKind::Sphere, Geometry::Sphere { radius }) => (Vec3::ZERO, Collider::sphere(*radius)),
        (ShapeKind::Sphere, _) => (center, Collider::sphere(half.length())),
        (
            ShapeKind::Cylinder,
            Geometry::Cylinder {
                radius_top,
                radius_bottom,
                height,
            },
        ) => (
            Vec3::ZERO,
            Collider::cylinder(radius_top.max(*radius_bottom), height * 0.5),
        ),
        (ShapeKind::Cylinder, _) => (center, Collider::cylinder(half.x.max(half.z), half.y)),
        (ShapeKind::TriangleMesh, _) => {
            let mesh = geometry.triangulate()?;
            (
                Vec3::ZERO,
                Collider::triangle_mesh(TriMesh::new(mesh.positions, mesh.triangles)?),
            )
        }
        (ShapeKind::ConvexMesh, _) => {
            let mesh = geometry.convex_hull().triangulate()?;
            (
                Vec3::ZERO,
                Collider::convex_mesh(TriMesh::new(mesh.positions, mesh.triangles)?),
            )
        }
    })
}

/// Builds the volume for a single-volume body.
///
/// Volumes fitted to off-center geometry (an extrusion, say) come back as a
/// one-child compound so the body origin still matches the node origin.
pub fn collider_for(geometry: &Geometry, kind: ShapeKind) -> Result<Collider, ShapeError> {
    let (center, collider) = fitted(geometry, kind)?;
    if center.abs_diff_eq(Vec3::ZERO, 1e-6) {
        return Ok(collider);
    }
    let child = CompoundChild {
        local: Transform::from_position(center),
        collider,
    };
    Ok(Collider::compound(CompoundShape::new(vec![child])?))
}

/// Accumulates parts of a compound volume.
#[derive(Debug, Clone, Default)]
pub struct CompoundBuilder {
    children: Vec<CompoundChild>,
}

impl CompoundBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a part derived from `geometry`, placed at `local` relative to
    /// the compound origin.
    pub fn add_part(
        &mut self,
        local: Transform,
        geometry: &Geometry,
        kind: ShapeKind,
    ) -> Result<&mut Self, ShapeError> {
        let (center, collider) = fitted(geometry, kind)?;
        let local = local.normalized();
        self.children.push(CompoundChild {
            local: local.then(&Transform::from_position(center)),
            collider,
        });
        Ok(self)
    }

    /// Appends a ready-made volume.
    pub fn add_collider(&mut self, local: Transform, collider: Collider) -> &mut Self {
        self.children.push(CompoundChild {
            local: local.normalized(),
            collider,
        });
        self
    }

    /// Number of parts so far.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// True if no part has been added.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Freezes the parts into a compound volume.
    pub fn build(self) -> Result<Collider, ShapeError> {
        if self.children.is_empty() {
            return Err(ShapeError::EmptyCompound);
        }
        Ok(Collider::compound(CompoundShape::new(self.children)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec2};

    fn step_profile() -> Geometry {
        Geometry::Extrusion {
            outline: vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(2.0, 0.0),
                Vec2::new(2.0, 1.0),
                Vec2::new(1.0, 1.0),
                Vec2::new(1.0, 2.0),
                Vec2::new(0.0, 2.0),
            ],
            depth: 1.0,
        }
    }

    #[test]
    fn test_parse_kinds() {
        assert_eq!("box".parse::<ShapeKind>(), Ok(ShapeKind::Box));
        assert_eq!("triangleShape".parse::<ShapeKind>(), Ok(ShapeKind::TriangleMesh));
        assert_eq!(
            "pyramid".parse::<ShapeKind>(),
            Err(ShapeError::UnknownKind("pyramid".into()))
        );
        for kind in [
            ShapeKind::Box,
            ShapeKind::Sphere,
            ShapeKind::Cylinder,
            ShapeKind::TriangleMesh,
            ShapeKind::ConvexMesh,
        ] {
            assert_eq!(kind.to_string().parse::<ShapeKind>(), Ok(kind));
        }
    }

    #[test]
    fn test_primitives_from_matching_geometry() {
        let sphere = collider_for(&Geometry::Sphere { radius: 0.5 }, ShapeKind::Sphere).unwrap();
        assert!(matches!(sphere, Collider::Sphere { radius } if radius == 0.5));

        let cone = Geometry::Cylinder {
            radius_top: 0.2,
            radius_bottom: 1.0,
            height: 3.0,
        };
        let cylinder = collider_for(&cone, ShapeKind::Cylinder).unwrap();
        assert!(matches!(
            cylinder,
            Collider::Cylinder { radius, half_height } if radius == 1.0 && half_height == 1.5
        ));
    }

    #[test]
    fn test_box_around_sphere() {
        let collider = collider_for(&Geometry::Sphere { radius: 2.0 }, ShapeKind::Box).unwrap();
        assert!(matches!(collider, Collider::Box { half_extents } if half_extents == Vec3::splat(2.0)));
    }

    #[test]
    fn test_off_center_geometry_is_recentered() {
        let collider = collider_for(&step_profile(), ShapeKind::Box).unwrap();
        let Collider::Compound(compound) = collider else {
            panic!("expected compound, got {collider:?}");
        };
        let child = &compound.children()[0];
        assert_eq!(child.local.position, Vec3::new(1.0, 1.0, 0.5));
        assert!(matches!(child.collider, Collider::Box { half_extents } if half_extents == Vec3::new(1.0, 1.0, 0.5)));
    }

    #[test]
    fn test_mesh_kinds() {
        let exact = collider_for(&step_profile(), ShapeKind::TriangleMesh).unwrap();
        assert!(exact.is_static_only());
        let convex = collider_for(&step_profile(), ShapeKind::ConvexMesh).unwrap();
        assert!(!convex.is_static_only());
        let Collider::ConvexMesh(hull) = convex else {
            panic!("expected convex mesh");
        };
        // Pentagon hull extruded: 5 * 2 vertices.
        assert_eq!(hull.vertices().len(), 10);
    }

    #[test]
    fn test_invalid_geometry_is_reported() {
        let err = collider_for(&Geometry::Sphere { radius: -1.0 }, ShapeKind::Sphere).unwrap_err();
        assert!(matches!(err, ShapeError::Geometry(_)));
    }

    #[test]
    fn test_compound_parts_keep_offsets() {
        let mut builder = CompoundBuilder::new();
        let rotated = Transform::new(Vec3::new(0.0, 1.0, 0.0), Quat::from_rotation_z(0.3));
        builder
            .add_part(Transform::IDENTITY, &Geometry::Box { size: Vec3::ONE }, ShapeKind::Box)
            .unwrap()
            .add_part(rotated, &Geometry::Sphere { radius: 0.25 }, ShapeKind::Sphere)
            .unwrap();
        assert_eq!(builder.len(), 2);

        let Collider::Compound(compound) = builder.build().unwrap() else {
            panic!("expected compound");
        };
        assert!(compound.children()[1].local.approx_eq(&rotated, 1e-6));
    }

    #[test]
    fn test_off_center_part_offset_follows_rotation() {
        let mut builder = CompoundBuilder::new();
        let local = Transform::from_orientation(Quat::from_rotation_y(std::f32::consts::PI));
        builder.add_part(local, &step_profile(), ShapeKind::Box).unwrap();
        let Collider::Compound(compound) = builder.build().unwrap() else {
            panic!("expected compound");
        };
        // Bounds center (1, 1, 0.5) turned half a revolution about Y.
        let p = compound.children()[0].local.position;
        assert!(p.abs_diff_eq(Vec3::new(-1.0, 1.0, -0.5), 1e-5));
    }

    #[test]
    fn test_empty_compound() {
        assert_eq!(CompoundBuilder::new().build().unwrap_err(), ShapeError::EmptyCompound);
    }
}
