//! Collision detection functions.
//!
//! Narrow-phase collision tests between pairs of volumes, returning `Contact`
//! points with normals and depths. Compound volumes are expanded into
//! world-space leaves first; every supported leaf pair is then tested in
//! either order.
//!
//! All contact normals point from body B toward body A, so pushing A along the
//! normal separates the pair.

use glam::{Mat3, Quat, Vec3};

use crate::{Aabb, BodyHandle, Collider, HeightField, Transform, TriMesh};

/// A contact point between two bodies.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Contact {
    /// First body.
    pub body_a: BodyHandle,
    /// Second body.
    pub body_b: BodyHandle,
    /// Contact point in world space.
    pub point: Vec3,
    /// Contact normal (from B toward A).
    pub normal: Vec3,
    /// Penetration depth.
    pub depth: f32,
}

impl Contact {
    /// Flip a contact to swap bodies and invert normal.
    ///
    /// Used to handle symmetric collision pairs (e.g., sphere-plane vs plane-sphere).
    #[inline]
    pub fn flip(mut self) -> Self {
        self.normal = -self.normal;
        std::mem::swap(&mut self.body_a, &mut self.body_b);
        self
    }
}

// ============================================================================
// Leaves
// ============================================================================

/// A non-compound volume placed in world space.
#[derive(Clone, Debug)]
pub struct Leaf<'a> {
    /// Owning body.
    pub body: BodyHandle,
    /// World placement of the volume.
    pub transform: Transform,
    /// The volume itself; never a compound.
    pub collider: &'a Collider,
    /// World bounds; `None` for planes.
    pub aabb: Option<Aabb>,
}

/// Flattens `collider` (recursing through compounds) into world-space leaves.
pub fn expand_leaves<'a>(
    body: BodyHandle,
    transform: Transform,
    collider: &'a Collider,
    out: &mut Vec<Leaf<'a>>,
) {
    match collider {
        Collider::Compound(compound) => {
            for child in compound.children() {
                expand_leaves(body, transform.then(&child.local), &child.collider, out);
            }
        }
        _ => out.push(Leaf {
            body,
            transform,
            collider,
            aabb: collider.local_aabb().map(|a| a.transformed(&transform)),
        }),
    }
}

/// Appends every contact between two leaves to `out`.
///
/// Unsupported volume pairs produce nothing.
pub fn collide_leaves(a: &Leaf<'_>, b: &Leaf<'_>, out: &mut Vec<Contact>) {
    if let (Some(aa), Some(bb)) = (&a.aabb, &b.aabb) {
        if !aa.overlaps(bb) {
            return;
        }
    }
    let start = out.len();
    if !collide_ordered(a, b, out) && collide_ordered(b, a, out) {
        for contact in &mut out[start..] {
            *contact = contact.flip();
        }
    }
}

/// Tests `a` against `b` if the pair is handled in this order.
fn collide_ordered(a: &Leaf<'_>, b: &Leaf<'_>, out: &mut Vec<Contact>) -> bool {
    let (ta, tb) = (&a.transform, &b.transform);
    match (a.collider, b.collider) {
        (Collider::Sphere { radius: r1 }, Collider::Sphere { radius: r2 }) => {
            out.extend(sphere_sphere(a.body, b.body, ta.position, *r1, tb.position, *r2));
        }
        (Collider::Sphere { radius }, Collider::Plane { normal, distance }) => {
            let (n, d) = world_plane(tb, *normal, *distance);
            out.extend(sphere_plane(a.body, b.body, ta.position, *radius, n, d));
        }
        (Collider::Sphere { radius }, Collider::Box { half_extents }) => {
            out.extend(sphere_box(
                a.body,
                b.body,
                ta.position,
                *radius,
                tb.position,
                tb.orientation,
                *half_extents,
            ));
        }
        (
            Collider::Sphere { radius },
            Collider::Cylinder {
                radius: cyl_radius,
                half_height,
            },
        ) => {
            out.extend(sphere_cylinder(
                a.body,
                b.body,
                ta.position,
                *radius,
                tb,
                *cyl_radius,
                *half_height,
            ));
        }
        (Collider::Sphere { radius }, Collider::TriangleMesh(mesh)) => {
            sphere_trimesh(a.body, b.body, ta.position, *radius, tb, mesh, out);
        }
        (Collider::Sphere { radius }, Collider::ConvexMesh(mesh)) => {
            out.extend(sphere_convex(a.body, b.body, ta.position, *radius, tb, mesh));
        }
        (Collider::Sphere { radius }, Collider::HeightField(field)) => {
            sphere_height_field(a.body, b.body, ta.position, *radius, tb, field, out);
        }
        (Collider::Box { half_extents }, Collider::Plane { normal, distance }) => {
            let (n, d) = world_plane(tb, *normal, *distance);
            box_plane(a.body, b.body, ta.position, ta.orientation, *half_extents, n, d, out);
        }
        (Collider::Box { half_extents: he1 }, Collider::Box { half_extents: he2 }) => {
            box_box(a.body, b.body, ta, *he1, tb, *he2, out);
        }
        (Collider::Box { half_extents }, Collider::TriangleMesh(mesh)) => {
            let corners = box_corners(ta, *half_extents);
            let local = corners.map(|c| tb.inverse_transform_point(c));
            let region = Aabb::from_points(local).unwrap_or_else(|| Aabb::from_half_extents(Vec3::ZERO));
            let triangles = mesh
                .iter_triangles()
                .filter(|tri| Aabb::from_points(*tri).is_some_and(|t| t.overlaps(&region)));
            points_vs_triangles(
                a.body,
                b.body,
                &corners,
                tb,
                triangles,
                half_extents.max_element(),
                out,
            );
        }
        (Collider::Box { half_extents }, Collider::HeightField(field)) => {
            let corners = box_corners(ta, *half_extents);
            let local = corners.map(|c| tb.inverse_transform_point(c));
            let region = Aabb::from_points(local).unwrap_or_else(|| Aabb::from_half_extents(Vec3::ZERO));
            points_vs_triangles(
                a.body,
                b.body,
                &corners,
                tb,
                field.triangles_in(&region).into_iter(),
                half_extents.max_element(),
                out,
            );
        }
        (
            Collider::Cylinder {
                radius,
                half_height,
            },
            Collider::Plane { normal, distance },
        ) => {
            let (n, d) = world_plane(tb, *normal, *distance);
            cylinder_plane(a.body, b.body, ta, *radius, *half_height, n, d, out);
        }
        (Collider::ConvexMesh(mesh), Collider::Plane { normal, distance }) => {
            let (n, d) = world_plane(tb, *normal, *distance);
            let points = mesh.vertices().iter().map(|v| ta.transform_point(*v));
            points_below_plane(a.body, b.body, points, n, d, out);
        }
        _ => return false,
    }
    true
}

/// Plane normal and distance after placing the plane with `transform`.
fn world_plane(transform: &Transform, normal: Vec3, distance: f32) -> (Vec3, f32) {
    let n = transform.orientation * normal;
    (n, distance + n.dot(transform.position))
}

// ============================================================================
// Primitive pairs
// ============================================================================

/// Test sphere-sphere collision.
pub fn sphere_sphere(
    a: BodyHandle,
    b: BodyHandle,
    pos_a: Vec3,
    radius_a: f32,
    pos_b: Vec3,
    radius_b: f32,
) -> Option<Contact> {
    let d = pos_a - pos_b;
    let dist_sq = d.length_squared();
    let radius_sum = radius_a + radius_b;

    if dist_sq < radius_sum * radius_sum {
        let dist = dist_sq.sqrt();
        let normal = if dist > 0.0 { d / dist } else { Vec3::Y };
        let depth = radius_sum - dist;
        let point = pos_a - normal * radius_a;

        Some(Contact {
            body_a: a,
            body_b: b,
            point,
            normal,
            depth,
        })
    } else {
        None
    }
}

/// Test sphere-plane collision.
pub fn sphere_plane(
    sphere: BodyHandle,
    plane: BodyHandle,
    sphere_pos: Vec3,
    radius: f32,
    plane_normal: Vec3,
    plane_dist: f32,
) -> Option<Contact> {
    let dist = sphere_pos.dot(plane_normal) - plane_dist;

    if dist < radius {
        let depth = radius - dist;
        let point = sphere_pos - plane_normal * dist;

        Some(Contact {
            body_a: sphere,
            body_b: plane,
            point,
            normal: plane_normal,
            depth,
        })
    } else {
        None
    }
}

/// Test sphere-box collision.
pub fn sphere_box(
    sphere: BodyHandle,
    box_body: BodyHandle,
    sphere_pos: Vec3,
    radius: f32,
    box_pos: Vec3,
    box_rot: Quat,
    half_extents: Vec3,
) -> Option<Contact> {
    // Transform sphere to box local space
    let inv_rot = box_rot.inverse();
    let local_pos = inv_rot * (sphere_pos - box_pos);

    let clamped = local_pos.clamp(-half_extents, half_extents);
    let diff = local_pos - clamped;
    let dist_sq = diff.length_squared();

    if dist_sq >= radius * radius {
        return None;
    }

    let dist = dist_sq.sqrt();
    let (local_normal, depth, surface) = if dist > 0.0 {
        (diff / dist, radius - dist, clamped)
    } else {
        // Sphere center inside box - push out along shortest axis
        let penetrations = half_extents - local_pos.abs();
        let (axis, pen) = if penetrations.x < penetrations.y && penetrations.x < penetrations.z {
            (Vec3::X * sign(local_pos.x), penetrations.x)
        } else if penetrations.y < penetrations.z {
            (Vec3::Y * sign(local_pos.y), penetrations.y)
        } else {
            (Vec3::Z * sign(local_pos.z), penetrations.z)
        };
        (axis, radius + pen, local_pos + axis * pen)
    };

    Some(Contact {
        body_a: sphere,
        body_b: box_body,
        point: box_pos + box_rot * surface,
        normal: box_rot * local_normal,
        depth,
    })
}

/// Test sphere against a Y-axis cylinder.
pub fn sphere_cylinder(
    sphere: BodyHandle,
    cylinder: BodyHandle,
    sphere_pos: Vec3,
    radius: f32,
    cylinder_transform: &Transform,
    cylinder_radius: f32,
    half_height: f32,
) -> Option<Contact> {
    let local = cylinder_transform.inverse_transform_point(sphere_pos);
    let radial = Vec3::new(local.x, 0.0, local.z);
    let radial_len = radial.length();

    let mut closest = local;
    closest.y = local.y.clamp(-half_height, half_height);
    if radial_len > cylinder_radius {
        let edge = radial * (cylinder_radius / radial_len);
        closest.x = edge.x;
        closest.z = edge.z;
    }

    let diff = local - closest;
    let dist_sq = diff.length_squared();
    if dist_sq >= radius * radius {
        return None;
    }

    let dist = dist_sq.sqrt();
    let (local_normal, depth, surface) = if dist > 0.0 {
        (diff / dist, radius - dist, closest)
    } else {
        let side = cylinder_radius - radial_len;
        let cap = half_height - local.y.abs();
        if side < cap {
            let n = if radial_len > 0.0 {
                radial / radial_len
            } else {
                Vec3::X
            };
            (n, radius + side, local + n * side)
        } else {
            let n = Vec3::Y * sign(local.y);
            (n, radius + cap, local + n * cap)
        }
    };

    Some(Contact {
        body_a: sphere,
        body_b: cylinder,
        point: cylinder_transform.transform_point(surface),
        normal: cylinder_transform.orientation * local_normal,
        depth,
    })
}

/// Test box-plane collision, producing one contact per corner below the plane.
#[allow(clippy::too_many_arguments)]
pub fn box_plane(
    box_body: BodyHandle,
    plane: BodyHandle,
    box_pos: Vec3,
    box_rot: Quat,
    half_extents: Vec3,
    plane_normal: Vec3,
    plane_dist: f32,
    out: &mut Vec<Contact>,
) {
    let corners = box_corners(&Transform::new(box_pos, box_rot), half_extents);
    points_below_plane(box_body, plane, corners.into_iter(), plane_normal, plane_dist, out);
}

/// Test oriented box-box collision with the separating axis test.
pub fn box_box(
    a: BodyHandle,
    b: BodyHandle,
    ta: &Transform,
    he_a: Vec3,
    tb: &Transform,
    he_b: Vec3,
    out: &mut Vec<Contact>,
) {
    let rot_a = Mat3::from_quat(ta.orientation);
    let rot_b = Mat3::from_quat(tb.orientation);
    let axes_a = [rot_a.col(0), rot_a.col(1), rot_a.col(2)];
    let axes_b = [rot_b.col(0), rot_b.col(1), rot_b.col(2)];
    let between = tb.position - ta.position;

    let extent = |axes: &[Vec3; 3], he: Vec3, l: Vec3| {
        he.x * axes[0].dot(l).abs() + he.y * axes[1].dot(l).abs() + he.z * axes[2].dot(l).abs()
    };

    let mut candidates: Vec<(Vec3, f32)> = Vec::with_capacity(15);
    candidates.extend(axes_a.iter().map(|l| (*l, 1.0)));
    candidates.extend(axes_b.iter().map(|l| (*l, 1.0)));
    for ea in &axes_a {
        for eb in &axes_b {
            let l = ea.cross(*eb);
            if l.length_squared() > 1e-6 {
                // Edge axes only win when clearly better than a face axis.
                candidates.push((l.normalize(), 1.05));
            }
        }
    }

    let mut best_axis = Vec3::Y;
    let mut best_overlap = f32::MAX;
    let mut best_score = f32::MAX;
    for (l, bias) in candidates {
        let ra = extent(&axes_a, he_a, l);
        let rb = extent(&axes_b, he_b, l);
        let dist = between.dot(l);
        let overlap = ra + rb - dist.abs();
        if overlap < 0.0 {
            return;
        }
        if overlap * bias < best_score {
            best_score = overlap * bias;
            best_overlap = overlap;
            // B lies along +l from A when dist > 0, so B -> A is -l.
            best_axis = if dist > 0.0 { -l } else { l };
        }
    }

    let n = best_axis;
    let max_b = tb.position.dot(n) + extent(&axes_b, he_b, n);
    let min_a = ta.position.dot(n) - extent(&axes_a, he_a, n);
    let tolerance = Vec3::splat(1e-3);
    let start = out.len();

    for corner in box_corners(ta, he_a) {
        let local = tb.inverse_transform_point(corner);
        if local.abs().cmple(he_b + tolerance).all() {
            let depth = (max_b - corner.dot(n)).clamp(0.0, best_overlap);
            if depth > 1e-6 {
                out.push(Contact {
                    body_a: a,
                    body_b: b,
                    point: corner,
                    normal: n,
                    depth,
                });
            }
        }
    }
    for corner in box_corners(tb, he_b) {
        let local = ta.inverse_transform_point(corner);
        if local.abs().cmple(he_a + tolerance).all() {
            let depth = (corner.dot(n) - min_a).clamp(0.0, best_overlap);
            if depth > 1e-6 {
                out.push(Contact {
                    body_a: a,
                    body_b: b,
                    point: corner,
                    normal: n,
                    depth,
                });
            }
        }
    }

    if out.len() == start {
        // Edge-edge: no corner is inside the other box.
        out.push(Contact {
            body_a: a,
            body_b: b,
            point: (ta.position + tb.position) * 0.5,
            normal: n,
            depth: best_overlap,
        });
    }
}

/// Test Y-axis cylinder against a plane using rim samples and the deepest support point.
#[allow(clippy::too_many_arguments)]
pub fn cylinder_plane(
    cylinder: BodyHandle,
    plane: BodyHandle,
    transform: &Transform,
    radius: f32,
    half_height: f32,
    plane_normal: Vec3,
    plane_dist: f32,
    out: &mut Vec<Contact>,
) {
    const RIM_SAMPLES: usize = 8;

    let mut points = Vec::with_capacity(RIM_SAMPLES * 2 + 1);
    for y in [-half_height, half_height] {
        for k in 0..RIM_SAMPLES {
            let angle = k as f32 * std::f32::consts::TAU / RIM_SAMPLES as f32;
            points.push(Vec3::new(radius * angle.cos(), y, radius * angle.sin()));
        }
    }
    let local_n = transform.orientation.inverse() * plane_normal;
    let radial = Vec3::new(local_n.x, 0.0, local_n.z);
    if radial.length_squared() > 1e-8 {
        let y = if local_n.y >= 0.0 { -half_height } else { half_height };
        points.push(Vec3::new(0.0, y, 0.0) - radial.normalize() * radius);
    }

    let world = points.into_iter().map(|p| transform.transform_point(p));
    points_below_plane(cylinder, plane, world, plane_normal, plane_dist, out);
}

/// One contact per point lying below the plane.
fn points_below_plane(
    a: BodyHandle,
    plane: BodyHandle,
    points: impl Iterator<Item = Vec3>,
    normal: Vec3,
    distance: f32,
    out: &mut Vec<Contact>,
) {
    for point in points {
        let dist = point.dot(normal) - distance;
        if dist < 0.0 {
            out.push(Contact {
                body_a: a,
                body_b: plane,
                point,
                normal,
                depth: -dist,
            });
        }
    }
}

/// World-space corners of a box.
fn box_corners(transform: &Transform, half_extents: Vec3) -> [Vec3; 8] {
    let mut corners = [Vec3::ZERO; 8];
    let mut i = 0;
    for sx in [-1.0_f32, 1.0] {
        for sy in [-1.0_f32, 1.0] {
            for sz in [-1.0_f32, 1.0] {
                corners[i] =
                    transform.transform_point(half_extents * Vec3::new(sx, sy, sz));
                i += 1;
            }
        }
    }
    corners
}

fn sign(x: f32) -> f32 {
    if x < 0.0 {
        -1.0
    } else {
        1.0
    }
}

// ============================================================================
// Triangle data
// ============================================================================

/// Closest point to `p` on triangle `[a, b, c]`.
pub fn closest_point_on_triangle(p: Vec3, [a, b, c]: [Vec3; 3]) -> Vec3 {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;
    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return a;
    }

    let bp = p - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        return a + ab * (d1 / (d1 - d3));
    }

    let cp = p - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        return a + ac * (d2 / (d2 - d6));
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return b + (c - b) * w;
    }

    let denom = 1.0 / (va + vb + vc);
    a + ab * (vb * denom) + ac * (vc * denom)
}

/// Unit normal of a counter-clockwise triangle, or zero if degenerate.
fn triangle_normal([a, b, c]: [Vec3; 3]) -> Vec3 {
    (b - a).cross(c - a).normalize_or_zero()
}

/// Sphere against a single triangle, all in the triangle's space.
///
/// Returns `(surface point, normal toward the sphere, depth)`.
fn sphere_triangle(center: Vec3, radius: f32, tri: [Vec3; 3]) -> Option<(Vec3, Vec3, f32)> {
    let closest = closest_point_on_triangle(center, tri);
    let diff = center - closest;
    let dist_sq = diff.length_squared();
    if dist_sq >= radius * radius {
        return None;
    }
    let dist = dist_sq.sqrt();
    let normal = if dist > 1e-6 {
        diff / dist
    } else {
        let n = triangle_normal(tri);
        if n == Vec3::ZERO {
            return None;
        }
        n
    };
    Some((closest, normal, radius - dist))
}

/// Sphere against every triangle of an exact mesh.
#[allow(clippy::too_many_arguments)]
fn sphere_trimesh(
    sphere: BodyHandle,
    mesh_body: BodyHandle,
    center: Vec3,
    radius: f32,
    mesh_transform: &Transform,
    mesh: &TriMesh,
    out: &mut Vec<Contact>,
) {
    let local = mesh_transform.inverse_transform_point(center);
    let region = Aabb::new(local - Vec3::splat(radius), local + Vec3::splat(radius));
    for tri in mesh.iter_triangles() {
        if !Aabb::from_points(tri).is_some_and(|t| t.overlaps(&region)) {
            continue;
        }
        if let Some((point, normal, depth)) = sphere_triangle(local, radius, tri) {
            out.push(Contact {
                body_a: sphere,
                body_b: mesh_body,
                point: mesh_transform.transform_point(point),
                normal: mesh_transform.orientation * normal,
                depth,
            });
        }
    }
}

/// Sphere against the height-field cells under it.
#[allow(clippy::too_many_arguments)]
fn sphere_height_field(
    sphere: BodyHandle,
    field_body: BodyHandle,
    center: Vec3,
    radius: f32,
    field_transform: &Transform,
    field: &HeightField,
    out: &mut Vec<Contact>,
) {
    let local = field_transform.inverse_transform_point(center);
    let region = Aabb::new(local - Vec3::splat(radius), local + Vec3::splat(radius));
    for tri in field.triangles_in(&region) {
        if let Some((point, normal, depth)) = sphere_triangle(local, radius, tri) {
            out.push(Contact {
                body_a: sphere,
                body_b: field_body,
                point: field_transform.transform_point(point),
                normal: field_transform.orientation * normal,
                depth,
            });
        }
    }
}

/// Sphere against a mesh treated as a closed convex solid.
pub fn sphere_convex(
    sphere: BodyHandle,
    mesh_body: BodyHandle,
    center: Vec3,
    radius: f32,
    mesh_transform: &Transform,
    mesh: &TriMesh,
) -> Option<Contact> {
    let local = mesh_transform.inverse_transform_point(center);

    // Largest separation over face planes; non-positive means the center is inside.
    let mut best_sep = f32::NEG_INFINITY;
    let mut best_normal = Vec3::Y;
    for tri in mesh.iter_triangles() {
        let n = triangle_normal(tri);
        if n == Vec3::ZERO {
            continue;
        }
        let sep = n.dot(local - tri[0]);
        if sep > best_sep {
            best_sep = sep;
            best_normal = n;
        }
    }
    if best_sep > radius {
        return None;
    }

    let (point, normal, depth) = if best_sep <= 0.0 {
        (local - best_normal * best_sep, best_normal, radius - best_sep)
    } else {
        let closest = mesh
            .iter_triangles()
            .map(|tri| closest_point_on_triangle(local, tri))
            .min_by(|p, q| {
                p.distance_squared(local)
                    .total_cmp(&q.distance_squared(local))
            })?;
        let diff = local - closest;
        let dist = diff.length();
        if dist >= radius {
            return None;
        }
        let normal = if dist > 1e-6 { diff / dist } else { best_normal };
        (closest, normal, radius - dist)
    };

    Some(Contact {
        body_a: sphere,
        body_b: mesh_body,
        point: mesh_transform.transform_point(point),
        normal: mesh_transform.orientation * normal,
        depth,
    })
}

/// Points (world space) against triangles (in `tri_transform` space).
///
/// A point counts as penetrating when it lies behind a triangle's face by less
/// than `thickness` and projects inside the triangle.
fn points_vs_triangles(
    a: BodyHandle,
    b: BodyHandle,
    points: &[Vec3],
    tri_transform: &Transform,
    triangles: impl Iterator<Item = [Vec3; 3]>,
    thickness: f32,
    out: &mut Vec<Contact>,
) {
    let local: Vec<Vec3> = points
        .iter()
        .map(|p| tri_transform.inverse_transform_point(*p))
        .collect();
    // Deepest hit per point.
    let mut hits: Vec<Option<(Vec3, f32)>> = vec![None; local.len()];

    for tri in triangles {
        let n = triangle_normal(tri);
        if n == Vec3::ZERO {
            continue;
        }
        for (i, p) in local.iter().enumerate() {
            let s = n.dot(*p - tri[0]);
            if s >= 0.0 || s <= -thickness {
                continue;
            }
            let projected = *p - n * s;
            if closest_point_on_triangle(projected, tri).distance_squared(projected) > 1e-8 {
                continue;
            }
            let depth = -s;
            match hits[i] {
                Some((_, d)) if d >= depth => {}
                _ => hits[i] = Some((n, depth)),
            }
        }
    }

    for (i, hit) in hits.into_iter().enumerate() {
        if let Some((n, depth)) = hit {
            out.push(Contact {
                body_a: a,
                body_b: b,
                point: points[i],
                normal: tri_transform.orientation * n,
                depth,
            });
        }
    }
}
