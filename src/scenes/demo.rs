//! Procedural demo scene: a ground plane and a handful of shaded objects
//! standing on it. Geometry is generated rather than loaded from mesh files;
//! normals are per-vertex averages of the adjacent face normals.

use glam::Vec3;

use crate::scene::{Scene, SceneObject};

pub const GROUND_NAME: &str = "ground";

const GROUND_COLOR: [f32; 4] = [0.69, 0.5, 0.49, 1.0];

/// Average the face normals of every triangle touching a vertex. Faces
/// contribute their area-weighted normal (the unnormalized cross product),
/// matching the usual mean-vertex-normal construction.
pub fn mean_vertex_normals(vertices: &[Vec3], indices: &[u32]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; vertices.len()];
    for tri in indices.chunks_exact(3) {
        let (a, b, c) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        let face = (vertices[b] - vertices[a]).cross(vertices[c] - vertices[a]);
        normals[a] += face;
        normals[b] += face;
        normals[c] += face;
    }
    for n in &mut normals {
        *n = n.normalize_or_zero();
    }
    normals
}

fn object(name: &str, vertices: Vec<Vec3>, indices: Vec<u32>, color: [f32; 4]) -> SceneObject {
    let normals = mean_vertex_normals(&vertices, &indices);
    SceneObject {
        name: name.to_string(),
        vertices,
        indices,
        normals,
        color,
    }
}

/// A flat quad in the XZ plane at the given height, wound so its normal
/// points up.
fn ground(half_extent: f32) -> SceneObject {
    let e = half_extent;
    let vertices = vec![
        Vec3::new(-e, 0.0, -e),
        Vec3::new(-e, 0.0, e),
        Vec3::new(e, 0.0, e),
        Vec3::new(e, 0.0, -e),
    ];
    let indices = vec![0, 1, 2, 0, 2, 3];
    object(GROUND_NAME, vertices, indices, GROUND_COLOR)
}

/// An axis-aligned box with unshared face vertices, so the averaged normals
/// come out flat per face.
fn cuboid(name: &str, center: Vec3, half: Vec3, color: [f32; 4]) -> SceneObject {
    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    // (axis, sign) pairs for the six faces.
    let faces = [
        (Vec3::X, 1.0),
        (Vec3::X, -1.0),
        (Vec3::Y, 1.0),
        (Vec3::Y, -1.0),
        (Vec3::Z, 1.0),
        (Vec3::Z, -1.0),
    ];
    for (axis, sign) in faces {
        let normal = axis * sign;
        // (u, v, normal) right-handed, so the quad below winds CCW seen from
        // outside the box.
        let u = if axis == Vec3::Y {
            Vec3::X
        } else {
            Vec3::Y.cross(normal).normalize()
        };
        let v = normal.cross(u);
        let base = vertices.len() as u32;
        for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let offset = normal * normal.abs().dot(half)
                + u * (su * u.abs().dot(half))
                + v * (sv * v.abs().dot(half));
            vertices.push(center + offset);
        }
        indices.extend([base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    object(name, vertices, indices, color)
}

/// A four-sided pyramid standing on the ground, apex up.
fn pyramid(name: &str, base_center: Vec3, base_half: f32, height: f32, color: [f32; 4]) -> SceneObject {
    let b = base_half;
    // Counter-clockwise seen from above, so the side faces wind outward.
    let corners = [
        base_center + Vec3::new(-b, 0.0, -b),
        base_center + Vec3::new(-b, 0.0, b),
        base_center + Vec3::new(b, 0.0, b),
        base_center + Vec3::new(b, 0.0, -b),
    ];
    let apex = base_center + Vec3::new(0.0, height, 0.0);

    // Unshared vertices per face for flat side normals.
    let mut vertices = Vec::new();
    let mut indices = Vec::new();
    for i in 0..4 {
        let base = vertices.len() as u32;
        vertices.push(corners[i]);
        vertices.push(corners[(i + 1) % 4]);
        vertices.push(apex);
        indices.extend([base, base + 1, base + 2]);
    }
    // Base, wound downward.
    let base = vertices.len() as u32;
    vertices.extend(corners);
    indices.extend([base, base + 2, base + 1, base, base + 3, base + 2]);
    object(name, vertices, indices, color)
}

/// The default scene: ground plane, three colored crates and two pine-like
/// pyramids scattered so every view has shadow casters and receivers.
pub fn create_demo_scene() -> Scene {
    let objects = vec![
        ground(10.0),
        cuboid("crate1", Vec3::new(-2.0, 0.75, 0.5), Vec3::splat(0.75), [0.97, 0.09, 0.0, 1.0]),
        cuboid("crate2", Vec3::new(2.0, 0.6, -1.5), Vec3::splat(0.6), [0.06, 0.9, 0.02, 1.0]),
        cuboid("crate3", Vec3::new(0.5, 0.5, 2.5), Vec3::splat(0.5), [0.07, 0.04, 0.9, 1.0]),
        pyramid("pine1", Vec3::new(-4.0, 0.0, -3.5), 1.2, 3.5, [0.09, 0.67, 0.09, 1.0]),
        pyramid("pine2", Vec3::new(4.0, 0.0, 3.0), 1.0, 2.8, [0.09, 0.87, 0.09, 1.0]),
    ];

    // The demo geometry always contains a ground object, so this cannot fail.
    Scene::new(objects, GROUND_NAME).expect("demo scene has a ground object")
}
