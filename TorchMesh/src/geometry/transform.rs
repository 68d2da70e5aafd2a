//! Baking an object transform into vertex data

use glam::{Mat3, Mat4};

use crate::model::{Pose, Submesh};

/// Apply `matrix` to every vertex of `submesh`.
///
/// Positions take the full affine transform, normals the inverse transpose,
/// and tangents/binormals the linear part. A mirroring transform flips the
/// triangle winding and the tangent handedness.
pub fn bake(submesh: &mut Submesh, matrix: Mat4) {
    let linear = Mat3::from_mat4(matrix);
    let det = linear.determinant();
    let normal_matrix = if det.abs() > f32::EPSILON { linear.inverse().transpose() } else { linear };
    let mirrored = det < 0.0;

    for vertex in &mut submesh.vertices {
        vertex.position = matrix.transform_point3(vertex.position);
        vertex.normal = (normal_matrix * vertex.normal).normalize_or_zero();
        if let Some(t) = &mut vertex.tangent {
            let dir = (linear * t.truncate()).normalize_or_zero();
            let w = if mirrored { -t.w } else { t.w };
            *t = dir.extend(w);
        }
        if let Some(b) = &mut vertex.binormal {
            *b = (linear * *b).normalize_or_zero();
        }
    }

    if mirrored {
        flip_winding(submesh);
    }
}

/// Apply the linear part of `matrix` to a pose's offsets and normals.
pub fn bake_pose(pose: &mut Pose, matrix: Mat4) {
    let linear = Mat3::from_mat4(matrix);
    let det = linear.determinant();
    let normal_matrix = if det.abs() > f32::EPSILON { linear.inverse().transpose() } else { linear };
    for (_, offset) in &mut pose.offsets {
        *offset = linear * *offset;
    }
    if let Some(normals) = &mut pose.normals {
        for n in normals {
            *n = (normal_matrix * *n).normalize_or_zero();
        }
    }
}

/// Reverse every triangle's winding.
pub fn flip_winding(submesh: &mut Submesh) {
    for tri in submesh.indices.chunks_exact_mut(3) {
        tri.swap(1, 2);
    }
}

/// Whether `matrix` mirrors geometry.
#[must_use]
pub fn is_mirroring(matrix: Mat4) -> bool {
    Mat3::from_mat4(matrix).determinant() < 0.0
}
