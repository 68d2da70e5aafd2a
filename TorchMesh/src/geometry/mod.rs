//! Geometry processing applied between the host scene and the codecs

pub mod axis;
pub mod grouping;
pub mod tangents;
pub mod transform;
pub mod triangulate;
pub mod weld;

pub use axis::{AxisConversion, UpAxis};
pub use grouping::{SubmeshRemap, merge_by_material};
pub use triangulate::triangulate_polygon;
pub use weld::{WeldTolerance, weld, weld_keyed, weld_submesh};

use crate::model::Submesh;

/// Squared cross-product length below which a triangle has no area.
const DEGENERATE_AREA_SQ: f32 = 1e-24;

/// Drop zero-area triangles and triangles that repeat an index.
///
/// Returns the number removed; a `warn` reports it when non-zero.
pub fn cull_degenerate_triangles(submesh: &mut Submesh) -> usize {
    let before = submesh.triangle_count();
    let vertices = &submesh.vertices;
    let kept: Vec<u32> = submesh
        .indices
        .chunks_exact(3)
        .filter(|t| {
            if t[0] == t[1] || t[1] == t[2] || t[0] == t[2] {
                return false;
            }
            let [a, b, c] = [t[0], t[1], t[2]].map(|i| vertices[i as usize].position);
            (b - a).cross(c - a).length_squared() > DEGENERATE_AREA_SQ
        })
        .flatten()
        .copied()
        .collect();
    submesh.indices = kept;

    let removed = before - submesh.triangle_count();
    if removed > 0 {
        tracing::warn!("Submesh '{}': skipped {removed} degenerate triangle(s)", submesh.material);
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Vertex;
    use glam::Vec3;

    #[test]
    fn test_cull_degenerate_triangles() {
        let mut s = Submesh::new("m");
        for p in [Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::X * 2.0] {
            s.vertices.push(Vertex::new(p, Vec3::Z));
        }
        // good, repeated index, collinear
        s.indices = vec![0, 1, 2, 0, 0, 1, 0, 1, 3];
        assert_eq!(cull_degenerate_triangles(&mut s), 2);
        assert_eq!(s.indices, vec![0, 1, 2]);
    }
}
