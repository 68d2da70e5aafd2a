//! Per-vertex tangent and binormal derivation from UV layout

use glam::{Vec2, Vec3, Vec4};

use crate::model::Submesh;

/// UV-space determinant below which a triangle contributes nothing.
pub const DEGENERATE_UV_DET: f32 = 1e-12;

/// Fill `tangent` (and `binormal` when asked) for every vertex of `submesh`
/// from UV set `uv_set`.
///
/// Tangents and binormals are summed over incident triangles, then
/// orthogonalized against the normal and normalized. Triangles whose UV area
/// is degenerate are skipped; vertices left with no contribution get an
/// arbitrary tangent orthogonal to the normal and a binormal completing the
/// basis. Returns the number of skipped triangles.
pub fn generate(submesh: &mut Submesh, uv_set: usize, binormals: bool) -> usize {
    let count = submesh.vertices.len();
    let mut tangents = vec![Vec3::ZERO; count];
    let mut bitangents = vec![Vec3::ZERO; count];
    let mut parity = vec![0.0_f32; count];
    let mut skipped = 0;

    for tri in submesh.triangles() {
        let [i0, i1, i2] = tri.map(|i| i as usize);
        if i0 >= count || i1 >= count || i2 >= count {
            skipped += 1;
            continue;
        }
        let v = &submesh.vertices;
        let uv = |i: usize| v[i].uvs.get(uv_set).copied().unwrap_or(Vec2::ZERO);

        let e1 = v[i1].position - v[i0].position;
        let e2 = v[i2].position - v[i0].position;
        let d1 = uv(i1) - uv(i0);
        let d2 = uv(i2) - uv(i0);

        let det = d1.x * d2.y - d2.x * d1.y;
        if !det.is_finite() || det.abs() < DEGENERATE_UV_DET {
            skipped += 1;
            continue;
        }
        let tangent = (e1 * d2.y - e2 * d1.y) / det;
        let bitangent = (e2 * d1.x - e1 * d2.x) / det;
        if !tangent.is_finite() || !bitangent.is_finite() {
            skipped += 1;
            continue;
        }
        for i in [i0, i1, i2] {
            tangents[i] += tangent;
            bitangents[i] += bitangent;
            parity[i] += det.signum();
        }
    }

    for (i, vertex) in submesh.vertices.iter_mut().enumerate() {
        let normal = vertex.normal.try_normalize().unwrap_or(Vec3::Z);
        // Gram-Schmidt against the normal.
        let t = tangents[i] - normal * normal.dot(tangents[i]);
        let t = t.try_normalize().unwrap_or_else(|| normal.any_orthonormal_vector());
        let w = if parity[i] < 0.0 { -1.0 } else { 1.0 };

        vertex.tangent = Some(Vec4::new(t.x, t.y, t.z, w));
        if binormals {
            let b = bitangents[i] - normal * normal.dot(bitangents[i]);
            vertex.binormal = Some(b.try_normalize().unwrap_or_else(|| normal.cross(t) * w));
        }
    }

    if skipped > 0 {
        tracing::debug!("Tangent generation skipped {skipped} UV-degenerate triangle(s)");
    }
    skipped
}

/// Whether every vertex already has a tangent (and binormal, if `binormals`).
#[must_use]
pub fn is_complete(submesh: &Submesh, binormals: bool) -> bool {
    submesh
        .vertices
        .iter()
        .all(|v| v.tangent.is_some() && (!binormals || v.binormal.is_some()))
}
