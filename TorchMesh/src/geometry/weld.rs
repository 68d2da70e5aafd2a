//! Vertex welding: collapse corners that are equal within tolerance

use std::collections::HashMap;

use glam::{Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::model::{BoneWeight, Submesh, Vertex};

/// Per-attribute comparison tolerances.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeldTolerance {
    pub position: f32,
    pub normal: f32,
    pub uv: f32,
    pub colour: f32,
    pub weight: f32,
}

impl Default for WeldTolerance {
    fn default() -> Self {
        Self { position: 1e-5, normal: 1e-3, uv: 1e-5, colour: 1e-3, weight: 1e-4 }
    }
}

impl WeldTolerance {
    /// Bit-exact comparison.
    pub const EXACT: Self = Self { position: 0.0, normal: 0.0, uv: 0.0, colour: 0.0, weight: 0.0 };
}

/// Smallest spatial hash cell; keeps exact welding from dividing by zero.
const MIN_CELL: f32 = 1e-6;

fn close3(a: Vec3, b: Vec3, tol: f32) -> bool {
    (a - b).abs().max_element() <= tol
}

fn close_opt4(a: Option<Vec4>, b: Option<Vec4>, tol: f32) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => (a - b).abs().max_element() <= tol,
        _ => false,
    }
}

fn close_opt3(a: Option<Vec3>, b: Option<Vec3>, tol: f32) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => close3(a, b, tol),
        _ => false,
    }
}

fn close_uvs(a: &[Vec2], b: &[Vec2], tol: f32) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (*x - *y).abs().max_element() <= tol)
}

fn close_weights(a: &[BoneWeight], b: &[BoneWeight], tol: f32) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.bone == y.bone && (x.weight - y.weight).abs() <= tol)
}

/// Whether two vertices are interchangeable under `tol`.
#[must_use]
pub fn vertices_match(a: &Vertex, b: &Vertex, tol: &WeldTolerance) -> bool {
    close3(a.position, b.position, tol.position)
        && close3(a.normal, b.normal, tol.normal)
        && close_uvs(&a.uvs, &b.uvs, tol.uv)
        && close_opt4(a.colour, b.colour, tol.colour)
        && close_opt4(a.tangent, b.tangent, tol.normal)
        && close_opt3(a.binormal, b.binormal, tol.normal)
        && close_weights(&a.weights, &b.weights, tol.weight)
}

type Cell = (i64, i64, i64);

fn cell_of(p: Vec3, size: f32) -> Cell {
    let q = (p / size).floor();
    (q.x as i64, q.y as i64, q.z as i64)
}

/// Weld `vertices`, returning the unique vertices and, for each input vertex,
/// its index in the unique list.
///
/// Candidates are looked up in a spatial hash over quantized positions (the
/// vertex's own cell and its 26 neighbours), so cost stays near-linear.
#[must_use]
pub fn weld(vertices: &[Vertex], tol: &WeldTolerance) -> (Vec<Vertex>, Vec<u32>) {
    weld_by(vertices, tol, |_, _| true)
}

/// Like [`weld`], but vertices only merge when their `keys` entries are equal.
///
/// `keys` is parallel to `vertices`. Export passes the source vertex index so
/// coincident vertices that shape keys move apart stay separate.
#[must_use]
pub fn weld_keyed(vertices: &[Vertex], keys: &[u32], tol: &WeldTolerance) -> (Vec<Vertex>, Vec<u32>) {
    debug_assert_eq!(vertices.len(), keys.len());
    weld_by(vertices, tol, |a, b| keys.get(a) == keys.get(b))
}

/// `compatible(first, candidate)` takes input indices.
fn weld_by(
    vertices: &[Vertex],
    tol: &WeldTolerance,
    compatible: impl Fn(usize, usize) -> bool,
) -> (Vec<Vertex>, Vec<u32>) {
    let cell_size = tol.position.max(MIN_CELL);
    let mut grid: HashMap<Cell, Vec<u32>> = HashMap::new();
    let mut unique: Vec<Vertex> = Vec::new();
    // Input index each unique vertex came from.
    let mut firsts: Vec<usize> = Vec::new();
    let mut remap = Vec::with_capacity(vertices.len());

    for (input, vertex) in vertices.iter().enumerate() {
        let (cx, cy, cz) = cell_of(vertex.position, cell_size);
        let mut found = None;
        'search: for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(bucket) = grid.get(&(cx + dx, cy + dy, cz + dz)) else {
                        continue;
                    };
                    if let Some(&hit) = bucket.iter().find(|&&u| {
                        compatible(firsts[u as usize], input) && vertices_match(&unique[u as usize], vertex, tol)
                    }) {
                        found = Some(hit);
                        break 'search;
                    }
                }
            }
        }

        let index = found.unwrap_or_else(|| {
            let index = unique.len() as u32;
            unique.push(vertex.clone());
            firsts.push(input);
            grid.entry((cx, cy, cz)).or_default().push(index);
            index
        });
        remap.push(index);
    }
    (unique, remap)
}

/// Weld a submesh in place, rewriting its index buffer. Returns how many
/// vertices were merged away.
pub fn weld_submesh(submesh: &mut Submesh, tol: &WeldTolerance) -> usize {
    let before = submesh.vertices.len();
    let (unique, remap) = weld(&submesh.vertices, tol);
    for index in &mut submesh.indices {
        *index = remap[*index as usize];
    }
    submesh.vertices = unique;
    before - submesh.vertices.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_corners_merge() {
        let a = Vertex::new(Vec3::ONE, Vec3::Y).with_uv(Vec2::ZERO);
        let b = Vertex::new(Vec3::new(1.0, 1.0, 1.0 + 1e-7), Vec3::Y).with_uv(Vec2::ZERO);
        let c = Vertex::new(Vec3::ZERO, Vec3::Y).with_uv(Vec2::ZERO);
        let (unique, remap) = weld(&[a, b, c], &WeldTolerance::default());
        assert_eq!(unique.len(), 2);
        assert_eq!(remap, vec![0, 0, 1]);
    }

    #[test]
    fn test_uv_seam_is_kept() {
        let a = Vertex::new(Vec3::ONE, Vec3::Y).with_uv(Vec2::ZERO);
        let b = Vertex::new(Vec3::ONE, Vec3::Y).with_uv(Vec2::new(0.5, 0.0));
        let (unique, remap) = weld(&[a, b], &WeldTolerance::default());
        assert_eq!(unique.len(), 2);
        assert_eq!(remap, vec![0, 1]);
    }

    #[test]
    fn test_match_across_cell_boundary() {
        // Straddles a cell edge at the default tolerance.
        let tol = WeldTolerance::default();
        let a = Vertex::new(Vec3::new(tol.position * 0.999, 0.0, 0.0), Vec3::Y);
        let b = Vertex::new(Vec3::new(tol.position * 1.001, 0.0, 0.0), Vec3::Y);
        let (unique, _) = weld(&[a, b], &tol);
        assert_eq!(unique.len(), 1);
    }

    #[test]
    fn test_keyed_weld_keeps_distinct_sources_apart() {
        let v = Vertex::new(Vec3::ONE, Vec3::Y).with_uv(Vec2::ZERO);
        let vertices = [v.clone(), v.clone(), v];
        let (unique, remap) = weld_keyed(&vertices, &[4, 7, 4], &WeldTolerance::default());
        assert_eq!(unique.len(), 2);
        assert_eq!(remap, vec![0, 1, 0]);
    }

    #[test]
    fn test_weld_submesh_rewrites_indices() {
        let mut s = Submesh::new("m");
        for p in [Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::X, Vec3::Y, Vec3::ONE] {
            s.vertices.push(Vertex::new(p, Vec3::Z));
        }
        s.indices = vec![0, 1, 2, 3, 5, 4];
        assert_eq!(weld_submesh(&mut s, &WeldTolerance::EXACT), 2);
        assert_eq!(s.indices, vec![0, 1, 2, 1, 3, 2]);
    }
}
