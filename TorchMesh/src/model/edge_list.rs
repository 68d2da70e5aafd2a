//! Edge adjacency data used by the engine for stencil shadows

use std::collections::HashMap;

use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

use super::mesh::Submesh;

/// A triangle with its face plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeTriangle {
    /// Index buffer the triangle came from (submesh position).
    pub index_set: u32,
    /// Vertex buffer the indices refer to (submesh position).
    pub vertex_set: u32,
    pub vertices: [u32; 3],
    /// Indices after merging vertices that share a position.
    pub shared_vertices: [u32; 3],
    /// Plane normal in xyz, plane distance in w.
    pub normal: Vec4,
}

/// An edge between two triangles, or an open edge when `degenerate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub triangles: [u32; 2],
    pub vertices: [u32; 2],
    pub shared_vertices: [u32; 2],
    pub degenerate: bool,
}

/// Edges whose vertices live in one vertex set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeGroup {
    pub vertex_set: u32,
    pub triangle_start: u32,
    pub triangle_count: u32,
    pub edges: Vec<Edge>,
}

/// Edge list for LOD 0.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EdgeList {
    pub closed: bool,
    pub triangles: Vec<EdgeTriangle>,
    pub groups: Vec<EdgeGroup>,
}

impl EdgeList {
    /// Build edge data from submeshes; each submesh is its own vertex set.
    #[must_use]
    pub fn build(submeshes: &[Submesh]) -> Self {
        let mut list = EdgeList { closed: true, ..EdgeList::default() };

        for (set, submesh) in submeshes.iter().enumerate() {
            let set = set as u32;
            let shared = shared_position_indices(submesh);
            let triangle_start = list.triangles.len() as u32;

            for tri in submesh.triangles() {
                let [a, b, c] = tri.map(|i| submesh.vertices[i as usize].position);
                let n = (b - a).cross(c - a).normalize_or_zero();
                list.triangles.push(EdgeTriangle {
                    index_set: set,
                    vertex_set: set,
                    vertices: tri,
                    shared_vertices: tri.map(|i| shared[i as usize]),
                    normal: n.extend(-n.dot(a)),
                });
            }
            let triangle_count = list.triangles.len() as u32 - triangle_start;

            // Pair each directed edge with its reverse on a neighbouring triangle.
            let mut open: HashMap<(u32, u32), Vec<usize>> = HashMap::new();
            let mut edges: Vec<Edge> = Vec::new();
            for t in triangle_start..triangle_start + triangle_count {
                let tri = &list.triangles[t as usize];
                for k in 0..3 {
                    let (v0, v1) = (tri.vertices[k], tri.vertices[(k + 1) % 3]);
                    let (s0, s1) = (tri.shared_vertices[k], tri.shared_vertices[(k + 1) % 3]);
                    if s0 == s1 {
                        continue;
                    }
                    if let Some(pending) = open.get_mut(&(s1, s0))
                        && let Some(edge_index) = pending.pop()
                    {
                        let edge: &mut Edge = &mut edges[edge_index];
                        edge.triangles[1] = t;
                        edge.degenerate = false;
                        continue;
                    }
                    open.entry((s0, s1)).or_default().push(edges.len());
                    edges.push(Edge {
                        triangles: [t, t],
                        vertices: [v0, v1],
                        shared_vertices: [s0, s1],
                        degenerate: true,
                    });
                }
            }

            if edges.iter().any(|e| e.degenerate) {
                list.closed = false;
            }
            list.groups.push(EdgeGroup { vertex_set: set, triangle_start, triangle_count, edges });
        }
        list
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.groups.iter().map(|g| g.edges.len()).sum()
    }
}

/// For each vertex, the first vertex index sharing its exact position.
fn shared_position_indices(submesh: &Submesh) -> Vec<u32> {
    let mut first: HashMap<[u32; 3], u32> = HashMap::with_capacity(submesh.vertices.len());
    submesh
        .vertices
        .iter()
        .enumerate()
        .map(|(i, v)| *first.entry(position_bits(v.position)).or_insert(i as u32))
        .collect()
}

fn position_bits(p: Vec3) -> [u32; 3] {
    // -0.0 and 0.0 must hash alike.
    [p.x + 0.0, p.y + 0.0, p.z + 0.0].map(f32::to_bits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Vertex;

    fn quad() -> Submesh {
        let mut s = Submesh::new("m");
        for p in [Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::Y] {
            s.vertices.push(Vertex::new(p, Vec3::Z));
        }
        s.indices = vec![0, 1, 2, 0, 2, 3];
        s
    }

    #[test]
    fn test_quad_has_one_shared_edge() {
        let list = EdgeList::build(&[quad()]);
        assert_eq!(list.triangles.len(), 2);
        assert_eq!(list.edge_count(), 5);
        let interior: Vec<_> = list.groups[0].edges.iter().filter(|e| !e.degenerate).collect();
        assert_eq!(interior.len(), 1);
        assert_eq!(interior[0].triangles, [0, 1]);
        assert!(!list.closed);
        assert!((list.triangles[0].normal.truncate() - Vec3::Z).length() < 1e-6);
    }

    #[test]
    fn test_split_vertices_still_pair() {
        // Same quad, but the diagonal's vertices are duplicated (UV seam).
        let mut s = quad();
        s.vertices.push(Vertex::new(Vec3::ZERO, Vec3::Z));
        s.vertices.push(Vertex::new(Vec3::new(1.0, 1.0, 0.0), Vec3::Z));
        s.indices = vec![0, 1, 2, 4, 5, 3];
        let list = EdgeList::build(&[s]);
        assert_eq!(list.groups[0].edges.iter().filter(|e| !e.degenerate).count(), 1);
    }
}
