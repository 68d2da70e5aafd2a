//! Merging submeshes that share a material

use indexmap::IndexMap;

use crate::model::Submesh;

/// Where an input submesh ended up after merging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmeshRemap {
    /// Index of the merged submesh.
    pub submesh: usize,
    /// Offset added to the input submesh's vertex indices.
    pub vertex_offset: u32,
}

/// Merge submeshes by material, keeping the order of first appearance.
///
/// Returns the merged list and, per input submesh, where its vertices went.
/// The first submesh of each group supplies the merged name.
#[must_use]
pub fn merge_by_material(submeshes: Vec<Submesh>) -> (Vec<Submesh>, Vec<SubmeshRemap>) {
    let mut groups: IndexMap<String, Submesh> = IndexMap::new();
    let mut remap = Vec::with_capacity(submeshes.len());

    for submesh in submeshes {
        let entry = groups.entry(submesh.material.clone());
        let position = entry.index();
        let merged = entry.or_insert_with(|| Submesh {
            name: submesh.name.clone(),
            material: submesh.material.clone(),
            vertices: Vec::new(),
            indices: Vec::new(),
        });

        let vertex_offset = merged.vertices.len() as u32;
        merged.indices.extend(submesh.indices.iter().map(|i| i + vertex_offset));
        merged.vertices.extend(submesh.vertices);
        remap.push(SubmeshRemap { submesh: position, vertex_offset });
    }

    let merged: Vec<Submesh> = groups.into_values().collect();
    if merged.len() < remap.len() {
        tracing::debug!("Merged {} submeshes into {} by material", remap.len(), merged.len());
    }
    (merged, remap)
}
