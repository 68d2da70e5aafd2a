//! Chunk tree and model summary for a `.mesh` or `.skeleton` file

use std::path::Path;

use crate::converter::ModelDocument;
use crate::formats::chunk::chunk_tree;
use crate::formats::detect_family;
use crate::model::{Mesh, Skeleton};

/// Inspect a file and print its structure.
pub fn execute(path: &Path, json: bool) -> anyhow::Result<()> {
    let data = std::fs::read(path)?;
    let family = detect_family(&data).map_err(|e| e.in_file(path))?;
    let tree = chunk_tree(&data, family).map_err(|e| e.in_file(path))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&tree)?);
        return Ok(());
    }

    println!("Inspecting: {}", path.display());
    println!();
    println!("Chunks");
    println!("======");
    for node in &tree {
        print!("{}", node.render());
    }
    println!();

    match ModelDocument::decode(&data) {
        Ok(ModelDocument::Mesh(mesh)) => print_mesh(&mesh),
        Ok(ModelDocument::Skeleton(skeleton)) => print_skeleton(&skeleton),
        Err(e) => println!("(Could not decode model: {e})"),
    }
    Ok(())
}

fn print_mesh(mesh: &Mesh) {
    println!("Mesh");
    println!("====");
    println!("Skeleton:  {}", mesh.skeleton_link.as_deref().unwrap_or("None"));
    println!("Vertices:  {}", mesh.vertex_count());
    println!("Triangles: {}", mesh.triangle_count());
    if let Some(bounds) = mesh.bounds() {
        println!("Bounds:    {} .. {} (radius {:.3})", bounds.min, bounds.max, bounds.radius);
    }
    if let Some(edges) = &mesh.edge_list {
        println!("Edges:     {} ({})", edges.edge_count(), if edges.closed { "closed" } else { "open" });
    }
    println!();
    println!("Submeshes ({}):", mesh.submeshes.len());
    for (i, submesh) in mesh.submeshes.iter().enumerate() {
        println!(
            "  [{i:2}] {} | material {} | {} vertices, {} triangles{}",
            submesh.name.as_deref().unwrap_or("-"),
            submesh.material,
            submesh.vertices.len(),
            submesh.triangle_count(),
            if submesh.is_skinned() { ", skinned" } else { "" }
        );
    }
    if !mesh.poses.is_empty() {
        println!();
        println!("Poses ({}):", mesh.poses.len());
        for pose in &mesh.poses {
            println!("  - {} (submesh {}, {} offsets)", pose.name, pose.submesh, pose.offsets.len());
        }
    }
    if !mesh.animations.is_empty() {
        println!();
        println!("Morph animations ({}):", mesh.animations.len());
        for animation in &mesh.animations {
            println!("  - {} ({:.2}s, {} tracks)", animation.name, animation.length, animation.morph_tracks.len());
        }
    }
}

fn print_skeleton(skeleton: &Skeleton) {
    println!("Skeleton");
    println!("========");
    println!("Bones:      {}", skeleton.bones.len());
    println!("Blend mode: {:?}", skeleton.blend_mode);
    let degenerate = skeleton.degenerate_bones();
    if !degenerate.is_empty() {
        println!("Degenerate: {degenerate:?}");
    }
    println!();
    for bone in &skeleton.bones {
        let parent = bone.parent.and_then(|p| skeleton.bone(p)).map_or("-", |p| p.name.as_str());
        println!("  [{:3}] {} (parent {parent})", bone.id, bone.name);
    }
    if !skeleton.animations.is_empty() {
        println!();
        println!("Animations ({}):", skeleton.animations.len());
        for animation in &skeleton.animations {
            println!("  - {} ({:.2}s, {} tracks)", animation.name, animation.length, animation.tracks.len());
        }
    }
}
