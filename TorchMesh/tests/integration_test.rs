use glam::{Quat, Vec2, Vec3};
use pretty_assertions::assert_eq;
use tempfile::tempdir;
use torchmesh::formats::chunk::ids::{self, skeleton as skeleton_ids};
use torchmesh::formats::{
    BoneDraft, ChunkReader, ChunkWriter, assign_bone_ids, decode_mesh_bytes, decode_skeleton_bytes,
    encode_mesh_bytes, encode_skeleton_bytes, read_version_header, write_version_header,
};
use torchmesh::geometry::{WeldTolerance, tangents, triangulate_polygon, weld};
use torchmesh::model::{BoneTrack, BoneWeight, Keyframe, Transform};
use torchmesh::prelude::*;
use torchmesh::scene::{
    BoneSamples, GroupWeight, SceneAction, SceneArmature, SceneBone, SceneCorner, SceneMaterial, SceneMesh,
    ScenePolygon,
};

fn triangle(material: &str) -> Submesh {
    let mut submesh = Submesh::new(material);
    for (p, uv) in [(Vec3::ZERO, Vec2::ZERO), (Vec3::X, Vec2::X), (Vec3::Y, Vec2::Y)] {
        submesh
            .vertices
            .push(Vertex::new(p, Vec3::Z).with_uv(uv).with_weights(vec![BoneWeight::new(0, 1.0)]));
    }
    submesh.indices = vec![0, 1, 2];
    submesh
}

fn two_bone_skeleton() -> Skeleton {
    Skeleton {
        bones: vec![
            Bone { id: 0, name: "Root".into(), parent: None, transform: Transform::IDENTITY },
            Bone {
                id: 1,
                name: "Arm".into(),
                parent: Some(0),
                transform: Transform::new(Vec3::new(0.0, 1.0, 0.0), Quat::from_rotation_z(0.5)),
            },
        ],
        ..Skeleton::default()
    }
}

/// A unit quad in the XY plane, skinned to a one-bone armature.
fn quad_scene() -> MemoryScene {
    let positions = vec![Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::Y];
    let corners = positions
        .iter()
        .enumerate()
        .map(|(i, p)| SceneCorner { vertex: i as u32, normal: Vec3::Z, uvs: vec![p.truncate()], colours: vec![] })
        .collect();
    MemoryScene {
        meshes: vec![SceneMesh {
            name: "tile".into(),
            transform: glam::Mat4::IDENTITY,
            positions,
            polygons: vec![ScenePolygon { material: 0, corners }],
            materials: vec!["tile_mat".into()],
            uv_layers: vec!["UVMap".into()],
            vertex_groups: vec!["Root".into()],
            weights: vec![vec![GroupWeight { group: 0, weight: 1.0 }]; 4],
            ..SceneMesh::default()
        }],
        armature: Some(SceneArmature {
            name: "rig".into(),
            bones: vec![SceneBone { name: "Root".into(), parent: None, transform: Transform::IDENTITY }],
        }),
        materials: vec![SceneMaterial { name: "tile_mat".into(), textures: vec!["tile.png".into()] }],
        ..MemoryScene::new(UpAxis::Y)
    }
}

fn dir_is_empty(path: &std::path::Path) -> bool {
    std::fs::read_dir(path).unwrap().next().is_none()
}

#[test]
fn test_mesh_roundtrip() {
    let mut body = triangle("skin");
    body.name = Some("body".into());
    let mesh = Mesh {
        submeshes: vec![body, triangle("cloth")],
        skeleton_link: Some("hero.skeleton".into()),
        ..Mesh::default()
    };

    let data = encode_mesh_bytes(&mesh, &MeshEncodeOptions::default()).unwrap();
    let back = decode_mesh_bytes(&data).unwrap();
    assert_eq!(back, mesh);
}

#[test]
fn test_skeleton_roundtrip() {
    let mut skeleton = two_bone_skeleton();
    let mut walk = Animation::new("walk", 2.0);
    walk.tracks.push(BoneTrack {
        bone: 1,
        keyframes: vec![
            Keyframe::new(0.0, Vec3::ZERO, Quat::IDENTITY),
            Keyframe::new(2.0, Vec3::new(0.0, 0.5, 0.0), Quat::IDENTITY),
        ],
    });
    skeleton.animations.push(walk);

    for version in [SkeletonVersion::V1_10, SkeletonVersion::V1_80] {
        let data = encode_skeleton_bytes(&skeleton, &SkeletonEncodeOptions { version }).unwrap();
        let back = decode_skeleton_bytes(&data).unwrap();
        assert_eq!(back.bones.len(), 2);
        assert_eq!(back.bones[1].parent, Some(0));
        assert_eq!(back.bones[1].name, "Arm");
        assert!(back.bones[1].transform.rotation.angle_between(skeleton.bones[1].transform.rotation) < 1e-5);
        assert_eq!(back.animations[0].tracks, skeleton.animations[0].tracks);
    }
}

#[test]
fn test_unknown_chunk_is_skipped() {
    let skeleton = two_bone_skeleton();
    let data = encode_skeleton_bytes(&skeleton, &SkeletonEncodeOptions::default()).unwrap();

    // Splice an unknown chunk right after the file header.
    let mut reader = ChunkReader::new(&data);
    read_version_header(&mut reader).unwrap();
    let split = reader.position() as usize;

    let mut unknown = ChunkWriter::new();
    unknown
        .chunk(0x7777, |w| {
            w.write_bytes(&[0xAB; 13]);
            Ok(())
        })
        .unwrap();
    let unknown = unknown.finish().unwrap();

    let mut patched = data[..split].to_vec();
    patched.extend_from_slice(&unknown);
    patched.extend_from_slice(&data[split..]);

    let back = decode_skeleton_bytes(&patched).unwrap();
    assert_eq!(back, decode_skeleton_bytes(&data).unwrap());
}

#[test]
fn test_weights_capped_at_four() {
    let mut submesh = triangle("skin");
    let weights: Vec<BoneWeight> = (0..6).map(|b| BoneWeight::new(b, 0.1 * f32::from(b + 1))).collect();
    submesh.vertices[0].weights = weights;
    let mesh = Mesh { submeshes: vec![submesh], skeleton_link: Some("x.skeleton".into()), ..Mesh::default() };

    let data = encode_mesh_bytes(&mesh, &MeshEncodeOptions::default()).unwrap();
    let back = decode_mesh_bytes(&data).unwrap();
    let kept = &back.submeshes[0].vertices[0].weights;

    assert_eq!(kept.len(), 4);
    let mut bones: Vec<BoneId> = kept.iter().map(|w| w.bone).collect();
    bones.sort_unstable();
    assert_eq!(bones, vec![2, 3, 4, 5]);
    let sum: f32 = kept.iter().map(|w| w.weight).sum();
    assert!((sum - 1.0).abs() < 1e-5);
}

#[test]
fn test_cyclic_skeleton_rejected() {
    let mut w = ChunkWriter::new();
    write_version_header(&mut w, "[Serializer_v1.10]").unwrap();
    for (id, name) in [(0u16, "A"), (1, "B")] {
        w.chunk(skeleton_ids::BONE, |w| {
            w.write_string(name);
            w.write_u16(id);
            w.write_vec3(Vec3::Y);
            w.write_quat(Quat::IDENTITY);
            Ok(())
        })
        .unwrap();
    }
    for (child, parent) in [(0u16, 1u16), (1, 0)] {
        w.chunk(skeleton_ids::BONE_PARENT, |w| {
            w.write_u16(child);
            w.write_u16(parent);
            Ok(())
        })
        .unwrap();
    }
    let data = w.finish().unwrap();

    let err = decode_skeleton_bytes(&data).unwrap_err();
    assert!(matches!(err, Error::CyclicSkeleton { .. }), "got {err:?}");
}

#[test]
fn test_tangents_from_degenerate_uvs_stay_finite() {
    let mut submesh = triangle("flat");
    for v in &mut submesh.vertices {
        v.uvs = vec![Vec2::splat(0.5)];
    }
    assert_eq!(tangents::generate(&mut submesh, 0, true), 1);
    for v in &submesh.vertices {
        let tangent = v.tangent.unwrap();
        assert!(tangent.is_finite());
        assert!(v.binormal.unwrap().is_finite());
    }
}

#[test]
fn test_keyframes_coalesce_last_wins() {
    let a = Vec3::new(1.0, 0.0, 0.0);
    let b = Vec3::new(2.0, 0.0, 0.0);
    let c = Vec3::new(3.0, 0.0, 0.0);
    let d = Vec3::new(4.0, 0.0, 0.0);

    let mut skeleton = two_bone_skeleton();
    let mut anim = Animation::new("jitter", 2.0);
    anim.tracks.push(BoneTrack {
        bone: 0,
        keyframes: [(0.0, a), (1.0, b), (1.0, c), (2.0, d)]
            .into_iter()
            .map(|(t, p)| Keyframe::new(t, p, Quat::IDENTITY))
            .collect(),
    });
    skeleton.animations.push(anim);

    let data = encode_skeleton_bytes(&skeleton, &SkeletonEncodeOptions::default()).unwrap();
    let back = decode_skeleton_bytes(&data).unwrap();
    let keys: Vec<(f32, Vec3)> =
        back.animations[0].tracks[0].keyframes.iter().map(|k| (k.time, k.translation)).collect();
    assert_eq!(keys, vec![(0.0, a), (1.0, c), (2.0, d)]);
}

#[test]
fn test_bone_ids_persist_across_reexport() {
    let drafts = vec![
        BoneDraft::new("Root", None, Transform::IDENTITY),
        BoneDraft::new("Spine", Some("Root"), Transform::IDENTITY),
        BoneDraft::new("Head", Some("Spine"), Transform::IDENTITY),
    ];
    let first = assign_bone_ids(&drafts, None).unwrap();

    // Reordered, with a new bone inserted in the middle.
    let drafts = vec![
        BoneDraft::new("Head", Some("Spine"), Transform::IDENTITY),
        BoneDraft::new("Tail", Some("Root"), Transform::IDENTITY),
        BoneDraft::new("Root", None, Transform::IDENTITY),
        BoneDraft::new("Spine", Some("Root"), Transform::IDENTITY),
    ];
    let second = assign_bone_ids(&drafts, Some(&first)).unwrap();

    for name in ["Root", "Spine", "Head"] {
        assert_eq!(second.bone_by_name(name).unwrap().id, first.bone_by_name(name).unwrap().id);
    }
    assert_eq!(second.bone_by_name("Tail").unwrap().id, 3);

    let third = assign_bone_ids(&drafts, Some(&second)).unwrap();
    assert_eq!(third, second);
}

#[test]
fn test_truncated_file_creates_nothing() {
    let dir = tempdir().unwrap();
    let mesh = Mesh { submeshes: vec![triangle("skin")], ..Mesh::default() };
    let data = encode_mesh_bytes(&mesh, &MeshEncodeOptions::default()).unwrap();

    let mut reader = ChunkReader::new(&data);
    read_version_header(&mut reader).unwrap();
    let mesh_payload = reader.position() + ids::CHUNK_HEADER_SIZE as u64;

    let path = dir.path().join("broken.mesh");
    std::fs::write(&path, &data[..data.len() - 7]).unwrap();

    let mut scene = MemoryScene::new(UpAxis::Y);
    let err = import_mesh(&mut scene, &path, &ImportOptions::default()).unwrap_err();
    match err.innermost() {
        Error::TruncatedInput { offset, .. } => assert_eq!(*offset, mesh_payload),
        other => panic!("expected TruncatedInput, got {other:?}"),
    }
    assert_eq!(scene, MemoryScene::new(UpAxis::Y));
}

#[test]
fn test_failed_export_writes_nothing() {
    let dir = tempdir().unwrap();
    let mut scene = quad_scene();
    scene.actions.push(SceneAction {
        name: "wave".into(),
        length: Some(1.0),
        bones: vec![BoneSamples {
            bone: "Missing".into(),
            samples: vec![Keyframe::new(0.0, Vec3::ZERO, Quat::IDENTITY)],
        }],
        shapes: vec![],
    });
    let options = ExportOptions {
        export_skeleton: true,
        export_animation: true,
        export_materials: true,
        ..ExportOptions::default()
    };

    let err = export_scene(&scene, &dir.path().join("tile.mesh"), &options).unwrap_err();
    assert!(matches!(err.innermost(), Error::UnknownBoneName { name } if name == "Missing"));
    assert!(dir_is_empty(dir.path()));

    // Non-finite key times only fail while encoding, still before any write.
    scene.actions[0].bones[0].bone = "Root".into();
    scene.actions[0].bones[0].samples[0].time = f32::NAN;
    let err = export_scene(&scene, &dir.path().join("tile.mesh"), &options).unwrap_err();
    assert!(matches!(err.innermost(), Error::UnorderedKeyframes { .. }), "got {err:?}");
    assert!(dir_is_empty(dir.path()));
}

#[test]
fn test_unbalanced_writer() {
    let mut w = ChunkWriter::new();
    w.begin_chunk(ids::HEADER);
    assert!(matches!(w.finish(), Err(Error::MalformedChunk { chunk_id: ids::HEADER, .. })));

    let mut w = ChunkWriter::new();
    assert!(matches!(w.end_chunk(), Err(Error::MalformedChunk { .. })));
}

#[test]
fn test_concave_polygon_triangulation() {
    // L shape made of three unit squares.
    let points = [
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(2.0, 0.0, 0.0),
        Vec3::new(2.0, 1.0, 0.0),
        Vec3::new(1.0, 1.0, 0.0),
        Vec3::new(1.0, 2.0, 0.0),
        Vec3::new(0.0, 2.0, 0.0),
    ];
    let triangles = triangulate_polygon(&points);
    assert_eq!(triangles.len(), points.len() - 2);

    let area: f32 = triangles
        .iter()
        .map(|&[a, b, c]| (points[b] - points[a]).cross(points[c] - points[a]).z * 0.5)
        .sum();
    assert!((area - 3.0).abs() < 1e-5, "area {area}");
}

#[test]
fn test_welding_keeps_uv_seams() {
    let corner = |uv: Vec2| Vertex::new(Vec3::ONE, Vec3::Y).with_uv(uv);
    let corners = vec![corner(Vec2::ZERO), corner(Vec2::ZERO), corner(Vec2::ONE), corner(Vec2::new(1e-7, 0.0))];

    let (unique, remap) = weld(&corners, &WeldTolerance::default());
    assert_eq!(unique.len(), 2);
    assert_eq!(remap, vec![0, 0, 1, 0]);
}

#[test]
fn test_scene_export_then_import() {
    let dir = tempdir().unwrap();
    let dest = dir.path().join("tile.mesh");
    let options = ExportOptions {
        export_skeleton: true,
        export_materials: true,
        ..ExportOptions::default()
    };
    let result = export_scene(&quad_scene(), &dest, &options).unwrap();
    assert_eq!(result.triangles, 2);
    assert_eq!(result.skeleton_path.as_deref(), Some(dir.path().join("tile.skeleton").as_path()));
    assert!(dir.path().join("tile.material").exists());

    let mut scene = MemoryScene::new(UpAxis::Y);
    let imported = import_mesh(&mut scene, &dest, &ImportOptions::default()).unwrap();
    assert_eq!(imported.vertices, 4);
    assert_eq!(imported.bones, 1);

    assert_eq!(scene.meshes.len(), 1);
    let mesh = &scene.meshes[0];
    assert_eq!(mesh.name, "tile");
    assert_eq!(mesh.materials, vec!["tile_mat".to_string()]);
    assert_eq!(mesh.vertex_groups, vec!["Root".to_string()]);
    assert_eq!(mesh.polygons.len(), 2);
    assert_eq!(scene.armature.as_ref().unwrap().bones[0].name, "Root");
    assert_eq!(scene.materials, vec![SceneMaterial { name: "tile_mat".into(), textures: vec!["tile.png".into()] }]);
    assert_eq!(scene.linked_skeleton.as_ref().unwrap().file, "tile.skeleton");

    // Exporting the imported scene again keeps the bone ids and the link.
    let again = dir.path().join("again.mesh");
    export_scene(&scene, &again, &ExportOptions::default()).unwrap();
    let relinked = read_mesh(&again).unwrap();
    assert_eq!(relinked.skeleton_link.as_deref(), Some("tile.skeleton"));
    assert_eq!(relinked.submeshes[0].vertices[0].weights, vec![BoneWeight::new(0, 1.0)]);
}
