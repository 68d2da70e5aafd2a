//! Skeleton codec for `.skeleton` files
//!
//! A skeleton file is a flat list of `BONE` chunks, `BONE_PARENT` records that
//! rebuild the hierarchy, and `ANIMATION` chunks with per-bone keyframe
//! tracks. Two serializer versions are understood; Torchlight ships v1.10.

mod ids;

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::animation::{decode_bone_animation, encode_bone_animation};
use super::chunk::ids::skeleton as chunk_ids;
use super::chunk::{ChunkHeader, ChunkReader, ChunkWriter};
use super::{read_version_header, write_version_header};
use crate::error::{Error, Result};
use crate::model::{BlendMode, Bone, Skeleton, Transform};

pub use ids::{BoneDraft, BoneIdAllocator, assign_bone_ids};

/// Skeleton serializer versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SkeletonVersion {
    /// `[Serializer_v1.10]`: scale optional, no blend mode.
    #[default]
    V1_10,
    /// `[Serializer_v1.80]`: blend mode chunk, scale always present.
    V1_80,
}

/// What a skeleton version's chunks contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkeletonFeatures {
    /// File carries a `BLENDMODE` chunk.
    pub blend_mode: bool,
    /// Bone and keyframe scale are always written rather than only when the
    /// chunk has room for them.
    pub scale_always: bool,
}

impl SkeletonVersion {
    #[must_use]
    pub fn from_header(header: &str) -> Option<Self> {
        match header {
            "[Serializer_v1.10]" => Some(Self::V1_10),
            "[Serializer_v1.80]" => Some(Self::V1_80),
            _ => None,
        }
    }

    #[must_use]
    pub fn header(self) -> &'static str {
        match self {
            Self::V1_10 => "[Serializer_v1.10]",
            Self::V1_80 => "[Serializer_v1.80]",
        }
    }

    #[must_use]
    pub fn features(self) -> SkeletonFeatures {
        match self {
            Self::V1_10 => SkeletonFeatures { blend_mode: false, scale_always: false },
            Self::V1_80 => SkeletonFeatures { blend_mode: true, scale_always: true },
        }
    }
}

/// Options for [`encode_skeleton`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkeletonEncodeOptions {
    pub version: SkeletonVersion,
}

/// Read and decode a `.skeleton` file.
///
/// # Errors
/// IO errors, or any decode error wrapped with the file path.
pub fn read_skeleton<P: AsRef<Path>>(path: P) -> Result<Skeleton> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|e| Error::from(e).in_file(path))?;
    decode_skeleton_bytes(&data).map_err(|e| e.in_file(path))
}

/// Decode a skeleton from an in-memory buffer.
///
/// # Errors
/// See [`decode_skeleton`].
pub fn decode_skeleton_bytes(data: &[u8]) -> Result<Skeleton> {
    let mut reader = ChunkReader::new(data);
    decode_skeleton(&mut reader)
}

/// Decode a skeleton. Nothing is returned unless the whole bone forest is
/// valid.
///
/// # Errors
/// [`Error::UnsupportedVersion`], [`Error::DuplicateBoneId`],
/// [`Error::UnknownBone`], [`Error::CyclicSkeleton`], and chunk errors.
pub fn decode_skeleton(reader: &mut ChunkReader<'_>) -> Result<Skeleton> {
    let header = read_version_header(reader)?;
    let version = SkeletonVersion::from_header(&header)
        .ok_or_else(|| Error::UnsupportedVersion { found: header.clone() })?;
    let features = version.features();

    let mut skeleton = Skeleton::default();
    let mut parents: Vec<(u16, u16)> = Vec::new();

    while !reader.is_at_end() {
        let chunk = reader.read_chunk_header()?;
        match chunk.id {
            chunk_ids::BLENDMODE => {
                reader.enter(&chunk);
                skeleton.blend_mode = BlendMode::from_u16(reader.read_u16()?);
                reader.leave(&chunk)?;
            }
            chunk_ids::BONE => {
                let bone = read_bone(reader, &chunk, features)?;
                if skeleton.bone(bone.id).is_some() {
                    return Err(Error::DuplicateBoneId { bone_id: bone.id });
                }
                skeleton.bones.push(bone);
            }
            chunk_ids::BONE_PARENT => {
                reader.enter(&chunk);
                let child = reader.read_u16()?;
                let parent = reader.read_u16()?;
                reader.leave(&chunk)?;
                parents.push((child, parent));
            }
            chunk_ids::ANIMATION => {
                let animation = decode_bone_animation(reader, &chunk, features, &skeleton)?;
                skeleton.animations.push(animation);
            }
            _ => reader.skip_chunk(&chunk)?,
        }
    }

    for (child, parent) in parents {
        if skeleton.bone(parent).is_none() {
            return Err(Error::UnknownBone { bone_id: parent });
        }
        let Some(bone) = skeleton.bones.iter_mut().find(|b| b.id == child) else {
            return Err(Error::UnknownBone { bone_id: child });
        };
        if let Some(previous) = bone.parent.replace(parent)
            && previous != parent
        {
            tracing::warn!("Bone '{}' reparented from {previous} to {parent}", bone.name);
        }
    }
    skeleton.validate()?;

    let mut seen = std::collections::HashSet::new();
    for bone in &skeleton.bones {
        if !seen.insert(bone.name.as_str()) {
            tracing::warn!("Duplicate bone name '{}'", bone.name);
        }
    }
    let degenerate = skeleton.degenerate_bones();
    if !degenerate.is_empty() {
        tracing::warn!("{} degenerate (zero-length) bone(s): {degenerate:?}", degenerate.len());
    }

    tracing::debug!(
        "Decoded skeleton {version:?}: {} bones, {} animations",
        skeleton.bones.len(),
        skeleton.animations.len()
    );
    Ok(skeleton)
}

fn read_bone(reader: &mut ChunkReader<'_>, chunk: &ChunkHeader, features: SkeletonFeatures) -> Result<Bone> {
    reader.enter(chunk);
    let name = reader.read_string()?;
    let id = reader.read_u16()?;
    let translation = reader.read_vec3()?;
    let rotation = reader.read_quat()?.normalize();
    let scale = if features.scale_always || reader.remaining_in_chunk() >= 12 {
        reader.read_vec3()?
    } else {
        Vec3::ONE
    };
    reader.leave(chunk)?;
    Ok(Bone { id, name, parent: None, transform: Transform { translation, rotation, scale } })
}

/// Encode a skeleton into a fresh buffer.
///
/// # Errors
/// See [`encode_skeleton`].
pub fn encode_skeleton_bytes(skeleton: &Skeleton, options: &SkeletonEncodeOptions) -> Result<Vec<u8>> {
    let mut writer = ChunkWriter::new();
    encode_skeleton(&mut writer, skeleton, options)?;
    writer.finish()
}

/// Encode a skeleton: header, bones, parent records, then animations.
///
/// # Errors
/// The same forest errors as decoding, plus animation errors.
pub fn encode_skeleton(writer: &mut ChunkWriter, skeleton: &Skeleton, options: &SkeletonEncodeOptions) -> Result<()> {
    skeleton.validate()?;
    let features = options.version.features();

    write_version_header(writer, options.version.header())?;
    if features.blend_mode {
        writer.chunk(chunk_ids::BLENDMODE, |w| {
            w.write_u16(skeleton.blend_mode.as_u16());
            Ok(())
        })?;
    } else if skeleton.blend_mode != BlendMode::Average {
        tracing::warn!("{:?} cannot store the blend mode; it will read back as Average", options.version);
    }

    for bone in &skeleton.bones {
        writer.chunk(chunk_ids::BONE, |w| {
            w.write_string(&bone.name);
            w.write_u16(bone.id);
            w.write_vec3(bone.transform.translation);
            w.write_quat(bone.transform.rotation.normalize());
            if features.scale_always || bone.transform.scale != Vec3::ONE {
                w.write_vec3(bone.transform.scale);
            }
            Ok(())
        })?;
    }

    for bone in &skeleton.bones {
        if let Some(parent) = bone.parent {
            writer.chunk(chunk_ids::BONE_PARENT, |w| {
                w.write_u16(bone.id);
                w.write_u16(parent);
                Ok(())
            })?;
        }
    }

    for animation in &skeleton.animations {
        encode_bone_animation(writer, animation, features, skeleton)?;
    }

    tracing::debug!(
        "Encoded skeleton {:?}: {} bones, {} animations",
        options.version,
        skeleton.bones.len(),
        skeleton.animations.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Animation, BoneTrack, Keyframe};
    use glam::Quat;
    use pretty_assertions::assert_eq;

    fn bone(id: u16, name: &str, parent: Option<u16>, t: Vec3) -> Bone {
        Bone { id, name: name.into(), parent, transform: Transform::new(t, Quat::from_rotation_x(0.25)) }
    }

    fn sample() -> Skeleton {
        let mut anim = Animation::new("wave", 1.0);
        anim.tracks.push(BoneTrack {
            bone: 1,
            keyframes: vec![
                Keyframe::new(0.0, Vec3::ZERO, Quat::IDENTITY),
                Keyframe::new(1.0, Vec3::Y, Quat::from_rotation_y(1.0)),
            ],
        });
        Skeleton {
            bones: vec![
                bone(0, "root", None, Vec3::ZERO),
                bone(1, "arm", Some(0), Vec3::new(0.0, 1.5, 0.0)),
                bone(7, "hand", Some(1), Vec3::new(0.0, 0.5, 0.0)),
            ],
            blend_mode: BlendMode::Average,
            animations: vec![anim],
        }
    }

    fn assert_close(a: &Skeleton, b: &Skeleton) {
        assert_eq!(a.bones.len(), b.bones.len());
        for (x, y) in a.bones.iter().zip(&b.bones) {
            assert_eq!((x.id, &x.name, x.parent), (y.id, &y.name, y.parent));
            assert!((x.transform.translation - y.transform.translation).length() < 1e-6);
            assert!(x.transform.rotation.dot(y.transform.rotation).abs() > 0.99999);
        }
        assert_eq!(a.animations.len(), b.animations.len());
    }

    #[test]
    fn test_roundtrip_v1_10() {
        let skeleton = sample();
        let data = encode_skeleton_bytes(&skeleton, &SkeletonEncodeOptions::default()).unwrap();
        let back = decode_skeleton_bytes(&data).unwrap();
        assert_close(&skeleton, &back);
        assert_eq!(back.animations[0].tracks[0].keyframes.len(), 2);
    }

    #[test]
    fn test_roundtrip_v1_80_keeps_blend_mode() {
        let mut skeleton = sample();
        skeleton.blend_mode = BlendMode::Cumulative;
        skeleton.bones[2].transform.scale = Vec3::splat(0.5);
        let options = SkeletonEncodeOptions { version: SkeletonVersion::V1_80 };
        let data = encode_skeleton_bytes(&skeleton, &options).unwrap();
        let back = decode_skeleton_bytes(&data).unwrap();
        assert_eq!(back.blend_mode, BlendMode::Cumulative);
        assert_eq!(back.bones[2].transform.scale, Vec3::splat(0.5));
        assert_close(&skeleton, &back);
    }

    #[test]
    fn test_cyclic_parent_records_rejected() {
        let mut w = ChunkWriter::new();
        write_version_header(&mut w, SkeletonVersion::V1_10.header()).unwrap();
        for (id, name) in [(0u16, "a"), (1, "b")] {
            w.chunk(chunk_ids::BONE, |w| {
                w.write_string(name);
                w.write_u16(id);
                w.write_vec3(Vec3::Y);
                w.write_quat(Quat::IDENTITY);
                Ok(())
            })
            .unwrap();
        }
        for (child, parent) in [(0u16, 1u16), (1, 0)] {
            w.chunk(chunk_ids::BONE_PARENT, |w| {
                w.write_u16(child);
                w.write_u16(parent);
                Ok(())
            })
            .unwrap();
        }
        let data = w.finish().unwrap();
        assert!(matches!(decode_skeleton_bytes(&data), Err(Error::CyclicSkeleton { .. })));
    }

    #[test]
    fn test_parent_record_for_unknown_bone() {
        let mut w = ChunkWriter::new();
        write_version_header(&mut w, SkeletonVersion::V1_10.header()).unwrap();
        w.chunk(chunk_ids::BONE_PARENT, |w| {
            w.write_u16(4);
            w.write_u16(5);
            Ok(())
        })
        .unwrap();
        let data = w.finish().unwrap();
        assert!(matches!(decode_skeleton_bytes(&data), Err(Error::UnknownBone { bone_id: 5 })));
    }

    #[test]
    fn test_unknown_chunks_are_skipped() {
        let skeleton = sample();
        let mut data = encode_skeleton_bytes(&skeleton, &SkeletonEncodeOptions::default()).unwrap();
        let plain = decode_skeleton_bytes(&data).unwrap();
        // Splice an unknown top-level chunk right after the header.
        let header_len = 6 + SkeletonVersion::V1_10.header().len() + 1;
        let mut unknown = 0x7A7Au16.to_le_bytes().to_vec();
        unknown.extend_from_slice(&3u32.to_le_bytes());
        unknown.extend_from_slice(&[9, 9, 9]);
        data.splice(header_len..header_len, unknown);

        assert_eq!(decode_skeleton_bytes(&data).unwrap(), plain);
    }

    #[test]
    fn test_encode_rejects_invalid_forest() {
        let mut skeleton = sample();
        skeleton.bones[0].parent = Some(7);
        let err = encode_skeleton_bytes(&skeleton, &SkeletonEncodeOptions::default()).unwrap_err();
        assert!(matches!(err, Error::CyclicSkeleton { .. }));
    }

    #[test]
    fn test_mesh_header_is_unsupported() {
        let mut w = ChunkWriter::new();
        write_version_header(&mut w, "[MeshSerializer_v1.41]").unwrap();
        let data = w.finish().unwrap();
        assert!(matches!(decode_skeleton_bytes(&data), Err(Error::UnsupportedVersion { .. })));
    }
}
