//! Animation codec: skeleton bone tracks and mesh pose (morph) tracks
//!
//! Bone animations live in `.skeleton` files under `ANIMATION` chunks. Shape
//! key animations live in the mesh file as OGRE pose animations: each track
//! targets one submesh and each keyframe lists pose influences.

pub mod keyframes;

use std::collections::BTreeMap;

use glam::Vec3;

use super::chunk::ids::{mesh as mesh_ids, skeleton as skeleton_ids};
use super::chunk::{ChunkHeader, ChunkReader, ChunkWriter};
use super::skeleton::SkeletonFeatures;
use crate::error::{Error, Result};
use crate::model::{Animation, BoneTrack, Keyframe, Mesh, MorphKey, MorphTrack, Pose, Skeleton};

pub use keyframes::{Timed, is_strictly_increasing, normalize_keys};

/// Track type value for pose animation tracks.
pub const TRACK_TYPE_POSE: u16 = 2;

/// Size of an `ANIMATION_TRACK_KEYFRAME` scale field.
const SCALE_SIZE: u64 = 12;

fn bone_label(skeleton: &Skeleton, bone: u16) -> String {
    skeleton.bone(bone).map_or_else(|| format!("bone {bone}"), |b| b.name.clone())
}

// ==================== Bone animations ====================

/// Decode one skeleton `ANIMATION` chunk whose header was just read.
///
/// # Errors
/// [`Error::UnknownBone`] for a track naming a bone the skeleton lacks,
/// [`Error::UnorderedKeyframes`] for non-finite times, and chunk errors.
pub fn decode_bone_animation(
    reader: &mut ChunkReader<'_>,
    header: &ChunkHeader,
    features: SkeletonFeatures,
    skeleton: &Skeleton,
) -> Result<Animation> {
    reader.enter(header);
    let name = reader.read_string()?;
    let length = reader.read_f32()?;
    let mut animation = Animation::new(name, length);

    while reader.has_more_in(header) {
        let child = reader.read_chunk_header()?;
        match child.id {
            skeleton_ids::ANIMATION_TRACK => {
                let track = decode_bone_track(reader, &child, features, skeleton)?;
                animation.tracks.push(track);
            }
            _ => reader.skip_chunk(&child)?,
        }
    }
    reader.leave(header)?;

    tracing::debug!(
        "Decoded animation '{}' ({:.3}s, {} tracks)",
        animation.name,
        animation.length,
        animation.tracks.len()
    );
    Ok(animation)
}

fn decode_bone_track(
    reader: &mut ChunkReader<'_>,
    header: &ChunkHeader,
    features: SkeletonFeatures,
    skeleton: &Skeleton,
) -> Result<BoneTrack> {
    reader.enter(header);
    let bone = reader.read_u16()?;
    if skeleton.bone(bone).is_none() {
        return Err(Error::UnknownBone { bone_id: bone });
    }

    let mut keyframes = Vec::new();
    while reader.has_more_in(header) {
        let child = reader.read_chunk_header()?;
        if child.id != skeleton_ids::ANIMATION_TRACK_KEYFRAME {
            reader.skip_chunk(&child)?;
            continue;
        }
        reader.enter(&child);
        let time = reader.read_f32()?;
        let rotation = reader.read_quat()?.normalize();
        let translation = reader.read_vec3()?;
        let scale = if features.scale_always || reader.remaining_in_chunk() >= SCALE_SIZE {
            reader.read_vec3()?
        } else {
            Vec3::ONE
        };
        reader.leave(&child)?;
        keyframes.push(Keyframe { time, translation, rotation, scale });
    }
    reader.leave(header)?;

    normalize_keys(&bone_label(skeleton, bone), &mut keyframes)?;
    Ok(BoneTrack { bone, keyframes })
}

/// Encode one bone animation as a skeleton `ANIMATION` chunk.
///
/// Keys are normalized (sorted, coalesced) on the way out.
///
/// # Errors
/// [`Error::UnknownBone`] for tracks targeting missing bones and
/// [`Error::UnorderedKeyframes`] for non-finite times.
pub fn encode_bone_animation(
    writer: &mut ChunkWriter,
    animation: &Animation,
    features: SkeletonFeatures,
    skeleton: &Skeleton,
) -> Result<()> {
    if !animation.morph_tracks.is_empty() {
        tracing::warn!(
            "Animation '{}': {} shape key track(s) belong in the mesh file, not the skeleton",
            animation.name,
            animation.morph_tracks.len()
        );
    }

    writer.chunk(skeleton_ids::ANIMATION, |w| {
        w.write_string(&animation.name);
        w.write_f32(animation.length);

        for track in &animation.tracks {
            if skeleton.bone(track.bone).is_none() {
                return Err(Error::UnknownBone { bone_id: track.bone });
            }
            let mut keys = track.keyframes.clone();
            normalize_keys(&bone_label(skeleton, track.bone), &mut keys)?;

            w.chunk(skeleton_ids::ANIMATION_TRACK, |w| {
                w.write_u16(track.bone);
                for key in &keys {
                    w.chunk(skeleton_ids::ANIMATION_TRACK_KEYFRAME, |w| {
                        w.write_f32(key.time);
                        w.write_quat(key.rotation.normalize());
                        w.write_vec3(key.translation);
                        if features.scale_always || key.scale != Vec3::ONE {
                            w.write_vec3(key.scale);
                        }
                        Ok(())
                    })?;
                }
                Ok(())
            })?;
        }
        Ok(())
    })
}

// ==================== Pose (morph) animations ====================

/// Decode the mesh `ANIMATIONS` chunk whose header was just read.
///
/// Every pose referenced in a track becomes a [`MorphTrack`] named after the
/// pose; keyframes that omit a pose give it weight 0.0. Poses sharing a name
/// yield one track per animation.
///
/// # Errors
/// [`Error::MalformedChunk`] for pose references past the pose list, plus
/// ordering and chunk errors.
pub fn decode_morph_animations(
    reader: &mut ChunkReader<'_>,
    header: &ChunkHeader,
    poses: &[Pose],
) -> Result<Vec<Animation>> {
    reader.enter(header);
    let mut animations = Vec::new();
    while reader.has_more_in(header) {
        let child = reader.read_chunk_header()?;
        if child.id == mesh_ids::ANIMATION {
            animations.push(decode_morph_animation(reader, &child, poses)?);
        } else {
            reader.skip_chunk(&child)?;
        }
    }
    reader.leave(header)?;
    Ok(animations)
}

fn decode_morph_animation(
    reader: &mut ChunkReader<'_>,
    header: &ChunkHeader,
    poses: &[Pose],
) -> Result<Animation> {
    reader.enter(header);
    let name = reader.read_string()?;
    let length = reader.read_f32()?;
    let mut animation = Animation::new(name, length);

    while reader.has_more_in(header) {
        let child = reader.read_chunk_header()?;
        if child.id == mesh_ids::ANIMATION_TRACK {
            for track in decode_pose_track(reader, &child, poses)? {
                // Poses split across submeshes share a name; the first curve stands for all.
                if !animation.morph_tracks.iter().any(|t| t.shape == track.shape) {
                    animation.morph_tracks.push(track);
                }
            }
        } else {
            reader.skip_chunk(&child)?;
        }
    }
    reader.leave(header)?;
    Ok(animation)
}

fn decode_pose_track(
    reader: &mut ChunkReader<'_>,
    header: &ChunkHeader,
    poses: &[Pose],
) -> Result<Vec<MorphTrack>> {
    reader.enter(header);
    let track_type = reader.read_u16()?;
    let target = reader.read_u16()?;
    if track_type != TRACK_TYPE_POSE {
        tracing::warn!("Skipping vertex animation track of type {track_type} (target {target})");
        reader.skip(header.end() - reader.position())?;
        reader.leave(header)?;
        return Ok(Vec::new());
    }

    // (time, [(pose, influence)]) in file order.
    let mut frames: Vec<(f32, Vec<(u16, f32)>)> = Vec::new();
    while reader.has_more_in(header) {
        let child = reader.read_chunk_header()?;
        if child.id != mesh_ids::ANIMATION_POSE_KEYFRAME {
            reader.skip_chunk(&child)?;
            continue;
        }
        reader.enter(&child);
        let time = reader.read_f32()?;
        let mut refs = Vec::new();
        while reader.has_more_in(&child) {
            let pose_ref = reader.read_chunk_header()?;
            if pose_ref.id != mesh_ids::ANIMATION_POSE_REF {
                reader.skip_chunk(&pose_ref)?;
                continue;
            }
            reader.enter(&pose_ref);
            let pose = reader.read_u16()?;
            let influence = reader.read_f32()?;
            if usize::from(pose) >= poses.len() {
                return Err(reader.malformed(format!(
                    "pose reference {pose} but the mesh has {} poses",
                    poses.len()
                )));
            }
            reader.leave(&pose_ref)?;
            refs.push((pose, influence));
        }
        reader.leave(&child)?;
        frames.push((time, refs));
    }
    reader.leave(header)?;

    // Referenced poses in first-reference order.
    let mut order: Vec<u16> = Vec::new();
    for (_, refs) in &frames {
        for (pose, _) in refs {
            if !order.contains(pose) {
                order.push(*pose);
            }
        }
    }

    let mut tracks = Vec::with_capacity(order.len());
    for pose in order {
        let shape = poses[usize::from(pose)].name.clone();
        let mut keys: Vec<MorphKey> = frames
            .iter()
            .map(|(time, refs)| MorphKey {
                time: *time,
                weight: refs.iter().rev().find(|(p, _)| *p == pose).map_or(0.0, |(_, w)| *w),
            })
            .collect();
        normalize_keys(&shape, &mut keys)?;
        tracks.push(MorphTrack { shape, keys });
    }
    Ok(tracks)
}

/// Poses driven on one submesh, each with the track driving it.
type TargetPoses = Vec<(u16, MorphTrack)>;

/// Encode the mesh's morph animations as an `ANIMATIONS` chunk.
///
/// A track drives every pose named after its shape. Each animation gets one
/// pose track per target submesh; its keyframes sit at the union of the
/// driving tracks' key times and reference every pose on that submesh.
/// Writes nothing when no animation carries morph tracks.
///
/// # Errors
/// [`Error::UnknownShape`] when a track names a shape that is not a pose of
/// the mesh.
pub fn encode_morph_animations(writer: &mut ChunkWriter, mesh: &Mesh) -> Result<()> {
    let animated: Vec<&Animation> = mesh.animations.iter().filter(|a| !a.morph_tracks.is_empty()).collect();
    if animated.is_empty() {
        return Ok(());
    }

    // Resolve every shape before writing anything.
    let mut resolved: Vec<BTreeMap<u16, TargetPoses>> = Vec::with_capacity(animated.len());
    for animation in &animated {
        if !animation.tracks.is_empty() {
            tracing::warn!(
                "Animation '{}': bone tracks are written to the skeleton, not the mesh",
                animation.name
            );
        }
        let mut targets: BTreeMap<u16, TargetPoses> = BTreeMap::new();
        for track in &animation.morph_tracks {
            let mut keys = track.keys.clone();
            normalize_keys(&track.shape, &mut keys)?;
            let normalized = MorphTrack { shape: track.shape.clone(), keys };

            let mut matched = false;
            for (index, pose) in mesh.poses.iter().enumerate().filter(|(_, p)| p.name == track.shape) {
                matched = true;
                let pose_id = u16::try_from(index)
                    .map_err(|_| Error::InvalidMesh(format!("pose index {index} exceeds u16")))?;
                let target = u16::try_from(pose.submesh + 1).map_err(|_| {
                    Error::InvalidMesh(format!("pose '{}' targets submesh past u16", track.shape))
                })?;
                let driven = targets.entry(target).or_default();
                match driven.iter_mut().find(|(p, _)| *p == pose_id) {
                    Some(slot) => slot.1 = normalized.clone(),
                    None => driven.push((pose_id, normalized.clone())),
                }
            }
            if !matched {
                return Err(Error::UnknownShape { name: track.shape.clone() });
            }
        }
        resolved.push(targets);
    }

    writer.chunk(mesh_ids::ANIMATIONS, |w| {
        for (animation, targets) in animated.iter().zip(&resolved) {
            w.chunk(mesh_ids::ANIMATION, |w| {
                w.write_string(&animation.name);
                w.write_f32(animation.length);
                for (target, driven) in targets {
                    let mut times: Vec<f32> =
                        driven.iter().flat_map(|(_, track)| track.keys.iter().map(|k| k.time)).collect();
                    times.sort_by(f32::total_cmp);
                    times.dedup();

                    w.chunk(mesh_ids::ANIMATION_TRACK, |w| {
                        w.write_u16(TRACK_TYPE_POSE);
                        w.write_u16(*target);
                        for &time in &times {
                            w.chunk(mesh_ids::ANIMATION_POSE_KEYFRAME, |w| {
                                w.write_f32(time);
                                for (pose, track) in driven {
                                    let Some(weight) = track.sample(time) else { continue };
                                    w.chunk(mesh_ids::ANIMATION_POSE_REF, |w| {
                                        w.write_u16(*pose);
                                        w.write_f32(weight);
                                        Ok(())
                                    })?;
                                }
                                Ok(())
                            })?;
                        }
                        Ok(())
                    })?;
                }
                Ok(())
            })?;
        }
        Ok(())
    })
}
