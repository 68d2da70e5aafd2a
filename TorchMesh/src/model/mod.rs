//! Normalized in-memory model shared by every codec
//!
//! These are plain owned values with no link back to any host scene. The
//! scene adapter is the only place that knows about host objects.

pub mod animation;
pub mod edge_list;
pub mod mesh;
pub mod skeleton;

pub use animation::{Animation, BoneTrack, Keyframe, MorphKey, MorphTrack, suggest_frame_rate};
pub use edge_list::{Edge, EdgeGroup, EdgeList, EdgeTriangle};
pub use mesh::{
    BoneWeight, Bounds, MAX_BONE_INFLUENCES, Mesh, Pose, Submesh, Vertex, normalize_weights,
};
pub use skeleton::{BlendMode, Bone, BoneId, Skeleton, Transform};
