//! Chunk identifiers for OGRE mesh and skeleton files

/// Size of a chunk header: `u16` id + `u32` payload length.
pub const CHUNK_HEADER_SIZE: usize = 6;

/// File header; payload is the serializer version string. Shared by both file kinds.
pub const HEADER: u16 = 0x1000;

/// Mesh file chunks.
pub mod mesh {
    pub const MESH: u16 = 0x3000;
    pub const SUBMESH: u16 = 0x4000;
    pub const SUBMESH_OPERATION: u16 = 0x4010;
    pub const SUBMESH_BONE_ASSIGNMENT: u16 = 0x4100;
    pub const SUBMESH_TEXTURE_ALIAS: u16 = 0x4200;
    pub const GEOMETRY: u16 = 0x5000;
    pub const GEOMETRY_VERTEX_DECLARATION: u16 = 0x5100;
    pub const GEOMETRY_VERTEX_ELEMENT: u16 = 0x5110;
    pub const GEOMETRY_VERTEX_BUFFER: u16 = 0x5200;
    pub const GEOMETRY_VERTEX_BUFFER_DATA: u16 = 0x5210;
    pub const MESH_SKELETON_LINK: u16 = 0x6000;
    pub const MESH_BONE_ASSIGNMENT: u16 = 0x7000;
    pub const MESH_LOD: u16 = 0x8000;
    pub const MESH_BOUNDS: u16 = 0x9000;
    pub const SUBMESH_NAME_TABLE: u16 = 0xA000;
    pub const SUBMESH_NAME_TABLE_ELEMENT: u16 = 0xA100;
    pub const EDGE_LISTS: u16 = 0xB000;
    pub const EDGE_LIST_LOD: u16 = 0xB100;
    pub const EDGE_GROUP: u16 = 0xB110;
    pub const POSES: u16 = 0xC000;
    pub const POSE: u16 = 0xC100;
    pub const POSE_VERTEX: u16 = 0xC111;
    pub const ANIMATIONS: u16 = 0xD000;
    pub const ANIMATION: u16 = 0xD100;
    pub const ANIMATION_TRACK: u16 = 0xD110;
    pub const ANIMATION_MORPH_KEYFRAME: u16 = 0xD111;
    pub const ANIMATION_POSE_KEYFRAME: u16 = 0xD112;
    pub const ANIMATION_POSE_REF: u16 = 0xD113;
    pub const TABLE_EXTREMES: u16 = 0xE000;
}

/// Skeleton file chunks.
pub mod skeleton {
    pub const BLENDMODE: u16 = 0x1010;
    pub const BONE: u16 = 0x2000;
    pub const BONE_PARENT: u16 = 0x3000;
    pub const ANIMATION: u16 = 0x4000;
    pub const ANIMATION_BASEINFO: u16 = 0x4010;
    pub const ANIMATION_TRACK: u16 = 0x4100;
    pub const ANIMATION_TRACK_KEYFRAME: u16 = 0x4110;
    pub const ANIMATION_LINK: u16 = 0x5000;
}

/// Which file family a chunk id is being named for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkFamily {
    Mesh,
    Skeleton,
}

/// Symbolic name for a chunk id, for diagnostics.
#[must_use]
pub fn chunk_name(family: ChunkFamily, id: u16) -> &'static str {
    if id == HEADER {
        return "HEADER";
    }
    match family {
        ChunkFamily::Mesh => match id {
            mesh::MESH => "MESH",
            mesh::SUBMESH => "SUBMESH",
            mesh::SUBMESH_OPERATION => "SUBMESH_OPERATION",
            mesh::SUBMESH_BONE_ASSIGNMENT => "SUBMESH_BONE_ASSIGNMENT",
            mesh::SUBMESH_TEXTURE_ALIAS => "SUBMESH_TEXTURE_ALIAS",
            mesh::GEOMETRY => "GEOMETRY",
            mesh::GEOMETRY_VERTEX_DECLARATION => "GEOMETRY_VERTEX_DECLARATION",
            mesh::GEOMETRY_VERTEX_ELEMENT => "GEOMETRY_VERTEX_ELEMENT",
            mesh::GEOMETRY_VERTEX_BUFFER => "GEOMETRY_VERTEX_BUFFER",
            mesh::GEOMETRY_VERTEX_BUFFER_DATA => "GEOMETRY_VERTEX_BUFFER_DATA",
            mesh::MESH_SKELETON_LINK => "MESH_SKELETON_LINK",
            mesh::MESH_BONE_ASSIGNMENT => "MESH_BONE_ASSIGNMENT",
            mesh::MESH_LOD => "MESH_LOD",
            mesh::MESH_BOUNDS => "MESH_BOUNDS",
            mesh::SUBMESH_NAME_TABLE => "SUBMESH_NAME_TABLE",
            mesh::SUBMESH_NAME_TABLE_ELEMENT => "SUBMESH_NAME_TABLE_ELEMENT",
            mesh::EDGE_LISTS => "EDGE_LISTS",
            mesh::EDGE_LIST_LOD => "EDGE_LIST_LOD",
            mesh::EDGE_GROUP => "EDGE_GROUP",
            mesh::POSES => "POSES",
            mesh::POSE => "POSE",
            mesh::POSE_VERTEX => "POSE_VERTEX",
            mesh::ANIMATIONS => "ANIMATIONS",
            mesh::ANIMATION => "ANIMATION",
            mesh::ANIMATION_TRACK => "ANIMATION_TRACK",
            mesh::ANIMATION_MORPH_KEYFRAME => "ANIMATION_MORPH_KEYFRAME",
            mesh::ANIMATION_POSE_KEYFRAME => "ANIMATION_POSE_KEYFRAME",
            mesh::ANIMATION_POSE_REF => "ANIMATION_POSE_REF",
            mesh::TABLE_EXTREMES => "TABLE_EXTREMES",
            _ => "UNKNOWN",
        },
        ChunkFamily::Skeleton => match id {
            skeleton::BLENDMODE => "BLENDMODE",
            skeleton::BONE => "BONE",
            skeleton::BONE_PARENT => "BONE_PARENT",
            skeleton::ANIMATION => "ANIMATION",
            skeleton::ANIMATION_BASEINFO => "ANIMATION_BASEINFO",
            skeleton::ANIMATION_TRACK => "ANIMATION_TRACK",
            skeleton::ANIMATION_TRACK_KEYFRAME => "ANIMATION_TRACK_KEYFRAME",
            skeleton::ANIMATION_LINK => "ANIMATION_LINK",
            _ => "UNKNOWN",
        },
    }
}

/// Chunks whose payload is followed by nested child chunks.
#[must_use]
pub fn has_children(family: ChunkFamily, id: u16) -> bool {
    match family {
        ChunkFamily::Mesh => matches!(
            id,
            mesh::MESH
                | mesh::SUBMESH
                | mesh::GEOMETRY
                | mesh::GEOMETRY_VERTEX_DECLARATION
                | mesh::GEOMETRY_VERTEX_BUFFER
                | mesh::SUBMESH_NAME_TABLE
                | mesh::EDGE_LISTS
                | mesh::EDGE_LIST_LOD
                | mesh::POSES
                | mesh::POSE
                | mesh::ANIMATIONS
                | mesh::ANIMATION
                | mesh::ANIMATION_TRACK
                | mesh::ANIMATION_POSE_KEYFRAME
        ),
        ChunkFamily::Skeleton => matches!(id, skeleton::ANIMATION | skeleton::ANIMATION_TRACK),
    }
}
