//! Up-axis conversion between a Z-up host and Y-up OGRE data
//!
//! The change of basis is a -90 degree rotation about X:
//! `(x, y, z)` Z-up becomes `(x, z, -y)` Y-up. Vectors are swizzled exactly;
//! rotations are conjugated by the same basis change, which for a proper
//! rotation reduces to swizzling the quaternion's vector part.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::model::{Animation, Mesh, Skeleton, Transform};

/// Which world axis points up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UpAxis {
    /// OGRE's native convention.
    #[default]
    Y,
    Z,
}

/// Direction of an axis conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisConversion {
    ZUpToYUp,
    YUpToZUp,
}

impl AxisConversion {
    /// The conversion taking `from` data to `to`, or `None` when they match.
    #[must_use]
    pub fn between(from: UpAxis, to: UpAxis) -> Option<Self> {
        match (from, to) {
            (UpAxis::Z, UpAxis::Y) => Some(Self::ZUpToYUp),
            (UpAxis::Y, UpAxis::Z) => Some(Self::YUpToZUp),
            _ => None,
        }
    }

    #[must_use]
    pub fn vec(self, v: Vec3) -> Vec3 {
        match self {
            Self::ZUpToYUp => Vec3::new(v.x, v.z, -v.y),
            Self::YUpToZUp => Vec3::new(v.x, -v.z, v.y),
        }
    }

    /// Per-axis magnitudes (scale) follow the axes without sign changes.
    #[must_use]
    pub fn scale(self, s: Vec3) -> Vec3 {
        Vec3::new(s.x, s.z, s.y)
    }

    #[must_use]
    pub fn quat(self, q: Quat) -> Quat {
        let v = self.vec(Vec3::new(q.x, q.y, q.z));
        Quat::from_xyzw(v.x, v.y, v.z, q.w).normalize()
    }

    #[must_use]
    pub fn transform(self, t: &Transform) -> Transform {
        Transform {
            translation: self.vec(t.translation),
            rotation: self.quat(t.rotation),
            scale: self.scale(t.scale),
        }
    }

    pub fn apply_mesh(self, mesh: &mut Mesh) {
        for submesh in &mut mesh.submeshes {
            for v in &mut submesh.vertices {
                v.position = self.vec(v.position);
                v.normal = self.vec(v.normal);
                if let Some(t) = &mut v.tangent {
                    *t = self.vec(t.truncate()).extend(t.w);
                }
                if let Some(b) = &mut v.binormal {
                    *b = self.vec(*b);
                }
            }
        }
        for pose in &mut mesh.poses {
            for (_, offset) in &mut pose.offsets {
                *offset = self.vec(*offset);
            }
            if let Some(normals) = &mut pose.normals {
                for n in normals {
                    *n = self.vec(*n);
                }
            }
        }
    }

    pub fn apply_skeleton(self, skeleton: &mut Skeleton) {
        for bone in &mut skeleton.bones {
            bone.transform = self.transform(&bone.transform);
        }
        for animation in &mut skeleton.animations {
            self.apply_animation(animation);
        }
    }

    pub fn apply_animation(self, animation: &mut Animation) {
        for track in &mut animation.tracks {
            for key in &mut track.keyframes {
                key.translation = self.vec(key.translation);
                key.rotation = self.quat(key.rotation);
                key.scale = self.scale(key.scale);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_up_maps_to_up() {
        assert_eq!(AxisConversion::ZUpToYUp.vec(Vec3::Z), Vec3::Y);
        assert_eq!(AxisConversion::YUpToZUp.vec(Vec3::Y), Vec3::Z);
        let v = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(AxisConversion::YUpToZUp.vec(AxisConversion::ZUpToYUp.vec(v)), v);
    }

    #[test]
    fn test_rotation_is_conjugated() {
        // A quarter turn about host up becomes a quarter turn about OGRE up.
        let q = AxisConversion::ZUpToYUp.quat(Quat::from_rotation_z(FRAC_PI_2));
        assert!(q.dot(Quat::from_rotation_y(FRAC_PI_2)).abs() > 0.99999);

        // Rotating then converting equals converting then rotating.
        let host = Quat::from_euler(glam::EulerRot::XYZ, 0.3, -0.7, 1.1);
        let p = Vec3::new(0.5, -1.0, 2.0);
        let c = AxisConversion::ZUpToYUp;
        let a = c.vec(host * p);
        let b = c.quat(host) * c.vec(p);
        assert!((a - b).length() < 1e-5);
    }

    #[test]
    fn test_between() {
        assert_eq!(AxisConversion::between(UpAxis::Y, UpAxis::Y), None);
        assert_eq!(AxisConversion::between(UpAxis::Z, UpAxis::Y), Some(AxisConversion::ZUpToYUp));
    }
}
