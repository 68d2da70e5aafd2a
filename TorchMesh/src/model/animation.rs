//! Animation, track and keyframe types

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::skeleton::BoneId;

/// A bone pose at one point in time, relative to the bind pose.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub time: f32,
    pub translation: Vec3,
    pub rotation: Quat,
    #[serde(default = "unit_scale")]
    pub scale: Vec3,
}

fn unit_scale() -> Vec3 {
    Vec3::ONE
}

impl Keyframe {
    #[must_use]
    pub fn new(time: f32, translation: Vec3, rotation: Quat) -> Self {
        Self { time, translation, rotation, scale: Vec3::ONE }
    }

    /// Interpolate towards `next` by `t` in 0..=1.
    ///
    /// Rotation takes the shortest arc and comes out unit length.
    #[must_use]
    pub fn interpolate(&self, next: &Keyframe, t: f32, time: f32) -> Keyframe {
        Keyframe {
            time,
            translation: self.translation.lerp(next.translation, t),
            rotation: self.rotation.slerp(next.rotation, t).normalize(),
            scale: self.scale.lerp(next.scale, t),
        }
    }
}

/// Keyframes for one bone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoneTrack {
    pub bone: BoneId,
    pub keyframes: Vec<Keyframe>,
}

impl BoneTrack {
    /// Evaluate the track at `time`, clamping outside the key range.
    ///
    /// Returns `None` for an empty track.
    #[must_use]
    pub fn sample(&self, time: f32) -> Option<Keyframe> {
        let (a, b, t) = bracket(&self.keyframes, time, |k| k.time)?;
        Some(a.interpolate(b, t, time))
    }
}

/// A weight sample for one shape key.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MorphKey {
    pub time: f32,
    pub weight: f32,
}

/// A weight-over-time curve targeting a named shape key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MorphTrack {
    pub shape: String,
    pub keys: Vec<MorphKey>,
}

impl MorphTrack {
    /// Evaluate the weight at `time`, clamping outside the key range.
    #[must_use]
    pub fn sample(&self, time: f32) -> Option<f32> {
        let (a, b, t) = bracket(&self.keys, time, |k| k.time)?;
        Some(a.weight + (b.weight - a.weight) * t)
    }
}

/// A named animation: bone tracks and morph tracks.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Animation {
    pub name: String,
    /// Length in seconds.
    pub length: f32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tracks: Vec<BoneTrack>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub morph_tracks: Vec<MorphTrack>,
}

impl Animation {
    #[must_use]
    pub fn new(name: impl Into<String>, length: f32) -> Self {
        Self { name: name.into(), length, tracks: Vec::new(), morph_tracks: Vec::new() }
    }

    #[must_use]
    pub fn track(&self, bone: BoneId) -> Option<&BoneTrack> {
        self.tracks.iter().find(|t| t.bone == bone)
    }

    /// Every key time across bone and morph tracks.
    pub fn key_times(&self) -> impl Iterator<Item = f32> + '_ {
        self.tracks
            .iter()
            .flat_map(|t| t.keyframes.iter().map(|k| k.time))
            .chain(self.morph_tracks.iter().flat_map(|t| t.keys.iter().map(|k| k.time)))
    }

    /// Fold another animation's tracks into this one.
    pub fn merge(&mut self, other: Animation) {
        self.length = self.length.max(other.length);
        self.tracks.extend(other.tracks);
        self.morph_tracks.extend(other.morph_tracks);
    }
}

/// Frame rate implied by the smallest gap between consecutive keys.
///
/// Returns `None` when no track has two keys.
#[must_use]
pub fn suggest_frame_rate(animations: &[Animation]) -> Option<u32> {
    let mut smallest = f32::INFINITY;
    for anim in animations {
        let tracks = anim
            .tracks
            .iter()
            .map(|t| t.keyframes.iter().map(|k| k.time).collect::<Vec<_>>())
            .chain(anim.morph_tracks.iter().map(|t| t.keys.iter().map(|k| k.time).collect()));
        for times in tracks {
            for pair in times.windows(2) {
                let gap = pair[1] - pair[0];
                if gap > 1e-6 && gap < smallest {
                    smallest = gap;
                }
            }
        }
    }
    smallest
        .is_finite()
        .then(|| (1.0 / smallest).round().clamp(1.0, 240.0) as u32)
}

/// Find the keys around `time` and the blend factor between them.
fn bracket<K>(keys: &[K], time: f32, time_of: impl Fn(&K) -> f32) -> Option<(&K, &K, f32)> {
    let first = keys.first()?;
    let last = keys.last()?;
    if time <= time_of(first) {
        return Some((first, first, 0.0));
    }
    if time >= time_of(last) {
        return Some((last, last, 0.0));
    }
    let next = keys.partition_point(|k| time_of(k) <= time);
    let (a, b) = (&keys[next - 1], &keys[next]);
    let span = time_of(b) - time_of(a);
    let t = if span > 0.0 { (time - time_of(a)) / span } else { 0.0 };
    Some((a, b, t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_sample_interpolates_and_clamps() {
        let track = BoneTrack {
            bone: 0,
            keyframes: vec![
                Keyframe::new(0.0, Vec3::ZERO, Quat::IDENTITY),
                Keyframe::new(1.0, Vec3::new(2.0, 0.0, 0.0), Quat::from_rotation_y(FRAC_PI_2)),
            ],
        };

        let mid = track.sample(0.5).unwrap();
        assert!((mid.translation.x - 1.0).abs() < 1e-6);
        assert!((mid.rotation.length() - 1.0).abs() < 1e-6);
        let expected = Quat::from_rotation_y(FRAC_PI_2 / 2.0);
        assert!(mid.rotation.dot(expected).abs() > 0.9999);

        assert_eq!(track.sample(-1.0).unwrap().translation, Vec3::ZERO);
        assert_eq!(track.sample(5.0).unwrap().translation, Vec3::new(2.0, 0.0, 0.0));
        assert!(BoneTrack { bone: 0, keyframes: vec![] }.sample(0.0).is_none());
    }

    #[test]
    fn test_morph_sample() {
        let track = MorphTrack {
            shape: "smile".into(),
            keys: vec![MorphKey { time: 0.0, weight: 0.0 }, MorphKey { time: 2.0, weight: 1.0 }],
        };
        assert!((track.sample(0.5).unwrap() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_suggest_frame_rate() {
        let mut anim = Animation::new("walk", 1.0);
        anim.tracks.push(BoneTrack {
            bone: 0,
            keyframes: (0..=30)
                .map(|i| Keyframe::new(i as f32 / 30.0, Vec3::ZERO, Quat::IDENTITY))
                .collect(),
        });
        assert_eq!(suggest_frame_rate(&[anim]), Some(30));
        assert_eq!(suggest_frame_rate(&[Animation::new("empty", 0.0)]), None);
    }
}
