//! Keyframe ordering policy
//!
//! Keys are stable-sorted by time and keys sharing a time are coalesced, the
//! one that came last in the source winning. Non-finite times cannot be
//! ordered and are rejected; `-0.0` is stored as `0.0`.

use crate::error::{Error, Result};
use crate::model::{Keyframe, MorphKey};

/// Anything with a key time.
pub trait Timed {
    fn time(&self) -> f32;
    fn set_time(&mut self, time: f32);
}

impl Timed for Keyframe {
    fn time(&self) -> f32 {
        self.time
    }

    fn set_time(&mut self, time: f32) {
        self.time = time;
    }
}

impl Timed for MorphKey {
    fn time(&self) -> f32 {
        self.time
    }

    fn set_time(&mut self, time: f32) {
        self.time = time;
    }
}

/// Sort `keys` by time and coalesce equal times, last wins.
///
/// Returns the number of keys dropped; a `warn` is logged when non-zero.
///
/// # Errors
/// [`Error::UnorderedKeyframes`] if any time is NaN or infinite.
pub fn normalize_keys<K: Timed>(track: &str, keys: &mut Vec<K>) -> Result<usize> {
    if let Some(bad) = keys.iter().find(|k| !k.time().is_finite()) {
        return Err(Error::UnorderedKeyframes { track: track.to_string(), time: bad.time() });
    }

    // total_cmp orders -0.0 before 0.0; fold it so both coalesce.
    for key in keys.iter_mut() {
        if key.time() == 0.0 {
            key.set_time(0.0);
        }
    }
    // sort_by is stable, so equal times keep source order.
    keys.sort_by(|a, b| a.time().total_cmp(&b.time()));

    let before = keys.len();
    let mut out: Vec<K> = Vec::with_capacity(before);
    for key in keys.drain(..) {
        if let Some(last) = out.last_mut()
            && last.time().total_cmp(&key.time()).is_eq()
        {
            *last = key;
        } else {
            out.push(key);
        }
    }
    *keys = out;

    let dropped = before - keys.len();
    if dropped > 0 {
        tracing::warn!("Track '{track}': coalesced {dropped} keyframe(s) sharing a time");
    }
    Ok(dropped)
}

/// Whether key times strictly increase.
#[must_use]
pub fn is_strictly_increasing<K: Timed>(keys: &[K]) -> bool {
    keys.windows(2).all(|w| w[0].time() < w[1].time())
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec3};

    fn key(time: f32, x: f32) -> Keyframe {
        Keyframe::new(time, Vec3::new(x, 0.0, 0.0), Quat::IDENTITY)
    }

    #[test]
    fn test_duplicate_times_last_wins() {
        // A@0, B@1, C@1, D@2
        let mut keys = vec![key(0.0, 1.0), key(1.0, 2.0), key(1.0, 3.0), key(2.0, 4.0)];
        assert_eq!(normalize_keys("bone", &mut keys).unwrap(), 1);
        let got: Vec<(f32, f32)> = keys.iter().map(|k| (k.time, k.translation.x)).collect();
        assert_eq!(got, vec![(0.0, 1.0), (1.0, 3.0), (2.0, 4.0)]);
        assert!(is_strictly_increasing(&keys));
    }

    #[test]
    fn test_out_of_order_keys_are_sorted() {
        let mut keys = vec![
            MorphKey { time: 2.0, weight: 0.2 },
            MorphKey { time: 0.0, weight: 0.0 },
            MorphKey { time: 1.0, weight: 0.1 },
        ];
        assert_eq!(normalize_keys("smile", &mut keys).unwrap(), 0);
        assert_eq!(keys.iter().map(|k| k.time).collect::<Vec<_>>(), vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_negative_zero_coalesces_with_zero() {
        let mut keys = vec![key(-0.0, 1.0), key(0.0, 2.0), key(1.0, 3.0)];
        assert_eq!(normalize_keys("bone", &mut keys).unwrap(), 1);
        assert!(is_strictly_increasing(&keys));
        assert_eq!(keys.len(), 2);
        assert!(keys[0].time.is_sign_positive());
        assert_eq!(keys[0].translation.x, 2.0);
    }

    #[test]
    fn test_non_finite_time_rejected() {
        let mut keys = vec![key(0.0, 0.0), key(f32::NAN, 0.0)];
        let err = normalize_keys("bone", &mut keys).unwrap_err();
        assert!(matches!(err, Error::UnorderedKeyframes { track, .. } if track == "bone"));
    }
}
