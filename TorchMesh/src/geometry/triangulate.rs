//! Polygon triangulation: fan for convex faces, ear clipping otherwise

use glam::{Vec2, Vec3};

/// Newell normal of a polygon (not normalized; length is twice the area).
#[must_use]
pub fn newell_normal(points: &[Vec3]) -> Vec3 {
    let mut n = Vec3::ZERO;
    for (i, a) in points.iter().enumerate() {
        let b = points[(i + 1) % points.len()];
        n.x += (a.y - b.y) * (a.z + b.z);
        n.y += (a.z - b.z) * (a.x + b.x);
        n.z += (a.x - b.x) * (a.y + b.y);
    }
    n
}

/// Triangulate one polygon given its corner positions in winding order.
///
/// Returns triangles as indices into `points`, keeping the input winding.
/// An n-gon yields n - 2 triangles.
#[must_use]
pub fn triangulate_polygon(points: &[Vec3]) -> Vec<[usize; 3]> {
    let n = points.len();
    if n < 3 {
        return Vec::new();
    }
    if n == 3 {
        return vec![[0, 1, 2]];
    }

    let normal = newell_normal(points);
    let Some(normal) = normal.try_normalize() else {
        return fan(&(0..n).collect::<Vec<_>>());
    };
    let u = normal.any_orthonormal_vector();
    let v = normal.cross(u);
    let flat: Vec<Vec2> = points.iter().map(|p| Vec2::new(p.dot(u), p.dot(v))).collect();

    if is_convex(&flat) {
        return fan(&(0..n).collect::<Vec<_>>());
    }
    ear_clip(&flat)
}

fn fan(corners: &[usize]) -> Vec<[usize; 3]> {
    (1..corners.len().saturating_sub(1))
        .map(|i| [corners[0], corners[i], corners[i + 1]])
        .collect()
}

fn cross(o: Vec2, a: Vec2, b: Vec2) -> f32 {
    (a - o).perp_dot(b - o)
}

/// Counter-clockwise convexity in the projected plane.
fn is_convex(flat: &[Vec2]) -> bool {
    let n = flat.len();
    (0..n).all(|i| cross(flat[i], flat[(i + 1) % n], flat[(i + 2) % n]) >= 0.0)
}

fn inside_triangle(p: Vec2, a: Vec2, b: Vec2, c: Vec2) -> bool {
    cross(a, b, p) >= 0.0 && cross(b, c, p) >= 0.0 && cross(c, a, p) >= 0.0
}

fn ear_clip(flat: &[Vec2]) -> Vec<[usize; 3]> {
    let mut remaining: Vec<usize> = (0..flat.len()).collect();
    let mut triangles = Vec::with_capacity(flat.len() - 2);

    while remaining.len() > 3 {
        let m = remaining.len();
        let ear = (0..m).find(|&i| {
            let (a, b, c) = (remaining[(i + m - 1) % m], remaining[i], remaining[(i + 1) % m]);
            if cross(flat[a], flat[b], flat[c]) <= 0.0 {
                return false;
            }
            remaining
                .iter()
                .filter(|&&p| p != a && p != b && p != c)
                .all(|&p| !inside_triangle(flat[p], flat[a], flat[b], flat[c]))
        });

        let Some(i) = ear else {
            tracing::debug!("No ear found in {m}-gon remainder, falling back to a fan");
            triangles.extend(fan(&remaining));
            return triangles;
        };
        triangles.push([remaining[(i + m - 1) % m], remaining[i], remaining[(i + 1) % m]]);
        remaining.remove(i);
    }
    triangles.push([remaining[0], remaining[1], remaining[2]]);
    triangles
}

#[cfg(test)]
mod tests {
    use super::*;

    fn area(points: &[Vec3], tris: &[[usize; 3]]) -> f32 {
        tris.iter()
            .map(|t| (points[t[1]] - points[t[0]]).cross(points[t[2]] - points[t[0]]).length() / 2.0)
            .sum()
    }

    #[test]
    fn test_quad_fans() {
        let quad = [Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::Y];
        assert_eq!(triangulate_polygon(&quad), vec![[0, 1, 2], [0, 2, 3]]);
    }

    #[test]
    fn test_concave_polygon_area() {
        // An L shape: area 3.
        let l = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(2.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(1.0, 2.0, 0.0),
            Vec3::new(0.0, 2.0, 0.0),
        ];
        let tris = triangulate_polygon(&l);
        assert_eq!(tris.len(), l.len() - 2);
        assert!((area(&l, &tris) - 3.0).abs() < 1e-5);
        // Winding matches the polygon's normal.
        for t in &tris {
            let n = (l[t[1]] - l[t[0]]).cross(l[t[2]] - l[t[0]]);
            assert!(n.z > 0.0);
        }
    }

    #[test]
    fn test_concave_polygon_in_tilted_plane() {
        let arrow = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.0, 2.0, 2.0),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(2.0, 2.0, 2.0),
            Vec3::new(2.0, 0.0, 0.0),
        ];
        let tris = triangulate_polygon(&arrow);
        assert_eq!(tris.len(), 3);
        let expected = newell_normal(&arrow).length() / 2.0;
        assert!((area(&arrow, &tris) - expected).abs() < 1e-4);
    }

    #[test]
    fn test_degenerate_input() {
        assert!(triangulate_polygon(&[Vec3::ZERO, Vec3::X]).is_empty());
        let collinear = [Vec3::ZERO, Vec3::X, Vec3::X * 2.0, Vec3::X * 3.0];
        assert_eq!(triangulate_polygon(&collinear).len(), 2);
    }
}
