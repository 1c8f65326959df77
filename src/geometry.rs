//! Geometrische Prädikate über achsenparallele Quader und Rechtecke.
//!
//! Alle Funktionen sind rein und ohne Toleranz: Die Koordinaten stammen direkt
//! aus Item- und Raumgrenzen, nicht aus gemessenem Kontakt.

use crate::types::{Axis, BoundingBox, Rect2};

/// Prüft, ob `inner` vollständig in `outer` liegt (geschlossene Intervalle).
///
/// Identische Boxen enthalten sich gegenseitig.
///
/// # Beispiel
/// ```
/// use ems_pack::geometry::contains;
/// use ems_pack::types::{BoundingBox, Vec3};
///
/// let outer = BoundingBox::new(Vec3::zero(), Vec3::new(10.0, 10.0, 10.0));
/// let inner = BoundingBox::new(Vec3::new(2.0, 0.0, 0.0), Vec3::new(10.0, 5.0, 5.0));
/// assert!(contains(&inner, &outer));
/// assert!(!contains(&outer, &inner));
/// ```
pub fn contains(inner: &BoundingBox, outer: &BoundingBox) -> bool {
    Axis::ALL.iter().all(|&axis| {
        inner.min.get(axis) >= outer.min.get(axis) && inner.max.get(axis) <= outer.max.get(axis)
    })
}

/// Prüft, ob sich zwei Boxen räumlich überschneiden.
///
/// Separating Axis Theorem für AABBs: Die Boxen überschneiden sich NICHT, wenn
/// sie in mindestens einer Achse getrennt sind. Berührende Flächen zählen
/// nicht als Überschneidung.
pub fn intersects(a: &BoundingBox, b: &BoundingBox) -> bool {
    !(a.max.x <= b.min.x
        || b.max.x <= a.min.x
        || a.max.y <= b.min.y
        || b.max.y <= a.min.y
        || a.max.z <= b.min.z
        || b.max.z <= a.min.z)
}

/// Berechnet die Überlappung zweier Intervalle in einer Dimension.
///
/// # Rückgabewert
/// Länge der Überlappung, mindestens 0.0
///
/// # Beispiel
/// ```
/// use ems_pack::geometry::overlap_1d;
///
/// assert_eq!(overlap_1d(0.0, 5.0, 3.0, 8.0), 2.0);
/// assert_eq!(overlap_1d(0.0, 1.0, 3.0, 8.0), 0.0);
/// ```
pub fn overlap_1d(a1: f64, a2: f64, b1: f64, b2: f64) -> f64 {
    (a2.min(b2) - a1.max(b1)).max(0.0)
}

/// Überlappungsfläche zweier Rechtecke in der Grundflächen-Ebene.
pub fn overlap_area(a: &Rect2, b: &Rect2) -> f64 {
    overlap_1d(a.x1, a.x2, b.x1, b.x2) * overlap_1d(a.y1, a.y2, b.y1, b.y2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Vec3;

    fn cube(min: (f64, f64, f64), size: f64) -> BoundingBox {
        BoundingBox::from_position_and_dims(Vec3::from(min), Vec3::new(size, size, size))
    }

    #[test]
    fn contains_is_closed_on_both_ends() {
        let outer = cube((0.0, 0.0, 0.0), 10.0);
        assert!(contains(&outer, &outer));
        assert!(contains(&cube((5.0, 5.0, 5.0), 5.0), &outer));
        assert!(!contains(&cube((5.0, 5.0, 5.5), 5.0), &outer));
    }

    #[test]
    fn touching_faces_do_not_intersect() {
        let a = cube((0.0, 0.0, 0.0), 10.0);
        let b = cube((10.0, 0.0, 0.0), 10.0);
        let c = cube((9.0, 9.0, 9.0), 10.0);

        assert!(!intersects(&a, &b));
        assert!(intersects(&a, &c));
        assert!(intersects(&a, &a));
    }

    #[test]
    fn overlap_area_clamps_to_zero() {
        let a = Rect2::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect2::new(5.0, 5.0, 15.0, 15.0);
        let c = Rect2::new(20.0, 0.0, 30.0, 10.0);

        assert_eq!(overlap_area(&a, &b), 25.0);
        assert_eq!(overlap_area(&a, &c), 0.0);
    }
}
