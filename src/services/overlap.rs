//! Chequeo de solapamiento de intervalos
//!
//! Fórmula única reutilizada por todas las consultas de conflicto.
//! Ambos extremos son inclusivos (granularidad de día calendario): un
//! alquiler que termina el día N y otro que empieza el día N se solapan.

use chrono::NaiveDate;

/// Dos rangos [start_a, end_a] y [start_b, end_b] se solapan si y solo si
/// NOT (end_a < start_b OR start_a > end_b).
pub fn overlaps(start_a: NaiveDate, end_a: NaiveDate, start_b: NaiveDate, end_b: NaiveDate) -> bool {
    !(end_a < start_b || start_a > end_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn disjoint_ranges_do_not_overlap() {
        assert!(!overlaps(d("2025-03-01"), d("2025-03-10"), d("2025-03-11"), d("2025-03-15")));
        assert!(!overlaps(d("2025-03-11"), d("2025-03-15"), d("2025-03-01"), d("2025-03-10")));
    }

    #[test]
    fn touching_boundary_counts_as_overlap() {
        // end A == start B: el día N está ocupado por ambos
        assert!(overlaps(d("2025-03-01"), d("2025-03-10"), d("2025-03-10"), d("2025-03-15")));
        assert!(overlaps(d("2025-03-10"), d("2025-03-15"), d("2025-03-01"), d("2025-03-10")));
    }

    #[test]
    fn containment_and_partial_overlap() {
        // B contenido en A
        assert!(overlaps(d("2025-03-01"), d("2025-03-31"), d("2025-03-10"), d("2025-03-12")));
        // solapamiento parcial
        assert!(overlaps(d("2025-03-01"), d("2025-03-10"), d("2025-03-05"), d("2025-03-20")));
        // rangos idénticos
        assert!(overlaps(d("2025-03-01"), d("2025-03-10"), d("2025-03-01"), d("2025-03-10")));
    }

    #[test]
    fn single_day_ranges() {
        assert!(overlaps(d("2025-03-05"), d("2025-03-05"), d("2025-03-05"), d("2025-03-05")));
        assert!(!overlaps(d("2025-03-05"), d("2025-03-05"), d("2025-03-06"), d("2025-03-06")));
    }

    #[test]
    fn overlap_is_symmetric() {
        let cases = [
            (d("2025-01-01"), d("2025-01-10"), d("2025-01-10"), d("2025-01-20")),
            (d("2025-01-01"), d("2025-01-10"), d("2025-02-01"), d("2025-02-10")),
            (d("2025-01-05"), d("2025-01-08"), d("2025-01-01"), d("2025-01-31")),
        ];
        for (sa, ea, sb, eb) in cases {
            assert_eq!(overlaps(sa, ea, sb, eb), overlaps(sb, eb, sa, ea));
        }
    }
}
