//! Human-readable rendering of canonical values.

const MIB: f64 = 1_048_576.0;
const GIB: f64 = 1_073_741_824.0;
const TIB: f64 = 1_099_511_627_776.0;

/// Formats cores as `250m` below one core and `1.50` above.
#[must_use]
pub fn format_cpu(cores: f64) -> String {
    if !cores.is_finite() || cores <= 0.0 {
        return "0".to_string();
    }
    if cores < 1.0 {
        format!("{}m", (cores * 1000.0).round() as u64)
    } else {
        format!("{cores:.2}")
    }
}

/// Formats bytes as `Mi` below one GiB, `Gi` below one TiB and `Ti` above.
#[must_use]
pub fn format_memory(bytes: f64) -> String {
    if !bytes.is_finite() || bytes <= 0.0 {
        return "0".to_string();
    }
    if bytes < GIB {
        format!("{}Mi", (bytes / MIB).round() as u64)
    } else if bytes < TIB {
        format!("{:.2}Gi", bytes / GIB)
    } else {
        format!("{:.2}Ti", bytes / TIB)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0.25, "250m")]
    #[test_case(0.0015, "2m")]
    #[test_case(1.5, "1.50")]
    #[test_case(16.0, "16.00")]
    #[test_case(0.0, "0")]
    #[test_case(-3.0, "0")]
    fn formats_cpu(cores: f64, expected: &str) {
        assert_eq!(format_cpu(cores), expected);
    }

    #[test_case(512.0 * MIB, "512Mi")]
    #[test_case(1.5 * GIB, "1.50Gi")]
    #[test_case(2.0 * TIB, "2.00Ti")]
    #[test_case(f64::NAN, "0")]
    fn formats_memory(bytes: f64, expected: &str) {
        assert_eq!(format_memory(bytes), expected);
    }
}
