//! Canonical quantities and the suffix parser.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::QuantityAnomaly;

/// Largest canonical value accepted (cores or bytes).
///
/// Anything above is treated as a corrupt or hostile input and replaced by
/// the zero sentinel with [`QuantityAnomaly::OutOfRange`].
pub const SANITY_CEILING: f64 = 1e18;

/// Suffixes that divide the numeric part, in cores.
const CPU_SUFFIXES: &[(&str, Scale)] = &[
    ("n", Scale::Divide(1e9)),
    ("u", Scale::Divide(1e6)),
    ("m", Scale::Divide(1e3)),
];

/// Suffixes that multiply the numeric part, in bytes. Binary suffixes come
/// first so `Ki` is never mistaken for a bare `i`.
const MEMORY_SUFFIXES: &[(&str, Scale)] = &[
    ("Ki", Scale::Multiply(1024.0)),
    ("Mi", Scale::Multiply(1_048_576.0)),
    ("Gi", Scale::Multiply(1_073_741_824.0)),
    ("Ti", Scale::Multiply(1_099_511_627_776.0)),
    ("Pi", Scale::Multiply(1_125_899_906_842_624.0)),
    ("Ei", Scale::Multiply(1_152_921_504_606_846_976.0)),
    ("k", Scale::Multiply(1e3)),
    ("K", Scale::Multiply(1e3)),
    ("M", Scale::Multiply(1e6)),
    ("G", Scale::Multiply(1e9)),
    ("T", Scale::Multiply(1e12)),
    ("P", Scale::Multiply(1e15)),
    ("E", Scale::Multiply(1e18)),
];

#[derive(Debug, Clone, Copy)]
enum Scale {
    Unit,
    Divide(f64),
    Multiply(f64),
}

impl Scale {
    fn apply(self, raw: f64) -> f64 {
        match self {
            Self::Unit => raw,
            Self::Divide(divisor) => raw / divisor,
            Self::Multiply(factor) => raw * factor,
        }
    }
}

/// The kind of resource a quantity string describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    /// Processor time, canonical unit cores.
    Cpu,
    /// Memory, canonical unit bytes.
    Memory,
}

impl Resource {
    /// Returns the canonical unit for this resource.
    #[must_use]
    pub const fn unit(self) -> Unit {
        match self {
            Self::Cpu => Unit::Cores,
            Self::Memory => Unit::Bytes,
        }
    }

    /// Returns the resource name as used in request/limit maps.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Memory => "memory",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical unit of a [`Quantity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    /// CPU cores.
    Cores,
    /// Bytes.
    Bytes,
}

/// A normalized resource amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    value: f64,
    unit: Unit,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    anomaly: Option<QuantityAnomaly>,
}

impl Quantity {
    /// Creates a well-formed quantity.
    #[must_use]
    pub const fn new(value: f64, unit: Unit) -> Self {
        Self {
            value,
            unit,
            anomaly: None,
        }
    }

    /// Creates a zero quantity with no anomaly.
    #[must_use]
    pub const fn zero(unit: Unit) -> Self {
        Self::new(0.0, unit)
    }

    /// Creates the sentinel for an absent field.
    #[must_use]
    pub const fn missing(unit: Unit) -> Self {
        Self::flagged(0.0, unit, QuantityAnomaly::Missing)
    }

    const fn flagged(value: f64, unit: Unit, anomaly: QuantityAnomaly) -> Self {
        Self {
            value,
            unit,
            anomaly: Some(anomaly),
        }
    }

    /// Returns the value in canonical units.
    #[must_use]
    pub const fn value(&self) -> f64 {
        self.value
    }

    /// Returns the canonical unit.
    #[must_use]
    pub const fn unit(&self) -> Unit {
        self.unit
    }

    /// Returns the anomaly recorded while parsing, if any.
    #[must_use]
    pub const fn anomaly(&self) -> Option<&QuantityAnomaly> {
        self.anomaly.as_ref()
    }

    /// Returns true if any anomaly was recorded.
    #[must_use]
    pub const fn is_anomalous(&self) -> bool {
        self.anomaly.is_some()
    }

    /// Returns true if the value is the zero sentinel for unusable input.
    #[must_use]
    pub fn is_unparseable(&self) -> bool {
        self.anomaly
            .as_ref()
            .is_some_and(QuantityAnomaly::is_unparseable)
    }
}

/// Parses a CPU quantity into cores.
///
/// Suffixless values are cores, `m` millicores, `u` microcores and `n`
/// nanocores.
#[must_use]
pub fn parse_cpu(input: &str) -> Quantity {
    parse(input, Resource::Cpu)
}

/// Parses a memory quantity into bytes.
///
/// Accepts binary suffixes (`Ki`, `Mi`, `Gi`, `Ti`, `Pi`, `Ei`), decimal
/// suffixes (`k`/`K`, `M`, `G`, `T`, `P`, `E`) and plain byte counts.
#[must_use]
pub fn parse_memory(input: &str) -> Quantity {
    parse(input, Resource::Memory)
}

/// Parses a quantity string for the given resource.
///
/// Never fails: see the crate docs for the sentinel rules.
#[must_use]
pub fn parse(input: &str, resource: Resource) -> Quantity {
    let unit = resource.unit();
    let text = input.trim();
    if text.is_empty() {
        return Quantity::missing(unit);
    }

    let quantity = match split_suffix(text, resource) {
        Ok((number, scale)) => from_parts(text, number, scale, unit),
        Err(suffix) => Quantity::flagged(
            0.0,
            unit,
            QuantityAnomaly::UnknownSuffix {
                input: text.to_string(),
                suffix,
            },
        ),
    };

    if let Some(anomaly) = quantity.anomaly() {
        trace!(input = %text, resource = %resource, %anomaly, "quantity anomaly");
    }
    quantity
}

fn from_parts(text: &str, number: &str, scale: Scale, unit: Unit) -> Quantity {
    let Ok(raw) = number.parse::<f64>() else {
        return Quantity::flagged(
            0.0,
            unit,
            QuantityAnomaly::Malformed {
                input: text.to_string(),
            },
        );
    };

    let value = scale.apply(raw);
    if !value.is_finite() || value.abs() > SANITY_CEILING {
        return Quantity::flagged(
            0.0,
            unit,
            QuantityAnomaly::OutOfRange {
                input: text.to_string(),
            },
        );
    }

    if value < 0.0 {
        return Quantity::flagged(
            0.0,
            unit,
            QuantityAnomaly::Negative {
                input: text.to_string(),
            },
        );
    }

    // "-0" parses to negative zero; normalize it
    let value = if value.is_sign_negative() { 0.0 } else { value };
    Quantity::new(value, unit)
}

/// Splits `text` into its numeric part and scale.
///
/// Returns the offending suffix when the text ends in letters that are not a
/// known unit but are preceded by a valid number.
fn split_suffix(text: &str, resource: Resource) -> Result<(&str, Scale), String> {
    let table = match resource {
        Resource::Cpu => CPU_SUFFIXES,
        Resource::Memory => MEMORY_SUFFIXES,
    };

    for (suffix, scale) in table {
        if let Some(number) = text.strip_suffix(suffix) {
            return Ok((number, *scale));
        }
    }

    let number = text.trim_end_matches(|c: char| c.is_ascii_alphabetic());
    let suffix = &text[number.len()..];
    if !suffix.is_empty() && !number.is_empty() && number.parse::<f64>().is_ok() {
        return Err(suffix.to_string());
    }

    Ok((text, Scale::Unit))
}

/// Returns `used` as a percentage of `total`.
///
/// Returns 0 when `total` is zero, negative or not finite, or when `used` is
/// not finite. Values above 100 are kept: over-commitment is meaningful.
#[must_use]
pub fn usage_percent(used: f64, total: f64) -> f64 {
    if !used.is_finite() || !total.is_finite() || total <= 0.0 {
        return 0.0;
    }
    (used.max(0.0) / total) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test_case("2", 2.0 ; "plain cores")]
    #[test_case("0.5", 0.5 ; "fractional cores")]
    #[test_case("250m", 0.25 ; "millicores")]
    #[test_case("1500u", 0.0015 ; "microcores")]
    #[test_case("500000000n", 0.5 ; "nanocores")]
    #[test_case(" 100m ", 0.1 ; "surrounding whitespace")]
    #[test_case("1e3m", 1.0 ; "exponent with suffix")]
    fn parses_cpu(input: &str, expected: f64) {
        let q = parse_cpu(input);
        assert!(!q.is_anomalous(), "unexpected anomaly for {input}: {q:?}");
        assert!((q.value() - expected).abs() < 1e-12);
        assert_eq!(q.unit(), Unit::Cores);
    }

    #[test_case("1024", 1024.0 ; "plain bytes")]
    #[test_case("1Ki", 1024.0 ; "kibibytes")]
    #[test_case("128Mi", 134_217_728.0 ; "mebibytes")]
    #[test_case("2Gi", 2_147_483_648.0 ; "gibibytes")]
    #[test_case("1Ti", 1_099_511_627_776.0 ; "tebibytes")]
    #[test_case("1Pi", 1_125_899_906_842_624.0 ; "pebibytes")]
    #[test_case("1k", 1000.0 ; "lowercase kilo")]
    #[test_case("1K", 1000.0 ; "uppercase kilo")]
    #[test_case("5M", 5e6 ; "megabytes")]
    #[test_case("3G", 3e9 ; "gigabytes")]
    #[test_case("1T", 1e12 ; "terabytes")]
    #[test_case("1P", 1e15 ; "petabytes")]
    #[test_case("1e3", 1000.0 ; "exponent notation")]
    fn parses_memory(input: &str, expected: f64) {
        let q = parse_memory(input);
        assert!(!q.is_anomalous(), "unexpected anomaly for {input}: {q:?}");
        assert_eq!(q.value(), expected);
        assert_eq!(q.unit(), Unit::Bytes);
    }

    #[test]
    fn empty_input_is_missing() {
        let q = parse_cpu("   ");
        assert_eq!(q.value(), 0.0);
        assert_eq!(q.anomaly(), Some(&QuantityAnomaly::Missing));
        assert!(q.is_unparseable());
    }

    #[test]
    fn garbage_is_malformed() {
        let q = parse_memory("lots");
        assert_eq!(q.value(), 0.0);
        assert!(matches!(q.anomaly(), Some(QuantityAnomaly::Malformed { .. })));
    }

    #[test]
    fn double_dot_is_malformed() {
        let q = parse_cpu("1.5.3m");
        assert!(matches!(q.anomaly(), Some(QuantityAnomaly::Malformed { .. })));
    }

    #[test]
    fn unknown_suffix_is_reported() {
        let q = parse_memory("5Xi");
        assert_eq!(
            q.anomaly(),
            Some(&QuantityAnomaly::UnknownSuffix {
                input: "5Xi".to_string(),
                suffix: "Xi".to_string(),
            })
        );
        assert_eq!(q.value(), 0.0);
    }

    #[test]
    fn memory_suffix_is_unknown_for_cpu() {
        let q = parse_cpu("2Gi");
        assert!(matches!(q.anomaly(), Some(QuantityAnomaly::UnknownSuffix { .. })));
    }

    #[test]
    fn negative_clamps_to_zero() {
        let q = parse_cpu("-500m");
        assert_eq!(q.value(), 0.0);
        assert!(matches!(q.anomaly(), Some(QuantityAnomaly::Negative { .. })));
        assert!(!q.is_unparseable());
    }

    #[test]
    fn negative_zero_is_plain_zero() {
        let q = parse_cpu("-0");
        assert!(!q.is_anomalous());
        assert!(q.value().is_sign_positive());
    }

    #[test]
    fn absurd_exponent_is_out_of_range() {
        let q = parse_memory("1e300Ei");
        assert_eq!(q.value(), 0.0);
        assert!(matches!(q.anomaly(), Some(QuantityAnomaly::OutOfRange { .. })));
    }

    #[test]
    fn infinity_is_out_of_range() {
        let q = parse_cpu("inf");
        assert!(matches!(q.anomaly(), Some(QuantityAnomaly::OutOfRange { .. })));
    }

    #[test]
    fn just_above_ceiling_is_rejected() {
        assert!(parse_memory("2E").is_unparseable());
        assert!(!parse_memory("1E").is_anomalous());
    }

    #[test]
    fn usage_percent_zero_total() {
        assert_eq!(usage_percent(0.0, 0.0), 0.0);
        assert_eq!(usage_percent(5.0, 0.0), 0.0);
        assert_eq!(usage_percent(5.0, -1.0), 0.0);
        assert_eq!(usage_percent(f64::NAN, 4.0), 0.0);
    }

    #[test]
    fn usage_percent_keeps_overcommit() {
        assert!((usage_percent(3.0, 2.0) - 150.0).abs() < f64::EPSILON);
        assert!((usage_percent(1.0, 4.0) - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn serializes_without_anomaly_field_when_clean() {
        let json = serde_json::to_string(&parse_cpu("1")).unwrap();
        assert_eq!(json, r#"{"value":1.0,"unit":"cores"}"#);
    }

    proptest! {
        #[test]
        fn prop_cpu_suffix_divides_exactly(n in 0u32..10_000_000) {
            let base = f64::from(n);
            prop_assert_eq!(parse_cpu(&format!("{n}")).value(), base);
            prop_assert_eq!(parse_cpu(&format!("{n}m")).value(), base / 1e3);
            prop_assert_eq!(parse_cpu(&format!("{n}u")).value(), base / 1e6);
            prop_assert_eq!(parse_cpu(&format!("{n}n")).value(), base / 1e9);
        }

        #[test]
        fn prop_binary_suffix_scales_by_1024(x in 0.0f64..1e6) {
            let plain = parse_memory(&format!("{x}")).value();
            prop_assert_eq!(parse_memory(&format!("{x}Ki")).value(), plain * 1024.0);
            prop_assert_eq!(parse_memory(&format!("{x}Mi")).value(), plain * 1_048_576.0);
        }

        #[test]
        fn prop_decimal_suffix_scales_by_1000(x in 0u32..1_000_000) {
            let plain = parse_memory(&format!("{x}")).value();
            prop_assert_eq!(parse_memory(&format!("{x}k")).value(), plain * 1000.0);
            prop_assert_eq!(parse_memory(&format!("{x}M")).value(), plain * 1e6);
        }

        #[test]
        fn prop_parse_is_total(input in ".{0,24}") {
            for resource in [Resource::Cpu, Resource::Memory] {
                let q = parse(&input, resource);
                prop_assert!(q.value().is_finite());
                prop_assert!(q.value() >= 0.0);
                prop_assert!(q.value() <= SANITY_CEILING);
            }
        }
    }
}
