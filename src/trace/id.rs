use rand::{rngs, Rng, SeedableRng};
use std::cell::RefCell;
use std::fmt;
use std::num::ParseIntError;

/// A 16-byte value which identifies a trace on the wire, paired with a
/// process-local uniquifier.
///
/// The uniquifier disambiguates two local traces that happen to share the
/// same propagated wire id, e.g. a server receiving parallel calls that
/// carry the same upstream trace id. Only the wire value is ever reported
/// externally; the `(value, uniq)` pair indexes the local trace registry.
#[derive(Clone, PartialEq, Eq, Copy, Hash)]
pub struct TraceId {
    value: u128,
    uniq: u64,
}

impl TraceId {
    /// Construct a trace id from a wire value and an explicit uniquifier.
    pub const fn new(value: u128, uniq: u64) -> Self {
        TraceId { value, uniq }
    }

    /// Generate a fresh trace id with a random wire value and uniquifier.
    pub fn generate() -> Self {
        CURRENT_RNG.with(|rng| {
            let mut rng = rng.borrow_mut();
            TraceId {
                value: rng.gen::<u128>(),
                uniq: rng.gen::<u64>(),
            }
        })
    }

    /// Adopt a propagated wire value, minting a new local uniquifier.
    pub fn propagated(value: u128) -> Self {
        TraceId {
            value,
            uniq: CURRENT_RNG.with(|rng| rng.borrow_mut().gen::<u64>()),
        }
    }

    /// Converts a string in base 16 to a trace id, minting a new local
    /// uniquifier for it.
    ///
    /// # Examples
    ///
    /// ```
    /// use zipline::TraceId;
    ///
    /// assert!(TraceId::from_hex("42").is_ok());
    /// assert!(TraceId::from_hex("58406520a006649127e371903a2de979").is_ok());
    ///
    /// assert!(TraceId::from_hex("not_hex").is_err());
    /// ```
    pub fn from_hex(hex: &str) -> Result<Self, ParseIntError> {
        u128::from_str_radix(hex, 16).map(TraceId::propagated)
    }

    /// The on-the-wire trace identifier.
    pub fn value(&self) -> u128 {
        self.value
    }

    /// The process-local uniquifier.
    pub fn uniq(&self) -> u64 {
        self.uniq
    }

    /// Render the wire value as lowercase hex: 16 nibbles when the high 64
    /// bits are zero, 32 nibbles otherwise.
    pub fn to_hex(&self) -> String {
        if self.value > u64::MAX as u128 {
            format!("{:032x}", self.value)
        } else {
            format!("{:016x}", self.value)
        }
    }
}

impl fmt::Debug for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("{}.{}", self.to_hex(), self.uniq))
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("{}.{}", self.to_hex(), self.uniq))
    }
}

impl fmt::LowerHex for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.value, f)
    }
}

/// An 8-byte value which identifies a span within a trace.
#[derive(Clone, PartialEq, Eq, Copy, Hash)]
pub struct SpanId(u64);

impl SpanId {
    /// Generate a fresh random span id.
    pub fn generate() -> Self {
        CURRENT_RNG.with(|rng| SpanId(rng.borrow_mut().gen::<u64>()))
    }

    /// Converts a string in base 16 to a span id.
    ///
    /// # Examples
    ///
    /// ```
    /// use zipline::SpanId;
    ///
    /// assert!(SpanId::from_hex("42").is_ok());
    /// assert!(SpanId::from_hex("58406520a0066491").is_ok());
    ///
    /// assert!(SpanId::from_hex("not_hex").is_err());
    /// ```
    pub fn from_hex(hex: &str) -> Result<Self, ParseIntError> {
        u64::from_str_radix(hex, 16).map(SpanId)
    }

    /// Render as 16 nibbles of lowercase hex.
    pub fn to_hex(&self) -> String {
        format!("{:016x}", self.0)
    }
}

impl From<u64> for SpanId {
    fn from(value: u64) -> Self {
        SpanId(value)
    }
}

impl fmt::Debug for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("{:016x}", self.0))
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("{:016x}", self.0))
    }
}

impl fmt::LowerHex for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

thread_local! {
    /// Store random number generator for each thread
    static CURRENT_RNG: RefCell<rngs::SmallRng> = RefCell::new(rngs::SmallRng::from_entropy());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rustfmt::skip]
    fn trace_id_test_data() -> Vec<(TraceId, &'static str)> {
        vec![
            (TraceId::new(0, 0), "0000000000000000"),
            (TraceId::new(42, 0), "000000000000002a"),
            (TraceId::new(0x5f46_7fe7_bf42_676c_05e2_0ba4_a90e_448e, 0), "5f467fe7bf42676c05e20ba4a90e448e"),
        ]
    }

    #[rustfmt::skip]
    fn span_id_test_data() -> Vec<(SpanId, &'static str)> {
        vec![
            (SpanId(0), "0000000000000000"),
            (SpanId(42), "000000000000002a"),
            (SpanId(5508496025762705295), "4c721bf33e3caf8f"),
        ]
    }

    #[test]
    fn test_trace_id_hex_round_trip() {
        for (id, hex) in trace_id_test_data() {
            assert_eq!(id.to_hex(), hex);
            assert_eq!(TraceId::from_hex(hex).unwrap().value(), id.value());
        }
    }

    #[test]
    fn test_trace_id_nibble_width() {
        // 64-bit values render short, anything wider renders long.
        assert_eq!(TraceId::new(u64::MAX as u128, 0).to_hex().len(), 16);
        assert_eq!(TraceId::new(u64::MAX as u128 + 1, 0).to_hex().len(), 32);
    }

    #[test]
    fn test_span_id_round_trip() {
        for (id, hex) in span_id_test_data() {
            assert_eq!(format!("{}", id), hex);
            assert_eq!(id.to_hex(), hex);
            assert_eq!(id, SpanId::from_hex(hex).unwrap());
        }
    }

    #[test]
    fn test_propagated_ids_differ_by_uniquifier() {
        let a = TraceId::propagated(7);
        let b = TraceId::propagated(7);
        assert_eq!(a.value(), b.value());
        assert_ne!(a, b);
    }
}
