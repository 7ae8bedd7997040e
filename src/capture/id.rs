//! Correlation ID generation.
//!
//! IDs are `<unix-nanos>-<16 hex chars>`: a nanosecond timestamp joined to
//! eight bytes from the OS random source. No registry is kept; uniqueness is
//! probabilistic. If the random source fails the ID degrades to the bare
//! timestamp instead of failing the request.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::OsRng;
use rand::RngCore;

/// Number of random bytes appended to the timestamp.
pub const RANDOM_BYTES: usize = 8;

/// Generate a correlation ID from the OS random source.
pub fn generate_correlation_id() -> String {
    generate_with(&mut OsRng)
}

/// Generate a correlation ID drawing the random suffix from `rng`.
pub fn generate_with<R: RngCore + ?Sized>(rng: &mut R) -> String {
    let nanos = unix_nanos();
    let mut suffix = [0u8; RANDOM_BYTES];

    match rng.try_fill_bytes(&mut suffix) {
        Ok(()) => format!("{nanos}-{}", hex::encode(suffix)),
        Err(e) => {
            tracing::warn!(error = %e, "Random source unavailable, using timestamp-only correlation ID");
            nanos.to_string()
        }
    }
}

fn unix_nanos() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    struct BrokenRng;

    impl RngCore for BrokenRng {
        fn next_u32(&mut self) -> u32 {
            0
        }

        fn next_u64(&mut self) -> u64 {
            0
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            dest.fill(0);
        }

        fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), rand::Error> {
            Err(rand::Error::new("entropy source offline"))
        }
    }

    #[test]
    fn id_is_timestamp_dash_hex() {
        let id = generate_correlation_id();
        let (nanos, suffix) = id.split_once('-').expect("separator");

        assert!(nanos.parse::<u128>().is_ok());
        assert_eq!(suffix.len(), RANDOM_BYTES * 2);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn broken_random_source_degrades_to_timestamp() {
        let id = generate_with(&mut BrokenRng);

        assert!(!id.contains('-'));
        assert!(id.parse::<u128>().unwrap() > 0);
    }

    #[test]
    fn ten_thousand_concurrent_ids_are_distinct() {
        const THREADS: usize = 16;
        const PER_THREAD: usize = 625;

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                thread::spawn(|| {
                    (0..PER_THREAD)
                        .map(|_| generate_correlation_id())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let ids: HashSet<String> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();

        assert_eq!(ids.len(), THREADS * PER_THREAD);
    }
}
