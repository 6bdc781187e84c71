//! Trial-division prime counting.
//!
//! This is a deliberately naive CPU-bound workload: O(bound * sqrt(bound))
//! time and constant space. It exists to give the dispatchers something worth
//! moving off the caller's thread, not to be fast.

/// Returns `true` when no integer in `[2, floor(sqrt(n))]` divides `n`.
///
/// `0` and `1` are not prime.
pub fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    let mut j = 2u64;
    // `j <= n / j` is `j * j <= n` without the overflow near u64::MAX
    while j <= n / j {
        if n % j == 0 {
            return false;
        }
        j += 1;
    }
    true
}

/// Count the primes in `[2, bound]`.
///
/// Total over every `i64`: bounds below 2 yield 0.
///
/// ```
/// assert_eq!(primeworker::count_primes(10), 4);
/// assert_eq!(primeworker::count_primes(-3), 0);
/// ```
pub fn count_primes(bound: i64) -> u64 {
    if bound < 2 {
        return 0;
    }
    (2..=bound as u64).filter(|&i| is_prime(i)).count() as u64
}
