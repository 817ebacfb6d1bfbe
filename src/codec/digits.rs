//! Base-62 fraction arithmetic on digit slices.
//!
//! ## Overview
//!
//! A digit slice `[d1, d2, ..., dk]` denotes the fraction
//! `d1/62 + d2/62^2 + ... + dk/62^k`. Slices of different length compare
//! as if the shorter one were padded with zeros. An empty slice is zero.
//!
//! All functions here are pure integer arithmetic; nothing allocates more
//! than one digit beyond the longest input.

use std::cmp::Ordering;

use crate::types::BASE;

/// Compare two digit fractions
pub fn compare(a: &[u8], b: &[u8]) -> Ordering {
    let len = a.len().max(b.len());
    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

/// Exact average of `low` and `high`, where `high = None` stands for 1.0
///
/// The result has at most one digit more than the longer input: the sum is
/// formed digit-wise with carry, then halved digit-wise from the most
/// significant end. An odd final digit leaves a remainder of one half unit,
/// which becomes a trailing 31 (= 62 / 2).
///
/// # Example
///
/// ```
/// use stage_rank::codec::digits::average;
///
/// // (1/62 + 3/62) / 2 = 2/62
/// assert_eq!(average(&[1], Some(&[3])), vec![2]);
/// // (1/62 + 2/62) / 2 = 1/62 + 31/62^2
/// assert_eq!(average(&[1], Some(&[2])), vec![1, 31]);
/// ```
pub fn average(low: &[u8], high: Option<&[u8]>) -> Vec<u8> {
    let width = low.len().max(high.map_or(0, <[u8]>::len));

    // sum[0] holds the integer part
    let mut sum = vec![0u32; width + 1];
    let mut carry = 0u32;
    for i in (0..width).rev() {
        let a = low.get(i).copied().unwrap_or(0) as u32;
        let b = high.and_then(|h| h.get(i)).copied().unwrap_or(0) as u32;
        let s = a + b + carry;
        sum[i + 1] = s % BASE;
        carry = s / BASE;
    }
    sum[0] = carry + u32::from(high.is_none());

    let mut out = Vec::with_capacity(width + 2);
    let mut rem = 0u32;
    for &digit in &sum {
        let cur = rem * BASE + digit;
        out.push((cur / 2) as u8);
        rem = cur % 2;
    }
    if rem == 1 {
        out.push((BASE / 2) as u8);
    }

    // The average of two values below 1.0 has no integer part
    out.remove(0);
    out
}

/// Shortest prefix of `mid` that is still strictly greater than `low`
///
/// `mid` must itself be greater than `low`.
pub fn shortest_above<'a>(mid: &'a [u8], low: &[u8]) -> &'a [u8] {
    for k in 1..=mid.len() {
        let prefix = &mid[..k];
        if compare(prefix, low) == Ordering::Greater {
            return prefix;
        }
    }
    mid
}

/// Smallest single-step key above `low`
///
/// Finds the first digit position that can be incremented without
/// carrying; positions past the end of `low` count as zero, so a result
/// always exists and is at most one digit longer than `low`.
pub fn step_up(low: &[u8]) -> Vec<u8> {
    let top = (BASE - 1) as u8;
    let k = low.iter().position(|&d| d < top).unwrap_or(low.len());
    let mut out = low[..k].to_vec();
    out.push(low.get(k).copied().unwrap_or(0) + 1);
    out
}

/// Largest single-step key below `high` that is still above zero
///
/// Returns `None` when every prefix of `high` is already the smallest
/// non-zero value at its length (e.g. `"1"`, `"01"`).
pub fn step_down(high: &[u8]) -> Option<Vec<u8>> {
    let mut seen_nonzero = false;
    for (k, &digit) in high.iter().enumerate() {
        if digit >= 2 || (digit == 1 && seen_nonzero) {
            let mut out = high[..k].to_vec();
            out.push(digit - 1);
            return Some(out);
        }
        seen_nonzero |= digit != 0;
    }
    None
}

/// Number of digits needed for `n` keys spaced at least one full digit
/// (62 units) apart: the smallest `L` with `62^L >= (n + 1) * 62`.
pub fn canonical_len(n: usize) -> usize {
    let slots = n as u128 + 1;
    let mut len = 1;
    let mut capacity = BASE as u128;
    while capacity < slots * BASE as u128 {
        capacity *= BASE as u128;
        len += 1;
    }
    len
}

/// Digits of the `i`-th of `n` evenly spaced points in `(0, 1)`, at `len`
/// digits: `floor((i + 1) * 62^len / (n + 1))`.
pub fn spread_point(i: usize, n: usize, len: usize) -> Vec<u8> {
    let space = (BASE as u128).pow(len as u32);
    let parts = n as u128 + 1;
    let step = i as u128 + 1;
    // Split to keep the product small
    let mut value = step * (space / parts) + step * (space % parts) / parts;

    let mut out = vec![0u8; len];
    for slot in out.iter_mut().rev() {
        *slot = (value % BASE as u128) as u8;
        value /= BASE as u128;
    }
    out
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_pads_with_zeros() {
        assert_eq!(compare(&[1], &[1, 0, 0]), Ordering::Equal);
        assert_eq!(compare(&[1], &[1, 1]), Ordering::Less);
        assert_eq!(compare(&[2], &[1, 61]), Ordering::Greater);
        assert_eq!(compare(&[], &[0, 1]), Ordering::Less);
    }

    #[test]
    fn test_average_with_carry() {
        // (61/62 + 61/62) / 2 = 61/62
        assert_eq!(average(&[61], Some(&[61])), vec![61]);
        // 123 and 125 units at two digits average to 124 = [2, 0]
        assert_eq!(average(&[1, 61], Some(&[2, 1])), vec![2, 0]);
    }

    #[test]
    fn test_average_open_high() {
        // (0 + 1) / 2 = 31/62
        assert_eq!(average(&[], None), vec![31]);
        // (61/62 + 1) / 2 = 61/62 + 31/62^2
        assert_eq!(average(&[61], None), vec![61, 31]);
    }

    #[test]
    fn test_shortest_above() {
        let mid = [2, 15];
        assert_eq!(shortest_above(&mid, &[1, 31]), &[2][..]);
        assert_eq!(shortest_above(&mid, &[2, 1]), &[2, 15][..]);
    }

    #[test]
    fn test_step_up() {
        assert_eq!(step_up(&[31]), vec![32]);
        assert_eq!(step_up(&[61]), vec![61, 1]);
        assert_eq!(step_up(&[61, 61, 4]), vec![61, 61, 5]);
        assert_eq!(step_up(&[]), vec![1]);
    }

    #[test]
    fn test_step_down() {
        assert_eq!(step_down(&[31]), Some(vec![30]));
        assert_eq!(step_down(&[1]), None);
        assert_eq!(step_down(&[0, 1]), None);
        assert_eq!(step_down(&[1, 1]), Some(vec![1, 0]));
        assert_eq!(step_down(&[0, 5]), Some(vec![0, 4]));
    }

    #[test]
    fn test_canonical_len() {
        assert_eq!(canonical_len(0), 1);
        assert_eq!(canonical_len(1), 2);
        assert_eq!(canonical_len(61), 2);
        assert_eq!(canonical_len(62), 3);
        assert_eq!(canonical_len(3843), 3);
        assert_eq!(canonical_len(3844), 4);
    }

    #[test]
    fn test_spread_points_are_increasing_and_spaced() {
        let n = 100;
        let len = canonical_len(n);
        let points: Vec<Vec<u8>> = (0..n).map(|i| spread_point(i, n, len)).collect();

        for pair in points.windows(2) {
            assert_eq!(compare(&pair[0], &pair[1]), Ordering::Less);
        }
        assert!(points[0].iter().any(|&d| d != 0));
        assert!(points.iter().all(|p| p.len() == len));
    }
}
