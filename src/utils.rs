use std::cmp::Ordering;

/// Split text into alternating runs of ASCII digits and everything else.
fn segments(text: &str) -> impl Iterator<Item = &str> {
    let mut rest = text;
    std::iter::from_fn(move || {
        let digit = rest.chars().next()?.is_ascii_digit();
        let end = rest
            .find(|c: char| c.is_ascii_digit() != digit)
            .unwrap_or(rest.len());
        let (segment, tail) = rest.split_at(end);
        rest = tail;
        Some(segment)
    })
}

fn compare_segment(left: &str, right: &str) -> Ordering {
    let is_number = |s: &str| s.starts_with(|c: char| c.is_ascii_digit());
    if is_number(left) && is_number(right) {
        let l = left.trim_start_matches('0');
        let r = right.trim_start_matches('0');
        l.len().cmp(&r.len()).then_with(|| l.cmp(r))
    } else {
        left.cmp(right)
    }
}

/// Natural ("human") string ordering: embedded integers compare by value,
/// so `key2` sorts before `key10`.
///
/// Strings that only differ in leading zeros fall back to plain ordering,
/// so only identical strings compare equal.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = segments(a);
    let mut right = segments(b);

    loop {
        let ord = match (left.next(), right.next()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) => compare_segment(l, r),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn natural_cmp_orders_embedded_numbers() {
        let mut keys = vec!["item2", "item10", "item1"];
        keys.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(keys, vec!["item1", "item2", "item10"]);
    }

    #[test]
    fn natural_cmp_handles_mixed_segments() {
        assert_eq!(natural_cmp("a.b2.c", "a.b10.c"), Ordering::Less);
        assert_eq!(natural_cmp("page", "page.title"), Ordering::Less);
        assert_eq!(natural_cmp("v1.10", "v1.9"), Ordering::Greater);
        assert_eq!(natural_cmp("9", "a"), Ordering::Less);
    }

    #[test]
    fn natural_cmp_is_total_on_leading_zeros() {
        assert_ne!(natural_cmp("x01", "x1"), Ordering::Equal);
        assert_eq!(natural_cmp("x1", "x1"), Ordering::Equal);
    }
}
