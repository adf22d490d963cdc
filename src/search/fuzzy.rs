//! Fuzzy matching tuned for identifier-shaped strings (table and column names).

/// Does `candidate` match `query`?
///
/// Checks, in order: empty query (always matches), case-insensitive
/// substring, then token-boundary prefix. Tokens are split on
/// non-alphanumeric characters and lowercase-to-uppercase transitions, so
/// `ord` matches both `customer_orders` and `customerOrders`.
pub fn matches(candidate: &str, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    let folded = query.to_lowercase();
    // Substring subsumes whole-string equality.
    if candidate.to_lowercase().contains(&folded) {
        return true;
    }
    tokens(candidate)
        .iter()
        .any(|token| token.to_lowercase().starts_with(&folded))
}

/// Levenshtein distance over characters. Symmetric; callers fold case
/// themselves when ranking case-insensitively.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        cur[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitute = prev[j] + usize::from(ca != cb);
            cur[j + 1] = substitute.min(prev[j + 1] + 1).min(cur[j] + 1);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

/// Split an identifier into words: `order_items` → [order, items],
/// `customerOrders` → [customer, Orders]. Digits extend the current token.
fn tokens(s: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut prev_lower = false;
    for ch in s.chars() {
        if !ch.is_alphanumeric() {
            if !cur.is_empty() {
                out.push(std::mem::take(&mut cur));
            }
            prev_lower = false;
            continue;
        }
        if ch.is_uppercase() && prev_lower {
            out.push(std::mem::take(&mut cur));
        }
        cur.push(ch);
        prev_lower = ch.is_lowercase() || ch.is_numeric();
    }
    if !cur.is_empty() {
        out.push(cur);
    }
    out
}
