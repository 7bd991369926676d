/// Normalises a product name into a catalog slug.
///
/// `&` and `+` are spelled out, every other run of non-alphanumeric
/// characters collapses to a single `-`, and the result never starts or
/// ends with `-`.
///
/// ```
/// use practice_portal::catalog::slugify;
///
/// assert_eq!(slugify("  QuickBooks Online "), "quickbooks-online");
/// assert_eq!(slugify("Sage 50 & Payroll"), "sage-50-and-payroll");
/// ```
#[must_use]
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;

    for c in input.chars() {
        let word = match c {
            '&' => Some("and"),
            '+' => Some("plus"),
            _ => None,
        };

        if let Some(word) = word {
            if !slug.is_empty() {
                slug.push('-');
            }
            slug.push_str(word);
            pending_dash = true;
            continue;
        }

        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}
