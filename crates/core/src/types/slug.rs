//! URL slugs for products, categories and blog posts.

/// Derive a slug from a display name.
///
/// Letters and digits from any script are kept, so Persian names produce
/// Persian slugs. ASCII letters are lowercased, runs of whitespace, dashes
/// and underscores become a single `-`, and everything else is dropped.
///
/// ```
/// use ashpazkhoone_core::slugify;
///
/// assert_eq!(slugify("Cast Iron Pan (28cm)"), "cast-iron-pan-28cm");
/// assert_eq!(slugify("  قابلمه   استیل  "), "قابلمه-استیل");
/// ```
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else if c.is_whitespace() || matches!(c, '-' | '_' | '\u{200c}') {
            pending_dash = true;
        }
    }

    slug
}
