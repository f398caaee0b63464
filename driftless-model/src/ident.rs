//! Identifier comparison helpers.

/// Case-insensitive identifier equality.
pub fn same_ident(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}
