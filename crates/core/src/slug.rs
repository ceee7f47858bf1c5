//! Slugs and labels for exploration nodes.
//!
//! A slug is the stable identifier of a node in the exploration graph. Labels
//! coming back from the orchestrator are turned into slugs, and slugs supplied by
//! the client are turned back into human-readable labels.

/// Maximum length of a slug, in characters.
pub const MAX_SLUG_LEN: usize = 80;

/// Converts free text into a URL-safe slug.
///
/// Lowercases the input, drops everything that is not a word character,
/// whitespace or hyphen, turns runs of whitespace/underscores/hyphens into a
/// single hyphen and trims hyphens from both ends. Slugs longer than
/// [`MAX_SLUG_LEN`] are cut back to the last hyphen inside the limit.
///
/// `slugify(&slugify(x)) == slugify(x)` holds for every input.
pub fn slugify(text: &str) -> String {
    let lowered = text.trim().to_lowercase();
    let mut slug = String::with_capacity(lowered.len());
    let mut pending_separator = false;

    for c in lowered.chars() {
        if c.is_whitespace() || c == '_' || c == '-' {
            pending_separator = true;
        } else if c.is_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(c);
        }
        // Anything else is dropped without breaking the current run.
    }

    if slug.chars().count() > MAX_SLUG_LEN {
        let head: String = slug.chars().take(MAX_SLUG_LEN).collect();
        slug = match head.rsplit_once('-') {
            Some((prefix, _)) => prefix.to_string(),
            None => head,
        };
    }

    slug
}

/// Title-cases every word: the first letter after a non-letter is uppercased,
/// the rest lowercased.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for c in text.chars() {
        if at_word_start {
            out.extend(c.to_uppercase());
        } else {
            out.extend(c.to_lowercase());
        }
        at_word_start = !c.is_alphabetic();
    }
    out
}

/// Turns a slug back into a display label (`"hawking-radiation"` becomes
/// `"Hawking Radiation"`).
pub fn label_from_slug(slug: &str) -> String {
    title_case(&slug.replace('-', " "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_slug() {
        assert_eq!(slugify("CRISPR Gene Editing!"), "crispr-gene-editing");
        assert_eq!(slugify("Black Holes"), "black-holes");
    }

    #[test]
    fn test_special_characters_and_separators() {
        assert_eq!(slugify("Wave-Particle Duality"), "wave-particle-duality");
        assert_eq!(slugify("  a  -  b__c  "), "a-b-c");
        assert_eq!(slugify("Einstein's (1915) theory"), "einsteins-1915-theory");
        assert_eq!(slugify("--leading and trailing--"), "leading-and-trailing");
    }

    #[test]
    fn test_unicode_letters_are_kept() {
        assert_eq!(slugify("Schrödinger Équation"), "schrödinger-équation");
    }

    #[test]
    fn test_empty_and_whitespace() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("   \t\n"), "");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_long_input_is_cut_at_a_hyphen() {
        let long = "word ".repeat(40);
        let slug = slugify(&long);
        assert!(slug.chars().count() <= MAX_SLUG_LEN);
        assert!(!slug.ends_with('-'));
        assert!(slug.starts_with("word-word"));

        let unbroken = "x".repeat(200);
        assert_eq!(slugify(&unbroken).len(), MAX_SLUG_LEN);
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "CRISPR Gene Editing!",
            "  Quantum -- Tunneling__Effect ",
            "Hubble Tension: a 5σ problem?",
            &"long label segment ".repeat(12),
            "",
        ];
        for sample in samples {
            let once = slugify(sample);
            assert_eq!(slugify(&once), once, "not idempotent for {sample:?}");
        }
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("black holes"), "Black Holes");
        assert_eq!(title_case("DARK matter"), "Dark Matter");
        assert_eq!(title_case("3d printing"), "3D Printing");
        assert_eq!(label_from_slug("hawking-radiation"), "Hawking Radiation");
    }
}
