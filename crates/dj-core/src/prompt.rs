/// Returns the occupation with surrounding whitespace removed, or `None`
/// when nothing is left.
pub fn normalize_occupation(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Builds the provider prompt. The occupation is embedded verbatim.
// TODO: decide on a length cap and quoting rules for the occupation once
// abuse of the provider prompt field has been assessed.
pub fn occupation_prompt(occupation: &str) -> String {
    format!(
        "A professional portrait of a person working as a \"{occupation}\" in a fun, creative, \
         and modern style. The person should be wearing appropriate attire and be in a relevant \
         work environment. High quality, detailed, photorealistic, good lighting, professional \
         photography style."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_occupation() {
        let prompt = occupation_prompt("우주 카페 바리스타");
        assert!(prompt.contains("\"우주 카페 바리스타\""));
        assert!(prompt.starts_with("A professional portrait of a person working as a"));
        assert!(prompt.ends_with("professional photography style."));
    }

    #[test]
    fn test_normalize_occupation() {
        assert_eq!(normalize_occupation("  chef \n"), Some("chef"));
        assert_eq!(normalize_occupation("   "), None);
        assert_eq!(normalize_occupation(""), None);
    }
}
