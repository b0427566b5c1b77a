/// Who the cover page is addressed to: `?to=` wins over `?name=`, and blank
/// values fall back to the configured honorific.
pub fn addressee<'a>(to: Option<&'a str>, name: Option<&'a str>, default: &'a str) -> &'a str {
    [to, name]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HONORIFIC: &str = "Bapak/Ibu/Saudara/i";

    #[test]
    fn prefers_to_over_name() {
        assert_eq!(addressee(Some("Budi"), Some("Ani"), HONORIFIC), "Budi");
        assert_eq!(addressee(None, Some("Ani"), HONORIFIC), "Ani");
    }

    #[test]
    fn blank_values_fall_back() {
        assert_eq!(addressee(Some("  "), None, HONORIFIC), HONORIFIC);
        assert_eq!(addressee(Some(""), Some(" Ani "), HONORIFIC), "Ani");
        assert_eq!(addressee(None, None, HONORIFIC), HONORIFIC);
    }
}
