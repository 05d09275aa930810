/// Strips byte-order marks and zero-width spaces and collapses runs of whitespace.
///
/// Case is preserved: source and choice names are case sensitive.
pub(crate) fn normalize_name(value: &str) -> String {
    let cleaned = value.replace(['\u{feff}', '\u{200b}'], "");
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_bom_and_extra_whitespace_but_keeps_case() {
        assert_eq!(normalize_name("\u{feff}choice"), "choice");
        assert_eq!(normalize_name("  New   York,  NY "), "New York, NY");
        assert_eq!(normalize_name("Horse\u{200b}Power"), "HorsePower");
    }
}
