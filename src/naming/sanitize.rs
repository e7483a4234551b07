/// Characters that cannot appear in a file name on at least one of the
/// platforms the corpus lives on.
const ILLEGAL: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Make a label usable as a file name: illegal characters become spaces,
/// whitespace runs collapse to one space, and leading/trailing spaces and
/// dots are dropped. Accents and case are kept.
pub fn sanitize_label(label: &str) -> String {
    let replaced: String = label
        .chars()
        .map(|c| if ILLEGAL.contains(&c) { ' ' } else { c })
        .collect();
    let collapsed = replaced.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.trim_matches(|c| c == ' ' || c == '.').to_string()
}
