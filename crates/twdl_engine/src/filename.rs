/// Make a media file name safe to join onto the destination directory.
///
/// Runs of `/` or `\` become a single `-`; names that would still escape the
/// directory (empty, `.`, `..`) become `unnamed`.
pub fn sanitize_file_name(name: &str) -> String {
    let mut cleaned = String::with_capacity(name.len());
    let mut in_separator = false;
    for c in name.chars() {
        if matches!(c, '/' | '\\') {
            if !in_separator {
                cleaned.push('-');
            }
            in_separator = true;
        } else if c.is_control() {
            in_separator = false;
        } else {
            cleaned.push(c);
            in_separator = false;
        }
    }
    if matches!(cleaned.trim(), "" | "." | "..") {
        return "unnamed".to_string();
    }
    cleaned
}
