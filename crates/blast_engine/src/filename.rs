const PREFIX_CHARS: usize = 8;
const OUTPUT_SUFFIX: &str = "_Output.txt";

/// Output file name for a run: the first eight characters of the query id
/// followed by `_Output.txt`. Characters that are not allowed in file names
/// on common platforms become `_`.
pub fn output_filename(query_id: &str) -> String {
    let prefix: String = query_id
        .chars()
        .take(PREFIX_CHARS)
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    format!("{prefix}{OUTPUT_SUFFIX}")
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}
