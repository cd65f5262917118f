//! Row rewriting and statement terminator fixup.

/// Turn the text after `VALUES` into a bare tuple continuing the list.
///
/// `" (1,'x');"` becomes `"(1,'x'),"`. Anything after the last `);` is
/// dropped along with the semicolon.
pub fn rewrite_row(values: &str) -> String {
    let values = values.trim_start();

    let mut row = match values.rfind(");") {
        Some(idx) => values[..=idx].to_string(),
        None => {
            let trimmed = values.trim_end();
            trimmed
                .strip_suffix(';')
                .unwrap_or(trimmed)
                .trim_end()
                .to_string()
        }
    };
    row.push(',');
    row
}

/// End a statement: the trailing `,` of the last row becomes `;`.
///
/// Rows that do not end with `,` are returned unchanged.
pub fn fix_terminator(row: &str) -> String {
    match row.strip_suffix(',') {
        Some(body) => format!("{};", body),
        None => row.to_string(),
    }
}
