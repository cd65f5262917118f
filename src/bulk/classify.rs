//! Line classification for the bulk pass.
//!
//! Every data row of an exported file is a complete single-row statement, so
//! continuation rows look exactly like the first row of a batch. Deciding
//! which is which belongs to the batcher; this module only separates
//! statement lines from everything else.

pub const INSERT_KEYWORD: &str = "INSERT INTO";
pub const VALUES_KEYWORD: &str = "VALUES";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// `INSERT INTO <table> (<cols>) VALUES (<tuple>);`
    StatementStart {
        /// `INSERT INTO` through `VALUES`, inclusive
        header: &'a str,
        /// Everything after the `VALUES` keyword
        values: &'a str,
    },
    /// Any line without an `INSERT INTO ... VALUES` shape
    Boundary,
}

pub fn classify(line: &str) -> LineKind<'_> {
    let Some(start) = line.find(INSERT_KEYWORD) else {
        return LineKind::Boundary;
    };
    let after_insert = start + INSERT_KEYWORD.len();
    let Some(offset) = find_values_keyword(&line[after_insert..]) else {
        return LineKind::Boundary;
    };
    let header_end = after_insert + offset + VALUES_KEYWORD.len();

    LineKind::StatementStart {
        header: &line[start..header_end],
        values: &line[header_end..],
    }
}

/// Offset of the first `VALUES` that stands as a keyword: preceded by
/// whitespace or `)`, followed by whitespace, `(` or end of line.
///
/// Identifiers such as `VALUES_x` or `t_VALUES` never match.
fn find_values_keyword(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    text.match_indices(VALUES_KEYWORD).map(|(idx, _)| idx).find(|&idx| {
        let before_ok = idx
            .checked_sub(1)
            .is_some_and(|prev| bytes[prev].is_ascii_whitespace() || bytes[prev] == b')');
        let after_ok = match bytes.get(idx + VALUES_KEYWORD.len()) {
            None => true,
            Some(&next) => next.is_ascii_whitespace() || next == b'(',
        };
        before_ok && after_ok
    })
}

/// A header line on its own: `INSERT INTO ... VALUES` with no tuple after it.
pub fn is_header_only(line: &str) -> bool {
    if !line.starts_with("INSERT INTO ") {
        return false;
    }
    match line.trim_end().strip_suffix(VALUES_KEYWORD) {
        Some(rest) => rest.ends_with(|c: char| c.is_ascii_whitespace() || c == ')'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_start() {
        let kind = classify("INSERT INTO t (a,b) VALUES (1,'x');");
        assert_eq!(
            kind,
            LineKind::StatementStart {
                header: "INSERT INTO t (a,b) VALUES",
                values: " (1,'x');",
            }
        );
    }

    #[test]
    fn test_header_starts_at_insert_keyword() {
        match classify("  INSERT INTO t (a) VALUES (1);") {
            LineKind::StatementStart { header, .. } => {
                assert_eq!(header, "INSERT INTO t (a) VALUES")
            }
            LineKind::Boundary => panic!("expected a statement"),
        }
    }

    #[test]
    fn test_boundaries() {
        assert_eq!(classify(""), LineKind::Boundary);
        assert_eq!(classify("-- Table: users"), LineKind::Boundary);
        assert_eq!(classify("LOCK TABLES `t` WRITE;"), LineKind::Boundary);
        // VALUES must follow INSERT INTO
        assert_eq!(classify("VALUES INSERT INTO t"), LineKind::Boundary);
        assert_eq!(classify("INSERT INTO t SELECT * FROM u;"), LineKind::Boundary);
    }

    #[test]
    fn test_values_inside_identifiers_is_not_the_keyword() {
        assert_eq!(
            classify("INSERT INTO t (id,VALUES_x) VALUES (1,2);"),
            LineKind::StatementStart {
                header: "INSERT INTO t (id,VALUES_x) VALUES",
                values: " (1,2);",
            }
        );
        assert_eq!(
            classify("INSERT INTO t_VALUES (a) VALUES(1);"),
            LineKind::StatementStart {
                header: "INSERT INTO t_VALUES (a) VALUES",
                values: "(1);",
            }
        );
        assert_eq!(
            classify("INSERT INTO VALUESLOG (a) VALUES (1);"),
            LineKind::StatementStart {
                header: "INSERT INTO VALUESLOG (a) VALUES",
                values: " (1);",
            }
        );
        // no keyword at all, only an identifier
        assert_eq!(classify("INSERT INTO t (VALUES_x) SELECT 1;"), LineKind::Boundary);
    }

    #[test]
    fn test_is_header_only() {
        assert!(is_header_only("INSERT INTO t (a,b) VALUES"));
        assert!(is_header_only("INSERT INTO t (a,b) VALUES  "));
        assert!(!is_header_only("INSERT INTO t (a) VALUES (1);"));
        assert!(!is_header_only("(1,'VALUES'),"));
        assert!(!is_header_only("INSERT INTO t (a) SELECT b FROM t_VALUES"));
    }
}
