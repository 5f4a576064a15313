//! Glob selection of database names
//!
//! Case-sensitive shell-style globs: `*` matches any run of characters,
//! `?` exactly one, `[...]` a bracket expression (`[a-z]`, `[!0-9]`,
//! `[[:digit:]_]`). The result is the union over all patterns.
//!
//! POSIX named classes are expanded to explicit ranges before the pattern
//! reaches globset, which has no notion of them.

use std::collections::BTreeSet;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use super::errors::{CatalogError, CatalogResult};

/// Compile patterns into one matcher
pub fn compile(patterns: &[String]) -> CatalogResult<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let expanded = expand_classes(pattern).map_err(|reason| CatalogError::InvalidPattern {
            pattern: pattern.clone(),
            reason,
        })?;
        let glob = GlobBuilder::new(&expanded)
            .case_insensitive(false)
            .literal_separator(false)
            .backslash_escape(true)
            .build()
            .map_err(|e| CatalogError::InvalidPattern {
                pattern: pattern.clone(),
                reason: e.kind().to_string(),
            })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| CatalogError::InvalidPattern {
        pattern: patterns.join(" "),
        reason: e.to_string(),
    })
}

/// Select the databases matching any pattern; no patterns selects all
pub fn filter(databases: &BTreeSet<String>, patterns: &[String]) -> CatalogResult<BTreeSet<String>> {
    if patterns.is_empty() {
        return Ok(databases.clone());
    }

    let matcher = compile(patterns)?;
    Ok(databases
        .iter()
        .filter(|name| matcher.is_match(name.as_str()))
        .cloned()
        .collect())
}

/// Members of a POSIX named class, as bracket-expression ranges
fn class_members(name: &str) -> Option<&'static str> {
    let members = match name {
        "alpha" => "a-zA-Z",
        "digit" => "0-9",
        "alnum" => "a-zA-Z0-9",
        "upper" => "A-Z",
        "lower" => "a-z",
        "xdigit" => "0-9A-Fa-f",
        "space" => " \t\n\r\x0b\x0c",
        "blank" => " \t",
        _ => return None,
    };
    Some(members)
}

/// Rewrite `[:name:]` inside bracket expressions into plain ranges
fn expand_classes(pattern: &str) -> Result<String, String> {
    let mut out = String::with_capacity(pattern.len());
    let mut in_bracket = false;
    let mut rest = pattern;

    while let Some(c) = rest.chars().next() {
        if in_bracket && rest.starts_with("[:") {
            if let Some(end) = rest[2..].find(":]") {
                let name = &rest[2..2 + end];
                let members = class_members(name)
                    .ok_or_else(|| format!("unknown character class [:{}:]", name))?;
                out.push_str(members);
                rest = &rest[end + 4..];
                continue;
            }
        }

        out.push(c);
        rest = &rest[c.len_utf8()..];

        match c {
            '\\' => {
                if let Some(next) = rest.chars().next() {
                    out.push(next);
                    rest = &rest[next.len_utf8()..];
                }
            }
            '[' if !in_bracket => {
                in_bracket = true;
                // a leading `!` and then `]` are part of the expression
                if let Some(stripped) = rest.strip_prefix('!') {
                    out.push('!');
                    rest = stripped;
                }
                if let Some(stripped) = rest.strip_prefix(']') {
                    out.push(']');
                    rest = stripped;
                }
            }
            ']' if in_bracket => in_bracket = false,
            _ => {}
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn patterns(p: &[&str]) -> Vec<String> {
        p.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_prefix_glob() {
        let dbs = set(&["app_db", "app_test", "sys"]);
        let selected = filter(&dbs, &patterns(&["app_*"])).unwrap();
        assert_eq!(selected, set(&["app_db", "app_test"]));
    }

    #[test]
    fn test_no_patterns_selects_everything() {
        let dbs = set(&["app_db", "app_test", "sys"]);
        assert_eq!(filter(&dbs, &[]).unwrap(), dbs);
    }

    #[test]
    fn test_union_without_duplicates() {
        let dbs = set(&["app_db", "app_test", "sys"]);
        let selected = filter(&dbs, &patterns(&["app_*", "sys", "*_db"])).unwrap();
        assert_eq!(selected, set(&["app_db", "app_test", "sys"]));
    }

    #[test]
    fn test_question_mark_matches_one_character() {
        let dbs = set(&["db1", "db12", "db"]);
        assert_eq!(filter(&dbs, &patterns(&["db?"])).unwrap(), set(&["db1"]));
    }

    #[test]
    fn test_bracket_expressions() {
        let dbs = set(&["shard_a", "shard_b", "shard_c", "shard_1"]);
        assert_eq!(
            filter(&dbs, &patterns(&["shard_[ab]"])).unwrap(),
            set(&["shard_a", "shard_b"])
        );
        assert_eq!(
            filter(&dbs, &patterns(&["shard_[!a-z]"])).unwrap(),
            set(&["shard_1"])
        );
    }

    #[test]
    fn test_posix_classes() {
        let dbs = set(&["shard1", "shard2", "shardx", "Shard3"]);
        assert_eq!(
            filter(&dbs, &patterns(&["shard[[:digit:]]"])).unwrap(),
            set(&["shard1", "shard2"])
        );
        assert_eq!(
            filter(&dbs, &patterns(&["[[:upper:]]*"])).unwrap(),
            set(&["Shard3"])
        );
        assert_eq!(
            filter(&dbs, &patterns(&["shard[![:digit:]]"])).unwrap(),
            set(&["shardx"])
        );
    }

    #[test]
    fn test_unknown_posix_class() {
        let err = compile(&patterns(&["db[[:emoji:]]"])).unwrap_err();
        assert_eq!(err.code(), "B2S_CATALOG_PATTERN");
        assert!(err.to_string().contains("[:emoji:]"));
    }

    #[test]
    fn test_class_expansion() {
        assert_eq!(expand_classes("a[[:digit:]_]*").unwrap(), "a[0-9_]*");
        assert_eq!(expand_classes("plain_*").unwrap(), "plain_*");
        // outside a bracket expression the text is left alone
        assert_eq!(expand_classes("x[:digit:]").unwrap(), "x[:digit:]");
    }

    #[test]
    fn test_case_sensitive() {
        let dbs = set(&["Sales", "sales"]);
        assert_eq!(filter(&dbs, &patterns(&["s*"])).unwrap(), set(&["sales"]));
    }

    #[test]
    fn test_no_match_is_empty() {
        let dbs = set(&["a", "b"]);
        assert!(filter(&dbs, &patterns(&["zzz*"])).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_pattern() {
        let dbs = set(&["a"]);
        let err = filter(&dbs, &patterns(&["[unclosed"])).unwrap_err();
        assert_eq!(err.code(), "B2S_CATALOG_PATTERN");
    }
}
