//! Plain-text output for the CLI
//!
//! Log records go through the `Logger`; this is only for results meant to
//! be consumed by other programs, one item per line, UTF-8.

use std::io::Write;

use super::errors::CliResult;

/// Write one name per line and flush
pub fn write_names<W: Write>(out: &mut W, names: &[String]) -> CliResult<()> {
    for name in names {
        writeln!(out, "{}", name)?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_names() {
        let mut out = Vec::new();
        write_names(&mut out, &["app_db".to_string(), "sys".to_string()]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "app_db\nsys\n");
    }

    #[test]
    fn test_write_nothing() {
        let mut out = Vec::new();
        write_names(&mut out, &[]).unwrap();
        assert!(out.is_empty());
    }
}
