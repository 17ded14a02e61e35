//! Identifier output.

use std::io::Write;

use anyhow::Result;
use serde::Serialize;
use tagwatch_reader::TagId;

use crate::args::OutputFormat;

#[derive(Serialize)]
struct TagLine<'a> {
    tag_id: &'a TagId,
}

/// Render one identifier as an output line, without the newline.
pub fn render(format: OutputFormat, id: &TagId) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(format!("Tag ID: {id}")),
        OutputFormat::Json => Ok(serde_json::to_string(&TagLine { tag_id: id })?),
    }
}

/// Write one identifier line to stdout and flush it.
pub fn print(format: OutputFormat, id: &TagId) -> Result<()> {
    let line = render(format, id)?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{line}")?;
    stdout.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_text() {
        let id = TagId::from_bytes(&[0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(render(OutputFormat::Text, &id).unwrap(), "Tag ID: deadbeef");
    }

    #[test]
    fn test_render_json() {
        let id = TagId::from_bytes(&[0x01, 0x02]);
        assert_eq!(render(OutputFormat::Json, &id).unwrap(), r#"{"tag_id":"0102"}"#);
    }
}
