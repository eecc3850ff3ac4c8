use std::io::Write;

use serde::Serialize;

use crate::error::CliError;

/// Write `value` as one JSON document to stdout.
pub fn render<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<(), CliError> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    if pretty {
        serde_json::to_writer_pretty(&mut handle, value)?;
    } else {
        serde_json::to_writer(&mut handle, value)?;
    }
    writeln!(handle)?;
    Ok(())
}
