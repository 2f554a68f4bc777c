use crate::domain::command::{CartCommand, CommandRecord};
use crate::error::{CartError, Result};
use std::io::Read;

/// Reads cart commands from a CSV source.
///
/// This reader wraps `csv::Reader` and yields one `Result<CartCommand>` per
/// row. Whitespace around fields is trimmed and short rows are accepted, so
/// hand-written files only need the columns a command actually uses.
pub struct CommandReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CommandReader<R> {
    /// Creates a new `CommandReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads rows and turns them into commands.
    ///
    /// A malformed row yields an error for that row only; the iterator keeps
    /// going with the next one.
    pub fn commands(self) -> impl Iterator<Item = Result<CartCommand>> {
        self.reader.into_deserialize().map(|result| {
            let record: CommandRecord = result.map_err(CartError::from)?;
            CartCommand::try_from(record)
        })
    }
}
