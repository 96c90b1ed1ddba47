//! CSV ingestion: schema-line parsing and typed field encoding.

use crate::common::{Result, SpindleError};
use crate::record::{Column, DataType, Schema, StrBytes};

/// Parses the schema line: comma-separated `name#TYPE` tokens.
pub fn parse_schema_line(line: &str) -> Result<Schema> {
    let mut columns = Vec::new();
    for token in line.split(',') {
        let (name, type_token) = token.split_once('#').ok_or_else(|| {
            SpindleError::Csv(format!("schema token `{token}` is missing `#TYPE`"))
        })?;
        columns.push(Column::new(name, DataType::parse_token(type_token)?));
    }
    Ok(Schema::new(columns))
}

/// Reads comma-separated fields off one record line. String fields may be
/// quoted with `"…"`; a comma right after the closing quote is consumed.
/// Running past the end of the line yields empty fields.
pub struct FieldReader<'a> {
    rest: &'a str,
}

impl<'a> FieldReader<'a> {
    pub fn new(line: &'a str) -> Self {
        Self { rest: line }
    }

    /// Next field, up to the following comma.
    pub fn next_plain(&mut self) -> &'a str {
        match self.rest.split_once(',') {
            Some((field, rest)) => {
                self.rest = rest;
                field
            }
            None => {
                let field = self.rest;
                self.rest = "";
                field
            }
        }
    }

    /// Next string field, honoring quotes.
    pub fn next_string(&mut self) -> Result<&'a str> {
        let Some(after_quote) = self.rest.strip_prefix('"') else {
            return Ok(self.next_plain());
        };
        let end = after_quote
            .find('"')
            .ok_or_else(|| SpindleError::Csv("unterminated quoted field".to_string()))?;
        let field = &after_quote[..end];
        let tail = &after_quote[end + 1..];
        self.rest = tail.strip_prefix(',').unwrap_or(tail);
        Ok(field)
    }
}

/// Encodes one CSV line into a fixed-width record image of exactly
/// `schema.record_size()` bytes.
pub fn encode_record(line: &str, schema: &Schema, out: &mut [u8]) -> Result<()> {
    debug_assert_eq!(out.len(), schema.record_size());
    let mut fields = FieldReader::new(line);
    for (index, column) in schema.columns().enumerate() {
        let slot = &mut out[schema.field_range(index)];
        match column.data_type() {
            DataType::Int => {
                let field = fields.next_plain().trim();
                let value: i64 = if field.is_empty() {
                    0
                } else {
                    field
                        .parse()
                        .map_err(|_| SpindleError::Csv(format!("`{field}` is not an integer")))?
                };
                slot.copy_from_slice(&value.to_le_bytes());
            }
            DataType::Float => {
                let field = fields.next_plain().trim();
                let value: f64 = if field.is_empty() {
                    0.0
                } else {
                    field
                        .parse()
                        .map_err(|_| SpindleError::Csv(format!("`{field}` is not a number")))?
                };
                slot.copy_from_slice(&value.to_le_bytes());
            }
            DataType::Bool => {
                // only `yes` is truthy
                slot[0] = (fields.next_plain() == "yes") as u8;
            }
            DataType::Str => {
                let field = fields.next_string()?;
                slot.copy_from_slice(StrBytes::from_str(field).as_bytes());
            }
        }
    }
    Ok(())
}
