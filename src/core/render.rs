//! Renderer module
//!
//! Renders a Table to different output formats: jsonl, json, md, csv

use arrow::array::Array;
use arrow::csv::Writer as CsvWriter;
use arrow::json::{ArrayWriter, LineDelimitedWriter};
use arrow::record_batch::RecordBatch;
use arrow::util::display::array_value_to_string;

use crate::core::model::Table;
use crate::error::CacherResult;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Jsonl,
    Json,
    Markdown,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jsonl" => Ok(OutputFormat::Jsonl),
            "json" => Ok(OutputFormat::Json),
            "md" | "markdown" => Ok(OutputFormat::Markdown),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

/// Renderer for tables
pub struct Renderer {
    format: OutputFormat,
}

impl Renderer {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Render a table to a string
    pub fn render(&self, table: &Table) -> CacherResult<String> {
        let batches: Vec<&RecordBatch> = table.batches().iter().collect();
        let bytes = match self.format {
            OutputFormat::Jsonl => {
                let mut writer = LineDelimitedWriter::new(Vec::new());
                writer.write_batches(&batches)?;
                writer.finish()?;
                writer.into_inner()
            }
            OutputFormat::Json => {
                let mut writer = ArrayWriter::new(Vec::new());
                writer.write_batches(&batches)?;
                writer.finish()?;
                writer.into_inner()
            }
            OutputFormat::Markdown => return self.render_markdown(table),
            OutputFormat::Csv => {
                let mut writer = CsvWriter::new(Vec::new());
                for batch in batches {
                    writer.write(batch)?;
                }
                writer.into_inner()
            }
        };

        let mut output = String::from_utf8_lossy(&bytes).to_string();
        // Keep stdout line-oriented regardless of writer
        while output.ends_with('\n') {
            output.pop();
        }
        Ok(output)
    }

    /// Render as a Markdown table under a row/column summary heading
    fn render_markdown(&self, table: &Table) -> CacherResult<String> {
        let mut output = String::new();
        output.push_str(&format!(
            "## Table ({} rows × {} columns)\n\n",
            table.num_rows(),
            table.num_columns()
        ));

        if table.num_columns() == 0 {
            output.push_str("*Empty table*");
            return Ok(output);
        }

        let names = table.column_names();
        output.push_str(&markdown_row(names.iter().map(|name| escape_cell(name))));
        output.push('\n');
        output.push_str(&markdown_row(names.iter().map(|_| "---".to_string())));

        for batch in table.batches() {
            for row in 0..batch.num_rows() {
                let mut cells = Vec::with_capacity(batch.num_columns());
                for column in batch.columns() {
                    if column.is_null(row) {
                        cells.push(String::new());
                    } else {
                        cells.push(escape_cell(&array_value_to_string(column, row)?));
                    }
                }
                output.push('\n');
                output.push_str(&markdown_row(cells));
            }
        }
        Ok(output)
    }
}

fn markdown_row(cells: impl IntoIterator<Item = String>) -> String {
    let cells: Vec<String> = cells.into_iter().collect();
    format!("| {} |", cells.join(" | "))
}

/// Pipes would split the cell; newlines would end the row
fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}
