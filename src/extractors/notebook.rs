//! Jupyter notebook support: code cells become one Python source

use super::ExtractError;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Notebook {
    #[serde(default)]
    cells: Option<Vec<Cell>>,
}

#[derive(Debug, Deserialize)]
struct Cell {
    cell_type: String,
    #[serde(default)]
    source: CellSource,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CellSource {
    Lines(Vec<String>),
    Text(String),
}

impl Default for CellSource {
    fn default() -> Self {
        CellSource::Text(String::new())
    }
}

impl CellSource {
    fn text(&self) -> String {
        match self {
            CellSource::Lines(lines) => lines.concat(),
            CellSource::Text(text) => text.clone(),
        }
    }
}

/// Concatenates a notebook's code cells, dropping IPython magics (`%`) and shell escapes (`!`)
pub fn notebook_source(json: &str) -> Result<String, ExtractError> {
    let notebook: Notebook =
        serde_json::from_str(json).map_err(|e| ExtractError::Notebook(e.to_string()))?;
    let cells = notebook
        .cells
        .ok_or_else(|| ExtractError::Notebook("no cells (nbformat 4 required)".to_string()))?;

    let mut source = String::new();
    for cell in cells.iter().filter(|c| c.cell_type == "code") {
        for line in cell.source.text().lines() {
            let trimmed = line.trim_start();
            if trimmed.starts_with('%') || trimmed.starts_with('!') {
                continue;
            }
            source.push_str(line);
            source.push('\n');
        }
        source.push('\n');
    }

    Ok(source)
}
