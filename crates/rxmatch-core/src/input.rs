//! Treatment-name input files.
//!
//! `.csv` files are read as tables: the `Treatment Name` column, else
//! `treatment`, else the first column. Anything else is a newline-delimited
//! list. Blank entries are skipped and names are de-duplicated
//! case-insensitively, keeping the first spelling.

use std::collections::HashSet;
use std::io::Read;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

/// Preferred name columns, in order.
pub const NAME_COLUMNS: &[&str] = &["Treatment Name", "treatment"];

/// Input errors.
#[derive(Error, Debug)]
pub enum InputError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type InputResult<T> = Result<T, InputError>;

/// Load, clean and de-duplicate treatment names from a file.
pub fn load_treatment_names<P: AsRef<Path>>(path: P) -> InputResult<Vec<String>> {
    let path = path.as_ref();
    let io_err = |source| InputError::Io {
        path: path.to_path_buf(),
        source,
    };

    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));

    let raw = if is_csv {
        read_csv_names(std::fs::File::open(path).map_err(io_err)?)?
    } else {
        read_list_names(&std::fs::read_to_string(path).map_err(io_err)?)
    };

    let names = dedupe_names(raw);
    info!(path = %path.display(), names = names.len(), "loaded treatment names");
    Ok(names)
}

/// Names from a CSV table.
pub fn read_csv_names<R: Read>(reader: R) -> InputResult<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let column = NAME_COLUMNS
        .iter()
        .find_map(|name| headers.iter().position(|h| h == *name))
        .unwrap_or(0);

    let mut names = Vec::new();
    for record in reader.records() {
        if let Some(value) = record?.get(column) {
            names.push(value.to_string());
        }
    }
    Ok(names)
}

/// Names from a newline-delimited list.
pub fn read_list_names(content: &str) -> Vec<String> {
    content.lines().map(str::to_string).collect()
}

/// Trim, drop blanks and drop case-insensitive repeats, preserving order.
pub fn dedupe_names<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    names
        .into_iter()
        .filter_map(|name| {
            let trimmed = name.as_ref().trim();
            (!trimmed.is_empty() && seen.insert(trimmed.to_lowercase())).then(|| trimmed.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedupe_case_insensitive() {
        let names = dedupe_names(["Tylenol", " tylenol ", "", "Advil", "TYLENOL", "advil 200mg"]);
        assert_eq!(names, vec!["Tylenol", "Advil", "advil 200mg"]);
    }

    #[test]
    fn test_csv_prefers_named_column() {
        let csv = "id,Treatment Name,notes\n1,Metformin,x\n2,Ozempic,y\n";
        assert_eq!(read_csv_names(csv.as_bytes()).unwrap(), vec!["Metformin", "Ozempic"]);
    }

    #[test]
    fn test_csv_falls_back_to_first_column() {
        let csv = "name,count\nMagnesium,3\n";
        assert_eq!(read_csv_names(csv.as_bytes()).unwrap(), vec!["Magnesium"]);
    }

    #[test]
    fn test_load_from_files() {
        let dir = tempfile::tempdir().unwrap();

        let list = dir.path().join("names.txt");
        std::fs::write(&list, "Zinc\n\nzinc\nVitamin D3\n").unwrap();
        assert_eq!(load_treatment_names(&list).unwrap(), vec!["Zinc", "Vitamin D3"]);

        let table = dir.path().join("names.CSV");
        std::fs::write(&table, "treatment,n\n\"Acetaminophen (Tylenol)\",1\nNAC,2\n").unwrap();
        assert_eq!(
            load_treatment_names(&table).unwrap(),
            vec!["Acetaminophen (Tylenol)", "NAC"]
        );
    }

    #[test]
    fn test_missing_file() {
        let err = load_treatment_names("/no/such/names.txt").unwrap_err();
        assert!(matches!(err, InputError::Io { .. }));
    }
}
