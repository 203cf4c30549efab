use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::domain::{ports::DocumentLoader, Document, DomainError};

/// Loads every `*.pdf` directly inside a directory, one document per page.
pub struct PdfDirectoryLoader {
    dir: PathBuf,
}

impl PdfDirectoryLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// PDF files sorted by file name.
    pub fn discover(&self) -> Result<Vec<PathBuf>, DomainError> {
        if !self.dir.is_dir() {
            return Err(DomainError::load(format!(
                "{} is not a readable directory",
                self.dir.display()
            )));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&self.dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| DomainError::load(e.to_string()))?;
            let path = entry.path();
            if path.is_file() && is_pdf(path) {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }

    fn load_file(path: &Path) -> Result<Vec<Document>, DomainError> {
        let pdf = lopdf::Document::load(path)
            .map_err(|e| DomainError::load(format!("{}: {e}", path.display())))?;
        let source = path.display().to_string();

        let mut pages = Vec::new();
        for &number in pdf.get_pages().keys() {
            let text = match pdf.extract_text(&[number]) {
                Ok(text) => text,
                Err(e) => {
                    warn!(source = %source, page = number, error = %e, "page has no extractable text");
                    String::new()
                }
            };
            pages.push(Document::new(text, &source).with_page(number));
        }
        Ok(pages)
    }
}

impl DocumentLoader for PdfDirectoryLoader {
    fn load(&self) -> Result<Vec<Document>, DomainError> {
        let files = self.discover()?;
        info!(dir = %self.dir.display(), files = files.len(), "loading PDF files");

        let mut documents = Vec::new();
        for file in &files {
            let pages = Self::load_file(file)?;
            debug!(file = %file.display(), pages = pages.len(), "PDF loaded");
            documents.extend(pages);
        }
        Ok(documents)
    }
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}
