mod pdf;

pub use pdf::PdfDirectoryLoader;
