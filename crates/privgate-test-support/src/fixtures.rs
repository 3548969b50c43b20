//! Temporary directories for storage and templates.

use std::io;
use std::path::Path;

use tempfile::TempDir;

/// Shipped result page template.
pub const RESULT_TEMPLATE_HTML: &str = include_str!("../../../web/result.html");
/// Shipped upload form template.
pub const INDEX_TEMPLATE_HTML: &str = include_str!("../../../web/index.html");

/// Empty storage root removed on drop.
#[derive(Debug)]
pub struct StorageFixture {
    dir: TempDir,
}

impl StorageFixture {
    /// Create an empty storage directory.
    ///
    /// # Errors
    ///
    /// Returns the IO error if the directory cannot be created.
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            dir: TempDir::new()?,
        })
    }

    /// Directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

/// Template directory seeded with the shipped templates, removed on drop.
#[derive(Debug)]
pub struct TemplateFixture {
    dir: TempDir,
}

impl TemplateFixture {
    /// Template directory holding `result.html` and `index.html`.
    ///
    /// # Errors
    ///
    /// Returns the IO error if the directory or files cannot be written.
    pub fn standard() -> io::Result<Self> {
        let fixture = Self {
            dir: TempDir::new()?,
        };
        fixture.write("result.html", RESULT_TEMPLATE_HTML)?;
        fixture.write("index.html", INDEX_TEMPLATE_HTML)?;
        Ok(fixture)
    }

    /// Directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Replace (or create) template `name`.
    ///
    /// # Errors
    ///
    /// Returns the IO error if the file cannot be written.
    pub fn write(&self, name: &str, contents: &str) -> io::Result<()> {
        std::fs::write(self.dir.path().join(name), contents)
    }
}
