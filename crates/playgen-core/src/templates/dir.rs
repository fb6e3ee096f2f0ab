//! Resolution of on-disk template override directories

use std::io;
use std::path::{Path, PathBuf};

/// An override directory for one backend's templates
#[derive(Debug, Clone)]
pub struct TemplateDir {
    /// Root directory containing one folder per backend
    root_dir: PathBuf,
    /// root_dir/<backend template folder>
    template_path: PathBuf,
}

impl TemplateDir {
    pub fn new(root_dir: PathBuf, template_path: PathBuf) -> Self {
        Self {
            root_dir,
            template_path,
        }
    }

    pub fn display(&self) -> std::path::Display<'_> {
        self.template_path.display()
    }

    /// Resolve an explicitly requested directory.
    ///
    /// `dir` may point at the backend folder itself or at its parent.
    pub fn explicit(folder: &str, dir: &Path) -> io::Result<Self> {
        if !dir.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("Template directory not found: {}", dir.display()),
            ));
        }

        if dir.file_name().and_then(|name| name.to_str()) == Some(folder) {
            let root = dir.parent().unwrap_or(dir).to_path_buf();
            return Ok(Self::new(root, dir.to_path_buf()));
        }

        let template_path = dir.join(folder);
        if template_path.is_dir() {
            Ok(Self::new(dir.to_path_buf(), template_path))
        } else {
            // A flat directory of overrides
            Ok(Self::new(dir.to_path_buf(), dir.to_path_buf()))
        }
    }

    /// Look for overrides in the standard locations. `None` means only the
    /// built-in templates are used.
    pub fn discover(folder: &str) -> Option<Self> {
        Self::candidate_roots()
            .into_iter()
            .map(|root| (root.join(folder), root))
            .find(|(path, _)| path.is_dir())
            .map(|(path, root)| {
                log::debug!("Using template overrides from {}", path.display());
                Self::new(root, path)
            })
    }

    /// Folders that may hold one sub-folder per backend
    fn candidate_roots() -> Vec<PathBuf> {
        let mut roots = Vec::new();

        // 1. Environment variable
        if let Ok(dir) = std::env::var("PLAYGEN_TEMPLATE_DIR") {
            roots.push(PathBuf::from(dir));
        }

        // 2. Current directory
        roots.push(PathBuf::from("templates"));

        // 3. The user's home directory
        if let Some(home_dir) = dirs::home_dir() {
            roots.push(home_dir.join(".playgen").join("templates"));
        }

        roots
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn template_path(&self) -> &Path {
        &self.template_path
    }

    pub fn exists(&self) -> bool {
        self.template_path.exists()
    }
}
