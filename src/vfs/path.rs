use crate::error::{ProviderError, Result};

/// Formatting flags carried through `parent`/`child` derivations.
/// They only affect how [`VirtualPath::full_path`] is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathFormat {
    /// Render the full path with a leading `/`
    pub prefix: bool,
    /// Keep the trailing `/` of directory paths in the full path
    pub suffix: bool,
}

impl Default for PathFormat {
    fn default() -> Self {
        PathFormat {
            prefix: true,
            suffix: false,
        }
    }
}

/// A client-visible path rooted at the configured base folder.
///
/// The base folder is the implicit first segment and is never matched
/// against a remote name; `segments` holds only the named components
/// below it. A directory path always renders with a trailing `/`, a file
/// path never does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualPath {
    /// Configured base path, as segments (e.g. ["projects", "shared"])
    base: Vec<String>,
    /// Path segments below the base folder (e.g. ["docs", "report.txt"])
    segments: Vec<String>,
    /// Whether this addresses a directory (trailing separator)
    is_dir: bool,
    format: PathFormat,
}

impl VirtualPath {
    /// Parse a caller-supplied path against the configured base path.
    ///
    /// The path must be absolute. Doubled separators and `.` segments are
    /// dropped; `..` is resolved lexically and rejected when it would climb
    /// above the base folder.
    pub fn new(base: &str, path: &str) -> Result<Self> {
        Self::with_format(base, path, PathFormat::default())
    }

    pub fn with_format(base: &str, path: &str, format: PathFormat) -> Result<Self> {
        if !path.starts_with('/') {
            return Err(ProviderError::InvalidPath(format!(
                "{path}: path must start with '/'"
            )));
        }

        let base_segments = split_segments(base)
            .map_err(|_| ProviderError::InvalidPath(format!("{base}: invalid base path")))?;
        let segments = split_segments(path)?;
        let is_dir = segments.is_empty()
            || path.ends_with('/')
            || path.ends_with("/.")
            || path.ends_with("/..");

        Ok(VirtualPath {
            base: base_segments,
            segments,
            is_dir,
            format,
        })
    }

    /// Path segments below the base folder
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The next name to look up while descending, if any
    pub fn next_segment(&self) -> Option<&str> {
        self.segments.first().map(|s| s.as_str())
    }

    /// Last segment, or an empty string for the base folder itself
    pub fn name(&self) -> &str {
        self.segments.last().map(|s| s.as_str()).unwrap_or("")
    }

    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    pub fn is_file(&self) -> bool {
        !self.is_dir
    }

    /// Check if this path addresses the base folder
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// True once no further folder hop is needed.
    ///
    /// A file path is a leaf when only its own name remains to be looked
    /// up; a directory path is a leaf when it addresses the current folder.
    pub fn is_leaf(&self) -> bool {
        if self.is_dir {
            self.segments.is_empty()
        } else {
            self.segments.len() == 1
        }
    }

    pub fn format(&self) -> PathFormat {
        self.format
    }

    /// All segments except the last, always as a directory path
    pub fn parent(&self) -> Self {
        let mut segments = self.segments.clone();
        segments.pop();
        VirtualPath {
            base: self.base.clone(),
            segments,
            is_dir: true,
            format: self.format,
        }
    }

    /// Everything below the first segment, preserving directory-ness.
    ///
    /// Dropping the only segment of a file path yields the base folder.
    pub fn child(&self) -> Self {
        let segments: Vec<String> = self.segments.iter().skip(1).cloned().collect();
        let is_dir = self.is_dir || segments.is_empty();
        VirtualPath {
            base: self.base.clone(),
            segments,
            is_dir,
            format: self.format,
        }
    }

    /// The same segments addressed as a file (the base folder stays a directory)
    pub fn to_file(&self) -> Self {
        VirtualPath {
            is_dir: self.segments.is_empty(),
            ..self.clone()
        }
    }

    /// Append a single remote entry name below this path
    pub fn join(&self, name: &str, is_dir: bool) -> Self {
        let mut segments = self.segments.clone();
        if !name.is_empty() {
            segments.push(name.to_string());
        }
        VirtualPath {
            base: self.base.clone(),
            is_dir: is_dir || segments.is_empty(),
            segments,
            format: self.format,
        }
    }

    /// The path including the configured base path, rendered per [`PathFormat`].
    /// Operations log it as the remote location they act on.
    pub fn full_path(&self) -> String {
        let joined = self
            .base
            .iter()
            .chain(self.segments.iter())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("/");

        let mut out = String::new();
        if self.format.prefix {
            out.push('/');
        }
        out.push_str(&joined);
        if self.is_dir && self.format.suffix && !joined.is_empty() {
            out.push('/');
        }
        out
    }
}

fn split_segments(path: &str) -> Result<Vec<String>> {
    let mut segments: Vec<String> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                if segments.pop().is_none() {
                    return Err(ProviderError::InvalidPath(format!(
                        "{path}: escapes the base folder"
                    )));
                }
            }
            _ => segments.push(segment.to_string()),
        }
    }
    Ok(segments)
}

impl std::fmt::Display for VirtualPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "/");
        }
        write!(f, "/{}", self.segments.join("/"))?;
        if self.is_dir {
            write!(f, "/")?;
        }
        Ok(())
    }
}
