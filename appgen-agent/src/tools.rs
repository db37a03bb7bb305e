//! Tools the coder agent may call, and the project directory they act on.

use std::path::{Component, Path, PathBuf};

use appgen_error::{Error, ErrorKind, Result};
use appgen_llm::{ToolCall, ToolDefinition};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};
use walkdir::WalkDir;

pub const DEFAULT_PROJECT_ROOT: &str = "generated_project";

/// File-system operations offered to the model.
///
/// Implement this trait to point the coder at something other than a local
/// directory (an in-memory tree, a remote workspace, ...).
pub trait Toolbox: Send + Sync {
    /// Content of `path`, or an empty string when the file does not exist yet
    fn read_file(&self, path: &str) -> Result<String>;

    /// Replace the content of `path`, returning an acknowledgement for the model
    fn write_file(&self, path: &str, content: &str) -> Result<String>;

    /// Every file in the project, relative to the root, sorted
    fn list_files(&self) -> Result<Vec<String>>;

    fn get_current_directory(&self) -> Result<String>;
}

impl<T: Toolbox + ?Sized> Toolbox for &T {
    fn read_file(&self, path: &str) -> Result<String> {
        (**self).read_file(path)
    }

    fn write_file(&self, path: &str, content: &str) -> Result<String> {
        (**self).write_file(path, content)
    }

    fn list_files(&self) -> Result<Vec<String>> {
        (**self).list_files()
    }

    fn get_current_directory(&self) -> Result<String> {
        (**self).get_current_directory()
    }
}

// =============================================================================
// Local directory
// =============================================================================

/// A project directory on the local file system.
///
/// Paths handed in by the model are resolved against the root; anything
/// that would land outside of it is refused with `PathOutsideRoot`.
pub struct ProjectFs {
    root: PathBuf,
}

impl ProjectFs {
    /// Root the toolbox at `root`. The directory is created on first write.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let root = if root.is_absolute() {
            root.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(|e| {
                    Error::from(e)
                        .with_operation("project_fs::new")
                        .with_context("root", root.display().to_string())
                })?
                .join(root)
        };
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ensure_root(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root).map_err(|e| {
            Error::from(e)
                .with_operation("project_fs::create_root")
                .with_context("root", self.root.display().to_string())
        })
    }

    /// Resolve `path` lexically against the root.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let candidate = Path::new(path);
        let relative = if candidate.is_absolute() {
            candidate
                .strip_prefix(&self.root)
                .map_err(|_| Error::path_outside_root(path))?
        } else {
            candidate
        };

        let mut resolved = PathBuf::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                Component::ParentDir => {
                    if !resolved.pop() {
                        return Err(Error::path_outside_root(path));
                    }
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(Error::path_outside_root(path));
                }
            }
        }

        if resolved.as_os_str().is_empty() {
            return Err(Error::invalid_argument(format!("'{}' does not name a file", path)));
        }

        Ok(self.root.join(resolved))
    }
}

impl Toolbox for ProjectFs {
    fn read_file(&self, path: &str) -> Result<String> {
        let full = self.resolve(path)?;
        match std::fs::read_to_string(&full) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(Error::from(e)
                .with_operation("project_fs::read_file")
                .with_context("path", path)),
        }
    }

    fn write_file(&self, path: &str, content: &str) -> Result<String> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::from(e)
                    .with_operation("project_fs::write_file")
                    .with_context("path", path)
            })?;
        }
        std::fs::write(&full, content).map_err(|e| {
            Error::from(e)
                .with_operation("project_fs::write_file")
                .with_context("path", path)
        })?;

        debug!(path, bytes = content.len(), "wrote file");
        Ok(format!("WROTE:{}", path))
    }

    fn list_files(&self) -> Result<Vec<String>> {
        self.ensure_root()?;

        let mut files = Vec::new();
        for entry in WalkDir::new(&self.root).follow_links(false) {
            let entry = entry.map_err(|e| {
                Error::new(ErrorKind::IoFailed, format!("failed to walk project: {}", e))
                    .with_operation("project_fs::list_files")
                    .set_source(e)
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Ok(relative) = entry.path().strip_prefix(&self.root) {
                let parts: Vec<_> = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect();
                files.push(parts.join("/"));
            }
        }

        files.sort();
        Ok(files)
    }

    fn get_current_directory(&self) -> Result<String> {
        Ok(self.root.display().to_string())
    }
}

// =============================================================================
// Tool definitions and dispatch
// =============================================================================

pub const READ_FILE: &str = "read_file";
pub const WRITE_FILE: &str = "write_file";
pub const LIST_FILES: &str = "list_files";
pub const GET_CURRENT_DIRECTORY: &str = "get_current_directory";

/// The four tools, as offered to the model.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            READ_FILE,
            "Read a file in the project. Returns an empty string if the file does not exist.",
        )
        .with_parameters(json!({
            "type": "object",
            "properties": {
                "path": {"type": "string", "description": "Path relative to the project root"}
            },
            "required": ["path"]
        })),
        ToolDefinition::new(
            WRITE_FILE,
            "Write the full content of a file in the project, creating parent directories.",
        )
        .with_parameters(json!({
            "type": "object",
            "properties": {
                "path": {"type": "string", "description": "Path relative to the project root"},
                "content": {"type": "string", "description": "Complete new content of the file"}
            },
            "required": ["path", "content"]
        })),
        ToolDefinition::new(LIST_FILES, "List every file in the project, relative to the root."),
        ToolDefinition::new(GET_CURRENT_DIRECTORY, "Return the project root directory."),
    ]
}

#[derive(Deserialize)]
struct PathArgs {
    path: String,
}

#[derive(Deserialize)]
struct WriteArgs {
    path: String,
    content: String,
}

/// Run one tool call against `toolbox`.
///
/// Never fails: errors become an `ERROR: ...` string the model can react to.
pub fn dispatch<T: Toolbox + ?Sized>(toolbox: &T, call: &ToolCall) -> String {
    debug!(tool = %call.name, id = %call.id, "tool call");

    match run_tool(toolbox, call) {
        Ok(output) => output,
        Err(err) => {
            warn!(tool = %call.name, error = %err, "tool call failed");
            format!("ERROR: {}", err.message())
        }
    }
}

fn run_tool<T: Toolbox + ?Sized>(toolbox: &T, call: &ToolCall) -> Result<String> {
    match call.name.as_str() {
        READ_FILE => {
            let args: PathArgs = parse_args(call)?;
            toolbox.read_file(&args.path)
        }
        WRITE_FILE => {
            let args: WriteArgs = parse_args(call)?;
            toolbox.write_file(&args.path, &args.content)
        }
        LIST_FILES => {
            let files = toolbox.list_files()?;
            if files.is_empty() {
                Ok("No files found.".to_string())
            } else {
                Ok(files.join("\n"))
            }
        }
        GET_CURRENT_DIRECTORY => toolbox.get_current_directory(),
        other => Err(Error::invalid_argument(format!("unknown tool '{}'", other))),
    }
}

fn parse_args<A: serde::de::DeserializeOwned>(call: &ToolCall) -> Result<A> {
    call.parse_arguments().map_err(|e| {
        Error::invalid_argument(format!("invalid arguments for {}: {}", call.name, e))
            .with_operation("tools::dispatch")
            .set_source(e)
    })
}
