use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{CategoryMap, ConfigError, ExportPolicy, Settings};

#[derive(Parser)]
#[command(name = "pagesort")]
#[command(about = "Split a PDF into single-page files sorted into category folders")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command that exports pages.
#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    /// JSON file mapping document types to folders (defaults to $PAGESORT_CATEGORIES,
    /// then the built-in list)
    #[arg(long)]
    pub categories: Option<PathBuf>,

    /// Keep exporting after a page fails and report all failures at the end
    #[arg(long)]
    pub best_effort: bool,

    /// Fail instead of creating missing category folders
    #[arg(long)]
    pub no_create_dirs: bool,
}

impl ExportArgs {
    pub fn settings(&self) -> Result<Settings, ConfigError> {
        Ok(Settings {
            categories: CategoryMap::resolve(self.categories.as_deref())?,
            policy: if self.best_effort {
                ExportPolicy::BestEffort
            } else {
                ExportPolicy::FailFast
            },
            create_missing_dirs: !self.no_create_dirs,
        })
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run as MCP server
    Mcp {
        #[command(flatten)]
        export: ExportArgs,
    },

    /// Display PDF metadata
    Info {
        /// PDF file to inspect
        path: PathBuf,
    },

    /// List document types and their destination folders
    Categories {
        /// JSON file mapping document types to folders
        #[arg(long)]
        categories: Option<PathBuf>,
    },

    /// Render one page to a PNG image
    Preview {
        /// PDF file to render
        path: PathBuf,

        /// Page number (1-based)
        #[arg(short, long, default_value = "1")]
        page: i64,

        /// Resolution in dots per inch
        #[arg(long, default_value_t = crate::pdf::render::DEFAULT_PREVIEW_DPI)]
        dpi: u32,

        /// Output PNG file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Print the text of one page
    Text {
        /// PDF file to read
        path: PathBuf,

        /// Page number (1-based)
        #[arg(short, long, default_value = "1")]
        page: i64,
    },

    /// Export pages as single-page PDFs according to a plan file
    #[command(alias = "split")]
    Export {
        /// PDF file to split
        path: PathBuf,

        /// Existing folder that receives one subfolder per document type
        #[arg(short, long)]
        output_dir: PathBuf,

        /// JSON plan assigning a file name and document type to each page
        #[arg(long)]
        plan: PathBuf,

        /// Export only this page (1-based)
        #[arg(short, long)]
        page: Option<i64>,

        #[command(flatten)]
        export: ExportArgs,
    },

    /// Walk through a PDF page by page, naming and sorting each one
    Session {
        /// PDF file to split
        path: PathBuf,

        /// Existing folder that receives one subfolder per document type
        #[arg(short, long)]
        output_dir: PathBuf,

        #[command(flatten)]
        export: ExportArgs,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_export() {
        let cli = Cli::parse_from([
            "pagesort",
            "export",
            "in.pdf",
            "-o",
            "out",
            "--plan",
            "plan.json",
            "--best-effort",
        ]);
        match cli.command {
            Commands::Export {
                path, page, export, ..
            } => {
                assert_eq!(path, PathBuf::from("in.pdf"));
                assert_eq!(page, None);
                assert!(export.best_effort);
                assert!(!export.no_create_dirs);
            }
            _ => panic!("expected export command"),
        }
    }

    #[test]
    fn test_export_args_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.json");
        std::fs::write(&path, r#"{"categories": [{"label": "A", "folder": "B"}]}"#).unwrap();
        let args = ExportArgs {
            categories: Some(path),
            best_effort: false,
            no_create_dirs: true,
        };
        let settings = args.settings().unwrap();
        assert_eq!(settings.policy, ExportPolicy::FailFast);
        assert!(!settings.create_missing_dirs);
        assert_eq!(settings.categories.folder_for("A"), Some("B"));
    }
}
