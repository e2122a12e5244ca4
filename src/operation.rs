use std::time::Duration;

use anyhow::{Result, bail};
use tracing::{info, warn};

use crate::backup::BackupSettings;
use crate::cli::{
    BackupArgs, BoundaryModeArg, Commands, DeletePagesArgs, ExtractArgs, MatchPolicyArg,
};
use crate::commands::delete::{self, DeleteSettings};
use crate::commands::delete_pages::{self, DeletePagesSettings, PageSelection};
use crate::commands::extract::{self, ExtractRangeSettings, ExtractSettings};
use crate::commands::extract_index::{self, ExtractIndexSettings};
use crate::commands::undo::{self, UndoSettings};
use crate::model::RetentionPolicy;
use crate::segment::{BoundaryMode, MatchPolicy, SegmentSettings};
use crate::tools::CommandLineTools;

const TEXT_TOOLS: &[&str] = &["pdfinfo", "pdftotext"];
const ALL_TOOLS: &[&str] = &["pdfinfo", "pdftotext", "pdftk"];

/// One requested unit of work with its fully resolved settings.
#[derive(Debug, Clone)]
pub enum Operation {
    Extract(ExtractSettings),
    ExtractRange(ExtractRangeSettings),
    ExtractIndex(ExtractIndexSettings),
    Delete(DeleteSettings),
    DeletePages(DeletePagesSettings),
    Undo(UndoSettings),
}

impl Operation {
    pub fn from_command(command: Commands) -> Result<Self> {
        Ok(match command {
            Commands::Extract(args) => extract_operation(args),
            Commands::ExtractIndex(args) => Self::ExtractIndex(ExtractIndexSettings {
                file: args.file,
                output_dir: args.output_path,
                tool_timeout: Duration::from_secs(args.tools.tool_timeout_secs),
            }),
            Commands::Delete(args) => Self::Delete(DeleteSettings {
                file: args.file,
                backup: backup_settings(args.backup),
            }),
            Commands::DeletePages(args) => Self::DeletePages(delete_pages_settings(args)?),
            Commands::Undo(args) => Self::Undo(UndoSettings {
                file: args.file,
                backup_root: args.backup_path,
            }),
        })
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Extract(_) => "extract articles by title",
            Self::ExtractRange(_) => "extract explicit page range",
            Self::ExtractIndex(_) => "extract contents index",
            Self::Delete(_) => "delete file with backup",
            Self::DeletePages(_) => "delete pages",
            Self::Undo(_) => "restore latest backup",
        }
    }
}

pub fn execute(operation: Operation) -> Result<()> {
    let description = operation.description();
    info!(operation = description, "running operation");

    match &operation {
        Operation::Extract(settings) => {
            let tools = CommandLineTools::new(settings.tool_timeout);
            tools.ensure_available(ALL_TOOLS)?;
            extract::run(settings, &tools)?;
        }
        Operation::ExtractRange(settings) => {
            let tools = CommandLineTools::new(settings.tool_timeout);
            tools.ensure_available(ALL_TOOLS)?;
            extract::run_range(settings, &tools)?;
        }
        Operation::ExtractIndex(settings) => {
            let tools = CommandLineTools::new(settings.tool_timeout);
            tools.ensure_available(TEXT_TOOLS)?;
            extract_index::run(settings, &tools)?;
        }
        Operation::Delete(settings) => {
            delete::run(settings)?;
        }
        Operation::DeletePages(settings) => {
            let tools = CommandLineTools::new(settings.tool_timeout);
            tools.ensure_available(ALL_TOOLS)?;
            delete_pages::run(settings, &tools)?;
        }
        Operation::Undo(settings) => {
            undo::run(settings)?;
        }
    }

    info!(operation = description, "operation completed");
    Ok(())
}

fn extract_operation(args: ExtractArgs) -> Operation {
    let tool_timeout = Duration::from_secs(args.tools.tool_timeout_secs);

    if args.from.is_some() || args.to.is_some() {
        if args.ends_with.is_some() {
            warn!("--ends-with is ignored when --from/--to select the pages");
        }
        return Operation::ExtractRange(ExtractRangeSettings {
            file: args.file,
            output_dir: args.output_path,
            from: args.from,
            to: args.to,
            title: args.article_title.unwrap_or_default(),
            tool_timeout,
        });
    }

    Operation::Extract(ExtractSettings {
        file: args.file,
        output_dir: args.output_path,
        config_path: args.config_path,
        segment: SegmentSettings {
            threshold: args.threshold,
            match_policy: match args.match_policy {
                MatchPolicyArg::Prefix => MatchPolicy::Prefix,
                MatchPolicyArg::Substring => MatchPolicy::Substring,
            },
            boundary_mode: match args.boundary_mode {
                BoundaryModeArg::Strict => BoundaryMode::Strict,
                BoundaryModeArg::BestEffort => BoundaryMode::BestEffort,
            },
            ends_with: args.ends_with.filter(|text| !text.trim().is_empty()),
        },
        tool_timeout,
    })
}

fn backup_settings(args: BackupArgs) -> BackupSettings {
    BackupSettings {
        backup_root: args.backup_path,
        policy: RetentionPolicy {
            total_capacity: args.backup_capacity,
        },
    }
}

fn delete_pages_settings(args: DeletePagesArgs) -> Result<DeletePagesSettings> {
    let selection = match (args.at, args.from, args.starts_with) {
        (Some(page), None, None) => PageSelection::At(page),
        (None, Some(from), None) => PageSelection::Range { from, to: args.to },
        (None, None, Some(text)) => PageSelection::StartsWith { text, to: args.to },
        (None, None, None) => bail!("specify one of --at, --from, or --starts-with"),
        _ => bail!("--at, --from, and --starts-with are mutually exclusive"),
    };

    Ok(DeletePagesSettings {
        file: args.file,
        selection,
        backup: (!args.no_backup).then(|| backup_settings(args.backup)),
        tool_timeout: Duration::from_secs(args.tools.tool_timeout_secs),
    })
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::Cli;

    fn parse(args: &[&str]) -> Result<Operation> {
        let cli = Cli::try_parse_from(args)?;
        Operation::from_command(cli.command)
    }

    #[test]
    fn extract_defaults_to_title_matching() {
        let operation = parse(&["pdfsplit", "extract", "--file", "issue.pdf"]).expect("parse");
        let Operation::Extract(settings) = operation else {
            panic!("expected extract operation");
        };
        assert_eq!(settings.segment, SegmentSettings::default());
        assert_eq!(settings.tool_timeout, Duration::from_secs(60));
    }

    #[test]
    fn extract_with_page_bounds_becomes_range_extraction() {
        let operation = parse(&[
            "pdfsplit",
            "extract",
            "--file",
            "issue.pdf",
            "--from",
            "3",
            "--article-title",
            "Guest Editorial",
        ])
        .expect("parse");

        assert_eq!(operation.description(), "extract explicit page range");
        let Operation::ExtractRange(settings) = operation else {
            panic!("expected range operation");
        };
        assert_eq!(settings.from, Some(3));
        assert_eq!(settings.to, None);
    }

    #[test]
    fn extract_page_bounds_require_a_title() {
        assert!(parse(&["pdfsplit", "extract", "--file", "issue.pdf", "--to", "4"]).is_err());
    }

    #[test]
    fn delete_pages_requires_exactly_one_selector() {
        assert!(parse(&["pdfsplit", "delete-pages", "--file", "a.pdf"]).is_err());
        assert!(parse(&["pdfsplit", "delete-pages", "--file", "a.pdf", "--at", "2", "--from", "3"]).is_err());

        let operation = parse(&[
            "pdfsplit",
            "delete-pages",
            "--file",
            "a.pdf",
            "--starts-with",
            "Advertisement",
            "--no-backup",
        ])
        .expect("parse");
        let Operation::DeletePages(settings) = operation else {
            panic!("expected delete-pages operation");
        };
        assert_eq!(
            settings.selection,
            PageSelection::StartsWith {
                text: "Advertisement".to_string(),
                to: None,
            }
        );
        assert!(settings.backup.is_none());
    }

    #[test]
    fn every_operation_has_a_description() {
        let operations = [
            parse(&["pdfsplit", "extract-index", "--file", "a.pdf"]),
            parse(&["pdfsplit", "delete", "--file", "a.pdf", "--backup-capacity", "5"]),
            parse(&["pdfsplit", "undo", "--file", "a.pdf"]),
        ];
        for operation in operations {
            let operation = operation.expect("parse");
            assert!(!operation.description().is_empty());
        }
    }
}
