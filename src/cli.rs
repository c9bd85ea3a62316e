use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::EntityOp;
use crate::models::{EntityId, EntityKind};

#[derive(Parser)]
#[command(name = "studyadmin")]
#[command(about = "Administer studies, database releases, packages, text elements, acronyms, backups and users")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List every record of an entity type
    List {
        /// Entity type (studies, database-releases, packages, text-elements, acronyms, backups, users)
        kind: EntityKind,

        /// Print raw JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show one record as JSON
    Get {
        kind: EntityKind,
        id: String,
    },

    /// Create a record from name=value fields
    Create {
        kind: EntityKind,

        /// Field value, e.g. --field study_label=ABC-001 (repeatable)
        #[arg(short, long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },

    /// Change fields of an existing record
    Update {
        kind: EntityKind,
        id: String,

        /// Field value, e.g. --field description=Updated (repeatable)
        #[arg(short, long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },

    /// Delete a record after checking what depends on it
    Delete {
        kind: EntityKind,
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Create packages from the "Package Name" column of an Excel workbook
    Import {
        /// Path to an .xlsx or .xls file
        file: PathBuf,
    },

    /// Print live update events as they arrive
    Listen {
        /// Push endpoint (defaults to STUDYADMIN_PUSH_URL or {api}/api/v1/events)
        #[arg(long)]
        url: Option<String>,
    },

    /// Launch the interactive dashboard (default)
    Tui,
}

impl Commands {
    /// The entity type and operation for CRUD subcommands
    pub fn entity_op(&self) -> Option<(EntityKind, EntityOp)> {
        let op = match self {
            Commands::List { kind, json } => (*kind, EntityOp::List { json: *json }),
            Commands::Get { kind, id } => (*kind, EntityOp::Get { id: EntityId::new(id.as_str()) }),
            Commands::Create { kind, fields } => (*kind, EntityOp::Create { fields: fields.clone() }),
            Commands::Update { kind, id, fields } => (
                *kind,
                EntityOp::Update {
                    id: EntityId::new(id.as_str()),
                    fields: fields.clone(),
                },
            ),
            Commands::Delete { kind, id, yes } => (
                *kind,
                EntityOp::Delete {
                    id: EntityId::new(id.as_str()),
                    yes: *yes,
                },
            ),
            Commands::Import { .. } | Commands::Listen { .. } | Commands::Tui => return None,
        };
        Some(op)
    }
}

/// Parse `name=value`; the value may itself contain `=`
pub fn parse_field(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => Ok((name.trim().to_string(), value.to_string())),
        _ => Err(format!("Expected name=value, got '{}'", s)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_field() {
        assert_eq!(
            parse_field("value=a=b").unwrap(),
            ("value".to_string(), "a=b".to_string())
        );
        assert_eq!(parse_field(" key =").unwrap(), ("key".to_string(), String::new()));
        assert!(parse_field("novalue").is_err());
        assert!(parse_field("=x").is_err());
    }

    #[test]
    fn test_create_command_parses() {
        let cli = Cli::try_parse_from([
            "studyadmin",
            "create",
            "study",
            "--field",
            "study_label=ABC-001",
        ])
        .unwrap();
        match cli.command.and_then(|c| c.entity_op()) {
            Some((EntityKind::Study, EntityOp::Create { fields })) => {
                assert_eq!(fields, vec![("study_label".to_string(), "ABC-001".to_string())]);
            }
            _ => panic!("expected a study create"),
        }
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        assert!(Cli::try_parse_from(["studyadmin", "list", "widgets"]).is_err());
    }

    #[test]
    fn test_no_subcommand_means_dashboard() {
        let cli = Cli::try_parse_from(["studyadmin"]).unwrap();
        assert!(cli.command.is_none());
    }
}
