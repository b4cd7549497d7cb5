use std::path::PathBuf;

use clap::{Parser, Subcommand};
use study_core::AggregationPolicy;
use study_core::model::{StudyMode, StudySetId};

#[derive(Parser, Debug)]
#[command(name = "study")]
#[command(about = "Turn documents into study sets and track practice progress")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// SQLite database URL or path
    #[arg(long = "db", env = "STUDY_DB_URL", default_value = "sqlite://study.sqlite3")]
    pub db_url: String,

    /// Progress aggregation policy: all-records or latest-per-mode
    #[arg(long, global = true)]
    pub policy: Option<AggregationPolicy>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a study set from a document
    Generate {
        file: PathBuf,
        /// MIME type sent with the document (guessed from the extension otherwise)
        #[arg(long)]
        mime: Option<String>,
    },
    /// List study sets, newest first
    List {
        #[arg(long, default_value_t = 50)]
        limit: u32,
    },
    /// Show the terms of a study set
    Show { set_id: StudySetId },
    /// Record a finished practice session
    Record {
        set_id: StudySetId,
        mode: StudyMode,
        score: u32,
    },
    /// Progress history, newest first
    History {
        set_id: StudySetId,
        #[arg(long)]
        mode: Option<StudyMode>,
    },
    /// Overall progress and mastered terms
    Overview { set_id: StudySetId },
    /// Check a free-text answer against the reference
    Check { submitted: String, reference: String },
}

/// MIME type for common study material extensions.
#[must_use]
pub fn guess_mime(path: &std::path::Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        _ => return None,
    };
    Some(mime)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_record_arguments() {
        let cli = Cli::try_parse_from(["study", "--db", "sqlite::memory:", "record", "7", "quiz", "4"])
            .unwrap();
        match cli.command {
            Command::Record { set_id, mode, score } => {
                assert_eq!(set_id, StudySetId::new(7));
                assert_eq!(mode, StudyMode::Quiz);
                assert_eq!(score, 4);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn policy_flag_parses() {
        let cli = Cli::try_parse_from(["study", "overview", "1", "--policy", "all-records"]).unwrap();
        assert_eq!(cli.policy, Some(AggregationPolicy::SumAllRecords));
        assert!(Cli::try_parse_from(["study", "overview", "1", "--policy", "median"]).is_err());
    }

    #[test]
    fn guesses_common_mime_types() {
        assert_eq!(guess_mime(std::path::Path::new("a/notes.PDF")), Some("application/pdf"));
        assert_eq!(guess_mime(std::path::Path::new("slides.key")), None);
    }
}
