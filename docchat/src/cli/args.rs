//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Docchat - upload a PDF and hold a cited conversation about it
#[derive(Parser, Debug)]
#[command(name = "docchat")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Document to open when no subcommand is given (starts a chat)
    pub file: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload a PDF and chat about it interactively
    Chat {
        /// Path to the PDF document
        file: PathBuf,
    },

    /// Upload a PDF, ask a single question, print the cited answer
    Ask {
        /// Path to the PDF document
        file: PathBuf,

        /// Question to ask about the document
        #[arg(trailing_var_arg = true)]
        question: Vec<String>,
    },

    /// Show metadata for an existing session
    Info {
        /// Session ID to inspect
        session_id: String,
    },

    /// Delete a session server-side
    Close {
        /// Session ID to delete
        session_id: String,
    },

    /// Log in to the assist backend and store the access token
    Login {
        username: String,
        password: String,
    },

    /// Create an assist account (logs in afterwards)
    Register {
        username: String,
        password: String,
    },

    /// Forget stored credentials
    Logout,

    /// Assist micro tools (login required)
    Assist {
        #[command(subcommand)]
        tool: AssistTool,
    },
}

/// Login-gated assist tools
#[derive(Subcommand, Debug)]
pub enum AssistTool {
    /// Ask the assist model a question
    Chat {
        /// Tailor replies to a condition
        #[arg(short, long, value_enum, default_value_t = ConditionContext::General)]
        context: ConditionContext,

        /// Question to ask
        #[arg(trailing_var_arg = true)]
        query: Vec<String>,
    },

    /// Break a task into small actionable steps
    Breakdown {
        /// Task to break down
        #[arg(trailing_var_arg = true)]
        task: Vec<String>,
    },

    /// Rewrite text for readability
    Simplify {
        /// Text to simplify
        #[arg(trailing_var_arg = true)]
        text: Vec<String>,
    },

    /// Estimate how long a task realistically takes
    Estimate {
        /// Task to estimate
        #[arg(trailing_var_arg = true)]
        task: Vec<String>,
    },
}

/// Condition contexts understood by the assist backend
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ConditionContext {
    General,
    Adhd,
    Dyslexia,
    Autism,
}

impl ConditionContext {
    /// Wire value for the `condition_context` field.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Adhd => "adhd",
            Self::Dyslexia => "dyslexia",
            Self::Autism => "autism",
        }
    }
}

impl std::fmt::Display for ConditionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
