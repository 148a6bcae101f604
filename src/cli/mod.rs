pub mod render;

use clap::{ Parser, Subcommand };
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Query Cloudflare Workers AI models from the terminal", long_about = None)]
pub struct Args {
    // --- Cloudflare Args ---
    /// Cloudflare account id owning the Workers AI binding
    #[arg(long, env = "CLOUDFLARE_ACCOUNT_ID", default_value = "", hide_env_values = true)]
    pub account_id: String,

    /// API token sent as a bearer token on every request
    #[arg(long, env = "CLOUDFLARE_API_TOKEN", default_value = "", hide_env_values = true)]
    pub api_token: String,

    /// Model used when `ask` is given no --model (e.g., @cf/meta/llama-3.1-8b-instruct)
    #[arg(long, env = "DEFAULT_MODEL")]
    pub default_model: Option<String>,

    /// Base URL of the Cloudflare API
    #[arg(long, env = "CLOUDFLARE_BASE_URL", default_value = crate::config::DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Request timeout in seconds. 0 disables the timeout.
    #[arg(long, env = "REQUEST_TIMEOUT", default_value = "120")]
    pub request_timeout: u64,

    /// Number of most recent exchanges sent as context with a follow-up question.
    #[arg(long, env = "MAX_HISTORY_CHATS", default_value = "25")]
    pub max_history_chats: usize,

    // --- History Store Args ---
    /// History store type (file, redis, memory)
    #[arg(long, env = "HISTORY_TYPE", default_value = "file")]
    pub history_type: String,

    /// Directory for the file history store. Defaults to the platform data directory.
    #[arg(long, env = "DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// History store host endpoint for redis (e.g., redis://127.0.0.1:6379)
    #[arg(long, env = "HISTORY_HOST", default_value = "redis://127.0.0.1:6379")]
    pub history_host: String,

    /// Prefix for Redis history keys.
    #[arg(long, env = "HISTORY_REDIS_PREFIX", default_value = "workers-ai:")]
    pub history_redis_prefix: String,

    /// Enable debug logging/output
    #[arg(long, env = "DEBUG", default_value = "false")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Ask a question and start a new conversation
    Ask {
        /// Model identifier; falls back to the default model
        #[arg(short, long)]
        model: Option<String>,
        /// The prompt text
        #[arg(required = true, num_args = 1..)]
        prompt: Vec<String>,
    },
    /// Ask a follow-up question within an existing conversation
    FollowUp {
        /// Conversation id or unique id prefix
        id: String,
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
    /// List available text-generation models
    Models,
    /// List stored conversations, pinned first
    List,
    /// Print a conversation transcript
    Show {
        id: String,
        /// Print `Q:`/`A:` plain text instead of markdown
        #[arg(long)]
        plain: bool,
    },
    /// Pin or unpin a conversation
    Pin {
        id: String,
    },
    /// Delete a conversation
    Delete {
        id: String,
    },
    /// Delete every stored conversation
    Clear,
}

impl Command {
    pub fn join_words(words: &[String]) -> String {
        words.join(" ")
    }
}
