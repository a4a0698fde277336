use std::path::PathBuf;

use clap::{Parser, Subcommand};

use dashboard_client::{NotificationFilters, NotificationStatus, NotificationType};

#[derive(Parser, Debug)]
#[command(name = "dashboard-notify")]
#[command(about = "Customer dashboard notifications from the terminal")]
#[command(version)]
pub struct Cli {
    /// Configuration file (default: config/default.toml and DASHBOARD__* variables)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Show one page of notifications
    List {
        /// Page number
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// Only `read` or `unread` notifications
        #[arg(long)]
        status: Option<NotificationStatus>,
        /// Only notifications of this type, e.g. `order_completed`
        #[arg(long = "type")]
        notification_type: Option<NotificationType>,
        /// Text to look for in titles and messages
        #[arg(long)]
        search: Option<String>,
    },
    /// Keep the center and the bell refreshed until interrupted
    Watch,
    /// Mark a notification read
    Read { id: String },
    /// Mark every notification read
    ReadAll,
    /// Delete notifications
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
    /// Ask the backend for a test notification
    Test,
}

impl Command {
    /// Filters given to `list`, if this is `list`.
    pub fn filters(&self) -> Option<NotificationFilters> {
        match self {
            Self::List {
                status,
                notification_type,
                search,
                ..
            } => Some(
                NotificationFilters {
                    status: *status,
                    notification_type: *notification_type,
                    search: search.clone(),
                }
                .normalized(),
            ),
            _ => None,
        }
    }
}
