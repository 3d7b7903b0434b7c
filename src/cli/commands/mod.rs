//! CLI command implementations.

pub mod init;
pub mod skin;
pub mod transfer;
pub mod tx;
pub mod user;

use clap::Args;

use crate::domain::models::Page;

/// Shared pagination flags.
#[derive(Args, Debug, Clone, Copy)]
pub struct PageArgs {
    /// Page number, starting at 1
    #[arg(long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..))]
    pub page: u32,

    /// Rows per page
    #[arg(long, default_value = "20", value_parser = clap::value_parser!(u32).range(1..=500))]
    pub per_page: u32,
}

impl From<PageArgs> for Page {
    fn from(args: PageArgs) -> Self {
        Page::numbered(args.page, args.per_page)
    }
}
