//! Skin CLI commands.

use anyhow::Result;
use clap::{Args, Subcommand};
use uuid::Uuid;

use super::PageArgs;
use crate::cli::context::Market;
use crate::cli::output::{output, short_id, truncate, ActionOutput, CommandOutput};
use crate::cli::table::{list_table, money, render_list};
use crate::domain::models::{Config, Page, Paged, Skin};
use crate::domain::ports::SkinFilter;

#[derive(Args, Debug)]
pub struct SkinArgs {
    #[command(subcommand)]
    pub command: SkinCommands,
}

#[derive(Subcommand, Debug)]
pub enum SkinCommands {
    /// Add a skin to the inventory
    Create {
        name: String,
        price: f64,
        #[arg(long)]
        owner: Option<Uuid>,
        #[arg(short, long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        rarity: String,
        #[arg(long, default_value = "")]
        condition: String,
        /// Image URL
        #[arg(long, default_value = "")]
        image: String,
        /// Put it on the market right away
        #[arg(long)]
        listed: bool,
    },
    /// Show skin details
    Show {
        id: Uuid,
    },
    /// List every skin
    List {
        #[command(flatten)]
        page: PageArgs,
    },
    /// List skins owned by a user
    ListOwner {
        owner: Uuid,
        #[command(flatten)]
        page: PageArgs,
    },
    /// List skins currently on the market
    ListListed {
        #[command(flatten)]
        page: PageArgs,
    },
    /// Flip the market listing flag
    Toggle {
        id: Uuid,
    },
    /// Hand a skin to another user
    Give {
        id: Uuid,
        new_owner: Uuid,
    },
    /// Remove a skin from the inventory
    Delete {
        id: Uuid,
    },
}

#[derive(Debug, serde::Serialize)]
pub struct SkinOutput {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub rarity: String,
    pub condition: String,
    pub image: String,
    pub owner_id: Option<Uuid>,
    pub is_listed: bool,
}

impl From<&Skin> for SkinOutput {
    fn from(skin: &Skin) -> Self {
        Self {
            id: skin.id,
            name: skin.name.clone(),
            description: skin.description.clone(),
            price: skin.price,
            rarity: skin.rarity.clone(),
            condition: skin.condition.clone(),
            image: skin.image.clone(),
            owner_id: skin.owner_id,
            is_listed: skin.is_listed,
        }
    }
}

impl CommandOutput for SkinOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("Skin: {}", self.name),
            format!("ID: {}", self.id),
            format!("Price: {}", money(self.price)),
            format!("Listed: {}", if self.is_listed { "yes" } else { "no" }),
            format!(
                "Owner: {}",
                self.owner_id.map_or_else(|| "-".to_string(), |o| o.to_string())
            ),
        ];
        if !self.rarity.is_empty() {
            lines.push(format!("Rarity: {}", self.rarity));
        }
        if !self.condition.is_empty() {
            lines.push(format!("Condition: {}", self.condition));
        }
        if !self.description.is_empty() {
            lines.push(format!("\nDescription: {}", self.description));
        }
        lines.join("\n")
    }
}

#[derive(Debug, serde::Serialize)]
pub struct SkinListOutput {
    pub skins: Vec<SkinOutput>,
    pub total: u64,
}

impl From<&Paged<Skin>> for SkinListOutput {
    fn from(page: &Paged<Skin>) -> Self {
        Self {
            skins: page.items.iter().map(SkinOutput::from).collect(),
            total: page.total_count,
        }
    }
}

impl CommandOutput for SkinListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "name", "price", "rarity", "owner", "listed"]);
        for skin in &self.skins {
            table.add_row(vec![
                short_id(&skin.id),
                truncate(&skin.name, 32),
                money(skin.price),
                skin.rarity.clone(),
                skin.owner_id.as_ref().map(short_id).unwrap_or_default(),
                if skin.is_listed { "yes".to_string() } else { String::new() },
            ]);
        }
        render_list("skin", &table, self.skins.len(), self.total)
    }
}

pub async fn execute(args: SkinArgs, config: Config, json_mode: bool) -> Result<()> {
    let market = Market::open(config).await?;
    let ctx = market.request();
    let inventory = &market.inventory;

    match args.command {
        SkinCommands::Create {
            name,
            price,
            owner,
            description,
            rarity,
            condition,
            image,
            listed,
        } => {
            let mut skin = Skin::new(name, price)
                .with_description(description)
                .with_rarity(rarity)
                .with_condition(condition)
                .with_image(image)
                .listed(listed);
            if let Some(owner) = owner {
                skin = skin.with_owner(owner);
            }
            let skin = inventory.create_skin(&ctx, skin).await?;
            output(&SkinOutput::from(&skin), json_mode);
        }
        SkinCommands::Show { id } => {
            let skin = inventory.get_skin(&ctx, id).await?;
            output(&SkinOutput::from(&skin), json_mode);
        }
        SkinCommands::List { page } => {
            let listed = inventory
                .list_skins(&ctx, SkinFilter::default(), Page::from(page))
                .await?;
            output(&SkinListOutput::from(&listed), json_mode);
        }
        SkinCommands::ListOwner { owner, page } => {
            let listed = inventory.list_by_owner(&ctx, owner, Page::from(page)).await?;
            output(&SkinListOutput::from(&listed), json_mode);
        }
        SkinCommands::ListListed { page } => {
            let listed = inventory.list_listed(&ctx, Page::from(page)).await?;
            output(&SkinListOutput::from(&listed), json_mode);
        }
        SkinCommands::Toggle { id } => {
            let current = inventory.get_skin(&ctx, id).await?;
            let skin = inventory.set_listing(&ctx, id, !current.is_listed).await?;
            output(&SkinOutput::from(&skin), json_mode);
        }
        SkinCommands::Give { id, new_owner } => {
            let skin = inventory.transfer_ownership(&ctx, id, new_owner).await?;
            output(&SkinOutput::from(&skin), json_mode);
        }
        SkinCommands::Delete { id } => {
            inventory.delete_skin(&ctx, id).await?;
            output(&ActionOutput::ok(format!("Skin {id} deleted")), json_mode);
        }
    }

    Ok(())
}
