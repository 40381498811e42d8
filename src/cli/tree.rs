//! Display a resolved BOM tree.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::common::{CliContext, TreeSourceArgs};
use crate::models::{BomNode, ItemRef};

#[derive(Args)]
pub struct TreeCommand {
    /// Item number of the root assembly
    number: String,

    #[command(flatten)]
    source: TreeSourceArgs,

    /// Print the tree as JSON
    #[arg(long)]
    json: bool,
}

impl TreeCommand {
    pub async fn execute(self, ctx: &CliContext) -> Result<()> {
        let (root, nodes) = self.source.load_tree(ctx, &self.number).await?;

        if self.json {
            let output = serde_json::json!({ "root": root, "children": nodes });
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(());
        }

        println!("{}", describe(&root).bold());
        if nodes.is_empty() {
            println!("  {}", "(no BOM lines)".dimmed());
            return Ok(());
        }
        for node in &nodes {
            print_node(node);
        }

        let total: usize = nodes.iter().map(BomNode::subtree_len).sum();
        let depth = nodes.iter().map(BomNode::max_level).max().unwrap_or(0) + 1;
        println!("\n{total} positions across {depth} levels");
        Ok(())
    }
}

fn describe(item: &ItemRef) -> String {
    if item.name.is_empty() {
        item.number.clone()
    } else {
        format!("{} ({})", item.number, item.name)
    }
}

fn print_node(node: &BomNode) {
    let indent = "  ".repeat(node.level + 1);
    let label = if node.has_children {
        describe(&node.item).cyan().to_string()
    } else {
        describe(&node.item)
    };
    let category = if node.item.category.is_empty() {
        String::new()
    } else {
        format!(" [{}]", node.item.category).dimmed().to_string()
    };
    println!("{indent}{label} ×{}{category}", node.quantity);

    for child in &node.children {
        print_node(child);
    }
}
