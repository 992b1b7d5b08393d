//! copy-point playground
//!
//! Loads a page, enhances its components and replays a sequence of
//! interactions against it, then prints the resulting component state.
//!
//! ```text
//! cp-playground page.html [--config components.toml] [action...]
//! cp-playground demo.html click:#menu-btn key:Escape tick:500
//! ```
//!
//! Logging is controlled with `RUST_LOG` (default `info`).

mod action;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use cp_components::{Accordion, ComponentConfig, Expand, Modal};
use cp_dom::{Document, NodeId};
use cp_html::HtmlParser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use action::Action;

const USAGE: &str = "usage: cp-playground <page.html> [--config <file.toml>] [click:<target> | key:<key> | focus:<target> | tick:<ms> | end:<target>]...";

#[derive(Debug)]
struct Args {
    page: PathBuf,
    config: Option<PathBuf>,
    actions: Vec<Action>,
}

impl Args {
    /// `None` when help was requested
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Option<Self>> {
        let mut page = None;
        let mut config = None;
        let mut actions = Vec::new();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-h" | "--help" => return Ok(None),
                "--config" => {
                    let path = args.next().context("--config needs a path")?;
                    config = Some(PathBuf::from(path));
                }
                _ if page.is_none() && !arg.contains(':') => page = Some(PathBuf::from(arg)),
                _ => actions.push(Action::parse(&arg)?),
            }
        }
        let Some(page) = page else {
            bail!("{USAGE}");
        };
        Ok(Some(Self { page, config, actions }))
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let Some(args) = Args::parse(std::env::args().skip(1))? else {
        println!("{USAGE}");
        return Ok(());
    };
    let config = match &args.config {
        Some(path) => ComponentConfig::from_toml_file(path)?,
        None => ComponentConfig::default(),
    };

    let mut doc = HtmlParser::new()
        .parse_file(&args.page)
        .with_context(|| format!("loading {}", args.page.display()))?;
    cp_components::install(&mut doc, config)?;
    doc.finish_parsing();
    doc.run_until_idle();
    info!(page = %args.page.display(), actions = args.actions.len(), "page ready");

    for action in &args.actions {
        info!(%action, "replay");
        action.run(&mut doc)?;
    }

    print_state(&doc);
    Ok(())
}

/// `#id` when the element has one, else its tag and node id
fn label(doc: &Document, node: NodeId) -> String {
    match doc.attr(node, "id") {
        Some(id) => format!("#{id}"),
        None => format!("<{}> {node}", doc.tag_name(node).unwrap_or("?")),
    }
}

fn print_state(doc: &Document) {
    let mut expands = doc.instances_of::<Expand>();
    expands.sort_by_key(|(node, _)| *node);
    for (control, expand) in expands {
        let content = expand.content().map_or_else(|| "-".to_string(), |c| label(doc, c));
        println!(
            "expand    {} -> {} expanded={} animating={}",
            label(doc, control),
            content,
            expand.is_expanded(doc),
            expand.is_animating()
        );
    }

    let mut accordions = doc.instances_of::<Accordion>();
    accordions.sort_by_key(|(node, _)| *node);
    for (container, accordion) in accordions {
        let open: Vec<String> = accordion
            .expanded_items(doc)
            .iter()
            .map(|item| label(doc, item.control()))
            .collect();
        println!(
            "accordion {} mode={:?} items={} open=[{}]",
            label(doc, container),
            accordion.mode(),
            accordion.items().len(),
            open.join(", ")
        );
    }

    let mut modals = doc.instances_of::<Modal>();
    modals.sort_by_key(|(node, _)| *node);
    for (dialog, modal) in modals {
        println!(
            "modal     {} phase={:?} state={:?} return={:?}",
            label(doc, dialog),
            modal.phase(),
            doc.dialog_state(dialog),
            doc.dialog_return_value(dialog)
        );
    }

    let focused = doc.active_element().map_or_else(|| "-".to_string(), |n| label(doc, n));
    println!("focus     {focused}");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Option<Args>> {
        Args::parse(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_args() {
        let parsed = args(&["page.html", "--config", "c.toml", "click:#a", "tick:10"])
            .unwrap()
            .unwrap();
        assert_eq!(parsed.page, PathBuf::from("page.html"));
        assert_eq!(parsed.config, Some(PathBuf::from("c.toml")));
        assert_eq!(parsed.actions.len(), 2);

        assert!(args(&[]).is_err());
        assert!(args(&["click:#a"]).is_err());
        assert!(args(&["page.html", "--config"]).is_err());
    }

    #[test]
    fn test_help_is_not_an_error() {
        assert!(args(&["--help"]).unwrap().is_none());
        assert!(args(&["page.html", "-h", "click:#a"]).unwrap().is_none());
    }
}
