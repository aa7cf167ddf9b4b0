//! `converge kinds`: browse the kind catalog

use anyhow::{Result, bail};
use colored::Colorize;
use reconcile::ParamSpec;
use serde_json::Value;

use crate::Context;
use crate::catalog::{Catalog, CatalogEntry};
use crate::cli::KindsCommand;
use crate::config::Config;
use crate::ui;

pub fn run(ctx: &Context, command: Option<KindsCommand>) -> Result<()> {
    let config = Config::load(ctx.config_path.as_deref())?;
    config.validate()?;
    let catalog = config.catalog();

    match command.unwrap_or(KindsCommand::List) {
        KindsCommand::List => list(ctx, &catalog),
        KindsCommand::Show { kind } => show(ctx, &catalog, &kind),
    }
}

fn list(ctx: &Context, catalog: &Catalog) -> Result<()> {
    if ctx.json() {
        let entries: Vec<&CatalogEntry> = catalog.iter().collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    ui::header(&format!("Kinds ({})", catalog.names().len()));
    for entry in catalog.iter() {
        println!(
            "  {:<20} {:<28} {}",
            entry.name().bold(),
            entry.kind.description,
            format!("tier {} · api {}", entry.kind.tier, entry.api_version).dimmed()
        );
    }
    println!();
    Ok(())
}

fn show(ctx: &Context, catalog: &Catalog, name: &str) -> Result<()> {
    let Some(entry) = catalog.get(name) else {
        bail!(
            "Unknown kind '{name}' (known: {})",
            catalog.names().join(", ")
        );
    };

    if ctx.json() {
        println!("{}", serde_json::to_string_pretty(entry)?);
        return Ok(());
    }

    let kind = &entry.kind;
    ui::header(entry.name());
    if !kind.description.is_empty() {
        ui::dim(&kind.description);
    }
    ui::kv("path", &entry.path);
    ui::kv("api-version", &entry.api_version);
    ui::kv("identity", &kind.identity.join(" / "));
    ui::kv("tier", &kind.tier.to_string());

    ui::section("Parameters");
    for (param, spec) in &kind.args.params {
        let target = if kind.identity.contains(param) {
            "identity".to_string()
        } else if kind.controls.contains(param) {
            "control".to_string()
        } else {
            format!("→ {}", kind.path_for(param))
        };
        println!(
            "  {:<24} {:<10} {}",
            param.bold(),
            param_type(spec),
            target.dimmed()
        );
        for line in param_notes(spec) {
            ui::dim(&format!("  {line}"));
        }
    }

    if !kind.rules.is_empty() {
        ui::section("Compare rules");
        for (path, rule) in kind.rules.iter() {
            let create_only = if rule.create_only { " (create only)" } else { "" };
            println!("  {:<40} {}{}", path.to_string(), rule.compare.name(), create_only.yellow());
        }
    }

    let args = &kind.args;
    let groups = [
        ("mutually exclusive", &args.mutually_exclusive),
        ("required together", &args.required_together),
        ("one required of", &args.required_one_of),
    ];
    if groups.iter().any(|(_, g)| !g.is_empty()) || !args.required_if.is_empty() {
        ui::section("Constraints");
        for (label, sets) in groups {
            for set in sets {
                println!("  {label}: {}", set.join(", "));
            }
        }
        for rule in &args.required_if {
            let joiner = if rule.any { " or " } else { ", " };
            println!(
                "  {} = {} requires {}",
                rule.param,
                rule.value,
                rule.requires.join(joiner)
            );
        }
    }

    if let Some(returns) = &kind.returns {
        ui::section("Returns");
        let paths: Vec<String> = returns.iter().map(ToString::to_string).collect();
        println!("  {}", paths.join(", "));
    }
    println!();
    Ok(())
}

fn param_type(spec: &ParamSpec) -> String {
    match spec.elements {
        Some(elements) => format!("{}[{}]", spec.kind.as_str(), elements.as_str()),
        None => spec.kind.as_str().to_string(),
    }
}

/// Secondary facts about a parameter, one per line
fn param_notes(spec: &ParamSpec) -> Vec<String> {
    let mut notes = Vec::new();
    if !spec.description.is_empty() {
        notes.push(spec.description.clone());
    }
    if spec.required {
        notes.push("required".to_string());
    }
    if let Some(default) = &spec.default {
        notes.push(format!("default: {default}"));
    }
    if !spec.choices.is_empty() {
        let choices: Vec<String> = spec
            .choices
            .iter()
            .map(|c| match c {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect();
        notes.push(format!("choices: {}", choices.join(", ")));
    }
    if !spec.aliases.is_empty() {
        notes.push(format!("aliases: {}", spec.aliases.join(", ")));
    }
    if spec.no_log {
        notes.push("secret; never shown".to_string());
    }
    notes
}

#[cfg(test)]
mod tests {
    use super::*;
    use reconcile::ParamType;

    #[test]
    fn test_param_type() {
        assert_eq!(param_type(&ParamSpec::int()), "int");
        assert_eq!(param_type(&ParamSpec::list(ParamType::Str)), "list[str]");
    }

    #[test]
    fn test_param_notes() {
        let spec = ParamSpec::str()
            .choices(["Empty", "Import"])
            .alias("mode")
            .describe("How the disk is created");
        assert_eq!(
            param_notes(&spec),
            vec![
                "How the disk is created".to_string(),
                "choices: Empty, Import".to_string(),
                "aliases: mode".to_string(),
            ]
        );
    }

    #[test]
    fn test_postgres_password_is_secret() {
        let catalog = Catalog::builtin();
        let entry = catalog.get("postgresql_server").unwrap();
        let notes = param_notes(&entry.kind.args.params["admin_password"]);
        assert!(notes.contains(&"secret; never shown".to_string()));
    }
}
