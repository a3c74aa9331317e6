use anyhow::{Context as _, Result};
use colored::Colorize;
use serde_json::json;

use arbor_config::Bootstrapped;
use arbor_policy::{Policy, RecordLevel, ResourceLevel, RuleLevel, Rules};

use crate::cli::{OutputFormat, PolicyArgs, RuleLevelArg, RulesArgs};
use crate::output::{print_json, print_table, print_warning};

pub fn rules(booted: &Bootstrapped, args: &RulesArgs, format: OutputFormat) -> Result<()> {
    match args.level {
        RuleLevelArg::Resource => show_rules::<ResourceLevel>(booted, args, format),
        RuleLevelArg::Record => show_rules::<RecordLevel>(booted, args, format),
    }
}

fn show_rules<L: RuleLevel>(
    booted: &Bootstrapped,
    args: &RulesArgs,
    format: OutputFormat,
) -> Result<()> {
    let resource = booted
        .catalog
        .get(&args.resource)
        .with_context(|| format!("Unknown resource: {}", args.resource))?;
    let resource_type = args
        .resource_type
        .as_deref()
        .or(resource.resource_type())
        .unwrap_or_default();

    let resolved = booted
        .evaluator
        .resolver()
        .applicable_rules::<L>(resource, resource_type)
        .with_context(|| format!("failed to resolve rules for {}", args.resource))?;

    let Some(rules) = resolved else {
        print_warning(&format!(
            "No policy applies to {} at {} level",
            args.resource,
            L::NAME
        ));
        return Ok(());
    };

    match format {
        OutputFormat::Json => print_json(&json!({
            "resource": args.resource,
            "level": L::NAME,
            "type": resource_type,
            "rules": rules.names().collect::<Vec<_>>(),
            "message": rules.message(),
        })),
        OutputFormat::Table => {
            println!("{}: {}", "Resource".cyan(), args.resource);
            println!("{}: {}", "Level".cyan(), L::NAME);
            print_rule_names(&rules);
            println!("{}: {}", "Message".cyan(), rules.message());
            Ok(())
        }
    }
}

pub fn policy(booted: &Bootstrapped, args: &PolicyArgs, format: OutputFormat) -> Result<()> {
    let (label, found) = match (&args.resource, &args.resource_type) {
        (_, Some(resource_type)) => (
            format!("type {resource_type}"),
            booted.evaluator.get_type_policy(resource_type)?,
        ),
        (Some(id), None) => {
            let resource = booted
                .catalog
                .get(id)
                .with_context(|| format!("Unknown resource: {id}"))?;
            (
                format!("resource {id}"),
                booted.evaluator.get_direct_policy(resource)?,
            )
        }
        (None, None) => anyhow::bail!("Pass a resource id or --type"),
    };

    let Some(policy) = found else {
        print_warning(&format!("No policy stored for {label}"));
        return Ok(());
    };

    match format {
        OutputFormat::Json => print_json(&policy_json(&label, &policy)),
        OutputFormat::Table => {
            let owner = policy.owner();
            println!("{}: {}", "Policy for".cyan(), label);
            println!("{}: {}", "Owner".cyan(), owner.id);
            if !owner.roles.is_empty() {
                let roles: Vec<_> = owner.roles.iter().map(String::as_str).collect();
                println!("{}: {}", "Owner roles".cyan(), roles.join(", "));
            }
            println!(
                "{}: {}",
                "Resource rules".cyan(),
                policy.resource_rules().message()
            );
            println!(
                "{}: {}",
                "Record rules".cyan(),
                policy.record_rules().message()
            );
            Ok(())
        }
    }
}

pub fn resources(booted: &Bootstrapped, format: OutputFormat) -> Result<()> {
    if booted.catalog.is_empty() {
        print_warning("No resources configured");
        return Ok(());
    }

    match format {
        OutputFormat::Json => {
            let entries: Vec<_> = booted
                .catalog
                .iter()
                .map(|resource| {
                    json!({
                        "id": resource.id().as_str(),
                        "kind": resource.kind().to_string(),
                        "parent": resource.parent().map(|p| p.id().as_str()),
                        "type": resource.resource_type(),
                        "format": resource.serialised_format(),
                    })
                })
                .collect();
            print_json(&json!(entries))
        }
        OutputFormat::Table => {
            let rows: Vec<[String; 5]> = booted
                .catalog
                .iter()
                .map(|resource| {
                    [
                        resource.id().to_string(),
                        resource.kind().to_string(),
                        resource
                            .parent()
                            .map(|p| p.id().to_string())
                            .unwrap_or_else(|| "-".into()),
                        resource.resource_type().unwrap_or("-").to_string(),
                        resource.serialised_format().unwrap_or("-").to_string(),
                    ]
                })
                .collect();
            print_table(["Id", "Kind", "Parent", "Type", "Format"], &rows);
            Ok(())
        }
    }
}

fn print_rule_names<T>(rules: &Rules<T>) {
    let rows: Vec<[String; 2]> = rules
        .names()
        .enumerate()
        .map(|(i, name)| [(i + 1).to_string(), name.to_string()])
        .collect();
    print_table(["#", "Rule"], &rows);
}

fn policy_json(label: &str, policy: &Policy) -> serde_json::Value {
    json!({
        "policy_for": label,
        "owner": policy.owner(),
        "resource_rules": policy.resource_rules().names().collect::<Vec<_>>(),
        "record_rules": policy.record_rules().names().collect::<Vec<_>>(),
    })
}
