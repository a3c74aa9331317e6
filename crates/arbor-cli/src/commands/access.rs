use anyhow::{Context as _, Result, bail};
use colored::Colorize;
use serde_json::json;

use arbor_config::Bootstrapped;
use arbor_core::{Context, Resource, User};
use arbor_policy::AccessDecision;

use crate::cli::{CheckArgs, OutputFormat};
use crate::output::{print_json, print_table};

pub fn check(booted: &Bootstrapped, args: &CheckArgs, format: OutputFormat) -> Result<()> {
    let user = User::new(&args.user)
        .with_roles(&args.roles)
        .with_auths(&args.auths);
    let context = build_context(&args.purpose, &args.context)?;
    let resources = select_resources(booted, &args.resources)?;

    let mut decisions = Vec::with_capacity(resources.len());
    for resource in resources {
        let id = resource.id().to_string();
        let decision = booted
            .evaluator
            .check_access(&user, &context, resource)
            .with_context(|| format!("failed to evaluate access to {id}"))?;
        decisions.push((id, decision));
    }

    match format {
        OutputFormat::Json => {
            let entries: Vec<_> = decisions
                .iter()
                .map(|(id, decision)| match decision.deny_reason() {
                    None => json!({ "resource": id, "allowed": true }),
                    Some(reason) => json!({
                        "resource": id,
                        "allowed": false,
                        "code": reason.code,
                        "reason": reason.message,
                    }),
                })
                .collect();
            print_json(&json!(entries))?;
        }
        OutputFormat::Table => {
            let rows: Vec<[String; 3]> = decisions
                .iter()
                .map(|(id, decision)| match decision {
                    AccessDecision::Allow(_) => {
                        [id.clone(), "allow".green().to_string(), String::new()]
                    }
                    AccessDecision::Deny(reason) => [
                        id.clone(),
                        "deny".red().to_string(),
                        reason.message.clone(),
                    ],
                })
                .collect();
            print_table(["Resource", "Decision", "Reason"], &rows);

            let allowed = decisions.iter().filter(|(_, d)| d.is_allowed()).count();
            println!(
                "{} {allowed} of {} accessible to {} for purpose '{}'",
                "Summary:".cyan(),
                decisions.len(),
                user.id,
                context.purpose()
            );
        }
    }

    Ok(())
}

fn build_context(purpose: &str, entries: &[String]) -> Result<Context> {
    let mut context = Context::new(purpose);
    for entry in entries {
        let Some((key, value)) = entry.split_once('=') else {
            bail!("Invalid context entry '{entry}', expected key=value");
        };
        let key = key.trim();
        if key.is_empty() || key == arbor_core::PURPOSE {
            bail!("Invalid context key in '{entry}'; set the purpose with --purpose");
        }
        context = context.with(key, value.trim());
    }
    Ok(context)
}

fn select_resources(booted: &Bootstrapped, ids: &[String]) -> Result<Vec<Resource>> {
    if ids.is_empty() {
        return Ok(booted.catalog.leaves().cloned().collect());
    }
    ids.iter()
        .map(|id| {
            booted
                .catalog
                .get(id)
                .cloned()
                .with_context(|| format!("Unknown resource: {id}"))
        })
        .collect()
}
