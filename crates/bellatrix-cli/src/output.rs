use anyhow::Result;
use bellatrix_core::{Scope, SubscriptionsPatch};
use bellatrix_reconcile::RunReport;
use colored::Colorize;
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::cli::OutputFormat;

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

pub fn print_report(report: &RunReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Table => print_report_table(report),
    }
    Ok(())
}

fn print_report_table(report: &RunReport) {
    let rows = report_rows(report);
    if rows.is_empty() {
        print_success("Subscriptions in sync, nothing to do");
        return;
    }

    let mut builder = Builder::default();
    builder.push_record(["Tenant", "Service path", "Action", "Description", "Id"]);
    for row in rows {
        builder.push_record(row);
    }
    println!("{}", builder.build().with(Style::rounded()));

    match (&report.applied, &report.health) {
        (Some(applied), Some(health)) => print_success(&format!(
            "Created {}, deleted {}, recreated {} of {} checked",
            applied.created.len(),
            applied.deleted.len(),
            health.healed.len(),
            health.checked,
        )),
        _ => println!(
            "{} {} patch(es) planned, nothing applied",
            "Dry run:".yellow(),
            report.patches.len()
        ),
    }
}

fn report_rows(report: &RunReport) -> Vec<[String; 5]> {
    let mut rows: Vec<[String; 5]> = report.patches.iter().flat_map(patch_rows).collect();

    if let Some(health) = &report.health {
        rows.extend(health.healed.iter().map(|healed| {
            row(
                &healed.scope,
                "recreate",
                &healed.description,
                &format!("{} -> {}", healed.previous_id, healed.new_id),
            )
        }));
    }
    rows
}

fn patch_rows(patch: &SubscriptionsPatch) -> Vec<[String; 5]> {
    let adds = patch
        .to_add
        .iter()
        .map(|sub| row(&patch.scope, "add", &sub.description, "-"));
    let deletes = patch.to_delete.iter().map(|sub| {
        row(
            &patch.scope,
            "delete",
            &sub.description,
            sub.id.as_deref().unwrap_or("-"),
        )
    });
    adds.chain(deletes).collect()
}

fn row(scope: &Scope, action: &str, description: &str, id: &str) -> [String; 5] {
    let or_default = |value: &str| {
        if value.is_empty() {
            "(default)".to_string()
        } else {
            value.to_string()
        }
    };
    [
        or_default(&scope.tenant),
        or_default(&scope.path),
        action.to_string(),
        description.to_string(),
        id.to_string(),
    ]
}
