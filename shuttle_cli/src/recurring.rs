use std::{path::PathBuf, sync::Arc};

use clap::Args;
use comfy_table::{Table, presets::UTF8_FULL};
use jiff::civil::Date;
use shuttle_planner::{
    planner::route_planner::RoutePlanner,
    recurring::{
        recurring_generator::{DateRange, GenerationOutcome, GenerationReport},
        weekday_mask::WeekdayMask,
    },
};
use tracing::info;

use crate::{config::PlannerArgs, plan::read_dataset};

#[derive(Args)]
pub struct RecurringArgs {
    /// Dataset with shifts, shuttles and route templates
    #[arg(short = 'i', long)]
    input: PathBuf,

    /// First service date, inclusive
    #[arg(long)]
    from: Date,

    /// Last service date, inclusive
    #[arg(long)]
    to: Date,

    /// Days to generate routes on, e.g. "mon,wed,fri"
    #[arg(long, default_value_t = WeekdayMask::default())]
    weekdays: WeekdayMask,

    /// Write the generation report as JSON
    #[arg(long, short = 'o')]
    out: Option<PathBuf>,

    #[command(flatten)]
    planner: PlannerArgs,
}

pub fn run(args: RecurringArgs) -> anyhow::Result<()> {
    let dataset = read_dataset(&args.input)?;
    let params = args
        .planner
        .planner_params(dataset.distance_method, dataset.headquarters())?;
    let planner = RoutePlanner::new(Arc::new(dataset.create_store()), params);

    let templates = dataset.route_templates();
    let range = DateRange::new(args.from, args.to)?;
    let report =
        planner.generate_recurring(&templates, dataset.organization_id, range, args.weekdays)?;

    println!("{}", report_table(&report));
    info!(
        created = report.created(),
        skipped = report.skipped(),
        unallocated = report.unallocated(),
        failed = report.failed(),
        "Finished generating"
    );

    if let Some(out) = args.out {
        if let Some(parent) = out.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(out, serde_json::to_string_pretty(&report)?)?;
    }

    Ok(())
}

fn report_table(report: &GenerationReport) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Date", "Template", "Outcome", "Routes"]);

    for entry in &report.entries {
        let (outcome, routes) = match &entry.outcome {
            GenerationOutcome::Created { route_ids, .. } => (
                "created",
                route_ids
                    .iter()
                    .map(|id| id.to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            GenerationOutcome::DuplicateRoute { existing_route_id } => {
                ("skipped", existing_route_id.to_string())
            }
            GenerationOutcome::Unallocated { .. } => ("no shuttle", String::new()),
            GenerationOutcome::Failed { error } => ("failed", error.clone()),
        };

        table.add_row(vec![
            entry.date.to_string(),
            entry.template_id.to_string(),
            outcome.to_string(),
            routes,
        ]);
    }

    table
}
