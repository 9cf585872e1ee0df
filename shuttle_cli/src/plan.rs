use std::{fs::File, io::BufReader, path::PathBuf, sync::Arc};

use clap::Args;
use comfy_table::{Table, presets::UTF8_FULL};
use jiff::civil::Date;
use shuttle_planner::{
    json::types::JsonDataset,
    planner::route_planner::{PlanOutcome, RoutePlanner},
    problem::ids::ShiftId,
};
use tracing::info;

use crate::config::PlannerArgs;

#[derive(Args)]
pub struct PlanArgs {
    /// Dataset with shifts, employees and shuttles
    #[arg(short = 'i', long)]
    input: PathBuf,

    #[arg(short, long)]
    shift: u64,

    /// Service date, e.g. 2025-06-10
    #[arg(long)]
    date: Date,

    /// Write the planned routes as JSON
    #[arg(long, short = 'o')]
    out: Option<PathBuf>,

    #[command(flatten)]
    planner: PlannerArgs,
}

pub fn read_dataset(path: &PathBuf) -> anyhow::Result<JsonDataset> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

pub fn run(args: PlanArgs) -> anyhow::Result<()> {
    let dataset = read_dataset(&args.input)?;
    let params = args
        .planner
        .planner_params(dataset.distance_method, dataset.headquarters())?;
    let planner = RoutePlanner::new(Arc::new(dataset.create_store()), params);

    let outcome = planner.plan_routes(dataset.organization_id, ShiftId::new(args.shift), args.date)?;

    println!("{}", outcome_table(&outcome));
    info!(
        routes = outcome.routes.len(),
        unallocated_employees = outcome.unallocated_employee_count(),
        "Finished planning"
    );

    if let Some(out) = args.out {
        if let Some(parent) = out.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(out, serde_json::to_string_pretty(&outcome)?)?;
    }

    Ok(())
}

fn outcome_table(outcome: &PlanOutcome) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Route", "Shuttle", "Employees", "Stops", "Distance (km)", "Duration", "Departure",
    ]);

    for route in &outcome.routes {
        let departure = route
            .stops
            .first()
            .and_then(|stop| stop.estimated_arrival)
            .map_or_else(|| String::from("-"), |arrival| arrival.to_string());

        table.add_row(vec![
            route.name.clone(),
            route.shuttle_id.to_string(),
            route.employee_count().to_string(),
            route.stops.len().to_string(),
            format!("{:.2}", route.total_distance.value() / 1000.0),
            format!("{:#}", route.total_time),
            departure,
        ]);
    }

    for cluster in &outcome.unallocated {
        table.add_row(vec![
            format!("unallocated #{}", cluster.cluster_index + 1),
            String::from("-"),
            cluster.employee_ids.len().to_string(),
            String::from("-"),
            String::from("-"),
            String::from("-"),
            String::from("-"),
        ]);
    }

    table
}
