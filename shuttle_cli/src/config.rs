use std::str::FromStr;

use anyhow::Context;
use clap::Args;
use jiff::SignedDuration;
use shuttle_planner::{
    planner::planner_params::{ClusterCapacity, PlannerParams},
    problem::{distance_method::DistanceMethod, kmh::Kmh, location::Location},
};

use crate::parsers;

pub const AVERAGE_SPEED_ENV_VAR: &str = "SHUTTLE_AVERAGE_SPEED_KMH";
pub const STOP_DWELL_ENV_VAR: &str = "SHUTTLE_STOP_DWELL";
pub const DISTANCE_METHOD_ENV_VAR: &str = "SHUTTLE_DISTANCE_METHOD";
pub const CLUSTER_CAPACITY_ENV_VAR: &str = "SHUTTLE_CLUSTER_CAPACITY";

/// Planner settings. Flags win over environment variables, which win over
/// the dataset and the built-in defaults.
#[derive(Args)]
pub struct PlannerArgs {
    /// `haversine` for lat/lon coordinates, `euclidean` for planar ones
    #[arg(long)]
    distance_method: Option<DistanceMethod>,

    /// Average shuttle speed in km/h
    #[arg(long)]
    average_speed: Option<f64>,

    /// Boarding time per stop (e.g., "2m", "90s", "PT2M")
    #[arg(long, value_parser = parsers::parse_duration)]
    stop_dwell: Option<SignedDuration>,

    /// Fixed cluster size. Defaults to sizing clusters after the eligible shuttles
    #[arg(long)]
    cluster_capacity: Option<u32>,

    /// Lower bound on the number of clusters
    #[arg(long)]
    target_clusters: Option<usize>,
}

fn read_env<T>(name: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|error| anyhow::anyhow!("{error}"))
            .with_context(|| format!("invalid value for {name}")),
        _ => Ok(None),
    }
}

impl PlannerArgs {
    pub fn planner_params(
        &self,
        dataset_distance_method: Option<DistanceMethod>,
        headquarters: Option<Location>,
    ) -> anyhow::Result<PlannerParams> {
        let defaults = PlannerParams::default();

        let distance_method = self
            .distance_method
            .or(read_env(DISTANCE_METHOD_ENV_VAR)?)
            .or(dataset_distance_method)
            .unwrap_or(defaults.distance_method);

        let average_speed = self
            .average_speed
            .or(read_env(AVERAGE_SPEED_ENV_VAR)?)
            .map(Kmh::new)
            .unwrap_or(defaults.average_speed);
        if average_speed.value() <= 0.0 {
            anyhow::bail!("average speed must be positive");
        }

        let stop_dwell = match self.stop_dwell {
            Some(dwell) => dwell,
            None => match std::env::var(STOP_DWELL_ENV_VAR) {
                Ok(value) => parsers::parse_duration(value.trim())
                    .map_err(|error| anyhow::anyhow!(error))
                    .with_context(|| format!("invalid value for {STOP_DWELL_ENV_VAR}"))?,
                Err(_) => defaults.stop_dwell,
            },
        };

        let cluster_capacity = match self
            .cluster_capacity
            .or(read_env(CLUSTER_CAPACITY_ENV_VAR)?)
        {
            Some(capacity) => ClusterCapacity::Fixed(capacity),
            None => defaults.cluster_capacity,
        };

        Ok(PlannerParams {
            distance_method,
            average_speed,
            stop_dwell,
            cluster_capacity,
            target_cluster_count: self.target_clusters,
            headquarters,
        })
    }
}
