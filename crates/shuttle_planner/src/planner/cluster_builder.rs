use fxhash::FxHashSet;
use serde::Serialize;
use tracing::debug;

use crate::{
    error::PlanningError,
    planner::geo_index::{GeoIndex, Neighbor},
    problem::{
        distance_method::DistanceMethod, employee::Employee, ids::EmployeeId, location::Location,
        meters::Meters,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClusterMember {
    pub employee_id: EmployeeId,
    pub location: Location,
}

impl From<&Employee> for ClusterMember {
    fn from(employee: &Employee) -> Self {
        ClusterMember {
            employee_id: employee.id,
            location: employee.location,
        }
    }
}

impl From<Neighbor> for ClusterMember {
    fn from(neighbor: Neighbor) -> Self {
        ClusterMember {
            employee_id: neighbor.employee_id,
            location: neighbor.location,
        }
    }
}

/// Employees that will share one shuttle. Only lives for a planning run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cluster {
    members: Vec<ClusterMember>,
    centroid: Option<Location>,
}

impl Cluster {
    pub fn new(members: Vec<ClusterMember>) -> Self {
        let centroid = Location::centroid(members.iter().map(|member| &member.location));
        Cluster { members, centroid }
    }

    pub fn members(&self) -> &[ClusterMember] {
        &self.members
    }

    pub fn employee_ids(&self) -> impl Iterator<Item = EmployeeId> + '_ {
        self.members.iter().map(|member| member.employee_id)
    }

    pub fn centroid(&self) -> Option<Location> {
        self.centroid
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Largest distance between the centroid and a member.
    pub fn spread(&self, distance_method: DistanceMethod) -> Meters {
        match self.centroid {
            Some(centroid) => self
                .members
                .iter()
                .map(|member| centroid.distance(&member.location, distance_method))
                .max()
                .unwrap_or(Meters::ZERO),
            None => Meters::ZERO,
        }
    }
}

struct OpenCluster {
    seed: Location,
    capacity: usize,
    members: Vec<ClusterMember>,
    candidate: Option<Neighbor>,
}

/// Greedy capacity-bounded geographic grouping.
///
/// Seeds are spread out with farthest-point selection, then the globally
/// closest (employee, open cluster) pair is assigned until everyone has a
/// seat. Ties go to the lower employee id, then the older cluster.
pub struct ClusterBuilder {
    distance_method: DistanceMethod,
    headquarters: Option<Location>,
}

impl ClusterBuilder {
    pub fn new(distance_method: DistanceMethod) -> Self {
        ClusterBuilder {
            distance_method,
            headquarters: None,
        }
    }

    pub fn with_headquarters(mut self, headquarters: Option<Location>) -> Self {
        self.headquarters = headquarters;
        self
    }

    /// Groups employees into clusters of at most `capacity`.
    pub fn cluster(
        &self,
        employees: &[ClusterMember],
        capacity: u32,
        target_cluster_count: Option<usize>,
    ) -> Result<Vec<Cluster>, PlanningError> {
        if capacity == 0 {
            return Err(PlanningError::InvalidCapacity(capacity));
        }

        let members = Self::unique_members(employees);
        let capacity = capacity as usize;
        if members.len() <= capacity {
            return Ok(Self::single_cluster(members));
        }

        let cluster_count = members
            .len()
            .div_ceil(capacity)
            .max(target_cluster_count.unwrap_or(0))
            .min(members.len());

        Ok(self.build(members, &vec![capacity; cluster_count]))
    }

    /// Groups employees for a mixed fleet. The k-th cluster holds at most the
    /// k-th largest of `capacities`, and only as many clusters are opened as
    /// the largest shuttles need to seat everyone. Clusters the fleet cannot
    /// seat are sized like its smallest shuttle.
    pub fn cluster_for_fleet(
        &self,
        employees: &[ClusterMember],
        capacities: &[u32],
        target_cluster_count: Option<usize>,
    ) -> Result<Vec<Cluster>, PlanningError> {
        if let Some(&invalid) = capacities.iter().find(|&&capacity| capacity == 0) {
            return Err(PlanningError::InvalidCapacity(invalid));
        }
        let mut capacities = capacities
            .iter()
            .map(|&capacity| capacity as usize)
            .collect::<Vec<_>>();
        capacities.sort_by(|a, b| b.cmp(a));
        let Some(&largest) = capacities.first() else {
            return Err(PlanningError::InvalidCapacity(0));
        };

        let members = Self::unique_members(employees);
        if members.len() <= largest {
            return Ok(Self::single_cluster(members));
        }

        let mut seats = 0;
        let needed = capacities
            .iter()
            .position(|&capacity| {
                seats += capacity;
                seats >= members.len()
            })
            .map_or(capacities.len(), |index| index + 1);
        let cluster_count = needed
            .max(target_cluster_count.unwrap_or(0))
            .min(members.len());

        capacities.truncate(cluster_count);
        Ok(self.build(members, &capacities))
    }

    fn unique_members(employees: &[ClusterMember]) -> Vec<ClusterMember> {
        let mut members = employees.to_vec();
        members.sort_by_key(|member| member.employee_id);
        members.dedup_by_key(|member| member.employee_id);
        members
    }

    fn single_cluster(members: Vec<ClusterMember>) -> Vec<Cluster> {
        if members.is_empty() {
            vec![]
        } else {
            vec![Cluster::new(members)]
        }
    }

    /// `capacities` is non-empty and holds the limit of every initial
    /// cluster. Clusters opened on overflow take the last limit.
    fn build(&self, members: Vec<ClusterMember>, capacities: &[usize]) -> Vec<Cluster> {
        let overflow_capacity = capacities.last().copied().unwrap_or(members.len());
        let capacity_of = |cluster_index: usize| {
            capacities
                .get(cluster_index)
                .copied()
                .unwrap_or(overflow_capacity)
        };

        let points = members
            .iter()
            .map(|member| (member.employee_id, member.location))
            .collect::<Vec<_>>();
        let index = GeoIndex::build(&points, self.distance_method);

        let mut assigned: FxHashSet<EmployeeId> = FxHashSet::default();
        let mut open: Vec<OpenCluster> = Vec::with_capacity(capacities.len());

        // Distance from every employee to its closest seed. Before the first
        // seed exists, distances are measured from headquarters or from the
        // centroid of everyone.
        let reference = self
            .headquarters
            .or_else(|| Location::centroid(members.iter().map(|member| &member.location)))
            .unwrap_or(members[0].location);
        let mut seed_distance = members
            .iter()
            .map(|member| reference.distance(&member.location, self.distance_method))
            .collect::<Vec<_>>();

        for cluster_index in 0..capacities.len() {
            if let Some(seed) = self.farthest_unassigned(&members, &seed_distance, &assigned) {
                self.open_cluster(
                    seed,
                    capacity_of(cluster_index),
                    &members,
                    &mut seed_distance,
                    &mut assigned,
                    &mut open,
                );
            }
        }

        while assigned.len() < members.len() {
            for cluster in open.iter_mut() {
                if cluster.members.len() >= cluster.capacity {
                    cluster.candidate = None;
                } else if cluster
                    .candidate
                    .is_none_or(|candidate| assigned.contains(&candidate.employee_id))
                {
                    cluster.candidate = index.nearest(&cluster.seed, &assigned);
                }
            }

            let best = open
                .iter()
                .enumerate()
                .filter_map(|(cluster_index, cluster)| {
                    cluster.candidate.map(|candidate| {
                        (candidate.distance, candidate.employee_id, cluster_index, candidate)
                    })
                })
                .min_by(|a, b| (a.0, a.1, a.2).cmp(&(b.0, b.1, b.2)));

            match best {
                Some((_, employee_id, cluster_index, candidate)) => {
                    assigned.insert(employee_id);
                    open[cluster_index].members.push(candidate.into());
                }
                None => {
                    // Every open cluster is full.
                    let Some(seed) = self.farthest_unassigned(&members, &seed_distance, &assigned)
                    else {
                        break;
                    };
                    debug!("All clusters full, opening cluster {}", open.len());
                    self.open_cluster(
                        seed,
                        capacity_of(open.len()),
                        &members,
                        &mut seed_distance,
                        &mut assigned,
                        &mut open,
                    );
                }
            }
        }

        let clusters = open
            .into_iter()
            .map(|cluster| Cluster::new(cluster.members))
            .collect::<Vec<_>>();

        debug!(
            employees = members.len(),
            clusters = clusters.len(),
            "Clustered employees"
        );

        clusters
    }

    fn farthest_unassigned(
        &self,
        members: &[ClusterMember],
        seed_distance: &[Meters],
        assigned: &FxHashSet<EmployeeId>,
    ) -> Option<usize> {
        // `members` is sorted by id, so keeping the first maximum keeps the
        // lower id on ties.
        let mut farthest: Option<usize> = None;
        for (index, member) in members.iter().enumerate() {
            if assigned.contains(&member.employee_id) {
                continue;
            }
            if farthest.is_none_or(|current| seed_distance[index] > seed_distance[current]) {
                farthest = Some(index);
            }
        }
        farthest
    }

    fn open_cluster(
        &self,
        seed: usize,
        capacity: usize,
        members: &[ClusterMember],
        seed_distance: &mut [Meters],
        assigned: &mut FxHashSet<EmployeeId>,
        open: &mut Vec<OpenCluster>,
    ) {
        let seed_member = members[seed];
        let is_first_seed = open.is_empty();

        for (index, member) in members.iter().enumerate() {
            let distance = seed_member
                .location
                .distance(&member.location, self.distance_method);
            seed_distance[index] = if is_first_seed {
                distance
            } else {
                seed_distance[index].min(distance)
            };
        }

        assigned.insert(seed_member.employee_id);
        open.push(OpenCluster {
            seed: seed_member.location,
            capacity,
            members: vec![seed_member],
            candidate: None,
        });
    }
}
