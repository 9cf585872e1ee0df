use fxhash::FxHashSet;
use rstar::RTree;
use rstar::primitives::GeomWithData;

use crate::problem::{
    distance_method::DistanceMethod, ids::EmployeeId, location::Location, meters::Meters,
};

const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

// Relative slack between the projected plane and great-circle distances
// at city scale.
const PROJECTION_SLACK: f64 = 0.01;

#[derive(Debug, Clone, Copy)]
pub struct IndexedData {
    employee_id: EmployeeId,
    location: Location,
}

pub type GeoIndexObject = GeomWithData<[f64; 2], IndexedData>;

/// Maps coordinates onto the plane the R-tree works in. Haversine points are
/// projected equirectangularly around the mean latitude so that tree
/// distances are in meters.
#[derive(Debug, Clone, Copy)]
enum Projection {
    Equirectangular { cos_reference_lat: f64 },
    Identity,
}

impl Projection {
    fn project(&self, location: &Location) -> [f64; 2] {
        match self {
            Projection::Equirectangular { cos_reference_lat } => [
                EARTH_RADIUS_METERS * location.lon().to_radians() * cos_reference_lat,
                EARTH_RADIUS_METERS * location.lat().to_radians(),
            ],
            Projection::Identity => [location.x(), location.y()],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub employee_id: EmployeeId,
    pub location: Location,
    pub distance: Meters,
}

/// Spatial index over the pickup coordinates of one planning run.
pub struct GeoIndex {
    tree: RTree<GeoIndexObject>,
    projection: Projection,
    distance_method: DistanceMethod,
}

impl GeoIndex {
    pub fn build(points: &[(EmployeeId, Location)], distance_method: DistanceMethod) -> GeoIndex {
        let projection = match distance_method {
            DistanceMethod::Haversine => {
                let reference_lat = if points.is_empty() {
                    0.0
                } else {
                    points.iter().map(|(_, location)| location.lat()).sum::<f64>()
                        / points.len() as f64
                };
                Projection::Equirectangular {
                    cos_reference_lat: reference_lat.to_radians().cos(),
                }
            }
            DistanceMethod::Euclidean => Projection::Identity,
        };

        let tree = RTree::bulk_load(
            points
                .iter()
                .map(|&(employee_id, location)| {
                    GeoIndexObject::new(
                        projection.project(&location),
                        IndexedData {
                            employee_id,
                            location,
                        },
                    )
                })
                .collect(),
        );

        GeoIndex {
            tree,
            projection,
            distance_method,
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    pub fn distance_method(&self) -> DistanceMethod {
        self.distance_method
    }

    pub fn points(&self) -> impl Iterator<Item = (EmployeeId, Location)> + '_ {
        self.tree
            .iter()
            .map(|object| (object.data.employee_id, object.data.location))
    }

    /// Factor between a true distance and the largest projected distance it
    /// can map to.
    fn slack(&self) -> f64 {
        match self.projection {
            Projection::Equirectangular { .. } => 1.0 + PROJECTION_SLACK,
            Projection::Identity => 1.0,
        }
    }

    fn neighbor(&self, origin: &Location, data: &IndexedData) -> Neighbor {
        Neighbor {
            employee_id: data.employee_id,
            location: data.location,
            distance: origin.distance(&data.location, self.distance_method),
        }
    }

    /// Closest point to `origin` that is not in `excluded`. Equidistant
    /// points resolve to the lower employee id.
    ///
    /// In haversine mode candidates are scanned in projected order until they
    /// lie farther than the best great-circle distance plus
    /// the projection slack. The result is exact at city scale and may be
    /// approximate over spans where the projection drifts more than that.
    pub fn nearest(
        &self,
        origin: &Location,
        excluded: &FxHashSet<EmployeeId>,
    ) -> Option<Neighbor> {
        let query = self.projection.project(origin);
        let slack = self.slack();
        let mut best: Option<Neighbor> = None;

        for (object, distance_2) in self.tree.nearest_neighbor_iter_with_distance_2(&query) {
            if excluded.contains(&object.data.employee_id) {
                continue;
            }

            if let Some(current) = best {
                let bound = current.distance.value() * slack;
                if distance_2 > bound * bound * (1.0 + 1e-9) + 1e-9 {
                    break;
                }
            }

            let candidate = self.neighbor(origin, &object.data);
            if best.is_none_or(|current| {
                (candidate.distance, candidate.employee_id) < (current.distance, current.employee_id)
            }) {
                best = Some(candidate);
            }
        }

        best
    }

    /// All points within `radius` of `origin`, closest first.
    pub fn within(&self, origin: &Location, radius: Meters) -> Vec<Neighbor> {
        let query = self.projection.project(origin);
        let search_radius = radius.value() * self.slack();

        let mut neighbors = self
            .tree
            .locate_within_distance(query, search_radius * search_radius)
            .map(|object| self.neighbor(origin, &object.data))
            .filter(|neighbor| neighbor.distance <= radius)
            .collect::<Vec<_>>();

        neighbors.sort_by_key(|neighbor| (neighbor.distance, neighbor.employee_id));
        neighbors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planar(points: &[(u64, f64, f64)]) -> GeoIndex {
        let points = points
            .iter()
            .map(|&(id, x, y)| (EmployeeId::new(id), Location::from_cartesian(x, y)))
            .collect::<Vec<_>>();
        GeoIndex::build(&points, DistanceMethod::Euclidean)
    }

    #[test]
    fn test_empty_index() {
        let index = planar(&[]);
        let origin = Location::from_cartesian(0.0, 0.0);

        assert!(index.is_empty());
        assert_eq!(index.nearest(&origin, &FxHashSet::default()), None);
        assert!(index.within(&origin, Meters::new(100.0)).is_empty());
    }

    #[test]
    fn test_single_point() {
        let index = planar(&[(7, 1.0, 1.0)]);
        let origin = Location::from_cartesian(0.0, 0.0);

        let nearest = index.nearest(&origin, &FxHashSet::default()).unwrap();
        assert_eq!(nearest.employee_id, EmployeeId::new(7));

        let excluded = FxHashSet::from_iter([EmployeeId::new(7)]);
        assert_eq!(index.nearest(&origin, &excluded), None);
    }

    #[test]
    fn test_nearest_skips_excluded() {
        let index = planar(&[(1, 1.0, 0.0), (2, 2.0, 0.0), (3, 5.0, 0.0)]);
        let origin = Location::from_cartesian(0.0, 0.0);

        let excluded = FxHashSet::from_iter([EmployeeId::new(1), EmployeeId::new(2)]);
        let nearest = index.nearest(&origin, &excluded).unwrap();

        assert_eq!(nearest.employee_id, EmployeeId::new(3));
        assert_eq!(nearest.distance, Meters::new(5.0));
    }

    #[test]
    fn test_duplicate_coordinates_resolve_to_lower_id() {
        let index = planar(&[(9, 1.0, 1.0), (4, 1.0, 1.0), (6, 1.0, 1.0), (1, 3.0, 3.0)]);
        let origin = Location::from_cartesian(0.0, 0.0);

        let nearest = index.nearest(&origin, &FxHashSet::default()).unwrap();
        assert_eq!(nearest.employee_id, EmployeeId::new(4));

        let excluded = FxHashSet::from_iter([EmployeeId::new(4)]);
        let nearest = index.nearest(&origin, &excluded).unwrap();
        assert_eq!(nearest.employee_id, EmployeeId::new(6));
    }

    #[test]
    fn test_equidistant_points_resolve_to_lower_id() {
        let index = planar(&[(5, 1.0, 0.0), (2, -1.0, 0.0), (8, 0.0, 1.0)]);
        let nearest = index
            .nearest(&Location::from_cartesian(0.0, 0.0), &FxHashSet::default())
            .unwrap();

        assert_eq!(nearest.employee_id, EmployeeId::new(2));
    }

    #[test]
    fn test_within_radius() {
        let index = planar(&[(1, 1.0, 0.0), (2, 0.0, 2.0), (3, 3.0, 3.0), (4, 0.5, 0.0)]);

        let ids = index
            .within(&Location::from_cartesian(0.0, 0.0), Meters::new(2.0))
            .into_iter()
            .map(|neighbor| neighbor.employee_id.get())
            .collect::<Vec<_>>();

        assert_eq!(ids, vec![4, 1, 2]);
    }

    #[test]
    fn test_haversine_nearest_and_within() {
        let points = vec![
            (EmployeeId::new(1), Location::from_lat_lon(9.0300, 38.7400)),
            (EmployeeId::new(2), Location::from_lat_lon(9.0100, 38.7600)),
            (EmployeeId::new(3), Location::from_lat_lon(8.9800, 38.8000)),
        ];
        let index = GeoIndex::build(&points, DistanceMethod::Haversine);
        let origin = Location::from_lat_lon(9.0110, 38.7610);

        let nearest = index.nearest(&origin, &FxHashSet::default()).unwrap();
        assert_eq!(nearest.employee_id, EmployeeId::new(2));
        assert!(nearest.distance.value() < 200.0);

        let within = index.within(&origin, Meters::new(4_000.0));
        assert_eq!(
            within
                .iter()
                .map(|neighbor| neighbor.employee_id)
                .collect::<Vec<_>>(),
            vec![EmployeeId::new(2), EmployeeId::new(1)]
        );
    }

    #[test]
    fn test_haversine_nearest_looks_past_projected_order() {
        // The far northern point pulls the projection latitude up, which
        // shortens east-west distances in the plane. Employee 2 is closer in
        // the plane, employee 1 is closer on the sphere.
        let points = vec![
            (EmployeeId::new(1), Location::from_lat_lon(9.008_903, 38.75)),
            (EmployeeId::new(2), Location::from_lat_lon(9.0, 38.759_105)),
            (EmployeeId::new(3), Location::from_lat_lon(60.0, 38.75)),
        ];
        let index = GeoIndex::build(&points, DistanceMethod::Haversine);
        let origin = Location::from_lat_lon(9.0, 38.75);

        let nearest = index.nearest(&origin, &FxHashSet::default()).unwrap();

        assert_eq!(nearest.employee_id, EmployeeId::new(1));
        assert!((nearest.distance.value() - 990.0).abs() < 1.0);
    }
}
