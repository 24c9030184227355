use meos::MeosError;
use meos::datatype::DataType;
use meos::session::register_route;
use meos::spatial::npoint::{Npoint, Nsegment, TNpoint, geompoint_to_npoint, route_exists, route_length};
use meos::spatial::point::Point;
use meos::time::{TimestampTz, parse_timestamp};

fn setup() {
    register_route(1, "LINESTRING(0 0, 10 0)").expect("valid route");
    register_route(2, "LINESTRING(0 0, 0 20)").expect("valid route");
}

fn ts(text: &str) -> TimestampTz {
    parse_timestamp(text).expect("valid timestamp")
}

#[test]
fn network_points() {
    setup();
    assert!(route_exists(1));
    assert!(!route_exists(99));
    assert_eq!(route_length(2).expect("known route"), 20.0);

    let np = Npoint::make(1, 0.5).expect("valid position");
    assert_eq!(np.to_string(), "NPoint(1, 0.5)");
    assert_eq!(np.to_geompoint().expect("known route"), Point::new(5.0, 0.0));
    assert_eq!(geompoint_to_npoint(&Point::new(5.0, 0.0)), Some(np));
    assert_eq!(geompoint_to_npoint(&Point::new(5.0, 5.0)), None);

    let err = Npoint::make(1, 1.5).expect_err("position outside [0, 1]");
    assert!(matches!(err, MeosError::InvalidArgValue(_)), "unexpected error {:?}", err);

    let seg = Nsegment::make(1, 0.8, 0.2).expect("valid segment");
    assert_eq!(seg.output(15), "NSegment(1, 0.2, 0.8)");
    assert!(seg.contains(&np));
}

#[test]
fn temporal_network_points() {
    setup();
    let temp = TNpoint::parse("[NPoint(1, 0.25)@2020-01-01, NPoint(1, 0.75)@2020-01-03]").expect("valid tnpoint");
    assert_eq!(temp.route().expect("single route"), 1);
    assert_eq!(temp.length().expect("known route"), 5.0);
    assert_eq!(temp.positions(), vec![Nsegment::make(1, 0.25, 0.75).expect("valid segment")]);

    let mid = temp.value_at_timestamp(&ts("2020-01-02"), false).expect("defined at the midpoint");
    assert_eq!(mid, Npoint::make(1, 0.5).expect("valid position"));

    let geo = temp.to_tgeompoint().expect("conversion");
    assert_eq!(geo.start_value(), Point::new(2.5, 0.0));
    assert_eq!(geo.end_value(), Point::new(7.5, 0.0));
}

#[test]
fn sequences_stay_on_one_route() {
    setup();
    let result = TNpoint::parse("[NPoint(1, 0.2)@2020-01-01, NPoint(2, 0.6)@2020-01-03]");
    assert!(result.is_err());
    let discrete = TNpoint::parse("{NPoint(1, 0.2)@2020-01-01, NPoint(2, 0.6)@2020-01-03}").expect("discrete values may jump");
    assert_eq!(discrete.routes(), vec![1, 2]);
}

#[test]
fn network_distances() {
    setup();
    let temp = TNpoint::parse("[NPoint(1, 0)@2020-01-01, NPoint(1, 1)@2020-01-11]").expect("valid tnpoint");
    let np = Npoint::make(2, 0.25).expect("valid position");
    let dist = temp.nearest_approach_distance_npoint(&np).expect("distance");
    assert_eq!(dist, 5.0);
}
