use meos::agg::{tcentroid_finalfn, tcentroid_transfn};
use meos::spatial::point::{Geom, Point};
use meos::spatial::tpoint::TPoint;
use meos::stbox::STBox;
use meos::time::{TimestampTz, parse_timestamp};

fn ts(text: &str) -> TimestampTz {
    parse_timestamp(text).expect("valid timestamp")
}

fn tpoint(text: &str) -> TPoint {
    TPoint::parse(text).expect("valid temporal point")
}

fn eastward() -> TPoint {
    tpoint("[Point(0 0)@2020-01-01, Point(10 0)@2020-01-11]")
}

#[test]
fn interpolates_positions() {
    let temp = eastward();
    let mid = temp.value_at_timestamp(&ts("2020-01-06"), false).expect("defined at the midpoint");
    assert_eq!(mid, Point::new(5.0, 0.0));
    assert_eq!(temp.length(), 10.0);
    assert!(temp.speed().expect("speed").is_some());
    assert!(!temp.trajectory().is_empty());
}

#[test]
fn bounding_box() {
    let bbox = eastward().stbox();
    assert_eq!(bbox.xmin(), Some(0.0));
    assert_eq!(bbox.xmax(), Some(10.0));
    assert_eq!(bbox.ymin(), Some(0.0));
    assert!(bbox.hast());
    assert!(!bbox.hasz());
}

#[test]
fn reference_systems() {
    let temp = tpoint("SRID=3857;[Point(0 0)@2020-01-01, Point(1 1)@2020-01-02]");
    assert_eq!(temp.srid(), 3857);
    assert!(temp.to_string().starts_with("SRID=3857;["));

    let geog = TPoint::parse_geog("[Point(4.35 50.85)@2020-01-01, Point(2.35 48.85)@2020-01-02]")
        .expect("valid temporal geography");
    assert!(geog.is_geodetic());
    assert_eq!(geog.srid(), 4326);

    let other = tpoint("SRID=4326;[Point(0 0)@2020-01-01, Point(1 1)@2020-01-02]");
    assert!(temp.tdistance(&other).is_err());
}

#[test]
fn distances() {
    let temp = eastward();
    let target = Point::new(5.0, 5.0);
    assert_eq!(temp.nearest_approach_distance_point(&target).expect("distance"), 5.0);
    let inst = temp.nearest_approach_instant_point(&target).expect("closest instant");
    assert_eq!(inst.timestamp(), ts("2020-01-06"));

    let dist = temp.tdistance_point(&target).expect("temporal distance");
    assert_eq!(dist.min_value(), 5.0);
}

#[test]
fn relationships_with_geometries() {
    let temp = eastward();
    let square = Geom::parse("POLYGON((2 -1, 4 -1, 4 1, 2 1, 2 -1))").expect("valid polygon");
    assert!(temp.eintersects(&square).expect("relationship"));
    assert!(!temp.aintersects(&square).expect("relationship"));

    let at = temp.at_geom(&square).expect("restriction").expect("passes through the square");
    assert_eq!(at.start_timestamp(), ts("2020-01-03"));
    assert_eq!(at.end_timestamp(), ts("2020-01-05"));

    let far = Geom::parse("POINT(100 100)").expect("valid point");
    assert!(temp.at_geom(&far).expect("restriction").is_none());
    assert!(temp.edwithin(&far, 200.0).expect("relationship"));
}

#[test]
fn restriction_to_a_box() {
    let temp = eastward();
    let bbox = STBox::parse("STBOX X((0,-1),(5,1))").expect("valid box");
    let at = temp.at_stbox(&bbox).expect("restriction").expect("inside the box");
    assert_eq!(at.end_value(), Point::new(5.0, 0.0));
}

#[test]
fn centroid_aggregate() {
    let state = tcentroid_transfn(None, &tpoint("Point(0 0)@2020-01-01")).expect("centroid transition");
    let state = tcentroid_transfn(Some(state), &tpoint("Point(2 4)@2020-01-01")).expect("centroid transition");
    let centroid = tcentroid_finalfn(Some(state)).expect("centroid final").expect("non-empty aggregate");
    assert_eq!(centroid.start_value(), Point::new(1.0, 2.0));
}
