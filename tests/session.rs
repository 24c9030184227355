use std::fs;

use meos::MeosError;
use meos::config::{DEFAULT_FLOAT_DIGITS, Settings};
use meos::session::{
    self, get_datestyle, get_timezone, is_initialized, register_srs, set_datestyle, set_float_digits, set_timezone,
};
use meos::spatial::tpoint::TPoint;
use meos::temporal::TFloat;
use meos::time::parse_timestamp;

fn scratch_dir() -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("meos_session_{}", std::process::id()));
    fs::create_dir_all(&dir).expect("scratch directory");
    dir
}

// The session is process-wide, so its changes are exercised in one test.
#[test]
fn session_lifecycle_and_settings() {
    let defaults = Settings::default();
    assert_eq!(defaults.float_digits, DEFAULT_FLOAT_DIGITS);
    assert!(defaults.validate().is_ok());
    let bad = Settings { float_digits: 16, ..Settings::default() };
    assert!(matches!(bad.validate(), Err(MeosError::InvalidArgValue(_))));
    let bad = Settings { datestyle: "SQL, DMY".into(), ..Settings::default() };
    assert!(matches!(bad.validate(), Err(MeosError::NotSupported(_))));

    // float output digits
    let temp = TFloat::parse("1.23456@2020-01-01").expect("tfloat");
    set_float_digits(3).expect("three digits");
    assert_eq!(temp.to_string(), "1.235@2020-01-01 00:00:00+00");
    assert!(matches!(set_float_digits(16), Err(MeosError::InvalidArgValue(_))));
    set_float_digits(DEFAULT_FLOAT_DIGITS).expect("default digits");
    assert_eq!(temp.to_string(), "1.23456@2020-01-01 00:00:00+00");

    // time zone applies to input without an offset and to output
    set_timezone("+02").expect("fixed offset");
    assert_eq!(get_timezone(), "+02");
    let t = parse_timestamp("2020-01-01 02:00:00").expect("timestamp");
    assert_eq!(t, parse_timestamp("2020-01-01 00:00:00+00").expect("utc timestamp"));
    assert_eq!(temp.to_string(), "1.23456@2020-01-01 02:00:00+02");
    assert!(set_timezone("Mars/Olympus").is_err());
    set_timezone("UTC").expect("utc");
    assert_eq!(get_timezone(), "UTC");

    set_datestyle("iso").expect("iso date style");
    assert_eq!(get_datestyle(), "ISO, YMD");
    assert!(matches!(set_datestyle("German"), Err(MeosError::NotSupported(_))));

    // registered reference systems drive the MF-JSON crs member
    register_srs(2154, "EPSG", 2154, false).expect("register");
    assert!(session::session().srs().get(2154).is_some());
    let tpoint = TPoint::parse("SRID=2154;Point(1 2)@2020-01-01").expect("tpoint");
    let json = tpoint.as_mfjson(false, 15, None).expect("mfjson");
    assert!(json.contains("EPSG:2154"));

    // settings files and tables
    let dir = scratch_dir();
    let srs_path = dir.join("spatial_ref_sys.csv");
    fs::write(&srs_path, "srid,auth_name,auth_srid,geodetic\n31370,EPSG,31370,false\n").expect("write srs");
    let ways_path = dir.join("ways.csv");
    fs::write(&ways_path, "rid,wkt\n7,\"LINESTRING(0 0, 3 4)\"\n").expect("write ways");
    let settings_path = dir.join("meos.toml");
    fs::write(
        &settings_path,
        format!(
            "timezone = \"-05:30\"\nfloat_digits = 6\nspatial_ref_sys = {:?}\nways = {:?}\n",
            srs_path.display().to_string(),
            ways_path.display().to_string()
        ),
    )
    .expect("write settings");

    let settings = Settings::load(Some(&settings_path)).expect("load settings");
    assert_eq!(settings.timezone, "-05:30");
    assert_eq!(settings.float_digits, 6);
    meos::initialize(&settings).expect("initialize");
    assert!(is_initialized());
    let current = session::session();
    assert_eq!(current.float_digits(), 6);
    assert_eq!(current.offset().local_minus_utc(), -(5 * 3600 + 30 * 60));
    assert!(current.srs().get(31370).is_some());
    assert!(current.srs().is_geodetic(4326));
    assert!(current.network().route(7).is_some());
    assert_eq!(meos::spatial::npoint::route_length(7).expect("route length"), 5.0);

    meos::finalize();
    assert!(!is_initialized());
    let current = session::session();
    assert_eq!(current.float_digits(), DEFAULT_FLOAT_DIGITS);
    assert!(current.network().route(7).is_none());

    // an explicit path must exist
    assert!(meos::initialize_from(Some(&dir.join("missing.toml"))).is_err());
    assert!(!is_initialized());

    let bad_ways = dir.join("bad_ways.csv");
    fs::write(&bad_ways, "7\n").expect("write bad ways");
    let settings = Settings { ways: Some(bad_ways), ..Settings::default() };
    assert!(matches!(meos::initialize(&settings), Err(MeosError::File(_))));

    let _ = fs::remove_dir_all(&dir);
}
