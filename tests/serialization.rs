use meos::MeosError;
use meos::io::wkb::{WKB_EXTENDED, WKB_NDR, WKB_XDR};
use meos::set::{IntSet, Set, TextSet};
use meos::span::{DateSpan, FloatSpan, IntSpan, TstzSpan};
use meos::spanset::{IntSpanSet, TstzSpanSet};
use meos::spatial::npoint::Npoint;
use meos::spatial::point::Point;
use meos::spatial::tpoint::TPoint;
use meos::stbox::STBox;
use meos::tbox::TBox;
use meos::temporal::{TBool, TFloat, TInt, TText};
use serde_json::{Value, json};

fn json(text: &str) -> Value {
    serde_json::from_str(text).expect("valid JSON")
}

#[test]
fn tbox_text_forms() {
    let tbox = TBox::parse("TBOXFLOAT XT([1, 3],[2020-01-01, 2020-01-02])").expect("tbox");
    assert_eq!(
        tbox.to_string(),
        "TBOXFLOAT XT([1, 3],[2020-01-01 00:00:00+00, 2020-01-02 00:00:00+00])"
    );
    assert_eq!(TBox::parse(&tbox.to_string()).expect("reparse"), tbox);

    let tbox = TBox::parse("TBOXINT X([1, 3])").expect("tbox");
    assert_eq!(tbox.to_string(), "TBOXINT X([1, 4))");
    let tbox = TBox::parse("TBOX T([2020-01-01, 2020-01-02))").expect("tbox");
    assert!(!tbox.hasx());
    assert_eq!(tbox.to_string(), "TBOX T([2020-01-01 00:00:00+00, 2020-01-02 00:00:00+00))");

    assert!(matches!(TBox::parse("TBOXFLOAT XT([1, 3])"), Err(MeosError::TextInput { .. })));
    assert!(matches!(TBox::parse("TBOX XT([1, 3]"), Err(MeosError::TextInput { .. })));
}

#[test]
fn stbox_text_forms() {
    let stbox = STBox::parse("SRID=3812;STBOX XT(((1,2),(3,4)),[2020-01-01, 2020-01-02])").expect("stbox");
    assert_eq!(stbox.srid(), 3812);
    assert_eq!(
        stbox.to_string(),
        "SRID=3812;STBOX XT(((1,2),(3,4)),[2020-01-01 00:00:00+00, 2020-01-02 00:00:00+00])"
    );
    assert_eq!(STBox::parse(&stbox.to_string()).expect("reparse"), stbox);

    let stbox = STBox::parse("STBOX Z((1,2,3),(4,5,6))").expect("stbox");
    assert!(stbox.hasz());
    assert_eq!(stbox.to_string(), "STBOX Z((1,2,3),(4,5,6))");

    let geod = STBox::parse("GEODSTBOX X((1,2),(3,4))").expect("stbox");
    assert!(geod.is_geodetic());
    assert_eq!(geod.srid(), 4326);
    assert_eq!(geod.to_string(), "SRID=4326;GEODSTBOX X((1,2),(3,4))");

    // a Z box needs three coordinates
    assert!(STBox::parse("STBOX Z((1,2),(3,4))").is_err());
}

#[test]
fn temporal_text_forms() {
    let temp = TFloat::parse("Interp=Step;[1@2020-01-01, 2@2020-01-02]").expect("tfloat");
    assert_eq!(
        temp.to_string(),
        "Interp=Step;[1@2020-01-01 00:00:00+00, 2@2020-01-02 00:00:00+00]"
    );
    let temp = TInt::parse("[1@2020-01-01, 2@2020-01-02]").expect("tint");
    assert_eq!(temp.to_string(), "[1@2020-01-01 00:00:00+00, 2@2020-01-02 00:00:00+00]");
    let temp = TText::parse("{\"a\"@2020-01-01, \"b\"@2020-01-02}").expect("ttext");
    assert_eq!(temp.to_string(), "{\"a\"@2020-01-01 00:00:00+00, \"b\"@2020-01-02 00:00:00+00}");
    let temp = TPoint::parse("SRID=4326;Point(1 2)@2020-01-01").expect("tpoint");
    assert_eq!(temp.to_string(), "SRID=4326;POINT(1 2)@2020-01-01 00:00:00+00");
    // more decimal digits than asked for are rounded away
    let temp = TFloat::parse("1.23456@2020-01-01").expect("tfloat");
    assert_eq!(temp.output(2), "1.23@2020-01-01 00:00:00+00");
}

#[test]
fn set_and_span_wkb() {
    let set = IntSet::parse("{1, 5, 9}").expect("set");
    for variant in [WKB_NDR, WKB_XDR] {
        let wkb = set.as_wkb(variant).expect("wkb");
        assert_eq!(IntSet::from_wkb(&wkb).expect("decode"), set);
    }
    let text = TextSet::parse("{\"ab\", \"c\"}").expect("set");
    assert_eq!(TextSet::from_wkb(&text.as_wkb(WKB_NDR).expect("wkb")).expect("decode"), text);

    let span = FloatSpan::parse("(1.5, 2.5]").expect("span");
    let wkb = span.as_wkb(WKB_XDR).expect("wkb");
    assert_eq!(wkb[0], 0);
    assert_eq!(FloatSpan::from_wkb(&wkb).expect("decode"), span);

    let spans = IntSpanSet::parse("{[1, 3), [5, 8)}").expect("span set");
    assert_eq!(IntSpanSet::from_wkb(&spans.as_wkb(WKB_NDR).expect("wkb")).expect("decode"), spans);
    let periods = TstzSpanSet::parse("{[2020-01-01, 2020-01-02), [2020-01-03, 2020-01-04]}").expect("span set");
    let hex = periods.as_hexwkb(WKB_NDR).expect("hex");
    assert_eq!(hex, hex.to_uppercase());
    assert!(hex.starts_with("01"));
    assert_eq!(TstzSpanSet::from_hexwkb(&hex).expect("decode"), periods);
}

#[test]
fn geometry_sets_keep_their_srid_in_extended_wkb() {
    let set: Set<Point> = Set::parse("SRID=3812;{Point(1 1), Point(2 2)}").expect("set");
    let extended = Set::<Point>::from_wkb(&set.as_wkb(WKB_NDR | WKB_EXTENDED).expect("wkb")).expect("decode");
    assert_eq!(extended.start_value().srid, 3812);
    let plain = Set::<Point>::from_wkb(&set.as_wkb(WKB_NDR).expect("wkb")).expect("decode");
    assert_eq!(plain.start_value().srid, 0);
}

#[test]
fn box_wkb() {
    let tbox = TBox::parse("TBOXINT XT([1, 3],[2020-01-01, 2020-01-02])").expect("tbox");
    for variant in [WKB_NDR, WKB_XDR] {
        assert_eq!(TBox::from_wkb(&tbox.as_wkb(variant).expect("wkb")).expect("decode"), tbox);
    }
    let stbox = STBox::parse("SRID=3812;STBOX ZT(((1,2,3),(4,5,6)),[2020-01-01, 2020-01-02])").expect("stbox");
    let decoded = STBox::from_hexwkb(&stbox.as_hexwkb(WKB_EXTENDED).expect("hex")).expect("decode");
    assert_eq!(decoded, stbox);
    assert_eq!(decoded.srid(), 3812);
}

#[test]
fn temporal_wkb() {
    let values = [
        TFloat::parse("1.5@2020-01-01").expect("instant"),
        TFloat::parse("{1@2020-01-01, 2@2020-01-02}").expect("discrete"),
        TFloat::parse("(1@2020-01-01, 3@2020-01-03]").expect("linear"),
        TFloat::parse("Interp=Step;[1@2020-01-01, 3@2020-01-03]").expect("step"),
        TFloat::parse("{[1@2020-01-01, 2@2020-01-02], [5@2020-01-05, 5@2020-01-06]}").expect("sequence set"),
    ];
    for temp in &values {
        for variant in [WKB_NDR, WKB_XDR] {
            let decoded = TFloat::from_wkb(&temp.as_wkb(variant).expect("wkb")).expect("decode");
            assert_eq!(&decoded, temp);
            assert_eq!(decoded.interp(), temp.interp());
        }
    }
    let tbool = TBool::parse("[true@2020-01-01, false@2020-01-02]").expect("tbool");
    assert_eq!(TBool::from_hexwkb(&tbool.as_hexwkb(WKB_NDR).expect("hex")).expect("decode"), tbool);

    let tpoint = TPoint::parse("SRID=4326;[Point(1 1)@2020-01-01, Point(2 2)@2020-01-02]").expect("tpoint");
    let decoded = TPoint::from_wkb(&tpoint.as_wkb(WKB_EXTENDED).expect("wkb")).expect("decode");
    assert_eq!(decoded, tpoint);
    assert_eq!(decoded.srid(), 4326);
}

#[test]
fn malformed_wkb_is_rejected() {
    let span = IntSpan::parse("[1, 3)").expect("span");
    let mut wkb = span.as_wkb(WKB_NDR).expect("wkb");
    // a span is not a span set
    assert!(matches!(IntSpanSet::from_wkb(&wkb), Err(MeosError::WkbInput(_))));
    assert!(matches!(TstzSpan::from_wkb(&wkb), Err(MeosError::WkbInput(_))));
    wkb.push(0);
    assert!(matches!(IntSpan::from_wkb(&wkb), Err(MeosError::WkbInput(_))));
    wkb.truncate(5);
    assert!(matches!(IntSpan::from_wkb(&wkb), Err(MeosError::WkbInput(_))));
    assert!(matches!(IntSpan::from_wkb(&[7, 0, 0]), Err(MeosError::WkbInput(_))));
    assert!(matches!(IntSpan::from_hexwkb("01ZZ"), Err(MeosError::WkbInput(_))));
}

#[test]
fn wkb_sizes_beyond_the_buffer_are_rejected() {
    // endian, type, flags, then the count of a set
    let set = IntSet::parse("{1, 5, 9}").expect("set");
    let mut wkb = set.as_wkb(WKB_NDR).expect("wkb");
    wkb[4..8].copy_from_slice(&i32::MAX.to_le_bytes());
    assert!(matches!(IntSet::from_wkb(&wkb), Err(MeosError::WkbInput(_))));

    // the size of the first text follows the count
    let text = TextSet::parse("{\"ab\", \"c\"}").expect("set");
    let mut wkb = text.as_wkb(WKB_NDR).expect("wkb");
    wkb[8..16].copy_from_slice(&u64::MAX.to_le_bytes());
    assert!(matches!(TextSet::from_wkb(&wkb), Err(MeosError::WkbInput(_))));
    wkb[8..16].copy_from_slice(&0u64.to_le_bytes());
    assert!(matches!(TextSet::from_wkb(&wkb), Err(MeosError::WkbInput(_))));

    let spans = IntSpanSet::parse("{[1, 3), [5, 8)}").expect("span set");
    let mut wkb = spans.as_wkb(WKB_XDR).expect("wkb");
    wkb[3..7].copy_from_slice(&i32::MAX.to_be_bytes());
    assert!(matches!(IntSpanSet::from_wkb(&wkb), Err(MeosError::WkbInput(_))));
}

#[test]
fn out_of_range_timestamps_in_wkb_are_rejected() {
    // endian, type, bound flags, then the lower bound
    let span = TstzSpan::parse("[2020-01-01, 2020-01-02]").expect("span");
    let wkb = span.as_wkb(WKB_NDR).expect("wkb");
    for micros in [i64::MAX, i64::MIN] {
        let mut bad = wkb.clone();
        bad[4..12].copy_from_slice(&micros.to_le_bytes());
        assert!(matches!(TstzSpan::from_wkb(&bad), Err(MeosError::WkbInput(_))), "lower bound {}", micros);
    }

    let dates = DateSpan::parse("[2020-01-01, 2020-01-05)").expect("span");
    let mut wkb = dates.as_wkb(WKB_NDR).expect("wkb");
    wkb[8..12].copy_from_slice(&i32::MAX.to_le_bytes());
    assert!(matches!(DateSpan::from_wkb(&wkb), Err(MeosError::WkbInput(_))));

    let temp = TFloat::parse("1.5@2020-01-01").expect("instant");
    let mut wkb = temp.as_wkb(WKB_NDR).expect("wkb");
    let n = wkb.len();
    wkb[n - 8..].copy_from_slice(&i64::MAX.to_le_bytes());
    assert!(matches!(TFloat::from_wkb(&wkb), Err(MeosError::WkbInput(_))));
}

#[test]
fn integer_bounds_survive_wkb() {
    let span = IntSpan::parse("[1, 2147483647]").expect("span");
    for variant in [WKB_NDR, WKB_XDR] {
        let decoded = IntSpan::from_wkb(&span.as_wkb(variant).expect("wkb")).expect("decode");
        assert_eq!(decoded, span);
        assert_eq!(decoded.upper(), i32::MAX);
    }
    let set = IntSet::parse("{-2147483648, 2147483647}").expect("set");
    assert_eq!(IntSet::from_wkb(&set.as_wkb(WKB_NDR).expect("wkb")).expect("decode"), set);
}

#[test]
fn network_point_wkb() {
    let np = Npoint::make(3, 0.25).expect("npoint");
    let hex = np.as_hexwkb(WKB_NDR);
    assert_eq!(Npoint::from_hexwkb(&hex).expect("decode"), np);
    assert_eq!(Npoint::from_wkb(&np.as_wkb(WKB_XDR)).expect("decode"), np);
}

#[test]
fn mfjson_float_sequence() {
    let temp = TFloat::parse("[1@2020-01-01, 3@2020-01-03)").expect("tfloat");
    let out = json(&temp.as_mfjson(true, 15, None).expect("mfjson"));
    assert_eq!(out["type"], "MovingFloat");
    assert_eq!(out["values"], json!([1.0, 3.0]));
    assert_eq!(out["datetimes"], json!(["2020-01-01T00:00:00+00", "2020-01-03T00:00:00+00"]));
    assert_eq!(out["lowerInc"], true);
    assert_eq!(out["upperInc"], false);
    assert_eq!(out["interpolation"], "Linear");
    assert_eq!(out["bbox"], json!([1.0, 3.0]));
    assert_eq!(out["period"]["begin"], "2020-01-01T00:00:00+00");

    let back = TFloat::from_mfjson(&out.to_string()).expect("read back");
    assert_eq!(back, temp);
}

#[test]
fn mfjson_other_types() {
    let tint = TInt::parse("5@2020-01-01").expect("tint");
    let out = json(&tint.as_mfjson(false, 15, None).expect("mfjson"));
    assert_eq!(out["type"], "MovingInteger");
    assert_eq!(out["value"], 5);
    assert_eq!(out["datetime"], "2020-01-01T00:00:00+00");
    assert_eq!(TInt::from_mfjson(&out.to_string()).expect("read back"), tint);

    let ttext = TText::parse("{\"a\"@2020-01-01, \"b\"@2020-01-02}").expect("ttext");
    let out = json(&ttext.as_mfjson(false, 15, None).expect("mfjson"));
    assert_eq!(out["interpolation"], "Discrete");
    assert!(out.get("lowerInc").is_none());
    assert_eq!(TText::from_mfjson(&out.to_string()).expect("read back"), ttext);

    let tbool = TBool::parse("{[true@2020-01-01, false@2020-01-02], [true@2020-01-05, true@2020-01-06]}").expect("tbool");
    let out = json(&tbool.as_mfjson(false, 15, None).expect("mfjson"));
    assert_eq!(out["type"], "MovingBoolean");
    assert_eq!(out["sequences"].as_array().map(|s| s.len()), Some(2));
    assert_eq!(out["interpolation"], "Step");
    assert_eq!(TBool::from_mfjson(&out.to_string()).expect("read back"), tbool);
}

#[test]
fn mfjson_points_carry_their_reference_system() {
    let temp = TPoint::parse("SRID=4326;[Point(1.123456 2)@2020-01-01, Point(3 4)@2020-01-02]").expect("tpoint");
    let out = json(&temp.as_mfjson(true, 2, None).expect("mfjson"));
    assert_eq!(out["type"], "MovingPoint");
    assert_eq!(out["crs"]["properties"]["name"], "EPSG:4326");
    assert_eq!(out["coordinates"], json!([[1.12, 2.0], [3.0, 4.0]]));
    assert_eq!(out["bbox"], json!([[1.12, 2.0], [3.0, 4.0]]));

    let back = TPoint::from_mfjson(&out.to_string()).expect("read back");
    assert_eq!(back.srid(), 4326);
    assert_eq!(back.num_instants(), 2);

    let named = json(&temp.as_mfjson(false, 15, Some("urn:ogc:def:crs:EPSG::4326")).expect("mfjson"));
    assert_eq!(named["crs"]["properties"]["name"], "urn:ogc:def:crs:EPSG::4326");
    assert_eq!(TPoint::from_mfjson(&named.to_string()).expect("read back").srid(), 4326);

    let geog = TPoint::from_mfjson_geog(r#"{"type":"MovingGeogPoint","coordinates":[1,2],"datetime":"2020-01-01T00:00:00+00","interpolation":"None"}"#)
        .expect("geography point");
    assert!(geog.is_geodetic());
    assert_eq!(geog.srid(), 4326);
}

#[test]
fn malformed_mfjson_is_rejected() {
    let float = TFloat::parse("1@2020-01-01").expect("tfloat");
    let text = float.as_mfjson(false, 15, None).expect("mfjson");
    assert!(matches!(TInt::from_mfjson(&text), Err(MeosError::MfjsonInput(_))));
    assert!(matches!(TFloat::from_mfjson("{"), Err(MeosError::MfjsonInput(_))));
    let missing = r#"{"type":"MovingFloat","values":[1,2],"datetimes":["2020-01-01T00:00:00+00"],"interpolation":"Linear"}"#;
    assert!(matches!(TFloat::from_mfjson(missing), Err(MeosError::MfjsonInput(_))));
}
