//! Canonical text input and output of sets, spans, span sets, boxes and
//! temporal values.

use std::fmt;

use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;

use crate::catalog::Interpolation;
use crate::datatype::{DataType, SpanBase, SpatialContext, format_float};
use crate::error::{MeosError, Result};
use crate::session::session;
use crate::set::Set;
use crate::span::{Span, TstzSpan};
use crate::spanset::SpanSet;
use crate::spatial::point::{Point, WGS84_SRID};
use crate::stbox::{STBox, SpaceExtent};
use crate::tbox::{NumSpan, TBox};
use crate::temporal::{TInstant, TSequence, TSequenceSet, Temporal, TemporalValue, default_interp};

#[derive(Parser)]
#[grammar = "io/meos.pest"]
struct MeosParser;

/// The structural pair of an input rule.
fn parse_rule(rule: Rule, text: &str) -> Result<Pair<'_, Rule>> {
    MeosParser::parse(rule, text)?
        .next()
        .and_then(|input| input.into_inner().next())
        .ok_or_else(|| MeosError::parse(format!("Empty input: \"{}\"", text.trim())))
}

fn parse_srid(pair: Pair<Rule>) -> Result<i32> {
    let text = pair.into_inner().next().map(|p| p.as_str()).unwrap_or_default();
    text.parse::<i32>().map_err(|_| MeosError::parse(format!("Invalid SRID: {}", text)))
}

fn spatial_context(srid: i32, geodetic: bool) -> SpatialContext {
    SpatialContext { has_z: false, srid, geodetic }
}

fn parse_value<T: DataType>(pair: Pair<Rule>, ctx: &SpatialContext) -> Result<T> {
    Ok(T::parse(pair.as_str().trim())?.with_spatial_context(ctx))
}

fn is_inclusive(pair: Option<Pair<Rule>>) -> bool {
    matches!(pair.map(|p| p.as_str()), Some("[") | Some("]"))
}

fn parse_span_pair<T: SpanBase>(pair: Pair<Rule>) -> Result<Span<T>> {
    let mut inner = pair.into_inner();
    let lower_inc = is_inclusive(inner.next());
    let ctx = SpatialContext::default();
    let lower = inner.next().ok_or_else(|| MeosError::parse("Missing lower bound".to_string()))?;
    let upper = inner.next().ok_or_else(|| MeosError::parse("Missing upper bound".to_string()))?;
    let upper_inc = is_inclusive(inner.next());
    Span::make(parse_value(lower, &ctx)?, parse_value(upper, &ctx)?, lower_inc, upper_inc)
}

// ------------- Sets, spans and span sets --------------
fn parse_set_with<T: DataType>(text: &str, geodetic: bool) -> Result<Set<T>> {
    let mut srid = 0;
    let mut values = vec![];
    for pair in parse_rule(Rule::set_input, text)?.into_inner() {
        match pair.as_rule() {
            Rule::srid_prefix => srid = parse_srid(pair)?,
            _ => values.push(parse_value(pair, &spatial_context(srid, geodetic))?),
        }
    }
    Set::make(values)
}

fn srid_prefix<T: DataType>(value: &T) -> String {
    match value.spatial_context() {
        Some(ctx) if ctx.srid != 0 => format!("SRID={};", ctx.srid),
        _ => String::new(),
    }
}

impl<T: DataType> Set<T> {
    pub fn parse(text: &str) -> Result<Set<T>> {
        parse_set_with(text, false)
    }

    pub fn output(&self, maxdd: usize) -> String {
        let values: Vec<String> = self.values().iter().map(|v| v.output(maxdd)).collect();
        let prefix = self.values().first().map(srid_prefix).unwrap_or_default();
        format!("{}{{{}}}", prefix, values.join(", "))
    }
}

impl Set<Point> {
    /// Parse a set of geographies; the SRID defaults to WGS84.
    pub fn parse_geog(text: &str) -> Result<Set<Point>> {
        parse_set_with(text, true)
    }
}

impl<T: SpanBase> Span<T> {
    pub fn parse(text: &str) -> Result<Span<T>> {
        parse_span_pair(parse_rule(Rule::span_input, text)?)
    }

    pub fn output(&self, maxdd: usize) -> String {
        format!(
            "{}{}, {}{}",
            if self.lower_inc { "[" } else { "(" },
            self.lower.output(maxdd),
            self.upper.output(maxdd),
            if self.upper_inc { "]" } else { ")" }
        )
    }
}

impl<T: SpanBase> SpanSet<T> {
    pub fn parse(text: &str) -> Result<SpanSet<T>> {
        let spans = parse_rule(Rule::spanset_input, text)?
            .into_inner()
            .map(parse_span_pair)
            .collect::<Result<Vec<Span<T>>>>()?;
        SpanSet::make(spans)
    }

    pub fn output(&self, maxdd: usize) -> String {
        let spans: Vec<String> = self.spans().iter().map(|s| s.output(maxdd)).collect();
        format!("{{{}}}", spans.join(", "))
    }
}

// ------------- Boxes --------------
impl TBox {
    pub fn parse(text: &str) -> Result<TBox> {
        let mut inner = parse_rule(Rule::tbox_input, text)?.into_inner();
        let kind = inner.next().map(|p| p.as_str().to_ascii_uppercase()).unwrap_or_default();
        let dims = inner.next().map(|p| p.as_str().to_ascii_uppercase()).unwrap_or_default();
        let spans: Vec<Pair<Rule>> = inner.collect();
        let expected = if dims == "XT" { 2 } else { 1 };
        if spans.len() != expected {
            return Err(MeosError::parse(format!("Expected {} span(s) for TBOX {}: \"{}\"", expected, dims, text.trim())));
        }
        let mut spans = spans.into_iter();
        let value_span = |pair: Pair<Rule>| -> Result<NumSpan> {
            if kind == "TBOXINT" {
                Ok(NumSpan::Int(parse_span_pair(pair)?))
            } else {
                Ok(NumSpan::Float(parse_span_pair(pair)?))
            }
        };
        let (span, period) = match (dims.as_str(), spans.next(), spans.next()) {
            ("XT", Some(x), Some(t)) => (Some(value_span(x)?), Some(parse_span_pair::<crate::time::TimestampTz>(t)?)),
            ("X", Some(x), None) => (Some(value_span(x)?), None),
            (_, Some(t), None) => (None, Some(parse_span_pair(t)?)),
            _ => return Err(MeosError::parse(format!("Could not parse temporal box: \"{}\"", text.trim()))),
        };
        TBox::make(span, period)
    }

    pub fn output(&self, maxdd: usize) -> String {
        let kind = match self.span {
            Some(NumSpan::Int(_)) => "TBOXINT",
            Some(NumSpan::Float(_)) => "TBOXFLOAT",
            None => "TBOX",
        };
        let value = self.span.map(|s| match s {
            NumSpan::Int(s) => s.output(maxdd),
            NumSpan::Float(s) => s.output(maxdd),
        });
        let period = self.period.map(|p| p.output(maxdd));
        match (value, period) {
            (Some(x), Some(t)) => format!("{} XT({},{})", kind, x, t),
            (Some(x), None) => format!("{} X({})", kind, x),
            (None, Some(t)) => format!("{} T({})", kind, t),
            (None, None) => kind.to_string(),
        }
    }
}

fn parse_coords(pair: Pair<Rule>) -> Result<Vec<f64>> {
    pair.into_inner()
        .map(|n| f64::parse(n.as_str()))
        .collect()
}

fn space_extent(low: Pair<Rule>, high: Pair<Rule>, has_z: bool) -> Result<SpaceExtent> {
    let (low, high) = (parse_coords(low)?, parse_coords(high)?);
    if low.len() != high.len() || (low.len() == 3) != has_z {
        return Err(MeosError::parse("The coordinates of a spatiotemporal box do not match its dimensions".to_string()));
    }
    Ok(SpaceExtent {
        xmin: low[0],
        xmax: high[0],
        ymin: low[1],
        ymax: high[1],
        z: if has_z { Some((low[2], high[2])) } else { None },
    })
}

impl STBox {
    pub fn parse(text: &str) -> Result<STBox> {
        let mut srid = 0;
        let mut geodetic = false;
        let mut dims = String::new();
        let mut space = None;
        let mut period: Option<TstzSpan> = None;
        for pair in parse_rule(Rule::stbox_input, text)?.into_inner() {
            match pair.as_rule() {
                Rule::srid_prefix => srid = parse_srid(pair)?,
                Rule::stbox_kind => geodetic = pair.as_str().eq_ignore_ascii_case("GEODSTBOX"),
                Rule::stbox_dims => dims = pair.as_str().to_ascii_uppercase(),
                Rule::space | Rule::space_time => {
                    let mut inner = pair.into_inner();
                    let (Some(low), Some(high)) = (inner.next(), inner.next()) else {
                        return Err(MeosError::parse(format!("Missing coordinates: \"{}\"", text.trim())));
                    };
                    space = Some(space_extent(low, high, dims.starts_with('Z'))?);
                    if let Some(t) = inner.next() {
                        period = Some(parse_span_pair(t)?);
                    }
                }
                Rule::span => period = Some(parse_span_pair(pair)?),
                _ => {}
            }
        }
        let consistent = match dims.as_str() {
            "X" | "Z" => space.is_some() && period.is_none(),
            "XT" | "ZT" => space.is_some() && period.is_some(),
            _ => space.is_none() && period.is_some(),
        };
        if !consistent {
            return Err(MeosError::parse(format!("The content of the box does not match STBOX {}", dims)));
        }
        if geodetic && srid == 0 {
            srid = WGS84_SRID;
        }
        STBox::make(space, period, srid, geodetic)
    }

    pub fn output(&self, maxdd: usize) -> String {
        let mut out = String::new();
        if self.srid != 0 {
            out.push_str(&format!("SRID={};", self.srid));
        }
        out.push_str(if self.geodetic { "GEODSTBOX " } else { "STBOX " });
        let f = |v: f64| format_float(v, maxdd);
        let space = self.space.map(|s| match s.z {
            Some((zmin, zmax)) => format!("(({},{},{}),({},{},{}))", f(s.xmin), f(s.ymin), f(zmin), f(s.xmax), f(s.ymax), f(zmax)),
            None => format!("(({},{}),({},{}))", f(s.xmin), f(s.ymin), f(s.xmax), f(s.ymax)),
        });
        let dim = if self.hasz() { "Z" } else { "X" };
        match (space, self.period) {
            (Some(s), Some(p)) => out.push_str(&format!("{}T({},{})", dim, s, p.output(maxdd))),
            (Some(s), None) => out.push_str(&format!("{}{}", dim, s)),
            (None, Some(p)) => out.push_str(&format!("T({})", p.output(maxdd))),
            (None, None) => {}
        }
        out
    }
}

// ------------- Temporal values --------------
fn parse_instant<V: TemporalValue>(pair: Pair<Rule>, ctx: &SpatialContext) -> Result<TInstant<V>> {
    let mut inner = pair.into_inner();
    let (Some(value), Some(t)) = (inner.next(), inner.next()) else {
        return Err(MeosError::parse("An instant needs a value and a timestamp".to_string()));
    };
    Ok(TInstant::make(parse_value(value, ctx)?, parse_value(t, ctx)?))
}

fn parse_sequence<V: TemporalValue>(pair: Pair<Rule>, ctx: &SpatialContext, interp: Interpolation) -> Result<TSequence<V>> {
    let mut lower_inc = true;
    let mut upper_inc = true;
    let mut instants = vec![];
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::lower_bracket => lower_inc = p.as_str() == "[",
            Rule::upper_bracket => upper_inc = p.as_str() == "]",
            _ => instants.push(parse_instant(p, ctx)?),
        }
    }
    TSequence::make(instants, lower_inc, upper_inc, interp, true)
}

pub(crate) fn parse_temporal_with<V: TemporalValue>(text: &str, geodetic: bool) -> Result<Temporal<V>> {
    let mut srid = 0;
    let mut interp = None;
    for pair in parse_rule(Rule::temporal_input, text)?.into_inner() {
        let ctx = spatial_context(srid, geodetic);
        match pair.as_rule() {
            Rule::srid_prefix => srid = parse_srid(pair)?,
            Rule::interp_prefix => {
                let name = pair.into_inner().next().map(|p| p.as_str()).unwrap_or_default();
                interp = Some(Interpolation::from_name(name)?);
            }
            Rule::instant => return Ok(Temporal::Instant(parse_instant(pair, &ctx)?)),
            Rule::discrete_seq => {
                let instants = pair.into_inner().map(|p| parse_instant(p, &ctx)).collect::<Result<Vec<TInstant<V>>>>()?;
                return Ok(Temporal::Sequence(TSequence::make(instants, true, true, Interpolation::Discrete, true)?));
            }
            Rule::cont_seq => {
                let interp = interp.unwrap_or_else(default_interp::<V>);
                return Ok(Temporal::Sequence(parse_sequence(pair, &ctx, interp)?));
            }
            Rule::seqset => {
                let interp = interp.unwrap_or_else(default_interp::<V>);
                let sequences = pair
                    .into_inner()
                    .map(|p| parse_sequence(p, &ctx, interp))
                    .collect::<Result<Vec<TSequence<V>>>>()?;
                return Ok(Temporal::SequenceSet(TSequenceSet::make(sequences, true)?));
            }
            _ => {}
        }
    }
    Err(MeosError::parse(format!("Could not parse temporal value: \"{}\"", text.trim())))
}

fn instant_output<V: TemporalValue>(inst: &TInstant<V>, maxdd: usize) -> String {
    format!("{}@{}", inst.value.output(maxdd), inst.t.output(maxdd))
}

fn sequence_output<V: TemporalValue>(seq: &TSequence<V>, maxdd: usize) -> String {
    let instants: Vec<String> = seq.instants.iter().map(|i| instant_output(i, maxdd)).collect();
    if seq.is_discrete() {
        return format!("{{{}}}", instants.join(", "));
    }
    format!(
        "{}{}{}",
        if seq.lower_inc { "[" } else { "(" },
        instants.join(", "),
        if seq.upper_inc { "]" } else { ")" }
    )
}

impl<V: TemporalValue> Temporal<V> {
    pub fn parse(text: &str) -> Result<Temporal<V>> {
        parse_temporal_with(text, false)
    }

    pub fn output(&self, maxdd: usize) -> String {
        let mut out = srid_prefix(&self.start_instant().value);
        if V::CONTINUOUS && !matches!(self, Temporal::Instant(_)) && self.interp() == Interpolation::Step {
            out.push_str("Interp=Step;");
        }
        match self {
            Temporal::Instant(i) => out.push_str(&instant_output(i, maxdd)),
            Temporal::Sequence(s) => out.push_str(&sequence_output(s, maxdd)),
            Temporal::SequenceSet(ss) => {
                let sequences: Vec<String> = ss.sequences.iter().map(|s| sequence_output(s, maxdd)).collect();
                out.push_str(&format!("{{{}}}", sequences.join(", ")));
            }
        }
        out
    }
}

impl Temporal<Point> {
    /// Parse a temporal geography point; the SRID defaults to WGS84.
    pub fn parse_geog(text: &str) -> Result<Temporal<Point>> {
        parse_temporal_with(text, true)
    }
}

macro_rules! display_with_session_digits {
    ($($ty:ty => [$($bound:tt)*]),+ $(,)?) => {
        $(
            impl<$($bound)*> fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                    write!(f, "{}", self.output(session().float_digits()))
                }
            }
        )+
    };
}

display_with_session_digits!(
    Set<T> => [T: DataType],
    Span<T> => [T: SpanBase],
    SpanSet<T> => [T: SpanBase],
    Temporal<V> => [V: TemporalValue],
);

impl fmt::Display for TBox {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.output(session().float_digits()))
    }
}

impl fmt::Display for STBox {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.output(session().float_digits()))
    }
}
