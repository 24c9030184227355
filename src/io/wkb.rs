//! Well-Known Binary encodings.
//!
//! Every value starts with an endianness byte (`1` little endian, `0` big
//! endian) followed by its catalog type as a `u16`. Timestamps are written as
//! microseconds since 2000-01-01, dates as days since 2000-01-01.

use tracing::trace;

use crate::catalog::{Interpolation, MeosType};
use crate::datatype::{DataType, SpanBase, SpatialContext};
use crate::error::{MeosError, Result};
use crate::set::Set;
use crate::span::{Span, TstzSpan};
use crate::spanset::SpanSet;
use crate::spatial::point::WGS84_SRID;
use crate::stbox::{STBox, SpaceExtent};
use crate::tbox::{NumSpan, TBox};
use crate::temporal::{TInstant, TSequence, TSequenceSet, Temporal, TemporalValue};
use crate::time::TimestampTz;

// variant flags accepted by the `as_wkb` family
pub const WKB_ISO: u8 = 0x01;
pub const WKB_SFSQL: u8 = 0x02;
pub const WKB_EXTENDED: u8 = 0x04;
pub const WKB_NDR: u8 = 0x08;
pub const WKB_XDR: u8 = 0x10;
pub const WKB_HEX: u8 = 0x20;

// span bound flags
pub(crate) const WKB_LOWER_INC: u8 = 0x01;
pub(crate) const WKB_UPPER_INC: u8 = 0x02;

// box and temporal flags
pub(crate) const WKB_XFLAG: u8 = 0x01;
pub(crate) const WKB_TFLAG: u8 = 0x02;
pub(crate) const WKB_ZFLAG: u8 = 0x10;
pub(crate) const WKB_GEODETICFLAG: u8 = 0x20;
pub(crate) const WKB_SRIDFLAG: u8 = 0x40;

pub(crate) const NDR: u8 = 1;
pub(crate) const XDR: u8 = 0;

pub struct WkbWriter {
    buf: Vec<u8>,
    big_endian: bool,
    extended: bool,
}

impl WkbWriter {
    pub fn new(variant: u8) -> Self {
        WkbWriter {
            buf: Vec::with_capacity(64),
            big_endian: variant & WKB_XDR != 0 && variant & WKB_NDR == 0,
            extended: variant & WKB_EXTENDED != 0,
        }
    }

    /// Whether the SRID should be written when it is known.
    pub fn extended(&self) -> bool {
        self.extended
    }

    pub fn put_endian(&mut self) {
        self.buf.push(if self.big_endian { XDR } else { NDR });
    }

    pub fn put_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn put_u16(&mut self, v: u16) {
        let bytes = if self.big_endian { v.to_be_bytes() } else { v.to_le_bytes() };
        self.buf.extend_from_slice(&bytes);
    }

    pub fn put_i32(&mut self, v: i32) {
        let bytes = if self.big_endian { v.to_be_bytes() } else { v.to_le_bytes() };
        self.buf.extend_from_slice(&bytes);
    }

    pub fn put_i64(&mut self, v: i64) {
        let bytes = if self.big_endian { v.to_be_bytes() } else { v.to_le_bytes() };
        self.buf.extend_from_slice(&bytes);
    }

    pub fn put_u64(&mut self, v: u64) {
        let bytes = if self.big_endian { v.to_be_bytes() } else { v.to_le_bytes() };
        self.buf.extend_from_slice(&bytes);
    }

    pub fn put_f64(&mut self, v: f64) {
        let bytes = if self.big_endian { v.to_be_bytes() } else { v.to_le_bytes() };
        self.buf.extend_from_slice(&bytes);
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

pub struct WkbReader<'a> {
    data: &'a [u8],
    pos: usize,
    big_endian: bool,
}

impl<'a> WkbReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        WkbReader { data, pos: 0, big_endian: false }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| {
                MeosError::WkbInput(format!(
                    "Unexpected end of buffer: needed {} bytes at offset {}, {} available",
                    n,
                    self.pos,
                    self.remaining()
                ))
            })?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn read_endian(&mut self) -> Result<()> {
        match self.get_u8()? {
            NDR => self.big_endian = false,
            XDR => self.big_endian = true,
            other => return Err(MeosError::WkbInput(format!("Invalid endian flag value encountered: {}", other))),
        }
        Ok(())
    }

    pub fn get_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn get_u16(&mut self) -> Result<u16> {
        let mut bytes = [0u8; 2];
        bytes.copy_from_slice(self.take(2)?);
        Ok(if self.big_endian { u16::from_be_bytes(bytes) } else { u16::from_le_bytes(bytes) })
    }

    pub fn get_i32(&mut self) -> Result<i32> {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(self.take(4)?);
        Ok(if self.big_endian { i32::from_be_bytes(bytes) } else { i32::from_le_bytes(bytes) })
    }

    pub fn get_i64(&mut self) -> Result<i64> {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(self.take(8)?);
        Ok(if self.big_endian { i64::from_be_bytes(bytes) } else { i64::from_le_bytes(bytes) })
    }

    pub fn get_u64(&mut self) -> Result<u64> {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(self.take(8)?);
        Ok(if self.big_endian { u64::from_be_bytes(bytes) } else { u64::from_le_bytes(bytes) })
    }

    pub fn get_f64(&mut self) -> Result<f64> {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(self.take(8)?);
        Ok(if self.big_endian { f64::from_be_bytes(bytes) } else { f64::from_le_bytes(bytes) })
    }

    pub fn get_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.take(n)
    }

    pub fn get_count(&mut self) -> Result<usize> {
        let n = self.get_i32()?;
        if n < 0 {
            return Err(MeosError::WkbInput(format!("Negative element count: {}", n)));
        }
        // Every element takes at least one byte.
        if n as usize > self.remaining() {
            return Err(MeosError::WkbInput(format!(
                "Element count {} exceeds the {} bytes left in the buffer",
                n,
                self.remaining()
            )));
        }
        Ok(n as usize)
    }

    /// Fail when bytes are left over after a value.
    pub fn finish(&self) -> Result<()> {
        if self.pos != self.data.len() {
            return Err(MeosError::WkbInput(format!(
                "Trailing bytes after value: {} of {} consumed",
                self.pos,
                self.data.len()
            )));
        }
        Ok(())
    }
}

/// Upper-case hex of a WKB buffer.
pub fn to_hex(bytes: &[u8]) -> String {
    hex::encode_upper(bytes)
}

pub fn from_hex(text: &str) -> Result<Vec<u8>> {
    Ok(hex::decode(text.trim())?)
}

// ------------- Composite values --------------
fn type_code(r: &mut WkbReader, expected: MeosType) -> Result<MeosType> {
    let found = MeosType::from_u16(r.get_u16()?)?;
    if found != expected {
        return Err(MeosError::WkbInput(format!("Expected a value of type {}, found {}", expected, found)));
    }
    Ok(found)
}

fn bounds_flags(lower_inc: bool, upper_inc: bool) -> u8 {
    let mut flags = 0;
    if lower_inc {
        flags |= WKB_LOWER_INC;
    }
    if upper_inc {
        flags |= WKB_UPPER_INC;
    }
    flags
}

fn put_span_body<T: SpanBase>(w: &mut WkbWriter, span: &Span<T>) {
    w.put_u8(bounds_flags(span.lower_inc, span.upper_inc));
    span.lower.write_wkb(w);
    span.upper.write_wkb(w);
}

fn get_span_body<T: SpanBase>(r: &mut WkbReader) -> Result<Span<T>> {
    let flags = r.get_u8()?;
    let ctx = SpatialContext::default();
    let lower = T::read_wkb(r, &ctx)?;
    let upper = T::read_wkb(r, &ctx)?;
    Span::make(lower, upper, flags & WKB_LOWER_INC != 0, flags & WKB_UPPER_INC != 0)
}

/// Z, geodetic and SRID flags of a spatial value.
fn spatial_flags(ctx: Option<SpatialContext>, w: &WkbWriter) -> u8 {
    let mut flags = 0;
    if let Some(ctx) = ctx {
        if ctx.has_z {
            flags |= WKB_ZFLAG;
        }
        if ctx.geodetic {
            flags |= WKB_GEODETICFLAG;
        }
        if w.extended() && ctx.srid != 0 {
            flags |= WKB_SRIDFLAG;
        }
    }
    flags
}

fn put_srid(w: &mut WkbWriter, flags: u8, ctx: Option<SpatialContext>) {
    if flags & WKB_SRIDFLAG != 0 {
        w.put_i32(ctx.map(|c| c.srid).unwrap_or(0));
    }
}

fn get_spatial_context(r: &mut WkbReader, flags: u8) -> Result<SpatialContext> {
    let geodetic = flags & WKB_GEODETICFLAG != 0;
    let srid = if flags & WKB_SRIDFLAG != 0 {
        r.get_i32()?
    } else if geodetic {
        WGS84_SRID
    } else {
        0
    };
    Ok(SpatialContext { has_z: flags & WKB_ZFLAG != 0, srid, geodetic })
}

fn decode<T>(data: &[u8], read: impl FnOnce(&mut WkbReader) -> Result<T>) -> Result<T> {
    let mut r = WkbReader::new(data);
    r.read_endian()?;
    let value = read(&mut r)?;
    r.finish()?;
    Ok(value)
}

/// Hex output shares the binary layout.
macro_rules! hexwkb_methods {
    ($self_ty:ty) => {
        pub fn as_hexwkb(&self, variant: u8) -> Result<String> {
            Ok(to_hex(&self.as_wkb(variant)?))
        }

        pub fn from_hexwkb(text: &str) -> Result<$self_ty> {
            Self::from_wkb(&from_hex(text)?)
        }
    };
}

impl<T: DataType> Set<T> {
    pub fn as_wkb(&self, variant: u8) -> Result<Vec<u8>> {
        let settype = T::UID
            .set_type()
            .ok_or_else(|| MeosError::WkbOutput(format!("No set type over {}", T::UID)))?;
        let mut w = WkbWriter::new(variant);
        let ctx = self.values().first().and_then(|v| v.spatial_context());
        w.put_endian();
        w.put_u16(settype as u16);
        let flags = spatial_flags(ctx, &w);
        w.put_u8(flags);
        put_srid(&mut w, flags, ctx);
        w.put_i32(self.values().len() as i32);
        for v in self.values() {
            v.write_wkb(&mut w);
        }
        Ok(w.finish())
    }

    pub fn from_wkb(data: &[u8]) -> Result<Set<T>> {
        let settype = T::UID
            .set_type()
            .ok_or_else(|| MeosError::WkbInput(format!("No set type over {}", T::UID)))?;
        decode(data, |r| {
            type_code(r, settype)?;
            let flags = r.get_u8()?;
            let ctx = get_spatial_context(r, flags)?;
            let n = r.get_count()?;
            let values = (0..n).map(|_| T::read_wkb(r, &ctx)).collect::<Result<Vec<T>>>()?;
            Set::make(values)
        })
    }

    hexwkb_methods!(Set<T>);
}

impl<T: SpanBase> Span<T> {
    pub fn as_wkb(&self, variant: u8) -> Result<Vec<u8>> {
        let spantype = T::UID
            .span_type()
            .ok_or_else(|| MeosError::WkbOutput(format!("No span type over {}", T::UID)))?;
        let mut w = WkbWriter::new(variant);
        w.put_endian();
        w.put_u16(spantype as u16);
        put_span_body(&mut w, self);
        Ok(w.finish())
    }

    pub fn from_wkb(data: &[u8]) -> Result<Span<T>> {
        let spantype = T::UID
            .span_type()
            .ok_or_else(|| MeosError::WkbInput(format!("No span type over {}", T::UID)))?;
        decode(data, |r| {
            type_code(r, spantype)?;
            get_span_body(r)
        })
    }

    hexwkb_methods!(Span<T>);
}

impl<T: SpanBase> SpanSet<T> {
    pub fn as_wkb(&self, variant: u8) -> Result<Vec<u8>> {
        let spansettype = T::UID
            .spanset_type()
            .ok_or_else(|| MeosError::WkbOutput(format!("No span set type over {}", T::UID)))?;
        let mut w = WkbWriter::new(variant);
        w.put_endian();
        w.put_u16(spansettype as u16);
        w.put_i32(self.num_spans() as i32);
        for span in self.spans() {
            put_span_body(&mut w, span);
        }
        Ok(w.finish())
    }

    pub fn from_wkb(data: &[u8]) -> Result<SpanSet<T>> {
        let spansettype = T::UID
            .spanset_type()
            .ok_or_else(|| MeosError::WkbInput(format!("No span set type over {}", T::UID)))?;
        decode(data, |r| {
            type_code(r, spansettype)?;
            let n = r.get_count()?;
            let spans = (0..n).map(|_| get_span_body(r)).collect::<Result<Vec<Span<T>>>>()?;
            SpanSet::make(spans)
        })
    }

    hexwkb_methods!(SpanSet<T>);
}

impl TBox {
    pub fn as_wkb(&self, variant: u8) -> Result<Vec<u8>> {
        let mut w = WkbWriter::new(variant);
        w.put_endian();
        let mut flags = 0;
        if self.span.is_some() {
            flags |= WKB_XFLAG;
        }
        if self.period.is_some() {
            flags |= WKB_TFLAG;
        }
        w.put_u8(flags);
        if let Some(period) = &self.period {
            put_span_body(&mut w, period);
        }
        if let Some(span) = &self.span {
            w.put_u16(span.span_type() as u16);
            match span {
                NumSpan::Int(s) => put_span_body(&mut w, s),
                NumSpan::Float(s) => put_span_body(&mut w, s),
            }
        }
        Ok(w.finish())
    }

    pub fn from_wkb(data: &[u8]) -> Result<TBox> {
        decode(data, |r| {
            let flags = r.get_u8()?;
            let period: Option<TstzSpan> = if flags & WKB_TFLAG != 0 { Some(get_span_body(r)?) } else { None };
            let span = if flags & WKB_XFLAG != 0 {
                match MeosType::from_u16(r.get_u16()?)? {
                    MeosType::IntSpan => Some(NumSpan::Int(get_span_body(r)?)),
                    MeosType::FloatSpan => Some(NumSpan::Float(get_span_body(r)?)),
                    other => return Err(MeosError::WkbInput(format!("Invalid span type of a temporal box: {}", other))),
                }
            } else {
                None
            };
            TBox::make(span, period)
        })
    }

    hexwkb_methods!(TBox);
}

impl STBox {
    pub fn as_wkb(&self, variant: u8) -> Result<Vec<u8>> {
        let mut w = WkbWriter::new(variant);
        w.put_endian();
        let mut flags = 0;
        if self.space.is_some() {
            flags |= WKB_XFLAG;
        }
        if self.period.is_some() {
            flags |= WKB_TFLAG;
        }
        if self.hasz() {
            flags |= WKB_ZFLAG;
        }
        if self.geodetic {
            flags |= WKB_GEODETICFLAG;
        }
        if w.extended() && self.srid != 0 {
            flags |= WKB_SRIDFLAG;
        }
        w.put_u8(flags);
        if flags & WKB_SRIDFLAG != 0 {
            w.put_i32(self.srid);
        }
        if let Some(period) = &self.period {
            put_span_body(&mut w, period);
        }
        if let Some(s) = &self.space {
            for v in [s.xmin, s.xmax, s.ymin, s.ymax] {
                w.put_f64(v);
            }
            if let Some((zmin, zmax)) = s.z {
                w.put_f64(zmin);
                w.put_f64(zmax);
            }
        }
        Ok(w.finish())
    }

    pub fn from_wkb(data: &[u8]) -> Result<STBox> {
        decode(data, |r| {
            let flags = r.get_u8()?;
            let ctx = get_spatial_context(r, flags)?;
            let period: Option<TstzSpan> = if flags & WKB_TFLAG != 0 { Some(get_span_body(r)?) } else { None };
            let space = if flags & WKB_XFLAG != 0 {
                let (xmin, xmax, ymin, ymax) = (r.get_f64()?, r.get_f64()?, r.get_f64()?, r.get_f64()?);
                let z = if ctx.has_z { Some((r.get_f64()?, r.get_f64()?)) } else { None };
                Some(SpaceExtent { xmin, xmax, ymin, ymax, z })
            } else {
                None
            };
            STBox::make(space, period, ctx.srid, ctx.geodetic)
        })
    }

    hexwkb_methods!(STBox);
}

fn put_instant_body<V: TemporalValue>(w: &mut WkbWriter, inst: &TInstant<V>) {
    inst.value.write_wkb(w);
    inst.t.write_wkb(w);
}

fn get_instant_body<V: TemporalValue>(r: &mut WkbReader, ctx: &SpatialContext) -> Result<TInstant<V>> {
    let value = V::read_wkb(r, ctx)?;
    let t = TimestampTz::read_wkb(r, ctx)?;
    Ok(TInstant::make(value, t))
}

fn put_sequence_body<V: TemporalValue>(w: &mut WkbWriter, seq: &TSequence<V>) {
    w.put_i32(seq.instants.len() as i32);
    w.put_u8(bounds_flags(seq.lower_inc, seq.upper_inc));
    for inst in &seq.instants {
        put_instant_body(w, inst);
    }
}

fn get_sequence_body<V: TemporalValue>(r: &mut WkbReader, ctx: &SpatialContext, interp: Interpolation) -> Result<TSequence<V>> {
    let n = r.get_count()?;
    let bounds = r.get_u8()?;
    let instants = (0..n).map(|_| get_instant_body(r, ctx)).collect::<Result<Vec<TInstant<V>>>>()?;
    TSequence::make(instants, bounds & WKB_LOWER_INC != 0, bounds & WKB_UPPER_INC != 0, interp, false)
}

impl<V: TemporalValue> Temporal<V> {
    /// Binary layout: endian, temporal type, flags holding the subtype in
    /// the two low bits and the interpolation in the next two, optional
    /// SRID, then the instants.
    pub fn as_wkb(&self, variant: u8) -> Result<Vec<u8>> {
        let mut w = WkbWriter::new(variant);
        let ctx = self.start_instant().value.spatial_context();
        w.put_endian();
        w.put_u16(self.temporal_type() as u16);
        let interp = match self {
            Temporal::Instant(_) => 0,
            _ => self.interp() as u8,
        };
        let flags = spatial_flags(ctx, &w) | (self.subtype() as u8) | (interp << 2);
        w.put_u8(flags);
        put_srid(&mut w, flags, ctx);
        match self {
            Temporal::Instant(i) => put_instant_body(&mut w, i),
            Temporal::Sequence(s) => put_sequence_body(&mut w, s),
            Temporal::SequenceSet(ss) => {
                w.put_i32(ss.sequences.len() as i32);
                for s in &ss.sequences {
                    put_sequence_body(&mut w, s);
                }
            }
        }
        Ok(w.finish())
    }

    pub fn from_wkb(data: &[u8]) -> Result<Temporal<V>> {
        decode(data, |r| {
            let temptype = MeosType::from_u16(r.get_u16()?)?;
            let geog = V::TEMPORAL_TYPE == MeosType::TGeomPoint && temptype == MeosType::TGeogPoint;
            if temptype != V::TEMPORAL_TYPE && !geog {
                return Err(MeosError::WkbInput(format!(
                    "Expected a value of type {}, found {}",
                    V::TEMPORAL_TYPE,
                    temptype
                )));
            }
            let flags = r.get_u8()?;
            let ctx = get_spatial_context(r, flags)?;
            trace!(temptype = %temptype, flags, "Reading temporal WKB");
            match flags & 0x03 {
                1 => Ok(Temporal::Instant(get_instant_body(r, &ctx)?)),
                2 => {
                    let interp = Interpolation::from_u8((flags >> 2) & 0x03)?;
                    Ok(Temporal::Sequence(get_sequence_body(r, &ctx, interp)?))
                }
                3 => {
                    let interp = Interpolation::from_u8((flags >> 2) & 0x03)?;
                    let n = r.get_count()?;
                    let sequences = (0..n).map(|_| get_sequence_body(r, &ctx, interp)).collect::<Result<Vec<TSequence<V>>>>()?;
                    Ok(Temporal::SequenceSet(TSequenceSet::make(sequences, false)?))
                }
                other => Err(MeosError::WkbInput(format!("Invalid temporal subtype code: {}", other))),
            }
        })
    }

    hexwkb_methods!(Temporal<V>);
}

/// WKB of a single base value such as a network point.
pub fn value_as_wkb<T: DataType>(value: &T, variant: u8) -> Vec<u8> {
    let mut w = WkbWriter::new(variant);
    w.put_endian();
    w.put_u16(value.identifier());
    value.write_wkb(&mut w);
    w.finish()
}

pub fn value_from_wkb<T: DataType>(data: &[u8]) -> Result<T> {
    decode(data, |r| {
        type_code(r, T::UID)?;
        T::read_wkb(r, &SpatialContext::default())
    })
}
