use crate::common::{
    bit_utils::BitWriter,
    codec::{Mode, Segment, MODE_INDICATOR_BITS, PADDING_CODEWORDS},
    error::{BarcodeError, BarcodeResult},
    metadata::{ECLevel, Version},
};

/// Optional QR modes the encoder may use besides numeric, alphanumeric and
/// byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeHints {
    /// Packs Shift JIS double byte chars in Kanji mode where that is shorter.
    pub kanji: bool,
    /// ECI assignment number announced ahead of the data, e.g. 26 for UTF-8.
    pub eci: Option<u32>,
}

// Encoder
//------------------------------------------------------------------------------

/// Packs data into the smallest version that fits at the given ec level.
pub fn encode(data: &[u8], ecl: ECLevel, hints: &EncodeHints) -> BarcodeResult<(BitWriter, Version)> {
    let eci_len = eci_bit_len(hints.eci)?;
    let mut plan: Option<(Vec<Segment>, usize)> = None;
    for ver in Version::all() {
        // Char count widths only change at versions 10 and 27
        if matches!(*ver, 1 | 10 | 27) {
            let segs = plan_segments(data, ver, hints.kanji);
            let len = segs.iter().map(|s| s.bit_len(ver)).sum::<usize>() + eci_len;
            plan = Some((segs, len));
        }
        let Some((segs, len)) = plan.as_ref() else { continue };
        if *len <= ver.data_bit_capacity(ecl) {
            log::trace!("Planned {} segments in {len} bits for version {}", segs.len(), *ver);
            return Ok((write_symbol_data(segs, hints.eci, ver, ecl)?, ver));
        }
    }
    Err(BarcodeError::CapacityExceeded)
}

pub fn encode_with_version(
    data: &[u8],
    ver: Version,
    ecl: ECLevel,
    hints: &EncodeHints,
) -> BarcodeResult<BitWriter> {
    let segs = plan_segments(data, ver, hints.kanji);
    write_symbol_data(&segs, hints.eci, ver, ecl)
}

// Segment planning
// Forward search over byte positions. A state is the position reached and the
// mode of the segment still open there. Costs are in sixths of a bit so that
// numeric and alphanumeric chars stay integral; a segment is rounded up to
// whole bits once it closes.
//------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Step {
    cost: usize,
    // Position and mode the step came from
    from: usize,
    prev: usize,
}

pub(crate) fn plan_segments(data: &[u8], ver: Version, kanji: bool) -> Vec<Segment<'_>> {
    if data.is_empty() {
        return Vec::new();
    }

    let n = data.len();
    let header = |m: Mode| (MODE_INDICATOR_BITS + ver.char_cnt_bits(m)) * 6;
    let mut best: Vec<[Option<Step>; 4]> = vec![[None; 4]; n + 1];
    for (i, &m) in PLAN_MODES.iter().enumerate() {
        best[0][i] = Some(Step { cost: header(m), from: 0, prev: i });
    }

    for pos in 0..n {
        for from in 0..PLAN_MODES.len() {
            let Some(step) = best[pos][from] else { continue };
            for (to, &mode) in PLAN_MODES.iter().enumerate() {
                let Some(width) = char_width(data, pos, mode, kanji) else { continue };
                let open = match from == to {
                    true => step.cost,
                    false => step.cost.div_ceil(6) * 6 + header(mode),
                };
                let cost = open + char_cost(mode);
                let slot = &mut best[pos + width][to];
                if slot.map_or(true, |s| cost < s.cost) {
                    *slot = Some(Step { cost, from: pos, prev: from });
                }
            }
        }
    }

    // Cheapest closed state at the end, then walk back to the start
    let mut mode = (0..PLAN_MODES.len())
        .filter(|&i| best[n][i].is_some())
        .min_by_key(|&i| best[n][i].map_or(usize::MAX, |s| s.cost.div_ceil(6)))
        .unwrap_or(PLAN_MODES.len() - 1);
    let mut pos = n;
    let mut segs: Vec<Segment> = Vec::new();
    while pos > 0 {
        let Some(step) = best[pos][mode] else { break };
        match segs.last_mut() {
            Some(seg) if seg.mode == PLAN_MODES[mode] => seg.data = &data[step.from..pos + seg.data.len()],
            _ => segs.push(Segment::new(PLAN_MODES[mode], &data[step.from..pos])),
        }
        pos = step.from;
        mode = step.prev;
    }
    segs.reverse();
    segs
}

// Bytes one char of `mode` takes at `pos`, if the mode can encode it
fn char_width(data: &[u8], pos: usize, mode: Mode, kanji: bool) -> Option<usize> {
    match mode {
        Mode::Kanji if kanji => {
            let (&hi, &lo) = (data.get(pos)?, data.get(pos + 1)?);
            Mode::kanji_value(hi, lo).map(|_| 2)
        }
        Mode::Kanji => None,
        _ => mode.contains(data[pos]).then_some(1),
    }
}

fn char_cost(mode: Mode) -> usize {
    match mode {
        Mode::Numeric => 20,
        Mode::Alphanumeric => 33,
        Mode::Kanji => 78,
        _ => 48,
    }
}

#[cfg(test)]
mod plan_tests {
    use test_case::test_case;

    use super::{encode, encode_with_version, plan_segments, EncodeHints};
    use crate::common::{
        codec::{Mode, Segment},
        error::BarcodeError,
        metadata::{ECLevel, Version},
    };

    fn v1() -> Version {
        Version::new(1).unwrap()
    }

    #[test_case("1111111", &[(Mode::Numeric, 7)])]
    #[test_case("AAAAA", &[(Mode::Alphanumeric, 5)])]
    #[test_case("aaaaa", &[(Mode::Byte, 5)])]
    #[test_case("1111111AAAA", &[(Mode::Numeric, 7), (Mode::Alphanumeric, 4)])]
    #[test_case("111111AAAA", &[(Mode::Alphanumeric, 10)])]
    #[test_case("aaa11111a", &[(Mode::Byte, 9)])]
    #[test_case("aaa111111a", &[(Mode::Byte, 3), (Mode::Numeric, 6), (Mode::Byte, 1)])]
    #[test_case("aaa1111A", &[(Mode::Byte, 8)])]
    #[test_case("aaa1111AA", &[(Mode::Byte, 3), (Mode::Alphanumeric, 6)])]
    fn test_plan_segments(data: &str, runs: &[(Mode, usize)]) {
        let segs = plan_segments(data.as_bytes(), v1(), false);
        let mut start = 0;
        let exp = runs
            .iter()
            .map(|&(mode, len)| {
                start += len;
                Segment::new(mode, &data.as_bytes()[start - len..start])
            })
            .collect::<Vec<_>>();
        assert_eq!(segs, exp);
    }

    #[test]
    fn test_plan_empty() {
        assert!(plan_segments(b"", v1(), true).is_empty());
    }

    #[test]
    fn test_plan_kanji() {
        // "点茗" in Shift JIS
        let data = [0x93, 0x5f, 0xe4, 0xaa];
        assert_eq!(plan_segments(&data, v1(), false), [Segment::new(Mode::Byte, &data)]);
        let segs = plan_segments(&data, v1(), true);
        assert_eq!(segs, [Segment::new(Mode::Kanji, &data)]);
        assert_eq!(segs[0].char_count(), 2);
    }

    #[test]
    fn test_plan_kanji_between_ascii() {
        // Ten chars save enough to pay for two more headers
        let mut data = vec![b'a'];
        data.extend([0x93, 0x5f].repeat(10));
        data.push(b'b');
        let segs = plan_segments(&data, v1(), true);
        assert_eq!(segs.iter().map(|s| s.mode).collect::<Vec<_>>(), [Mode::Byte, Mode::Kanji, Mode::Byte]);
        assert_eq!(segs[1].data.len(), 20);
    }

    #[test]
    fn test_plan_kanji_alignment() {
        // Kanji pairs start after the digit, not on it
        let mut data = vec![b'1'];
        data.extend([0x93, 0x5f].repeat(10));
        let segs = plan_segments(&data, v1(), true);
        assert_eq!(segs, [Segment::new(Mode::Numeric, &data[..1]), Segment::new(Mode::Kanji, &data[1..])]);
    }

    #[test_case("aaaaa11111AAA".to_string(), 1, ECLevel::L)]
    #[test_case("HELLO".to_string(), 1, ECLevel::M)]
    #[test_case("A11111111111111".repeat(2), 2, ECLevel::L)]
    #[test_case("A11111111111111".repeat(4), 3, ECLevel::L)]
    #[test_case("aAAAAAAAAAAA".repeat(5), 4, ECLevel::L)]
    #[test_case("a".repeat(2953), 40, ECLevel::L)]
    fn test_smallest_version(data: String, exp_ver: usize, ecl: ECLevel) {
        let (_, ver) = encode(data.as_bytes(), ecl, &EncodeHints::default()).unwrap();
        assert_eq!(*ver, exp_ver);
    }

    #[test]
    fn test_capacity_exceeded() {
        let hints = EncodeHints::default();
        let data = "a".repeat(2954);
        assert_eq!(encode(data.as_bytes(), ECLevel::L, &hints).err(), Some(BarcodeError::CapacityExceeded));
        let res = encode_with_version(&[b'a'; 18], v1(), ECLevel::M, &hints);
        assert_eq!(res.err(), Some(BarcodeError::CapacityExceeded));
    }

    #[test]
    fn test_eci_takes_capacity() {
        // 17 bytes fill version 1-L without a header to spare
        let hints = EncodeHints { eci: Some(26), ..Default::default() };
        let (_, ver) = encode(&[b'x'; 17], ECLevel::L, &EncodeHints::default()).unwrap();
        assert_eq!(*ver, 1);
        let (_, ver) = encode(&[b'x'; 17], ECLevel::L, &hints).unwrap();
        assert_eq!(*ver, 2);
    }
}

// Bit writing
//------------------------------------------------------------------------------

fn write_symbol_data(
    segs: &[Segment],
    eci: Option<u32>,
    ver: Version,
    ecl: ECLevel,
) -> BarcodeResult<BitWriter> {
    let mut bw = BitWriter::with_limit(ver.data_bit_capacity(ecl));
    if let Some(number) = eci {
        write_eci(number, &mut bw)?;
    }
    for seg in segs {
        write_segment(seg, ver, &mut bw)?;
    }
    write_padding(&mut bw)?;
    Ok(bw)
}

fn write_segment(seg: &Segment, ver: Version, bw: &mut BitWriter) -> BarcodeResult<()> {
    let count_bits = ver.char_cnt_bits(seg.mode);
    if seg.char_count() >> count_bits > 0 {
        return Err(BarcodeError::CapacityExceeded);
    }
    bw.write(seg.mode as u8, MODE_INDICATOR_BITS)?;
    bw.write(seg.char_count() as u32, count_bits)?;

    match seg.mode {
        Mode::Numeric => {
            for chunk in seg.data.chunks(3) {
                bw.write(Mode::Numeric.encode_chunk(chunk), Mode::Numeric.encoded_len(chunk.len()))?;
            }
        }
        Mode::Alphanumeric => {
            for chunk in seg.data.chunks(2) {
                let len = Mode::Alphanumeric.encoded_len(chunk.len());
                bw.write(Mode::Alphanumeric.encode_chunk(chunk), len)?;
            }
        }
        Mode::Kanji => {
            for chunk in seg.data.chunks(2) {
                bw.write(Mode::Kanji.encode_chunk(chunk), Mode::Kanji.encoded_len(1))?;
            }
        }
        _ => bw.write_bytes(seg.data)?,
    }
    Ok(())
}

fn write_eci(number: u32, bw: &mut BitWriter) -> BarcodeResult<()> {
    let width = eci_bit_len(Some(number))? - MODE_INDICATOR_BITS;
    // Leading bits flag the designator width
    let flag = match width {
        8 => 0,
        16 => 0b10 << 14,
        _ => 0b110 << 21,
    };
    bw.write(Mode::Eci as u8, MODE_INDICATOR_BITS)?;
    bw.write(flag | number, width)
}

fn eci_bit_len(eci: Option<u32>) -> BarcodeResult<usize> {
    let designator = match eci {
        None => return Ok(0),
        Some(0..=0x7f) => 8,
        Some(0x80..=0x3fff) => 16,
        Some(n) if n <= MAX_ECI => 24,
        Some(n) => return Err(BarcodeError::InvalidEci(n)),
    };
    Ok(MODE_INDICATOR_BITS + designator)
}

// Terminator, cut short when the symbol is nearly full, then zero bits to the
// byte boundary and alternating pad codewords
fn write_padding(bw: &mut BitWriter) -> BarcodeResult<()> {
    bw.write(0u8, bw.free().min(4))?;
    bw.write(0u8, (8 - bw.len() % 8) % 8)?;
    let pads = bw.free() / 8;
    PADDING_CODEWORDS.iter().cycle().take(pads).try_for_each(|&pad| bw.write(pad, 8))
}


// Global constants
//------------------------------------------------------------------------------

// Numeric first so that ties keep the denser mode
static PLAN_MODES: [Mode; 4] = [Mode::Numeric, Mode::Alphanumeric, Mode::Kanji, Mode::Byte];

static MAX_ECI: u32 = 999_999;
