use super::tables::{CodeSet, FNC1, SHIFT};
use crate::common::error::{BarcodeError, BarcodeResult};

// Encoder
//------------------------------------------------------------------------------

/// Converts data into the start codeword followed by data codewords. Without a
/// forced code set the shortest sequence of sets, switches and shifts is chosen.
pub fn encode(data: &[u8], code_set: Option<CodeSet>, gs1: bool) -> BarcodeResult<Vec<u8>> {
    if data.is_empty() {
        return Err(BarcodeError::EmptyData);
    }

    let mut values = match code_set {
        Some(set) => encode_in_set(data, set)?,
        None => encode_optimal(data)?,
    };

    if gs1 {
        values.insert(1, FNC1);
    }

    log::debug!("Encoded {} bytes into {} Code128 codewords", data.len(), values.len());
    Ok(values)
}

fn encode_in_set(data: &[u8], set: CodeSet) -> BarcodeResult<Vec<u8>> {
    if let Some(pos) = data.iter().position(|&b| !set.contains(b)) {
        return Err(BarcodeError::UnencodableCharacter { byte: data[pos], position: pos });
    }

    let mut values = Vec::with_capacity(data.len() + 1);
    values.push(set.start_value());
    match set {
        CodeSet::C => {
            if data.len() & 1 == 1 {
                let pos = data.len() - 1;
                return Err(BarcodeError::UnencodableCharacter { byte: data[pos], position: pos });
            }
            values.extend(data.chunks(2).map(digit_pair));
        }
        _ => values.extend(data.iter().map(|&b| set.value(b))),
    }
    Ok(values)
}

// Optimal code set sequence
//------------------------------------------------------------------------------

// Sets in tie-break order
static SETS: [CodeSet; 3] = [CodeSet::B, CodeSet::C, CodeSet::A];

#[derive(Debug, Clone, Copy)]
enum Step {
    Switch,
    Char,
    Shift,
    Pair,
}

type Trace = Option<(usize, usize, Step)>;

// Shortest path over (position, active set). Switches at a position only extend
// states reached by consuming data, so the trace never loops.
fn encode_optimal(data: &[u8]) -> BarcodeResult<Vec<u8>> {
    if let Some(pos) = data.iter().position(|b| !b.is_ascii()) {
        return Err(BarcodeError::UnencodableCharacter { byte: data[pos], position: pos });
    }

    let n = data.len();
    let mut cost = vec![[usize::MAX; 3]; n + 1];
    let mut trace: Vec<[Trace; 3]> = vec![[None; 3]; n + 1];
    cost[0] = [1; 3];

    for i in 0..=n {
        if i > 0 {
            let reached = cost[i];
            for (t, s) in (0..3).flat_map(|t| (0..3).map(move |s| (t, s))) {
                if s != t && reached[s] != usize::MAX && reached[s] + 1 < cost[i][t] {
                    cost[i][t] = reached[s] + 1;
                    trace[i][t] = Some((i, s, Step::Switch));
                }
            }
        }
        if i == n {
            break;
        }

        for s in 0..3 {
            let c = cost[i][s];
            if c == usize::MAX {
                continue;
            }
            let mut relax = |j: usize, c: usize, step: Step| {
                if c < cost[j][s] {
                    cost[j][s] = c;
                    trace[j][s] = Some((i, s, step));
                }
            };
            match SETS[s] {
                CodeSet::C => {
                    if i + 1 < n && data[i].is_ascii_digit() && data[i + 1].is_ascii_digit() {
                        relax(i + 2, c + 1, Step::Pair);
                    }
                }
                set if set.contains(data[i]) => relax(i + 1, c + 1, Step::Char),
                _ => relax(i + 1, c + 2, Step::Shift),
            }
        }
    }

    let mut s = (0..3).min_by_key(|&s| cost[n][s]).unwrap_or(0);
    if cost[n][s] == usize::MAX {
        return Err(BarcodeError::UnencodableCharacter { byte: data[n - 1], position: n - 1 });
    }
    log::trace!("Optimal Code128 sequence has {} codewords before checksum", cost[n][s]);

    let mut values = Vec::with_capacity(cost[n][s]);
    let mut i = n;
    while let Some((pi, ps, step)) = trace[i][s] {
        let set = SETS[s];
        match step {
            Step::Switch => values.push(set.switch_value()),
            Step::Char => values.push(set.value(data[pi])),
            Step::Shift => {
                values.push(shifted(set).value(data[pi]));
                values.push(SHIFT);
            }
            Step::Pair => values.push(digit_pair(&data[pi..pi + 2])),
        }
        (i, s) = (pi, ps);
    }
    values.push(SETS[s].start_value());
    values.reverse();
    Ok(values)
}

fn shifted(set: CodeSet) -> CodeSet {
    match set {
        CodeSet::A => CodeSet::B,
        _ => CodeSet::A,
    }
}

fn digit_pair(pair: &[u8]) -> u8 {
    (pair[0] - b'0') * 10 + (pair[1] - b'0')
}

#[cfg(test)]
mod encoder_tests {
    use test_case::test_case;

    use super::encode;
    use crate::{
        code128::tables::{CodeSet, CODE_A, CODE_C, FNC1, SHIFT, START_A, START_B, START_C},
        common::error::BarcodeError,
    };

    #[test]
    fn test_forced_b() {
        let values = encode(b"12345", Some(CodeSet::B), false).unwrap();
        assert_eq!(values, [START_B, 17, 18, 19, 20, 21]);
    }

    #[test]
    fn test_optimal_digits() {
        let values = encode(b"12345", None, false).unwrap();
        assert_eq!(values.len(), 5);
        assert_eq!(encode(b"123456", None, false).unwrap(), [START_C, 12, 34, 56]);
    }

    #[test]
    fn test_optimal_text() {
        assert_eq!(encode(b"Hi", None, false).unwrap(), [START_B, 40, 73]);
    }

    #[test]
    fn test_optimal_switch_to_c() {
        // 1 start + 3 chars + switch + 4 pairs beats staying in B for 8 digits
        let values = encode(b"abc12345678", None, false).unwrap();
        assert_eq!(values, [START_B, 65, 66, 67, CODE_C, 12, 34, 56, 78]);
    }

    #[test]
    fn test_optimal_control_chars() {
        let values = encode(b"A\tB\n", None, false).unwrap();
        assert_eq!(values, [START_A, 33, 73, 34, 74]);
    }

    #[test]
    fn test_optimal_shift() {
        // A single lowercase byte between control chars is shifted rather than switched
        let values = encode(b"\ta\t", None, false).unwrap();
        assert_eq!(values, [START_A, 73, SHIFT, 65, 73]);
    }

    #[test]
    fn test_gs1() {
        assert_eq!(encode(b"1234", None, true).unwrap(), [START_C, FNC1, 12, 34]);
    }

    #[test_case(b"", None, BarcodeError::EmptyData; "empty")]
    #[test_case(b"ab\xe9", None, BarcodeError::UnencodableCharacter { byte: 0xe9, position: 2 }; "non ascii")]
    #[test_case(b"AbC", Some(CodeSet::A), BarcodeError::UnencodableCharacter { byte: b'b', position: 1 }; "lowercase in a")]
    #[test_case(b"A\nB", Some(CodeSet::B), BarcodeError::UnencodableCharacter { byte: b'\n', position: 1 }; "control in b")]
    #[test_case(b"12a4", Some(CodeSet::C), BarcodeError::UnencodableCharacter { byte: b'a', position: 2 }; "letter in c")]
    #[test_case(b"123", Some(CodeSet::C), BarcodeError::UnencodableCharacter { byte: b'3', position: 2 }; "odd digits in c")]
    fn test_encode_errors(data: &[u8], set: Option<CodeSet>, err: BarcodeError) {
        assert_eq!(encode(data, set, false), Err(err));
    }

    #[test]
    fn test_optimal_switch_to_a() {
        // Two control chars after lowercase are cheaper with a switch than two shifts
        let values = encode(b"ab\t\t", None, false).unwrap();
        assert_eq!(values, [START_B, 65, 66, CODE_A, 73, 73]);
    }
}
