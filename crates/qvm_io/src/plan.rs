//! Session plan parsing.
//!
//! A plan is a text file of one step per line:
//!
//! ```text
//! # warm-up, then snapshot the first register bank
//! probe 7
//! probe-mask 0x0B
//! capture 0x3
//! expect 0xAABBCCDD11223344
//! ```
//!
//! `capture` takes a selector, `probe` a qubit id, `probe-mask` a packed
//! set of qubit ids, and `expect` asserts on the value produced by the
//! most recent capture. Numbers are decimal or `0x`-prefixed hex.

use anyhow::{Context, Result, anyhow};
use nom::IResult;
use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{digit1, hex_digit1, space1};
use nom::combinator::{all_consuming, map, map_res};
use nom::sequence::{pair, preceded};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// One executable step of a debug session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanStep {
    /// Capture the selected state into a fresh arena block.
    Capture { selector: u16 },
    /// Fire a probe pulse at a single qubit.
    Probe { id: u8 },
    /// Fire a probe pulse at every qubit set in the mask, lowest first.
    ProbeMask { mask: u64 },
    /// Assert that the most recent capture produced this value.
    Expect { value: u64 },
}

fn number(input: &str) -> IResult<&str, u64> {
    alt((
        map_res(preceded(tag("0x"), hex_digit1), |digits: &str| {
            u64::from_str_radix(digits, 16)
        }),
        map_res(digit1, |digits: &str| digits.parse::<u64>()),
    ))(input)
}

fn step(input: &str) -> IResult<&str, PlanStep> {
    alt((
        map(preceded(pair(tag("probe-mask"), space1), number), |mask| {
            PlanStep::ProbeMask { mask }
        }),
        map_res(preceded(pair(tag("probe"), space1), number), |n| {
            u8::try_from(n).map(|id| PlanStep::Probe { id })
        }),
        map_res(preceded(pair(tag("capture"), space1), number), |n| {
            u16::try_from(n).map(|selector| PlanStep::Capture { selector })
        }),
        map(preceded(pair(tag("expect"), space1), number), |value| {
            PlanStep::Expect { value }
        }),
    ))(input)
}

/// Parses a single plan line.
///
/// Returns `Ok(None)` for blank lines and comments, `Ok(Some(step))` for a
/// well-formed step, and an error for anything else.
pub fn parse_line(line: &str) -> Result<Option<PlanStep>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    match all_consuming(step)(trimmed) {
        Ok((_, parsed)) => Ok(Some(parsed)),
        Err(_) => Err(anyhow!("malformed plan step: {trimmed:?}")),
    }
}

/// Parses a whole plan from text, skipping blanks and comments.
pub fn parse_plan(text: &str) -> Result<Vec<PlanStep>> {
    let mut steps = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if let Some(parsed) =
            parse_line(line).with_context(|| format!("plan line {}", idx + 1))?
        {
            steps.push(parsed);
        }
    }
    Ok(steps)
}

/// Loads and parses a plan file.
pub fn load_plan_file<P: AsRef<Path>>(path: P) -> Result<Vec<PlanStep>> {
    let file = File::open(&path).context("Failed to open plan file")?;
    let reader = BufReader::new(file);

    let mut steps = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if let Some(parsed) =
            parse_line(&line).with_context(|| format!("plan line {}", idx + 1))?
        {
            steps.push(parsed);
        }
    }
    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_step_kind() {
        let plan = parse_plan(
            "# session\n\
             capture 0x3\n\
             probe 7\n\
             probe-mask 0x0B\n\
             expect 0xAABBCCDD11223344\n",
        )
        .unwrap();

        assert_eq!(
            plan,
            vec![
                PlanStep::Capture { selector: 0x3 },
                PlanStep::Probe { id: 7 },
                PlanStep::ProbeMask { mask: 0x0B },
                PlanStep::Expect {
                    value: 0xAABB_CCDD_1122_3344
                },
            ]
        );
    }

    #[test]
    fn decimal_and_hex_operands_agree() {
        assert_eq!(
            parse_line("capture 16").unwrap(),
            parse_line("capture 0x10").unwrap()
        );
    }

    #[test]
    fn blanks_and_comments_are_skipped() {
        assert_eq!(parse_line("").unwrap(), None);
        assert_eq!(parse_line("   ").unwrap(), None);
        assert_eq!(parse_line("# capture 1").unwrap(), None);
    }

    #[test]
    fn rejects_unknown_steps() {
        assert!(parse_line("measure 3").is_err());
    }

    #[test]
    fn rejects_trailing_garbage() {
        assert!(parse_line("probe 7 now").is_err());
    }

    #[test]
    fn rejects_oversized_operands() {
        assert!(parse_line("probe 256").is_err());
        assert!(parse_line("capture 0x10000").is_err());
    }

    #[test]
    fn reports_the_offending_line() {
        let err = parse_plan("capture 1\nbogus\n").unwrap_err();
        assert!(format!("{err:#}").contains("line 2"));
    }
}
