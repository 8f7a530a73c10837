//! Bidirectional linear feedback shift registers.
//!
//! Every bit is a flip-flop fed by a 2:1 mux. With `up` high the register
//! shifts towards the top bit and bit 0 takes the forward feedback; with
//! `up` low it shifts towards bit 0 and the top bit takes the reverse
//! feedback, which exactly undoes one forward step. Feedback is XNOR, so
//! the all-zero reset state is part of the maximal-length cycle and the
//! all-ones state is the lock-up state.

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

use crate::bus_bit;
use crate::cells::GateKind;
use crate::component::Component;
use crate::context::ModuleCtx;
use crate::error::{Error, Result};
use crate::geom::{Point, Side};
use crate::layout::row::GateRow;
use crate::schematic::Direction;
use crate::tech::Tech;

pub const MIN_SIZE: usize = 3;
pub const MAX_SIZE: usize = 20;

/// Feedback taps of maximal-length sequences, one-based, indexed by size.
const FORWARD_TAPS: [&[usize]; MAX_SIZE + 1] = [
    &[],
    &[],
    &[],
    &[3, 2],
    &[4, 3],
    &[5, 3],
    &[6, 5],
    &[7, 6],
    &[8, 6, 5, 4],
    &[9, 5],
    &[10, 7],
    &[11, 9],
    &[12, 6, 4, 1],
    &[13, 4, 3, 1],
    &[14, 5, 3, 1],
    &[15, 14],
    &[16, 15, 13, 4],
    &[17, 14],
    &[18, 11],
    &[19, 6, 2, 1],
    &[20, 17],
];

fn check_size(size: usize) -> Result<()> {
    if !(MIN_SIZE..=MAX_SIZE).contains(&size) {
        return Err(Error::config(
            "lfsr",
            format!("size must be between {MIN_SIZE} and {MAX_SIZE}, got {size}"),
        ));
    }
    Ok(())
}

/// Zero-based state bits XNOR-ed into bit 0 on a forward step.
pub fn forward_taps(size: usize) -> Result<Vec<usize>> {
    check_size(size)?;
    Ok(FORWARD_TAPS[size].iter().map(|t| t - 1).collect())
}

/// Zero-based state bits XNOR-ed into the top bit on a reverse step.
///
/// A forward step moves bit `t - 1` to bit `t`, so the reverse feedback
/// reads the forward taps one position higher, plus the new bit 0.
pub fn reverse_taps(size: usize) -> Result<Vec<usize>> {
    check_size(size)?;
    let mut taps = vec![0];
    taps.extend(FORWARD_TAPS[size].iter().copied().filter(|&t| t < size));
    Ok(taps)
}

/// A software model of the register.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct LfsrState {
    size: usize,
    bits: u32,
    forward: Vec<usize>,
    reverse: Vec<usize>,
}

impl LfsrState {
    /// A register in its reset state.
    pub fn new(size: usize) -> Result<Self> {
        Ok(Self {
            size,
            bits: 0,
            forward: forward_taps(size)?,
            reverse: reverse_taps(size)?,
        })
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    fn xnor(&self, taps: &[usize]) -> u32 {
        let parity = taps.iter().fold(0, |acc, &t| acc ^ ((self.bits >> t) & 1));
        parity ^ 1
    }

    pub fn step(&mut self, up: bool) {
        let mask = (1u32 << self.size) - 1;
        if up {
            let fb = self.xnor(&self.forward);
            self.bits = ((self.bits << 1) | fb) & mask;
        } else {
            let fb = self.xnor(&self.reverse);
            self.bits = (self.bits >> 1) | (fb << (self.size - 1));
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct LfsrParams {
    pub size: usize,
}

pub struct Lfsr {
    params: LfsrParams,
}

impl Lfsr {
    /// XNORs `taps` of the state onto `out` with a chain of XOR gates and a
    /// final inverter. Internal nets are named after `out`.
    fn push_feedback(
        &self,
        ctx: &mut ModuleCtx,
        row: &mut GateRow,
        taps: &[usize],
        out: &str,
    ) -> Result<()> {
        let mut acc = bus_bit("q", taps[0]);
        for (k, &t) in taps.iter().enumerate().skip(1) {
            let next = format!("{out}_x{k}");
            row.push_gate(
                ctx,
                GateKind::Xor2,
                format!("{out}_xor{k}"),
                &[&acc, &bus_bit("q", t), &next],
            )?;
            acc = next;
        }
        row.push_gate(ctx, GateKind::Inv, format!("{out}_inv"), &[&acc, out])
    }
}

impl Component for Lfsr {
    type Params = LfsrParams;

    fn new(params: &Self::Params, _tech: &Tech) -> Result<Self> {
        check_size(params.size)?;
        Ok(Self { params: *params })
    }

    fn name(&self) -> ArcStr {
        arcstr::format!("lfsr_{}", self.params.size)
    }

    fn generate(&self, ctx: &mut ModuleCtx) -> Result<()> {
        let n = self.params.size;
        let mut row = GateRow::new();
        self.push_feedback(ctx, &mut row, &forward_taps(n)?, "fwd")?;
        self.push_feedback(ctx, &mut row, &reverse_taps(n)?, "rev")?;

        for i in 0..n {
            let down = if i + 1 < n { bus_bit("q", i + 1) } else { "rev".to_string() };
            let up = if i > 0 { bus_bit("q", i - 1) } else { "fwd".to_string() };
            let d = format!("d{i}");
            row.push_gate(ctx, GateKind::Mux2, format!("mux{i}"), &[&down, &up, "up", &d])?;
            row.push_gate(ctx, GateKind::Dff, format!("dff{i}"), &[&d, "clk", "reset", &bus_bit("q", i)])?;
        }

        for input in ["clk", "reset", "up"] {
            row.expose_on(input, Direction::Input, Side::Bot);
        }
        for i in 0..n {
            row.expose(bus_bit("q", i), Direction::Output);
        }
        row.finish(ctx, Point::zero())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SramCtx;

    macro_rules! lfsr_tests {
        ($($n:literal),*) => {
            paste::paste! {
                $(
                    #[test]
                    fn [<test_lfsr_ $n _is_maximal>]() {
                        let mut lfsr = LfsrState::new($n).unwrap();
                        let period = (1usize << $n) - 1;
                        let mut seen = std::collections::HashSet::new();
                        for _ in 0..period {
                            assert!(seen.insert(lfsr.bits()));
                            lfsr.step(true);
                        }
                        assert_eq!(lfsr.bits(), 0);
                        assert!(!seen.contains(&((1u32 << $n) - 1)));
                    }

                    #[test]
                    fn [<test_lfsr_ $n _reverses>]() {
                        let mut lfsr = LfsrState::new($n).unwrap();
                        let mut states = Vec::new();
                        for _ in 0..50 {
                            states.push(lfsr.bits());
                            lfsr.step(true);
                        }
                        for expected in states.into_iter().rev() {
                            lfsr.step(false);
                            assert_eq!(lfsr.bits(), expected);
                        }
                    }

                    #[test]
                    fn [<test_lfsr_ $n _layout>]() {
                        let mut ctx = SramCtx::default();
                        let lfsr = ctx.instantiate::<Lfsr>(&LfsrParams { size: $n }).unwrap();
                        assert_eq!(lfsr.name().as_str(), concat!("lfsr_", $n));
                        assert!(lfsr.has_port(&bus_bit("q", $n - 1)));
                        let stats = crate::validate::validate(&lfsr).unwrap();
                        assert_eq!(stats.count("dff"), $n);
                        assert_eq!(stats.count("mux2"), $n);
                    }
                )*
            }
        };
    }

    lfsr_tests!(3, 4, 7, 12);

    #[test]
    fn test_rejects_unsupported_sizes() {
        let mut ctx = SramCtx::default();
        for size in [2, 21, 64] {
            let err = ctx.instantiate::<Lfsr>(&LfsrParams { size }).unwrap_err();
            assert!(matches!(err, Error::Config { .. }), "{size}");
        }
        assert!(forward_taps(21).is_err());
    }
}
