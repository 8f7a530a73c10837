//! A single, independently addressable SRAM bank.
//!
//! A bank holds one or more sub-banks side by side. Every sub-bank is a
//! bitcell array with its own word line drivers and column periphery; the
//! row decoder, the control logic and the sub-bank and column select
//! decoders are shared. The address is partitioned, least significant
//! bits first, into column mux bits, row bits and sub-bank bits.

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

use crate::blocks::control::BankControlParams;
use crate::blocks::logic::DelayChainParams;
use crate::component::Component;
use crate::context::ModuleCtx;
use crate::error::{Error, Result};
use crate::schematic::Direction;
use crate::tech::Tech;
use crate::{bus_bit, clog2};

pub(crate) mod layout;

pub const MAX_SUBANKS: usize = 8;
pub const MIN_ROWS: usize = 16;
pub const MAX_ROWS: usize = 512;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct BankParams {
    pub word_size: usize,
    /// Column mux fan-in.
    pub words_per_row: usize,
    pub num_rows: usize,
    pub num_subanks: usize,
    /// Adds a `sel` input qualifying every request, for use inside a
    /// multi-bank composition.
    pub two_level_bank: bool,
    /// Adds a per-bit write mask `bm`.
    pub mask: bool,
    /// Adds a `sleep` input that forces the acknowledges low.
    pub power_gate: bool,
}

impl BankParams {
    pub fn validate(&self) -> Result<()> {
        if self.word_size == 0 {
            return Err(Error::config("bank", "word size must be at least 1"));
        }
        if ![1, 2, 4].contains(&self.words_per_row) {
            return Err(Error::config(
                "bank",
                format!("column mux fan-in must be 1, 2 or 4, got {}", self.words_per_row),
            ));
        }
        if !self.num_rows.is_power_of_two() || !(MIN_ROWS..=MAX_ROWS).contains(&self.num_rows) {
            return Err(Error::config(
                "bank",
                format!(
                    "row count must be a power of two between {MIN_ROWS} and {MAX_ROWS}, got {}",
                    self.num_rows
                ),
            ));
        }
        if !self.num_subanks.is_power_of_two() || self.num_subanks > MAX_SUBANKS {
            return Err(Error::config(
                "bank",
                format!(
                    "sub-bank count must be a power of two up to {MAX_SUBANKS}, got {}",
                    self.num_subanks
                ),
            ));
        }
        Ok(())
    }

    /// Bitcell columns per sub-bank.
    pub fn columns(&self) -> usize {
        self.word_size * self.words_per_row
    }

    pub fn col_addr_bits(&self) -> usize {
        clog2(self.words_per_row)
    }

    pub fn row_addr_bits(&self) -> usize {
        clog2(self.num_rows)
    }

    pub fn subbank_addr_bits(&self) -> usize {
        clog2(self.num_subanks)
    }

    pub fn addr_size(&self) -> usize {
        self.col_addr_bits() + self.row_addr_bits() + self.subbank_addr_bits()
    }

    pub fn num_words(&self) -> usize {
        self.num_rows * self.words_per_row * self.num_subanks
    }

    pub fn total_bits(&self) -> usize {
        self.num_words() * self.word_size
    }

    pub fn control_params(&self) -> BankControlParams {
        BankControlParams {
            two_level: self.two_level_bank,
            power_gate: self.power_gate,
            delay: DelayChainParams::for_rows(self.num_rows),
        }
    }

    pub fn name(&self) -> ArcStr {
        let BankParams {
            word_size,
            words_per_row,
            num_rows,
            num_subanks,
            ..
        } = *self;
        let tl = if self.two_level_bank { "_tl" } else { "" };
        let m = if self.mask { "_m" } else { "" };
        let pg = if self.power_gate { "_pg" } else { "" };
        arcstr::format!("bank_{word_size}x{num_rows}_w{words_per_row}_s{num_subanks}{tl}{m}{pg}")
    }

    /// The bank's ports, in declaration order.
    pub fn ports(&self) -> Vec<(String, Direction)> {
        let ws = self.word_size;
        let mut ports = Vec::new();
        ports.extend((0..ws).map(|i| (bus_bit("din", i), Direction::Input)));
        ports.extend((0..ws).map(|i| (bus_bit("dout", i), Direction::Output)));
        ports.extend((0..self.addr_size()).map(|i| (bus_bit("addr", i), Direction::Input)));
        if self.mask {
            ports.extend((0..ws).map(|i| (bus_bit("bm", i), Direction::Input)));
        }
        for p in ["reset", "r", "w", "rw"] {
            ports.push((p.to_string(), Direction::Input));
        }
        if self.two_level_bank {
            ports.push(("sel".to_string(), Direction::Input));
        }
        if self.power_gate {
            ports.push(("sleep".to_string(), Direction::Input));
        }
        for p in ["ack", "rack", "wack"] {
            ports.push((p.to_string(), Direction::Output));
        }
        ports.push(("vdd".to_string(), Direction::Power));
        ports.push(("gnd".to_string(), Direction::Ground));
        ports
    }
}

pub struct Bank {
    params: BankParams,
}

impl Bank {
    pub fn params(&self) -> &BankParams {
        &self.params
    }
}

impl Component for Bank {
    type Params = BankParams;

    fn new(params: &Self::Params, _tech: &Tech) -> Result<Self> {
        params.validate()?;
        Ok(Self { params: *params })
    }

    fn name(&self) -> ArcStr {
        self.params.name()
    }

    fn generate(&self, ctx: &mut ModuleCtx) -> Result<()> {
        for (name, dir) in self.params.ports() {
            ctx.declare_port(name, dir)?;
        }
        layout::draw(&self.params, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SramCtx;
    use crate::geom::BoundBox;

    fn params() -> BankParams {
        BankParams {
            word_size: 16,
            words_per_row: 1,
            num_rows: 32,
            num_subanks: 2,
            two_level_bank: true,
            mask: false,
            power_gate: true,
        }
    }

    #[test]
    fn test_two_level_power_gated_bank() {
        let mut ctx = SramCtx::default();
        let bank = ctx.instantiate::<Bank>(&params()).unwrap();
        assert_eq!(bank.name().as_str(), "bank_16x32_w1_s2_tl_pg");

        let ports: Vec<String> = bank.netlist().port_names().map(|p| p.to_string()).collect();
        let expected: Vec<String> = params().ports().into_iter().map(|(p, _)| p).collect();
        assert_eq!(ports, expected);
        assert!(bank.has_port("sel"));
        assert!(bank.has_port("sleep"));
        assert!(!bank.has_port("bm[0]"));
        assert_eq!(params().addr_size(), 6);
        assert!(bank.has_port("addr[5]"));

        let stats = crate::validate::validate(&bank).unwrap();
        assert_eq!(stats.count("sram_cell_6t"), 16 * 32 * 2);
        assert_eq!(stats.count("wordline_driver_array_32"), 2);
        assert_eq!(stats.count("bank_control_logic_tl_pg_d5"), 1);

        // Every external signal leaves through the bottom edge.
        let brect = bank.brect();
        assert_eq!(brect.bottom(), 0);
        for port in ["din[0]", "dout[15]", "addr[0]", "r", "ack", "sleep"] {
            assert_eq!(bank.port(port).unwrap().largest_rect().bottom(), 0, "{port}");
        }
    }

    #[test]
    fn test_column_mux_bank_with_mask() {
        let mut ctx = SramCtx::default();
        let params = BankParams {
            word_size: 4,
            words_per_row: 4,
            num_rows: 16,
            num_subanks: 1,
            two_level_bank: false,
            mask: true,
            power_gate: false,
        };
        let bank = ctx.instantiate::<Bank>(&params).unwrap();
        assert_eq!(params.addr_size(), 2 + 4);
        assert!(bank.has_port("bm[3]"));
        assert!(!bank.has_port("sel"));
        let stats = crate::validate::validate(&bank).unwrap();
        assert_eq!(stats.count("column_mux_array_16x4"), 1);
        assert_eq!(stats.count("sram_cell_6t"), 16 * 16);
        assert_eq!(stats.count("select_decoder_4"), 1);
    }

    #[test]
    fn test_rejects_unsupported_configurations() {
        let mut ctx = SramCtx::default();
        let cases = [
            BankParams {
                words_per_row: 8,
                ..params()
            },
            BankParams {
                num_subanks: 16,
                ..params()
            },
            BankParams {
                num_rows: 48,
                ..params()
            },
            BankParams {
                word_size: 0,
                ..params()
            },
        ];
        for p in cases {
            let err = ctx.instantiate::<Bank>(&p).unwrap_err();
            assert!(matches!(err, Error::Config { .. }), "{p:?}");
        }
    }

    #[test]
    fn test_address_accounting() {
        let p = BankParams {
            words_per_row: 2,
            num_rows: 64,
            num_subanks: 4,
            ..params()
        };
        assert_eq!(p.col_addr_bits(), 1);
        assert_eq!(p.row_addr_bits(), 6);
        assert_eq!(p.subbank_addr_bits(), 2);
        assert_eq!(p.addr_size(), 9);
        assert_eq!(p.total_bits(), 16 * 64 * 2 * 4);
    }
}
