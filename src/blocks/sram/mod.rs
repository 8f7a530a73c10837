//! The top-level SRAM macro.
//!
//! An SRAM is a two-level composition: `outer` copies of a multi-bank,
//! each holding `inner` banks. The address is partitioned, least
//! significant bits first, into column mux bits, row bits, sub-bank bits,
//! inner bank select bits and outer bank select bits.

use arcstr::ArcStr;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::blocks::bank::BankParams;
use crate::blocks::multi_bank::{BankKind, BankOrientation, MultiBank, MultiBankParams};
use crate::component::Component;
use crate::context::ModuleCtx;
use crate::error::{Error, Result};
use crate::geom::BoundBox;
use crate::schematic::Direction;
use crate::tech::{Layer, Tech};
use crate::{bus_bit, clog2};

pub mod power_gate;

#[derive(Serialize_repr, Deserialize_repr, PartialEq, Eq, Debug, Default, Clone, Copy, Hash)]
#[repr(u8)]
pub enum MuxRatio {
    #[default]
    M1 = 1,
    M2 = 2,
    M4 = 4,
}

impl MuxRatio {
    pub fn try_from_usize(n: usize) -> Result<Self> {
        match n {
            1 => Ok(Self::M1),
            2 => Ok(Self::M2),
            4 => Ok(Self::M4),
            _ => Err(Error::config(
                "sram",
                format!("column mux fan-in must be 1, 2 or 4, got {n}"),
            )),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Builder)]
pub struct SramParams {
    /// Overrides the generated module name.
    #[builder(default, setter(into, strip_option))]
    pub name: Option<ArcStr>,
    pub word_size: usize,
    #[builder(default)]
    pub words_per_row: MuxRatio,
    pub num_rows: usize,
    #[builder(default = "1")]
    pub num_subanks: usize,
    /// `(outer, inner)` bank counts.
    #[builder(default = "(1, 1)")]
    pub branch_factors: (usize, usize),
    /// `(outer, inner)` bank arrangements.
    #[builder(default)]
    pub bank_orientations: (BankOrientation, BankOrientation),
    #[builder(default)]
    pub mask: bool,
    #[builder(default)]
    pub power_gate: bool,
}

impl SramParams {
    pub fn validate(&self) -> Result<()> {
        let (outer, inner) = self.branch_factors;
        for (level, n) in [("outer", outer), ("inner", inner)] {
            if ![1, 2, 4].contains(&n) {
                return Err(Error::config(
                    "sram",
                    format!("{level} branch factor must be 1, 2 or 4, got {n}"),
                ));
            }
        }
        self.bank_params().validate()
    }

    pub fn name(&self) -> ArcStr {
        if let Some(name) = &self.name {
            return name.clone();
        }
        let (outer, inner) = self.branch_factors;
        let m = if self.mask { "_m" } else { "" };
        let pg = if self.power_gate { "_pg" } else { "" };
        arcstr::format!(
            "sram_{}x{}_w{}_b{outer}x{inner}{m}{pg}",
            self.word_size,
            self.num_words(),
            self.words_per_row as usize,
        )
    }

    pub fn bank_params(&self) -> BankParams {
        BankParams {
            word_size: self.word_size,
            words_per_row: self.words_per_row as usize,
            num_rows: self.num_rows,
            num_subanks: self.num_subanks,
            two_level_bank: false,
            mask: self.mask,
            power_gate: self.power_gate,
        }
    }

    /// The outermost multi-bank; its children are the inner multi-banks.
    pub fn multi_bank_params(&self) -> MultiBankParams {
        let (outer, inner) = self.branch_factors;
        let (outer_o, inner_o) = self.bank_orientations;
        let inner = MultiBankParams {
            child: BankKind::Bank(self.bank_params()),
            num_banks: inner,
            orientation: inner_o,
            gated: false,
        };
        MultiBankParams {
            child: BankKind::MultiBank(Box::new(inner)),
            num_banks: outer,
            orientation: outer_o,
            gated: false,
        }
    }

    pub fn num_banks(&self) -> usize {
        self.branch_factors.0 * self.branch_factors.1
    }

    pub fn addr_size(&self) -> usize {
        clog2(self.num_rows)
            + clog2(self.num_subanks)
            + clog2(self.words_per_row as usize)
            + clog2(self.branch_factors.0)
            + clog2(self.branch_factors.1)
    }

    pub fn num_words(&self) -> usize {
        self.num_rows * self.num_subanks * self.words_per_row as usize * self.num_banks()
    }

    pub fn total_bits(&self) -> usize {
        self.num_words() * self.word_size
    }

    /// The macro's ports, in declaration order.
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
        for p in ["ack", "rack", "wack"] {
            ports.push((p.to_string(), Direction::Output));
        }
        if self.power_gate {
            ports.push(("sleep".to_string(), Direction::Input));
        }
        ports.push(("vdd".to_string(), Direction::Power));
        ports.push(("gnd".to_string(), Direction::Ground));
        ports
    }
}

pub struct Sram {
    params: SramParams,
}

impl Component for Sram {
    type Params = SramParams;

    fn new(params: &Self::Params, _tech: &Tech) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params: params.clone(),
        })
    }

    fn name(&self) -> ArcStr {
        self.params.name()
    }

    fn generate(&self, ctx: &mut ModuleCtx) -> Result<()> {
        let ports = self.params.ports();
        for (name, dir) in ports.iter() {
            ctx.declare_port(name.as_str(), *dir)?;
        }
        let mut core = ctx.instantiate::<MultiBank>(&self.params.multi_bank_params())?;
        core.set_name("core");
        for (name, _) in ports.iter() {
            core.connect(name.as_str(), name.as_str());
            ctx.expose_pin(&core, name, name.as_str())?;
        }
        ctx.add_rect(Layer::Boundary, core.brect());
        ctx.set_verilog(crate::verilog::generate_sram_verilog(&self.name(), &self.params)?);
        ctx.add_instance(core)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{gds, lef, spice};
    use crate::context::SramCtx;
    use crate::paths::{out_gds, out_lef, out_spice, out_verilog};
    use crate::tests::test_work_dir;

    pub(crate) fn tiny() -> SramParams {
        SramParamsBuilder::default()
            .word_size(4)
            .num_rows(16)
            .build()
            .unwrap()
    }

    #[test]
    fn test_address_and_capacity() {
        let params = SramParamsBuilder::default()
            .word_size(16)
            .words_per_row(MuxRatio::M2)
            .num_rows(64)
            .num_subanks(2)
            .branch_factors((2, 4))
            .bank_orientations((BankOrientation::H, BankOrientation::V))
            .power_gate(true)
            .build()
            .unwrap();
        assert_eq!(params.addr_size(), 6 + 1 + 1 + 1 + 2);
        assert_eq!(params.total_bits(), 16 * 64 * 2 * 2 * 2 * 4);
        assert_eq!(params.multi_bank_params().addr_size(), params.addr_size());
        assert_eq!(params.multi_bank_params().total_bits(), params.total_bits());
        assert_eq!(params.name().as_str(), "sram_16x2048_w2_b2x4_pg");
    }

    #[test]
    fn test_rejects_bad_branch_factor() {
        let params = SramParams {
            branch_factors: (3, 1),
            ..tiny()
        };
        let mut ctx = SramCtx::default();
        let err = ctx.instantiate::<Sram>(&params).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(MuxRatio::try_from_usize(8).is_err());
    }

    macro_rules! test_sram {
        ($name:ident, $params:expr $(,)?) => {
            #[test]
            fn $name() {
                let mut ctx = SramCtx::default();
                let work_dir = test_work_dir(stringify!($name));
                let params = $params;
                let sram = ctx.instantiate::<Sram>(&params).unwrap();
                let stats = crate::validate::validate(&sram).unwrap();
                assert_eq!(stats.count("sram_cell_6t"), params.total_bits());

                let ports: Vec<String> = sram.netlist().port_names().map(|p| p.to_string()).collect();
                let expected: Vec<String> = params.ports().into_iter().map(|(p, _)| p).collect();
                assert_eq!(ports, expected);

                spice::save_netlist(&sram, out_spice(&work_dir, "netlist")).unwrap();
                gds::save_gds(&sram, ctx.tech(), out_gds(&work_dir, "layout")).unwrap();
                lef::save_lef(&sram, ctx.tech(), out_lef(&work_dir, "abstract")).unwrap();
                crate::verilog::save_sram_verilog(
                    out_verilog(&work_dir, sram.name()),
                    &sram.name(),
                    &params,
                )
                .unwrap();
            }
        };
    }

    test_sram!(test_sram_single_bank, tiny());

    test_sram!(
        test_sram_two_banks_with_mask,
        SramParams {
            branch_factors: (1, 2),
            mask: true,
            ..tiny()
        },
    );

    test_sram!(
        test_sram_nested_power_gated,
        SramParams {
            words_per_row: MuxRatio::M2,
            branch_factors: (2, 2),
            bank_orientations: (BankOrientation::V, BankOrientation::H),
            power_gate: true,
            ..tiny()
        },
    );
}
