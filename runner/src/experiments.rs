use crate::sweep::{series, OpacityMode, RunConfig, Step};
use clap::ValueEnum;
use itertools::{iproduct, Itertools};
use serde::{Deserialize, Serialize};
use std::fmt;

const THREADS_OVERHEAD: [u32; 13] = [1, 2, 4, 6, 8, 10, 12, 14, 16, 18, 20, 22, 24];
const THREADS_FULL: [u32; 6] = [1, 2, 4, 8, 16, 24];
const THREADS_DUAL: [u32; 2] = [1, 24];

const OVERHEAD_TX_LENGTHS: [u32; 1] = [50];
const OVERHEAD_TRANSACTIONS: u64 = 8_000_000;

const HI_CONTENTION_TX_LENGTH: u32 = 25;
const HI_CONTENTION_TRANSACTIONS: u64 = 4_000_000;

const LARGETX_TX_LENGTHS: [u32; 24] = [
    1, 2, 4, 8, 10, 12, 14, 16, 18, 20, 22, 24, 28, 30, 32, 36, 40, 44, 48, 56, 64, 128, 256, 512,
];
// 512 * 7 * 9 * 11 * 20, divisible by most of the swept lengths
const LARGETX_OPERATIONS: u64 = 7_096_320;

const MODES_THREADS: u32 = 16;
const MODES_TX_LENGTH: u32 = 50;
const MODES_TRANSACTIONS: u64 = 8_000_000;

// (tx length, transactions)
const TL2_POINTS: [(u32, u64); 2] = [(5, 50_000_000), (50, 5_000_000)];

/// benchmark variant with low contention
const LOW_CONTENTION: usize = 0;
/// benchmark variant with high contention
const HIGH_CONTENTION: usize = 1;

/// The catalog of experiments the harness knows how to run
#[derive(
    Deserialize, Serialize, ValueEnum, PartialEq, Eq, PartialOrd, Ord, Debug, Clone, Copy, Hash,
)]
#[serde(rename_all = "kebab-case")]
pub enum Experiment {
    ScalabilityOverhead,
    ScalabilityHiContention,
    #[serde(rename = "scalability-largetx")]
    #[value(name = "scalability-largetx")]
    ScalabilityLargeTx,
    OpacityModes,
    #[serde(rename = "opacity-tl2overhead")]
    #[value(name = "opacity-tl2overhead")]
    OpacityTl2Overhead,
}

impl Experiment {
    #[cfg(test)]
    pub const ALL: [Self; 5] = [
        Self::ScalabilityOverhead,
        Self::ScalabilityHiContention,
        Self::ScalabilityLargeTx,
        Self::OpacityModes,
        Self::OpacityTl2Overhead,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::ScalabilityOverhead => "scalability-overhead",
            Self::ScalabilityHiContention => "scalability-hi-contention",
            Self::ScalabilityLargeTx => "scalability-largetx",
            Self::OpacityModes => "opacity-modes",
            Self::OpacityTl2Overhead => "opacity-tl2overhead",
        }
    }

    /// file stem for the transcript, `<stem>_stdout.txt`
    pub fn stem(self) -> &'static str {
        match self {
            Self::ScalabilityOverhead => "scalability_overhead",
            Self::ScalabilityHiContention => "scalability_hi_contention",
            Self::ScalabilityLargeTx => "scalability_largetx",
            Self::OpacityModes => "opacity_modes",
            Self::OpacityTl2Overhead => "opacity_tl2overhead",
        }
    }

    /// benchmark variants this experiment invokes
    pub fn variants(self) -> &'static [usize] {
        match self {
            Self::ScalabilityHiContention => &[HIGH_CONTENTION],
            Self::OpacityModes => &[LOW_CONTENTION, HIGH_CONTENTION],
            Self::ScalabilityOverhead | Self::ScalabilityLargeTx | Self::OpacityTl2Overhead => {
                &[LOW_CONTENTION]
            }
        }
    }

    /// Enumerate the traversal in execution order
    pub fn steps(self, repetitions: u32) -> Vec<Step> {
        match self {
            Self::ScalabilityOverhead => iproduct!(0..repetitions, OVERHEAD_TX_LENGTHS)
                .flat_map(|(trial, tx_length)| {
                    series(
                        LOW_CONTENTION,
                        trial,
                        tx_length,
                        OpacityMode::Disabled,
                        &THREADS_OVERHEAD,
                        OVERHEAD_TRANSACTIONS,
                    )
                })
                .collect_vec(),
            Self::ScalabilityHiContention => (0..repetitions)
                .flat_map(|trial| {
                    series(
                        HIGH_CONTENTION,
                        trial,
                        HI_CONTENTION_TX_LENGTH,
                        OpacityMode::Disabled,
                        &THREADS_DUAL,
                        HI_CONTENTION_TRANSACTIONS,
                    )
                })
                .collect_vec(),
            Self::ScalabilityLargeTx => iproduct!(LARGETX_TX_LENGTHS, 0..repetitions)
                .map(|(tx_length, trial)| {
                    Step::Run(RunConfig {
                        variant: LOW_CONTENTION,
                        trial,
                        transactions: LARGETX_OPERATIONS / u64::from(tx_length),
                        threads: 1,
                        tx_length,
                        opacity: OpacityMode::Disabled,
                    })
                })
                .collect_vec(),
            Self::OpacityModes => iproduct!(OpacityMode::ALL, 0..repetitions)
                .flat_map(|(opacity, trial)| {
                    [
                        Step::Run(RunConfig {
                            variant: LOW_CONTENTION,
                            trial,
                            transactions: MODES_TRANSACTIONS,
                            threads: MODES_THREADS,
                            tx_length: MODES_TX_LENGTH,
                            opacity,
                        }),
                        Step::Run(RunConfig {
                            variant: HIGH_CONTENTION,
                            trial,
                            transactions: MODES_TRANSACTIONS / 2,
                            threads: MODES_THREADS,
                            tx_length: MODES_TX_LENGTH / 5,
                            opacity,
                        }),
                    ]
                })
                .collect_vec(),
            Self::OpacityTl2Overhead => iproduct!(OpacityMode::ALL, TL2_POINTS, 0..repetitions)
                .flat_map(|(opacity, (tx_length, transactions), trial)| {
                    series(
                        LOW_CONTENTION,
                        trial,
                        tx_length,
                        opacity,
                        &THREADS_FULL,
                        transactions,
                    )
                })
                .collect_vec(),
        }
    }
}

impl fmt::Display for Experiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
