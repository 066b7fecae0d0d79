use crate::database::RunKey;
use std::{
    ffi::{OsStr, OsString},
    fmt,
    path::Path,
};

/// Consistency check the benchmark applies to concurrent transactions,
/// passed through to the executable as `--opacity=<0|1|2>`
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Clone, Copy, Hash)]
#[repr(u8)]
pub enum OpacityMode {
    Disabled = 0,
    Tl2 = 1,
    Slow = 2,
}

impl OpacityMode {
    pub const ALL: [Self; 3] = [Self::Disabled, Self::Tl2, Self::Slow];

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// human readable name used in series banners
    pub fn name(self) -> &'static str {
        match self {
            Self::Disabled => "no opacity",
            Self::Tl2 => "TL2 opacity",
            Self::Slow => "slow opacity",
        }
    }
}

impl fmt::Display for OpacityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A fully resolved configuration for a single benchmark invocation
#[derive(PartialEq, Eq, Debug, Clone, Copy, Hash)]
pub struct RunConfig {
    /// index into the configured list of benchmark executables
    pub variant: usize,
    pub trial: u32,
    /// total number of transactions over all threads
    pub transactions: u64,
    pub threads: u32,
    /// operations per transaction
    pub tx_length: u32,
    pub opacity: OpacityMode,
}

impl RunConfig {
    pub fn key(&self) -> RunKey {
        RunKey {
            variant: self.variant,
            trial: self.trial,
            transactions: self.transactions,
            threads: self.threads,
            tx_length: self.tx_length,
            opacity: self.opacity.as_u8(),
        }
    }

    /// Map this configuration onto the benchmark's positional protocol.
    /// The executable is the first element of the returned list.
    pub fn args(&self, exec: &Path) -> Vec<OsString> {
        let mut args = vec![
            exec.as_os_str().to_owned(),
            OsString::from("3"),
            OsString::from("array"),
        ];

        args.extend(
            [
                format!("--ntrans={}", self.transactions),
                format!("--nthreads={}", self.threads),
                format!("--opspertrans={}", self.tx_length),
                format!("--opacity={}", self.opacity.as_u8()),
            ]
            .into_iter()
            .map(OsString::from),
        );

        args
    }
}

/// shell style rendering of an argument list, as printed and kept in transcripts
pub fn command_line<S: AsRef<OsStr>>(args: &[S]) -> String {
    args.iter()
        .map(|arg| arg.as_ref().to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

/// One element of an experiment traversal
#[derive(PartialEq, Eq, Debug, Clone)]
pub enum Step {
    /// marks the start of a thread series, only shows up in the console and transcript
    Series {
        trial: u32,
        tx_length: u32,
        opacity: OpacityMode,
    },
    Run(RunConfig),
}

impl Step {
    pub fn banner(&self) -> Option<String> {
        match self {
            Self::Series {
                trial,
                tx_length,
                opacity,
            } => Some(format!(
                "@@@ Running with {opacity}, txlen {tx_length}. Trail #{trial}"
            )),
            Self::Run(_) => None,
        }
    }

    pub fn run(&self) -> Option<&RunConfig> {
        match self {
            Self::Run(config) => Some(config),
            Self::Series { .. } => None,
        }
    }
}

/// a banner followed by one run per thread count, all sharing the remaining parameters
pub fn series(
    variant: usize,
    trial: u32,
    tx_length: u32,
    opacity: OpacityMode,
    threads: &'static [u32],
    transactions: u64,
) -> impl Iterator<Item = Step> {
    std::iter::once(Step::Series {
        trial,
        tx_length,
        opacity,
    })
    .chain(threads.iter().map(move |&threads| {
        Step::Run(RunConfig {
            variant,
            trial,
            transactions,
            threads,
            tx_length,
            opacity,
        })
    }))
}
