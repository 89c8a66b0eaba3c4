use std::{
    io,
    path::PathBuf,
};

use anyhow::{Context, Result, anyhow};
use clap::{ArgGroup, Parser};
use env_logger::Env;

use dpdkinfo::conf::Conf;
use dpdkinfo::driver;
use dpdkinfo::msg::{InfoCategory, MAX_BUFSZ};
use dpdkinfo::transport::Connection;

/// Show bond and LACP state from the DPDK dataplane
#[derive(Debug, Default, clap::Parser)]
#[clap(name = "dpdkinfo")]
#[clap(group(ArgGroup::new("info").required(true).args(["bond", "lacp"])))]
struct Cli {
    /// show master/slave bond information
    #[clap(short = 'b', long)]
    bond: bool,
    /// show LACP information (conf, status, stat or all)
    #[clap(short = 'l', long, value_name = "MODE")]
    lacp: Option<String>,
    /// size of each reply from the dataplane
    #[clap(long, value_parser = parse_buffsz)]
    buffsz: Option<u32>,
    /// directory containing the dataplane's socket
    #[clap(short = 's', long)]
    sock_dir: Option<PathBuf>,
    /// config file path
    #[clap(short = 'f', long)]
    config: Option<PathBuf>,
    /// log more; may be repeated
    #[clap(short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    /// Which table to dump, and the filter to send with it
    fn category(&self) -> (InfoCategory, Option<Vec<u8>>) {
        if self.bond {
            (InfoCategory::Bond, None)
        } else if let Some(mode) = &self.lacp {
            (InfoCategory::Lacp, Some(mode.clone().into_bytes()))
        } else {
            (InfoCategory::Unset, None)
        }
    }
}

/// Parse a size with strtol(3)'s base-0 prefixes: hex with 0x, octal with a leading 0.  Unlike
/// strtol, anything but a whole valid number is an error.
fn parse_buffsz(s: &str) -> Result<u32> {
    let v = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16)
    } else if s.len() > 1 && s.starts_with('0') {
        u32::from_str_radix(&s[1..], 8)
    } else {
        s.parse()
    }.with_context(|| format!("invalid buffer size {:?}", s))?;
    if v > MAX_BUFSZ {
        return Err(anyhow!("buffer size may not exceed {}", MAX_BUFSZ));
    }
    Ok(v)
}

fn init_logging(verbosity: i32) {
    let level = match verbosity {
        i32::MIN..=0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();
}

fn main() -> Result<()> {
    let cli: Cli = Cli::parse();

    let conf = Conf::load(cli.config.as_deref())?;
    init_logging(i32::from(cli.verbose).saturating_add(conf.debug));

    let (category, filter) = cli.category();
    let sock_dir = cli.sock_dir.clone().unwrap_or(conf.sock_dir);
    let buffsz = cli.buffsz.unwrap_or(conf.buffsz);
    log::info!("dumping {} from {}", category, sock_dir.display());

    let mut conn = Connection::connect(&sock_dir)?;
    let mut stdout = io::stdout().lock();
    driver::run_dump(&mut conn, category, filter, buffsz, &mut stdout)
        .with_context(|| format!("dumping {} information", category))
}

#[cfg(test)]
mod t {
    use super::*;

    mod cli {
        use super::*;

        #[test]
        fn bond() {
            let cli = Cli::try_parse_from(["dpdkinfo", "--bond"]).unwrap();
            assert_eq!(cli.category(), (InfoCategory::Bond, None));
            assert!(cli.buffsz.is_none());
            assert!(cli.sock_dir.is_none());
        }

        /// The LACP mode is sent verbatim as the filter
        #[test]
        fn lacp() {
            let cli = Cli::try_parse_from(["dpdkinfo", "-l", "status"]).unwrap();
            assert_eq!(cli.category(), (InfoCategory::Lacp, Some(b"status".to_vec())));
        }

        #[test]
        fn lacp_needs_mode() {
            Cli::try_parse_from(["dpdkinfo", "--lacp"]).unwrap_err();
        }

        /// One of --bond or --lacp is required
        #[test]
        fn no_category() {
            let e = Cli::try_parse_from(["dpdkinfo", "--buffsz", "4096"]).unwrap_err();
            assert_eq!(e.kind(), clap::error::ErrorKind::MissingRequiredArgument);
        }

        #[test]
        fn both_categories() {
            let e = Cli::try_parse_from(["dpdkinfo", "-b", "-l", "all"]).unwrap_err();
            assert_eq!(e.kind(), clap::error::ErrorKind::ArgumentConflict);
        }

        #[test]
        fn options() {
            let cli = Cli::try_parse_from(["dpdkinfo", "-b", "--buffsz", "0x2000",
                "--sock-dir", "/tmp/vtest", "-vv"]).unwrap();
            assert_eq!(cli.buffsz, Some(8192));
            assert_eq!(cli.sock_dir, Some(PathBuf::from("/tmp/vtest")));
            assert_eq!(cli.verbose, 2);
        }
    }

    mod parse_buffsz {
        use super::*;

        #[test]
        fn decimal() {
            assert_eq!(parse_buffsz("4096").unwrap(), 4096);
            assert_eq!(parse_buffsz("0").unwrap(), 0);
        }

        #[test]
        fn hex() {
            assert_eq!(parse_buffsz("0x1000").unwrap(), 4096);
        }

        #[test]
        fn octal() {
            assert_eq!(parse_buffsz("010000").unwrap(), 4096);
        }

        #[test]
        fn too_big() {
            parse_buffsz("0x100000").unwrap_err();
        }

        #[test]
        fn garbage() {
            parse_buffsz("lots").unwrap_err();
        }

        /// Inputs that strtol would silently truncate are rejected outright
        #[test]
        fn strict() {
            for s in ["08", "4096k", "-1", "0x", ""] {
                assert!(parse_buffsz(s).is_err(), "{:?} should be rejected", s);
            }
        }

        #[test]
        fn strict_cli() {
            let e = Cli::try_parse_from(["dpdkinfo", "-b", "--buffsz", "4096k"]).unwrap_err();
            assert_eq!(e.kind(), clap::error::ErrorKind::ValueValidation);
        }
    }
}
