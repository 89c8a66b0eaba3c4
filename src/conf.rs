use std::{
    io::Read,
    path::{Path, PathBuf}
};

use anyhow::{Context, Result, anyhow};
use uclicious::*;

use crate::msg::MAX_BUFSZ;

/// Where the config file lives unless told otherwise
pub const DEFAULT_PATH: &str = "/etc/dpdkinfo.conf";
/// Where the dataplane creates its sockets unless told otherwise
pub const DEFAULT_SOCK_DIR: &str = "/var/run/vrouter";

/// The UCL configuration file format
#[derive(Debug, Uclicious)]
pub struct Conf {
    /// Directory holding the dataplane's socket
    #[ucl(path = "sock-dir", default = "PathBuf::from(DEFAULT_SOCK_DIR)")]
    pub sock_dir: PathBuf,
    /// Maximum size of each reply.  0 lets the server choose.
    #[ucl(default = "0")]
    pub buffsz: u32,
    /// Log verbosity, like the number of -v flags
    #[ucl(default = "0")]
    pub debug: i32,
}

impl Default for Conf {
    fn default() -> Self {
        Conf {
            sock_dir: PathBuf::from(DEFAULT_SOCK_DIR),
            buffsz: 0,
            debug: 0,
        }
    }
}

impl Conf {
    pub fn open<P: AsRef<Path>>(p: P) -> Result<Self> {
        let mut f = std::fs::File::open(p).context("opening config file")?;
        let mut contents = String::new();
        f.read_to_string(&mut contents).context("reading config file")?;
        let mut builder = Conf::builder().map_err(|e| anyhow::Error::msg(format!("{}", e)))?;
        builder.add_chunk_full(&contents, Priority::default(), DEFAULT_DUPLICATE_STRATEGY)
            .context("parsing config file")?;
        let conf: Conf = builder.build().map_err(|e| anyhow::Error::msg(format!("{}", e)))?;
        conf.validate()?;
        Ok(conf)
    }

    /// Load the config file named on the command line.  Without one, fall back to the default
    /// path, and to built-in defaults if that doesn't exist either.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::open(p)
                .with_context(|| format!("loading {}", p.display())),
            None if Path::new(DEFAULT_PATH).exists() => Self::open(DEFAULT_PATH)
                .with_context(|| format!("loading {}", DEFAULT_PATH)),
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.buffsz > MAX_BUFSZ {
            return Err(anyhow!("buffsz may not exceed {}", MAX_BUFSZ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod t {
    use super::*;

    use std::io::Write;

    use tempfile::NamedTempFile;

    fn conf_file(contents: &[u8]) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(contents).unwrap();
        f
    }

    /// Unset settings get their defaults
    #[test]
    fn defaults() {
        let f = conf_file(b"debug = 0\n");
        let conf = Conf::open(f.path()).unwrap();
        assert_eq!(conf.sock_dir, PathBuf::from(DEFAULT_SOCK_DIR));
        assert_eq!(conf.buffsz, 0);
        assert_eq!(conf.debug, 0);
    }

    #[test]
    fn full() {
        let f = conf_file(b"
sock-dir = \"/tmp/vtest\"
buffsz = 8192
debug = 2
");
        let conf = Conf::open(f.path()).unwrap();
        assert_eq!(conf.sock_dir, PathBuf::from("/tmp/vtest"));
        assert_eq!(conf.buffsz, 8192);
        assert_eq!(conf.debug, 2);
    }

    #[test]
    fn buffsz_too_big() {
        let f = conf_file(b"buffsz = 1000000\n");
        Conf::open(f.path()).unwrap_err();
    }

    /// A config file that was explicitly requested must exist
    #[test]
    fn load_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dpdkinfo.conf");
        Conf::load(Some(&path)).unwrap_err();
    }

    #[test]
    fn load_explicit() {
        let f = conf_file(b"buffsz = 512\n");
        let conf = Conf::load(Some(f.path())).unwrap();
        assert_eq!(conf.buffsz, 512);
    }
}
